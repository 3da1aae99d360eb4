//! Command-line interface definitions for phrase_scan.
//!
//! Tunables can be given as flags or through the environment (a `.env` file
//! is loaded first when present).

use crate::idioms::IdiomSpec;
use crate::report::AxisType;
use clap::{Args, Parser, Subcommand};

/// Count exact-phrase search results across news sites.
///
/// # Examples
///
/// ```sh
/// # This week's typos on ft.com, written under ./out
/// phrase_scan -o ./out typos --ignore alphaville
///
/// # Compare idioms between ft.com and the NYT, printed to stdout
/// phrase_scan idioms "AXN:according to,source,sources|SC:finance"
///
/// # Rescan every hour
/// phrase_scan -o ./out --interval-secs 3600 typos
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Maximum concurrent requests per site
    #[arg(long, env = "SITE_FETCH_CONCURRENCE", default_value_t = 2)]
    pub concurrency: usize,

    /// Minimum delay between request starts on a site, in milliseconds
    #[arg(long, env = "SITE_FETCH_DELAY_MILLIS", default_value_t = 500)]
    pub delay_millis: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "SCAN_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Directory for dated output files; stdout when unset
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Rescan on this interval instead of exiting after one scan
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// In watch mode, flush the scan cache every N scans
    #[arg(long, default_value_t = 1)]
    pub flush_every: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for doubled-word typos and list the offending articles
    Typos(TyposArgs),
    /// Compare idiom counts across sites, scaled by standard candles
    Idioms(IdiomsArgs),
    /// Print the effective typo configuration and exit
    Config(TyposOverrides),
}

/// `TYPOS` and `NOT_TYPOS` overrides, shared by `typos` and `config`.
#[derive(Args, Debug, Clone, Default)]
pub struct TyposOverrides {
    /// JSON array of typo phrases
    #[arg(long, env = "TYPOS")]
    pub typos: Option<String>,

    /// JSON object of phrase to not-typo regex fragments
    #[arg(long, env = "NOT_TYPOS")]
    pub not_typos: Option<String>,
}

#[derive(Args, Debug)]
pub struct TyposArgs {
    /// Only search articles from the last N days
    #[arg(long, default_value_t = 7)]
    pub max_days: u32,

    /// Comma-separated patterns; matching results are dropped
    #[arg(long)]
    pub ignore: Option<String>,

    /// Address that per-result notification links are addressed to
    #[arg(long, env = "TYPO_NOTIFY_ADDRESS")]
    pub notify: Option<String>,

    #[command(flatten)]
    pub overrides: TyposOverrides,
}

#[derive(Args, Debug)]
pub struct IdiomsArgs {
    /// Idiom spec, e.g. "AXN:according to,source,sources|SC:finance"
    pub spec: Option<IdiomSpec>,

    /// Site every other site is scaled against
    #[arg(long, default_value = "ft.com")]
    pub baseline: String,

    /// Chart raw counts instead of candle-scaled ones
    #[arg(long)]
    pub unscaled: bool,

    /// Y axis type for the chart
    #[arg(long, value_enum, default_value_t = AxisType::Linear)]
    pub y_axis: AxisType,

    /// YAML file of site descriptors to use instead of the built-ins
    #[arg(long)]
    pub sites: Option<String>,

    /// Print the candidate specs and exit
    #[arg(long)]
    pub list_candidates: bool,
}
