//! # phrase_scan
//!
//! Counts exact-phrase search results on news sites, either to catch
//! doubled-word typos ("the the") or to compare how often sites use an idiom
//! ("according to two sources") after scaling by standard candle phrases.
//!
//! ## Usage
//!
//! ```sh
//! phrase_scan -o ./out typos --max-days 7 --ignore alphaville
//! phrase_scan idioms "AXN:according to,source,sources|SC:finance"
//! phrase_scan config
//! ```
//!
//! ## Architecture
//!
//! 1. **Priming**: one query URL per (site, phrase)
//! 2. **Scanning**: per-site throttled fetches (bounded concurrency, spaced
//!    starts), count and result extraction, ignore and not-typo filtering
//! 3. **Caching**: identical requests share one scan until the cache is flushed
//! 4. **Output**: JSON report, CSV table, chart JSON and Markdown

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod config;
mod error;
mod extract;
mod fetch;
mod idioms;
mod limiter;
mod models;
mod not_typo;
mod outputs;
mod query;
mod report;
mod scanner;
mod sites;
mod utils;

use cli::{Cli, Command, IdiomsArgs, TyposArgs};
use config::{TyposConfig, load_sites, typo_site};
use error::ReportError;
use fetch::HttpFetcher;
use idioms::{GeneratedPhrase, IdiomSpec, generate_phrases, phrase_texts};
use limiter::Throttle;
use models::ScanReport;
use outputs::{json, markdown, write_dated};
use report::{AxisType, LineChart, csv_lines, failed_phrases, group_by_template, phrase_counts_table};
use scanner::{ScanRequest, ScanSettings, Scanner};
use utils::{ensure_writable_dir, run_stamp};

/// What to do with a finished idiom scan.
struct IdiomOutput {
    spec: IdiomSpec,
    phrases: Vec<GeneratedPhrase>,
    baseline: String,
    unscaled: bool,
    y_axis: AxisType,
}

/// A scan request plus how to present its report.
struct Job {
    name: &'static str,
    request: ScanRequest,
    idioms: Option<IdiomOutput>,
}

fn typos_job(args: TyposArgs) -> Job {
    let config = TyposConfig::from_overrides(
        args.overrides.typos.as_deref(),
        args.overrides.not_typos.as_deref(),
    );
    let site = typo_site(&config, Some(args.max_days), args.ignore.as_deref());
    info!(phrases = site.phrases.len(), max_days = args.max_days, ignore = site.ignore.len(), "Prepared typo scan");
    Job {
        name: "typos",
        request: ScanRequest {
            sites: vec![site],
            notify: args.notify,
        },
        idioms: None,
    }
}

async fn idioms_job(args: IdiomsArgs) -> Result<Job, Box<dyn Error>> {
    let spec = args.spec.unwrap_or_default().or_defaults();
    let phrases = generate_phrases(&spec);
    let texts = phrase_texts(&phrases);

    let mut sites = match &args.sites {
        Some(path) => load_sites(path).await?,
        None => sites::idiom_sites(),
    };
    if !sites.iter().any(|s| s.name == args.baseline) {
        return Err(ReportError::MissingBaseline(args.baseline).into());
    }
    for site in &mut sites {
        site.phrases = texts.clone();
    }
    info!(%spec, phrases = texts.len(), sites = sites.len(), baseline = %args.baseline, "Prepared idiom scan");

    Ok(Job {
        name: "idioms",
        request: ScanRequest { sites, notify: None },
        idioms: Some(IdiomOutput {
            spec,
            phrases,
            baseline: args.baseline,
            unscaled: args.unscaled,
            y_axis: args.y_axis,
        }),
    })
}

/// Write or print everything derived from one report.
async fn emit(job: &Job, report: &ScanReport, output_dir: Option<&str>) -> Result<(), Box<dyn Error>> {
    let failed = failed_phrases(report);
    if !failed.is_empty() {
        warn!(count = failed.len(), "Some searches failed and report -1");
    }

    let csv = csv_lines(&phrase_counts_table(report)).join("\n") + "\n";
    let (date, time) = run_stamp(Utc::now());
    let stem = format!("{time}_{}", job.name);

    let (md, chart_json) = match &job.idioms {
        None => (markdown::typo_digest(report), None),
        Some(idioms) => {
            let chart = LineChart::build(report, &idioms.spec, &idioms.baseline)?;
            let view = chart.view(idioms.unscaled, idioms.y_axis);
            let md = markdown::idiom_tables(&group_by_template(report, &idioms.phrases));
            (md, Some(json::chart_json(&chart, view)?))
        }
    };

    let Some(dir) = output_dir else {
        println!("{csv}");
        println!("{md}");
        if let Some(chart_json) = chart_json {
            println!("{chart_json}");
        }
        return Ok(());
    };

    json::write_report(report, dir, &date, &stem).await?;
    write_dated(dir, &date, &format!("{stem}.csv"), &csv).await?;
    write_dated(dir, &date, &format!("{stem}.md"), &md).await?;
    if let Some(chart_json) = chart_json {
        write_dated(dir, &date, &format!("{stem}_chart.json"), &chart_json).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Could not load .env; continuing with the process environment"),
    }

    let start_time = std::time::Instant::now();
    info!("phrase_scan starting up");

    let args = Cli::parse();
    debug!(?args.output_dir, concurrency = args.concurrency, delay_millis = args.delay_millis, "Parsed CLI arguments");

    let job = match args.command {
        Command::Config(overrides) => {
            let config = TyposConfig::from_overrides(overrides.typos.as_deref(), overrides.not_typos.as_deref());
            println!("{}", json::to_json(&config)?);
            return Ok(());
        }
        Command::Idioms(idioms) if idioms.list_candidates => {
            for candidate in IdiomSpec::candidates() {
                println!("{candidate}");
            }
            return Ok(());
        }
        Command::Idioms(idioms) => idioms_job(idioms).await?,
        Command::Typos(typos) => typos_job(typos),
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Output directory is not writable (fix perms or choose a different path)");
            return Err(e);
        }
    }

    let settings = ScanSettings {
        throttle: Throttle::new(args.concurrency, Duration::from_millis(args.delay_millis)),
        request_timeout: Duration::from_secs(args.timeout_secs),
    };
    let scanner = Scanner::new(HttpFetcher::new(settings.request_timeout)?, settings);

    let cancel = scanner.cancel_token();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received; cancelling in-flight queries");
                cancel.cancel();
            }
        }
    });

    let mut ticker = args
        .interval_secs
        .map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
    let mut runs: u32 = 0;

    loop {
        if let Some(ticker) = ticker.as_mut() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }

        if runs > 0 && args.flush_every > 0 && runs % args.flush_every == 0 {
            let cached = scanner.cache().len().await;
            debug!(cached, runs, "Flushing scan cache before rescan");
            scanner.cache().flush().await;
        }

        let report = scanner.scan(&job.request).await?;
        if let Err(e) = emit(&job, &report, args.output_dir.as_deref()).await {
            error!(error = %e, "Failed to write scan outputs");
        }
        runs += 1;

        if ticker.is_none() || cancel.is_cancelled() {
            break;
        }
        info!(runs, "Waiting for next scan");
    }

    info!(runs, elapsed_ms = start_time.elapsed().as_millis() as u64, "phrase_scan finished");
    Ok(())
}
