//! Data models for site descriptors, query tasks and scan results.
//!
//! This module defines the structures that flow through a scan:
//! - [`SiteDescriptor`]: what to query on one news site and how to read its pages
//! - [`QueryTask`]: one (site, phrase) pair bound to a URL
//! - [`QueryResult`]: what came back for a task, including the `"-1"` sentinel
//! - [`ResultRecord`]: one article pulled out of a result page
//! - [`SiteScan`] / [`ScanReport`]: the assembled output of a scan

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count reported when a query could not be fetched or its page could not be read.
///
/// Kept distinct from `"0"`, which means the site explicitly said "no results".
pub const FAILED_SEARCH: &str = "-1";

/// Count reported when the site explicitly said there were no results.
pub const NO_RESULTS: &str = "0";

/// Configuration for one search site.
///
/// Patterns are regex source strings; they are compiled when a scan is
/// prepared, so a bad pattern fails the scan up front rather than per query.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SiteDescriptor {
    /// Unique name, also the column header in tables (e.g. `ft.com`).
    pub name: String,
    /// Origin used to turn result paths into absolute URLs.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Search URL the quoted phrase is appended to. `{max_days}` is replaced
    /// by the lookback window.
    pub base_query: String,
    /// Pattern whose first capture group is the result count.
    pub count_pattern: String,
    /// Pattern that only matches an explicit "no results" page.
    pub no_results_pattern: String,
    /// Ordered pieces of the per-result pattern. Pieces are joined with a lazy
    /// gap and use the named groups `section`, `path`, `heading`,
    /// `standfirst` and `date`.
    #[serde(default)]
    pub each_result: Vec<String>,
    /// Phrase → regex fragments of known false-positive contexts.
    #[serde(default)]
    pub not_typos: BTreeMap<String, Vec<String>>,
    /// Patterns identifying results to drop (matched case-insensitively).
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Phrases to query, already deduplicated.
    #[serde(default)]
    pub phrases: Vec<String>,
    /// Chart colour for this site's series.
    #[serde(default)]
    pub border_color: Option<String>,
    /// Lookback window substituted into `{max_days}`.
    #[serde(default)]
    pub max_days: Option<u32>,
}

/// A single (site, phrase) query, created when a site is primed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTask {
    pub site: String,
    pub phrase: String,
    pub query: String,
}

/// How a query ended. Every non-`Counted`/`NoResults` outcome reports `"-1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The count pattern matched.
    Counted,
    /// The no-results pattern matched.
    NoResults,
    /// The page came back but neither pattern matched.
    Unparsed,
    /// The request failed before a body could be read.
    FetchFailed,
    /// The request exceeded the per-request timeout.
    TimedOut,
    /// The scan was cancelled before this query finished.
    Cancelled,
}

/// The result of executing one [`QueryTask`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub phrase: String,
    pub query: String,
    /// HTTP status, when a response arrived.
    pub status: Option<u16>,
    /// Time until the response headers arrived.
    pub duration_millis: Option<u64>,
    /// Raw count: digits, `"0"`, or `"-1"`.
    pub result: String,
    pub outcome: QueryOutcome,
    /// Extracted articles, after ignore and not-typo filtering.
    #[serde(default)]
    pub results: Vec<ResultRecord>,
    #[serde(default)]
    pub ignored_count: usize,
    #[serde(default)]
    pub not_typo_count: usize,
}

impl QueryResult {
    /// A result carrying the failure sentinel and no records.
    pub fn failed(task: &QueryTask, outcome: QueryOutcome) -> Self {
        Self {
            phrase: task.phrase.clone(),
            query: task.query.clone(),
            status: None,
            duration_millis: None,
            result: FAILED_SEARCH.to_string(),
            outcome,
            results: Vec::new(),
            ignored_count: 0,
            not_typo_count: 0,
        }
    }

    /// The count as a number; `-1` for anything that is not a clean integer.
    pub fn count(&self) -> i64 {
        self.result.parse().unwrap_or(-1)
    }
}

/// One article extracted from a search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub section: String,
    pub path: String,
    pub url: String,
    pub heading: String,
    pub standfirst: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standfirst_cropped: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_link: Option<String>,
}

/// All query results for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteScan {
    pub name: String,
    pub border_color: Option<String>,
    pub search_duration_millis: u64,
    /// One entry per phrase, in phrase-list order.
    pub results: Vec<QueryResult>,
}

impl SiteScan {
    /// Look up the result for a phrase.
    pub fn result_for(&self, phrase: &str) -> Option<&QueryResult> {
        self.results.iter().find(|r| r.phrase == phrase)
    }
}

/// A completed scan across every requested site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// RFC 3339 timestamp of when the scan started.
    pub scanned_at: String,
    pub duration_millis: u64,
    /// Sites in request order.
    pub sites: Vec<SiteScan>,
}

impl ScanReport {
    pub fn site(&self, name: &str) -> Option<&SiteScan> {
        self.sites.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> QueryTask {
        QueryTask {
            site: "ft.com".to_string(),
            phrase: "the the".to_string(),
            query: "https://www.ft.com/search?q=%22the%20the%22".to_string(),
        }
    }

    #[test]
    fn test_failed_result_uses_sentinel() {
        let r = QueryResult::failed(&task(), QueryOutcome::TimedOut);
        assert_eq!(r.result, FAILED_SEARCH);
        assert_eq!(r.count(), -1);
        assert!(r.results.is_empty());
        assert_ne!(r.result, NO_RESULTS);
    }

    #[test]
    fn test_count_parses_digits() {
        let mut r = QueryResult::failed(&task(), QueryOutcome::Counted);
        r.result = "2578".to_string();
        assert_eq!(r.count(), 2578);
        r.result = "0".to_string();
        assert_eq!(r.count(), 0);
    }

    #[test]
    fn test_site_descriptor_yaml_defaults() {
        let yaml = r#"
name: example.com
base_query: "https://example.com/search?q="
count_pattern: "([\\d,]+) results"
no_results_pattern: "No results"
phrases: ["the the"]
"#;
        let site: SiteDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(site.name, "example.com");
        assert!(site.each_result.is_empty());
        assert!(site.not_typos.is_empty());
        assert_eq!(site.phrases, vec!["the the".to_string()]);
        assert_eq!(site.max_days, None);
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&QueryOutcome::FetchFailed).unwrap();
        assert_eq!(json, "\"fetch_failed\"");
    }
}
