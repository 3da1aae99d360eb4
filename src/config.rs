//! Typo scan configuration and site descriptor files.
//!
//! The typo list and its known false positives have built-in defaults. Both
//! can be overridden with JSON (usually from the `TYPOS` and `NOT_TYPOS`
//! environment variables). A bad override is logged and ignored: the scan
//! runs on the defaults rather than not at all.

use crate::error::ConfigError;
use crate::models::SiteDescriptor;
use crate::not_typo::NotTypoFilter;
use crate::query::DEFAULT_MAX_DAYS;
use crate::sites;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument, warn};

pub const DEFAULT_TYPOS: &[&str] = &[
    "the the",
    "the there",
    "the their",
    "a the",
    "an the",
    "the a",
    "the an",
    "a an",
    "a a",
    "their their",
    "with with",
];

/// Highlighted "A" followed by a currency sign, an ampersand or a hyphen:
/// `A$5.1bn`, `A&E`, `A-level`.
fn default_not_typos() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "the a".to_string(),
            vec![
                r"A</mark>\$".to_string(),
                r"A</mark>&amp;".to_string(),
                r"A</mark>-".to_string(),
            ],
        ),
        (
            "a a".to_string(),
            vec![r"A</mark>&amp;".to_string(), r"A</mark>-".to_string()],
        ),
    ])
}

/// The phrases a typo scan looks for, and the contexts that excuse them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TyposConfig {
    pub phrases: Vec<String>,
    pub not_typos: BTreeMap<String, Vec<String>>,
}

impl Default for TyposConfig {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_TYPOS.iter().map(|s| s.to_string()).collect(),
            not_typos: default_not_typos(),
        }
    }
}

impl TyposConfig {
    /// Start from the defaults and apply whichever overrides parse.
    ///
    /// `typos_json` is a JSON array of phrases; `not_typos_json` a JSON object
    /// of phrase to fragment list. Each override falls back independently.
    pub fn from_overrides(typos_json: Option<&str>, not_typos_json: Option<&str>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = typos_json.filter(|s| !s.trim().is_empty()) {
            match serde_json::from_str::<Vec<String>>(raw) {
                Ok(phrases) => {
                    config.phrases = phrases
                        .into_iter()
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .unique()
                        .collect();
                    info!(count = config.phrases.len(), "Using typo phrases override");
                }
                Err(e) => warn!(error = %e, "Could not parse typo phrases override; using defaults"),
            }
        }

        if let Some(raw) = not_typos_json.filter(|s| !s.trim().is_empty()) {
            match serde_json::from_str::<BTreeMap<String, Vec<String>>>(raw) {
                Ok(map) => {
                    let map: BTreeMap<String, Vec<String>> = map
                        .into_iter()
                        .map(|(phrase, frags)| (phrase.trim().to_string(), frags))
                        .filter(|(phrase, _)| !phrase.is_empty())
                        .collect();
                    match NotTypoFilter::compile(&map) {
                        Ok(_) => {
                            info!(phrases = map.len(), "Using not-typo override");
                            config.not_typos = map;
                        }
                        Err(e) => warn!(error = %e, "Not-typo override has a bad fragment; using defaults"),
                    }
                }
                Err(e) => warn!(error = %e, "Could not parse not-typo override; using defaults"),
            }
        }

        config
    }
}

/// Split a comma-separated ignore list, dropping empty entries.
///
/// Entries are literal text, matched as case-insensitive substrings: regex
/// metacharacters are escaped. Site files keep raw patterns in `ignore:`.
pub fn parse_ignore_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(regex::escape)
        .collect()
}

/// The ft.com detail site set up for a typo scan.
pub fn typo_site(config: &TyposConfig, max_days: Option<u32>, ignore_csv: Option<&str>) -> SiteDescriptor {
    SiteDescriptor {
        phrases: config.phrases.clone(),
        not_typos: config.not_typos.clone(),
        ignore: ignore_csv.map(parse_ignore_csv).unwrap_or_default(),
        max_days: Some(max_days.unwrap_or(DEFAULT_MAX_DAYS)),
        ..sites::ft_com_detailed()
    }
}

/// Read a YAML list of site descriptors.
///
/// # Arguments
///
/// * `path` - YAML file holding a sequence of [`SiteDescriptor`]s
///
/// # Returns
///
/// The descriptors in file order. Patterns are not compiled here; a bad
/// pattern surfaces when the scan is prepared.
///
/// # Errors
///
/// [`ConfigError::Read`] if the file cannot be read, [`ConfigError::Parse`]
/// if it is not a valid descriptor list.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_sites(path: impl AsRef<Path>) -> Result<Vec<SiteDescriptor>, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
    let sites = parse_sites(&raw).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })?;
    info!(count = sites.len(), "Loaded site descriptors");
    Ok(sites)
}

pub fn parse_sites(yaml: &str) -> Result<Vec<SiteDescriptor>, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TyposConfig::default();
        assert_eq!(config.phrases.len(), 11);
        assert_eq!(config.phrases[0], "the the");
        assert!(config.not_typos.contains_key("the a"));
        assert!(NotTypoFilter::compile(&config.not_typos).is_ok());
    }

    #[test]
    fn test_overrides_apply() {
        let config = TyposConfig::from_overrides(
            Some(r#"["of of", " to to ", "of of", ""]"#),
            Some(r#"{"of of": ["of</mark> course"]}"#),
        );
        assert_eq!(config.phrases, vec!["of of", "to to"]);
        assert_eq!(config.not_typos["of of"], vec!["of</mark> course"]);
    }

    #[test]
    fn test_malformed_overrides_fall_back() {
        let config = TyposConfig::from_overrides(Some("not json"), Some(r#"{"the a": ["("]}"#));
        assert_eq!(config, TyposConfig::default());

        let config = TyposConfig::from_overrides(Some(r#"{"a": 1}"#), Some("[1, 2]"));
        assert_eq!(config, TyposConfig::default());
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        assert_eq!(TyposConfig::from_overrides(Some("  "), None), TyposConfig::default());
    }

    #[test]
    fn test_parse_ignore_csv() {
        assert_eq!(parse_ignore_csv("alphaville, ,lex"), vec!["alphaville", "lex"]);
        assert!(parse_ignore_csv("").is_empty());
    }

    #[test]
    fn test_ignore_csv_entries_are_literal() {
        let ignore = parse_ignore_csv("alphaville,FT View (opinion");
        assert_eq!(ignore[1], r"FT View \(opinion");
        assert!(crate::not_typo::IgnoreFilter::compile("ft.com", &ignore).is_ok());
    }

    #[test]
    fn test_not_typo_override_keys_are_trimmed() {
        let config = TyposConfig::from_overrides(None, Some(r#"{" the a ": ["A</mark>\\$"], "  ": ["x"]}"#));
        assert_eq!(config.not_typos.keys().collect::<Vec<_>>(), vec!["the a"]);
        assert_eq!(config.not_typos["the a"], vec![r"A</mark>\$"]);
    }

    #[test]
    fn test_typo_site() {
        let site = typo_site(&TyposConfig::default(), None, Some("alphaville"));
        assert_eq!(site.name, "ft.com");
        assert_eq!(site.max_days, Some(7));
        assert_eq!(site.ignore, vec!["alphaville"]);
        assert_eq!(site.phrases.len(), 11);
        assert!(!site.each_result.is_empty());

        let site = typo_site(&TyposConfig::default(), Some(3), None);
        assert_eq!(site.max_days, Some(3));
        assert!(site.ignore.is_empty());
    }

    #[test]
    fn test_parse_sites_yaml() {
        let yaml = r#"
- name: www.telegraph.co.uk
  base_query: "https://www.telegraph.co.uk/search.html?q="
  count_pattern: "About ([\\d,]+) results"
  no_results_pattern: "No Results"
  phrases: ["according to a source"]
  border_color: blue
"#;
        let sites = parse_sites(yaml).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "www.telegraph.co.uk");
        assert_eq!(sites[0].count_pattern, r"About ([\d,]+) results");
        assert!(sites[0].each_result.is_empty());
        assert_eq!(sites[0].border_color.as_deref(), Some("blue"));
    }

    #[tokio::test]
    async fn test_load_sites_missing_file() {
        let err = load_sites("/nonexistent/sites.yaml").await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
