//! Query URL construction.
//!
//! Each phrase is wrapped in double quotes (exact-phrase search), percent
//! encoded and appended to the site's search URL. The phrase string is the
//! key for its task, so callers hand in deduplicated phrase lists.

use crate::models::{QueryTask, SiteDescriptor};

/// Placeholder in `base_query` replaced by the lookback window in days.
pub const MAX_DAYS_PLACEHOLDER: &str = "{max_days}";

/// Lookback window used when a site template asks for one but none was set.
pub const DEFAULT_MAX_DAYS: u32 = 7;

/// Build the search URL for one phrase on one site.
pub fn build_query_url(site: &SiteDescriptor, phrase: &str) -> String {
    let base = if site.base_query.contains(MAX_DAYS_PLACEHOLDER) {
        let days = site.max_days.unwrap_or(DEFAULT_MAX_DAYS);
        site.base_query.replace(MAX_DAYS_PLACEHOLDER, &days.to_string())
    } else {
        site.base_query.clone()
    };
    let quoted = format!("\"{phrase}\"");
    format!("{base}{}", urlencoding::encode(&quoted))
}

/// Create one task per phrase, in phrase-list order.
pub fn prime_site(site: &SiteDescriptor) -> Vec<QueryTask> {
    site.phrases
        .iter()
        .map(|phrase| QueryTask {
            site: site.name.clone(),
            phrase: phrase.clone(),
            query: build_query_url(site, phrase),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(base_query: &str) -> SiteDescriptor {
        SiteDescriptor {
            name: "ft.com".to_string(),
            base_query: base_query.to_string(),
            phrases: vec!["the the".to_string(), "a an".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_phrase_is_quoted_and_encoded() {
        let url = build_query_url(&site("https://www.ft.com/search?q="), "the the");
        assert_eq!(url, "https://www.ft.com/search?q=%22the%20the%22");
    }

    #[test]
    fn test_max_days_is_substituted() {
        let mut s = site("https://www.ft.com/search?dateRange=now-{max_days}d&q=");
        s.max_days = Some(3);
        let url = build_query_url(&s, "a a");
        assert_eq!(url, "https://www.ft.com/search?dateRange=now-3d&q=%22a%20a%22");

        s.max_days = None;
        let url = build_query_url(&s, "a a");
        assert!(url.contains("dateRange=now-7d"));
    }

    #[test]
    fn test_prime_site_keeps_phrase_order() {
        let tasks = prime_site(&site("https://www.ft.com/search?q="));
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].phrase, "the the");
        assert_eq!(tasks[1].phrase, "a an");
        assert!(tasks.iter().all(|t| t.site == "ft.com"));
    }
}
