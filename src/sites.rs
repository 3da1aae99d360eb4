//! Built-in search site descriptors.
//!
//! | Site | Count text | Detail records |
//! |------|------------|----------------|
//! | ft.com | `Viewing results 1‒25 of 2,578` | yes ([`ft_com_detailed`]) |
//! | www.nytimes.com | `Showing 493,595 results for:` | no |
//!
//! Descriptors can also be loaded from YAML, see [`crate::config::load_sites`].

use crate::models::SiteDescriptor;

/// ft.com search, counts only.
pub fn ft_com() -> SiteDescriptor {
    SiteDescriptor {
        name: "ft.com".to_string(),
        base_url: Some("https://www.ft.com".to_string()),
        base_query: "https://www.ft.com/search?q=".to_string(),
        // The range separator is a figure dash (U+2012).
        count_pattern: r"Viewing results? \d+‒\d+ of ([\d,]+)".to_string(),
        no_results_pattern: "No results found".to_string(),
        border_color: Some("orange".to_string()),
        ..Default::default()
    }
}

/// ft.com search restricted to the last `{max_days}` days, with one record
/// extracted per search result teaser.
pub fn ft_com_detailed() -> SiteDescriptor {
    SiteDescriptor {
        base_query: "https://www.ft.com/search?dateRange=now-{max_days}d&q=".to_string(),
        each_result: vec![
            r#"class="search-item""#.to_string(),
            r#"class="o-teaser__tag"[^>]+>(?P<section>[^<]+)<"#.to_string(),
            r#"class="o-teaser__heading""#.to_string(),
            r#"<a href="(?P<path>[^"]+)"[^>]+>(?P<heading>.+?)</a>"#.to_string(),
            r#"class="o-teaser__standfirst""#.to_string(),
            r#"<a[^>]*>\s*<span>(?P<standfirst>.+?)</span>\s*</a>"#.to_string(),
            r#"class="o-teaser__timestamp-date"[^>]+>(?P<date>[^<]+)<"#.to_string(),
        ],
        ..ft_com()
    }
}

/// New York Times search, counts only.
pub fn nytimes_com() -> SiteDescriptor {
    SiteDescriptor {
        name: "www.nytimes.com".to_string(),
        base_url: Some("https://www.nytimes.com".to_string()),
        base_query: "https://www.nytimes.com/search?query=".to_string(),
        count_pattern: r"Showing ([\d,]+) results? for:".to_string(),
        no_results_pattern: "Showing 0 results for:".to_string(),
        border_color: Some("black".to_string()),
        ..Default::default()
    }
}

/// Sites compared by the idiom scan, baseline first.
pub fn idiom_sites() -> Vec<SiteDescriptor> {
    vec![ft_com(), nytimes_com()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{RegexExtractor, ResultExtractor};

    #[test]
    fn test_builtin_sites_compile() {
        for site in [ft_com(), ft_com_detailed(), nytimes_com()] {
            assert!(RegexExtractor::from_site(&site).is_ok(), "{}", site.name);
        }
    }

    #[test]
    fn test_detailed_keeps_site_identity() {
        let detailed = ft_com_detailed();
        assert_eq!(detailed.name, "ft.com");
        assert_eq!(detailed.count_pattern, ft_com().count_pattern);
        assert!(detailed.base_query.contains("{max_days}"));
    }

    #[test]
    fn test_nytimes_zero_page_counts_as_zero() {
        // "Showing 0 results for:" also satisfies the count pattern.
        let ex = RegexExtractor::from_site(&nytimes_com())
            .unwrap()
            .extract("Showing 0 results for: \"a an\"");
        assert_eq!(ex.count, crate::extract::CountMatch::Count("0".to_string()));
        assert!(ex.records.is_empty());
    }

    #[test]
    fn test_idiom_sites_have_unique_names() {
        let sites = idiom_sites();
        assert_eq!(sites.len(), 2);
        assert_ne!(sites[0].name, sites[1].name);
    }
}
