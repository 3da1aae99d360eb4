//! Markdown renderings of scan results.
//!
//! - [`typo_digest`]: per phrase, the surviving articles with links
//! - [`idiom_tables`]: one table per idiom template and quantity category

use crate::models::{FAILED_SEARCH, ScanReport};
use crate::report::{TemplateGroup, failed_phrases};
use crate::utils::slugify;
use std::fmt::Write;

fn line(md: &mut String, text: impl AsRef<str>) {
    md.push_str(text.as_ref());
    md.push('\n');
}

/// A digest of every typo found, grouped by site then phrase.
///
/// Phrases whose search failed are listed as such rather than as clean.
pub fn typo_digest(report: &ScanReport) -> String {
    let mut md = String::new();
    line(&mut md, format!("# Typo scan {}\n", report.scanned_at));

    for site in &report.sites {
        line(&mut md, format!("## {}\n", site.name));

        let found: Vec<_> = site.results.iter().filter(|r| !r.results.is_empty()).collect();
        if found.is_empty() {
            line(&mut md, "No typos found.\n");
        } else {
            for r in &found {
                line(&mut md, format!("- [{}](#{}) ({})", r.phrase, slugify(&r.phrase), r.results.len()));
            }
            md.push('\n');
        }

        for r in found {
            line(
                &mut md,
                format!(
                    "### {}\n\n{} results, {} ignored, {} not typos. [Search]({})\n",
                    r.phrase, r.result, r.ignored_count, r.not_typo_count, r.query
                ),
            );
            for rec in &r.results {
                let mut entry = format!("- **[{}]({})**", rec.heading, rec.url);
                if !rec.section.is_empty() {
                    let _ = write!(entry, " _{}_", rec.section);
                }
                if !rec.date.is_empty() {
                    let _ = write!(entry, " {}", rec.date);
                }
                line(&mut md, entry);
                if let Some(cropped) = &rec.standfirst_cropped {
                    line(&mut md, format!("  > {cropped}"));
                }
                if let Some(link) = &rec.notification_link {
                    line(&mut md, format!("  [Report this typo]({link})"));
                }
            }
            md.push('\n');
        }
    }

    let failed = failed_phrases(report);
    if !failed.is_empty() {
        line(&mut md, "## Failed searches\n");
        for (site, phrase) in failed {
            line(&mut md, format!("- {site}: `{phrase}` ({FAILED_SEARCH})"));
        }
    }
    md
}

/// Markdown tables of idiom counts, one per template and category.
pub fn idiom_tables(groups: &[TemplateGroup]) -> String {
    let mut md = String::new();
    for group in groups {
        line(&mut md, format!("## {}\n", group.template));
        for (category, rows) in &group.by_category {
            let label = serde_json::to_value(category)
                .ok()
                .and_then(|v| v.as_str().map(|s| s.replace('_', " ")))
                .unwrap_or_default();
            line(&mut md, format!("### {label}\n"));
            line(&mut md, format!("| quantity | {} |", group.sites.join(" | ")));
            line(&mut md, format!("|---|{}", "---|".repeat(group.sites.len())));
            for row in rows {
                line(&mut md, format!("| {} | {} |", row.quantity, row.counts.join(" | ")));
            }
            md.push('\n');
        }
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idioms::{IdiomSpec, generate_phrases};
    use crate::models::{QueryOutcome, QueryResult, QueryTask, ResultRecord, SiteScan};
    use crate::report::group_by_template;

    fn task(phrase: &str) -> QueryTask {
        QueryTask {
            site: "ft.com".to_string(),
            phrase: phrase.to_string(),
            query: format!("https://www.ft.com/search?q=%22{phrase}%22"),
        }
    }

    fn record() -> ResultRecord {
        ResultRecord {
            section: "World".to_string(),
            path: "/content/3".to_string(),
            url: "https://www.ft.com/content/3".to_string(),
            heading: "Real typo".to_string(),
            standfirst: "said <mark>the</mark> <mark>a</mark> minister".to_string(),
            date: "June 8, 2019".to_string(),
            standfirst_cropped: Some("said the a minister".to_string()),
            notification_link: Some("mailto:desk@example.com".to_string()),
        }
    }

    fn site(results: Vec<QueryResult>) -> ScanReport {
        ScanReport {
            scanned_at: "2026-10-19T00:00:00Z".to_string(),
            duration_millis: 1,
            sites: vec![SiteScan {
                name: "ft.com".to_string(),
                border_color: None,
                search_duration_millis: 1,
                results,
            }],
        }
    }

    #[test]
    fn test_typo_digest_lists_records_and_failures() {
        let mut hit = QueryResult::failed(&task("the a"), QueryOutcome::Counted);
        hit.result = "3".to_string();
        hit.results = vec![record()];
        hit.not_typo_count = 2;
        let gone = QueryResult::failed(&task("a a"), QueryOutcome::TimedOut);

        let md = typo_digest(&site(vec![hit, gone]));

        assert!(md.contains("- [the a](#the-a) (1)"));
        assert!(md.contains("3 results, 0 ignored, 2 not typos."));
        assert!(md.contains("**[Real typo](https://www.ft.com/content/3)** _World_ June 8, 2019"));
        assert!(md.contains("  > said the a minister"));
        assert!(md.contains("[Report this typo](mailto:desk@example.com)"));
        assert!(md.contains("## Failed searches"));
        assert!(md.contains("- ft.com: `a a` (-1)"));
    }

    #[test]
    fn test_typo_digest_clean_site() {
        let mut clean = QueryResult::failed(&task("with with"), QueryOutcome::NoResults);
        clean.result = "0".to_string();
        let md = typo_digest(&site(vec![clean]));
        assert!(md.contains("No typos found."));
        assert!(!md.contains("Failed searches"));
    }

    #[test]
    fn test_idiom_tables() {
        let spec: IdiomSpec = "AXN:according to,source,sources".parse().unwrap();
        let mut r = QueryResult::failed(&task("according to a source"), QueryOutcome::Counted);
        r.result = "12".to_string();
        let report = site(vec![r]);

        let md = idiom_tables(&group_by_template(&report, &generate_phrases(&spec)));

        assert!(md.contains("## according to _ sources"));
        assert!(md.contains("### singular number"));
        assert!(md.contains("| quantity | ft.com |"));
        assert!(md.contains("| a | 12 |"));
        assert!(md.contains("### plural amount"));
    }
}
