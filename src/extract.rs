//! Reading counts and result records out of search result pages.
//!
//! The target sites have no stable API, so extraction is regex driven. It
//! sits behind [`ResultExtractor`] so that a structured-parser backend can
//! replace [`RegexExtractor`] without touching the scanner.
//!
//! # Count rules
//!
//! 1. The count pattern matches: its first group, commas stripped, is the count.
//! 2. Otherwise the no-results pattern matches: the count is `"0"`.
//! 3. Otherwise the page is unreadable and the caller reports `"-1"`.
//!
//! Missing an explicit zero message is treated as a failure, never as zero,
//! so markup changes and outages do not show up as quiet zero counts.

use crate::error::ScanError;
use crate::models::{ResultRecord, SiteDescriptor};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

/// Opening tag sites use to highlight the matched words.
pub const HIGHLIGHT_OPEN: &str = "<mark";
const HIGHLIGHT_CLOSE: &str = "</mark>";

/// Characters kept either side of the highlight when cropping a snippet.
pub const CROP_CONTEXT_CHARS: usize = 80;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// What the count patterns made of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountMatch {
    /// Digits only, commas removed.
    Count(String),
    NoResults,
    Unparsed,
}

/// A result record as it appears in the page, before enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub section: String,
    pub path: String,
    pub heading: String,
    pub standfirst: String,
    pub date: String,
}

/// Everything read from one page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub count: CountMatch,
    /// Records in document order. Empty unless the count is non-zero.
    pub records: Vec<RawRecord>,
}

/// Turns a whole response body into a count and result records.
pub trait ResultExtractor {
    fn extract(&self, body: &str) -> Extraction;
}

/// Regex backend built from a [`SiteDescriptor`].
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    count: Regex,
    no_results: Regex,
    each_result: Option<Regex>,
}

impl RegexExtractor {
    /// Compile the site's patterns.
    ///
    /// The `each_result` pieces are joined by a lazy gap that also spans
    /// newlines, so the pieces may sit anywhere after each other in the page.
    pub fn from_site(site: &SiteDescriptor) -> Result<Self, ScanError> {
        let compile = |field: &'static str, pattern: &str| {
            Regex::new(pattern).map_err(|source| ScanError::Pattern {
                site: site.name.clone(),
                field,
                source,
            })
        };

        let count = compile("count", &site.count_pattern)?;
        let no_results = compile("no_results", &site.no_results_pattern)?;
        let each_result = if site.each_result.is_empty() {
            None
        } else {
            let joined = format!("(?s){}", site.each_result.join(".*?"));
            Some(compile("each_result", &joined)?)
        };

        Ok(Self {
            count,
            no_results,
            each_result,
        })
    }

    fn records(&self, body: &str) -> Vec<RawRecord> {
        let Some(re) = &self.each_result else {
            return Vec::new();
        };
        let group = |caps: &regex::Captures<'_>, name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };
        re.captures_iter(body)
            .map(|caps| RawRecord {
                section: group(&caps, "section"),
                path: group(&caps, "path"),
                heading: group(&caps, "heading"),
                standfirst: group(&caps, "standfirst"),
                date: group(&caps, "date"),
            })
            .collect()
    }
}

impl ResultExtractor for RegexExtractor {
    fn extract(&self, body: &str) -> Extraction {
        if let Some(caps) = self.count.captures(body) {
            let digits = caps
                .get(1)
                .map(|m| m.as_str().replace(',', ""))
                .unwrap_or_default();
            if digits.is_empty() {
                warn!("Count pattern matched without a count group; treating page as unparsed");
                return Extraction {
                    count: CountMatch::Unparsed,
                    records: Vec::new(),
                };
            }
            let records = if digits == "0" {
                Vec::new()
            } else {
                self.records(body)
            };
            debug!(count = %digits, records = records.len(), "Count pattern matched");
            return Extraction {
                count: CountMatch::Count(digits),
                records,
            };
        }

        let count = if self.no_results.is_match(body) {
            CountMatch::NoResults
        } else {
            CountMatch::Unparsed
        };
        Extraction {
            count,
            records: Vec::new(),
        }
    }
}

/// Strip tags, decode entities and collapse whitespace.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<String>();
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Cut `text` down to the first highlighted run plus `context` characters on
/// either side. Adjacent highlights (`<mark>the</mark> <mark>the</mark>`) are
/// kept together. Returns `None` when there is no highlight.
pub fn crop_around_highlight(text: &str, context: usize) -> Option<String> {
    let start = text.find(HIGHLIGHT_OPEN)?;
    let mut end = start + text[start..].find(HIGHLIGHT_CLOSE)? + HIGHLIGHT_CLOSE.len();

    loop {
        let rest = &text[end..];
        let trimmed = rest.trim_start();
        if !trimmed.starts_with(HIGHLIGHT_OPEN) {
            break;
        }
        let next = end + (rest.len() - trimmed.len());
        match text[next..].find(HIGHLIGHT_CLOSE) {
            Some(i) => end = next + i + HIGHLIGHT_CLOSE.len(),
            None => break,
        }
    }

    let from = text[..start]
        .char_indices()
        .rev()
        .take(context)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(context)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    let mut cropped = String::new();
    if from > 0 {
        cropped.push('…');
    }
    cropped.push_str(&text[from..to]);
    if to < text.len() {
        cropped.push('…');
    }
    Some(cropped)
}

/// Resolve a result path against the site origin.
pub fn absolute_url(base_url: Option<&str>, path: &str) -> String {
    base_url
        .and_then(|base| Url::parse(base).ok())
        .and_then(|base| base.join(path).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Build a `mailto:` link reporting a suspected typo.
pub fn notification_link(recipient: &str, phrase: &str, record: &ResultRecord) -> String {
    let snippet = record
        .standfirst_cropped
        .as_deref()
        .unwrap_or(&record.standfirst);
    let subject = format!("Possible typo \"{phrase}\": {}", plain_text(&record.heading));
    let body = format!(
        "{}\n\n{}\n\n({}, {})",
        record.url,
        plain_text(snippet),
        record.section,
        record.date
    );
    format!(
        "mailto:{recipient}?subject={}&body={}",
        urlencoding::encode(&subject),
        urlencoding::encode(&body)
    )
}

/// Turn a raw record into a [`ResultRecord`] with URL, cropped snippet and
/// an optional notification link.
pub fn enrich(
    raw: RawRecord,
    base_url: Option<&str>,
    phrase: &str,
    notify: Option<&str>,
) -> ResultRecord {
    let url = absolute_url(base_url, &raw.path);
    let standfirst_cropped = crop_around_highlight(&raw.standfirst, CROP_CONTEXT_CHARS);
    let mut record = ResultRecord {
        section: raw.section,
        path: raw.path,
        url,
        heading: raw.heading,
        standfirst: raw.standfirst,
        date: raw.date,
        standfirst_cropped,
        notification_link: None,
    };
    if let Some(recipient) = notify {
        record.notification_link = Some(notification_link(recipient, phrase, &record));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites;

    const FT_RESULTS: &str = r#"
<h2>Viewing results 1‒25 of 2,578</h2>
<div class="search-item">
 <div class="o-teaser__meta-tag">
  <a class="o-teaser__tag" data-trackable="teaser-tag" href="/global-economy">Global Economy</a>
 </div>
 <div class="o-teaser__heading">
  <a href="/content/21281750" data-trackable="heading-link" class="js-teaser-heading-link">Australia trade surplus misses estimates in April</a>
 </div>
 <p class="o-teaser__standfirst">
  <a href="/content/21281750" data-trackable="standfirst-link" tabindex="-1" class="js-teaser-standfirst-link">
   <span>below <mark class="search-item__highlight">the</mark> <mark class="search-item__highlight">A</mark>$5.1bn forecast</span>
  </a>
 </p>
 <div class="o-teaser__timestamp">
  <time class="o-teaser__timestamp-date" datetime="2019-06-06T02:17:11+0000">June 6, 2019</time>
 </div>
</div>
<div class="search-item">
 <div class="o-teaser__meta-tag">
  <a class="o-teaser__tag" data-trackable="teaser-tag" href="/markets">Markets</a>
 </div>
 <div class="o-teaser__heading">
  <a href="/content/99" data-trackable="heading-link" class="js-teaser-heading-link">Stocks rally</a>
 </div>
 <p class="o-teaser__standfirst">
  <a href="/content/99" data-trackable="standfirst-link" tabindex="-1" class="js-teaser-standfirst-link">
   <span>one of <mark class="search-item__highlight">the</mark> <mark class="search-item__highlight">the</mark> best days</span>
  </a>
 </p>
 <div class="o-teaser__timestamp">
  <time class="o-teaser__timestamp-date" datetime="2019-06-07T02:17:11+0000">June 7, 2019</time>
 </div>
</div>
"#;

    fn ft() -> RegexExtractor {
        RegexExtractor::from_site(&sites::ft_com_detailed()).unwrap()
    }

    #[test]
    fn test_count_with_commas_is_stripped() {
        let ex = ft().extract("<p>Viewing results 1‒25 of 2,578</p>");
        assert_eq!(ex.count, CountMatch::Count("2578".to_string()));
    }

    #[test]
    fn test_nytimes_count() {
        let nyt = RegexExtractor::from_site(&sites::nytimes_com()).unwrap();
        let ex = nyt.extract("<p>Showing 1,234 results for:</p>");
        assert_eq!(ex.count, CountMatch::Count("1234".to_string()));
        assert!(ex.records.is_empty());
    }

    #[test]
    fn test_no_results_page_is_zero() {
        let ex = ft().extract("<h1>No results found</h1>");
        assert_eq!(ex.count, CountMatch::NoResults);
        assert!(ex.records.is_empty());
    }

    #[test]
    fn test_unrecognised_page_is_unparsed() {
        let ex = ft().extract("<html><body>Service unavailable</body></html>");
        assert_eq!(ex.count, CountMatch::Unparsed);
        assert!(ex.records.is_empty());
    }

    #[test]
    fn test_records_in_document_order() {
        let ex = ft().extract(FT_RESULTS);
        assert_eq!(ex.count, CountMatch::Count("2578".to_string()));
        assert_eq!(ex.records.len(), 2);

        let first = &ex.records[0];
        assert_eq!(first.section, "Global Economy");
        assert_eq!(first.path, "/content/21281750");
        assert_eq!(first.heading, "Australia trade surplus misses estimates in April");
        assert!(first.standfirst.contains("A</mark>$5.1bn"));
        assert_eq!(first.date, "June 6, 2019");

        assert_eq!(ex.records[1].section, "Markets");
        assert_eq!(ex.records[1].date, "June 7, 2019");
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let mut site = sites::ft_com();
        site.count_pattern = "([".to_string();
        let err = RegexExtractor::from_site(&site).unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_plain_text_strips_markup() {
        assert_eq!(
            plain_text("below <mark class=\"x\">the</mark>\n  <mark>A</mark>&amp;E"),
            "below the A&E"
        );
    }

    #[test]
    fn test_crop_keeps_adjacent_highlights() {
        let text = "aaaaaaaaaa <mark>the</mark> <mark>the</mark> bbbbbbbbbb";
        let cropped = crop_around_highlight(text, 3).unwrap();
        assert_eq!(cropped, "…aa <mark>the</mark> <mark>the</mark> bb…");
    }

    #[test]
    fn test_crop_without_highlight() {
        assert_eq!(crop_around_highlight("nothing here", 10), None);
    }

    #[test]
    fn test_crop_short_text_has_no_ellipsis() {
        let text = "x <mark>a</mark> y";
        assert_eq!(crop_around_highlight(text, 10).unwrap(), text);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url(Some("https://www.ft.com"), "/content/99"),
            "https://www.ft.com/content/99"
        );
        assert_eq!(absolute_url(None, "/content/99"), "/content/99");
    }

    #[test]
    fn test_enrich_builds_notification_link() {
        let raw = RawRecord {
            section: "Markets".to_string(),
            path: "/content/99".to_string(),
            heading: "Stocks rally".to_string(),
            standfirst: "one of <mark>the</mark> <mark>the</mark> best".to_string(),
            date: "June 7, 2019".to_string(),
        };
        let record = enrich(raw, Some("https://www.ft.com"), "the the", Some("desk@example.com"));
        assert_eq!(record.url, "https://www.ft.com/content/99");
        assert!(record.standfirst_cropped.is_some());
        let link = record.notification_link.unwrap();
        assert!(link.starts_with("mailto:desk@example.com?subject="));
        assert!(link.contains("Stocks%20rally"));
        assert!(link.contains("https%3A%2F%2Fwww.ft.com%2Fcontent%2F99"));
    }

    #[test]
    fn test_enrich_without_recipient() {
        let record = enrich(RawRecord::default(), None, "a a", None);
        assert_eq!(record.notification_link, None);
    }
}
