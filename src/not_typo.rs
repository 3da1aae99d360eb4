//! False-positive suppression for typo phrases.
//!
//! A search for "the a" also hits "the A$5.1bn forecast" because the site
//! highlights each word separately. Each phrase can register regex fragments
//! describing such benign contexts ("not-typos"); the fragments are combined
//! into one alternation per phrase. Only documented fragments suppress: a new
//! kind of false positive passes through until someone adds a fragment.
//!
//! The ignore list is a separate, coarser filter that drops whole sections
//! (an opinion column, say) before not-typo filtering runs.

use crate::error::ScanError;
use crate::extract::HIGHLIGHT_OPEN;
use crate::models::ResultRecord;
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, HashMap};

/// Compiled not-typo patterns, keyed by exact phrase text.
#[derive(Debug, Clone, Default)]
pub struct NotTypoFilter {
    by_phrase: HashMap<String, Regex>,
}

impl NotTypoFilter {
    /// Compile one alternation per phrase. Phrases with no fragments get no
    /// pattern and therefore suppress nothing.
    pub fn compile(fragments: &BTreeMap<String, Vec<String>>) -> Result<Self, regex::Error> {
        let mut by_phrase = HashMap::new();
        for (phrase, frags) in fragments {
            if frags.is_empty() {
                continue;
            }
            let alternation = frags
                .iter()
                .map(|f| format!("(?:{f})"))
                .collect::<Vec<_>>()
                .join("|");
            by_phrase.insert(phrase.clone(), Regex::new(&alternation)?);
        }
        Ok(Self { by_phrase })
    }

    pub fn has_filter(&self, phrase: &str) -> bool {
        self.by_phrase.contains_key(phrase)
    }

    /// True when the record is a known false positive for `phrase`.
    ///
    /// The snippet is checked when it carries highlight markers; otherwise the
    /// match must have been in the heading, so the heading is checked.
    pub fn is_not_typo(&self, phrase: &str, record: &ResultRecord) -> bool {
        let Some(re) = self.by_phrase.get(phrase) else {
            return false;
        };
        let target = if record.standfirst.contains(HIGHLIGHT_OPEN) {
            &record.standfirst
        } else {
            &record.heading
        };
        re.is_match(target)
    }

    /// Split records into (kept, number suppressed).
    pub fn apply(&self, phrase: &str, records: Vec<ResultRecord>) -> (Vec<ResultRecord>, usize) {
        if !self.has_filter(phrase) {
            return (records, 0);
        }
        let before = records.len();
        let kept: Vec<_> = records
            .into_iter()
            .filter(|r| !self.is_not_typo(phrase, r))
            .collect();
        let suppressed = before - kept.len();
        (kept, suppressed)
    }
}

/// Case-insensitive patterns identifying records to drop outright.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    pattern: Option<Regex>,
}

impl IgnoreFilter {
    pub fn compile(site: &str, patterns: &[String]) -> Result<Self, ScanError> {
        let patterns: Vec<_> = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| format!("(?:{p})"))
            .collect();
        if patterns.is_empty() {
            return Ok(Self::default());
        }
        let pattern = RegexBuilder::new(&patterns.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|source| ScanError::Pattern {
                site: site.to_string(),
                field: "ignore",
                source,
            })?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Checks section, path, heading and snippet together.
    pub fn is_ignored(&self, record: &ResultRecord) -> bool {
        let Some(re) = &self.pattern else {
            return false;
        };
        let combined = [
            record.section.as_str(),
            record.path.as_str(),
            record.heading.as_str(),
            record.standfirst.as_str(),
        ]
        .join(" ");
        re.is_match(&combined)
    }

    /// Split records into (kept, number ignored).
    pub fn apply(&self, records: Vec<ResultRecord>) -> (Vec<ResultRecord>, usize) {
        if self.pattern.is_none() {
            return (records, 0);
        }
        let before = records.len();
        let kept: Vec<_> = records.into_iter().filter(|r| !self.is_ignored(r)).collect();
        let ignored = before - kept.len();
        (kept, ignored)
    }
}
