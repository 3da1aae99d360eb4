//! Idiom specs and phrase generation.
//!
//! An idiom spec names the idioms to count and the standard candles to scale
//! them by:
//!
//! ```text
//! AXN:according to,source,sources|AXN:according to,expert,experts|SC:finance
//! ```
//!
//! `AXN` items (base phrase, singular noun, plural noun) expand into one
//! phrase per quantity word: "according to a source", "according to two
//! sources", "according to dozens of sources", ... `SC` items are queried
//! as-is and used to normalise counts between sites.

use crate::error::SpecError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SINGULAR_NUMBERS: &[&str] = &["a", "an", "one"];
pub const PLURAL_NUMBERS: &[&str] = &[
    "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven", "twelve",
];
pub const PLURAL_AMOUNTS: &[&str] = &[
    "many",
    "some",
    "a few",
    "dozens of",
    "half a dozen",
    "more than half a dozen",
];

const DEFAULT_AXN_NOUNS: &[(&str, &str)] = &[
    ("source", "sources"),
    ("official", "officials"),
    ("economist", "economists"),
    ("expert", "experts"),
    ("poll", "polls"),
    ("analyst", "analysts"),
];
const DEFAULT_BASE_PHRASE: &str = "according to";
const DEFAULT_CANDLES: &[&str] = &["the", "finance", "abc", "news", "political"];

/// An idiom with a quantity slot: `{base} {quantity} {noun}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axn {
    pub base_phrase: String,
    pub singular_noun: String,
    pub plural_noun: String,
}

impl Axn {
    pub fn new(base: &str, singular: &str, plural: &str) -> Self {
        Self {
            base_phrase: base.to_string(),
            singular_noun: singular.to_string(),
            plural_noun: plural.to_string(),
        }
    }

    /// The idiom shape without its quantity word, e.g. `according to _ sources`.
    pub fn template(&self) -> String {
        format!("{} _ {}", self.base_phrase, self.plural_noun)
    }
}

/// What an idiom scan should count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdiomSpec {
    pub axn: Vec<Axn>,
    /// Standard candle phrases.
    pub sc: Vec<String>,
}

impl IdiomSpec {
    /// The idioms and candles scanned when no spec is given.
    pub fn defaults() -> Self {
        Self {
            axn: DEFAULT_AXN_NOUNS
                .iter()
                .map(|(s, p)| Axn::new(DEFAULT_BASE_PHRASE, s, p))
                .collect(),
            sc: DEFAULT_CANDLES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.axn.is_empty() && self.sc.is_empty()
    }

    /// This spec, or the defaults if it names nothing.
    pub fn or_defaults(self) -> Self {
        if self.is_empty() { Self::defaults() } else { self }
    }

    /// One single-idiom spec per default AXN, each paired with the first
    /// default candle. Handy starting points for charts.
    pub fn candidates() -> Vec<Self> {
        let defaults = Self::defaults();
        let primary = defaults.sc.first().cloned();
        defaults
            .axn
            .into_iter()
            .map(|axn| Self {
                axn: vec![axn],
                sc: primary.iter().cloned().collect(),
            })
            .collect()
    }

    pub fn is_candle(&self, phrase: &str) -> bool {
        self.sc.iter().any(|c| c == phrase)
    }
}

impl FromStr for IdiomSpec {
    type Err = SpecError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut spec = IdiomSpec::default();
        for item in text.split('|').filter(|item| !item.trim().is_empty()) {
            let (kind, value) = item
                .split_once(':')
                .filter(|(_, v)| !v.contains(':'))
                .ok_or_else(|| SpecError::Item(item.to_string()))?;
            match kind.trim() {
                "AXN" => {
                    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
                    let [base, singular, plural] = parts[..] else {
                        return Err(SpecError::Axn(value.to_string()));
                    };
                    spec.axn.push(Axn::new(base, singular, plural));
                }
                "SC" => spec.sc.push(value.trim().to_string()),
                other => return Err(SpecError::Kind(other.to_string())),
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for IdiomSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self
            .axn
            .iter()
            .map(|a| format!("AXN:{},{},{}", a.base_phrase, a.singular_noun, a.plural_noun))
            .chain(self.sc.iter().map(|sc| format!("SC:{sc}")));
        write!(f, "{}", items.format("|"))
    }
}

/// Which kind of quantity word a phrase uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityCategory {
    SingularNumber,
    PluralNumber,
    PluralAmount,
}

/// A phrase produced from an [`IdiomSpec`], with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPhrase {
    pub text: String,
    /// `None` for standard candles.
    pub template: Option<String>,
    pub quantity: Option<String>,
    pub category: Option<QuantityCategory>,
}

fn takes_an(noun: &str) -> bool {
    noun.chars()
        .next()
        .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u' | 'h'))
}

/// Expand a spec into phrases: every AXN in order, then the candles.
/// Duplicates are dropped, keeping the first occurrence.
pub fn generate_phrases(spec: &IdiomSpec) -> Vec<GeneratedPhrase> {
    let mut phrases = Vec::new();

    for axn in &spec.axn {
        let template = axn.template();
        let mut push = |quantity: &str, noun: &str, category| {
            phrases.push(GeneratedPhrase {
                text: format!("{} {} {}", axn.base_phrase, quantity, noun),
                template: Some(template.clone()),
                quantity: Some(quantity.to_string()),
                category: Some(category),
            });
        };

        for &number in SINGULAR_NUMBERS {
            let an = takes_an(&axn.singular_noun);
            if (number == "a" && an) || (number == "an" && !an) {
                continue;
            }
            push(number, &axn.singular_noun, QuantityCategory::SingularNumber);
        }
        for &number in PLURAL_NUMBERS {
            push(number, &axn.plural_noun, QuantityCategory::PluralNumber);
        }
        for &amount in PLURAL_AMOUNTS {
            push(amount, &axn.plural_noun, QuantityCategory::PluralAmount);
        }
    }

    for candle in &spec.sc {
        phrases.push(GeneratedPhrase {
            text: candle.clone(),
            template: None,
            quantity: None,
            category: None,
        });
    }

    phrases.into_iter().unique_by(|p| p.text.clone()).collect()
}

/// Just the phrase strings, in generation order.
pub fn phrase_texts(phrases: &[GeneratedPhrase]) -> Vec<String> {
    phrases.iter().map(|p| p.text.clone()).collect()
}
