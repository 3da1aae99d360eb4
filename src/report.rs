//! Shaping scan reports into tables and chart datasets.
//!
//! Everything here is a pure function of a [`ScanReport`]: the same report
//! always yields the same structures.
//!
//! # Scaling
//!
//! Sites differ wildly in archive size, so raw counts are hard to compare.
//! Standard candle phrases are assumed to be equally common everywhere. For
//! each candle, a site's ratio is its count over the baseline site's count
//! (1.0 when either count is not positive); a site's scale is the mean of
//! those ratios, and its scaled series is its counts divided by that scale.

use crate::error::ReportError;
use crate::idioms::{GeneratedPhrase, IdiomSpec, QuantityCategory};
use crate::models::{FAILED_SEARCH, ScanReport};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Header row then one row per phrase: `phrase, <count per site>...`.
///
/// Phrases come in first-seen order across sites. A site that never queried a
/// phrase gets an empty cell, which stays distinct from both `"0"` and `"-1"`.
pub fn phrase_counts_table(report: &ScanReport) -> Vec<Vec<String>> {
    let mut phrases: Vec<&str> = Vec::new();
    for site in &report.sites {
        for r in &site.results {
            if !phrases.contains(&r.phrase.as_str()) {
                phrases.push(&r.phrase);
            }
        }
    }

    let mut rows = Vec::with_capacity(phrases.len() + 1);
    let mut header = vec!["phrase".to_string()];
    header.extend(report.sites.iter().map(|s| s.name.clone()));
    rows.push(header);

    for phrase in phrases {
        let mut row = vec![phrase.to_string()];
        row.extend(report.sites.iter().map(|site| {
            site.result_for(phrase)
                .map(|r| r.result.clone())
                .unwrap_or_default()
        }));
        rows.push(row);
    }
    rows
}

fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Join table rows into CSV lines.
pub fn csv_lines(table: &[Vec<String>]) -> Vec<String> {
    table
        .iter()
        .map(|row| row.iter().map(|c| csv_cell(c)).collect::<Vec<_>>().join(","))
        .collect()
}

/// One generated phrase with its count on every site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedRow {
    pub quantity: String,
    pub phrase: String,
    /// Raw counts in site order.
    pub counts: Vec<String>,
}

/// All phrases sharing one idiom template, bucketed by quantity category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateGroup {
    pub template: String,
    pub sites: Vec<String>,
    pub by_category: BTreeMap<QuantityCategory, Vec<GroupedRow>>,
}

/// Bucket idiom phrases by template and quantity category. Candles have no
/// template and are left out. Groups follow generation order.
pub fn group_by_template(report: &ScanReport, phrases: &[GeneratedPhrase]) -> Vec<TemplateGroup> {
    let sites: Vec<String> = report.sites.iter().map(|s| s.name.clone()).collect();
    let mut groups: Vec<TemplateGroup> = Vec::new();

    for p in phrases {
        let (Some(template), Some(quantity), Some(category)) = (&p.template, &p.quantity, p.category)
        else {
            continue;
        };
        let counts = report
            .sites
            .iter()
            .map(|site| {
                site.result_for(&p.text)
                    .map(|r| r.result.clone())
                    .unwrap_or_default()
            })
            .collect();
        let row = GroupedRow {
            quantity: quantity.clone(),
            phrase: p.text.clone(),
            counts,
        };

        let idx = match groups.iter().position(|g| &g.template == template) {
            Some(idx) => idx,
            None => {
                groups.push(TemplateGroup {
                    template: template.clone(),
                    sites: sites.clone(),
                    by_category: BTreeMap::new(),
                });
                groups.len() - 1
            }
        };
        groups[idx].by_category.entry(category).or_default().push(row);
    }
    groups
}

/// One series in a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub fill: bool,
    pub border_color: Option<String>,
}

/// Candle counts and the scale derived from them for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleStats {
    pub counts: Vec<i64>,
    pub ratios_to_baseline: Vec<f64>,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AxisType {
    #[default]
    Linear,
    Logarithmic,
}

/// Chart-ready comparison of idiom counts across sites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub baseline: String,
    /// Non-candle phrases, the x axis.
    pub labels: Vec<String>,
    pub candles: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub scaled_datasets: Vec<Dataset>,
    pub title: String,
    pub scaled_title: String,
    pub chart_type: ChartType,
    pub candle_stats: BTreeMap<String, CandleStats>,
}

fn ratio(count: i64, baseline: i64) -> f64 {
    if baseline <= 0 || count <= 0 {
        1.0
    } else {
        count as f64 / baseline as f64
    }
}

impl LineChart {
    /// Build raw and scaled datasets, scaling every site against `baseline`.
    #[instrument(level = "debug", skip(report, spec))]
    pub fn build(report: &ScanReport, spec: &IdiomSpec, baseline: &str) -> Result<Self, ReportError> {
        let baseline_site = report
            .site(baseline)
            .ok_or_else(|| ReportError::MissingBaseline(baseline.to_string()))?;

        let mut labels = Vec::new();
        let mut candles = Vec::new();
        for r in &baseline_site.results {
            if spec.is_candle(&r.phrase) {
                candles.push(r.phrase.clone());
            } else {
                labels.push(r.phrase.clone());
            }
        }

        let count_of = |site: &crate::models::SiteScan, phrase: &str| {
            site.result_for(phrase).map(|r| r.count()).unwrap_or(-1)
        };
        let baseline_counts: Vec<i64> = candles.iter().map(|c| count_of(baseline_site, c)).collect();

        let mut candle_stats = BTreeMap::new();
        let mut datasets = Vec::new();
        let mut scaled_datasets = Vec::new();

        for site in &report.sites {
            let counts: Vec<i64> = candles.iter().map(|c| count_of(site, c)).collect();
            let ratios_to_baseline: Vec<f64> = if candles.is_empty() {
                vec![1.0]
            } else {
                counts
                    .iter()
                    .zip(&baseline_counts)
                    .map(|(&c, &b)| ratio(c, b))
                    .collect()
            };
            let scale = ratios_to_baseline.iter().sum::<f64>() / ratios_to_baseline.len() as f64;
            debug!(site = %site.name, scale, "Computed candle scale");

            let data: Vec<f64> = labels.iter().map(|p| count_of(site, p) as f64).collect();
            let scaled: Vec<f64> = data.iter().map(|c| c / scale).collect();
            let suffix = if scale == 1.0 {
                String::new()
            } else {
                format!(" (divided by {scale:.1})")
            };

            datasets.push(Dataset {
                label: site.name.clone(),
                data,
                fill: false,
                border_color: site.border_color.clone(),
            });
            scaled_datasets.push(Dataset {
                label: format!("{}{suffix}", site.name),
                data: scaled,
                fill: false,
                border_color: site.border_color.clone(),
            });
            candle_stats.insert(
                site.name.clone(),
                CandleStats {
                    counts,
                    ratios_to_baseline,
                    scale,
                },
            );
        }

        let axn_suffix = spec
            .axn
            .iter()
            .map(|a| format!("\"{}|{}|{}\"", a.base_phrase, a.singular_noun, a.plural_noun))
            .collect::<Vec<_>>()
            .join(", ");
        let title = format!("Comparing use of idioms on different news sites: {axn_suffix}");
        let scaled_title = if spec.sc.is_empty() {
            title.clone()
        } else {
            let sc = spec
                .sc
                .iter()
                .map(|s| format!("\"{s}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{title} scaled by {sc}")
        };

        let chart_type = if labels.is_empty() { ChartType::Bar } else { ChartType::Line };

        Ok(Self {
            baseline: baseline.to_string(),
            labels,
            candles,
            datasets,
            scaled_datasets,
            title,
            scaled_title,
            chart_type,
            candle_stats,
        })
    }

    /// Pick the raw or scaled series for display.
    pub fn view(&self, unscaled: bool, y_axis: AxisType) -> ChartView<'_> {
        ChartView {
            title: if unscaled { &self.title } else { &self.scaled_title },
            labels: &self.labels,
            datasets: if unscaled { &self.datasets } else { &self.scaled_datasets },
            chart_type: self.chart_type,
            y_axis,
        }
    }
}

/// The series and options a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView<'a> {
    pub title: &'a str,
    pub labels: &'a [String],
    pub datasets: &'a [Dataset],
    pub chart_type: ChartType,
    pub y_axis: AxisType,
}

/// Phrases whose count is the failure sentinel on any site.
pub fn failed_phrases(report: &ScanReport) -> Vec<(String, String)> {
    report
        .sites
        .iter()
        .flat_map(|site| {
            site.results
                .iter()
                .filter(|r| r.result == FAILED_SEARCH)
                .map(|r| (site.name.clone(), r.phrase.clone()))
        })
        .collect()
}
