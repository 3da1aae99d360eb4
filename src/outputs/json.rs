//! JSON output.
//!
//! Reports are written whole, sentinels included, so downstream tools see
//! exactly what the scan saw. Charts are written as the selected
//! [`ChartView`] plus the per-site candle stats behind the scaling.

use super::write_dated;
use crate::models::ScanReport;
use crate::report::{CandleStats, ChartView, LineChart};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use tracing::instrument;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartFile<'a> {
    baseline: &'a str,
    candles: &'a [String],
    #[serde(flatten)]
    view: ChartView<'a>,
    candle_stats: &'a BTreeMap<String, CandleStats>,
}

/// Pretty-printed JSON for any serializable value.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Write a scan report to `{output_dir}/{date}/{stem}.json`.
///
/// # Arguments
///
/// * `report` - The report to serialize, sentinels and outcomes included
/// * `output_dir` - Base directory for all outputs
/// * `date` - Date directory name
/// * `stem` - File stem, usually `{time}_{job}`
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
#[instrument(level = "info", skip(report))]
pub async fn write_report(
    report: &ScanReport,
    output_dir: &str,
    date: &str,
    stem: &str,
) -> Result<String, Box<dyn Error>> {
    let json = to_json(report)?;
    write_dated(output_dir, date, &format!("{stem}.json"), &json).await
}

/// Chart JSON for one view of a [`LineChart`].
pub fn chart_json(chart: &LineChart, view: ChartView<'_>) -> Result<String, serde_json::Error> {
    to_json(&ChartFile {
        baseline: &chart.baseline,
        candles: &chart.candles,
        view,
        candle_stats: &chart.candle_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idioms::IdiomSpec;
    use crate::models::{QueryOutcome, QueryResult, QueryTask, SiteScan};
    use crate::report::AxisType;

    fn report() -> ScanReport {
        let task = QueryTask {
            site: "ft.com".to_string(),
            phrase: "finance".to_string(),
            query: String::new(),
        };
        let mut counted = QueryResult::failed(&task, QueryOutcome::Counted);
        counted.result = "20".to_string();
        ScanReport {
            scanned_at: "2026-10-19T00:00:00Z".to_string(),
            duration_millis: 1,
            sites: vec![SiteScan {
                name: "ft.com".to_string(),
                border_color: Some("orange".to_string()),
                search_duration_millis: 1,
                results: vec![counted],
            }],
        }
    }

    #[test]
    fn test_report_json_keeps_sentinel_and_outcome() {
        let mut r = report();
        let task = QueryTask {
            site: "ft.com".to_string(),
            phrase: "gone".to_string(),
            query: String::new(),
        };
        r.sites[0].results.push(QueryResult::failed(&task, QueryOutcome::FetchFailed));

        let value: serde_json::Value = serde_json::from_str(&to_json(&r).unwrap()).unwrap();
        let gone = &value["sites"][0]["results"][1];
        assert_eq!(gone["result"], "-1");
        assert_eq!(gone["outcome"], "fetch_failed");
    }

    #[test]
    fn test_chart_json_shape() {
        let spec: IdiomSpec = "SC:finance".parse().unwrap();
        let chart = LineChart::build(&report(), &spec, "ft.com").unwrap();
        let json = chart_json(&chart, chart.view(false, AxisType::Logarithmic)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["baseline"], "ft.com");
        assert_eq!(value["chartType"], "bar");
        assert_eq!(value["yAxis"], "logarithmic");
        assert_eq!(value["datasets"][0]["borderColor"], "orange");
        assert_eq!(value["candleStats"]["ft.com"]["scale"], 1.0);
    }
}
