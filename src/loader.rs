use crate::config::EngineConfig;
use crate::engine::SourceUpdate;
use crate::error::SourceError;
use crate::types::{
    BackendSnapshot, ContextAggregate, InvoiceRecord, MetricSet, NarrativeReport, Pillar,
    PillarInsights, PillarSummary, PlatformStats, RawContext, RawInvoice, RawNarrative,
    RawPillarInsights, RawPlatformStats, RawSnapshot, ScalarMetric, UploadedRow,
};
use crate::util::{number_from_value, parse_date_safe};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

pub const SNAPSHOT: &str = "snapshot";
pub const NARRATIVE: &str = "narrative";
pub const INVOICES: &str = "invoices";
pub const UPLOADED_DATASET: &str = "uploaded_dataset";
pub const CONTEXT: &str = "context";
pub const ENVIRONMENTAL_INSIGHTS: &str = "environmental_insights";
pub const SOCIAL_INSIGHTS: &str = "social_insights";
pub const GOVERNANCE_INSIGHTS: &str = "governance_insights";
pub const PLATFORM: &str = "platform";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
}

pub fn read_json(source_name: &'static str, path: &Path) -> Result<Value, SourceError> {
    let text = std::fs::read_to_string(path).map_err(|reason| SourceError::Io {
        source_name,
        path: path.display().to_string(),
        reason,
    })?;
    serde_json::from_str(&text).map_err(|reason| SourceError::Json {
        source_name,
        reason,
    })
}

fn decode<T: DeserializeOwned>(source_name: &'static str, value: &Value) -> Result<T, SourceError> {
    if !value.is_object() {
        return Err(SourceError::Shape {
            source_name,
            detail: "expected a JSON object".to_string(),
        });
    }
    serde_json::from_value(value.clone()).map_err(|reason| SourceError::Json {
        source_name,
        reason,
    })
}

/// Strings of a JSON array; anything that is not a string is skipped.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn text(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Numeric fields of a pillar object. Non-numeric values are dropped so
/// they read as unknown.
pub fn pillar_from_value(value: Option<&Value>) -> PillarSummary {
    let Some(map) = value.and_then(Value::as_object) else {
        return PillarSummary::default();
    };
    map.iter()
        .filter_map(|(k, v)| number_from_value(v).map(|n| (k.clone(), n)))
        .collect()
}

pub fn metrics_from_value(value: Option<&Value>) -> MetricSet {
    let mut metrics = MetricSet::default();
    if let Some(map) = value.and_then(Value::as_object) {
        for metric in ScalarMetric::ALL {
            if let Some(v) = map.get(metric.key()).and_then(number_from_value) {
                metrics.set(metric, v);
            }
        }
    }
    metrics
}

/// Accepts `{ summary, metrics, insights }` or the same fields wrapped in a
/// `mockData` envelope (insights stay at the top level).
pub fn parse_snapshot(value: &Value) -> Result<BackendSnapshot, SourceError> {
    let raw: RawSnapshot = decode(SNAPSHOT, value)?;
    let envelope = raw.mock_data.as_ref().filter(|v| v.is_object());
    let (summary, metrics) = match envelope {
        Some(inner) => (inner.get("summary"), inner.get("metrics")),
        None => (raw.summary.as_ref(), raw.metrics.as_ref()),
    };
    let pillar = |p: Pillar| pillar_from_value(summary.and_then(|s| s.get(p.key())));
    Ok(BackendSnapshot {
        environmental: pillar(Pillar::Environmental),
        social: pillar(Pillar::Social),
        governance: pillar(Pillar::Governance),
        metrics: metrics_from_value(metrics),
        insights: string_list(raw.insights.as_ref()),
    })
}

pub fn parse_narrative(value: &Value) -> Result<NarrativeReport, SourceError> {
    let raw: RawNarrative = decode(NARRATIVE, value)?;
    Ok(NarrativeReport {
        baseline: text(raw.baseline.as_ref()),
        benchmark: text(raw.benchmark.as_ref()),
        performance_vs_benchmark: text(raw.performance_vs_benchmark.as_ref()),
        ai_recommendations: string_list(raw.ai_recommendations.as_ref()),
    })
}

pub fn parse_pillar_insights(
    source_name: &'static str,
    value: &Value,
) -> Result<PillarInsights, SourceError> {
    let raw: RawPillarInsights = decode(source_name, value)?;
    Ok(PillarInsights {
        insights: string_list(raw.insights.as_ref()),
    })
}

/// Series values that are not numbers count as 0.
fn series(value: Option<&Value>) -> Option<Vec<f64>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .map(|v| number_from_value(v).unwrap_or(0.0))
            .collect()
    })
}

pub fn parse_context(value: &Value) -> Result<ContextAggregate, SourceError> {
    let raw: RawContext = decode(CONTEXT, value)?;
    let benchmark_intensity = raw
        .environmental_benchmarks
        .as_ref()
        .and_then(|b| b.get("energyIntensity"))
        .and_then(number_from_value);
    Ok(ContextAggregate {
        energy_usage: series(raw.energy_usage.as_ref()),
        energy_use: series(raw.energy_use.as_ref()).unwrap_or_default(),
        production: series(raw.production.as_ref()).unwrap_or_default(),
        benchmark_intensity,
        environmental_insights: string_list(raw.environmental_insights.as_ref()),
    })
}

/// Invoice payload: a JSON array of billing records. Entries that are not
/// objects are skipped; bad fields inside a record only zero that field.
pub fn parse_invoices(value: &Value) -> Result<(Vec<InvoiceRecord>, LoadReport), SourceError> {
    let items = value.as_array().ok_or_else(|| SourceError::Shape {
        source_name: INVOICES,
        detail: "expected a JSON array".to_string(),
    })?;
    let mut records = Vec::with_capacity(items.len());
    let mut parse_errors = 0usize;
    for item in items {
        if !item.is_object() {
            parse_errors += 1;
            continue;
        }
        let row: RawInvoice = match serde_json::from_value(item.clone()) {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };
        let date = parse_date_safe(row.date.as_ref().and_then(Value::as_str));
        let energy_kwh = row.energy_kwh.as_ref().and_then(number_from_value);
        if date.is_none() || energy_kwh.is_none() {
            debug!(?row, "invoice record with unreadable date or energy");
        }
        records.push(InvoiceRecord {
            date,
            energy_kwh,
            carbon_tonnes: row.carbon_tonnes.as_ref().and_then(number_from_value),
            emission_factor: row.emission_factor.as_ref().and_then(number_from_value),
        });
    }
    let report = LoadReport {
        total_rows: items.len(),
        kept_rows: records.len(),
        parse_errors,
    };
    Ok((records, report))
}

/// Headline stats overlaid on the defaults; unusable fields keep them.
pub fn parse_platform(value: &Value) -> Result<PlatformStats, SourceError> {
    let raw: RawPlatformStats = decode(PLATFORM, value)?;
    let mut stats = PlatformStats::default();
    let count = |v: Option<&Value>| {
        v.and_then(number_from_value)
            .filter(|n| *n >= 0.0)
            .map(|n| n.round() as u64)
    };
    if let Some(n) = count(raw.countries_supported.as_ref()) {
        stats.countries_supported = n;
    }
    if let Some(n) = count(raw.esg_reports_generated.as_ref()) {
        stats.esg_reports_generated = n;
    }
    if let Some(a) = raw.compliance_accuracy.as_ref().and_then(number_from_value) {
        stats.compliance_accuracy = a;
    }
    match raw.ai_support_mode {
        Some(Value::String(mode)) => stats.ai_support_mode = mode,
        Some(Value::Number(n)) => stats.ai_support_mode = n.to_string(),
        _ => {}
    }
    Ok(stats)
}

/// Every key of a row object is kept so column detection sees it; empty
/// cells become empty text.
fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn parse_uploaded_rows(value: &Value) -> Result<(Vec<UploadedRow>, LoadReport), SourceError> {
    let items = value.as_array().ok_or_else(|| SourceError::Shape {
        source_name: UPLOADED_DATASET,
        detail: "expected a JSON array of rows".to_string(),
    })?;
    let mut rows = Vec::with_capacity(items.len());
    let mut parse_errors = 0usize;
    for item in items {
        let Some(obj) = item.as_object() else {
            parse_errors += 1;
            continue;
        };
        let row: UploadedRow = obj
            .iter()
            .map(|(k, v)| (k.clone(), cell_text(v)))
            .collect();
        rows.push(row);
    }
    let report = LoadReport {
        total_rows: items.len(),
        kept_rows: rows.len(),
        parse_errors,
    };
    Ok((rows, report))
}

/// Uploaded dataset from a CSV export (header row = column names) or a JSON
/// array of row objects, picked by file extension.
pub fn load_uploaded_dataset(path: &Path) -> Result<(Vec<UploadedRow>, LoadReport), SourceError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        return parse_uploaded_rows(&read_json(UPLOADED_DATASET, path)?);
    }

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|reason| SourceError::Csv {
            source_name: UPLOADED_DATASET,
            reason,
        })?;
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows: Vec<UploadedRow> = Vec::new();
    for result in rdr.deserialize::<UploadedRow>() {
        total_rows += 1;
        match result {
            Ok(r) => rows.push(r),
            Err(e) => {
                parse_errors += 1;
                warn!(error = %e, "skipping unreadable dataset row");
            }
        }
    }
    let kept_rows = rows.len();
    Ok((
        rows,
        LoadReport {
            total_rows,
            kept_rows,
            parse_errors,
        },
    ))
}

/// Read every configured source. Each entry is one independent arrival;
/// a failure only affects its own entry. Row-based sources also report
/// how many rows were kept.
pub fn fetch_sources(config: &EngineConfig) -> (Vec<SourceUpdate>, Vec<(&'static str, LoadReport)>) {
    let files = &config.sources;
    let json = |name: &'static str, file: &str| read_json(name, &config.source_path(file));
    let mut reports = Vec::new();
    let mut updates = vec![
        SourceUpdate::Snapshot(json(SNAPSHOT, &files.snapshot).and_then(|v| parse_snapshot(&v))),
        SourceUpdate::Narrative(json(NARRATIVE, &files.narrative).and_then(|v| parse_narrative(&v))),
    ];
    for (pillar, name, file) in [
        (Pillar::Environmental, ENVIRONMENTAL_INSIGHTS, &files.environmental_insights),
        (Pillar::Social, SOCIAL_INSIGHTS, &files.social_insights),
        (Pillar::Governance, GOVERNANCE_INSIGHTS, &files.governance_insights),
    ] {
        let result = json(name, file).and_then(|v| parse_pillar_insights(name, &v));
        updates.push(SourceUpdate::PillarInsights(pillar, result));
    }

    let invoices = json(INVOICES, &files.invoices).and_then(|v| parse_invoices(&v));
    updates.push(SourceUpdate::Invoices(invoices.map(|(records, report)| {
        reports.push((INVOICES, report));
        records
    })));

    let rows = load_uploaded_dataset(&config.source_path(&files.uploaded_dataset));
    updates.push(SourceUpdate::UploadedRows(rows.map(|(rows, report)| {
        reports.push((UPLOADED_DATASET, report));
        rows
    })));

    updates.push(SourceUpdate::Context(json(CONTEXT, &files.context).and_then(|v| parse_context(&v))));
    updates.push(SourceUpdate::Platform(json(PLATFORM, &files.platform).and_then(|v| parse_platform(&v))));
    (updates, reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CARBON_EMISSIONS, RENEWABLE_ENERGY_SHARE};
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn snapshot_plain_and_enveloped() {
        let plain = json!({
            "summary": { "environmental": { "renewableEnergyShare": 18, "carbonEmissions": "1,200" } },
            "metrics": { "carbonTax": 5000, "energySavings": "oops" },
            "insights": ["a", 3, "b"]
        });
        let s = parse_snapshot(&plain).unwrap();
        assert_eq!(s.environmental.get(RENEWABLE_ENERGY_SHARE), Some(18.0));
        assert_eq!(s.environmental.get(CARBON_EMISSIONS), Some(1200.0));
        assert_eq!(s.metrics.carbon_tax, 5000.0);
        assert_eq!(s.metrics.energy_savings, 0.0);
        assert_eq!(s.insights, vec!["a", "b"]);
        assert!(s.social.is_empty());

        let wrapped = json!({
            "mockData": { "summary": { "social": { "supplierDiversity": 7 } }, "metrics": { "taxAllowances": 10 } },
            "insights": []
        });
        let s = parse_snapshot(&wrapped).unwrap();
        assert_eq!(s.social.get("supplierDiversity"), Some(7.0));
        assert_eq!(s.metrics.tax_allowances, 10.0);
    }

    #[test]
    fn snapshot_must_be_an_object() {
        let err = parse_snapshot(&json!([1, 2])).unwrap_err();
        assert_eq!(err.source_name(), SNAPSHOT);
    }

    #[test]
    fn narrative_defaults_missing_fields() {
        let n = parse_narrative(&json!({ "baseline": "2023 levels", "ai_recommendations": ["x"] })).unwrap();
        assert_eq!(n.baseline, "2023 levels");
        assert_eq!(n.benchmark, "");
        assert_eq!(n.ai_recommendations, vec!["x"]);
    }

    #[test]
    fn invoices_tolerate_bad_fields() {
        let payload = json!([
            { "date": "2024-01-31", "energy_kwh": 1000 },
            { "date": "2024-02-29", "energy_kwh": "n/a", "carbon_tonnes": 0.5 },
            "garbage",
            { "invoice_date": "2024-03", "kwh": "2,500" }
        ]);
        let (records, report) = parse_invoices(&payload).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.kept_rows, 3);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(records[1].energy_kwh, None);
        assert_eq!(records[1].carbon_tonnes, Some(0.5));
        assert_eq!(records[2].energy_kwh, Some(2500.0));
        assert!(records[2].date.is_some());
    }

    #[test]
    fn context_series_and_benchmark() {
        let ctx = parse_context(&json!({
            "energyUsage": [1, "2", null],
            "energyUse": [10, 20],
            "production": "not a list",
            "environmentalBenchmarks": { "energyIntensity": 1.5 },
            "environmentalInsights": ["i1"]
        }))
        .unwrap();
        assert_eq!(ctx.energy_usage, Some(vec![1.0, 2.0, 0.0]));
        assert_eq!(ctx.energy_use, vec![10.0, 20.0]);
        assert!(ctx.production.is_empty());
        assert_eq!(ctx.benchmark_intensity, Some(1.5));
        assert_eq!(ctx.environmental_insights, vec!["i1"]);
    }

    #[test]
    fn uploaded_csv_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Site,Energy (kWh)").unwrap();
        writeln!(file, "A,\"1,000\"").unwrap();
        writeln!(file, "B,250").unwrap();
        let (rows, report) = load_uploaded_dataset(file.path()).unwrap();
        assert_eq!(report.kept_rows, 2);
        assert_eq!(rows[0].get("Energy (kWh)").map(String::as_str), Some("1,000"));
    }

    #[test]
    fn uploaded_json_rows() {
        let (rows, _) = parse_uploaded_rows(&json!([{ "Energy (kWh)": 12.5, "Note": null }])).unwrap();
        assert_eq!(rows[0].get("Energy (kWh)").map(String::as_str), Some("12.5"));
        assert_eq!(rows[0].get("Note").map(String::as_str), Some(""));
    }

    #[test]
    fn null_cells_keep_their_column() {
        let (rows, report) =
            parse_uploaded_rows(&json!([{ "Energy (kWh)": null }, { "Energy (kWh)": 500 }])).unwrap();
        assert_eq!(report.kept_rows, 2);
        assert!(rows[0].contains_key("Energy (kWh)"));
        assert_eq!(rows[1].get("Energy (kWh)").map(String::as_str), Some("500"));
    }

    #[test]
    fn platform_stats_overlay_defaults() {
        let stats = parse_platform(&json!({
            "countries_supported": 54,
            "esg_reports_generated": "12,500",
            "compliance_accuracy": "n/a"
        }))
        .unwrap();
        assert_eq!(stats.countries_supported, 54);
        assert_eq!(stats.esg_reports_generated, 12_500);
        assert_eq!(stats.compliance_accuracy, 0.99);
        assert_eq!(stats.ai_support_mode, "24/7");
        assert!(parse_platform(&json!([1, 2])).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_json(SNAPSHOT, Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
