//! Presentation rows built from an applied dashboard view.
//!
//! This is the only place unknown values turn into `--` placeholders.
use crate::derived::{EnergyProfile, MONTH_LABELS};
use crate::engine::DashboardView;
use crate::trend::for_point;
use crate::types::{
    IntensityRow, Pillar, PillarMetricRow, PillarSummary, PlatformStats, RedFlagRow, ResolvedSnapshot,
    ScalarMetric, TrendPoint, TrendRow, BUSINESS_ETHICS, CARBON_EMISSIONS, CORPORATE_GOVERNANCE,
    CUSTOMER_SATISFACTION, HUMAN_CAPITAL, ISO_9001_COMPLIANCE, RENEWABLE_ENERGY_SHARE,
    SUPPLIER_DIVERSITY, TOTAL_ENERGY_CONSUMPTION,
};
use crate::util::{format_compact, format_int, format_number};
use serde::Serialize;

const UNKNOWN: &str = "--";

fn or_unknown(v: Option<f64>) -> String {
    v.map(|n| format_compact(n, 3))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn field(summary: &PillarSummary, key: &str) -> String {
    or_unknown(summary.get(key))
}

/// One-line text summary per pillar, e.g.
/// `Energy: 1,234 kWh · Renewables: 35% · Carbon: -- tCO₂e`.
pub fn summary_lines(snapshot: &ResolvedSnapshot) -> Vec<(Pillar, String)> {
    let env = &snapshot.environmental;
    let soc = &snapshot.social;
    let gov = &snapshot.governance;
    vec![
        (
            Pillar::Environmental,
            format!(
                "Energy: {} kWh · Renewables: {}% · Carbon: {} tCO₂e",
                field(env, TOTAL_ENERGY_CONSUMPTION),
                field(env, RENEWABLE_ENERGY_SHARE),
                field(env, CARBON_EMISSIONS)
            ),
        ),
        (
            Pillar::Social,
            format!(
                "Supplier diversity: {}% · Customer satisfaction: {}% · Human capital: {}%",
                field(soc, SUPPLIER_DIVERSITY),
                field(soc, CUSTOMER_SATISFACTION),
                field(soc, HUMAN_CAPITAL)
            ),
        ),
        (
            Pillar::Governance,
            format!(
                "Corporate governance: {} · ISO 9001: {} · Ethics: {}",
                field(gov, CORPORATE_GOVERNANCE),
                field(gov, ISO_9001_COMPLIANCE),
                field(gov, BUSINESS_ETHICS)
            ),
        ),
    ]
}

/// Every known pillar field plus the headline scalars.
pub fn pillar_metric_rows(snapshot: &ResolvedSnapshot) -> Vec<PillarMetricRow> {
    let mut rows: Vec<PillarMetricRow> = Vec::new();
    for pillar in Pillar::ALL {
        for (key, value) in snapshot.pillar(pillar).iter() {
            rows.push(PillarMetricRow {
                pillar: pillar.title().to_string(),
                metric: key.to_string(),
                value: format_compact(value, 3),
            });
        }
    }
    for metric in ScalarMetric::ALL {
        rows.push(PillarMetricRow {
            pillar: "Financial".to_string(),
            metric: metric.key().to_string(),
            value: format_number(snapshot.metrics.get(metric), 2),
        });
    }
    rows
}

pub fn intensity_rows(profile: &EnergyProfile) -> Vec<IntensityRow> {
    MONTH_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let at = |v: &[f64]| v.get(i).copied().unwrap_or(0.0);
            IntensityRow {
                month: label.to_string(),
                energy_use: format_compact(at(&profile.energy_use[..]), 2),
                production: format_compact(at(&profile.production[..]), 2),
                intensity: format!("{:.4}", at(&profile.derived.intensity[..])),
            }
        })
        .collect()
}

/// Latest-period quick stats and the baseline/benchmark comparison.
pub fn platform_lines(stats: &PlatformStats) -> Vec<String> {
    vec![
        format!("African countries supported: {}+", format_int(stats.countries_supported)),
        format!("ESG reports generated: {}", format_int(stats.esg_reports_generated)),
        format!("Compliance accuracy: {:.1}%", stats.compliance_accuracy * 100.0),
        format!("AI analyst support: {}", stats.ai_support_mode),
    ]
}

pub fn energy_highlights(profile: &EnergyProfile) -> Vec<String> {
    let (energy, production, intensity) = profile.latest();
    let d = &profile.derived;
    let intensity_text = |v: Option<f64>| {
        v.map(|n| format!("{:.4} MWh/tonne", n))
            .unwrap_or_else(|| UNKNOWN.to_string())
    };
    let comparison = match (d.delta, d.percent) {
        (Some(delta), Some(pct)) => format!("{:+.4} MWh/tonne ({:+.1}%)", delta, pct),
        (Some(delta), None) => format!("{:+.4} MWh/tonne", delta),
        _ => UNKNOWN.to_string(),
    };
    vec![
        format!("Latest Energy Use: {} MWh", format_compact(energy, 2)),
        format!("Latest Production: {} tonnes", format_compact(production, 2)),
        format!("Latest Energy Intensity: {:.2} MWh / tonne", intensity),
        format!("Baseline intensity: {}", intensity_text(d.baseline)),
        format!("Current intensity: {}", intensity_text(d.current)),
        format!("Benchmark intensity: {}", intensity_text(d.benchmark)),
        format!("Performance vs benchmark: {}", comparison),
    ]
}

pub fn trend_rows(trends: &[TrendPoint]) -> Vec<TrendRow> {
    trends
        .iter()
        .map(|point| {
            let trend = for_point(point);
            TrendRow {
                metric: point.metric.label().to_string(),
                current: format_number(point.current, 2),
                previous: point
                    .previous
                    .map(|p| format_number(p, 2))
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                direction: trend.direction.as_str().to_string(),
                change: trend.label().unwrap_or_default(),
            }
        })
        .collect()
}

pub fn red_flag_rows(flags: &[String]) -> Vec<RedFlagRow> {
    flags
        .iter()
        .enumerate()
        .map(|(idx, flag)| RedFlagRow {
            no: idx + 1,
            flag: flag.clone(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub sequence: u64,
    pub total_energy_kwh: Option<f64>,
    pub total_carbon_tonnes: Option<f64>,
    pub energy_source: Option<&'static str>,
    pub carbon_source: Option<&'static str>,
    pub red_flag_count: usize,
    pub attention_needed: bool,
    pub insight_count: usize,
    pub section_errors: Vec<String>,
}

pub fn generate_summary(view: &DashboardView) -> SummaryStats {
    let env = &view.snapshot.environmental;
    SummaryStats {
        sequence: view.sequence,
        total_energy_kwh: env.get(TOTAL_ENERGY_CONSUMPTION),
        total_carbon_tonnes: env.get(CARBON_EMISSIONS),
        energy_source: view.provenance.energy,
        carbon_source: view.provenance.carbon,
        red_flag_count: view.red_flags.len(),
        attention_needed: !view.red_flags.is_empty(),
        insight_count: view.snapshot.insights.len(),
        section_errors: view.section_errors.clone(),
    }
}
