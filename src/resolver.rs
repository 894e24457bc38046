//! Merge the independent sources into one canonical snapshot.
//!
//! Metrics with more than one possible source are resolved through an
//! ordered chain of [`Candidate`] providers, first match wins. Everything
//! else comes from the backend summary alone.
use crate::types::{
    BackendSnapshot, ContextAggregate, InvoiceTotals, PillarInsights, PillarSummary,
    ResolvedSnapshot, ScalarMetric, TrendPoint, UploadedRow, CARBON_EMISSIONS,
    TOTAL_ENERGY_CONSUMPTION,
};
use crate::util::parse_f64_safe;
use serde::Serialize;

/// Whatever sources have settled when a pass starts. `None` means the
/// source is unresolved or failed; the resolver does not distinguish.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceView<'a> {
    pub invoices: Option<&'a InvoiceTotals>,
    pub uploaded_rows: Option<&'a [UploadedRow]>,
    pub context: Option<&'a ContextAggregate>,
    pub backend: Option<&'a BackendSnapshot>,
    /// Environmental, social, governance, in that order.
    pub pillar_insights: [Option<&'a PillarInsights>; 3],
    /// Recognised energy column headers in the uploaded dataset.
    pub energy_columns: &'a [String],
}

pub type Provider = fn(&SourceView<'_>) -> Option<f64>;

pub struct Candidate {
    pub name: &'static str,
    pub provide: Provider,
}

pub const ENERGY_CHAIN: &[Candidate] = &[
    Candidate { name: "invoices", provide: invoice_energy },
    Candidate { name: "uploaded_dataset", provide: uploaded_energy },
    Candidate { name: "context_energy_usage", provide: context_energy },
    Candidate { name: "backend_summary", provide: backend_energy },
];

pub const CARBON_CHAIN: &[Candidate] = &[
    Candidate { name: "invoices", provide: invoice_carbon },
    Candidate { name: "backend_summary", provide: backend_carbon },
];

fn invoice_energy(view: &SourceView<'_>) -> Option<f64> {
    view.invoices?.total_energy_kwh
}

/// Sum the first recognised energy column. The column is picked from the
/// first row only; cells that do not parse contribute nothing.
fn uploaded_energy(view: &SourceView<'_>) -> Option<f64> {
    let rows = view.uploaded_rows?;
    let sample = rows.first()?;
    let column = view
        .energy_columns
        .iter()
        .find(|c| sample.contains_key(c.as_str()))?;
    let total = rows
        .iter()
        .filter_map(|row| parse_f64_safe(row.get(column).map(String::as_str)))
        .sum();
    Some(total)
}

fn context_energy(view: &SourceView<'_>) -> Option<f64> {
    view.context?
        .energy_usage
        .as_ref()
        .map(|series| series.iter().sum())
}

fn backend_energy(view: &SourceView<'_>) -> Option<f64> {
    view.backend?.environmental.get(TOTAL_ENERGY_CONSUMPTION)
}

fn invoice_carbon(view: &SourceView<'_>) -> Option<f64> {
    view.invoices?.total_carbon_tonnes
}

fn backend_carbon(view: &SourceView<'_>) -> Option<f64> {
    view.backend?.environmental.get(CARBON_EMISSIONS)
}

/// Evaluate a chain in order. A candidate yielding a non-finite value is
/// treated like an absent one.
pub fn first_match(chain: &[Candidate], view: &SourceView<'_>) -> Option<(&'static str, f64)> {
    chain.iter().find_map(|candidate| {
        (candidate.provide)(view)
            .filter(|v| v.is_finite())
            .map(|v| (candidate.name, v))
    })
}

/// Which candidate supplied each multi-source metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub energy: Option<&'static str>,
    pub carbon: Option<&'static str>,
    pub insights: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    pub snapshot: ResolvedSnapshot,
    pub provenance: Provenance,
}

/// Pillar insights replace the backend list only when all three pillar
/// payloads arrived and together hold at least one insight.
fn resolve_insights(view: &SourceView<'_>) -> (Vec<String>, Option<&'static str>) {
    if let [Some(env), Some(soc), Some(gov)] = view.pillar_insights {
        let combined: Vec<String> = env
            .insights
            .iter()
            .chain(soc.insights.iter())
            .chain(gov.insights.iter())
            .cloned()
            .collect();
        if !combined.is_empty() {
            return (combined, Some("pillar_insights"));
        }
    }
    match view.backend {
        Some(b) => (b.insights.clone(), Some("backend_summary")),
        None => (Vec::new(), None),
    }
}

/// Build a fresh snapshot from scratch. Pure: the same view always yields
/// the same resolution.
pub fn resolve(view: &SourceView<'_>) -> Resolution {
    let backend = view.backend;
    let (mut environmental, social, governance): (PillarSummary, PillarSummary, PillarSummary) =
        match backend {
            Some(b) => (b.environmental.clone(), b.social.clone(), b.governance.clone()),
            None => Default::default(),
        };

    let energy = first_match(ENERGY_CHAIN, view);
    let carbon = first_match(CARBON_CHAIN, view);
    environmental.set(TOTAL_ENERGY_CONSUMPTION, energy.map(|(_, v)| v));
    environmental.set(CARBON_EMISSIONS, carbon.map(|(_, v)| v));

    let metrics = backend.map(|b| b.metrics).unwrap_or_default();
    let (insights, insight_source) = resolve_insights(view);

    Resolution {
        snapshot: ResolvedSnapshot {
            environmental,
            social,
            governance,
            metrics,
            insights,
        },
        provenance: Provenance {
            energy: energy.map(|(name, _)| name),
            carbon: carbon.map(|(name, _)| name),
            insights: insight_source,
        },
    }
}

/// Pair every scalar of the incoming snapshot with the value it replaces.
/// The previous value is `None` until an earlier snapshot exists.
pub fn capture_trends(
    outgoing: Option<&ResolvedSnapshot>,
    incoming: &ResolvedSnapshot,
) -> Vec<TrendPoint> {
    ScalarMetric::ALL
        .iter()
        .map(|metric| TrendPoint {
            metric: *metric,
            current: incoming.metrics.get(*metric),
            previous: outgoing.map(|s| s.metrics.get(*metric)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricSet, RENEWABLE_ENERGY_SHARE, SUPPLIER_DIVERSITY};
    use proptest::prelude::*;

    fn columns() -> Vec<String> {
        vec!["Electricity (kWh)".to_string(), "Energy (kWh)".to_string()]
    }

    fn backend() -> BackendSnapshot {
        BackendSnapshot {
            environmental: [
                (TOTAL_ENERGY_CONSUMPTION.to_string(), 9_999.0),
                (CARBON_EMISSIONS.to_string(), 42.0),
                (RENEWABLE_ENERGY_SHARE.to_string(), 35.0),
            ]
            .into_iter()
            .collect(),
            social: [(SUPPLIER_DIVERSITY.to_string(), 12.0)].into_iter().collect(),
            governance: PillarSummary::default(),
            metrics: MetricSet {
                carbon_tax: 1_000.0,
                ..MetricSet::default()
            },
            insights: vec!["backend insight".to_string()],
        }
    }

    fn row(col: &str, value: &str) -> UploadedRow {
        [(col.to_string(), value.to_string())].into_iter().collect()
    }

    #[test]
    fn uploaded_rows_beat_backend_energy() {
        let cols = columns();
        let b = backend();
        let rows = vec![row("Energy (kWh)", "1,000"), row("Energy (kWh)", "250.5")];
        let view = SourceView {
            uploaded_rows: Some(&rows),
            backend: Some(&b),
            energy_columns: &cols,
            ..SourceView::default()
        };
        let res = resolve(&view);
        assert_eq!(res.snapshot.environmental.get(TOTAL_ENERGY_CONSUMPTION), Some(1_250.5));
        assert_eq!(res.provenance.energy, Some("uploaded_dataset"));
        // Carbon never comes from uploads.
        assert_eq!(res.snapshot.environmental.get(CARBON_EMISSIONS), Some(42.0));
        assert_eq!(res.provenance.carbon, Some("backend_summary"));
    }

    #[test]
    fn blank_first_cell_still_selects_column() {
        let cols = columns();
        let b = backend();
        let rows = vec![row("Energy (kWh)", ""), row("Energy (kWh)", "500")];
        let view = SourceView {
            uploaded_rows: Some(&rows),
            backend: Some(&b),
            energy_columns: &cols,
            ..SourceView::default()
        };
        let res = resolve(&view);
        assert_eq!(res.snapshot.environmental.get(TOTAL_ENERGY_CONSUMPTION), Some(500.0));
        assert_eq!(res.provenance.energy, Some("uploaded_dataset"));
    }

    #[test]
    fn invoices_win_over_everything() {
        let cols = columns();
        let b = backend();
        let rows = vec![row("Energy (kWh)", "1000")];
        let totals = InvoiceTotals {
            total_energy_kwh: Some(600.0),
            total_carbon_tonnes: Some(0.6),
        };
        let view = SourceView {
            invoices: Some(&totals),
            uploaded_rows: Some(&rows),
            backend: Some(&b),
            energy_columns: &cols,
            ..SourceView::default()
        };
        let env = resolve(&view).snapshot.environmental;
        assert_eq!(env.get(TOTAL_ENERGY_CONSUMPTION), Some(600.0));
        assert_eq!(env.get(CARBON_EMISSIONS), Some(0.6));
    }

    #[test]
    fn unknown_invoice_totals_fall_through() {
        let cols = columns();
        let totals = InvoiceTotals::default();
        let ctx = ContextAggregate {
            energy_usage: Some(vec![10.0, 20.0]),
            ..ContextAggregate::default()
        };
        let view = SourceView {
            invoices: Some(&totals),
            context: Some(&ctx),
            energy_columns: &cols,
            ..SourceView::default()
        };
        let res = resolve(&view);
        assert_eq!(res.snapshot.environmental.get(TOTAL_ENERGY_CONSUMPTION), Some(30.0));
        assert_eq!(res.snapshot.environmental.get(CARBON_EMISSIONS), None);
    }

    #[test]
    fn unrecognised_column_skips_uploads() {
        let cols = columns();
        let b = backend();
        let rows = vec![row("Water (kL)", "5")];
        let view = SourceView {
            uploaded_rows: Some(&rows),
            backend: Some(&b),
            energy_columns: &cols,
            ..SourceView::default()
        };
        let res = resolve(&view);
        assert_eq!(res.snapshot.environmental.get(TOTAL_ENERGY_CONSUMPTION), Some(9_999.0));
    }

    #[test]
    fn no_sources_gives_unknowns() {
        let res = resolve(&SourceView::default());
        assert!(res.snapshot.environmental.is_empty());
        assert_eq!(res.snapshot.metrics, MetricSet::default());
        assert!(res.snapshot.insights.is_empty());
        assert_eq!(res.provenance, Provenance::default());
    }

    #[test]
    fn pillar_insights_need_all_three() {
        let b = backend();
        let env = PillarInsights { insights: vec!["e".to_string()] };
        let soc = PillarInsights::default();
        let gov = PillarInsights { insights: vec!["g".to_string()] };

        let partial = SourceView {
            backend: Some(&b),
            pillar_insights: [Some(&env), None, Some(&gov)],
            ..SourceView::default()
        };
        assert_eq!(resolve(&partial).snapshot.insights, vec!["backend insight"]);

        let full = SourceView {
            backend: Some(&b),
            pillar_insights: [Some(&env), Some(&soc), Some(&gov)],
            ..SourceView::default()
        };
        assert_eq!(resolve(&full).snapshot.insights, vec!["e", "g"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let cols = columns();
        let b = backend();
        let rows = vec![row("Electricity (kWh)", "12")];
        let view = SourceView {
            uploaded_rows: Some(&rows),
            backend: Some(&b),
            energy_columns: &cols,
            ..SourceView::default()
        };
        assert_eq!(resolve(&view), resolve(&view));
    }

    #[test]
    fn trends_have_no_previous_on_first_pass() {
        let first = resolve(&SourceView::default()).snapshot;
        let points = capture_trends(None, &first);
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.previous.is_none()));

        let b = backend();
        let second = resolve(&SourceView { backend: Some(&b), ..SourceView::default() }).snapshot;
        let points = capture_trends(Some(&first), &second);
        assert_eq!(points[0].metric, ScalarMetric::CarbonTax);
        assert_eq!(points[0].previous, Some(0.0));
        assert_eq!(points[0].current, 1_000.0);
    }

    proptest! {
        #[test]
        fn resolved_fields_are_finite(cells in proptest::collection::vec(".{0,12}", 0..8), usage in proptest::collection::vec(-1e300f64..1e300, 0..5)) {
            let cols = columns();
            let rows: Vec<UploadedRow> = cells.iter().map(|c| row("Energy (kWh)", c)).collect();
            let ctx = ContextAggregate { energy_usage: Some(usage), ..ContextAggregate::default() };
            let view = SourceView {
                uploaded_rows: Some(&rows),
                context: Some(&ctx),
                energy_columns: &cols,
                ..SourceView::default()
            };
            let res = resolve(&view);
            for (_, v) in res.snapshot.environmental.iter() {
                prop_assert!(v.is_finite());
            }
        }
    }
}
