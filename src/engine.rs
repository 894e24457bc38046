//! Source slots and resolution passes.
//!
//! Sources settle independently. Each arrival runs a fresh pass over
//! whatever has settled so far; a pass is a wholesale replacement of the
//! applied view and is only accepted if its sequence number is newer than
//! the one already applied.
use crate::config::EngineConfig;
use crate::derived::{energy_profile, EnergyProfile};
use crate::error::SourceError;
use crate::invoices::aggregate;
use crate::red_flags;
use crate::resolver::{capture_trends, resolve, Provenance, SourceView};
use crate::types::{
    BackendSnapshot, ContextAggregate, InvoiceRecord, InvoiceTotals,
    NarrativeReport, Pillar, PillarInsights, PlatformStats, ResolvedSnapshot, TrendPoint,
    UploadedRow,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// How many context insights are surfaced on the energy view.
pub const TOP_INSIGHTS: usize = 5;

#[derive(Debug)]
pub enum SourceState<T> {
    Unresolved,
    Ready(T),
    Failed(SourceError),
    /// A refresh failed after an earlier delivery succeeded; the last good
    /// value stays in use.
    Stale(T, SourceError),
}

impl<T> Default for SourceState<T> {
    fn default() -> Self {
        SourceState::Unresolved
    }
}

impl<T> SourceState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            SourceState::Ready(v) | SourceState::Stale(v, _) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SourceError> {
        match self {
            SourceState::Failed(e) | SourceState::Stale(_, e) => Some(e),
            _ => None,
        }
    }

    /// Fold a new delivery into the slot.
    fn absorb(self, result: Result<T, SourceError>) -> Self {
        match (self, result) {
            (_, Ok(v)) => SourceState::Ready(v),
            (SourceState::Ready(v) | SourceState::Stale(v, _), Err(e)) => {
                SourceState::Stale(v, e)
            }
            (_, Err(e)) => SourceState::Failed(e),
        }
    }
}

/// One source settling, successfully or not.
#[derive(Debug)]
pub enum SourceUpdate {
    Snapshot(Result<BackendSnapshot, SourceError>),
    Narrative(Result<NarrativeReport, SourceError>),
    Invoices(Result<Vec<InvoiceRecord>, SourceError>),
    UploadedRows(Result<Vec<UploadedRow>, SourceError>),
    Context(Result<ContextAggregate, SourceError>),
    PillarInsights(Pillar, Result<PillarInsights, SourceError>),
    Platform(Result<PlatformStats, SourceError>),
}

impl SourceUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            SourceUpdate::Snapshot(_) => "snapshot",
            SourceUpdate::Narrative(_) => "narrative",
            SourceUpdate::Invoices(_) => "invoices",
            SourceUpdate::UploadedRows(_) => "uploaded_dataset",
            SourceUpdate::Context(_) => "context",
            SourceUpdate::PillarInsights(Pillar::Environmental, _) => "environmental_insights",
            SourceUpdate::PillarInsights(Pillar::Social, _) => "social_insights",
            SourceUpdate::PillarInsights(Pillar::Governance, _) => "governance_insights",
            SourceUpdate::Platform(_) => "platform",
        }
    }
}

#[derive(Debug, Default)]
pub struct SourceSet {
    pub snapshot: SourceState<BackendSnapshot>,
    pub narrative: SourceState<NarrativeReport>,
    pub invoices: SourceState<Vec<InvoiceRecord>>,
    pub uploaded_rows: SourceState<Vec<UploadedRow>>,
    pub context: SourceState<ContextAggregate>,
    pub pillar_insights: [SourceState<PillarInsights>; 3],
    pub platform: SourceState<PlatformStats>,
}

impl SourceSet {
    fn pillar_slot(pillar: Pillar) -> usize {
        match pillar {
            Pillar::Environmental => 0,
            Pillar::Social => 1,
            Pillar::Governance => 2,
        }
    }

    /// Per-source error messages, for display next to the affected section.
    pub fn errors(&self) -> Vec<String> {
        let mut out: Vec<String> = [
            self.snapshot.error(),
            self.narrative.error(),
            self.invoices.error(),
            self.uploaded_rows.error(),
            self.context.error(),
            self.platform.error(),
        ]
        .into_iter()
        .flatten()
        .map(ToString::to_string)
        .collect();
        out.extend(
            self.pillar_insights
                .iter()
                .filter_map(SourceState::error)
                .map(ToString::to_string),
        );
        out
    }
}

/// Everything the presentation side needs from one applied pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub sequence: u64,
    pub snapshot: ResolvedSnapshot,
    pub provenance: Provenance,
    pub invoice_totals: InvoiceTotals,
    pub energy: EnergyProfile,
    pub trends: Vec<TrendPoint>,
    pub red_flags: Vec<String>,
    pub narrative: Option<NarrativeReport>,
    pub top_environmental_insights: Vec<String>,
    pub platform: PlatformStats,
    pub section_errors: Vec<String>,
}

/// A computed but not yet applied pass.
#[derive(Debug, Clone)]
pub struct Pass {
    sequence: u64,
    /// Backend snapshot generation this pass resolved against.
    metrics_generation: u64,
    view: DashboardView,
}

impl Pass {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied { sequence: u64 },
    Stale { sequence: u64, applied: u64 },
}

fn settle<T>(slot: &mut SourceState<T>, name: &'static str, result: Result<T, SourceError>) {
    match &result {
        Ok(_) => info!(source = name, "source settled"),
        Err(e) => warn!(source = name, error = %e, "source failed"),
    }
    *slot = std::mem::take(slot).absorb(result);
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    sources: SourceSet,
    next_sequence: u64,
    /// Bumped on every successful backend snapshot delivery.
    metrics_generation: u64,
    applied_generation: u64,
    applied: Option<(u64, DashboardView)>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sources: SourceSet::default(),
            next_sequence: 1,
            metrics_generation: 0,
            applied_generation: 0,
            applied: None,
        }
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// The currently applied view, if any pass has been applied yet.
    pub fn view(&self) -> Option<&DashboardView> {
        self.applied.as_ref().map(|(_, v)| v)
    }

    /// Store a settled source without running a pass.
    pub fn deliver(&mut self, update: SourceUpdate) {
        let name = update.name();
        let s = &mut self.sources;
        match update {
            SourceUpdate::Snapshot(r) => {
                if r.is_ok() {
                    self.metrics_generation += 1;
                }
                settle(&mut s.snapshot, name, r);
            }
            SourceUpdate::Narrative(r) => settle(&mut s.narrative, name, r),
            SourceUpdate::Invoices(r) => settle(&mut s.invoices, name, r),
            SourceUpdate::UploadedRows(r) => settle(&mut s.uploaded_rows, name, r),
            SourceUpdate::Context(r) => settle(&mut s.context, name, r),
            SourceUpdate::PillarInsights(pillar, r) => {
                settle(&mut s.pillar_insights[SourceSet::pillar_slot(pillar)], name, r);
            }
            SourceUpdate::Platform(r) => settle(&mut s.platform, name, r),
        }
    }

    /// Deliver a source and immediately run and commit a pass.
    pub fn arrive(&mut self, update: SourceUpdate) -> CommitOutcome {
        self.deliver(update);
        let pass = self.begin_pass();
        self.commit(pass)
    }

    /// Compute a pass over the sources settled right now. Nothing is applied
    /// until [`Engine::commit`].
    pub fn begin_pass(&mut self) -> Pass {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let s = &self.sources;
        let invoice_totals = s
            .invoices
            .ready()
            .map(|records| aggregate(records, self.config.default_emission_factor));
        let view = SourceView {
            invoices: invoice_totals.as_ref(),
            uploaded_rows: s.uploaded_rows.ready().map(Vec::as_slice),
            context: s.context.ready(),
            backend: s.snapshot.ready(),
            pillar_insights: [
                s.pillar_insights[0].ready(),
                s.pillar_insights[1].ready(),
                s.pillar_insights[2].ready(),
            ],
            energy_columns: &self.config.energy_columns,
        };
        let resolution = resolve(&view);
        let energy = energy_profile(view.context);
        let red_flags = red_flags::evaluate(&resolution.snapshot);
        let top_environmental_insights = view
            .context
            .map(|c| c.environmental_insights.iter().take(TOP_INSIGHTS).cloned().collect())
            .unwrap_or_default();

        debug!(sequence, flags = red_flags.len(), "pass computed");
        Pass {
            sequence,
            metrics_generation: self.metrics_generation,
            view: DashboardView {
                sequence,
                snapshot: resolution.snapshot,
                provenance: resolution.provenance,
                invoice_totals: invoice_totals.unwrap_or_default(),
                energy,
                trends: Vec::new(),
                red_flags,
                narrative: s.narrative.ready().cloned(),
                top_environmental_insights,
                platform: s.platform.ready().cloned().unwrap_or_default(),
                section_errors: s.errors(),
            },
        }
    }

    /// Apply a pass unless a newer one is already applied. Trend points are
    /// recaptured only when the pass carries a newer backend snapshot; the
    /// outgoing metrics become the previous values.
    pub fn commit(&mut self, mut pass: Pass) -> CommitOutcome {
        let applied_seq = self.applied.as_ref().map(|(seq, _)| *seq).unwrap_or(0);
        if pass.sequence <= applied_seq {
            debug!(sequence = pass.sequence, applied = applied_seq, "discarding stale pass");
            return CommitOutcome::Stale {
                sequence: pass.sequence,
                applied: applied_seq,
            };
        }

        let outgoing = self.applied.as_ref().map(|(_, v)| v);
        let applied_generation = self.applied_generation;
        pass.view.trends = match outgoing {
            Some(old) if pass.metrics_generation == applied_generation => old.trends.clone(),
            Some(old) if applied_generation > 0 => {
                capture_trends(Some(&old.snapshot), &pass.view.snapshot)
            }
            _ => capture_trends(None, &pass.view.snapshot),
        };

        info!(
            sequence = pass.sequence,
            red_flags = pass.view.red_flags.len(),
            "pass applied"
        );
        self.applied_generation = pass.metrics_generation;
        let sequence = pass.sequence;
        self.applied = Some((sequence, pass.view));
        CommitOutcome::Applied { sequence }
    }
}
