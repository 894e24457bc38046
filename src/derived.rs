//! Energy intensity series and benchmark comparison.
use crate::types::{ContextAggregate, DerivedMetrics};
use crate::util::{average, round_to};
use serde::Serialize;

/// Reporting periods in one derived series.
pub const PERIODS: usize = 12;

pub const MONTH_LABELS: [&str; PERIODS] = [
    "Jan-24", "Feb-24", "Mar-24", "Apr-24", "May-24", "Jun-24", "Jul-24", "Aug-24", "Sep-24",
    "Oct-24", "Nov-24", "Dec-24",
];

/// Number of leading non-zero periods averaged into the baseline.
const BASELINE_PERIODS: usize = 3;

/// Coerce a series to exactly [`PERIODS`] finite values, padding with 0.
pub fn to_periods(series: &[f64]) -> [f64; PERIODS] {
    let mut out = [0.0; PERIODS];
    for (slot, v) in out.iter_mut().zip(series.iter()) {
        if v.is_finite() {
            *slot = *v;
        }
    }
    out
}

/// Per-period intensity, `energy / max(production, 1)`, rounded to four
/// decimals.
pub fn intensity_series(energy_use: &[f64; PERIODS], production: &[f64; PERIODS]) -> Vec<f64> {
    energy_use
        .iter()
        .zip(production.iter())
        .map(|(e, p)| round_to(e / p.max(1.0), 4))
        .collect()
}

pub fn derive(
    energy_use: &[f64; PERIODS],
    production: &[f64; PERIODS],
    external_benchmark: Option<f64>,
) -> DerivedMetrics {
    let intensity = intensity_series(energy_use, production);
    let non_zero: Vec<f64> = intensity.iter().copied().filter(|v| *v > 0.0).collect();

    let baseline = if non_zero.is_empty() {
        None
    } else {
        let head = &non_zero[..non_zero.len().min(BASELINE_PERIODS)];
        Some(average(head))
    };
    let current = non_zero.last().copied();

    // Without an external figure the baseline stands in as the benchmark.
    let benchmark = external_benchmark.filter(|b| b.is_finite()).or(baseline);

    let delta = match (current, benchmark) {
        (Some(c), Some(b)) => Some(c - b),
        _ => None,
    };
    let percent = match (delta, benchmark) {
        (Some(d), Some(b)) if b != 0.0 => Some(d / b * 100.0),
        _ => None,
    };

    DerivedMetrics {
        intensity,
        baseline,
        current,
        benchmark,
        delta,
        percent,
    }
}

/// The monthly energy/production series together with what is derived
/// from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnergyProfile {
    pub energy_use: Vec<f64>,
    pub production: Vec<f64>,
    pub derived: DerivedMetrics,
}

impl EnergyProfile {
    /// Values of the last reporting period: energy, production, intensity.
    pub fn latest(&self) -> (f64, f64, f64) {
        let last = |v: &[f64]| v.last().copied().unwrap_or(0.0);
        (
            last(&self.energy_use[..]),
            last(&self.production[..]),
            last(&self.derived.intensity[..]),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.energy_use.iter().all(|v| *v == 0.0) && self.production.iter().all(|v| *v == 0.0)
    }
}

/// Build the profile from the context aggregate; an absent aggregate is an
/// all-zero series with unknown baseline.
pub fn energy_profile(context: Option<&ContextAggregate>) -> EnergyProfile {
    let (energy_use, production, benchmark) = match context {
        Some(ctx) => (
            to_periods(&ctx.energy_use),
            to_periods(&ctx.production),
            ctx.benchmark_intensity,
        ),
        None => ([0.0; PERIODS], [0.0; PERIODS], None),
    };
    EnergyProfile {
        derived: derive(&energy_use, &production, benchmark),
        energy_use: energy_use.to_vec(),
        production: production.to_vec(),
    }
}
