//! Rule-based risk warnings over a resolved snapshot.
//!
//! Every rule in [`RULES`] is tested on every evaluation; none short-circuits
//! another. A rule whose input is unknown does not fire.
use crate::types::{
    ResolvedSnapshot, RENEWABLE_ENERGY_SHARE, SUPPLIER_DIVERSITY, TOTAL_COMPLIANCE_FINDINGS,
    TOTAL_ENERGY_CONSUMPTION,
};
use crate::util::{format_below, format_compact};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    LessThan,
    GreaterThan,
}

impl Comparator {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::LessThan => value < threshold,
            Comparator::GreaterThan => value > threshold,
        }
    }
}

pub struct RedFlagRule {
    pub name: &'static str,
    /// Reads the measured value; `None` when it is unknown.
    pub measure: fn(&ResolvedSnapshot) -> Option<f64>,
    pub comparator: Comparator,
    pub threshold: f64,
    pub message: fn(f64) -> String,
}

impl RedFlagRule {
    pub fn evaluate(&self, snapshot: &ResolvedSnapshot) -> Option<String> {
        let value = (self.measure)(snapshot)?;
        if self.comparator.holds(value, self.threshold) {
            Some((self.message)(value))
        } else {
            None
        }
    }
}

pub const RENEWABLE_SHARE_MIN: f64 = 20.0;
pub const CARBON_TAX_MAX: f64 = 20_000_000.0;
pub const ENERGY_SAVINGS_MIN_PCT: f64 = 5.0;
pub const SUPPLIER_DIVERSITY_MIN: f64 = 5.0;

pub const RULES: &[RedFlagRule] = &[
    RedFlagRule {
        name: "low_renewable_share",
        measure: renewable_share,
        comparator: Comparator::LessThan,
        threshold: RENEWABLE_SHARE_MIN,
        message: renewable_message,
    },
    RedFlagRule {
        name: "carbon_tax_exposure",
        measure: carbon_tax,
        comparator: Comparator::GreaterThan,
        threshold: CARBON_TAX_MAX,
        message: carbon_tax_message,
    },
    RedFlagRule {
        name: "low_energy_savings",
        measure: energy_savings_pct,
        comparator: Comparator::LessThan,
        threshold: ENERGY_SAVINGS_MIN_PCT,
        message: energy_savings_message,
    },
    RedFlagRule {
        name: "low_supplier_diversity",
        measure: supplier_diversity,
        comparator: Comparator::LessThan,
        threshold: SUPPLIER_DIVERSITY_MIN,
        message: supplier_diversity_message,
    },
    RedFlagRule {
        name: "open_compliance_findings",
        measure: compliance_findings,
        comparator: Comparator::GreaterThan,
        threshold: 0.0,
        message: compliance_message,
    },
];

fn renewable_share(s: &ResolvedSnapshot) -> Option<f64> {
    s.environmental.get(RENEWABLE_ENERGY_SHARE)
}

fn carbon_tax(s: &ResolvedSnapshot) -> Option<f64> {
    Some(s.metrics.carbon_tax)
}

/// Savings as a share of total energy; only defined for positive totals.
fn energy_savings_pct(s: &ResolvedSnapshot) -> Option<f64> {
    let total = s
        .environmental
        .get(TOTAL_ENERGY_CONSUMPTION)
        .filter(|t| *t > 0.0)?;
    Some(s.metrics.energy_savings / total * 100.0)
}

fn supplier_diversity(s: &ResolvedSnapshot) -> Option<f64> {
    s.social.get(SUPPLIER_DIVERSITY)
}

fn compliance_findings(s: &ResolvedSnapshot) -> Option<f64> {
    s.governance.get(TOTAL_COMPLIANCE_FINDINGS)
}

fn renewable_message(v: f64) -> String {
    format!(
        "Renewable energy share is only {}%. This is below the {}% threshold.",
        format_below(v, RENEWABLE_SHARE_MIN, 3),
        RENEWABLE_SHARE_MIN
    )
}

fn carbon_tax_message(v: f64) -> String {
    format!(
        "Carbon tax exposure (R {}) is above the defined risk threshold.",
        format_compact(v, 3)
    )
}

fn energy_savings_message(pct: f64) -> String {
    format!(
        "Energy savings represent only {:.1}% of total energy use – consider additional efficiency projects.",
        pct
    )
}

fn supplier_diversity_message(v: f64) -> String {
    format!(
        "Supplier diversity ({}%) is low – this may create concentration and social risk.",
        format_below(v, SUPPLIER_DIVERSITY_MIN, 3)
    )
}

fn compliance_message(v: f64) -> String {
    format!(
        "There are {} open compliance findings – review governance actions.",
        format_compact(v, 3)
    )
}

/// Evaluate the full rule table in order.
pub fn evaluate(snapshot: &ResolvedSnapshot) -> Vec<String> {
    RULES
        .iter()
        .filter_map(|rule| {
            let flag = rule.evaluate(snapshot)?;
            debug!(rule = rule.name, "red flag raised");
            Some(flag)
        })
        .collect()
}
