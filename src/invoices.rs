//! Baseline energy and carbon from the most recent electricity invoices.
use crate::types::{InvoiceRecord, InvoiceTotals};
use std::cmp::Ordering;

/// Number of billing periods that make up the invoice baseline.
pub const INVOICE_WINDOW: usize = 6;

/// The most recent [`INVOICE_WINDOW`] records, newest first.
///
/// The sort is stable, so records sharing a date keep their input order and
/// the same unordered input always yields the same window. Records whose
/// date could not be read sort after every dated record.
pub fn recent_window(records: &[InvoiceRecord]) -> Vec<&InvoiceRecord> {
    let mut sorted: Vec<&InvoiceRecord> = records.iter().collect();
    sorted.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted.truncate(INVOICE_WINDOW);
    sorted
}

/// Carbon for one record: its own tonnage when present, otherwise energy
/// times the record's factor (or the default factor).
fn record_carbon(record: &InvoiceRecord, default_factor: f64) -> f64 {
    if let Some(t) = record.carbon_tonnes {
        return t;
    }
    let factor = record.emission_factor.unwrap_or(default_factor);
    record.energy_kwh.unwrap_or(0.0) * factor
}

/// Sum the recent window into baseline totals. An empty input gives unknown
/// totals rather than zeros.
pub fn aggregate(records: &[InvoiceRecord], default_factor: f64) -> InvoiceTotals {
    let window = recent_window(records);
    if window.is_empty() {
        return InvoiceTotals::default();
    }
    let energy: f64 = window.iter().map(|r| r.energy_kwh.unwrap_or(0.0)).sum();
    let carbon: f64 = window
        .iter()
        .map(|r| record_carbon(r, default_factor))
        .sum();
    InvoiceTotals {
        total_energy_kwh: Some(energy),
        total_carbon_tonnes: Some(carbon),
    }
}
