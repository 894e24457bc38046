//! ESG metric reconciliation and derivation engine.
//!
//! Independent, partially overlapping sources (backend summary, electricity
//! invoices, an uploaded dataset, a simulation context aggregate and the
//! per-pillar insight feeds) are merged into one canonical snapshot, from
//! which energy intensity, trend badges and red-flag warnings are derived.
pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod invoices;
pub mod loader;
pub mod output;
pub mod red_flags;
pub mod reports;
pub mod resolver;
pub mod trend;
pub mod types;
pub mod util;
