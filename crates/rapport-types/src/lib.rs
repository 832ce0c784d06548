//! Foundation types for Rapport, the relationship ledger engine.
//!
//! Every other Rapport crate depends on `rapport-types`.
//!
//! # Key Types
//!
//! - [`Metric`] — One tracked relationship dimension (value / trend / decay)
//! - [`Ledger`] — The full relationship state for one character in one chat
//! - [`MetricSchema`] — The fixed set of metric keys drawn from a seed ledger
//! - [`SnapshotId`] — Content fingerprint (BLAKE3) of a ledger snapshot

pub mod error;
pub mod fingerprint;
pub mod ledger;
pub mod metric;
pub mod schema;

pub use error::TypeError;
pub use fingerprint::SnapshotId;
pub use ledger::Ledger;
pub use metric::Metric;
pub use schema::MetricSchema;
