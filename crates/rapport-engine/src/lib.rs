//! The Rapport ledger engine.
//!
//! [`LedgerEngine`] turns `(prior snapshot, reply text)` into the next
//! snapshot. It holds only immutable configuration (the seed ledger, its
//! metric schema, the rule table, and [`EngineConfig`]); all session state
//! is threaded through explicitly, so one engine can serve any number of
//! chats and branches.
//!
//! Each turn:
//! 1. clone the prior snapshot, or the seed when there is none
//! 2. run the rule table over the lower-cased reply
//! 3. subtract every metric's decay
//! 4. clamp, if bounds are configured
//!
//! # Quick Start
//!
//! ```rust
//! use rapport_engine::LedgerEngine;
//! use rapport_types::{Ledger, Metric};
//!
//! let seed = Ledger::new("char").with_metric("trust", Metric::new(50.0, 1.0));
//! let engine = LedgerEngine::new(seed);
//! let next = engine.step(None, "Thank you so much!");
//! assert_eq!(next.metric("trust").unwrap().value, 51.0);
//! assert_eq!(next.metric("trust").unwrap().trend, 2.0);
//! ```

pub mod config;
pub mod digest;
pub mod engine;
pub mod error;
pub mod replay;

pub use config::{DigestConfig, EngineConfig, MetricBounds};
pub use digest::render_digest;
pub use engine::{LedgerEngine, StepReport};
pub use error::EngineError;
pub use replay::ReplayResult;
