//! Reply rules for Rapport.
//!
//! A rule pairs a pattern with a list of metric effects. After every
//! assistant reply the engine runs a [`RuleSet`] over the lower-cased reply
//! text. Rules are evaluated in declared order and independently of one
//! another: a reply that mentions both a hug and a kiss fires both rules.
//!
//! Patterns are compiled into a finite set of literal needles (see
//! [`Pattern`]), so matching is plain case-insensitive substring search.
//!
//! # Quick Start
//!
//! ```rust
//! use rapport_rules::RuleSet;
//! use rapport_types::{Ledger, Metric};
//!
//! let rules = RuleSet::canonical();
//! let mut ledger = Ledger::new("char").with_metric("trust", Metric::new(50.0, 1.0));
//! let fired = rules.evaluate(&mut ledger, "Thank you so much!");
//! assert_eq!(fired.len(), 1);
//! assert_eq!(ledger.metric("trust").unwrap().value, 52.0);
//! ```

pub mod error;
pub mod pattern;
pub mod rule;
pub mod ruleset;

pub use error::RuleError;
pub use pattern::{Needle, Pattern};
pub use rule::{AppliedEffect, Effect, Rule, RuleFiring};
pub use ruleset::RuleSet;
