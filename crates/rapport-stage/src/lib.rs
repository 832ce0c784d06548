//! Host adapter for Rapport.
//!
//! A chat host drives a stage through a handful of lifecycle hooks and
//! stores whatever state the stage returns as an opaque blob on each
//! message. [`RelationshipStage`] implements those hooks over a
//! [`rapport_engine::LedgerEngine`]:
//!
//! - `load` hands the host the seed ledger once per chat
//! - `before_prompt` optionally produces a hidden system message digest
//! - `after_response` steps the ledger for each assistant reply
//! - `set_state` adopts a snapshot after a swipe or branch switch
//! - `render` draws nothing
//!
//! State is threaded through every call explicitly; the stage itself holds
//! no per-chat data. Failures never reach the end user: a corrupt blob
//! falls back to the seed ledger and is reported in
//! [`StageResponse::error`] for host-side diagnostics.

pub mod error;
pub mod hooks;
pub mod stage;
pub mod state;

pub use error::{StageError, StageResult};
pub use hooks::{StageHooks, StageResponse};
pub use stage::RelationshipStage;
pub use state::{InitState, MessageState};
