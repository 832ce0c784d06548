use serde::{Deserialize, Serialize};
use serde_json::Value;

use rapport_engine::{EngineError, LedgerEngine};
use rapport_types::Ledger;

/// State handed to the host once, when a chat starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitState {
    pub seed: Ledger,
}

/// Per-message state the host persists and hands back on the next turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageState {
    pub ledger: Ledger,
}

impl MessageState {
    /// Encode as the opaque blob the host stores.
    pub fn to_value(&self) -> Result<Value, rapport_types::TypeError> {
        serde_json::to_value(self).map_err(|e| rapport_types::TypeError::Serialization(e.to_string()))
    }
}

/// Decode an opaque state blob through `engine`.
///
/// Accepts either a [`MessageState`] envelope (`{"ledger": {...}}`) or a bare
/// ledger document. Anything else is [`EngineError::CorruptState`].
pub fn decode_state(engine: &LedgerEngine, blob: &Value) -> Result<Ledger, EngineError> {
    match blob.get("ledger") {
        Some(inner) => engine.try_restore(inner),
        None => engine.try_restore(blob),
    }
}
