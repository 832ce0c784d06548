use rapport_rules::RuleError;
use rapport_types::TypeError;

/// Errors produced by the ledger engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A restored snapshot does not decode as a ledger.
    #[error("corrupt ledger state: {0}")]
    CorruptState(String),

    /// The seed ledger is unusable.
    #[error("invalid seed ledger: {0}")]
    InvalidSeed(String),

    /// Engine configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("rule error: {0}")]
    Rules(#[from] RuleError),

    #[error("type error: {0}")]
    Types(#[from] TypeError),
}
