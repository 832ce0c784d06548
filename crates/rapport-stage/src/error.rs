use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("seed configuration error: {0}")]
    Seed(String),

    #[error("engine error: {0}")]
    Engine(#[from] rapport_engine::EngineError),

    #[error("rule error: {0}")]
    Rules(#[from] rapport_rules::RuleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StageResult<T> = Result<T, StageError>;
