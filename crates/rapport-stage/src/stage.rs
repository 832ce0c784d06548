use std::path::Path;

use serde_json::Value;
use tracing::warn;

use rapport_engine::{EngineConfig, LedgerEngine};
use rapport_rules::RuleSet;
use rapport_types::Ledger;

use crate::error::{StageError, StageResult};
use crate::hooks::{StageHooks, StageResponse};
use crate::state::{decode_state, InitState, MessageState};

/// Seed ledger shipped with the stage.
const BUNDLED_SEED: &str = include_str!("../assets/relationship_char.json");

/// Hidden relationship tracker.
pub struct RelationshipStage {
    engine: LedgerEngine,
}

impl RelationshipStage {
    pub fn new(engine: LedgerEngine) -> Self {
        Self { engine }
    }

    /// Stage over the bundled seed, built-in rules and default config.
    pub fn bundled() -> StageResult<Self> {
        Self::from_seed_json(BUNDLED_SEED)
    }

    /// Stage over a seed document given as JSON text.
    pub fn from_seed_json(json: &str) -> StageResult<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| StageError::Seed(e.to_string()))?;
        Ok(Self::new(LedgerEngine::from_seed_value(&value)?))
    }

    /// Stage over a seed file (or the bundled seed), with optional rule
    /// table and config files.
    pub fn from_paths(
        seed: Option<&Path>,
        rules: Option<&Path>,
        config: Option<&Path>,
    ) -> StageResult<Self> {
        let mut engine = match seed {
            Some(path) => Self::from_seed_json(&std::fs::read_to_string(path)?)?.engine,
            None => Self::bundled()?.engine,
        };
        if let Some(path) = rules {
            engine = engine.with_rules(RuleSet::from_path(path)?);
        }
        if let Some(path) = config {
            engine = engine.with_config(EngineConfig::from_path(path)?)?;
        }
        Ok(Self::new(engine))
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Resolve a host blob to a working ledger.
    ///
    /// Returns the seed with an error note when the blob is corrupt.
    fn resolve(&self, state: Option<&Value>) -> (Option<Ledger>, Option<String>) {
        match state {
            None | Some(Value::Null) => (None, None),
            Some(blob) => match decode_state(&self.engine, blob) {
                Ok(ledger) => (Some(ledger), None),
                Err(e) => {
                    warn!(error = %e, "stored ledger state is unusable; restarting from seed");
                    (None, Some(e.to_string()))
                }
            },
        }
    }
}

impl StageHooks for RelationshipStage {
    fn load(&self) -> StageResult<InitState> {
        Ok(InitState {
            seed: self.engine.initialize(),
        })
    }

    fn before_prompt(&self, state: Option<&Value>) -> StageResponse {
        let (ledger, error) = self.resolve(state);
        let ledger = ledger.unwrap_or_else(|| self.engine.initialize());
        StageResponse {
            message_state: None,
            system_message: self.engine.digest(&ledger),
            error,
        }
    }

    fn after_response(&self, state: Option<&Value>, reply: &str) -> StageResponse {
        let (prior, mut error) = self.resolve(state);
        let ledger = self.engine.step(prior.as_ref(), reply);

        let message_state = match (MessageState { ledger }).to_value() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "could not encode ledger state");
                error.get_or_insert_with(|| e.to_string());
                None
            }
        };

        StageResponse {
            message_state,
            system_message: None,
            error,
        }
    }

    fn set_state(&self, state: Option<&Value>) -> Ledger {
        let (ledger, _) = self.resolve(state);
        ledger.unwrap_or_else(|| self.engine.initialize())
    }
}
