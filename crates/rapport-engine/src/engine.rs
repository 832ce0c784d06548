use serde_json::Value;
use tracing::{debug, warn};

use rapport_rules::{RuleFiring, RuleSet};
use rapport_types::{Ledger, MetricSchema, SnapshotId};

use crate::config::EngineConfig;
use crate::digest::render_digest;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// StepReport
// ---------------------------------------------------------------------------

/// Everything one turn did, for hosts and tools that want more than the
/// next snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// The new snapshot.
    pub ledger: Ledger,
    /// Rules that fired, in evaluation order.
    pub fired: Vec<RuleFiring>,
    /// `true` when there was no prior snapshot and the seed was used.
    pub initialized: bool,
    /// Fingerprint of the prior snapshot, if one was supplied.
    pub prior_fingerprint: Option<SnapshotId>,
    /// Fingerprint of the new snapshot.
    pub fingerprint: SnapshotId,
}

// ---------------------------------------------------------------------------
// LedgerEngine
// ---------------------------------------------------------------------------

/// Deterministic relationship ledger engine.
///
/// The engine never mutates a snapshot it is handed. Every entry point
/// works on a deep clone and returns it.
#[derive(Clone, Debug)]
pub struct LedgerEngine {
    seed: Ledger,
    schema: MetricSchema,
    rules: RuleSet,
    config: EngineConfig,
}

impl LedgerEngine {
    /// Create an engine over `seed` with the built-in rule table and the
    /// default configuration.
    pub fn new(seed: Ledger) -> Self {
        let schema = MetricSchema::from_ledger(&seed);
        let rules = RuleSet::canonical();
        debug!(
            char_id = %seed.char_id,
            metrics = schema.len(),
            rules = rules.len(),
            "ledger engine ready"
        );
        Self {
            seed,
            schema,
            rules,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine from an opaque seed document.
    pub fn from_seed_value(seed: &Value) -> Result<Self, EngineError> {
        let seed = Ledger::from_value(seed).map_err(|e| EngineError::InvalidSeed(e.to_string()))?;
        Self::checked(seed)
    }

    /// Create an engine, rejecting seeds that can never be driven.
    pub fn checked(seed: Ledger) -> Result<Self, EngineError> {
        if seed.char_id.trim().is_empty() {
            return Err(EngineError::InvalidSeed("char_id must not be empty".into()));
        }
        if seed.metrics.is_empty() {
            return Err(EngineError::InvalidSeed(
                "seed must define at least one metric".into(),
            ));
        }
        let non_finite = seed.non_finite_metrics();
        if !non_finite.is_empty() {
            return Err(EngineError::InvalidSeed(format!(
                "metrics with non-finite fields: {}",
                non_finite.join(", ")
            )));
        }
        Ok(Self::new(seed))
    }

    /// Replace the rule table.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn seed(&self) -> &Ledger {
        &self.seed
    }

    pub fn schema(&self) -> &MetricSchema {
        &self.schema
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// A fresh working ledger: an independent copy of the seed.
    pub fn initialize(&self) -> Ledger {
        self.seed.clone()
    }

    /// Adopt a host-supplied snapshot wholesale.
    ///
    /// Returns [`EngineError::CorruptState`] when the document does not
    /// decode as a ledger.
    pub fn try_restore(&self, snapshot: &Value) -> Result<Ledger, EngineError> {
        let ledger =
            Ledger::from_value(snapshot).map_err(|e| EngineError::CorruptState(e.to_string()))?;
        Ok(self.adopt(ledger))
    }

    /// Adopt a host-supplied snapshot, falling back to the seed when it is
    /// corrupt. Never fails.
    pub fn restore(&self, snapshot: &Value) -> Ledger {
        match self.try_restore(snapshot) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(error = %e, char_id = %self.seed.char_id, "falling back to seed ledger");
                self.initialize()
            }
        }
    }

    /// Adopt an already decoded snapshot: an independent copy of it.
    pub fn restore_ledger(&self, snapshot: &Ledger) -> Ledger {
        self.adopt(snapshot.clone())
    }

    fn adopt(&self, mut ledger: Ledger) -> Ledger {
        if self.config.prune_unknown_metrics {
            let pruned = self.schema.prune(&mut ledger);
            if !pruned.is_empty() {
                warn!(?pruned, "dropped metrics not present in the seed");
            }
        }
        ledger
    }

    // -----------------------------------------------------------------------
    // Turn primitives
    // -----------------------------------------------------------------------

    /// `value += delta`, `trend := delta` on the metric at `key`. A missing
    /// key is a silent no-op. Returns whether the metric was found.
    pub fn adjust(&self, ledger: &mut Ledger, key: &str, delta: f64) -> bool {
        ledger.adjust(key, delta)
    }

    /// Run the rule table over `reply`.
    pub fn evaluate_rules(&self, ledger: &mut Ledger, reply: &str) -> Vec<RuleFiring> {
        self.rules.evaluate(ledger, reply)
    }

    /// Subtract every metric's decay once.
    pub fn decay_all(&self, ledger: &mut Ledger) {
        ledger.decay_all();
    }

    fn clamp(&self, ledger: &mut Ledger) {
        if let Some(bounds) = &self.config.bounds {
            ledger.clamp_all(bounds.min, bounds.max);
        }
    }

    // -----------------------------------------------------------------------
    // Orchestration
    // -----------------------------------------------------------------------

    /// Produce the next snapshot from `prior` (or the seed) and `reply`.
    ///
    /// Rules run first, then decay, then clamping if configured. Decay
    /// applies to every metric, including ones a rule just adjusted. Values
    /// that overflow are saturated at the `f64` limits so the snapshot
    /// always encodes as JSON.
    pub fn step(&self, prior: Option<&Ledger>, reply: &str) -> Ledger {
        self.advance(prior, reply).0
    }

    /// [`Self::step`], also reporting fired rules and fingerprints.
    pub fn step_with_report(
        &self,
        prior: Option<&Ledger>,
        reply: &str,
    ) -> Result<StepReport, EngineError> {
        let prior_fingerprint = prior.map(Ledger::fingerprint).transpose()?;
        let (ledger, fired) = self.advance(prior, reply);
        let fingerprint = ledger.fingerprint()?;
        Ok(StepReport {
            ledger,
            fired,
            initialized: prior.is_none(),
            prior_fingerprint,
            fingerprint,
        })
    }

    pub(crate) fn advance(&self, prior: Option<&Ledger>, reply: &str) -> (Ledger, Vec<RuleFiring>) {
        let mut working = match prior {
            Some(ledger) => ledger.clone(),
            None => self.initialize(),
        };
        let fired = self.evaluate_rules(&mut working, reply);
        self.decay_all(&mut working);
        self.clamp(&mut working);
        let saturated = working.saturate_all();
        if !saturated.is_empty() {
            warn!(?saturated, "metric values overflowed; saturated at f64 limits");
        }
        debug!(
            char_id = %working.char_id,
            fired = fired.len(),
            initialized = prior.is_none(),
            "ledger stepped"
        );
        (working, fired)
    }

    /// Prompt digest of `ledger`, if enabled and non-empty.
    pub fn digest(&self, ledger: &Ledger) -> Option<String> {
        render_digest(&self.config.digest, ledger)
    }
}
