use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::fingerprint::SnapshotId;
use crate::metric::Metric;

/// The complete relationship state for one character in one chat session.
///
/// All maps are ordered so that the JSON encoding of a ledger is canonical:
/// two equal ledgers always serialize to the same bytes, which is what
/// [`Ledger::fingerprint`] relies on.
///
/// `Clone` is a deep copy. Callers that hand a ledger to the host and keep
/// working on it must clone first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Identifier of the character this ledger tracks.
    pub char_id: String,
    /// Static personality traits carried along for prompt builders.
    #[serde(default)]
    pub personality: BTreeMap<String, f64>,
    /// Tracked metrics. Keys are fixed by the seed ledger.
    pub metrics: BTreeMap<String, Metric>,
    /// Free-form flags, opaque to the engine.
    #[serde(default)]
    pub flags: BTreeMap<String, Value>,
    /// Free-form memories, opaque to the engine.
    #[serde(default)]
    pub memories: Vec<Value>,
}

impl Ledger {
    /// An empty ledger for `char_id` with no metrics.
    pub fn new(char_id: impl Into<String>) -> Self {
        Self {
            char_id: char_id.into(),
            personality: BTreeMap::new(),
            metrics: BTreeMap::new(),
            flags: BTreeMap::new(),
            memories: Vec::new(),
        }
    }

    /// Builder-style helper to add a metric.
    pub fn with_metric(mut self, key: impl Into<String>, metric: Metric) -> Self {
        self.metrics.insert(key.into(), metric);
        self
    }

    /// Decode a ledger from an opaque JSON document.
    ///
    /// `char_id` and `metrics` are required. Anything else that does not
    /// match the ledger shape is reported as [`TypeError::InvalidSnapshot`].
    pub fn from_value(value: &Value) -> Result<Self, TypeError> {
        Self::deserialize(value).map_err(|e| TypeError::InvalidSnapshot(e.to_string()))
    }

    /// Decode a ledger from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, TypeError> {
        serde_json::from_str(json).map_err(|e| TypeError::InvalidSnapshot(e.to_string()))
    }

    /// Encode as an opaque JSON document for the host to persist.
    pub fn to_value(&self) -> Result<Value, TypeError> {
        serde_json::to_value(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Pretty-printed JSON text.
    pub fn to_json_pretty(&self) -> Result<String, TypeError> {
        serde_json::to_string_pretty(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn metric(&self, key: &str) -> Option<&Metric> {
        self.metrics.get(key)
    }

    /// Adjust the metric at `key` by `delta`.
    ///
    /// A key that is not present is ignored. Returns `true` when the
    /// adjustment was applied.
    pub fn adjust(&mut self, key: &str, delta: f64) -> bool {
        match self.metrics.get_mut(key) {
            Some(metric) => {
                metric.adjust(delta);
                true
            }
            None => false,
        }
    }

    /// Apply one turn of decay to every metric.
    pub fn decay_all(&mut self) {
        for metric in self.metrics.values_mut() {
            metric.decay();
        }
    }

    /// Clamp every metric value into `[min, max]`.
    pub fn clamp_all(&mut self, min: f64, max: f64) {
        for metric in self.metrics.values_mut() {
            metric.clamp(min, max);
        }
    }

    /// Saturate overflowed metric values at the `f64` limits.
    ///
    /// Returns the keys that had overflowed.
    pub fn saturate_all(&mut self) -> Vec<String> {
        self.metrics
            .iter_mut()
            .filter_map(|(key, metric)| metric.saturate().then(|| key.clone()))
            .collect()
    }

    /// Keys of metrics holding a NaN or infinite field.
    pub fn non_finite_metrics(&self) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|(_, m)| !m.is_finite())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Content fingerprint of this ledger.
    pub fn fingerprint(&self) -> Result<SnapshotId, TypeError> {
        let json = serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(SnapshotId::of_ledger_json(&json))
    }
}
