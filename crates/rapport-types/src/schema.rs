use std::collections::BTreeSet;

use crate::ledger::Ledger;

/// The fixed set of metric keys a session may carry.
///
/// Drawn from the seed ledger once, when the engine is built. Rules never
/// add keys, and restored snapshots are checked against it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricSchema {
    keys: BTreeSet<String>,
}

impl MetricSchema {
    /// Schema containing exactly the metric keys of `seed`.
    pub fn from_ledger(seed: &Ledger) -> Self {
        Self {
            keys: seed.metrics.keys().cloned().collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop metrics whose keys are not in the schema.
    ///
    /// Returns the removed keys in order.
    pub fn prune(&self, ledger: &mut Ledger) -> Vec<String> {
        let unknown: Vec<String> = ledger
            .metrics
            .keys()
            .filter(|k| !self.keys.contains(k.as_str()))
            .cloned()
            .collect();
        for key in &unknown {
            ledger.metrics.remove(key);
        }
        unknown
    }

    /// Schema keys absent from `ledger`.
    pub fn missing_from(&self, ledger: &Ledger) -> Vec<String> {
        self.keys
            .iter()
            .filter(|k| !ledger.metrics.contains_key(k.as_str()))
            .cloned()
            .collect()
    }
}
