use serde::{Deserialize, Serialize};

/// One scalar relationship dimension tracked by a ledger.
///
/// - `value` is the current magnitude. Nothing on this type bounds it.
/// - `trend` is the delta of the most recent rule adjustment. It is
///   overwritten on every adjustment and never touched by decay.
/// - `decay` is subtracted from `value` once per turn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub value: f64,
    #[serde(default)]
    pub trend: f64,
    #[serde(default)]
    pub decay: f64,
}

impl Metric {
    /// A metric at `value` with no trend and the given per-turn decay.
    pub fn new(value: f64, decay: f64) -> Self {
        Self {
            value,
            trend: 0.0,
            decay,
        }
    }

    /// Apply a rule-driven delta: `value += delta`, `trend := delta`.
    pub fn adjust(&mut self, delta: f64) {
        self.value += delta;
        self.trend = delta;
    }

    /// Apply one turn of decay.
    pub fn decay(&mut self) {
        self.value -= self.decay;
    }

    /// Clamp `value` into `[min, max]`. `trend` is left as is.
    pub fn clamp(&mut self, min: f64, max: f64) {
        self.value = self.value.clamp(min, max);
    }

    /// Whether every field is a finite number. JSON cannot carry the rest.
    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.trend.is_finite() && self.decay.is_finite()
    }

    /// Pull an overflowed `value` back to the nearest finite `f64`.
    /// Returns `true` if it had overflowed.
    pub fn saturate(&mut self) -> bool {
        if self.value.is_infinite() {
            self.value = f64::MAX.copysign(self.value);
            true
        } else {
            false
        }
    }
}
