use serde::{Deserialize, Serialize};

use rapport_types::Ledger;

use crate::error::RuleError;
use crate::pattern::Pattern;

/// A single metric adjustment made when a rule fires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Metric key to adjust. Keys absent from the ledger are ignored.
    pub metric: String,
    /// Signed amount added to the metric's value.
    pub delta: f64,
}

impl Effect {
    pub fn new(metric: impl Into<String>, delta: f64) -> Self {
        Self {
            metric: metric.into(),
            delta,
        }
    }
}

/// A pattern-triggered set of metric adjustments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique name within a rule table.
    pub name: String,
    /// Pattern matched against the lower-cased reply text.
    pub pattern: Pattern,
    /// Adjustments applied, in order, when the pattern matches.
    pub effects: Vec<Effect>,
}

impl Rule {
    /// Build a rule, compiling `pattern`.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        effects: Vec<Effect>,
    ) -> Result<Self, RuleError> {
        Ok(Self {
            name: name.into(),
            pattern: Pattern::compile(pattern)?,
            effects,
        })
    }

    /// Whether this rule fires for already lower-cased reply text.
    pub fn matches_lowered(&self, lowered: &str) -> bool {
        self.pattern.matches_lowered(lowered)
    }

    /// Apply every effect to `ledger`, in order.
    pub fn apply(&self, ledger: &mut Ledger) -> RuleFiring {
        let effects = self
            .effects
            .iter()
            .map(|effect| {
                let applied = ledger.adjust(&effect.metric, effect.delta);
                if !applied {
                    tracing::debug!(
                        rule = %self.name,
                        metric = %effect.metric,
                        "effect targets a metric the ledger does not carry; ignored"
                    );
                }
                AppliedEffect {
                    metric: effect.metric.clone(),
                    delta: effect.delta,
                    applied,
                }
            })
            .collect();

        RuleFiring {
            rule: self.name.clone(),
            effects,
        }
    }
}

/// Record of one rule firing during an evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleFiring {
    pub rule: String,
    pub effects: Vec<AppliedEffect>,
}

impl RuleFiring {
    /// Number of effects that actually changed a metric.
    pub fn applied_count(&self) -> usize {
        self.effects.iter().filter(|e| e.applied).count()
    }
}

/// One effect of a fired rule and whether it found its metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedEffect {
    pub metric: String,
    pub delta: f64,
    pub applied: bool,
}

#[cfg(test)]
mod tests {
    use rapport_types::Metric;

    use super::*;

    fn ledger() -> Ledger {
        Ledger::new("c")
            .with_metric("physical_intimacy", Metric::new(0.0, 0.0))
            .with_metric("sexual_tension", Metric::new(20.0, 2.0))
    }

    fn kiss() -> Rule {
        Rule::new(
            "kiss",
            "kiss",
            vec![
                Effect::new("physical_intimacy", 12.0),
                Effect::new("sexual_tension", -30.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn apply_adjusts_every_effect() {
        let mut l = ledger();
        let firing = kiss().apply(&mut l);
        assert_eq!(firing.rule, "kiss");
        assert_eq!(firing.applied_count(), 2);
        assert_eq!(l.metric("physical_intimacy").unwrap().value, 12.0);
        assert_eq!(l.metric("sexual_tension").unwrap().value, -10.0);
        assert_eq!(l.metric("sexual_tension").unwrap().trend, -30.0);
    }

    #[test]
    fn apply_reports_missing_metrics() {
        let mut l = Ledger::new("c").with_metric("physical_intimacy", Metric::new(0.0, 0.0));
        let firing = kiss().apply(&mut l);
        assert_eq!(firing.applied_count(), 1);
        assert!(!firing.effects[1].applied);
        assert_eq!(firing.effects[1].metric, "sexual_tension");
        assert_eq!(l.metrics.len(), 1);
    }

    #[test]
    fn new_rejects_bad_pattern() {
        let err = Rule::new("bad", "k.ss", vec![Effect::new("trust", 1.0)]).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }

    #[test]
    fn matches_lowered_text_only() {
        let rule = kiss();
        assert!(rule.matches_lowered("a kiss on the cheek"));
        assert!(!rule.matches_lowered("a hug"));
    }
}
