use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rapport_types::Ledger;

use crate::error::RuleError;
use crate::rule::{Effect, Rule, RuleFiring};

/// TOML document shape: one `[[rule]]` table per rule.
#[derive(Serialize, Deserialize)]
struct RuleTable {
    #[serde(default)]
    rule: Vec<Rule>,
}

/// An ordered, validated rule table.
///
/// Order matters only for `trend`: when two fired rules touch the same
/// metric, the later rule's delta is the one left in `trend`.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule table, validating names and effects.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        for (index, rule) in rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(RuleError::EmptyName(index));
            }
            if rule.effects.is_empty() {
                return Err(RuleError::EmptyEffects(rule.name.clone()));
            }
            if let Some(effect) = rule.effects.iter().find(|e| !e.delta.is_finite()) {
                return Err(RuleError::NonFiniteDelta {
                    rule: rule.name.clone(),
                    metric: effect.metric.clone(),
                });
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(RuleError::DuplicateRule(rule.name.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// A table with no rules. Evaluation never changes anything.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rule table.
    pub fn canonical() -> Self {
        let rule = |name: &str, pattern: &str, effects: Vec<Effect>| Rule {
            name: name.to_string(),
            pattern: crate::Pattern::compile(pattern).expect("built-in patterns compile"),
            effects,
        };

        Self {
            rules: vec![
                rule(
                    "closeness",
                    "hug|cuddle|embraces",
                    vec![Effect::new("physical_intimacy", 8.0)],
                ),
                rule(
                    "kiss",
                    "kiss",
                    vec![
                        Effect::new("physical_intimacy", 12.0),
                        Effect::new("sexual_tension", -30.0),
                    ],
                ),
                rule(
                    "rejection",
                    "push(es)? away|rejects",
                    vec![Effect::new("physical_intimacy", -10.0)],
                ),
                rule(
                    "gratitude",
                    "thank(s)? you",
                    vec![Effect::new("trust", 2.0)],
                ),
                rule(
                    "conflict",
                    "argue|yell",
                    vec![Effect::new("trust", -5.0), Effect::new("resentment", 5.0)],
                ),
            ],
        }
    }

    /// Parse a rule table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, RuleError> {
        let table: RuleTable = toml::from_str(text).map_err(|e| RuleError::Parse(e.to_string()))?;
        Self::new(table.rule)
    }

    /// Load a rule table from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, RuleError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Serialize as a TOML rule table.
    pub fn to_toml_string(&self) -> Result<String, RuleError> {
        let table = RuleTable {
            rule: self.rules.clone(),
        };
        toml::to_string(&table).map_err(|e| RuleError::Parse(e.to_string()))
    }

    /// Append a rule to the end of the table.
    pub fn push(&mut self, rule: Rule) -> Result<(), RuleError> {
        let mut rules = self.rules.clone();
        rules.push(rule);
        *self = Self::new(rules)?;
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `reply`, in order, mutating `ledger`.
    ///
    /// The reply is lower-cased once. Each rule is checked independently;
    /// a miss is not an error. Returns the rules that fired.
    pub fn evaluate(&self, ledger: &mut Ledger, reply: &str) -> Vec<RuleFiring> {
        let lowered = reply.to_lowercase();
        let mut fired = Vec::new();

        for rule in &self.rules {
            if !rule.matches_lowered(&lowered) {
                continue;
            }
            let firing = rule.apply(ledger);
            tracing::debug!(
                rule = %firing.rule,
                applied = firing.applied_count(),
                "rule fired"
            );
            fired.push(firing);
        }

        fired
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rapport_types::Metric;

    use super::*;

    const CANONICAL_TOML: &str = include_str!("../rules/canonical.toml");

    fn ledger() -> Ledger {
        Ledger::new("c")
            .with_metric("trust", Metric::new(50.0, 1.0))
            .with_metric("resentment", Metric::new(0.0, 0.0))
            .with_metric("physical_intimacy", Metric::new(0.0, 0.0))
            .with_metric("sexual_tension", Metric::new(20.0, 2.0))
    }

    fn value(l: &Ledger, k: &str) -> f64 {
        l.metric(k).unwrap().value
    }

    // -----------------------------------------------------------------------
    // Canonical table
    // -----------------------------------------------------------------------

    #[test]
    fn canonical_table_order() {
        let names: Vec<_> = RuleSet::canonical()
            .rules()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(
            names,
            vec!["closeness", "kiss", "rejection", "gratitude", "conflict"]
        );
    }

    #[test]
    fn builtin_patterns_compile_to_expected_needles() {
        let expected: [(&str, &[&str]); 5] = [
            ("closeness", &["hug", "cuddle", "embraces"]),
            ("kiss", &["kiss"]),
            ("rejection", &["pushes away", "push away", "rejects"]),
            ("gratitude", &["thanks you", "thank you"]),
            ("conflict", &["argue", "yell"]),
        ];
        let set = RuleSet::canonical();
        assert_eq!(set.len(), expected.len());
        for (rule, (name, needles)) in set.rules().iter().zip(expected) {
            assert_eq!(rule.name, name);
            let recompiled = crate::Pattern::compile(rule.pattern.source()).unwrap();
            let texts: Vec<&str> = recompiled.needles().iter().map(|n| n.text()).collect();
            assert_eq!(texts, needles, "{name}");
        }
    }

    #[test]
    fn canonical_toml_matches_builtin_table() {
        let loaded = RuleSet::from_toml_str(CANONICAL_TOML).unwrap();
        assert_eq!(loaded, RuleSet::canonical());
    }

    #[test]
    fn toml_export_round_trips() {
        let text = RuleSet::canonical().to_toml_string().unwrap();
        assert_eq!(RuleSet::from_toml_str(&text).unwrap(), RuleSet::canonical());
    }

    #[test]
    fn default_is_canonical() {
        assert_eq!(RuleSet::default(), RuleSet::canonical());
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn no_match_changes_nothing() {
        let mut l = ledger();
        let before = l.clone();
        let fired = RuleSet::canonical().evaluate(&mut l, "The weather is nice today.");
        assert!(fired.is_empty());
        assert_eq!(l, before);
    }

    #[test]
    fn rules_fire_independently() {
        let mut l = ledger();
        let fired = RuleSet::canonical().evaluate(&mut l, "She gives him a hug. \"Thank you.\"");
        assert_eq!(fired.len(), 2);
        assert_eq!(value(&l, "physical_intimacy"), 8.0);
        assert_eq!(value(&l, "trust"), 52.0);
    }

    #[test]
    fn later_rule_owns_trend() {
        let mut l = ledger();
        RuleSet::canonical().evaluate(&mut l, "A hug, then a kiss.");
        let pi = l.metric("physical_intimacy").unwrap();
        assert_eq!(pi.value, 20.0);
        assert_eq!(pi.trend, 12.0);
    }

    #[test]
    fn rejection_matches_both_verb_forms() {
        for reply in ["He pushes away.", "push away the thought", "She rejects him."] {
            let mut l = ledger();
            RuleSet::canonical().evaluate(&mut l, reply);
            assert_eq!(value(&l, "physical_intimacy"), -10.0, "{reply}");
        }
    }

    #[test]
    fn conflict_touches_trust_and_resentment() {
        let mut l = ledger();
        RuleSet::canonical().evaluate(&mut l, "They ARGUE loudly.");
        assert_eq!(value(&l, "trust"), 45.0);
        assert_eq!(l.metric("trust").unwrap().trend, -5.0);
        assert_eq!(value(&l, "resentment"), 5.0);
    }

    #[test]
    fn missing_metric_effects_are_ignored() {
        let mut l = Ledger::new("c").with_metric("trust", Metric::new(50.0, 1.0));
        let fired = RuleSet::canonical().evaluate(&mut l, "Stop yelling!");
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].applied_count(), 1);
        assert_eq!(l.metrics.len(), 1);
        assert_eq!(value(&l, "trust"), 45.0);
    }

    #[test]
    fn empty_table_never_fires() {
        let mut l = ledger();
        assert!(RuleSet::empty().evaluate(&mut l, "kiss hug yell").is_empty());
    }

    // -----------------------------------------------------------------------
    // Validation and loading
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_duplicate_names() {
        let r = Rule::new("x", "hug", vec![Effect::new("trust", 1.0)]).unwrap();
        let err = RuleSet::new(vec![r.clone(), r]).unwrap_err();
        assert_eq!(err, RuleError::DuplicateRule("x".into()));
    }

    #[test]
    fn rejects_rules_without_effects() {
        let r = Rule::new("x", "hug", vec![]).unwrap();
        assert_eq!(
            RuleSet::new(vec![r]).unwrap_err(),
            RuleError::EmptyEffects("x".into())
        );
    }

    #[test]
    fn rejects_blank_names() {
        let r = Rule::new("  ", "hug", vec![Effect::new("trust", 1.0)]).unwrap();
        assert_eq!(RuleSet::new(vec![r]).unwrap_err(), RuleError::EmptyName(0));
    }

    #[test]
    fn rejects_non_finite_deltas() {
        let text = r#"
            [[rule]]
            name = "runaway"
            pattern = "hug"
            effects = [{ metric = "trust", delta = inf }]
        "#;
        assert_eq!(
            RuleSet::from_toml_str(text).unwrap_err(),
            RuleError::NonFiniteDelta {
                rule: "runaway".into(),
                metric: "trust".into()
            }
        );
        let r = Rule::new("x", "hug", vec![Effect::new("trust", f64::NAN)]).unwrap();
        assert!(RuleSet::new(vec![r]).is_err());
    }

    #[test]
    fn push_validates() {
        let mut set = RuleSet::canonical();
        let dup = Rule::new("kiss", "smooch", vec![Effect::new("affection", 1.0)]).unwrap();
        assert!(set.push(dup).is_err());
        assert_eq!(set.len(), 5);

        let extra = Rule::new("smile", "smile", vec![Effect::new("affection", 1.0)]).unwrap();
        set.push(extra).unwrap();
        assert_eq!(set.len(), 6);
        assert_eq!(set.rules()[5].name, "smile");
    }

    #[test]
    fn toml_with_bad_pattern_fails_to_load() {
        let text = r#"
            [[rule]]
            name = "bad"
            pattern = "k.ss"
            effects = [{ metric = "trust", delta = 1.0 }]
        "#;
        let err = RuleSet::from_toml_str(text).unwrap_err();
        assert!(matches!(err, RuleError::Parse(ref m) if m.contains("k.ss")));
    }

    #[test]
    fn toml_accepts_integer_deltas() {
        let text = r#"
            [[rule]]
            name = "smile"
            pattern = "smile(s)?"
            effects = [{ metric = "affection", delta = 3 }]
        "#;
        let set = RuleSet::from_toml_str(text).unwrap();
        assert_eq!(set.rules()[0].effects[0].delta, 3.0);
    }

    #[test]
    fn empty_toml_is_empty_table() {
        assert!(RuleSet::from_toml_str("").unwrap().is_empty());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(CANONICAL_TOML.as_bytes())
            .unwrap();
        assert_eq!(RuleSet::from_path(&path).unwrap(), RuleSet::canonical());
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuleSet::from_path(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, RuleError::Io(_)));
    }
}
