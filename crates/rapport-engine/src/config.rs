use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Configuration for the ledger engine.
///
/// Loadable from TOML (`rapport.toml`); every field has a default, so an
/// empty document is a valid configuration.
///
/// ```toml
/// prune_unknown_metrics = true
///
/// [bounds]
/// min = -100.0
/// max = 100.0
///
/// [digest]
/// enabled = true
/// label = "REL_STATE"
/// metrics = ["trust", "affection", "resentment"]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Drop metrics whose keys are not in the seed when restoring a
    /// snapshot.
    pub prune_unknown_metrics: bool,
    /// Clamp every metric value into this range after decay. `None` leaves
    /// values unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<MetricBounds>,
    /// Prompt digest settings.
    pub digest: DigestConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prune_unknown_metrics: true,
            bounds: None,
            digest: DigestConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(bounds) = &self.bounds {
            bounds.validate()?;
        }
        if self.digest.enabled && self.digest.label.trim().is_empty() {
            return Err(EngineError::Config(
                "digest label must not be empty when the digest is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Inclusive range metric values are clamped into.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    pub min: f64,
    pub max: f64,
}

impl MetricBounds {
    pub fn new(min: f64, max: f64) -> Result<Self, EngineError> {
        let bounds = Self { min, max };
        bounds.validate()?;
        Ok(bounds)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(EngineError::Config("metric bounds must be finite".into()));
        }
        if self.min > self.max {
            return Err(EngineError::Config(format!(
                "metric bounds are inverted: min {} > max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Settings for the prompt digest injected before each user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub enabled: bool,
    /// Prefix of the digest line, e.g. `REL_STATE`.
    pub label: String,
    /// Metrics to include, in order.
    pub metrics: Vec<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            label: "REL_STATE".into(),
            metrics: vec!["trust".into(), "affection".into(), "resentment".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::default();
        assert!(c.bounds.is_none());
        assert!(c.prune_unknown_metrics);
        assert!(c.digest.enabled);
        assert_eq!(c.digest.label, "REL_STATE");
        assert_eq!(c.digest.metrics, vec!["trust", "affection", "resentment"]);
        c.validate().unwrap();
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn parse_full_toml() {
        let text = r#"
            prune_unknown_metrics = false

            [bounds]
            min = -100.0
            max = 100.0

            [digest]
            enabled = false
            metrics = ["trust"]
        "#;
        let c = EngineConfig::from_toml_str(text).unwrap();
        assert_eq!(c.bounds, Some(MetricBounds { min: -100.0, max: 100.0 }));
        assert!(!c.prune_unknown_metrics);
        assert!(!c.digest.enabled);
        assert_eq!(c.digest.label, "REL_STATE");
        assert_eq!(c.digest.metrics, vec!["trust"]);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let text = "[bounds]\nmin = 10.0\nmax = -10.0\n";
        let err = EngineConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, EngineError::Config(ref m) if m.contains("inverted")));
        assert!(MetricBounds::new(5.0, 1.0).is_err());
        assert!(MetricBounds::new(f64::NEG_INFINITY, 1.0).is_err());
        assert!(MetricBounds::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn blank_digest_label_is_rejected() {
        let text = "[digest]\nlabel = \"  \"\n";
        assert!(EngineConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("bounds = 3").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut c = EngineConfig::default();
        c.bounds = Some(MetricBounds::new(0.0, 100.0).unwrap());
        let text = toml::to_string(&c).unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rapport.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"[bounds]\nmin = 0.0\nmax = 100.0\n")
            .unwrap();
        let c = EngineConfig::from_path(&path).unwrap();
        assert_eq!(c.bounds.unwrap().max, 100.0);
        assert!(EngineConfig::from_path(&dir.path().join("missing.toml")).is_err());
    }
}
