use rapport_types::Ledger;

use crate::config::DigestConfig;

/// Render the prompt digest for `ledger`.
///
/// Produces `"<label>: k1=v1, k2=v2"` over the configured metrics, in
/// configured order. Metrics the ledger does not carry are skipped. Returns
/// `None` when the digest is disabled or no configured metric is present.
pub fn render_digest(config: &DigestConfig, ledger: &Ledger) -> Option<String> {
    if !config.enabled {
        return None;
    }

    let parts: Vec<String> = config
        .metrics
        .iter()
        .filter_map(|key| ledger.metric(key).map(|m| format!("{key}={}", m.value)))
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(format!("{}: {}", config.label, parts.join(", ")))
}

#[cfg(test)]
mod tests {
    use rapport_types::Metric;

    use super::*;

    fn ledger() -> Ledger {
        Ledger::new("c")
            .with_metric("trust", Metric::new(51.0, 1.0))
            .with_metric("affection", Metric::new(40.5, 1.0))
            .with_metric("resentment", Metric::new(-2.0, 0.5))
    }

    #[test]
    fn default_digest_line() {
        let digest = render_digest(&DigestConfig::default(), &ledger()).unwrap();
        assert_eq!(digest, "REL_STATE: trust=51, affection=40.5, resentment=-2");
    }

    #[test]
    fn missing_metrics_are_skipped() {
        let mut l = ledger();
        l.metrics.remove("affection");
        let digest = render_digest(&DigestConfig::default(), &l).unwrap();
        assert_eq!(digest, "REL_STATE: trust=51, resentment=-2");
    }

    #[test]
    fn nothing_to_report_is_none() {
        let l = Ledger::new("c").with_metric("physical_intimacy", Metric::new(1.0, 0.0));
        assert!(render_digest(&DigestConfig::default(), &l).is_none());
    }

    #[test]
    fn disabled_digest_is_none() {
        let config = DigestConfig {
            enabled: false,
            ..DigestConfig::default()
        };
        assert!(render_digest(&config, &ledger()).is_none());
    }

    #[test]
    fn custom_label_and_order() {
        let config = DigestConfig {
            enabled: true,
            label: "BOND".into(),
            metrics: vec!["resentment".into(), "trust".into()],
        };
        assert_eq!(
            render_digest(&config, &ledger()).unwrap(),
            "BOND: resentment=-2, trust=51"
        );
    }
}
