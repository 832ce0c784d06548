/// Errors produced while building or loading rule tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A pattern uses unsupported syntax or could match empty text.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A rule has no effects and would never change anything.
    #[error("rule '{0}' has no effects")]
    EmptyEffects(String),

    /// An effect delta is NaN or infinite.
    #[error("rule '{rule}' has a non-finite delta for '{metric}'")]
    NonFiniteDelta { rule: String, metric: String },

    /// Two rules share a name.
    #[error("duplicate rule name '{0}'")]
    DuplicateRule(String),

    /// A rule has a blank name.
    #[error("rule at index {0} has an empty name")]
    EmptyName(usize),

    /// The rule table document could not be parsed.
    #[error("rule table parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl RuleError {
    pub(crate) fn pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
