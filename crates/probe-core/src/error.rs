/// Errors raised while a caller is still describing work, before anything runs.
///
/// These are fail-fast by design: a bad operator token or a malformed
/// duration string halts at build time rather than surfacing mid-task.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown rule operator: {token}")]
    UnknownOperator { token: String },

    #[error("operator {op} requires a numeric threshold, got: {threshold:?}")]
    NonNumericThreshold { op: String, threshold: String },

    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("command line is empty")]
    EmptyCommand,

    #[error("duplicate secret name: {name}")]
    DuplicateSecret { name: String },

    #[error("invalid line regexp: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_operator_display() {
        let err = ConfigError::UnknownOperator {
            token: "between".to_owned(),
        };
        assert_eq!(err.to_string(), "unknown rule operator: between");
    }

    #[test]
    fn non_numeric_threshold_display() {
        let err = ConfigError::NonNumericThreshold {
            op: "gt".to_owned(),
            threshold: "many".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "operator gt requires a numeric threshold, got: \"many\""
        );
    }

    #[test]
    fn invalid_duration_display() {
        let err = ConfigError::InvalidDuration {
            input: "5x".to_owned(),
            reason: "unknown unit suffix".to_owned(),
        };
        assert!(err.to_string().contains("5x"));
        assert!(err.to_string().contains("unknown unit suffix"));
    }

    #[test]
    fn empty_command_display() {
        assert_eq!(ConfigError::EmptyCommand.to_string(), "command line is empty");
    }
}
