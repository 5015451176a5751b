// ============================================================================
// spark-compose - Errors
// Failures surfaced while building component trees
// ============================================================================

use thiserror::Error;

/// Errors raised while building components.
///
/// Graph misuse (writing a signal inside a derived, runaway update loops)
/// still panics; these are the failures a caller can restructure around.
#[derive(Debug, Error)]
pub enum Error {
    /// A consumer was built outside its provider and no default exists.
    #[error("useContext must be used within `{capability}Provider`.")]
    MissingProvider {
        /// Capability name, e.g. `CheckboxGroup`.
        capability: &'static str,
    },

    /// The checkbox group's `value` prop was supplied but is not a list of identifiers.
    #[error("CheckboxGroup: `value` prop must be an array when provided.\nReceived: {received}")]
    InvalidGroupValue {
        /// Display form of the offending value.
        received: String,
    },

    /// A form store was asked about a field path that was never registered.
    #[error("field `{name}` is not registered with this form")]
    UnregisteredField { name: String },

    /// A `pattern` validation rule did not compile.
    #[error("invalid validation pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl Error {
    /// Capability name for configuration errors.
    pub fn capability(&self) -> Option<&'static str> {
        match self {
            Error::MissingProvider { capability } => Some(capability),
            _ => None,
        }
    }
}

/// Result type for component construction.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_provider_message_names_the_provider() {
        let err = Error::MissingProvider {
            capability: "CheckboxGroup",
        };
        assert_eq!(
            err.to_string(),
            "useContext must be used within `CheckboxGroupProvider`."
        );
        assert_eq!(err.capability(), Some("CheckboxGroup"));
    }

    #[test]
    fn invalid_group_value_includes_received_value() {
        let err = Error::InvalidGroupValue {
            received: "not-an-array".into(),
        };
        assert_eq!(
            err.to_string(),
            "CheckboxGroup: `value` prop must be an array when provided.\nReceived: not-an-array"
        );
        assert_eq!(err.capability(), None);
    }

    #[test]
    fn invalid_pattern_keeps_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = Error::InvalidPattern {
            pattern: "(".into(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("invalid validation pattern `(`"));
    }
}
