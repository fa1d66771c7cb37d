//! Error taxonomy for the release engine and configuration loading.

use thiserror::Error;

/// Error type returned by port implementations.
///
/// Adapters talk to very different backends (HTTP APIs, cassettes, in-memory
/// fixtures), so the port boundary only promises a boxed error.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised while resolving releases, rendering manifests, or
/// correlating deployments.
///
/// None of these are fatal: callers convert them into a `has_error` flag on
/// the smallest enclosing entity and keep going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// An upstream API call failed.
    #[error("unable to fetch {what}: {message}")]
    Fetch {
        /// What was being fetched.
        what: String,
        /// Upstream error message.
        message: String,
    },

    /// The ranked reference list of a source is empty.
    #[error("unable to find any release")]
    NoReleaseFound,

    /// An ops file, variable file, or manifest is malformed.
    #[error("unable to parse {what}: {message}")]
    Parse {
        /// The document that failed to parse.
        what: String,
        /// Parser error message.
        message: String,
    },

    /// Template evaluation failed.
    #[error("unable to render {what}: {message}")]
    Render {
        /// The document being rendered.
        what: String,
        /// Evaluation error message.
        message: String,
    },

    /// Correlation could not locate a match.
    #[error("{what} not found")]
    NotFound {
        /// What could not be located.
        what: String,
    },
}

impl EngineError {
    /// Builds a [`EngineError::Fetch`] from a port error.
    pub fn fetch(what: impl Into<String>, err: &PortError) -> Self {
        Self::Fetch { what: what.into(), message: err.to_string() }
    }

    /// Builds a [`EngineError::Parse`].
    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse { what: what.into(), message: message.to_string() }
    }

    /// Builds a [`EngineError::Render`].
    pub fn render(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Render { what: what.into(), message: message.to_string() }
    }
}

/// Configuration-time failures. These stop the process before any refresh.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("unable to read configuration file {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is neither valid YAML nor valid JSON.
    #[error("unable to parse configuration: {0}")]
    Parse(String),

    /// A section failed validation.
    #[error("invalid {section} configuration: {message}")]
    Invalid {
        /// Configuration section (`bosh`, `github`, ...).
        section: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(section: &str, message: impl Into<String>) -> Self {
        Self::Invalid { section: section.to_string(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_carries_upstream_message() {
        let upstream: PortError = "404 Not Found".into();
        let err = EngineError::fetch("releases of acme/widget", &upstream);
        assert_eq!(err.to_string(), "unable to fetch releases of acme/widget: 404 Not Found");
    }

    #[test]
    fn config_error_names_section() {
        let err = ConfigError::invalid("github", "missing mandatory github token");
        assert_eq!(err.to_string(), "invalid github configuration: missing mandatory github token");
    }
}
