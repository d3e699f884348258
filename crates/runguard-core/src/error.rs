//! Startup configuration errors.

use std::path::PathBuf;

use runguard_policy::PolicyError;

use crate::signing::PublicKeyError;

/// Configuration is invalid; the process must not begin serving.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration or referenced file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration document is not valid YAML or has the wrong shape.
    #[error("failed to parse configuration: {message}")]
    Parse { message: String },

    /// A required setting is missing or empty.
    #[error("missing required setting {field}")]
    Missing { field: &'static str },

    /// A setting has an unusable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Network range or command allowlist does not compile.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Trusted signing key is malformed.
    #[error(transparent)]
    PublicKey(#[from] PublicKeyError),

    /// Client certificate CA bundle is unusable.
    #[error("invalid client certificate CA: {reason}")]
    ClientCa { reason: String },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
