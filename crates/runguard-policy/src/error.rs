//! Error types for policy compilation.

/// Policy compilation errors.
///
/// Every variant is a startup-time failure: a policy that does not compile
/// must never be replaced by a more permissive default.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A network range could not be parsed as CIDR.
    #[error("invalid network range '{entry}': {reason}")]
    InvalidCidr { entry: String, reason: String },

    /// An allowlist entry is malformed.
    #[error("invalid allowlist entry '{executable}': {reason}")]
    InvalidAllowlist { executable: String, reason: String },
}

/// Result type for policy compilation.
pub type PolicyResult<T> = Result<T, PolicyError>;
