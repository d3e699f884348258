//! Authorization decisions.
//!
//! Every request yields exactly one [`AuthorizationDecision`]. A denial
//! carries the stage that refused it, a stable reason code for audit
//! tooling, and a free-form internal reason that is recorded locally and
//! never returned to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason codes for denials, grouped by stage prefix.
pub mod reason_codes {
    // Network (N_*)
    pub const N_SOURCE_NOT_ALLOWED: &str = "N_SOURCE_NOT_ALLOWED";
    pub const N_NO_NETWORKS: &str = "N_NO_NETWORKS";

    // Transport (T_*)
    pub const T_CERT_MISSING: &str = "T_CERT_MISSING";
    pub const T_CERT_REJECTED: &str = "T_CERT_REJECTED";

    // Credential (C_*)
    pub const C_CREDENTIALS_MISSING: &str = "C_CREDENTIALS_MISSING";
    pub const C_CREDENTIALS_MISMATCH: &str = "C_CREDENTIALS_MISMATCH";

    // Signature (S_*)
    pub const S_SIGNATURE_MISSING: &str = "S_SIGNATURE_MISSING";
    pub const S_SIGNATURE_MALFORMED: &str = "S_SIGNATURE_MALFORMED";
    pub const S_SIGNATURE_INVALID: &str = "S_SIGNATURE_INVALID";

    // Command policy (P_*)
    pub const P_EXECUTABLE_NOT_ALLOWED: &str = "P_EXECUTABLE_NOT_ALLOWED";
    pub const P_ARGUMENTS_NOT_ALLOWED: &str = "P_ARGUMENTS_NOT_ALLOWED";
}

/// Pipeline stage that produced a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Network,
    Transport,
    Credential,
    Signature,
    CommandPolicy,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Transport => "transport",
            Self::Credential => "credential",
            Self::Signature => "signature",
            Self::CommandPolicy => "command_policy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a denial is the caller's malformed input or a refused
/// well-formed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialClass {
    RequestMalformed,
    AuthorizationDenied,
}

/// A refused request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub stage: Stage,
    pub class: DenialClass,
    pub reason_code: &'static str,
    /// Audit-only detail. Never include in a response body.
    pub internal_reason: String,
}

impl Denial {
    pub fn denied(stage: Stage, reason_code: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            class: DenialClass::AuthorizationDenied,
            reason_code,
            internal_reason: reason.into(),
        }
    }

    pub fn malformed(stage: Stage, reason_code: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            class: DenialClass::RequestMalformed,
            reason_code,
            internal_reason: reason.into(),
        }
    }

    /// HTTP status the endpoint should answer with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match (self.stage, self.class) {
            (Stage::Signature, DenialClass::RequestMalformed) => 400,
            (Stage::Transport | Stage::Credential, _) => 401,
            _ => 403,
        }
    }

    /// Generic message safe to return to the caller.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self.http_status() {
            400 => "Bad Request",
            401 => "Unauthorized",
            _ => "Forbidden",
        }
    }
}

/// Final outcome of the authorization pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allowed,
    Denied(Denial),
}

impl AuthorizationDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    #[must_use]
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Allowed => None,
            Self::Denied(denial) => Some(denial),
        }
    }

    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        self.denial().map(|d| d.stage)
    }

    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.denial().map_or(200, Denial::http_status)
    }
}

impl From<Result<(), Denial>> for AuthorizationDecision {
    fn from(result: Result<(), Denial>) -> Self {
        match result {
            Ok(()) => Self::Allowed,
            Err(denial) => Self::Denied(denial),
        }
    }
}
