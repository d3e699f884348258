use super::Gate;
use crate::decision::{reason_codes, Denial, Stage};
use crate::request::ExecutionRequest;
use crate::trust::ExpectedCredentials;

/// Username/password check against the configured pair.
#[derive(Debug, Clone)]
pub struct CredentialGate {
    expected: ExpectedCredentials,
}

impl CredentialGate {
    #[must_use]
    pub fn new(expected: ExpectedCredentials) -> Self {
        Self { expected }
    }
}

impl Gate for CredentialGate {
    fn stage(&self) -> Stage {
        Stage::Credential
    }

    fn check(&self, request: &ExecutionRequest) -> Result<(), Denial> {
        let Some(presented) = request.credentials() else {
            return Err(Denial::denied(
                Stage::Credential,
                reason_codes::C_CREDENTIALS_MISSING,
                "no credentials presented",
            ));
        };

        if self.expected.matches(presented) {
            Ok(())
        } else {
            // Same reason whichever field differed.
            Err(Denial::denied(
                Stage::Credential,
                reason_codes::C_CREDENTIALS_MISMATCH,
                "presented credentials do not match",
            ))
        }
    }
}
