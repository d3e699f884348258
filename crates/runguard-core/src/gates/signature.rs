use std::sync::Arc;

use super::Gate;
use crate::decision::{reason_codes, Denial, Stage};
use crate::request::ExecutionRequest;
use crate::signing::SignatureVerifier;
use crate::trust::StdinSignatures;

/// Detached signature over the exact stdin bytes. A pass-through when
/// signed stdin is not required.
#[derive(Debug, Clone)]
pub struct SignatureGate {
    verifier: Option<Arc<dyn SignatureVerifier>>,
}

impl SignatureGate {
    #[must_use]
    pub fn new(requirement: StdinSignatures) -> Self {
        let verifier = match requirement {
            StdinSignatures::NotRequired => None,
            StdinSignatures::Required(verifier) => Some(verifier),
        };
        Self { verifier }
    }
}

impl Gate for SignatureGate {
    fn stage(&self) -> Stage {
        Stage::Signature
    }

    fn check(&self, request: &ExecutionRequest) -> Result<(), Denial> {
        let Some(verifier) = &self.verifier else {
            return Ok(());
        };

        let Some(signature) = request.stdin_signature() else {
            return Err(Denial::malformed(
                Stage::Signature,
                reason_codes::S_SIGNATURE_MISSING,
                "signed stdin required but no signature supplied",
            ));
        };

        match verifier.verify(request.stdin(), signature) {
            Ok(()) => Ok(()),
            Err(e) if e.is_malformed() => Err(Denial::malformed(
                Stage::Signature,
                reason_codes::S_SIGNATURE_MALFORMED,
                e.to_string(),
            )),
            Err(e) => Err(Denial::denied(
                Stage::Signature,
                reason_codes::S_SIGNATURE_INVALID,
                e.to_string(),
            )),
        }
    }
}
