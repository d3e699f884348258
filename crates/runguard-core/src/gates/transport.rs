use super::Gate;
use crate::decision::{reason_codes, Denial, Stage};
use crate::request::ExecutionRequest;
use crate::trust::{ClientCertificateTrust, ClientCertificates};

/// Mutual-TLS check. A pass-through when client certificates are not
/// required.
#[derive(Debug, Clone)]
pub struct TransportGate {
    trust: Option<ClientCertificateTrust>,
}

impl TransportGate {
    #[must_use]
    pub fn new(requirement: ClientCertificates) -> Self {
        let trust = match requirement {
            ClientCertificates::NotRequired => None,
            ClientCertificates::Required(trust) => Some(trust),
        };
        Self { trust }
    }
}

impl Gate for TransportGate {
    fn stage(&self) -> Stage {
        Stage::Transport
    }

    fn check(&self, request: &ExecutionRequest) -> Result<(), Denial> {
        let Some(trust) = &self.trust else {
            return Ok(());
        };

        let chain = match request.client_certificate() {
            Some(chain) if !chain.is_empty() => chain,
            _ => {
                return Err(Denial::denied(
                    Stage::Transport,
                    reason_codes::T_CERT_MISSING,
                    "no client certificate presented",
                ))
            }
        };

        trust.verify(chain, request.received_at()).map_err(|e| {
            Denial::denied(
                Stage::Transport,
                reason_codes::T_CERT_REJECTED,
                format!("client certificate rejected: {e}"),
            )
        })
    }
}
