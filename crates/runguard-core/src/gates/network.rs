use runguard_policy::NetworkPolicy;

use super::Gate;
use crate::decision::{reason_codes, Denial, Stage};
use crate::request::ExecutionRequest;

/// Source address must fall inside one of the allowed networks.
#[derive(Debug, Clone)]
pub struct NetworkGate {
    networks: NetworkPolicy,
}

impl NetworkGate {
    #[must_use]
    pub fn new(networks: NetworkPolicy) -> Self {
        Self { networks }
    }
}

impl Gate for NetworkGate {
    fn stage(&self) -> Stage {
        Stage::Network
    }

    fn check(&self, request: &ExecutionRequest) -> Result<(), Denial> {
        if self.networks.is_empty() {
            return Err(Denial::denied(
                Stage::Network,
                reason_codes::N_NO_NETWORKS,
                "no allowed networks configured",
            ));
        }
        if self.networks.contains(request.source()) {
            return Ok(());
        }
        Err(Denial::denied(
            Stage::Network,
            reason_codes::N_SOURCE_NOT_ALLOWED,
            format!("source {} is outside the allowed networks", request.source()),
        ))
    }
}
