//! Ordered evaluation of the authorization gates.
//!
//! ```text
//! Start ─► Network ─► Transport ─► Credential ─► Signature ─► CommandPolicy ─► Approved
//!             │           │             │             │              │
//!             └───────────┴─────────────┴─────────────┴──────────────┴────► Denied
//! ```
//!
//! The first gate that refuses ends evaluation; later gates never run.
//! `Approved` is reachable only by passing every gate.

use crate::decision::{AuthorizationDecision, Denial, Stage};
use crate::gates::{
    CommandPolicyGate, CredentialGate, Gate, NetworkGate, SignatureGate, TransportGate,
};
use crate::request::ExecutionRequest;
use crate::trust::TrustConfiguration;

/// Position of a request in the gate sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    /// About to evaluate the network gate.
    Network,
    Transport,
    Credential,
    Signature,
    CommandPolicy,
    Approved,
    Denied(Denial),
}

impl PipelineState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Denied(_))
    }

    /// Stage of the gate this state is about to evaluate.
    #[must_use]
    pub fn pending_stage(&self) -> Option<Stage> {
        match self {
            Self::Network => Some(Stage::Network),
            Self::Transport => Some(Stage::Transport),
            Self::Credential => Some(Stage::Credential),
            Self::Signature => Some(Stage::Signature),
            Self::CommandPolicy => Some(Stage::CommandPolicy),
            Self::Start | Self::Approved | Self::Denied(_) => None,
        }
    }
}

/// Decision together with the stages that were actually evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: AuthorizationDecision,
    pub evaluated: Vec<Stage>,
}

/// Immutable, shareable authorization pipeline.
///
/// Built once from a [`TrustConfiguration`]; concurrent requests may call
/// [`AuthorizationPipeline::authorize`] through a shared reference.
#[derive(Debug, Clone)]
pub struct AuthorizationPipeline {
    network: NetworkGate,
    transport: TransportGate,
    credential: CredentialGate,
    signature: SignatureGate,
    command: CommandPolicyGate,
}

impl AuthorizationPipeline {
    #[must_use]
    pub fn new(config: TrustConfiguration) -> Self {
        Self {
            network: NetworkGate::new(config.allowed_networks),
            transport: TransportGate::new(config.client_certificates),
            credential: CredentialGate::new(config.credentials),
            signature: SignatureGate::new(config.stdin_signatures),
            command: CommandPolicyGate::new(config.command_policy),
        }
    }

    /// Decide a request.
    #[must_use]
    pub fn authorize(&self, request: &ExecutionRequest) -> AuthorizationDecision {
        self.evaluate(request).decision
    }

    /// Decide a request and report which gates ran.
    #[must_use]
    pub fn evaluate(&self, request: &ExecutionRequest) -> Evaluation {
        let mut evaluated = Vec::with_capacity(5);
        let mut state = PipelineState::Start;

        loop {
            if let Some(stage) = state.pending_stage() {
                evaluated.push(stage);
            }
            state = self.step(state, request);
            match state {
                PipelineState::Approved => {
                    return Evaluation {
                        decision: AuthorizationDecision::Allowed,
                        evaluated,
                    }
                }
                PipelineState::Denied(denial) => {
                    return Evaluation {
                        decision: AuthorizationDecision::Denied(denial),
                        evaluated,
                    };
                }
                _ => {}
            }
        }
    }

    /// Advance one transition. Terminal states map to themselves.
    #[must_use]
    pub fn step(&self, state: PipelineState, request: &ExecutionRequest) -> PipelineState {
        match state {
            PipelineState::Start => PipelineState::Network,
            PipelineState::Network => run(&self.network, request, PipelineState::Transport),
            PipelineState::Transport => run(&self.transport, request, PipelineState::Credential),
            PipelineState::Credential => run(&self.credential, request, PipelineState::Signature),
            PipelineState::Signature => {
                run(&self.signature, request, PipelineState::CommandPolicy)
            }
            PipelineState::CommandPolicy => run(&self.command, request, PipelineState::Approved),
            terminal @ (PipelineState::Approved | PipelineState::Denied(_)) => terminal,
        }
    }
}

fn run(gate: &impl Gate, request: &ExecutionRequest, next: PipelineState) -> PipelineState {
    match gate.check(request) {
        Ok(()) => next,
        Err(denial) => {
            debug_assert_eq!(denial.stage, gate.stage());
            PipelineState::Denied(denial)
        }
    }
}
