use runguard_policy::{AllowlistPolicy, CommandMatch};

use super::Gate;
use crate::decision::{reason_codes, Denial, Stage};
use crate::request::ExecutionRequest;
use crate::trust::CommandPolicy;

/// Executable and full argument list must be on the allowlist.
#[derive(Debug, Clone)]
pub struct CommandPolicyGate {
    allowlist: Option<AllowlistPolicy>,
}

impl CommandPolicyGate {
    #[must_use]
    pub fn new(policy: CommandPolicy) -> Self {
        let allowlist = match policy {
            CommandPolicy::Enforced(allowlist) => Some(allowlist),
            CommandPolicy::Permissive => None,
        };
        Self { allowlist }
    }
}

impl Gate for CommandPolicyGate {
    fn stage(&self) -> Stage {
        Stage::CommandPolicy
    }

    fn check(&self, request: &ExecutionRequest) -> Result<(), Denial> {
        let Some(allowlist) = &self.allowlist else {
            return Ok(());
        };

        match allowlist.check(request.executable(), request.arguments()) {
            CommandMatch::Approved => Ok(()),
            CommandMatch::UnknownExecutable => Err(Denial::denied(
                Stage::CommandPolicy,
                reason_codes::P_EXECUTABLE_NOT_ALLOWED,
                format!("executable {:?} is not on the allowlist", request.executable()),
            )),
            CommandMatch::UnapprovedArguments => Err(Denial::denied(
                Stage::CommandPolicy,
                reason_codes::P_ARGUMENTS_NOT_ALLOWED,
                format!(
                    "arguments {:?} are not approved for {:?}",
                    request.arguments(),
                    request.executable()
                ),
            )),
        }
    }
}
