//! Authorization gates.
//!
//! Each gate answers one question about a request and either lets it
//! through or produces a [`Denial`]. Gates are stateless once built and are
//! evaluated in a fixed order by [`crate::pipeline::AuthorizationPipeline`].

mod command;
mod credential;
mod network;
mod signature;
mod transport;

pub use command::CommandPolicyGate;
pub use credential::CredentialGate;
pub use network::NetworkGate;
pub use signature::SignatureGate;
pub use transport::TransportGate;

use crate::decision::{Denial, Stage};
use crate::request::ExecutionRequest;

/// A single authorization check.
pub trait Gate: Send + Sync {
    /// Stage reported on denial.
    fn stage(&self) -> Stage;

    /// Evaluate the request. Must not mutate shared state.
    fn check(&self, request: &ExecutionRequest) -> Result<(), Denial>;
}
