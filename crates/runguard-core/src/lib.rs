//! Authorization core for the runguard remote execution endpoint.
//!
//! A request to run a command is admitted only after passing, in order:
//!
//! 1. **Network**: source address inside an allowed CIDR range.
//! 2. **Transport**: client certificate chains to a trusted CA (optional).
//! 3. **Credential**: username/password match, compared in constant time.
//! 4. **Signature**: stdin carries a valid detached minisign signature
//!    (optional).
//! 5. **Command policy**: executable plus full argument list is on the
//!    allowlist (unless explicitly permissive).
//!
//! ```no_run
//! use std::path::Path;
//! use runguard_core::{AuthorizationPipeline, ExecutionRequest, Settings};
//!
//! let settings = Settings::from_file(Path::new("runguard.yaml"))?;
//! let pipeline = AuthorizationPipeline::new(settings.trust);
//!
//! let request = ExecutionRequest::builder("127.0.0.1".parse()?, "uptime")
//!     .basic_auth("runner", "change-me")
//!     .build();
//! let decision = pipeline.authorize(&request);
//! println!("{}", decision.http_status());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audit;
pub mod config;
pub mod decision;
pub mod error;
pub mod gates;
pub mod pipeline;
pub mod request;
pub mod signing;
pub mod trust;

pub use audit::{AuditEvent, AuditLog};
pub use config::{ServerSettings, Settings};
pub use decision::{reason_codes, AuthorizationDecision, Denial, DenialClass, Stage};
pub use error::{ConfigError, ConfigResult};
pub use pipeline::{AuthorizationPipeline, Evaluation, PipelineState};
pub use request::{BasicCredentials, ExecutionRequest, ExecutionRequestBuilder};
pub use signing::{
    MinisignPublicKey, MinisignSignature, PublicKeyError, SignatureError, SignatureVerifier,
};
pub use trust::{
    ClientCertificateTrust, ClientCertificates, CommandPolicy, ExpectedCredentials,
    StdinSignatures, TrustConfiguration,
};

pub use runguard_policy as policy;
