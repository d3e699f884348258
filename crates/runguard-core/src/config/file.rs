//! On-disk configuration document.
//!
//! ```yaml
//! server:
//!   bind_address: 127.0.0.1:9000
//!   http_request_timeout: 11s
//!   default_script_timeout: 10s
//!   log_level: info
//! authentication:
//!   username: runner
//!   password: change-me
//! security:
//!   allowed_networks: [127.0.0.0/8, "::1/128"]
//!   use_client_certificates: false
//!   signed_stdin_only: true
//!   public_key: RWTV8L06+shYI7Xw1H+NBGmsUYlbEkbrdYxr4c0ImLCAr8NGx75VhxGQ
//!   approved_path_arguments:
//!     /bin/sh: [["-c"]]
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use runguard_policy::ArgumentSequences;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SettingsFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub authentication: AuthenticationSection,
    pub security: SecuritySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerSection {
    pub bind_address: Option<String>,
    pub http_request_timeout: Option<String>,
    pub default_script_timeout: Option<String>,
    pub log_level: Option<String>,
    pub log_file_path: Option<PathBuf>,
    pub audit_log_path: Option<PathBuf>,
    #[serde(default)]
    pub log_http_requests: bool,
    #[serde(default)]
    pub log_http_responses: bool,
    #[serde(default)]
    pub disable_https: bool,
    pub certificate_path: Option<PathBuf>,
    pub private_key_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AuthenticationSection {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Switches here have no defaults except `approved_path_arguments_only`;
/// turning a control off has to be written down.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SecuritySection {
    pub allowed_networks: Vec<String>,
    pub use_client_certificates: bool,
    pub client_certificate_ca_file: Option<PathBuf>,
    pub signed_stdin_only: bool,
    pub public_key: Option<String>,
    #[serde(default = "enforced")]
    pub approved_path_arguments_only: bool,
    #[serde(default)]
    pub approved_path_arguments: ArgumentSequences,
}

fn enforced() -> bool {
    true
}
