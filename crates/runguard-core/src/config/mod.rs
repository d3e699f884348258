//! Configuration loading.
//!
//! The YAML document is parsed and validated in one pass into
//! [`ServerSettings`] and a [`TrustConfiguration`]. Any problem is a
//! [`ConfigError`]; there is no partially valid configuration.

mod file;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use runguard_policy::{AllowlistPolicy, NetworkPolicy};

use crate::error::{ConfigError, ConfigResult};
use crate::signing::MinisignPublicKey;
use crate::trust::{
    ClientCertificateTrust, ClientCertificates, CommandPolicy, ExpectedCredentials,
    StdinSignatures, TrustConfiguration,
};
use file::{SecuritySection, ServerSection, SettingsFile};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:9000";
pub const DEFAULT_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(11);
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CERTIFICATE_FILE: &str = "server.crt";
pub const DEFAULT_PRIVATE_KEY_FILE: &str = "server.key";

/// Listener and logging settings. Not consulted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_address: SocketAddr,
    pub http_request_timeout: Duration,
    pub default_script_timeout: Duration,
    pub log_level: tracing::Level,
    pub log_file_path: Option<PathBuf>,
    pub audit_log_path: Option<PathBuf>,
    pub log_http_requests: bool,
    pub log_http_responses: bool,
    pub disable_https: bool,
    pub certificate_path: PathBuf,
    pub private_key_path: PathBuf,
}

/// A fully validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub trust: TrustConfiguration,
    /// Trusted signing key, when one is configured.
    pub public_key: Option<MinisignPublicKey>,
}

impl Settings {
    /// Load from a YAML file. Bare file names inside it resolve against the
    /// file's directory.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_yaml(&content, base_dir)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str, base_dir: &Path) -> ConfigResult<Self> {
        let doc: SettingsFile = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;

        let server = server_settings(doc.server, base_dir)?;

        let username = required(doc.authentication.username, "authentication.username")?;
        let password = required(doc.authentication.password, "authentication.password")?;
        let credentials = ExpectedCredentials::new(username, &password);

        let (trust, public_key) = trust_settings(doc.security, credentials, base_dir)?;

        let settings = Self {
            server,
            trust,
            public_key,
        };
        settings.warn_on_weak_settings();
        Ok(settings)
    }

    fn warn_on_weak_settings(&self) {
        if self.trust.allowed_networks.is_empty() {
            tracing::warn!("security.allowed_networks is empty; every request will be denied");
        }
        match &self.trust.command_policy {
            CommandPolicy::Permissive => tracing::warn!(
                "security.approved_path_arguments_only is false; any command may be executed"
            ),
            CommandPolicy::Enforced(allowlist) if allowlist.is_empty() => tracing::warn!(
                "security.approved_path_arguments is empty; every command will be denied"
            ),
            CommandPolicy::Enforced(_) => {}
        }
        if self.server.disable_https {
            tracing::warn!("server.disable_https is set; credentials travel in clear text");
        }
    }
}

fn server_settings(section: ServerSection, base_dir: &Path) -> ConfigResult<ServerSettings> {
    let bind_address = section
        .bind_address
        .as_deref()
        .unwrap_or(DEFAULT_BIND_ADDRESS)
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::invalid("server.bind_address", e.to_string()))?;

    let http_request_timeout = duration(
        section.http_request_timeout.as_deref(),
        "server.http_request_timeout",
        DEFAULT_HTTP_REQUEST_TIMEOUT,
    )?;
    let default_script_timeout = duration(
        section.default_script_timeout.as_deref(),
        "server.default_script_timeout",
        DEFAULT_SCRIPT_TIMEOUT,
    )?;
    if default_script_timeout >= http_request_timeout {
        return Err(ConfigError::invalid(
            "server.default_script_timeout",
            format!(
                "must be shorter than server.http_request_timeout ({})",
                humantime::format_duration(http_request_timeout)
            ),
        ));
    }

    let log_level = match section.log_level.as_deref() {
        None => tracing::Level::INFO,
        Some(raw) => raw.trim().parse::<tracing::Level>().map_err(|_| {
            ConfigError::invalid("server.log_level", format!("unknown level {raw:?}"))
        })?,
    };

    Ok(ServerSettings {
        bind_address,
        http_request_timeout,
        default_script_timeout,
        log_level,
        log_file_path: section.log_file_path.map(|p| resolve(base_dir, p)),
        audit_log_path: section.audit_log_path.map(|p| resolve(base_dir, p)),
        log_http_requests: section.log_http_requests,
        log_http_responses: section.log_http_responses,
        disable_https: section.disable_https,
        certificate_path: resolve(
            base_dir,
            section
                .certificate_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CERTIFICATE_FILE)),
        ),
        private_key_path: resolve(
            base_dir,
            section
                .private_key_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PRIVATE_KEY_FILE)),
        ),
    })
}

fn trust_settings(
    section: SecuritySection,
    credentials: ExpectedCredentials,
    base_dir: &Path,
) -> ConfigResult<(TrustConfiguration, Option<MinisignPublicKey>)> {
    let allowed_networks = NetworkPolicy::parse(&section.allowed_networks)?;

    let client_certificates = if section.use_client_certificates {
        let ca_file = section
            .client_certificate_ca_file
            .ok_or(ConfigError::Missing {
                field: "security.client_certificate_ca_file",
            })?;
        let ca_file = resolve(base_dir, ca_file);
        let pem = fs::read(&ca_file).map_err(|e| ConfigError::io(&ca_file, e))?;
        ClientCertificates::Required(ClientCertificateTrust::from_pem(&pem)?)
    } else {
        ClientCertificates::NotRequired
    };

    let public_key = section
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(MinisignPublicKey::parse)
        .transpose()?;

    let stdin_signatures = match (&public_key, section.signed_stdin_only) {
        (Some(key), true) => StdinSignatures::Required(Arc::new(key.clone())),
        (None, true) => {
            return Err(ConfigError::Missing {
                field: "security.public_key",
            })
        }
        (_, false) => StdinSignatures::NotRequired,
    };

    let command_policy = if section.approved_path_arguments_only {
        CommandPolicy::Enforced(AllowlistPolicy::compile(&section.approved_path_arguments)?)
    } else {
        CommandPolicy::Permissive
    };

    Ok((
        TrustConfiguration {
            allowed_networks,
            client_certificates,
            credentials,
            stdin_signatures,
            command_policy,
        },
        public_key,
    ))
}

fn required(value: Option<String>, field: &'static str) -> ConfigResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { field })
}

fn duration(raw: Option<&str>, field: &'static str, default: Duration) -> ConfigResult<Duration> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = humantime::parse_duration(raw.trim())
        .map_err(|e| ConfigError::invalid(field, e.to_string()))?;
    if value.is_zero() {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(value)
}

/// A bare file name is taken relative to the configuration directory;
/// anything with a directory component is used as written.
fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    let bare = path.is_relative()
        && path
            .parent()
            .is_some_and(|parent| parent.as_os_str().is_empty());
    if bare {
        base_dir.join(path)
    } else {
        path
    }
}
