//! Process-wide trust configuration.
//!
//! Loaded once before the serving loop starts and read-only afterwards.
//! Every control is represented so that "required but unconfigured" cannot
//! be expressed: a required client certificate carries its trust anchor, a
//! required stdin signature carries its verifier.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::danger::ClientCertVerifier;
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use runguard_policy::{AllowlistPolicy, NetworkPolicy};

use crate::error::{ConfigError, ConfigResult};
use crate::request::BasicCredentials;
use crate::signing::SignatureVerifier;

/// Everything the authorization pipeline needs to decide a request.
#[derive(Debug, Clone)]
pub struct TrustConfiguration {
    pub allowed_networks: NetworkPolicy,
    pub client_certificates: ClientCertificates,
    pub credentials: ExpectedCredentials,
    pub stdin_signatures: StdinSignatures,
    pub command_policy: CommandPolicy,
}

/// Mutual-TLS requirement.
#[derive(Debug, Clone)]
pub enum ClientCertificates {
    NotRequired,
    Required(ClientCertificateTrust),
}

/// Signed-stdin requirement.
#[derive(Debug, Clone)]
pub enum StdinSignatures {
    NotRequired,
    Required(Arc<dyn SignatureVerifier>),
}

/// Command allowlist enforcement.
#[derive(Debug, Clone)]
pub enum CommandPolicy {
    Enforced(AllowlistPolicy),
    /// Any executable and arguments pass. Explicit opt-in only.
    Permissive,
}

/// Expected username/password, held as SHA-256 digests so that comparison
/// runs over fixed-length values regardless of input length.
#[derive(Clone)]
pub struct ExpectedCredentials {
    username: String,
    username_digest: [u8; 32],
    password_digest: [u8; 32],
}

impl ExpectedCredentials {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        let username = username.into();
        Self {
            username_digest: sha256(username.as_bytes()),
            password_digest: sha256(password.as_bytes()),
            username,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Constant-time comparison. Both fields are always compared; the result
    /// does not reveal which one differed.
    #[must_use]
    pub fn matches(&self, presented: &BasicCredentials) -> bool {
        let username = sha256(presented.username().as_bytes());
        let password = sha256(presented.password().as_bytes());
        let username_ok = username[..].ct_eq(&self.username_digest[..]);
        let password_ok = password[..].ct_eq(&self.password_digest[..]);
        bool::from(username_ok & password_ok)
    }
}

impl fmt::Debug for ExpectedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(Sha256::digest(bytes).as_slice());
    out
}

/// CA trust anchors for client certificate validation.
#[derive(Clone)]
pub struct ClientCertificateTrust {
    verifier: Arc<dyn ClientCertVerifier>,
    anchors: usize,
}

impl ClientCertificateTrust {
    /// Build from one or more PEM-encoded CA certificates.
    pub fn from_pem(pem: &[u8]) -> ConfigResult<Self> {
        let certs = CertificateDer::pem_slice_iter(pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::ClientCa {
                reason: format!("invalid PEM: {e}"),
            })?;
        if certs.is_empty() {
            return Err(ConfigError::ClientCa {
                reason: "no certificates found".to_string(),
            });
        }

        let mut roots = RootCertStore::empty();
        for cert in certs {
            roots.add(cert).map_err(|e| ConfigError::ClientCa {
                reason: format!("unusable CA certificate: {e}"),
            })?;
        }
        let anchors = roots.len();

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| ConfigError::ClientCa {
                reason: e.to_string(),
            })?;

        Ok(Self { verifier, anchors })
    }

    /// Validate a chain (end-entity first) at the given instant.
    pub fn verify(
        &self,
        chain: &[CertificateDer<'_>],
        at: SystemTime,
    ) -> Result<(), rustls::Error> {
        let (end_entity, intermediates) = chain
            .split_first()
            .ok_or(rustls::Error::NoCertificatesPresented)?;
        let since_epoch = at
            .duration_since(UNIX_EPOCH)
            .map_err(|_| rustls::Error::General("request time precedes the Unix epoch".into()))?;

        self.verifier
            .verify_client_cert(
                end_entity,
                intermediates,
                UnixTime::since_unix_epoch(since_epoch),
            )
            .map(|_| ())
    }

    /// Number of configured trust anchors.
    #[must_use]
    pub fn anchors(&self) -> usize {
        self.anchors
    }
}

impl fmt::Debug for ClientCertificateTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificateTrust")
            .field("anchors", &self.anchors)
            .finish_non_exhaustive()
    }
}
