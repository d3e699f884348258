//! Execution requests as seen by the authorization pipeline.

use std::fmt;
use std::net::IpAddr;
use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rustls::pki_types::CertificateDer;

/// Username/password pair presented by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse an `Authorization` header value using the `Basic` scheme.
    ///
    /// Returns `None` for any other scheme or an undecodable value; the
    /// credential gate treats that the same as absent credentials.
    #[must_use]
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One inbound request to run `executable` with `arguments`, feeding
/// `stdin` to the spawned process.
///
/// Built once by the HTTP layer through [`ExecutionRequestBuilder`] and
/// never modified afterwards.
#[derive(Clone)]
pub struct ExecutionRequest {
    source: IpAddr,
    client_certificate: Option<Vec<CertificateDer<'static>>>,
    credentials: Option<BasicCredentials>,
    executable: String,
    arguments: Vec<String>,
    stdin: Vec<u8>,
    stdin_signature: Option<Vec<u8>>,
    received_at: SystemTime,
}

impl ExecutionRequest {
    pub fn builder(source: IpAddr, executable: impl Into<String>) -> ExecutionRequestBuilder {
        ExecutionRequestBuilder {
            request: Self {
                source,
                client_certificate: None,
                credentials: None,
                executable: executable.into(),
                arguments: Vec::new(),
                stdin: Vec::new(),
                stdin_signature: None,
                received_at: SystemTime::now(),
            },
        }
    }

    #[must_use]
    pub fn source(&self) -> IpAddr {
        self.source
    }

    /// Client certificate chain, end-entity certificate first.
    #[must_use]
    pub fn client_certificate(&self) -> Option<&[CertificateDer<'static>]> {
        self.client_certificate.as_deref()
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&BasicCredentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    #[must_use]
    pub fn stdin(&self) -> &[u8] {
        &self.stdin
    }

    #[must_use]
    pub fn stdin_signature(&self) -> Option<&[u8]> {
        self.stdin_signature.as_deref()
    }

    #[must_use]
    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }
}

impl fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("source", &self.source)
            .field(
                "client_certificates",
                &self.client_certificate.as_ref().map(Vec::len),
            )
            .field("credentials", &self.credentials)
            .field("executable", &self.executable)
            .field("arguments", &self.arguments)
            .field("stdin_len", &self.stdin.len())
            .field("stdin_signature", &self.stdin_signature.is_some())
            .field("received_at", &self.received_at)
            .finish()
    }
}

/// Builder for [`ExecutionRequest`].
#[derive(Debug, Clone)]
pub struct ExecutionRequestBuilder {
    request: ExecutionRequest,
}

impl ExecutionRequestBuilder {
    #[must_use]
    pub fn arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Option<BasicCredentials>) -> Self {
        self.request.credentials = credentials;
        self
    }

    #[must_use]
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials(Some(BasicCredentials::new(username, password)))
    }

    #[must_use]
    pub fn stdin(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.request.stdin = payload.into();
        self
    }

    #[must_use]
    pub fn stdin_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.request.stdin_signature = Some(signature.into());
        self
    }

    #[must_use]
    pub fn client_certificate(mut self, chain: Vec<CertificateDer<'static>>) -> Self {
        self.request.client_certificate = Some(chain);
        self
    }

    #[must_use]
    pub fn received_at(mut self, at: SystemTime) -> Self {
        self.request.received_at = at;
        self
    }

    #[must_use]
    pub fn build(self) -> ExecutionRequest {
        self.request
    }
}
