//! Audit trail of authorization decisions.
//!
//! One NDJSON line per decision. Passwords and payload bytes are never
//! written; the payload is identified by length and SHA-256.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::decision::{AuthorizationDecision, DenialClass, Stage};
use crate::error::{ConfigError, ConfigResult};
use crate::request::ExecutionRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub timestamp: String, // RFC 3339
    pub decision: &'static str, // "allow" | "deny"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<DenialClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub http_status: u16,
    pub source: IpAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub executable: String,
    pub arguments: Vec<String>,
    pub stdin_len: usize,
    pub stdin_sha256: String,
    pub signature_presented: bool,
    pub client_certificate_presented: bool,
}

impl AuditEvent {
    #[must_use]
    pub fn from_decision(request: &ExecutionRequest, decision: &AuthorizationDecision) -> Self {
        let denial = decision.denial();
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            decision: if decision.is_allowed() { "allow" } else { "deny" },
            stage: denial.map(|d| d.stage),
            class: denial.map(|d| d.class),
            reason_code: denial.map(|d| d.reason_code),
            reason: denial.map(|d| d.internal_reason.clone()),
            http_status: decision.http_status(),
            source: request.source(),
            username: request.credentials().map(|c| c.username().to_string()),
            executable: request.executable().to_string(),
            arguments: request.arguments().to_vec(),
            stdin_len: request.stdin().len(),
            stdin_sha256: hex::encode(Sha256::digest(request.stdin())),
            signature_presented: request.stdin_signature().is_some(),
            client_certificate_presented: request
                .client_certificate()
                .is_some_and(|chain| !chain.is_empty()),
        }
    }
}

/// Append-only decision log. Safe to share between request handlers.
#[derive(Debug, Default)]
pub struct AuditLog {
    file: Option<Mutex<File>>,
}

impl AuditLog {
    /// Log to `tracing` only.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Open (creating if needed) an NDJSON file in append mode.
    pub fn open(path: Option<&Path>) -> ConfigResult<Self> {
        let file = path
            .map(|p| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(p)
                    .map_err(|e| ConfigError::io(p, e))
            })
            .transpose()?;
        Ok(Self {
            file: file.map(Mutex::new),
        })
    }

    /// Record one decision. Write failures are reported through `tracing`
    /// and do not affect the decision.
    pub fn record(&self, event: &AuditEvent) {
        match event.reason_code {
            None => tracing::info!(
                target: "runguard::audit",
                source = %event.source,
                executable = %event.executable,
                stdin_sha256 = %event.stdin_sha256,
                "execution allowed"
            ),
            Some(code) => tracing::warn!(
                target: "runguard::audit",
                source = %event.source,
                executable = %event.executable,
                stage = event.stage.map(Stage::as_str).unwrap_or_default(),
                reason_code = code,
                reason = event.reason.as_deref().unwrap_or_default(),
                "execution denied"
            ),
        }

        let Some(file) = &self.file else {
            return;
        };
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(
                    target: "runguard::audit",
                    error = %e,
                    "failed to encode audit event"
                );
                return;
            }
        };
        let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(file, "{line}") {
            tracing::error!(target: "runguard::audit", error = %e, "failed to write audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{reason_codes, Denial};

    fn request() -> ExecutionRequest {
        ExecutionRequest::builder("10.0.0.7".parse().unwrap(), "bash")
            .arguments(["-c"])
            .basic_auth("test", "hunter2")
            .stdin("echo top-secret")
            .build()
    }

    #[test]
    fn test_event_never_contains_secrets() {
        let decision = AuthorizationDecision::Denied(Denial::denied(
            Stage::Credential,
            reason_codes::C_CREDENTIALS_MISMATCH,
            "presented credentials do not match",
        ));
        let event = AuditEvent::from_decision(&request(), &decision);
        let json = serde_json::to_string(&event).unwrap();

        assert!(!json.contains("hunter2"));
        assert!(!json.contains("top-secret"));
        assert!(json.contains("\"reason_code\":\"C_CREDENTIALS_MISMATCH\""));
        assert!(json.contains("\"stage\":\"credential\""));
        assert_eq!(event.http_status, 401);
        assert_eq!(event.stdin_len, 15);
        assert_eq!(event.stdin_sha256.len(), 64);
    }

    #[test]
    fn test_allowed_event_omits_denial_fields() {
        let event = AuditEvent::from_decision(&request(), &AuthorizationDecision::Allowed);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["decision"], "allow");
        assert_eq!(value["http_status"], 200);
        assert!(value.get("reason_code").is_none());
        assert!(value.get("stage").is_none());
        assert_eq!(value["username"], "test");
    }

    #[test]
    fn test_log_appends_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.ndjson");

        let log = AuditLog::open(Some(path.as_path())).unwrap();
        let event = AuditEvent::from_decision(&request(), &AuthorizationDecision::Allowed);
        log.record(&event);
        log.record(&event);
        drop(log);

        let log = AuditLog::open(Some(path.as_path())).unwrap();
        log.record(&event);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["executable"], "bash");
        }
    }

    #[test]
    fn test_open_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing/audit.ndjson");
        let err = AuditLog::open(Some(missing.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        AuditLog::disabled().record(&AuditEvent::from_decision(
            &request(),
            &AuthorizationDecision::Allowed,
        ));
    }
}
