//! `runguard authorize` - dry-run the pipeline against a described request.
//!
//! Request description (YAML or JSON):
//!
//! ```yaml
//! source: 127.0.0.1
//! username: runner            # or `authorization: "Basic ..."`
//! password: change-me
//! executable: /bin/sh
//! arguments: ["-c"]
//! stdin: "uptime"             # or `stdin_file: payload.sh`
//! signature_file: payload.sh.minisig
//! client_certificate_file: client.pem
//! received_at: 2024-05-01T12:00:00Z
//! ```
//!
//! Relative file names are resolved against the request file's directory.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Args;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use serde::{Deserialize, Serialize};

use runguard_core::{
    AuditEvent, AuditLog, AuthorizationPipeline, BasicCredentials, DenialClass, ExecutionRequest,
    Stage,
};

use crate::exit_codes::{DENIED, SUCCESS};
use crate::logging::Logging;

#[derive(Args, Debug)]
pub struct AuthorizeArgs {
    /// Configuration file (YAML)
    #[arg(long, short, env = "RUNGUARD_CONFIG")]
    pub config: PathBuf,

    /// Request description (YAML or JSON)
    #[arg(long, short)]
    pub request: PathBuf,

    /// Append the decision to this NDJSON audit log (overrides server.audit_log_path)
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestFile {
    source: IpAddr,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    authorization: Option<String>,
    executable: String,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    stdin: Option<String>,
    #[serde(default)]
    stdin_file: Option<PathBuf>,
    #[serde(default)]
    signature_file: Option<PathBuf>,
    #[serde(default)]
    client_certificate_file: Option<PathBuf>,
    #[serde(default)]
    received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct DecisionReport {
    decision: &'static str,
    http_status: u16,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<DenialClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    evaluated: Vec<Stage>,
}

pub fn run(args: &AuthorizeArgs, logging: &Logging) -> anyhow::Result<i32> {
    let settings = super::load_settings(&args.config, logging)?;
    let audit_path = args
        .audit_log
        .clone()
        .or_else(|| settings.server.audit_log_path.clone());
    let audit = AuditLog::open(audit_path.as_deref())?;

    let request = load_request(&args.request)?;
    let pipeline = AuthorizationPipeline::new(settings.trust);
    let evaluation = pipeline.evaluate(&request);

    audit.record(&AuditEvent::from_decision(&request, &evaluation.decision));

    let denial = evaluation.decision.denial();
    let report = DecisionReport {
        decision: if evaluation.decision.is_allowed() { "allow" } else { "deny" },
        http_status: evaluation.decision.http_status(),
        message: denial.map_or("OK", |d| d.public_message()),
        stage: denial.map(|d| d.stage),
        class: denial.map(|d| d.class),
        reason_code: denial.map(|d| d.reason_code),
        reason: denial.map(|d| d.internal_reason.clone()),
        evaluated: evaluation.evaluated.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if evaluation.decision.is_allowed() {
        SUCCESS
    } else {
        DENIED
    })
}

fn load_request(path: &Path) -> anyhow::Result<ExecutionRequest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read request file: {}", path.display()))?;
    let file: RequestFile = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse request file: {}", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let credentials = match (&file.authorization, &file.username, &file.password) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            bail!("use either `authorization` or `username`/`password`, not both")
        }
        (Some(header), None, None) => BasicCredentials::from_authorization_header(header),
        (None, Some(user), Some(pass)) => Some(BasicCredentials::new(user.as_str(), pass.as_str())),
        (None, Some(_), None) | (None, None, Some(_)) => {
            bail!("`username` and `password` must be given together")
        }
        (None, None, None) => None,
    };

    let stdin = match (&file.stdin, &file.stdin_file) {
        (Some(_), Some(_)) => bail!("use either `stdin` or `stdin_file`, not both"),
        (Some(text), None) => text.clone().into_bytes(),
        (None, Some(p)) => read_relative(base_dir, p)?,
        (None, None) => Vec::new(),
    };

    let mut builder = ExecutionRequest::builder(file.source, file.executable)
        .arguments(file.arguments)
        .credentials(credentials)
        .stdin(stdin);

    if let Some(p) = &file.signature_file {
        builder = builder.stdin_signature(read_relative(base_dir, p)?);
    }
    if let Some(p) = &file.client_certificate_file {
        let pem = read_relative(base_dir, p)?;
        let chain = CertificateDer::pem_slice_iter(&pem)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid certificate PEM: {}", p.display()))?;
        builder = builder.client_certificate(chain);
    }
    if let Some(at) = file.received_at {
        builder = builder.received_at(SystemTime::from(at));
    }

    Ok(builder.build())
}

fn read_relative(base_dir: &Path, path: &Path) -> anyhow::Result<Vec<u8>> {
    let full = if path.is_relative() {
        base_dir.join(path)
    } else {
        path.to_path_buf()
    };
    fs::read(&full).with_context(|| format!("failed to read {}", full.display()))
}
