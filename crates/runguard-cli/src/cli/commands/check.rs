//! `runguard check` - validate a configuration file.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use runguard_core::{ClientCertificates, CommandPolicy, Settings, StdinSignatures};
use runguard_policy::ArgumentSequences;

use crate::exit_codes::SUCCESS;
use crate::logging::Logging;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Configuration file (YAML)
    #[arg(long, short, env = "RUNGUARD_CONFIG")]
    pub config: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    bind_address: String,
    https: bool,
    certificate_path: Option<PathBuf>,
    private_key_path: Option<PathBuf>,
    http_request_timeout: String,
    default_script_timeout: String,
    log_level: String,
    log_file_path: Option<PathBuf>,
    audit_log_path: Option<PathBuf>,
    log_http_requests: bool,
    log_http_responses: bool,
    allowed_networks: Vec<String>,
    client_certificates: Option<usize>,
    username: String,
    signing_key_id: Option<String>,
    signed_stdin_required: bool,
    command_policy: &'static str,
    approved_path_arguments: ArgumentSequences,
}

impl Summary {
    fn new(settings: &Settings) -> Self {
        let server = &settings.server;
        let trust = &settings.trust;
        let (command_policy, approved_path_arguments) = match &trust.command_policy {
            CommandPolicy::Enforced(allowlist) => ("enforced", allowlist.to_sequences()),
            CommandPolicy::Permissive => ("permissive", ArgumentSequences::new()),
        };
        let tls_files = |path: &PathBuf| (!server.disable_https).then(|| path.clone());
        Self {
            bind_address: server.bind_address.to_string(),
            https: !server.disable_https,
            certificate_path: tls_files(&server.certificate_path),
            private_key_path: tls_files(&server.private_key_path),
            http_request_timeout: humanize(server.http_request_timeout),
            default_script_timeout: humanize(server.default_script_timeout),
            log_level: server.log_level.as_str().to_ascii_lowercase(),
            log_file_path: server.log_file_path.clone(),
            audit_log_path: server.audit_log_path.clone(),
            log_http_requests: server.log_http_requests,
            log_http_responses: server.log_http_responses,
            allowed_networks: trust
                .allowed_networks
                .networks()
                .iter()
                .map(ToString::to_string)
                .collect(),
            client_certificates: match &trust.client_certificates {
                ClientCertificates::NotRequired => None,
                ClientCertificates::Required(ca) => Some(ca.anchors()),
            },
            username: trust.credentials.username().to_string(),
            signing_key_id: settings.public_key.as_ref().map(|k| k.key_id()),
            signed_stdin_required: matches!(trust.stdin_signatures, StdinSignatures::Required(_)),
            command_policy,
            approved_path_arguments,
        }
    }
}

fn humanize(duration: std::time::Duration) -> String {
    format!("{}s", duration.as_secs_f64())
}

pub fn run(args: &CheckArgs, logging: &Logging) -> anyhow::Result<i32> {
    let settings = super::load_settings(&args.config, logging)?;
    let summary = Summary::new(&settings);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(SUCCESS);
    }

    println!("configuration OK: {}", args.config.display());
    println!(
        "  listen:            {} ({})",
        summary.bind_address,
        if summary.https { "https" } else { "http, UNENCRYPTED" }
    );
    if let (Some(cert), Some(key)) = (&summary.certificate_path, &summary.private_key_path) {
        println!("  tls files:         {} / {}", cert.display(), key.display());
    }
    println!(
        "  timeouts:          request {}, script {}",
        summary.http_request_timeout, summary.default_script_timeout
    );
    println!(
        "  logging:           {} to {}{}",
        summary.log_level,
        summary
            .log_file_path
            .as_ref()
            .map_or_else(|| "stderr".to_string(), |p| p.display().to_string()),
        match (summary.log_http_requests, summary.log_http_responses) {
            (true, true) => ", http requests and responses",
            (true, false) => ", http requests",
            (false, true) => ", http responses",
            (false, false) => "",
        }
    );
    if let Some(audit) = &summary.audit_log_path {
        println!("  audit log:         {}", audit.display());
    }
    if summary.allowed_networks.is_empty() {
        println!("  networks:          none (all requests denied)");
    } else {
        println!("  networks:          {}", summary.allowed_networks.join(", "));
    }
    match summary.client_certificates {
        Some(anchors) => println!("  client certs:      required ({anchors} CA certificate(s))"),
        None => println!("  client certs:      not required"),
    }
    println!("  username:          {}", summary.username);
    match (&summary.signing_key_id, summary.signed_stdin_required) {
        (Some(id), true) => println!("  signed stdin:      required (key {id})"),
        (Some(id), false) => println!("  signed stdin:      not required (key {id} configured)"),
        (None, _) => println!("  signed stdin:      not required"),
    }
    println!(
        "  commands:          {} ({} executable(s))",
        summary.command_policy,
        summary.approved_path_arguments.len()
    );
    for (executable, sequences) in &summary.approved_path_arguments {
        for sequence in sequences {
            println!("    {executable} {}", sequence.join(" "));
        }
    }
    Ok(SUCCESS)
}
