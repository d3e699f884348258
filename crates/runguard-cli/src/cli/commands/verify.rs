//! `runguard verify` - check a minisign signature over a payload file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use runguard_core::{MinisignPublicKey, MinisignSignature};

use crate::exit_codes::{CONFIG_ERROR, SIGNATURE_INVALID, SUCCESS};
use crate::logging::Logging;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Payload file (exact bytes that were signed)
    #[arg(long)]
    pub payload: PathBuf,

    /// Signature file (minisign format)
    #[arg(long)]
    pub signature: PathBuf,

    /// Take the trusted key from this configuration file
    #[arg(long, short, conflicts_with = "public_key", required_unless_present = "public_key")]
    pub config: Option<PathBuf>,

    /// Trusted key: base64 key line or path to a minisign .pub file
    #[arg(long, short = 'P')]
    pub public_key: Option<String>,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn run(args: &VerifyArgs, logging: &Logging) -> Result<i32> {
    let key = trusted_key(args, logging)?;

    let payload = fs::read(&args.payload)
        .with_context(|| format!("failed to read payload: {}", args.payload.display()))?;
    let raw = fs::read(&args.signature)
        .with_context(|| format!("failed to read signature: {}", args.signature.display()))?;

    let signature = match MinisignSignature::parse(&raw) {
        Ok(signature) => signature,
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e}");
            }
            return Ok(CONFIG_ERROR);
        }
    };

    match key.verify_detached(&payload, &signature) {
        Ok(()) => {
            if !args.quiet {
                println!("Signature and comment signature verified");
                println!("Trusted comment: {}", signature.trusted_comment());
            }
            Ok(SUCCESS)
        }
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e}");
            }
            Ok(SIGNATURE_INVALID)
        }
    }
}

fn trusted_key(args: &VerifyArgs, logging: &Logging) -> Result<MinisignPublicKey> {
    if let Some(text) = &args.public_key {
        let path = Path::new(text);
        let material = if path.is_file() {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read public key: {}", path.display()))?
        } else {
            text.clone()
        };
        return MinisignPublicKey::parse(&material).context("invalid --public-key");
    }

    let Some(config) = &args.config else {
        anyhow::bail!("must specify --config or --public-key");
    };
    let settings = super::load_settings(config, logging)?;
    settings
        .public_key
        .with_context(|| format!("{} has no security.public_key", config.display()))
}
