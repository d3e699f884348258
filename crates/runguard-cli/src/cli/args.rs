use clap::{Parser, Subcommand};

use super::commands::{authorize::AuthorizeArgs, check::CheckArgs, verify::VerifyArgs};
use crate::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "runguard",
    version,
    about = "Authorization gate for remote stdin command execution"
)]
pub struct Cli {
    /// Log output format (stderr)
    #[arg(
        long,
        value_enum,
        default_value_t = LogFormat::Text,
        global = true,
        env = "RUNGUARD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a configuration file
    Check(CheckArgs),
    /// Dry-run the authorization pipeline against a request description
    Authorize(AuthorizeArgs),
    /// Verify a minisign signature over a payload file
    Verify(VerifyArgs),
    Version,
}
