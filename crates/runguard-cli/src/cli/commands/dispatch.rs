use super::super::args::{Cli, Command};
use crate::exit_codes::SUCCESS;
use crate::logging::Logging;

pub fn dispatch(cli: Cli, logging: &Logging) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Check(args) => super::check::run(&args, logging),
        Command::Authorize(args) => super::authorize::run(&args, logging),
        Command::Verify(args) => super::verify::run(&args, logging),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
