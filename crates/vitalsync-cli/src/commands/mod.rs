mod catalog;
mod read;
mod sources;

use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    match &cli.command {
        Command::Read(args) => read::run(cli, args).await,
        Command::Catalog(args) => catalog::run(args),
        Command::Sources => sources::run(),
    }
}
