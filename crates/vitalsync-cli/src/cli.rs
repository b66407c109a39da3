use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line interface for the vitalsync aggregation layer.
#[derive(Debug, Parser)]
#[command(name = "vitalsync", version, about = "Read health data from connected sources")]
pub struct Cli {
    /// Path to the JSON config file holding tokens and source credentials.
    /// Falls back to the VITALSYNC_CONFIG environment variable.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read time-series data for a payload type.
    Read(ReadArgs),
    /// List the known payload types and their schemas.
    Catalog(CatalogArgs),
    /// List the registered sources and their streams.
    Sources,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Platform authentication token of the requesting user.
    #[arg(long)]
    pub auth_token: String,

    /// Payload identifier, e.g. omh:run_keeper:fitness_activities:1.
    #[arg(long)]
    pub payload_id: String,

    /// Read another user's data (requires privilege).
    #[arg(long)]
    pub owner: Option<String>,

    /// Earliest point to include, RFC3339 UTC.
    #[arg(long)]
    pub start: Option<String>,

    /// Latest point to include, RFC3339 UTC.
    #[arg(long)]
    pub end: Option<String>,

    /// Column list restricting the output, e.g. duration,heart_rate:avg.
    #[arg(long)]
    pub columns: Option<String>,

    #[arg(long)]
    pub num_to_skip: Option<String>,

    #[arg(long)]
    pub num_to_return: Option<String>,
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Restrict the catalog to one payload identifier.
    #[arg(long)]
    pub payload_id: Option<String>,

    /// Restrict the catalog to one payload version.
    #[arg(long)]
    pub payload_version: Option<String>,

    #[arg(long)]
    pub num_to_skip: Option<String>,

    #[arg(long)]
    pub num_to_return: Option<String>,
}
