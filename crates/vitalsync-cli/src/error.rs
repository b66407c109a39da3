use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Request(#[from] vitalsync_core::RequestError),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Request(error) if error.is_client_error() => 2,
            Self::Request(_) => 4,
            Self::Config(_) => 3,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
