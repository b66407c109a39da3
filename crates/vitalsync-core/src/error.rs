use thiserror::Error;

use crate::adapters::SourceError;

/// Validation and contract errors exposed by `vitalsync-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payload ID must have exactly 4 segments, found {count}: '{value}'")]
    PayloadIdSegmentCount { value: String, count: usize },
    #[error("payload ID must start with the 'omh' namespace: '{value}'")]
    PayloadIdNamespace { value: String },
    #[error("unknown source '{value}', expected one of run_keeper, body_media, entra, mind_my_meds")]
    InvalidSource { value: String },
    #[error("payload ID stream segment cannot be empty")]
    PayloadIdEmptyStream,
    #[error("payload version must be a non-negative number: '{value}'")]
    InvalidPayloadVersion { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("number of results to skip must be a non-negative number: '{value}'")]
    InvalidNumToSkip { value: String },
    #[error("number of results to return must be a number between 0 and {max}: '{value}'")]
    InvalidNumToReturn { value: String, max: u64 },

    #[error("column list cannot be empty")]
    EmptyColumnList,
    #[error("column list contains an empty column name: '{value}'")]
    EmptyColumnName { value: String },

    #[error("username cannot be empty or only whitespace")]
    EmptyUsername,
}

/// Step at which a read or catalog request failed, with a stable wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    InvalidPayloadId,
    InvalidPaging,
    InvalidColumnList,
    InvalidTimestamp,
    InvalidOwner,
    AuthenticationFailed,
    AuthorizationFailed,
    UnknownSource,
    Upstream,
    Internal,
}

/// Terminal failure state of a request. Once set, no later step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    kind: RequestErrorKind,
    message: String,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_source(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::UnknownSource, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::AuthorizationFailed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::Internal, message)
    }

    pub const fn kind(&self) -> RequestErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            RequestErrorKind::InvalidPayloadId => "request.invalid_payload_id",
            RequestErrorKind::InvalidPaging => "request.invalid_paging",
            RequestErrorKind::InvalidColumnList => "request.invalid_column_list",
            RequestErrorKind::InvalidTimestamp => "request.invalid_timestamp",
            RequestErrorKind::InvalidOwner => "request.invalid_owner",
            RequestErrorKind::AuthenticationFailed => "request.authentication_failed",
            RequestErrorKind::AuthorizationFailed => "request.authorization_failed",
            RequestErrorKind::UnknownSource => "request.unknown_source",
            RequestErrorKind::Upstream => "request.upstream_failed",
            RequestErrorKind::Internal => "request.internal",
        }
    }

    /// Whether the failure is attributable to the caller rather than the
    /// server or an upstream source.
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self.kind,
            RequestErrorKind::Upstream | RequestErrorKind::Internal
        )
    }

    /// Wraps a validation failure under the given step's error kind.
    pub fn validation(kind: RequestErrorKind, error: ValidationError) -> Self {
        Self::new(kind, error.to_string())
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for RequestError {}

impl From<SourceError> for RequestError {
    fn from(error: SourceError) -> Self {
        Self::new(
            RequestErrorKind::Upstream,
            format!("could not retrieve the data: {error}"),
        )
    }
}

/// Credential store lookup failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no credentials are configured for source '{source_name}'")]
    UnknownSource { source_name: String },
    #[error("credential store is unavailable: {message}")]
    Unavailable { message: String },
}
