//! Source adapters.
//!
//! One adapter per external source/stream pair, all satisfying the same
//! [`SourceAdapter`] contract: describe the payload schema, perform the
//! authenticated fetch exactly once, and emit normalized points. Upstream
//! wire shapes never cross the adapter boundary: each adapter parses into
//! private records first and maps those into [`DataPoint`]s.

mod bodymedia;
mod entra;
mod mindmymeds;
mod runkeeper;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub use bodymedia::BodyMediaSleep;
pub use entra::EntraGlucose;
pub use mindmymeds::MindMyMedsHistory;
pub use runkeeper::{RunKeeperActivities, RunKeeperProfile};

use crate::columns::ColumnNode;
use crate::http_client::HttpClient;
use crate::paging::PagingWindow;
use crate::schema::DataSchema;
use crate::token_cache::TokenCache;
use crate::{DataPoint, SourceId, UtcDateTime};

/// Adapter-level error classification. Every kind surfaces to the caller as
/// the single "could not retrieve data" category; the kind is kept for logs
/// and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    MissingCredentials,
    Transport,
    Upstream,
    MalformedPayload,
    NotServiced,
    Internal,
}

/// Structured failure raised by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MissingCredentials,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Upstream,
            message: message.into(),
        }
    }

    pub fn upstream_status(source: SourceId, status: u16) -> Self {
        Self::upstream(format!("{source} returned status {status}"))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedPayload,
            message: message.into(),
        }
    }

    pub fn not_serviced() -> Self {
        Self {
            kind: SourceErrorKind::NotServiced,
            message: String::from("the adapter has not been serviced"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::MissingCredentials => "source.missing_credentials",
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::Upstream => "source.upstream",
            SourceErrorKind::MalformedPayload => "source.malformed_payload",
            SourceErrorKind::NotServiced => "source.not_serviced",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Everything an adapter needs for its single `service` call. Assembled by
/// the orchestrator after authentication and authorization have passed.
pub struct ServiceContext<'a> {
    /// The user whose upstream data is requested.
    pub owner: &'a str,
    /// This source's credential map, looked up once for this invocation.
    pub credentials: &'a BTreeMap<String, String>,
    pub start_time: Option<UtcDateTime>,
    pub end_time: Option<UtcDateTime>,
    pub http: &'a dyn HttpClient,
    pub tokens: &'a TokenCache,
}

impl ServiceContext<'_> {
    /// Fetches a required per-user or application credential.
    pub fn credential(&self, key: &str) -> Result<&str, SourceError> {
        self.credentials
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| {
                SourceError::missing_credentials(format!(
                    "the '{key}' credential has not been stored for this source"
                ))
            })
    }
}

type ServiceFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SourceError>> + Send + 'a>>;

/// The uniform contract every source adapter satisfies.
///
/// Adapters are single-use: one instance is constructed per request,
/// serviced once, and read back by the same request. Construction never
/// performs I/O.
pub trait SourceAdapter: Send + std::fmt::Debug {
    fn source(&self) -> SourceId;

    /// The stream/method segment this adapter is registered under.
    fn stream(&self) -> &'static str;

    /// Whether this source's points carry an upstream ID.
    fn has_id(&self) -> bool;

    /// Whether this source's points carry a timestamp.
    fn has_timestamp(&self) -> bool;

    /// Whether this source's points carry a location.
    fn has_location(&self) -> bool;

    /// Structural description of the data-point payload. Callable without
    /// authentication and before `service`.
    fn describe_schema(&self) -> DataSchema;

    /// Performs the authenticated fetch and parse exactly once; repeated
    /// calls are no-ops. On failure the adapter holds no points at all.
    fn service<'a>(&'a mut self, ctx: &'a ServiceContext<'a>, window: PagingWindow)
        -> ServiceFuture<'a>;

    /// Count of points that `respond` will emit. Valid only after `service`.
    fn num_data_points(&self) -> Result<usize, SourceError>;

    /// Serializes the retained points, honoring the capability flags and the
    /// column projection. Valid only after `service`.
    fn respond(&self, columns: Option<&ColumnNode>) -> Result<Vec<Value>, SourceError>;
}

/// Renders a serviced point list the way every adapter's `respond` does.
pub(crate) fn render_points(
    adapter: &dyn SourceAdapter,
    points: &[DataPoint],
    columns: Option<&ColumnNode>,
) -> Vec<Value> {
    points
        .iter()
        .map(|point| {
            point.render(
                adapter.has_id(),
                adapter.has_timestamp(),
                adapter.has_location(),
                columns,
            )
        })
        .collect()
}
