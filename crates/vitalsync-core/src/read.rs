//! The read orchestrator.
//!
//! One request walks a fixed step sequence: parse the payload identifier,
//! paging, projection, and time bounds; authenticate the platform token;
//! resolve the adapter; authorize access to the requested owner's data;
//! service the adapter; serialize the result. The first failing step
//! produces the terminal error and nothing after it runs. In particular,
//! no upstream call is made for a request that fails validation,
//! authentication, or authorization.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::adapters::ServiceContext;
use crate::auth::{Authenticator, authorize_owner_access};
use crate::columns::ColumnNode;
use crate::credentials::CredentialStore;
use crate::http_client::HttpClient;
use crate::paging::PagingWindow;
use crate::payload_id::PayloadId;
use crate::registry::AdapterRegistry;
use crate::token_cache::TokenCache;
use crate::{RequestError, RequestErrorKind, UtcDateTime};

/// Wire-level read request parameters, uniform across all sources. All
/// fields arrive as undecoded strings; parsing them is the orchestrator's
/// first step.
#[derive(Debug, Clone, Default)]
pub struct ReadParams {
    pub auth_token: String,
    pub payload_id: String,
    pub owner: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub column_list: Option<String>,
    pub num_to_skip: Option<String>,
    pub num_to_return: Option<String>,
}

/// Skip/return pair pointing at an adjacent page of the same request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageHint {
    pub num_to_skip: u64,
    pub num_to_return: u64,
}

/// Response metadata: the emitted count plus paging hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadMetadata {
    pub request_id: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageHint>,
}

/// The complete read response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadEnvelope {
    pub result: &'static str,
    pub metadata: ReadMetadata,
    pub data: Vec<Value>,
}

impl ReadEnvelope {
    fn success(window: PagingWindow, data: Vec<Value>) -> Self {
        let count = data.len();
        let skip = window.num_to_skip();
        let ret = window.num_to_return();

        // The previous page covers either everything before this one or a
        // full page, whichever is smaller.
        let previous = (skip > 0).then(|| {
            let prev_return = skip.min(ret);
            PageHint {
                num_to_skip: skip - prev_return,
                num_to_return: prev_return,
            }
        });

        // A filled page means there might be another.
        let next = (count as u64 == ret && ret > 0).then(|| PageHint {
            num_to_skip: skip + ret,
            num_to_return: ret,
        });

        Self {
            result: "success",
            metadata: ReadMetadata {
                request_id: uuid::Uuid::new_v4().to_string(),
                count,
                previous,
                next,
            },
            data,
        }
    }
}

/// Executes uniform read requests against the registered sources.
pub struct ReadService {
    registry: AdapterRegistry,
    authenticator: Arc<dyn Authenticator>,
    credentials: Arc<dyn CredentialStore>,
    http: Arc<dyn HttpClient>,
    tokens: Arc<TokenCache>,
}

impl ReadService {
    pub fn new(
        registry: AdapterRegistry,
        authenticator: Arc<dyn Authenticator>,
        credentials: Arc<dyn CredentialStore>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            registry,
            authenticator,
            credentials,
            http,
            tokens: Arc::new(TokenCache::new()),
        }
    }

    /// Replaces the default token cache, e.g. to share one across services.
    pub fn with_token_cache(mut self, tokens: Arc<TokenCache>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub async fn read(&self, params: &ReadParams) -> Result<ReadEnvelope, RequestError> {
        let payload_id = params
            .payload_id
            .parse::<PayloadId>()
            .map_err(|error| {
                RequestError::validation(RequestErrorKind::InvalidPayloadId, error)
            })?;

        let window = PagingWindow::parse(
            params.num_to_skip.as_deref(),
            params.num_to_return.as_deref(),
        )
        .map_err(|error| RequestError::validation(RequestErrorKind::InvalidPaging, error))?;

        let columns = params
            .column_list
            .as_deref()
            .map(ColumnNode::parse)
            .transpose()
            .map_err(|error| {
                RequestError::validation(RequestErrorKind::InvalidColumnList, error)
            })?;

        let start_time = parse_bound(params.start_time.as_deref())?;
        let end_time = parse_bound(params.end_time.as_deref())?;

        let user = self.authenticator.authenticate(&params.auth_token)?;

        let mut adapter = self.registry.resolve(&payload_id)?;

        let owner = authorize_owner_access(&user, params.owner.as_deref())?;

        info!(
            payload_id = %payload_id,
            owner = %owner,
            requester = %user.username,
            "servicing a read request"
        );

        let credentials = self
            .credentials
            .credentials(payload_id.source())
            .map_err(|error| {
                RequestError::new(
                    RequestErrorKind::Upstream,
                    format!("could not retrieve the data: {error}"),
                )
            })?;

        let ctx = ServiceContext {
            owner: &owner,
            credentials: &credentials,
            start_time,
            end_time,
            http: self.http.as_ref(),
            tokens: &self.tokens,
        };

        adapter.service(&ctx, window).await?;

        let count = adapter.num_data_points()?;
        let data = adapter.respond(columns.as_ref())?;
        info!(payload_id = %payload_id, count, "read request serviced");

        debug_assert_eq!(count, data.len());
        Ok(ReadEnvelope::success(window, data))
    }
}

fn parse_bound(value: Option<&str>) -> Result<Option<UtcDateTime>, RequestError> {
    value
        .map(UtcDateTime::parse)
        .transpose()
        .map_err(|error| RequestError::validation(RequestErrorKind::InvalidTimestamp, error))
}
