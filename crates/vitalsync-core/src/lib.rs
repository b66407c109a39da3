//! Core contracts for vitalsync.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Payload identifiers and source adapters
//! - The adapter registry and the read/catalog orchestrators
//! - The shared delegated-auth token cache

pub mod adapters;
pub mod auth;
pub mod catalog;
pub mod columns;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod paging;
pub mod payload_id;
pub mod read;
pub mod registry;
pub mod schema;
pub mod source;
pub mod token_cache;

pub use adapters::{
    BodyMediaSleep, EntraGlucose, MindMyMedsHistory, RunKeeperActivities, RunKeeperProfile,
    ServiceContext, SourceAdapter, SourceError, SourceErrorKind,
};
pub use auth::{AuthenticatedUser, Authenticator, PrivilegeLevel, StaticAuthenticator};
pub use catalog::{CatalogEntry, CatalogParams, build_catalog};
pub use columns::ColumnNode;
pub use credentials::{CredentialStore, InMemoryCredentialStore};
pub use domain::{DataPoint, Location, UtcDateTime};
pub use error::{CredentialError, RequestError, RequestErrorKind, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use paging::{MAX_NUM_TO_RETURN, PageRequest, PagingWindow};
pub use payload_id::PayloadId;
pub use read::{PageHint, ReadEnvelope, ReadMetadata, ReadParams, ReadService};
pub use registry::{AdapterDescriptor, AdapterRegistry};
pub use schema::{DataSchema, FieldKind, SchemaField};
pub use source::SourceId;
pub use token_cache::{CachedToken, TokenCache};
