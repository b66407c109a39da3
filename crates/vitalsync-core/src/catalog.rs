//! The registry (catalog) orchestrator.
//!
//! A catalog request lists every known payload type with its structural
//! schema, independent of any user: no authentication, no upstream fetch.
//! Adapters are constructed only to ask them for their self-description.

use serde::Serialize;
use tracing::info;

use crate::paging::{MAX_NUM_TO_RETURN, PagingWindow};
use crate::payload_id::PayloadId;
use crate::registry::AdapterRegistry;
use crate::schema::DataSchema;
use crate::{RequestError, RequestErrorKind};

/// The payload version advertised for every built-in adapter.
const PAYLOAD_VERSION: u32 = 1;

/// Wire-level catalog request parameters: the read parameters minus the
/// time range and owner.
#[derive(Debug, Clone, Default)]
pub struct CatalogParams {
    /// Restricts the catalog to one payload type.
    pub payload_id: Option<String>,
    /// Restricts the catalog to payload types of this version.
    pub payload_version: Option<String>,
    pub num_to_skip: Option<String>,
    pub num_to_return: Option<String>,
}

/// One catalog entry describing a known payload type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Paging hint: the server's maximum page size for reads.
    pub chunk_size: u64,
    /// Whether local-time fields in this payload are authoritative.
    pub local_tz_authoritative: bool,
    /// Whether the platform can summarize this payload server-side.
    pub summarizable: bool,
    pub payload_id: String,
    pub payload_version: u32,
    pub payload_definition: DataSchema,
}

/// Builds the paginated catalog of registered payload types.
pub fn build_catalog(
    registry: &AdapterRegistry,
    params: &CatalogParams,
) -> Result<Vec<CatalogEntry>, RequestError> {
    let filter = params
        .payload_id
        .as_deref()
        .map(str::parse::<PayloadId>)
        .transpose()
        .map_err(|error| RequestError::validation(RequestErrorKind::InvalidPayloadId, error))?;

    let version_filter = params
        .payload_version
        .as_deref()
        .map(|value| {
            value.parse::<u32>().map_err(|_| {
                RequestError::new(
                    RequestErrorKind::InvalidPayloadId,
                    format!("payload version must be a non-negative number: '{value}'"),
                )
            })
        })
        .transpose()?;

    let window = PagingWindow::parse(params.num_to_skip.as_deref(), params.num_to_return.as_deref())
        .map_err(|error| RequestError::validation(RequestErrorKind::InvalidPaging, error))?;

    let mut entries = Vec::new();
    for descriptor in registry.descriptors() {
        if let Some(filter) = &filter {
            if filter.source() != descriptor.source() || filter.stream() != descriptor.stream() {
                continue;
            }
        }
        if version_filter.is_some_and(|version| version != PAYLOAD_VERSION) {
            continue;
        }

        let adapter = descriptor.instantiate();
        let payload_id = PayloadId::new(descriptor.source(), descriptor.stream(), PAYLOAD_VERSION)
            .map_err(|error| RequestError::internal(error.to_string()))?;

        entries.push(CatalogEntry {
            chunk_size: MAX_NUM_TO_RETURN,
            local_tz_authoritative: true,
            summarizable: false,
            payload_id: payload_id.to_string(),
            payload_version: PAYLOAD_VERSION,
            payload_definition: adapter.describe_schema(),
        });
    }

    let entries = window.window(entries);
    info!(count = entries.len(), "catalog request serviced");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_registered_payload_type() {
        let registry = AdapterRegistry::with_defaults();
        let entries =
            build_catalog(&registry, &CatalogParams::default()).expect("catalog builds");

        assert_eq!(entries.len(), 5);
        assert!(
            entries
                .iter()
                .any(|entry| entry.payload_id == "omh:run_keeper:fitness_activities:1")
        );
        for entry in &entries {
            assert_eq!(entry.chunk_size, MAX_NUM_TO_RETURN);
            assert!(entry.local_tz_authoritative);
            assert!(!entry.summarizable);
            assert_eq!(entry.payload_version, 1);
        }
    }

    #[test]
    fn filters_by_payload_id() {
        let registry = AdapterRegistry::with_defaults();
        let params = CatalogParams {
            payload_id: Some(String::from("omh:entra:glucose:1")),
            ..CatalogParams::default()
        };

        let entries = build_catalog(&registry, &params).expect("catalog builds");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].payload_id, "omh:entra:glucose:1");
    }

    #[test]
    fn filters_by_version() {
        let registry = AdapterRegistry::with_defaults();
        let params = CatalogParams {
            payload_version: Some(String::from("2")),
            ..CatalogParams::default()
        };

        let entries = build_catalog(&registry, &params).expect("catalog builds");
        assert!(entries.is_empty());
    }

    #[test]
    fn applies_the_paging_window() {
        let registry = AdapterRegistry::with_defaults();
        let params = CatalogParams {
            num_to_skip: Some(String::from("1")),
            num_to_return: Some(String::from("2")),
            ..CatalogParams::default()
        };

        let entries = build_catalog(&registry, &params).expect("catalog builds");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn malformed_filter_is_a_validation_error() {
        let registry = AdapterRegistry::with_defaults();
        let params = CatalogParams {
            payload_id: Some(String::from("omh:run_keeper")),
            ..CatalogParams::default()
        };

        let err = build_catalog(&registry, &params).expect_err("must fail");
        assert_eq!(err.kind(), RequestErrorKind::InvalidPayloadId);
    }

    #[test]
    fn schemas_serialize_with_explicit_optionality() {
        let registry = AdapterRegistry::with_defaults();
        let params = CatalogParams {
            payload_id: Some(String::from("omh:entra:glucose:1")),
            ..CatalogParams::default()
        };

        let entries = build_catalog(&registry, &params).expect("catalog builds");
        let value = serde_json::to_value(&entries[0]).expect("entry serializes");

        let fields = value["payload_definition"]["schema"]
            .as_array()
            .expect("schema is an array");
        let comment = fields
            .iter()
            .find(|field| field["name"] == "comment")
            .expect("comment field present");
        assert_eq!(comment["optional"], serde_json::json!(true));
    }
}
