use serde::Serialize;
use serde_json::Value;
use vitalsync_core::AdapterRegistry;

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SourceListing {
    source: String,
    stream: String,
    payload_id: String,
}

pub fn run() -> Result<Value, CliError> {
    let registry = AdapterRegistry::with_defaults();

    let listings: Vec<SourceListing> = registry
        .descriptors()
        .map(|descriptor| SourceListing {
            source: descriptor.source().to_string(),
            stream: descriptor.stream().to_owned(),
            payload_id: format!("omh:{}:{}:1", descriptor.source(), descriptor.stream()),
        })
        .collect();

    Ok(serde_json::to_value(&listings)?)
}
