use serde_json::Value;
use vitalsync_core::{AdapterRegistry, CatalogParams, build_catalog};

use crate::cli::CatalogArgs;
use crate::error::CliError;

pub fn run(args: &CatalogArgs) -> Result<Value, CliError> {
    let registry = AdapterRegistry::with_defaults();

    let params = CatalogParams {
        payload_id: args.payload_id.clone(),
        payload_version: args.payload_version.clone(),
        num_to_skip: args.num_to_skip.clone(),
        num_to_return: args.num_to_return.clone(),
    };

    let entries = build_catalog(&registry, &params)?;
    Ok(serde_json::to_value(&entries)?)
}
