use std::sync::Arc;

use serde_json::Value;
use vitalsync_core::{AdapterRegistry, ReadParams, ReadService, ReqwestHttpClient};

use crate::cli::{Cli, ReadArgs};
use crate::config::Config;
use crate::error::CliError;

pub async fn run(cli: &Cli, args: &ReadArgs) -> Result<Value, CliError> {
    let config = Config::load(cli.config.as_deref())?;

    let service = ReadService::new(
        AdapterRegistry::with_defaults(),
        config.authenticator(),
        config.credential_store()?,
        Arc::new(ReqwestHttpClient::new()),
    );

    let params = ReadParams {
        auth_token: args.auth_token.clone(),
        payload_id: args.payload_id.clone(),
        owner: args.owner.clone(),
        start_time: args.start.clone(),
        end_time: args.end.clone(),
        column_list: args.columns.clone(),
        num_to_skip: args.num_to_skip.clone(),
        num_to_return: args.num_to_return.clone(),
    };

    let envelope = service.read(&params).await?;
    Ok(serde_json::to_value(&envelope)?)
}
