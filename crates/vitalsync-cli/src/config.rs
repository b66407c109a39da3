//! CLI configuration: platform auth tokens and per-source credentials,
//! loaded from a JSON file.
//!
//! ```json
//! {
//!   "auth_tokens": {
//!     "tok-alice": {"username": "alice", "privilege": "user"}
//!   },
//!   "credentials": {
//!     "run_keeper": {"bearer_alice": "rk-token"}
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use vitalsync_core::{
    AuthenticatedUser, InMemoryCredentialStore, PrivilegeLevel, SourceId, StaticAuthenticator,
};

use crate::error::CliError;

const CONFIG_ENV_VAR: &str = "VITALSYNC_CONFIG";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    auth_tokens: BTreeMap<String, TokenEntry>,
    #[serde(default)]
    credentials: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    username: String,
    #[serde(default)]
    privilege: Privilege,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Privilege {
    #[default]
    User,
    Privileged,
    Admin,
}

impl From<Privilege> for PrivilegeLevel {
    fn from(privilege: Privilege) -> Self {
        match privilege {
            Privilege::User => Self::User,
            Privilege::Privileged => Self::Privileged,
            Privilege::Admin => Self::Admin,
        }
    }
}

impl Config {
    /// Loads the config from the given path, or from `VITALSYNC_CONFIG`
    /// when no path is supplied.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_ENV_VAR).map(PathBuf::from).map_err(|_| {
                CliError::Config(format!(
                    "no config file given; pass --config or set {CONFIG_ENV_VAR}"
                ))
            })?,
        };

        let raw = std::fs::read_to_string(&path).map_err(|error| {
            CliError::Config(format!("could not read '{}': {error}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|error| {
            CliError::Config(format!("could not parse '{}': {error}", path.display()))
        })
    }

    pub fn authenticator(&self) -> Arc<StaticAuthenticator> {
        let authenticator = StaticAuthenticator::new();
        for (token, entry) in &self.auth_tokens {
            authenticator.insert(
                token,
                AuthenticatedUser::new(&entry.username, entry.privilege.into()),
            );
        }
        Arc::new(authenticator)
    }

    pub fn credential_store(&self) -> Result<Arc<InMemoryCredentialStore>, CliError> {
        let store = InMemoryCredentialStore::new();
        for (source, values) in &self.credentials {
            let source = source.parse::<SourceId>().map_err(|error| {
                CliError::Config(format!("invalid credentials section: {error}"))
            })?;
            store.insert_all(source, values.clone());
        }
        Ok(Arc::new(store))
    }
}
