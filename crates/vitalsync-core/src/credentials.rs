//! Per-source credential lookup.
//!
//! The platform stores each source's secret material (per-user tokens and
//! passwords alongside application-level keys) as a flat string map per
//! source. The core looks a source's map up once per adapter invocation;
//! missing per-user keys are a hard failure for that adapter.
//!
//! Key conventions:
//! - `bearer_<username>`: a stored delegated-auth bearer token;
//! - `<username>_username` / `<username>_password`: the user's account on
//!   the upstream service;
//! - `api_key`, `app_id`, `app_password`: application-level material shared
//!   by all users of a source.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{CredentialError, SourceId};

/// Read-only credential lookup, keyed by source.
pub trait CredentialStore: Send + Sync {
    fn credentials(&self, source: SourceId) -> Result<BTreeMap<String, String>, CredentialError>;
}

/// Credential store backed by an in-process map. Used by tests and by the
/// CLI's config-file loader.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<BTreeMap<SourceId, BTreeMap<String, String>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        source: SourceId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &Self {
        self.entries
            .lock()
            .expect("credential store should not be poisoned")
            .entry(source)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn insert_all(&self, source: SourceId, values: BTreeMap<String, String>) -> &Self {
        self.entries
            .lock()
            .expect("credential store should not be poisoned")
            .entry(source)
            .or_default()
            .extend(values);
        self
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn credentials(&self, source: SourceId) -> Result<BTreeMap<String, String>, CredentialError> {
        self.entries
            .lock()
            .expect("credential store should not be poisoned")
            .get(&source)
            .cloned()
            .ok_or_else(|| CredentialError::UnknownSource {
                source_name: source.to_string(),
            })
    }
}
