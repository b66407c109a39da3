//! The adapter registry.
//!
//! Every source/stream pair is registered in an explicit startup table that
//! maps it to a constructor for the corresponding adapter. Resolution is a
//! literal match on the registered key space; unknown keys are a
//! client-visible "unknown source" error. Constructing an adapter never
//! performs I/O; all of that happens in the adapter's `service` step.

use std::collections::BTreeMap;

use crate::adapters::{
    BodyMediaSleep, EntraGlucose, MindMyMedsHistory, RunKeeperActivities, RunKeeperProfile,
    SourceAdapter,
};
use crate::payload_id::PayloadId;
use crate::{RequestError, SourceId};

type AdapterFactory = fn() -> Box<dyn SourceAdapter>;

/// One registered adapter: its key and constructor. Immutable after
/// registration.
#[derive(Clone)]
pub struct AdapterDescriptor {
    source: SourceId,
    stream: &'static str,
    factory: AdapterFactory,
}

impl AdapterDescriptor {
    pub const fn source(&self) -> SourceId {
        self.source
    }

    pub const fn stream(&self) -> &'static str {
        self.stream
    }

    /// Constructs a fresh single-use adapter instance.
    pub fn instantiate(&self) -> Box<dyn SourceAdapter> {
        (self.factory)()
    }
}

/// Lookup table from (source, stream) to adapter constructors.
#[derive(Default)]
pub struct AdapterRegistry {
    entries: BTreeMap<(SourceId, &'static str), AdapterDescriptor>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every built-in adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(SourceId::RunKeeper, "profile", || {
                Box::new(RunKeeperProfile::new())
            })
            .register(SourceId::RunKeeper, "fitness_activities", || {
                Box::new(RunKeeperActivities::new())
            })
            .register(SourceId::BodyMedia, "sleep", || Box::new(BodyMediaSleep::new()))
            .register(SourceId::Entra, "glucose", || Box::new(EntraGlucose::new()))
            .register(SourceId::MindMyMeds, "history", || {
                Box::new(MindMyMedsHistory::new())
            });
        registry
    }

    /// Registers an adapter constructor under its (source, stream) key,
    /// replacing any previous registration of the same key.
    pub fn register(
        &mut self,
        source: SourceId,
        stream: &'static str,
        factory: AdapterFactory,
    ) -> &mut Self {
        self.entries.insert(
            (source, stream),
            AdapterDescriptor {
                source,
                stream,
                factory,
            },
        );
        self
    }

    /// Resolves a payload ID to a fresh adapter instance, or an
    /// "unknown source" client error when no adapter is registered for it.
    pub fn resolve(&self, payload_id: &PayloadId) -> Result<Box<dyn SourceAdapter>, RequestError> {
        self.entries
            .get(&(payload_id.source(), payload_id.stream()))
            .map(AdapterDescriptor::instantiate)
            .ok_or_else(|| {
                RequestError::unknown_source(format!(
                    "no data source is registered for payload ID '{payload_id}'"
                ))
            })
    }

    /// Iterates the registered adapters in deterministic key order, for
    /// catalog generation.
    pub fn descriptors(&self) -> impl Iterator<Item = &AdapterDescriptor> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
