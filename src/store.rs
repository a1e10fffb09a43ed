//! Per-key append-only multi-version store, ordered by vector-sum.
//! Grounded in `original_source/store/kv_store.py`'s `KeyValueStore`: a
//! plain struct with inherent methods rather than a trait, matching
//! `infrastructure::replication::ReplicationManager`'s style.

use std::collections::HashMap;

use crate::vector_clock::VectorClock;

/// Immutable once constructed. Deep-copied (via `Clone`) at every
/// replication boundary so replicas never share mutable state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VersionedValue {
    pub key: String,
    pub value: String,
    pub origin: String,
    pub version_vector: VectorClock,
    pub dependencies: VectorClock,
    pub timestamp: f64,
}

#[derive(Debug, Default)]
pub struct MultiVersionStore {
    data: HashMap<String, Vec<VersionedValue>>,
}

impl MultiVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, then keep the key's list ordered by `sum(version_vector)`
    /// ascending. Tolerates duplicate commits of the same version; the
    /// store itself never deduplicates (that's `Replica::_already_applied`'s
    /// job, one layer up).
    pub fn put(&mut self, vv: VersionedValue) {
        let versions = self.data.entry(vv.key.clone()).or_default();
        versions.push(vv);
        versions.sort_by_key(|v| v.version_vector.sum());
    }

    pub fn latest(&self, key: &str) -> Option<&VersionedValue> {
        self.data.get(key).and_then(|versions| versions.last())
    }

    pub fn all_versions(&self, key: &str) -> Vec<VersionedValue> {
        self.data.get(key).cloned().unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }
}
