//! Memoized parameter normalization

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use openapi_client::models::ParameterMeta;
use tracing::debug;

use crate::params::normalize::{normalize, NewParameterMeta};
use crate::utils::sha256_hash;

/// Parameter cache entry
#[derive(Debug, Clone)]
pub struct ParameterCacheEntry {
    pub metas: Vec<NewParameterMeta>,
    pub cached_at: i64,
}

/// Normalization results keyed by a digest of their inputs
pub struct ParameterCache {
    entries: RwLock<HashMap<String, ParameterCacheEntry>>,
    capacity: usize,
}

/// Digest of a normalization input
pub fn digest(metas: &[ParameterMeta], select_ocpexpress: bool) -> Option<String> {
    let bytes = serde_json::to_vec(&(metas, select_ocpexpress)).ok()?;
    Some(sha256_hash(&bytes))
}

impl ParameterCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, digest: &str) -> Option<ParameterCacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(digest).cloned()
    }

    fn insert(&self, digest: String, metas: Vec<NewParameterMeta>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        // Evict oldest if at capacity
        if entries.len() >= self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.cached_at)
                .map(|(digest, _)| digest.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            digest,
            ParameterCacheEntry {
                metas,
                cached_at: Utc::now().timestamp_micros(),
            },
        );
    }

    /// Normalize `metas`, reusing the result for an identical snapshot
    pub fn normalize(
        &self,
        metas: &[ParameterMeta],
        select_ocpexpress: bool,
    ) -> Vec<NewParameterMeta> {
        let Some(digest) = digest(metas, select_ocpexpress) else {
            return normalize(metas, select_ocpexpress);
        };

        if let Some(entry) = self.get(&digest) {
            debug!("Parameter cache hit {}", &digest[..12]);
            return entry.metas;
        }

        let normalized = normalize(metas, select_ocpexpress);
        self.insert(digest, normalized.clone());
        normalized
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParameterCache {
    fn default() -> Self {
        Self::new(16)
    }
}
