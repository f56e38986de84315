//! Concurrent artifact cache.
//!
//! Compiled artifacts are memoized under a content hash of the fragment
//! source plus the request globals, so identical requests served
//! concurrently share one artifact.

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::{CompiledArtifact, RequestConfig};

#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: DashMap<String, Arc<CompiledArtifact>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cache key for a fragment and its request configuration. A zero byte
    /// separates source bytes from the serialized globals so neither can
    /// masquerade as the other.
    pub fn key(fragment: &str, request: Option<&RequestConfig>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(fragment.as_bytes());
        hasher.update([0u8]);
        if let Some(request) = request {
            // BTreeMap serialization is key-ordered, so equal global sets
            // hash equally regardless of insertion order.
            if let Ok(globals) = serde_json::to_string(&request.opts.globals) {
                hasher.update(globals.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<Arc<CompiledArtifact>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores an artifact, keeping the first one if a concurrent compile
    /// already filled the slot.
    pub fn insert(&self, key: String, artifact: Arc<CompiledArtifact>) -> Arc<CompiledArtifact> {
        self.entries.entry(key).or_insert(artifact).value().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
