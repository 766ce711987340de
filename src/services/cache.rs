use dashmap::DashMap;

use crate::models::CachedJob;

/// Memo of completed jobs, keyed by job key.
pub trait VariantCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedJob>;
    fn put(&self, key: &str, job: CachedJob);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime cache. Entries are never evicted or revalidated, so memory
/// grows with the number of distinct keys.
///
/// Backed by a sharded map: writers lock only the shard holding their key and
/// readers of other shards proceed concurrently.
#[derive(Debug, Default)]
pub struct InMemoryVariantCache {
    entries: DashMap<String, CachedJob>,
}

impl InMemoryVariantCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariantCache for InMemoryVariantCache {
    fn get(&self, key: &str) -> Option<CachedJob> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: &str, job: CachedJob) {
        self.entries.insert(key.to_string(), job);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
