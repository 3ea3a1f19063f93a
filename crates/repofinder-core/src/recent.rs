// Recent-search storage seam used by the suggestion engine
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use repofinder_cache::{RecentSearchCache, SearchEntry};
use tokio::sync::watch;

use crate::{Error, Result};

/// Where recent searches live.
///
/// `observe_all` is a subscription, not a read: the receiver holds the
/// current list sorted by name and is notified after every mutation.
#[async_trait]
pub trait RecentQueryStore: Send + Sync {
    async fn insert_or_replace(&self, entry: SearchEntry) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
    fn observe_all(&self) -> watch::Receiver<Vec<SearchEntry>>;
}

/// SQLite-backed history. Queries run on the blocking pool.
pub struct SqliteRecentStore {
    cache: Arc<RecentSearchCache>,
}

impl SqliteRecentStore {
    pub fn new(cache: RecentSearchCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(RecentSearchCache::new(db_path)?))
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&RecentSearchCache) -> repofinder_cache::recent::Result<T> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let result = tokio::task::spawn_blocking(move || op(&cache))
            .await
            .map_err(|e| Error::CacheError(format!("History task failed: {}", e)))?;
        Ok(result?)
    }
}

#[async_trait]
impl RecentQueryStore for SqliteRecentStore {
    async fn insert_or_replace(&self, entry: SearchEntry) -> Result<()> {
        self.run_blocking(move |cache| cache.insert_or_replace(&entry)).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.run_blocking(|cache| cache.delete_all().map(|_| ())).await
    }

    fn observe_all(&self) -> watch::Receiver<Vec<SearchEntry>> {
        self.cache.subscribe()
    }
}

/// History that lives only as long as the process
pub struct MemoryRecentStore {
    entries: Mutex<BTreeMap<String, SearchEntry>>,
    sender: watch::Sender<Vec<SearchEntry>>,
}

impl MemoryRecentStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            entries: Mutex::new(BTreeMap::new()),
            sender,
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, SearchEntry>)) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::CacheError("History lock poisoned".into()))?;
        f(&mut entries);
        // BTreeMap iterates in name order, same as the SQLite ORDER BY
        self.sender.send_replace(entries.values().cloned().collect());
        Ok(())
    }
}

impl Default for MemoryRecentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecentQueryStore for MemoryRecentStore {
    async fn insert_or_replace(&self, entry: SearchEntry) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(entry.name.clone(), entry);
        })
    }

    async fn delete_all(&self) -> Result<()> {
        self.mutate(|entries| entries.clear())
    }

    fn observe_all(&self) -> watch::Receiver<Vec<SearchEntry>> {
        self.sender.subscribe()
    }
}
