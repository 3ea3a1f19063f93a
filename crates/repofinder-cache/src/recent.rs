use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("History connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// One remembered search term. The name is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub name: String,
    pub searched_at: DateTime<Utc>,
}

impl SearchEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            searched_at: Utc::now(),
        }
    }

    /// Case-insensitive substring match against the entry name
    pub fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Recent searches stored in SQLite, with a live view of the table.
///
/// Every mutation re-reads the table after it commits and pushes the fresh
/// list to all subscribers, so a subscriber never sees a write that isn't
/// on disk yet.
pub struct RecentSearchCache {
    conn: Mutex<Connection>,
    entries: watch::Sender<Vec<SearchEntry>>,
}

impl RecentSearchCache {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Throwaway history, gone when the process exits
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        let initial = Self::query_all(&conn)?;
        let (entries, _) = watch::channel(initial);

        Ok(Self {
            conn: Mutex::new(conn),
            entries,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS recent_searches (
                name TEXT PRIMARY KEY NOT NULL,
                searched_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn query_all(conn: &Connection) -> Result<Vec<SearchEntry>> {
        let mut stmt =
            conn.prepare("SELECT name, searched_at FROM recent_searches ORDER BY name ASC")?;

        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let searched_at: i64 = row.get(1)?;
            Ok(SearchEntry {
                name,
                searched_at: DateTime::from_timestamp(searched_at, 0).unwrap_or_default(),
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
        f(&conn)
    }

    /// Re-read the table and notify subscribers
    fn publish(&self, conn: &Connection) -> Result<()> {
        let entries = Self::query_all(conn)?;
        self.entries.send_replace(entries);
        Ok(())
    }

    /// Insert the entry, replacing any existing row with the same name
    pub fn insert_or_replace(&self, entry: &SearchEntry) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO recent_searches (name, searched_at) VALUES (?1, ?2)",
                params![entry.name, entry.searched_at.timestamp()],
            )?;
            debug!("Recorded search '{}'", entry.name);
            self.publish(conn)
        })
    }

    /// Wipe the history. Returns how many rows went away.
    pub fn delete_all(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM recent_searches", [])?;
            debug!("Cleared {} recent searches", removed);
            self.publish(conn)?;
            Ok(removed)
        })
    }

    /// One-shot read, sorted by name
    pub fn entries(&self) -> Result<Vec<SearchEntry>> {
        self.with_conn(Self::query_all)
    }

    /// Live view: the receiver always holds the current sorted table and
    /// wakes up after every insert or delete.
    pub fn subscribe(&self) -> watch::Receiver<Vec<SearchEntry>> {
        self.entries.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[SearchEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_entries_sorted_by_name() {
        let cache = RecentSearchCache::in_memory().unwrap();
        for name in ["gamma", "alpha", "beta"] {
            cache.insert_or_replace(&SearchEntry::new(name)).unwrap();
        }

        assert_eq!(names(&cache.entries().unwrap()), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let cache = RecentSearchCache::in_memory().unwrap();
        cache.insert_or_replace(&SearchEntry::new("rust")).unwrap();
        cache.insert_or_replace(&SearchEntry::new("rust")).unwrap();
        // Case matters for uniqueness
        cache.insert_or_replace(&SearchEntry::new("Rust")).unwrap();

        assert_eq!(names(&cache.entries().unwrap()), vec!["Rust", "rust"]);
    }

    #[test]
    fn test_subscription_sees_every_mutation() {
        let cache = RecentSearchCache::in_memory().unwrap();
        let mut rx = cache.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        cache.insert_or_replace(&SearchEntry::new("tokio")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(names(&rx.borrow_and_update()), vec!["tokio"]);

        let removed = cache.delete_all().unwrap();
        assert_eq!(removed, 1);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let cache = RecentSearchCache::new(&path).unwrap();
            cache.insert_or_replace(&SearchEntry::new("go lang")).unwrap();
        }

        let reopened = RecentSearchCache::new(&path).unwrap();
        assert_eq!(names(&reopened.subscribe().borrow()), vec!["go lang"]);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let entry = SearchEntry::new("Alpha");
        assert!(entry.matches("a"));
        assert!(entry.matches("ALP"));
        assert!(!entry.matches("beta"));
    }
}
