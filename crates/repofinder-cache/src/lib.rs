// SQLite-backed search history
// Remembers what the user searched for so we can suggest it again

pub mod recent;

pub use recent::{CacheError, RecentSearchCache, SearchEntry};
