// Core logic: paged search sessions and search-history suggestions
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod providers;
pub mod recent;
pub mod search;
pub mod suggestions;

pub use config::Config;
pub use error::Error;
pub use models::{Owner, Repository, SearchPage};
pub use pagination::{PaginationEngine, RequestStatus, ScrollTracker, SessionState, PAGE_SIZE, SCROLL_BUFFER};
pub use recent::{MemoryRecentStore, RecentQueryStore, SqliteRecentStore};
pub use repofinder_cache::SearchEntry;
pub use search::{SearchOutcome, SearchProvider, MSG_UNEXPECTED, UNEXPECTED_ERROR_CODE};
pub use suggestions::{normalize_query, SuggestionEngine, SuggestionState, DEBOUNCE, MIN_QUERY_LEN};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
