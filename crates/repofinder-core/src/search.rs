use crate::models::SearchPage;

/// Code reported alongside failures that never produced an HTTP status
pub const UNEXPECTED_ERROR_CODE: i32 = -100;

pub const MSG_UNEXPECTED: &str = "Something went wrong while loading repositories.";

/// What one page request came back with.
///
/// Expected failures are values, not errors: the pagination engine folds
/// all of these into session status and never hands them to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Success(SearchPage),
    /// The server said no (or something odd happened). Retrying with the
    /// same input probably won't help.
    ErrorResponse { message: String, code: i32 },
    /// Couldn't reach the server at all. Retry once connectivity is back.
    TransportError(String),
}

impl SearchOutcome {
    /// The catch-all failure: generic message, [`UNEXPECTED_ERROR_CODE`]
    pub fn unexpected() -> Self {
        SearchOutcome::ErrorResponse {
            message: MSG_UNEXPECTED.to_string(),
            code: UNEXPECTED_ERROR_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success(_))
    }
}

/// Trait for search providers - makes testing easier and keeps things flexible
///
/// A provider must never panic or return early on a weird failure; anything
/// it doesn't understand becomes an `ErrorResponse` with
/// [`UNEXPECTED_ERROR_CODE`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, page: u32, per_page: u32) -> SearchOutcome;
}
