use thiserror::Error;

/// Infrastructure failures in RepoFinder.
///
/// Search failures never show up here; they land in the session status
/// instead. These are the ones the caller has to deal with.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API client error: {0}")]
    ApiError(String),

    #[error("History operation failed: {0}")]
    CacheError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<repofinder_cache::CacheError> for Error {
    fn from(err: repofinder_cache::CacheError) -> Self {
        Error::CacheError(err.to_string())
    }
}
