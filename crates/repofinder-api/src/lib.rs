// API client for the GitHub repository search endpoint
pub mod github;

// Re-export common types
pub use github::{GitHubClient, GitHubError, GitHubOwner, GitHubRepo, SearchResponse};
