use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GITHUB_API_BASE: &str = "https://api.github.com";
const DEFAULT_USER_AGENT: &str = concat!("RepoFinder/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum GitHubError {
    /// The server answered, just not with 200.
    #[error("GitHub responded with status {status}")]
    Status { status: u16 },

    /// Connect failure, DNS failure or timeout. Worth retrying once the
    /// network is back.
    #[error("Could not reach GitHub: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected failure talking to GitHub: {0}")]
    Unexpected(#[source] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl GitHubError {
    /// HTTP status code, if the server got far enough to send one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GitHubError::Status { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GitHubError::Transport(_))
    }
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            GitHubError::Transport(err)
        } else {
            GitHubError::Unexpected(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new() -> Result<Self> {
        Self::with_settings(GITHUB_API_BASE, DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// For GitHub Enterprise or a local test server
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_settings(base_url, DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds the whole request; hitting it surfaces as
    /// [`GitHubError::Transport`].
    pub fn with_settings(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(GitHubError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of repository search results.
    ///
    /// The query goes to the server verbatim - GitHub does the matching.
    /// Exactly one request per call, no retries.
    pub async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchResponse> {
        let url = format!("{}/search/repositories", self.base_url);
        let page = page.to_string();
        let per_page = per_page.to_string();

        debug!("GET {} q={} page={} per_page={}", url, query, page, per_page);

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("page", page.as_str()), ("per_page", per_page.as_str())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GitHubError::Status {
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body)
    }
}

/// Body of `GET /search/repositories`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<GitHubRepo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub owner: GitHubOwner,
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub watchers_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub repos_url: String,
    pub html_url: String,
}
