// GitHub provider implementation - bridges API client with SearchProvider trait
use async_trait::async_trait;
use repofinder_api::{GitHubClient, GitHubError, GitHubOwner, GitHubRepo, SearchResponse};
use tracing::warn;

use crate::{
    config::GitHubConfig,
    models::{Owner, Repository, SearchPage},
    search::{SearchOutcome, SearchProvider},
    Error, Result,
};

pub const MSG_BAD_REQUEST: &str = "The search request was rejected. Check the query and try again.";
pub const MSG_UNAUTHORIZED: &str = "GitHub refused access to this search.";
pub const MSG_NOT_FOUND: &str = "Nothing was found at the search endpoint.";
pub const MSG_SERVER_ERROR: &str = "GitHub is having trouble right now. Try again later.";
pub const MSG_UNKNOWN: &str = "Something went wrong with the request.";
pub const MSG_NETWORK: &str = "Unable to reach GitHub. Check your internet connection and try again.";

/// Wrapper around GitHubClient that implements SearchProvider
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        let client = GitHubClient::with_settings(
            config.api_url.clone(),
            &config.user_agent,
            config.timeout(),
        )
        .map_err(|e| Error::ApiError(e.to_string()))?;

        Ok(Self::new(client))
    }
}

#[async_trait]
impl SearchProvider for GitHubProvider {
    async fn search(&self, query: &str, page: u32, per_page: u32) -> SearchOutcome {
        match self.client.search_repositories(query, page, per_page).await {
            Ok(response) => SearchOutcome::Success(response_to_page(response)),
            Err(err) => {
                warn!("Search '{}' page {} failed: {}", query, page, err);
                outcome_for_error(&err)
            }
        }
    }
}

/// Pick the user-facing message for an HTTP status
pub fn message_for_status(status: u16) -> &'static str {
    match status {
        400 => MSG_BAD_REQUEST,
        401 | 403 => MSG_UNAUTHORIZED,
        404 => MSG_NOT_FOUND,
        500 => MSG_SERVER_ERROR,
        _ => MSG_UNKNOWN,
    }
}

fn outcome_for_error(err: &GitHubError) -> SearchOutcome {
    match err {
        GitHubError::Status { status } => SearchOutcome::ErrorResponse {
            message: message_for_status(*status).to_string(),
            code: i32::from(*status),
        },
        GitHubError::Transport(_) => SearchOutcome::TransportError(MSG_NETWORK.to_string()),
        GitHubError::Unexpected(_) | GitHubError::ClientBuild(_) => SearchOutcome::unexpected(),
    }
}

fn response_to_page(response: SearchResponse) -> SearchPage {
    SearchPage {
        total_count: response.total_count,
        incomplete_results: response.incomplete_results,
        items: response.items.into_iter().map(github_to_repo).collect(),
    }
}

/// Convert GitHub API repo to our internal Repository model
fn github_to_repo(gh: GitHubRepo) -> Repository {
    Repository {
        id: gh.id,
        name: gh.name,
        owner: github_to_owner(gh.owner),
        description: gh.description,
        stars: gh.stargazers_count,
        watchers: gh.watchers_count,
        open_issues: gh.open_issues_count,
        is_private: gh.private,
    }
}

fn github_to_owner(owner: GitHubOwner) -> Owner {
    Owner {
        id: owner.id,
        login: owner.login,
        avatar_url: owner.avatar_url,
        repos_url: owner.repos_url,
        profile_url: owner.html_url,
    }
}
