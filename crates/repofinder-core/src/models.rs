use serde::{Deserialize, Serialize};

/// Repository as the rest of RepoFinder sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub owner: Owner,
    pub description: Option<String>,
    pub stars: u32,
    pub watchers: u32,
    pub open_issues: u32,
    pub is_private: bool,
}

impl Repository {
    /// `owner/name`, the way GitHub prints it
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub repos_url: String,
    pub profile_url: String,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total hits the server claims for the query, across all pages
    pub total_count: u64,
    /// GitHub sets this when the search timed out server-side
    pub incomplete_results: bool,
    pub items: Vec<Repository>,
}
