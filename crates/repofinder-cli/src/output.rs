// Plain-text rendering of engine state
use repofinder_core::{RequestStatus, Repository, SearchEntry, SessionState, SuggestionState};

/// Error text for a failed session, `None` if there's nothing to complain about
pub fn failure_message(status: &RequestStatus) -> Option<String> {
    match status {
        RequestStatus::ErrorResponse { message, code } => Some(format!("{} (code {})", message, code)),
        RequestStatus::TransportError(message) => Some(message.clone()),
        _ => None,
    }
}

pub fn print_summary(state: &SessionState) {
    println!(
        "'{}': showing {} of {} repositories",
        state.query(),
        state.items().len(),
        state.total_count()
    );
    if let RequestStatus::Succeeded {
        incomplete_results: true,
        ..
    } = state.status()
    {
        println!("(GitHub reported incomplete results for this query)");
    }
}

/// Print rows starting at `first_row` (0-based)
pub fn print_repositories(items: &[Repository], first_row: usize) {
    for (offset, repo) in items.iter().enumerate() {
        let description = repo.description.as_deref().unwrap_or("No description");
        println!(
            "{:>4}. [{}] {}  ★ {}  - {}",
            first_row + offset + 1,
            repo.id,
            repo.full_name(),
            repo.stars,
            description
        );
    }
}

pub fn print_details(repo: &Repository) {
    println!("{}", repo.full_name());
    println!("  {}", repo.description.as_deref().unwrap_or("No description"));
    println!("  Stars:       {}", repo.stars);
    println!("  Watchers:    {}", repo.watchers);
    println!("  Open issues: {}", repo.open_issues);
    println!("  Visibility:  {}", if repo.is_private { "private" } else { "public" });
    println!("  Owner:       {} (id {})", repo.owner.login, repo.owner.id);
    println!("  Profile:     {}", repo.owner.profile_url);
    println!("  Avatar:      {}", repo.owner.avatar_url);
}

fn print_entry(entry: &SearchEntry) {
    let when = entry.searched_at.with_timezone(&chrono::Local);
    println!("  {}  (last searched {})", entry.name, when.format("%Y-%m-%d %H:%M"));
}

pub fn print_suggestions(state: &SuggestionState) {
    if !state.is_valid {
        println!("Search query must be at least {} characters", repofinder_core::MIN_QUERY_LEN);
    }

    if state.is_list_empty {
        println!("No recent searches yet");
    } else if state.entries.is_empty() {
        println!("No recent searches match '{}'", state.query);
    } else {
        for entry in &state.entries {
            print_entry(entry);
        }
    }
}
