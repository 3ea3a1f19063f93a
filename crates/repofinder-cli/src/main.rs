use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use repofinder_core::{
    providers::GitHubProvider, Config, MemoryRecentStore, PaginationEngine, RecentQueryStore,
    RequestStatus, SqliteRecentStore, SuggestionEngine, MIN_QUERY_LEN,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod browse;
mod output;

#[derive(Parser)]
#[command(name = "repofinder")]
#[command(version, about = "Search GitHub repositories from the terminal", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "REPOFINDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Search for repositories
    Search {
        /// Search query
        query: String,
        /// How many pages of results to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Print the loaded repositories as JSON
        #[arg(long)]
        json: bool,
        /// Print details for this repository id from the loaded results
        #[arg(long)]
        show: Option<u64>,
    },
    /// List recent searches, optionally filtered
    Recent {
        /// Only show entries containing this text
        filter: Option<String>,
        /// Forget all recent searches
        #[arg(long)]
        clear: bool,
    },
    /// Interactive search session
    Browse,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repofinder=info,repofinder_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Search {
            query,
            pages,
            json,
            show,
        }) => run_search(&config, query, pages, json, show).await?,
        Some(Commands::Recent { filter, clear }) => run_recent(&config, filter, clear).await?,
        Some(Commands::Browse) => browse::run(&config).await?,
        None => {
            println!("No command specified. Try --help");
        }
    }

    Ok(())
}

/// Persistent history unless the config turned it off
pub(crate) fn open_history(config: &Config) -> anyhow::Result<Arc<dyn RecentQueryStore>> {
    if config.history.enabled {
        let path = config.history.resolved_db_path()?;
        tracing::debug!("Using search history at {}", path.display());
        Ok(Arc::new(SqliteRecentStore::open(&path)?))
    } else {
        Ok(Arc::new(MemoryRecentStore::new()))
    }
}

pub(crate) fn build_engine(config: &Config) -> anyhow::Result<PaginationEngine> {
    let provider = GitHubProvider::from_config(&config.github)?;
    Ok(PaginationEngine::new(Arc::new(provider)))
}

async fn run_search(
    config: &Config,
    query: String,
    pages: u32,
    json: bool,
    show: Option<u64>,
) -> anyhow::Result<()> {
    let suggestions = SuggestionEngine::new(open_history(config)?);
    suggestions.on_query_text_changed(query);
    let Some(query) = suggestions.confirm_search().await? else {
        bail!("Search query must be at least {} characters", MIN_QUERY_LEN);
    };

    let engine = build_engine(config)?;
    if let Some(fetch) = engine.start_or_reset_session(&query) {
        fetch.await?;
    }

    for _ in 1..pages {
        let state = engine.snapshot();
        if !matches!(state.status(), RequestStatus::Succeeded { .. }) || !state.has_more() {
            break;
        }
        if let Some(fetch) = engine.load_next_page() {
            fetch.await?;
        }
    }

    let state = engine.snapshot();
    if let Some(message) = output::failure_message(state.status()) {
        if state.items().is_empty() {
            bail!("{}", message);
        }
        eprintln!("Stopped early: {}", message);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(state.items())?);
    } else {
        output::print_summary(&state);
        output::print_repositories(state.items(), 0);
    }

    if let Some(id) = show {
        match engine.find_by_id(id) {
            Some(repo) => {
                println!();
                output::print_details(&repo);
            }
            None => println!("Repository {} is not among the loaded results", id),
        }
    }

    Ok(())
}

async fn run_recent(config: &Config, filter: Option<String>, clear: bool) -> anyhow::Result<()> {
    let suggestions = SuggestionEngine::new(open_history(config)?);

    if clear {
        suggestions.clear_all_recent_entries().await?;
        println!("Search history cleared");
        return Ok(());
    }

    let filter = filter.unwrap_or_default();
    suggestions.on_query_text_changed(filter.clone());

    let mut updates = suggestions.subscribe();
    let state = updates.wait_for(|state| state.query == filter).await?.clone();
    output::print_suggestions(&state);

    Ok(())
}
