// Line-driven interactive session: the closest thing to the app's screens
use std::io::Write;

use repofinder_core::{Config, PaginationEngine, ScrollTracker, SuggestionEngine, MIN_QUERY_LEN};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::output;

const HELP: &str = "\
Commands:
  type <text>    update the query and show matching recent searches
  go [text]      search for the current query (or <text>)
  scroll <row>   pretend row <row> is the last one on screen
  more           load the next page right away
  retry          re-request the page that failed
  row <n>        show row <n> if it has been loaded
  show <id>      show details for a loaded repository
  clear          forget all recent searches
  help           show this text
  quit           leave";

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let suggestions = SuggestionEngine::new(crate::open_history(config)?);
    let engine = crate::build_engine(config)?;
    let mut tracker = ScrollTracker::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", HELP);
    output::print_suggestions(&suggestions.state());

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, arg) = line
            .split_once(char::is_whitespace)
            .map(|(command, arg)| (command, arg.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => {}
            "type" => {
                suggestions.on_query_text_changed(arg);
                let mut updates = suggestions.subscribe();
                let state = updates.wait_for(|state| state.query == arg).await?.clone();
                output::print_suggestions(&state);
            }
            "go" => {
                if !arg.is_empty() {
                    suggestions.on_query_text_changed(arg);
                }
                match suggestions.confirm_search().await? {
                    Some(query) => {
                        tracker.reset();
                        let fetch = engine.start_or_reset_session(query);
                        show_new_rows(&engine, fetch, 0).await?;
                    }
                    None => println!("Search query must be at least {} characters", MIN_QUERY_LEN),
                }
            }
            "scroll" => match arg.parse::<usize>() {
                Ok(row) => {
                    let state = engine.snapshot();
                    if tracker.on_scroll(row.saturating_sub(1), &state) {
                        let fetch = engine.load_next_page();
                        show_new_rows(&engine, fetch, state.items().len()).await?;
                    } else {
                        println!("No new page needed");
                    }
                }
                Err(_) => println!("Usage: scroll <row>"),
            },
            "more" => {
                let loaded = engine.snapshot().items().len();
                let fetch = engine.load_next_page();
                show_new_rows(&engine, fetch, loaded).await?;
            }
            "retry" => {
                let loaded = engine.snapshot().items().len();
                let fetch = engine.retry();
                show_new_rows(&engine, fetch, loaded).await?;
            }
            "row" => match arg.parse::<usize>() {
                Ok(row) if row > 0 => match engine.item_at(row - 1) {
                    Some(repo) => output::print_repositories(std::slice::from_ref(&repo), row - 1),
                    None => println!("Row {} hasn't been loaded yet", row),
                },
                _ => println!("Usage: row <n> (1-based)"),
            },
            "show" => match arg.parse::<u64>() {
                Ok(id) => match engine.find_by_id(id) {
                    Some(repo) => output::print_details(&repo),
                    None => println!("Repository {} is not among the loaded results", id),
                },
                Err(_) => println!("Usage: show <id>"),
            },
            "clear" => {
                suggestions.clear_all_recent_entries().await?;
                println!("Search history cleared");
            }
            "help" => println!("{}", HELP),
            "quit" | "exit" => break,
            other => println!("Unknown command '{}'. Try 'help'.", other),
        }
    }

    Ok(())
}

/// Wait for a fetch (if one started) and print whatever it added
async fn show_new_rows(
    engine: &PaginationEngine,
    fetch: Option<JoinHandle<()>>,
    already_shown: usize,
) -> anyhow::Result<()> {
    match fetch {
        Some(fetch) => fetch.await?,
        None => {
            println!("Nothing to load right now");
            return Ok(());
        }
    }

    let state = engine.snapshot();
    if let Some(message) = output::failure_message(state.status()) {
        println!("{}", message);
        println!("Type 'retry' to try again");
        return Ok(());
    }

    let new_rows = state.items().get(already_shown..).unwrap_or_default();
    output::print_repositories(new_rows, already_shown);
    output::print_summary(&state);
    Ok(())
}
