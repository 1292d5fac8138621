use anyhow::Result;
use dotenvy::dotenv;
use moviedeck::catalog::MovieId;
use moviedeck::config::Config;
use moviedeck::detail::{DetailConfig, DetailController, DetailState};
use moviedeck::favorites::FavoritesLedger;
use moviedeck::images::ImageUrls;
use moviedeck::list::{ListConfig, ListController, ListState, Mode};
use moviedeck::tmdb::{MovieApi, TmdbClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CAST_WAIT: Duration = Duration::from_secs(3);
const RUNTIME_ROWS: usize = 10;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

const HELP: &str = "\
commands:
  <text>          search (empty line returns to popular)
  /more           load the next page
  /runtimes       backfill runtimes for the first rows
  /open <id>      show movie detail, trailer and cast
  /fav <id>       toggle favorite
  /favs           list loaded favorites
  /retry          reload the first page
  /help
  /quit";

#[tokio::main]
async fn main() -> Result<()> {
    match dotenv() {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    init_tracing();
    let config = Config::from_env()?;

    let api: Arc<dyn MovieApi> = Arc::new(TmdbClient::from_config(&config)?);
    let favorites = FavoritesLedger::open(&config.favorites_path)?;
    let images = ImageUrls::new(&config.image_base_url);
    let list = ListController::new(api.clone(), favorites.clone(), ListConfig::default());

    tokio::spawn(render_list(list.subscribe()));
    list.load_first_page().await;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let (cmd, arg) = match parse_line(&line) {
            Input::Search(text) => {
                list.set_search_text(text);
                continue;
            }
            Input::Command(cmd, arg) => (cmd, arg),
        };
        match cmd {
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "more" => {
                let last = list.snapshot().items.last().map(|i| i.id);
                match last {
                    Some(id) => list.load_more_if_needed(id).await,
                    None => println!("nothing loaded yet"),
                }
            }
            "runtimes" => {
                let ids: Vec<MovieId> = list
                    .snapshot()
                    .items
                    .iter()
                    .take(RUNTIME_ROWS)
                    .map(|i| i.id)
                    .collect();
                for id in ids {
                    list.load_runtime_if_needed(id).await;
                }
                print_rows(&list.snapshot());
            }
            "open" => match arg.parse::<MovieId>() {
                Ok(id) => open_detail(id, &api, &favorites, &images).await,
                Err(_) => println!("usage: /open <id>"),
            },
            "fav" => match arg.parse::<MovieId>() {
                Ok(id) => {
                    list.toggle_favorite(id);
                    let state = list.snapshot();
                    println!(
                        "{} {}",
                        id,
                        if state.is_favorite(id) { "added to favorites" } else { "removed from favorites" }
                    );
                }
                Err(_) => println!("usage: /fav <id>"),
            },
            "favs" => {
                let favs = list.favorite_items();
                if favs.is_empty() {
                    println!("No favorites yet. Use `/fav <id>` on any movie.");
                }
                for item in favs {
                    println!("{:>8}  {}", item.id, item.title);
                }
            }
            "retry" => list.retry().await,
            other => println!("unknown command /{other}, type /help"),
        }
    }

    info!("Bye");
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Input<'a> {
    Search(&'a str),
    Command(&'a str, &'a str),
}

fn parse_line(line: &str) -> Input<'_> {
    let Some(command) = line.trim().strip_prefix('/') else {
        return Input::Search(line);
    };
    match command.split_once(' ') {
        Some((cmd, arg)) => Input::Command(cmd, arg.trim()),
        None => Input::Command(command, ""),
    }
}

/// Redraws whenever the visible list changes.
async fn render_list(mut rx: watch::Receiver<ListState>) {
    let mut last: Option<(Mode, u32, usize, Option<String>)> = None;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.is_loading_initial() {
            continue;
        }
        let key = (
            state.mode.clone(),
            state.current_page,
            state.items.len(),
            state.last_error.as_ref().map(|e| e.to_string()),
        );
        if last.as_ref() == Some(&key) {
            continue;
        }
        last = Some(key);
        print_rows(&state);
    }
}

fn print_rows(state: &ListState) {
    match &state.mode {
        Mode::Browsing => println!("== Popular (page {}/{})", state.current_page, state.total_pages),
        Mode::Searching(q) => println!(
            "== Results for \"{}\" (page {}/{})",
            q, state.current_page, state.total_pages
        ),
    }
    if state.items.is_empty() {
        println!("   no movies");
    }
    for item in &state.items {
        let year = item.release_year().map(|y| format!(" ({y})")).unwrap_or_default();
        let rating = item
            .vote_average
            .map(|v| format!("  {v:.1}/10"))
            .unwrap_or_default();
        let runtime = state
            .runtime(item.id)
            .map(|m| format!("  {}h {:02}m", m / 60, m % 60))
            .unwrap_or_default();
        let heart = if state.is_favorite(item.id) { "  <3" } else { "" };
        println!("{:>8}  {}{year}{rating}{runtime}{heart}", item.id, item.title);
    }
    if let Some(err) = &state.last_error {
        println!("!! {} (type `/retry`)", err);
    }
}

async fn open_detail(id: MovieId, api: &Arc<dyn MovieApi>, favorites: &FavoritesLedger, images: &ImageUrls) {
    let detail = DetailController::new(id, api.clone(), favorites.clone(), DetailConfig::default());
    detail.load().await;
    let state = detail.snapshot();
    if let Some(err) = &state.last_error {
        println!("!! {} (type `/open {}` to retry)", err, id);
        return;
    }
    print_detail(&state, images);

    let mut rx = detail.subscribe();
    let cast = match tokio::time::timeout(CAST_WAIT, rx.wait_for(|s| s.cast.is_some())).await {
        Ok(Ok(state)) => state.cast.clone(),
        _ => None,
    };
    match cast {
        Some(cast) => {
            for member in cast.iter().take(10) {
                match &member.character {
                    Some(character) => println!("   {} as {}", member.name, character),
                    None => println!("   {}", member.name),
                }
            }
        }
        None => println!("   cast unavailable"),
    }
}

fn print_detail(state: &DetailState, images: &ImageUrls) {
    let Some(d) = &state.detail else { return };
    println!("== {}{}", d.title, if state.is_favorite { "  <3" } else { "" });
    if let Some(genres) = &d.genres {
        let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
        println!("   {}", names.join(", "));
    }
    if let Some(runtime) = d.runtime {
        println!("   {} min", runtime);
    }
    if let Some(overview) = &d.overview {
        println!("   {}", overview);
    }
    if let Some(poster) = images.poster(d.poster_path.as_deref()) {
        println!("   poster: {}", poster);
    }
    match state.trailer_url() {
        Some(url) => println!("   trailer: {}", url),
        None => println!("   no trailer"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_are_search_text() {
        assert_eq!(parse_line("Retry"), Input::Search("Retry"));
        assert_eq!(parse_line("more"), Input::Search("more"));
        assert_eq!(parse_line(""), Input::Search(""));
        assert_eq!(parse_line("  the matrix "), Input::Search("  the matrix "));
    }

    #[test]
    fn slash_lines_are_commands() {
        assert_eq!(parse_line("/more"), Input::Command("more", ""));
        assert_eq!(parse_line(" /open  603 "), Input::Command("open", "603"));
        assert_eq!(parse_line("/fav 42"), Input::Command("fav", "42"));
    }
}
