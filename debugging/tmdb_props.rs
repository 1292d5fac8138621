//! Fetch catalog data through the client and print it as JSON.
//! Usage:
//!   cargo run --bin tmdb_props -- movie <tmdb_id>
//!   cargo run --bin tmdb_props -- popular [page]
//!   cargo run --bin tmdb_props -- search <query> [page]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use moviedeck::catalog::{preferred_trailer, MovieId};
use moviedeck::config::Config;
use moviedeck::images::ImageUrls;
use moviedeck::tmdb::{MovieApi, TmdbClient};
use serde_json::json;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Query {
    Movie,
    Popular,
    Search,
}

impl FromStr for Query {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(Query::Movie),
            "popular" => Ok(Query::Popular),
            "search" => Ok(Query::Search),
            _ => Err(anyhow::anyhow!("query must be 'movie', 'popular' or 'search'")),
        }
    }
}

fn parse_page(arg: Option<&String>) -> Result<u32> {
    match arg {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("page must be a number, got '{}'", raw)),
        None => Ok(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    let args: Vec<String> = env::args().skip(1).collect();
    let query: Query = args
        .first()
        .context("missing query kind (movie|popular|search)")?
        .parse()?;

    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;
    let images = ImageUrls::new(&config.image_base_url);

    let output = match query {
        Query::Movie => {
            let id: MovieId = args
                .get(1)
                .context("missing tmdb id")?
                .parse()
                .context("tmdb id must be a number")?;
            let (detail, videos, credits) = tokio::join!(
                client.fetch_detail(id),
                client.fetch_videos(id),
                client.fetch_credits(id),
            );
            let detail = detail?;
            let videos = videos?;
            let trailer = preferred_trailer(&videos).and_then(|v| v.watch_url());
            json!({
                "detail": detail,
                "poster": images.poster(detail.poster_path.as_deref()),
                "backdrop": images.backdrop(detail.backdrop_path.as_deref()),
                "videos": videos,
                "trailer": trailer,
                "cast": credits.map_err(|e| e.to_string()),
            })
        }
        Query::Popular => {
            let page = client.fetch_popular(parse_page(args.get(1))?).await?;
            json!(page)
        }
        Query::Search => {
            let text = args.get(1).context("missing search text")?;
            let page = client.search(text, parse_page(args.get(2))?).await?;
            json!(page)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
