use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FAVORITES_PATH: &str = "favorites.json";

/// Runtime settings for the binaries, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub image_base_url: String,
    pub language: String,
    pub request_timeout: Duration,
    pub favorites_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .context("TMDB_API_KEY not set")?;
        let timeout_secs = match env::var("TMDB_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("TMDB_TIMEOUT_SECS is not a number: '{}'", raw))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            api_key,
            base_url: var_or("TMDB_BASE_URL", DEFAULT_BASE_URL),
            image_base_url: var_or("TMDB_IMAGE_BASE_URL", DEFAULT_IMAGE_BASE_URL),
            language: var_or("TMDB_LANGUAGE", DEFAULT_LANGUAGE),
            request_timeout: Duration::from_secs(timeout_secs),
            favorites_path: PathBuf::from(var_or("MOVIEDECK_FAVORITES", DEFAULT_FAVORITES_PATH)),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
