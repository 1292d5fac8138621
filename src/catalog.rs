use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub type MovieId = i64;

/// Site name of the provider whose videos can be played back.
pub const TRAILER_SITE: &str = "YouTube";
const TRAILER_CATEGORY: &str = "Trailer";
const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: MovieId,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
}

impl CatalogItem {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.year())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<CatalogItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub id: MovieId,
    pub title: String,
    pub overview: Option<String>,
    pub genres: Option<Vec<Genre>>,
    // minutes
    pub runtime: Option<u32>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    pub category: String,
}

impl VideoRef {
    pub fn is_trailer(&self) -> bool {
        self.site.eq_ignore_ascii_case(TRAILER_SITE)
            && self.category.eq_ignore_ascii_case(TRAILER_CATEGORY)
    }

    /// Playback URL, only for videos hosted by the known provider.
    pub fn watch_url(&self) -> Option<String> {
        if self.site.eq_ignore_ascii_case(TRAILER_SITE) && !self.key.is_empty() {
            Some(format!("{WATCH_BASE}{}", self.key))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastEntry {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

// Teasers, clips and featurettes never qualify, even as a fallback.
pub fn preferred_trailer(videos: &[VideoRef]) -> Option<&VideoRef> {
    videos.iter().find(|v| v.is_trailer())
}
