#![allow(dead_code)]

use moviedeck::catalog::{CastEntry, CatalogItem, CatalogPage, ItemDetail, MovieId, VideoRef};
use moviedeck::error::ApiError;
use moviedeck::tmdb::{ApiResult, MovieApi};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Popular(u32),
    Search(String, u32),
    Detail(MovieId),
    Videos(MovieId),
    Credits(MovieId),
}

/// Scripted catalog double; every call is recorded with the (virtual) time it
/// was issued.
#[derive(Default)]
pub struct FakeCatalog {
    pub popular: Mutex<HashMap<u32, ApiResult<CatalogPage>>>,
    pub searches: Mutex<HashMap<(String, u32), ApiResult<CatalogPage>>>,
    pub details: Mutex<HashMap<MovieId, ApiResult<ItemDetail>>>,
    pub videos: Mutex<HashMap<MovieId, ApiResult<Vec<VideoRef>>>>,
    pub credits: Mutex<HashMap<MovieId, Vec<CastEntry>>>,
    /// Number of credit calls that fail before one succeeds.
    pub credit_failures: Mutex<usize>,
    pub latency: Mutex<HashMap<String, Duration>>,
    pub calls: Mutex<Vec<(Call, Instant)>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_popular(self, page: CatalogPage) -> Self {
        self.popular.lock().unwrap().insert(page.page, Ok(page));
        self
    }

    pub fn with_popular_error(self, page: u32, err: ApiError) -> Self {
        self.popular.lock().unwrap().insert(page, Err(err));
        self
    }

    pub fn with_search(self, query: &str, page: CatalogPage) -> Self {
        self.searches
            .lock()
            .unwrap()
            .insert((query.to_string(), page.page), Ok(page));
        self
    }

    pub fn with_detail(self, detail: ItemDetail) -> Self {
        self.details.lock().unwrap().insert(detail.id, Ok(detail));
        self
    }

    pub fn with_detail_error(self, id: MovieId, err: ApiError) -> Self {
        self.details.lock().unwrap().insert(id, Err(err));
        self
    }

    pub fn with_videos(self, id: MovieId, videos: Vec<VideoRef>) -> Self {
        self.videos.lock().unwrap().insert(id, Ok(videos));
        self
    }

    pub fn with_videos_error(self, id: MovieId, err: ApiError) -> Self {
        self.videos.lock().unwrap().insert(id, Err(err));
        self
    }

    pub fn with_credits(self, id: MovieId, cast: Vec<CastEntry>) -> Self {
        self.credits.lock().unwrap().insert(id, cast);
        self
    }

    pub fn with_credit_failures(self, n: usize) -> Self {
        *self.credit_failures.lock().unwrap() = n;
        self
    }

    /// Latency for a call kind: "popular", "detail", "videos", "credits", or
    /// a search query string.
    pub fn with_latency(self, key: &str, latency: Duration) -> Self {
        self.latency
            .lock()
            .unwrap()
            .insert(key.to_string(), latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn call_times(&self, pred: impl Fn(&Call) -> bool) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| pred(c))
            .map(|(_, t)| *t)
            .collect()
    }

    async fn record(&self, call: Call, key: &str) {
        self.calls.lock().unwrap().push((call, Instant::now()));
        let latency = self.latency.lock().unwrap().get(key).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn not_found() -> ApiError {
    ApiError::HttpStatus(404)
}

#[async_trait::async_trait]
impl MovieApi for FakeCatalog {
    async fn fetch_popular(&self, page: u32) -> ApiResult<CatalogPage> {
        self.record(Call::Popular(page), "popular").await;
        self.popular
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_else(|| Err(not_found()))
    }

    async fn fetch_detail(&self, id: MovieId) -> ApiResult<ItemDetail> {
        self.record(Call::Detail(id), "detail").await;
        self.details
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Err(not_found()))
    }

    async fn fetch_videos(&self, id: MovieId) -> ApiResult<Vec<VideoRef>> {
        self.record(Call::Videos(id), "videos").await;
        self.videos
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_credits(&self, id: MovieId) -> ApiResult<Vec<CastEntry>> {
        self.record(Call::Credits(id), "credits").await;
        {
            let mut failures = self.credit_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ApiError::Transport("connection reset".to_string()));
            }
        }
        Ok(self
            .credits
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn search(&self, query: &str, page: u32) -> ApiResult<CatalogPage> {
        self.record(Call::Search(query.to_string(), page), query).await;
        self.searches
            .lock()
            .unwrap()
            .get(&(query.to_string(), page))
            .cloned()
            .unwrap_or_else(|| {
                Ok(CatalogPage {
                    page,
                    total_pages: 0,
                    results: Vec::new(),
                })
            })
    }
}

pub fn item(id: MovieId) -> CatalogItem {
    CatalogItem {
        id,
        title: format!("Movie {id}"),
        overview: Some("Overview".to_string()),
        poster_path: None,
        backdrop_path: None,
        vote_average: Some(7.0),
        release_date: Some("2024-01-01".to_string()),
    }
}

pub fn page(page: u32, total_pages: u32, ids: &[MovieId]) -> CatalogPage {
    CatalogPage {
        page,
        total_pages,
        results: ids.iter().copied().map(item).collect(),
    }
}

pub fn detail(id: MovieId, runtime: Option<u32>) -> ItemDetail {
    ItemDetail {
        id,
        title: format!("Movie {id}"),
        overview: None,
        genres: None,
        runtime,
        vote_average: None,
        poster_path: None,
        backdrop_path: None,
    }
}

pub fn video(site: &str, category: &str, key: &str) -> VideoRef {
    VideoRef {
        id: format!("v-{key}"),
        key: key.to_string(),
        name: format!("{category} {key}"),
        site: site.to_string(),
        category: category.to_string(),
    }
}

pub fn cast(id: i64, name: &str) -> CastEntry {
    CastEntry {
        id,
        name: name.to_string(),
        character: None,
        profile_path: None,
    }
}
