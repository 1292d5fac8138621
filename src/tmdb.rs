use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::catalog::{CastEntry, CatalogItem, CatalogPage, Genre, ItemDetail, MovieId, VideoRef};
use crate::config::Config;
use crate::error::ApiError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Queries the controllers issue against the remote catalog.
#[async_trait]
pub trait MovieApi: Send + Sync {
    async fn fetch_popular(&self, page: u32) -> ApiResult<CatalogPage>;
    async fn fetch_detail(&self, id: MovieId) -> ApiResult<ItemDetail>;
    async fn fetch_videos(&self, id: MovieId) -> ApiResult<Vec<VideoRef>>;
    async fn fetch_credits(&self, id: MovieId) -> ApiResult<Vec<CastEntry>>;
    async fn search(&self, query: &str, page: u32) -> ApiResult<CatalogPage>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl TmdbClient {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let user_agent = format!("moviedeck/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.request_timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        })
    }

    fn endpoint(&self, path: &str, extra: &[(&str, String)]) -> ApiResult<Url> {
        let mut url = format!(
            "{}{path}?api_key={}&language={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.language)
        );
        for (name, value) in extra {
            url.push_str(&format!("&{name}={}", urlencoding::encode(value)));
        }
        Url::parse(&url).map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> ApiResult<T> {
        debug!("GET {}", url.path());
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }
        let text = res.text().await?;
        let parsed: T = serde_json::from_str(&text)?;
        Ok(parsed)
    }
}

#[async_trait]
impl MovieApi for TmdbClient {
    async fn fetch_popular(&self, page: u32) -> ApiResult<CatalogPage> {
        let url = self.endpoint("/movie/popular", &[("page", page.to_string())])?;
        let data: MoviePage = self.get_json(url).await?;
        Ok(data.into())
    }

    async fn fetch_detail(&self, id: MovieId) -> ApiResult<ItemDetail> {
        let url = self.endpoint(&format!("/movie/{id}"), &[])?;
        let data: MovieDetail = self.get_json(url).await?;
        Ok(data.into())
    }

    async fn fetch_videos(&self, id: MovieId) -> ApiResult<Vec<VideoRef>> {
        let url = self.endpoint(&format!("/movie/{id}/videos"), &[])?;
        let data: Videos = self.get_json(url).await?;
        Ok(data.results.into_iter().map(VideoRef::from).collect())
    }

    async fn fetch_credits(&self, id: MovieId) -> ApiResult<Vec<CastEntry>> {
        let url = self.endpoint(&format!("/movie/{id}/credits"), &[])?;
        let data: Credits = self.get_json(url).await?;
        Ok(data.cast.into_iter().map(CastEntry::from).collect())
    }

    async fn search(&self, query: &str, page: u32) -> ApiResult<CatalogPage> {
        let url = self.endpoint(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        )?;
        let data: MoviePage = self.get_json(url).await?;
        Ok(data.into())
    }
}

#[derive(Debug, Deserialize)]
struct Movie {
    id: MovieId,
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MoviePage {
    page: u32,
    #[serde(default)]
    results: Vec<Movie>,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct MovieDetail {
    id: MovieId,
    title: String,
    overview: Option<String>,
    genres: Option<Vec<Genre>>,
    runtime: Option<u32>,
    vote_average: Option<f64>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Videos {
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    key: String,
    name: String,
    site: String,
    #[serde(rename = "type")]
    video_type: String,
}

#[derive(Debug, Deserialize)]
struct Credits {
    cast: Vec<CastMember>,
}

#[derive(Debug, Deserialize)]
struct CastMember {
    id: i64,
    name: String,
    character: Option<String>,
    profile_path: Option<String>,
}

impl From<Movie> for CatalogItem {
    fn from(m: Movie) -> Self {
        CatalogItem {
            id: m.id,
            title: m.title,
            overview: m.overview,
            poster_path: m.poster_path,
            backdrop_path: m.backdrop_path,
            vote_average: m.vote_average,
            release_date: m.release_date,
        }
    }
}

impl From<MoviePage> for CatalogPage {
    fn from(p: MoviePage) -> Self {
        CatalogPage {
            page: p.page,
            total_pages: p.total_pages,
            results: p.results.into_iter().map(CatalogItem::from).collect(),
        }
    }
}

impl From<MovieDetail> for ItemDetail {
    fn from(d: MovieDetail) -> Self {
        ItemDetail {
            id: d.id,
            title: d.title,
            overview: d.overview,
            genres: d.genres,
            runtime: d.runtime,
            vote_average: d.vote_average,
            poster_path: d.poster_path,
            backdrop_path: d.backdrop_path,
        }
    }
}

impl From<Video> for VideoRef {
    fn from(v: Video) -> Self {
        VideoRef {
            id: v.id,
            key: v.key,
            name: v.name,
            site: v.site,
            category: v.video_type,
        }
    }
}

impl From<CastMember> for CastEntry {
    fn from(c: CastMember) -> Self {
        CastEntry {
            id: c.id,
            name: c.name,
            character: c.character,
            profile_path: c.profile_path,
        }
    }
}
