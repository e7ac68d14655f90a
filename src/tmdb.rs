use std::collections::HashMap;

use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    error::AppResult,
    models::{Genre, Movie, MovieDetails, Paged, TimeWindow},
};

pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

/// TMDB stops serving listing pages past this one.
pub const MAX_PAGES: u32 = 500;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PosterSize {
    Small,
    Medium,
    Large,
    Original,
}

impl PosterSize {
    fn as_str(self) -> &'static str {
        match self {
            PosterSize::Small => "w185",
            PosterSize::Medium => "w342",
            PosterSize::Large => "w500",
            PosterSize::Original => "original",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackdropSize {
    Small,
    Medium,
    Large,
    Original,
}

impl BackdropSize {
    fn as_str(self) -> &'static str {
        match self {
            BackdropSize::Small => "w300",
            BackdropSize::Medium => "w780",
            BackdropSize::Large => "w1280",
            BackdropSize::Original => "original",
        }
    }
}

pub fn poster_url(path: Option<&str>, size: PosterSize) -> Option<String> {
    image_url(path, size.as_str())
}

pub fn backdrop_url(path: Option<&str>, size: BackdropSize) -> Option<String> {
    image_url(path, size.as_str())
}

fn image_url(path: Option<&str>, size: &str) -> Option<String> {
    path.filter(|p| !p.is_empty()).map(|p| format!("{IMAGE_BASE_URL}/{size}{p}"))
}

/// Every call the metadata provider is asked for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetadataRequest<'a> {
    Popular { page: u32 },
    Trending { window: TimeWindow, page: u32 },
    Search { query: &'a str, page: u32 },
    DiscoverByGenre { genre_id: i64, page: u32 },
    DiscoverByYear { year: i16, page: u32 },
    TopRated { page: u32 },
    Details { movie_id: i64 },
    Similar { movie_id: i64 },
    Recommendations { movie_id: i64 },
    GenreList,
    WatchProviders { movie_id: i64 },
}

impl MetadataRequest<'_> {
    pub fn path(&self) -> String {
        match self {
            MetadataRequest::Popular { .. } => "/movie/popular".to_string(),
            MetadataRequest::Trending { window, .. } => {
                format!("/trending/movie/{}", window.as_str())
            },
            MetadataRequest::Search { .. } => "/search/movie".to_string(),
            MetadataRequest::DiscoverByGenre { .. } | MetadataRequest::DiscoverByYear { .. } => {
                "/discover/movie".to_string()
            },
            MetadataRequest::TopRated { .. } => "/movie/top_rated".to_string(),
            MetadataRequest::Details { movie_id } => format!("/movie/{movie_id}"),
            MetadataRequest::Similar { movie_id } => format!("/movie/{movie_id}/similar"),
            MetadataRequest::Recommendations { movie_id } => {
                format!("/movie/{movie_id}/recommendations")
            },
            MetadataRequest::GenreList => "/genre/movie/list".to_string(),
            MetadataRequest::WatchProviders { movie_id } => {
                format!("/movie/{movie_id}/watch/providers")
            },
        }
    }

    /// Request-specific query parameters; the key and locale are added by the client.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let page = |p: &u32| ("page", p.max(&1).to_string());
        match self {
            MetadataRequest::Popular { page: p }
            | MetadataRequest::Trending { page: p, .. }
            | MetadataRequest::TopRated { page: p } => vec![page(p)],
            MetadataRequest::Search { query, page: p } => {
                vec![("query", query.to_string()), page(p)]
            },
            MetadataRequest::DiscoverByGenre { genre_id, page: p } => {
                vec![("with_genres", genre_id.to_string()), page(p)]
            },
            MetadataRequest::DiscoverByYear { year, page: p } => {
                vec![("primary_release_year", year.to_string()), page(p)]
            },
            MetadataRequest::Details { .. } => {
                vec![("append_to_response", "credits,videos".to_string())]
            },
            MetadataRequest::Similar { .. }
            | MetadataRequest::Recommendations { .. }
            | MetadataRequest::GenreList
            | MetadataRequest::WatchProviders { .. } => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ProviderEntry {
    pub provider_id: i64,
    pub provider_name: String,
    pub logo_path: Option<String>,
    #[serde(default)]
    pub display_priority: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RegionProviders {
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<ProviderEntry>,
    #[serde(default)]
    pub rent: Vec<ProviderEntry>,
    #[serde(default)]
    pub buy: Vec<ProviderEntry>,
}

/// Watch providers keyed by ISO 3166-1 region code.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ProviderRegions {
    #[serde(default)]
    pub results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    async fn popular(&self, page: u32) -> AppResult<Paged<Movie>>;
    async fn trending(&self, window: TimeWindow, page: u32) -> AppResult<Paged<Movie>>;
    async fn search(&self, query: &str, page: u32) -> AppResult<Paged<Movie>>;
    async fn discover_by_genre(&self, genre_id: i64, page: u32) -> AppResult<Paged<Movie>>;
    async fn discover_by_year(&self, year: i16, page: u32) -> AppResult<Paged<Movie>>;
    async fn top_rated(&self, page: u32) -> AppResult<Paged<Movie>>;
    async fn movie_details(&self, movie_id: i64) -> AppResult<MovieDetails>;
    async fn similar(&self, movie_id: i64) -> AppResult<Paged<Movie>>;
    async fn recommendations(&self, movie_id: i64) -> AppResult<Paged<Movie>>;
    async fn genres(&self) -> AppResult<Vec<Genre>>;
    async fn watch_providers(&self, movie_id: i64) -> AppResult<ProviderRegions>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, language: String) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no TMDB_API_KEY provided; every metadata call will fail");
        }
        Self { client, api_key, base_url, language }
    }

    pub fn url_for(&self, request: &MetadataRequest<'_>) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), request.path())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: MetadataRequest<'_>) -> AppResult<T> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("TMDB API key is not configured").into());
        }

        let url = self.url_for(&request);
        debug!(path = %request.path(), "tmdb request");

        let resp = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(&request.params())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl MetadataSource for TmdbClient {
    async fn popular(&self, page: u32) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::Popular { page }).await
    }

    async fn trending(&self, window: TimeWindow, page: u32) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::Trending { window, page }).await
    }

    async fn search(&self, query: &str, page: u32) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::Search { query, page }).await
    }

    async fn discover_by_genre(&self, genre_id: i64, page: u32) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::DiscoverByGenre { genre_id, page }).await
    }

    async fn discover_by_year(&self, year: i16, page: u32) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::DiscoverByYear { year, page }).await
    }

    async fn top_rated(&self, page: u32) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::TopRated { page }).await
    }

    async fn movie_details(&self, movie_id: i64) -> AppResult<MovieDetails> {
        self.fetch(MetadataRequest::Details { movie_id }).await
    }

    async fn similar(&self, movie_id: i64) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::Similar { movie_id }).await
    }

    async fn recommendations(&self, movie_id: i64) -> AppResult<Paged<Movie>> {
        self.fetch(MetadataRequest::Recommendations { movie_id }).await
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        let resp: GenreListResponse = self.fetch(MetadataRequest::GenreList).await?;
        Ok(resp.genres)
    }

    async fn watch_providers(&self, movie_id: i64) -> AppResult<ProviderRegions> {
        self.fetch(MetadataRequest::WatchProviders { movie_id }).await
    }
}
