pub mod provider;
pub mod tmdb;

use chrono::NaiveDate;
use cronica_core::{Episode, ItemKey, MediaType};
use thiserror::Error;

pub use provider::CatalogProvider;
pub use tmdb::TmdbClient;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found")]
    NotFound,
}

/// Details of a movie or show as returned by the catalog.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    /// Movie release date. For shows, the next announced air date if any,
    /// otherwise the first air date.
    pub release_date: Option<NaiveDate>,
    pub genres: Vec<String>,
    pub number_of_seasons: Option<i32>,
    pub next_episode_to_air: Option<Episode>,
    pub last_episode_to_air: Option<Episode>,
}

impl CatalogItem {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.id, self.media_type)
    }
}

/// One hit from search or trending lists.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub biography: Option<String>,
    pub known_for_department: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub profile_url: Option<String>,
    pub credits: Vec<SearchResult>,
}
