//! In-process catalog for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use cronica_catalog::{CatalogError, CatalogItem, CatalogProvider, Person, SearchResult};
use cronica_core::{Episode, ItemKey, MediaType, Season};

#[derive(Default)]
pub struct FakeCatalog {
    items: HashMap<ItemKey, CatalogItem>,
    seasons: HashMap<(i64, i32), Season>,
    people: HashMap<i64, Person>,
    failing: HashSet<(i64, i32)>,
    latency: Option<Duration>,
    season_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: CatalogItem) -> Self {
        self.items.insert(item.key(), item);
        self
    }

    pub fn with_season(mut self, season: Season) -> Self {
        self.seasons
            .insert((season.show_id, season.season_number), season);
        self
    }

    pub fn with_person(mut self, person: Person) -> Self {
        self.people.insert(person.id, person);
        self
    }

    /// Make a season lookup fail with a network error.
    pub fn failing_season(mut self, show_id: i64, season_number: i32) -> Self {
        self.failing.insert((show_id, season_number));
        self
    }

    /// Delay every season lookup.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn season_calls(&self) -> usize {
        self.season_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for FakeCatalog {
    fn name(&self) -> &str {
        "fake"
    }

    async fn movie(&self, id: i64) -> Result<CatalogItem, CatalogError> {
        self.items
            .get(&ItemKey::movie(id))
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    async fn show(&self, id: i64) -> Result<CatalogItem, CatalogError> {
        self.items
            .get(&ItemKey::show(id))
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    async fn season(&self, show_id: i64, season_number: i32) -> Result<Season, CatalogError> {
        self.season_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.contains(&(show_id, season_number)) {
            return Err(CatalogError::Network("connection reset".into()));
        }
        self.seasons
            .get(&(show_id, season_number))
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    async fn search(&self, query: &str, _page: u32) -> Result<Vec<SearchResult>, CatalogError> {
        let needle = query.to_lowercase();
        let mut hits: Vec<SearchResult> = self
            .items
            .values()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .map(summary)
            .collect();
        hits.sort_by_key(|r| r.id);
        Ok(hits)
    }

    async fn trending(
        &self,
        media_type: Option<MediaType>,
    ) -> Result<Vec<SearchResult>, CatalogError> {
        let mut hits: Vec<SearchResult> = self
            .items
            .values()
            .filter(|item| media_type.is_none_or(|m| item.media_type == m))
            .map(summary)
            .collect();
        hits.sort_by_key(|r| r.id);
        Ok(hits)
    }

    async fn person(&self, id: i64) -> Result<Person, CatalogError> {
        self.people.get(&id).cloned().ok_or(CatalogError::NotFound)
    }
}

fn summary(item: &CatalogItem) -> SearchResult {
    SearchResult {
        id: item.id,
        media_type: item.media_type,
        title: item.title.clone(),
        overview: item.overview.clone(),
        poster_url: item.poster_url.clone(),
        release_date: item.release_date,
    }
}

pub fn episode(show_id: i64, season: i32, number: i32, air_date: Option<NaiveDate>) -> Episode {
    Episode {
        id: show_id * 10_000 + i64::from(season) * 100 + i64::from(number),
        show_id,
        season_number: season,
        episode_number: number,
        name: Some(format!("Episode {number}")),
        overview: None,
        air_date,
        still_url: None,
    }
}

/// A season of `count` episodes that all share `air_date`.
pub fn season(show_id: i64, number: i32, count: i32, air_date: Option<NaiveDate>) -> Season {
    Season {
        show_id,
        season_number: number,
        name: Some(format!("Season {number}")),
        episodes: (1..=count)
            .map(|n| episode(show_id, number, n, air_date))
            .collect(),
    }
}

pub fn show(id: i64, title: &str, release_date: Option<NaiveDate>) -> CatalogItem {
    CatalogItem {
        id,
        media_type: MediaType::TvShow,
        title: title.to_string(),
        overview: None,
        poster_url: Some(format!("https://image.tmdb.org/t/p/w500/{id}.jpg")),
        backdrop_url: None,
        release_date,
        genres: vec!["Drama".to_string()],
        number_of_seasons: None,
        next_episode_to_air: None,
        last_episode_to_air: None,
    }
}

pub fn movie(id: i64, title: &str, release_date: Option<NaiveDate>) -> CatalogItem {
    CatalogItem {
        media_type: MediaType::Movie,
        ..show(id, title, release_date)
    }
}
