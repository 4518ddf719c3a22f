use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of catalog title. Persisted as an integer in `watchlist_item.media_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    #[serde(rename = "tv")]
    TvShow,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvShow => "tv",
        }
    }

    pub fn as_int(self) -> i64 {
        match self {
            Self::Movie => 0,
            Self::TvShow => 1,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Movie),
            1 => Some(Self::TvShow),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    #[error("unknown media type: {0}")]
    MediaType(String),
    #[error("malformed item key: {0}")]
    ItemKey(String),
}

impl FromStr for MediaType {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" | "movies" => Ok(Self::Movie),
            "tv" | "tv_show" | "show" | "shows" => Ok(Self::TvShow),
            other => Err(ParseKeyError::MediaType(other.to_string())),
        }
    }
}

/// Composite identity of a tracked title: catalog id plus media type.
///
/// The display form `"{catalog_id}@{media_type_int}"` doubles as the
/// notification identifier for the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub catalog_id: i64,
    pub media_type: MediaType,
}

impl ItemKey {
    pub fn new(catalog_id: i64, media_type: MediaType) -> Self {
        Self {
            catalog_id,
            media_type,
        }
    }

    pub fn movie(catalog_id: i64) -> Self {
        Self::new(catalog_id, MediaType::Movie)
    }

    pub fn show(catalog_id: i64) -> Self {
        Self::new(catalog_id, MediaType::TvShow)
    }

    pub fn notification_id(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.catalog_id, self.media_type.as_int())
    }
}

impl FromStr for ItemKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseKeyError::ItemKey(s.to_string());
        let (id, kind) = s.split_once('@').ok_or_else(malformed)?;
        let catalog_id = id.parse().map_err(|_| malformed())?;
        let media_type = kind
            .parse::<i64>()
            .ok()
            .and_then(MediaType::from_int)
            .ok_or_else(malformed)?;
        Ok(Self::new(catalog_id, media_type))
    }
}

/// Position of an episode within a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub season: i32,
    pub episode: i32,
}

impl EpisodeKey {
    pub fn new(season: i32, episode: i32) -> Self {
        Self { season, episode }
    }
}

impl std::fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// A tracked movie or show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub key: ItemKey,
    pub title: String,
    pub image_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub watched: bool,
    pub favorite: bool,
    pub pinned: bool,
    pub archived: bool,
    pub notify: bool,
    pub watched_episodes: BTreeSet<EpisodeKey>,
    pub up_next: Option<EpisodeKey>,
    pub last_watched: Option<EpisodeKey>,
    pub added_ts: i64,
    pub updated_ts: i64,
}

impl WatchlistItem {
    /// A fresh, unflagged record. Notifications are on by default.
    pub fn new(key: ItemKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            image_url: None,
            release_date: None,
            watched: false,
            favorite: false,
            pinned: false,
            archived: false,
            notify: true,
            watched_episodes: BTreeSet::new(),
            up_next: None,
            last_watched: None,
            added_ts: 0,
            updated_ts: 0,
        }
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.release_date.is_some_and(|d| d > today)
    }
}

/// Catalog snapshot of a single episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub show_id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<NaiveDate>,
    pub still_url: Option<String>,
}

impl Episode {
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey::new(self.season_number, self.episode_number)
    }

    /// True when the episode has an air date on or before `today`.
    pub fn has_aired(&self, today: NaiveDate) -> bool {
        self.air_date.is_some_and(|d| d <= today)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub show_id: i64,
    pub season_number: i32,
    pub name: Option<String>,
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn episode(&self, episode_number: i32) -> Option<&Episode> {
        self.episodes
            .iter()
            .find(|e| e.episode_number == episode_number)
    }
}

/// Predefined watchlist views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmartFilter {
    #[default]
    All,
    Watching,
    Watched,
    Unwatched,
    Favorites,
    Pinned,
    Archived,
    Upcoming,
    Released,
}

impl SmartFilter {
    pub fn matches(self, item: &WatchlistItem, today: NaiveDate) -> bool {
        match self {
            Self::All => true,
            Self::Watching => {
                item.key.media_type == MediaType::TvShow
                    && !item.watched_episodes.is_empty()
                    && !item.watched
                    && !item.archived
            }
            Self::Watched => item.watched,
            Self::Unwatched => !item.watched,
            Self::Favorites => item.favorite,
            Self::Pinned => item.pinned,
            Self::Archived => item.archived,
            Self::Upcoming => item.is_upcoming(today),
            Self::Released => item.release_date.is_some_and(|d| d <= today),
        }
    }
}
