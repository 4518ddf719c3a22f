use std::collections::BTreeSet;

use chrono::NaiveDate;
use cronica_core::{EpisodeKey, ItemKey, MediaType, WatchlistItem};
use sqlx::SqlitePool;

use crate::{date_from_sql, date_to_sql};

/// Boolean status columns on `watchlist_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchFlag {
    Watched,
    Favorite,
    Pinned,
    Archived,
    Notify,
}

impl WatchFlag {
    pub fn column(self) -> &'static str {
        match self {
            Self::Watched => "watched",
            Self::Favorite => "favorite",
            Self::Pinned => "pinned",
            Self::Archived => "archived",
            Self::Notify => "notify",
        }
    }
}

impl std::fmt::Display for WatchFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone)]
pub struct WatchlistRow {
    pub key: ItemKey,
    pub title: String,
    pub image_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub watched: bool,
    pub favorite: bool,
    pub pinned: bool,
    pub archived: bool,
    pub notify: bool,
    pub up_next: Option<EpisodeKey>,
    pub last_watched: Option<EpisodeKey>,
    pub added_ts: i64,
    pub updated_ts: i64,
}

impl WatchlistRow {
    pub fn into_item(self, watched_episodes: BTreeSet<EpisodeKey>) -> WatchlistItem {
        WatchlistItem {
            key: self.key,
            title: self.title,
            image_url: self.image_url,
            release_date: self.release_date,
            watched: self.watched,
            favorite: self.favorite,
            pinned: self.pinned,
            archived: self.archived,
            notify: self.notify,
            watched_episodes,
            up_next: self.up_next,
            last_watched: self.last_watched,
            added_ts: self.added_ts,
            updated_ts: self.updated_ts,
        }
    }
}

type ItemTuple = (
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    bool,
    bool,
    bool,
    bool,
    bool,
    Option<i32>,
    Option<i32>,
    Option<i32>,
    Option<i32>,
    i64,
    i64,
);

const SELECT_COLUMNS: &str = "SELECT catalog_id, media_type, title, image_url, release_date, \
     watched, favorite, pinned, archived, notify, up_next_season, up_next_episode, \
     last_watched_season, last_watched_episode, added_ts, updated_ts FROM watchlist_item";

/// Insert a new item. When the key is already tracked only the catalog fields
/// (title, image, release date) are refreshed and the flags are left alone.
///
/// Returns `true` when a new row was inserted.
pub async fn save(pool: &SqlitePool, item: &WatchlistItem) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now().timestamp();
    let release = item.release_date.map(date_to_sql);

    let result = sqlx::query(
        "INSERT INTO watchlist_item (catalog_id, media_type, title, image_url, release_date, \
         watched, favorite, pinned, archived, notify, up_next_season, up_next_episode, \
         last_watched_season, last_watched_episode, added_ts, updated_ts) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(catalog_id, media_type) DO NOTHING",
    )
    .bind(item.key.catalog_id)
    .bind(item.key.media_type.as_int())
    .bind(&item.title)
    .bind(&item.image_url)
    .bind(&release)
    .bind(item.watched)
    .bind(item.favorite)
    .bind(item.pinned)
    .bind(item.archived)
    .bind(item.notify)
    .bind(item.up_next.map(|e| e.season))
    .bind(item.up_next.map(|e| e.episode))
    .bind(item.last_watched.map(|e| e.season))
    .bind(item.last_watched.map(|e| e.episode))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    let inserted = result.rows_affected() > 0;

    if !inserted {
        update_catalog_fields(
            pool,
            item.key,
            &item.title,
            item.image_url.as_deref(),
            item.release_date,
        )
        .await?;
    }

    Ok(inserted)
}

/// Refresh the catalog-derived columns of an existing item.
pub async fn update_catalog_fields(
    pool: &SqlitePool,
    key: ItemKey,
    title: &str,
    image_url: Option<&str>,
    release_date: Option<NaiveDate>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE watchlist_item SET title = ?, image_url = COALESCE(?, image_url), \
         release_date = ?, updated_ts = ? WHERE catalog_id = ? AND media_type = ?",
    )
    .bind(title)
    .bind(image_url)
    .bind(release_date.map(date_to_sql))
    .bind(chrono::Utc::now().timestamp())
    .bind(key.catalog_id)
    .bind(key.media_type.as_int())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get(pool: &SqlitePool, key: ItemKey) -> Result<Option<WatchlistRow>, sqlx::Error> {
    let row: Option<ItemTuple> =
        sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE catalog_id = ? AND media_type = ?"))
            .bind(key.catalog_id)
            .bind(key.media_type.as_int())
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(row_to_item))
}

/// All tracked items, pinned first, then most recently updated.
pub async fn list(pool: &SqlitePool) -> Result<Vec<WatchlistRow>, sqlx::Error> {
    let rows: Vec<ItemTuple> = sqlx::query_as(&format!(
        "{SELECT_COLUMNS} ORDER BY pinned DESC, updated_ts DESC, title"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(row_to_item).collect())
}

/// Shows that currently point at an up-next episode.
pub async fn list_up_next(pool: &SqlitePool) -> Result<Vec<WatchlistRow>, sqlx::Error> {
    let rows: Vec<ItemTuple> = sqlx::query_as(&format!(
        "{SELECT_COLUMNS} WHERE media_type = ? AND up_next_season IS NOT NULL \
         AND up_next_episode IS NOT NULL AND archived = 0 AND watched = 0 \
         ORDER BY updated_ts DESC"
    ))
    .bind(MediaType::TvShow.as_int())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(row_to_item).collect())
}

/// Items with notifications enabled and a release date after `today`.
pub async fn list_notify_upcoming(
    pool: &SqlitePool,
    today: NaiveDate,
) -> Result<Vec<WatchlistRow>, sqlx::Error> {
    let rows: Vec<ItemTuple> = sqlx::query_as(&format!(
        "{SELECT_COLUMNS} WHERE notify = 1 AND release_date IS NOT NULL AND release_date > ? \
         ORDER BY release_date"
    ))
    .bind(date_to_sql(today))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(row_to_item).collect())
}

pub async fn exists(pool: &SqlitePool, key: ItemKey) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM watchlist_item WHERE catalog_id = ? AND media_type = ?")
            .bind(key.catalog_id)
            .bind(key.media_type.as_int())
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Read a single flag. `None` when the item is not tracked.
pub async fn flag(
    pool: &SqlitePool,
    key: ItemKey,
    flag: WatchFlag,
) -> Result<Option<bool>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM watchlist_item WHERE catalog_id = ? AND media_type = ?",
        flag.column()
    );
    let row: Option<(bool,)> = sqlx::query_as(&query)
        .bind(key.catalog_id)
        .bind(key.media_type.as_int())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v))
}

/// Flip a flag in one statement and return its new value.
pub async fn toggle_flag(
    pool: &SqlitePool,
    key: ItemKey,
    flag: WatchFlag,
) -> Result<Option<bool>, sqlx::Error> {
    let col = flag.column();
    let query = format!(
        "UPDATE watchlist_item SET {col} = NOT {col}, updated_ts = ? \
         WHERE catalog_id = ? AND media_type = ? RETURNING {col}"
    );
    let row: Option<(bool,)> = sqlx::query_as(&query)
        .bind(chrono::Utc::now().timestamp())
        .bind(key.catalog_id)
        .bind(key.media_type.as_int())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v))
}

#[cfg(test)]
pub(crate) async fn set_flag(
    pool: &SqlitePool,
    key: ItemKey,
    flag: WatchFlag,
    value: bool,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "UPDATE watchlist_item SET {} = ?, updated_ts = ? WHERE catalog_id = ? AND media_type = ?",
        flag.column()
    );
    let result = sqlx::query(&query)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .bind(key.catalog_id)
        .bind(key.media_type.as_int())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_up_next(
    pool: &SqlitePool,
    key: ItemKey,
    episode: Option<EpisodeKey>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE watchlist_item SET up_next_season = ?, up_next_episode = ?, updated_ts = ? \
         WHERE catalog_id = ? AND media_type = ?",
    )
    .bind(episode.map(|e| e.season))
    .bind(episode.map(|e| e.episode))
    .bind(chrono::Utc::now().timestamp())
    .bind(key.catalog_id)
    .bind(key.media_type.as_int())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_last_watched(
    pool: &SqlitePool,
    key: ItemKey,
    episode: Option<EpisodeKey>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE watchlist_item SET last_watched_season = ?, last_watched_episode = ?, \
         updated_ts = ? WHERE catalog_id = ? AND media_type = ?",
    )
    .bind(episode.map(|e| e.season))
    .bind(episode.map(|e| e.episode))
    .bind(chrono::Utc::now().timestamp())
    .bind(key.catalog_id)
    .bind(key.media_type.as_int())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete an item. Watched episodes go with it (FK cascade).
pub async fn delete(pool: &SqlitePool, key: ItemKey) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist_item WHERE catalog_id = ? AND media_type = ?")
        .bind(key.catalog_id)
        .bind(key.media_type.as_int())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM watchlist_item")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

fn row_to_item(r: ItemTuple) -> Option<WatchlistRow> {
    let Some(media_type) = MediaType::from_int(r.1) else {
        tracing::warn!(catalog_id = r.0, media_type = r.1, "skipping row with unknown media type");
        return None;
    };

    Some(WatchlistRow {
        key: ItemKey::new(r.0, media_type),
        title: r.2,
        image_url: r.3,
        release_date: r.4.as_deref().and_then(date_from_sql),
        watched: r.5,
        favorite: r.6,
        pinned: r.7,
        archived: r.8,
        notify: r.9,
        up_next: episode_pair(r.10, r.11),
        last_watched: episode_pair(r.12, r.13),
        added_ts: r.14,
        updated_ts: r.15,
    })
}

fn episode_pair(season: Option<i32>, episode: Option<i32>) -> Option<EpisodeKey> {
    Some(EpisodeKey::new(season?, episode?))
}
