use cronica_core::{EpisodeKey, ItemKey};
use sqlx::SqlitePool;

/// Record an episode as watched. Returns `false` if it already was.
pub async fn mark_watched(
    pool: &SqlitePool,
    show: ItemKey,
    episode: EpisodeKey,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO watched_episode \
         (catalog_id, media_type, season_number, episode_number, watched_ts) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(show.catalog_id)
    .bind(show.media_type.as_int())
    .bind(episode.season)
    .bind(episode.episode)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Record several episodes in one transaction.
pub async fn mark_many_watched(
    pool: &SqlitePool,
    show: ItemKey,
    episodes: &[EpisodeKey],
) -> Result<u64, sqlx::Error> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;
    let mut added = 0;
    for episode in episodes {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO watched_episode \
             (catalog_id, media_type, season_number, episode_number, watched_ts) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(show.catalog_id)
        .bind(show.media_type.as_int())
        .bind(episode.season)
        .bind(episode.episode)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        added += result.rows_affected();
    }
    tx.commit().await?;
    Ok(added)
}

pub async fn unmark_watched(
    pool: &SqlitePool,
    show: ItemKey,
    episode: EpisodeKey,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM watched_episode WHERE catalog_id = ? AND media_type = ? \
         AND season_number = ? AND episode_number = ?",
    )
    .bind(show.catalog_id)
    .bind(show.media_type.as_int())
    .bind(episode.season)
    .bind(episode.episode)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_watched(
    pool: &SqlitePool,
    show: ItemKey,
    episode: EpisodeKey,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM watched_episode WHERE catalog_id = ? AND media_type = ? \
         AND season_number = ? AND episode_number = ?",
    )
    .bind(show.catalog_id)
    .bind(show.media_type.as_int())
    .bind(episode.season)
    .bind(episode.episode)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Watched episodes of a show in season/episode order.
pub async fn list_watched(pool: &SqlitePool, show: ItemKey) -> Result<Vec<EpisodeKey>, sqlx::Error> {
    let rows: Vec<(i32, i32)> = sqlx::query_as(
        "SELECT season_number, episode_number FROM watched_episode \
         WHERE catalog_id = ? AND media_type = ? \
         ORDER BY season_number, episode_number",
    )
    .bind(show.catalog_id)
    .bind(show.media_type.as_int())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(season, episode)| EpisodeKey::new(season, episode))
        .collect())
}
