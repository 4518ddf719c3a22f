use chrono::NaiveDate;
use cronica_core::{ItemKey, MediaType};
use sqlx::SqlitePool;

use crate::{date_from_sql, date_to_sql};

/// A pending local reminder, keyed by the item's notification identifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NotificationRow {
    pub identifier: String,
    pub key: ItemKey,
    pub title: String,
    pub fire_date: NaiveDate,
    pub created_ts: i64,
}

type NotificationTuple = (String, i64, i64, String, String, i64);

/// Insert or replace the pending notification for an item.
pub async fn upsert(
    pool: &SqlitePool,
    key: ItemKey,
    title: &str,
    fire_date: NaiveDate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scheduled_notification \
         (identifier, catalog_id, media_type, title, fire_date, created_ts) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(identifier) DO UPDATE SET \
         title = excluded.title, fire_date = excluded.fire_date",
    )
    .bind(key.notification_id())
    .bind(key.catalog_id)
    .bind(key.media_type.as_int())
    .bind(title)
    .bind(date_to_sql(fire_date))
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(
    pool: &SqlitePool,
    identifier: &str,
) -> Result<Option<NotificationRow>, sqlx::Error> {
    let row: Option<NotificationTuple> = sqlx::query_as(
        "SELECT identifier, catalog_id, media_type, title, fire_date, created_ts \
         FROM scheduled_notification WHERE identifier = ?",
    )
    .bind(identifier)
    .fetch_optional(pool)
    .await?;
    Ok(row.and_then(row_to_notification))
}

/// All pending notifications, soonest first.
pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<NotificationRow>, sqlx::Error> {
    let rows: Vec<NotificationTuple> = sqlx::query_as(
        "SELECT identifier, catalog_id, media_type, title, fire_date, created_ts \
         FROM scheduled_notification ORDER BY fire_date, identifier",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(row_to_notification).collect())
}

/// Notifications whose fire date is on or before `today`.
pub async fn list_due(
    pool: &SqlitePool,
    today: NaiveDate,
) -> Result<Vec<NotificationRow>, sqlx::Error> {
    let rows: Vec<NotificationTuple> = sqlx::query_as(
        "SELECT identifier, catalog_id, media_type, title, fire_date, created_ts \
         FROM scheduled_notification WHERE fire_date <= ? ORDER BY fire_date, identifier",
    )
    .bind(date_to_sql(today))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(row_to_notification).collect())
}

pub async fn delete(pool: &SqlitePool, identifier: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM scheduled_notification WHERE identifier = ?")
        .bind(identifier)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn row_to_notification(r: NotificationTuple) -> Option<NotificationRow> {
    let media_type = MediaType::from_int(r.2)?;
    let fire_date = date_from_sql(&r.4)?;
    Some(NotificationRow {
        identifier: r.0,
        key: ItemKey::new(r.1, media_type),
        title: r.3,
        fire_date,
        created_ts: r.5,
    })
}
