//! Watchlist store: the persistent record of tracked titles.
//!
//! Every operation is best-effort. Persistence errors are reported to the
//! telemetry sink and surface as `None`, `false`, or an empty list. Mutations
//! publish a [`WatchlistEvent`] on success.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use cronica_core::{EpisodeKey, ItemKey, SmartFilter, WatchlistItem};
use cronica_db::repo::watchlist::{self, WatchFlag, WatchlistRow};
use cronica_db::repo::episodes;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::WatchlistEvent;
use crate::telemetry::best_effort;

const EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct WatchlistStore {
    pool: SqlitePool,
    events: broadcast::Sender<WatchlistEvent>,
}

impl WatchlistStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { pool, events }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Receive change notifications for every successful mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchlistEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: WatchlistEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Insert the item, or refresh catalog fields if the key is already tracked.
    /// Returns the stored record.
    pub async fn save(&self, item: &WatchlistItem) -> Option<WatchlistItem> {
        let inserted = best_effort("save", watchlist::save(&self.pool, item).await)?;
        if inserted {
            debug!(key = %item.key, title = %item.title, "item saved");
            self.emit(WatchlistEvent::Saved { key: item.key });
        } else {
            self.emit(WatchlistEvent::Updated {
                key: item.key,
                field: "catalog",
            });
        }
        self.fetch(item.key).await
    }

    pub async fn fetch(&self, key: ItemKey) -> Option<WatchlistItem> {
        let row = best_effort("fetch", watchlist::get(&self.pool, key).await)??;
        Some(self.hydrate(row).await)
    }

    /// Items matching `filter`, pinned first.
    pub async fn list(&self, filter: SmartFilter, today: NaiveDate) -> Vec<WatchlistItem> {
        let rows = best_effort("list", watchlist::list(&self.pool).await).unwrap_or_default();
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item = self.hydrate(row).await;
            if filter.matches(&item, today) {
                items.push(item);
            }
        }
        items
    }

    /// Shows with an up-next episode, excluding archived and finished ones.
    pub async fn up_next(&self) -> Vec<WatchlistItem> {
        let rows =
            best_effort("up_next", watchlist::list_up_next(&self.pool).await).unwrap_or_default();
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(self.hydrate(row).await);
        }
        items
    }

    /// Notify-enabled items releasing after `today`.
    pub async fn notify_upcoming(&self, today: NaiveDate) -> Vec<WatchlistItem> {
        let rows = best_effort(
            "notify_upcoming",
            watchlist::list_notify_upcoming(&self.pool, today).await,
        )
        .unwrap_or_default();
        rows.into_iter()
            .map(|row| row.into_item(BTreeSet::new()))
            .collect()
    }

    pub async fn update_watched(&self, key: ItemKey) -> Option<bool> {
        self.toggle(key, WatchFlag::Watched).await
    }

    pub async fn update_favorite(&self, key: ItemKey) -> Option<bool> {
        self.toggle(key, WatchFlag::Favorite).await
    }

    pub async fn update_pin(&self, key: ItemKey) -> Option<bool> {
        self.toggle(key, WatchFlag::Pinned).await
    }

    pub async fn update_archive(&self, key: ItemKey) -> Option<bool> {
        self.toggle(key, WatchFlag::Archived).await
    }

    pub async fn update_notify(&self, key: ItemKey) -> Option<bool> {
        self.toggle(key, WatchFlag::Notify).await
    }

    async fn toggle(&self, key: ItemKey, flag: WatchFlag) -> Option<bool> {
        let value = best_effort("toggle_flag", watchlist::toggle_flag(&self.pool, key, flag).await)??;
        debug!(key = %key, %flag, value, "flag toggled");
        self.emit(WatchlistEvent::Updated {
            key,
            field: flag.column(),
        });
        Some(value)
    }

    /// Remove the record and its watched episodes. Pending notifications are
    /// the caller's concern.
    pub async fn delete(&self, key: ItemKey) -> bool {
        let removed = best_effort("delete", watchlist::delete(&self.pool, key).await).unwrap_or(false);
        if removed {
            debug!(key = %key, "item deleted");
            self.emit(WatchlistEvent::Deleted { key });
        }
        removed
    }

    pub async fn is_item_saved(&self, key: ItemKey) -> bool {
        best_effort("is_item_saved", watchlist::exists(&self.pool, key).await).unwrap_or(false)
    }

    pub async fn is_marked_as_watched(&self, key: ItemKey) -> bool {
        self.flag(key, WatchFlag::Watched).await
    }

    pub async fn is_favorite(&self, key: ItemKey) -> bool {
        self.flag(key, WatchFlag::Favorite).await
    }

    pub async fn is_item_pinned(&self, key: ItemKey) -> bool {
        self.flag(key, WatchFlag::Pinned).await
    }

    pub async fn is_item_archived(&self, key: ItemKey) -> bool {
        self.flag(key, WatchFlag::Archived).await
    }

    pub async fn is_notify_enabled(&self, key: ItemKey) -> bool {
        self.flag(key, WatchFlag::Notify).await
    }

    async fn flag(&self, key: ItemKey, flag: WatchFlag) -> bool {
        best_effort("read_flag", watchlist::flag(&self.pool, key, flag).await)
            .flatten()
            .unwrap_or(false)
    }

    pub async fn update_catalog_fields(
        &self,
        key: ItemKey,
        title: &str,
        image_url: Option<&str>,
        release_date: Option<NaiveDate>,
    ) -> bool {
        let updated = best_effort(
            "update_catalog_fields",
            watchlist::update_catalog_fields(&self.pool, key, title, image_url, release_date)
                .await,
        )
        .unwrap_or(false);
        if updated {
            self.emit(WatchlistEvent::Updated {
                key,
                field: "catalog",
            });
        }
        updated
    }

    pub async fn mark_episode_watched(&self, show: ItemKey, episode: EpisodeKey) -> bool {
        let added = best_effort(
            "mark_episode_watched",
            episodes::mark_watched(&self.pool, show, episode).await,
        )
        .unwrap_or(false);
        if added {
            self.emit(WatchlistEvent::EpisodeWatched {
                key: show,
                episode,
                watched: true,
            });
        }
        added
    }

    /// Record several episodes at once. Returns how many were new.
    pub async fn mark_episodes_watched(&self, show: ItemKey, list: &[EpisodeKey]) -> u64 {
        let added = best_effort(
            "mark_episodes_watched",
            episodes::mark_many_watched(&self.pool, show, list).await,
        )
        .unwrap_or(0);
        if added > 0 {
            self.emit(WatchlistEvent::Updated {
                key: show,
                field: "watched_episodes",
            });
        }
        added
    }

    pub async fn remove_watched_episode(&self, show: ItemKey, episode: EpisodeKey) -> bool {
        let removed = best_effort(
            "remove_watched_episode",
            episodes::unmark_watched(&self.pool, show, episode).await,
        )
        .unwrap_or(false);
        if removed {
            self.emit(WatchlistEvent::EpisodeWatched {
                key: show,
                episode,
                watched: false,
            });
        }
        removed
    }

    pub async fn is_episode_watched(&self, show: ItemKey, episode: EpisodeKey) -> bool {
        best_effort(
            "is_episode_watched",
            episodes::is_watched(&self.pool, show, episode).await,
        )
        .unwrap_or(false)
    }

    pub async fn watched_episodes(&self, show: ItemKey) -> BTreeSet<EpisodeKey> {
        best_effort(
            "watched_episodes",
            episodes::list_watched(&self.pool, show).await,
        )
        .map(|list| list.into_iter().collect())
        .unwrap_or_default()
    }

    pub async fn set_up_next(&self, show: ItemKey, episode: Option<EpisodeKey>) -> bool {
        let updated = best_effort(
            "set_up_next",
            watchlist::set_up_next(&self.pool, show, episode).await,
        )
        .unwrap_or(false);
        if updated {
            self.emit(WatchlistEvent::Updated {
                key: show,
                field: "up_next",
            });
        }
        updated
    }

    pub async fn set_last_watched(&self, show: ItemKey, episode: Option<EpisodeKey>) -> bool {
        best_effort(
            "set_last_watched",
            watchlist::set_last_watched(&self.pool, show, episode).await,
        )
        .unwrap_or(false)
    }

    async fn hydrate(&self, row: WatchlistRow) -> WatchlistItem {
        let watched = self.watched_episodes(row.key).await;
        row.into_item(watched)
    }
}
