pub mod events;
pub mod notifications;
pub mod progression;
pub mod store;
pub mod telemetry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::sync::Arc;

use cronica_catalog::{CatalogError, CatalogItem, CatalogProvider};
use cronica_core::{Episode, EpisodeKey, ItemKey, WatchlistItem};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

pub use events::WatchlistEvent;
pub use notifications::{LogSink, NotificationScheduler, NotificationSink, PendingNotification};
pub use progression::EpisodeProgression;
pub use store::WatchlistStore;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("not tracked: {0}")]
    NotTracked(ItemKey),
    #[error("failed to persist {0}")]
    Persistence(ItemKey),
}

/// Watchlist service: store, episode progression and reminders wired to one
/// catalog. Constructed once by the entry point and shared by reference.
pub struct Tracker {
    store: WatchlistStore,
    catalog: Arc<dyn CatalogProvider>,
    progression: EpisodeProgression,
    notifications: NotificationScheduler,
}

impl Tracker {
    pub fn new(pool: SqlitePool, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self {
            store: WatchlistStore::new(pool.clone()),
            progression: EpisodeProgression::new(catalog.clone()),
            notifications: NotificationScheduler::new(pool),
            catalog,
        }
    }

    pub fn store(&self) -> &WatchlistStore {
        &self.store
    }

    pub fn catalog(&self) -> &dyn CatalogProvider {
        self.catalog.as_ref()
    }

    pub fn progression(&self) -> &EpisodeProgression {
        &self.progression
    }

    pub fn notifications(&self) -> &NotificationScheduler {
        &self.notifications
    }

    /// Fetch the title from the catalog and track it.
    pub async fn add_to_watchlist(&self, key: ItemKey) -> Result<WatchlistItem, TrackerError> {
        let details = self.catalog.item(key).await?;
        let saved = self
            .store
            .save(&item_from_catalog(&details))
            .await
            .ok_or(TrackerError::Persistence(key))?;
        self.notifications.schedule(&saved).await;
        info!(key = %key, title = %saved.title, "added to watchlist");
        Ok(saved)
    }

    /// Cancel the item's reminder, then delete it. Missing items are a no-op.
    pub async fn remove_from_watchlist(&self, key: ItemKey) -> bool {
        self.notifications
            .remove_notification(&key.notification_id())
            .await;
        self.store.delete(key).await
    }

    /// Flip the notify flag and schedule or cancel the reminder to match.
    pub async fn toggle_notify(&self, key: ItemKey) -> Option<bool> {
        let enabled = self.store.update_notify(key).await?;
        if enabled {
            if let Some(item) = self.store.fetch(key).await {
                self.notifications.schedule(&item).await;
            }
        } else {
            self.notifications
                .remove_notification(&key.notification_id())
                .await;
        }
        Some(enabled)
    }

    /// Record an episode as watched, tracking the show first if needed, and
    /// move the show's up-next pointer. Returns the new up-next episode.
    ///
    /// Marking an episode older than the last watched one records it without
    /// moving the pointers.
    pub async fn mark_episode_watched(
        &self,
        show_id: i64,
        episode: EpisodeKey,
    ) -> Result<Option<Episode>, TrackerError> {
        let show = self.ensure_show_tracked(show_id).await?;
        self.store.mark_episode_watched(show.key, episode).await;

        if show.last_watched.is_some_and(|last| episode < last) {
            debug!(key = %show.key, %episode, "backfilled older episode");
            return Ok(None);
        }
        Ok(self.advance_from(show.key, episode).await)
    }

    /// Mark every episode of a season, then progress from its last episode.
    pub async fn mark_season_watched(
        &self,
        show_id: i64,
        season_number: i32,
    ) -> Result<Option<Episode>, TrackerError> {
        let season = self.catalog.season(show_id, season_number).await?;
        let show = self.ensure_show_tracked(show_id).await?;
        let keys: Vec<EpisodeKey> = season.episodes.iter().map(Episode::key).collect();
        self.store.mark_episodes_watched(show.key, &keys).await;

        let Some(last) = keys.last().copied() else {
            return Ok(None);
        };
        if show.last_watched.is_some_and(|prev| last < prev) {
            return Ok(None);
        }
        Ok(self.advance_from(show.key, last).await)
    }

    pub async fn unmark_episode(&self, show_id: i64, episode: EpisodeKey) -> bool {
        self.store
            .remove_watched_episode(ItemKey::show(show_id), episode)
            .await
    }

    /// Re-read catalog metadata for a tracked item and re-plan its reminder.
    pub async fn refresh_item(&self, key: ItemKey) -> Result<WatchlistItem, TrackerError> {
        if !self.store.is_item_saved(key).await {
            return Err(TrackerError::NotTracked(key));
        }
        let details = self.catalog.item(key).await?;
        self.store
            .update_catalog_fields(
                key,
                &details.title,
                details.poster_url.as_deref(),
                details.release_date,
            )
            .await;

        let item = self
            .store
            .fetch(key)
            .await
            .ok_or(TrackerError::Persistence(key))?;
        self.notifications
            .remove_notification(&key.notification_id())
            .await;
        self.notifications.schedule(&item).await;
        Ok(item)
    }

    /// Schedule reminders for every notify-enabled upcoming item.
    pub async fn reschedule_all(&self) -> usize {
        let today = chrono::Utc::now().date_naive();
        let mut scheduled = 0;
        for item in self.store.notify_upcoming(today).await {
            if self.notifications.schedule_at(&item, today).await {
                scheduled += 1;
            }
        }
        debug!(scheduled, "notifications rescheduled");
        scheduled
    }

    /// Deliver reminders due today and publish a store event for each.
    pub async fn deliver_due_notifications(&self, sink: &dyn NotificationSink) -> usize {
        let today = chrono::Utc::now().date_naive();
        let delivered = self.notifications.deliver_due(today, sink).await;
        for n in &delivered {
            self.store.emit(WatchlistEvent::NotificationDelivered {
                identifier: n.identifier.clone(),
                title: n.title.clone(),
            });
        }
        delivered.len()
    }

    async fn ensure_show_tracked(&self, show_id: i64) -> Result<WatchlistItem, TrackerError> {
        let key = ItemKey::show(show_id);
        if let Some(existing) = self.store.fetch(key).await {
            return Ok(existing);
        }

        let details = self.catalog.show(show_id).await?;
        let saved = self
            .store
            .save(&item_from_catalog(&details))
            .await
            .ok_or(TrackerError::Persistence(key))?;
        info!(key = %key, title = %saved.title, "show auto-added from episode progress");
        self.notifications.schedule(&saved).await;
        Ok(saved)
    }

    async fn advance_from(&self, show: ItemKey, episode: EpisodeKey) -> Option<Episode> {
        self.store.set_last_watched(show, Some(episode)).await;
        let next = self
            .progression
            .fetch_next_episode(episode, show.catalog_id)
            .await;
        self.store
            .set_up_next(show, next.as_ref().map(Episode::key))
            .await;
        next
    }
}

/// A fresh watchlist record for a catalog title.
pub fn item_from_catalog(details: &CatalogItem) -> WatchlistItem {
    let mut item = WatchlistItem::new(details.key(), details.title.clone());
    item.image_url = details
        .poster_url
        .clone()
        .or_else(|| details.backdrop_url.clone());
    item.release_date = details.release_date;
    item
}
