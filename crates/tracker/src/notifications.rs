//! Local release reminders for watchlist items.

use chrono::NaiveDate;
use cronica_core::WatchlistItem;
use cronica_db::repo::notifications;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::telemetry::best_effort;

pub use cronica_db::repo::notifications::NotificationRow as PendingNotification;

/// Platform capability that actually shows a reminder to the user.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &PendingNotification);
}

/// Sink that only writes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &PendingNotification) {
        info!(
            identifier = %notification.identifier,
            title = %notification.title,
            fire_date = %notification.fire_date,
            "release notification"
        );
    }
}

#[derive(Clone)]
pub struct NotificationScheduler {
    pool: SqlitePool,
}

impl NotificationScheduler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Schedule a reminder for the item's release date, relative to today.
    pub async fn schedule(&self, item: &WatchlistItem) -> bool {
        self.schedule_at(item, chrono::Utc::now().date_naive()).await
    }

    /// Schedule when the item has notifications on and releases after
    /// `today`. An existing reminder for the same item is replaced.
    pub async fn schedule_at(&self, item: &WatchlistItem, today: NaiveDate) -> bool {
        if !item.notify {
            return false;
        }
        let Some(fire_date) = item.release_date.filter(|d| *d > today) else {
            return false;
        };

        let scheduled = best_effort(
            "schedule_notification",
            notifications::upsert(&self.pool, item.key, &item.title, fire_date).await,
        )
        .is_some();
        if scheduled {
            debug!(key = %item.key, %fire_date, "notification scheduled");
        }
        scheduled
    }

    pub async fn remove_notification(&self, identifier: &str) -> bool {
        best_effort(
            "remove_notification",
            notifications::delete(&self.pool, identifier).await,
        )
        .unwrap_or(false)
    }

    pub async fn is_scheduled(&self, identifier: &str) -> bool {
        best_effort(
            "get_notification",
            notifications::get(&self.pool, identifier).await,
        )
        .flatten()
        .is_some()
    }

    pub async fn pending(&self) -> Vec<PendingNotification> {
        best_effort(
            "pending_notifications",
            notifications::list_pending(&self.pool).await,
        )
        .unwrap_or_default()
    }

    /// Hand every reminder due on or before `today` to `sink`, then drop it.
    /// Returns what was delivered.
    pub async fn deliver_due(
        &self,
        today: NaiveDate,
        sink: &dyn NotificationSink,
    ) -> Vec<PendingNotification> {
        let due = best_effort("due_notifications", notifications::list_due(&self.pool, today).await)
            .unwrap_or_default();

        let mut delivered = Vec::with_capacity(due.len());
        for notification in due {
            sink.deliver(&notification);
            self.remove_notification(&notification.identifier).await;
            delivered.push(notification);
        }
        delivered
    }
}
