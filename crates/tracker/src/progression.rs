//! Next-episode lookup for the "Up Next" list.

use std::sync::Arc;

use chrono::NaiveDate;
use cronica_catalog::{CatalogError, CatalogProvider};
use cronica_core::{Episode, EpisodeKey};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::telemetry;

#[derive(Clone)]
pub struct EpisodeProgression {
    catalog: Arc<dyn CatalogProvider>,
}

impl EpisodeProgression {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    /// The episode to surface after `current`, judged against today's date.
    pub async fn fetch_next_episode(&self, current: EpisodeKey, show_id: i64) -> Option<Episode> {
        let today = chrono::Utc::now().date_naive();
        self.fetch_next_episode_at(current, show_id, today).await
    }

    /// Like [`fetch_next_episode`](Self::fetch_next_episode), but resolves to
    /// `None` as soon as `cancel` fires.
    pub async fn fetch_next_episode_cancellable(
        &self,
        current: EpisodeKey,
        show_id: i64,
        cancel: &CancellationToken,
    ) -> Option<Episode> {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(show_id, %current, "next episode lookup cancelled");
                None
            }
            next = self.fetch_next_episode(current, show_id) => next,
        }
    }

    /// Looks at the rest of the current season first. Past its end, the first
    /// episode of the following season is returned only once it has aired.
    /// Exactly one season boundary is crossed.
    pub async fn fetch_next_episode_at(
        &self,
        current: EpisodeKey,
        show_id: i64,
        today: NaiveDate,
    ) -> Option<Episode> {
        let season = match self.catalog.season(show_id, current.season).await {
            Ok(season) => season,
            Err(e) => {
                warn!(show_id, season = current.season, error = %e, "failed to fetch season");
                telemetry::report("fetch_next_episode", &e);
                return None;
            }
        };

        let Some(next_number) = current.episode.checked_add(1) else {
            debug!(show_id, %current, "episode number out of range");
            return None;
        };
        if let Some(next) = season.episode(next_number) {
            return Some(next.clone());
        }

        let next_season_number = current.season.checked_add(1)?;
        let next_season = match self.catalog.season(show_id, next_season_number).await {
            Ok(season) => season,
            Err(CatalogError::NotFound) => {
                debug!(show_id, season = next_season_number, "no further season");
                return None;
            }
            Err(e) => {
                warn!(show_id, season = next_season_number, error = %e, "failed to fetch season");
                telemetry::report("fetch_next_episode", &e);
                return None;
            }
        };

        let first = next_season.episodes.first()?;
        if first.has_aired(today) {
            Some(first.clone())
        } else {
            debug!(show_id, season = next_season_number, "next season has not aired yet");
            None
        }
    }
}
