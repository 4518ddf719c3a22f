use cronica_core::{EpisodeKey, ItemKey};

/// Change notifications published by the watchlist store.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WatchlistEvent {
    Saved {
        key: ItemKey,
    },
    Updated {
        key: ItemKey,
        field: &'static str,
    },
    Deleted {
        key: ItemKey,
    },
    EpisodeWatched {
        key: ItemKey,
        episode: EpisodeKey,
        watched: bool,
    },
    NotificationDelivered {
        identifier: String,
        title: String,
    },
}

impl WatchlistEvent {
    /// Event name used by SSE adapters.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "saved",
            Self::Updated { .. } => "updated",
            Self::Deleted { .. } => "deleted",
            Self::EpisodeWatched { .. } => "episode_watched",
            Self::NotificationDelivered { .. } => "notification_delivered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let evt = WatchlistEvent::Updated {
            key: ItemKey::movie(550),
            field: "favorite",
        };
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["type"], "updated");
        assert_eq!(json["data"]["field"], "favorite");
        assert_eq!(json["data"]["key"]["media_type"], "movie");
        assert_eq!(evt.name(), "updated");
    }
}
