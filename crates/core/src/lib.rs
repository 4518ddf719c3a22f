pub mod error;
pub mod types;

pub use types::{
    Episode, EpisodeKey, ItemKey, MediaType, ParseKeyError, Season, SmartFilter, WatchlistItem,
};
