pub mod episodes;
pub mod notifications;
pub mod watchlist;
