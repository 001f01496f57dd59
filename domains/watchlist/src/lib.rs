//! Watchlist domain: per-user film watchlist entries

pub mod domain;
pub mod repository;

pub use domain::entities::{
    NewWatchlistEntry, WatchlistEntry, WatchlistPatch, WatchlistQuery, DEFAULT_PRIORITY,
    WATCHLIST_SORT_SAFELIST,
};

pub use repository::{InMemoryWatchlist, WatchlistRepository, WatchlistStore};
