//! Repository implementations for the watchlist domain

pub mod mock;
pub mod watchlist;

use async_trait::async_trait;
use reelbase_common::{Filters, Metadata, RepositoryError};

use crate::domain::entities::{WatchlistEntry, WatchlistQuery};

pub use mock::InMemoryWatchlist;
pub use watchlist::WatchlistRepository;

/// Message carried by `DuplicateEntry` for a second entry on the same film
pub const DUPLICATE_ENTRY_MESSAGE: &str = "film already exists in watchlist";

/// Watchlist entry storage. Every read and write is scoped to one user.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// Insert a new entry; returns it with its id, `added_at`, and version 1.
    async fn insert(&self, entry: &WatchlistEntry) -> Result<WatchlistEntry, RepositoryError>;

    /// Fetch one entry with its film
    async fn get(&self, user_id: i64, id: i64) -> Result<WatchlistEntry, RepositoryError>;

    async fn get_all(
        &self,
        user_id: i64,
        query: &WatchlistQuery,
        filters: &Filters,
    ) -> Result<(Vec<WatchlistEntry>, Metadata), RepositoryError>;

    /// Conditional update against `(entry.user_id, entry.id, entry.version)`
    async fn update(&self, entry: &WatchlistEntry) -> Result<WatchlistEntry, RepositoryError>;

    async fn delete(&self, user_id: i64, id: i64) -> Result<(), RepositoryError>;

    /// Whether `user_id` already has `film_id` on their watchlist
    async fn exists(&self, user_id: i64, film_id: i64) -> Result<bool, RepositoryError>;
}
