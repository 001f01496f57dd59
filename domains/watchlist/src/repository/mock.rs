//! In-memory watchlist store
//!
//! Joins entries against an [`InMemoryCatalog`]; entries whose film is gone
//! behave as if removed with it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use reelbase_catalog::InMemoryCatalog;
use reelbase_common::{Filters, Metadata, RepositoryError, SortDirection, SortKey, StorageFailure};

use super::{WatchlistStore, DUPLICATE_ENTRY_MESSAGE};
use crate::domain::entities::{WatchlistEntry, WatchlistQuery};

#[derive(Debug, Default)]
struct WatchlistState {
    last_id: i64,
    entries: BTreeMap<i64, WatchlistEntry>,
}

/// Watchlist store backed by process memory
#[derive(Debug, Clone)]
pub struct InMemoryWatchlist {
    catalog: InMemoryCatalog,
    state: Arc<Mutex<WatchlistState>>,
}

impl InMemoryWatchlist {
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self {
            catalog,
            state: Arc::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, WatchlistState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach the film, or `None` when the film no longer exists
    fn joined(&self, entry: &WatchlistEntry) -> Option<WatchlistEntry> {
        let film = self.catalog.film(entry.film_id)?;
        Some(WatchlistEntry {
            film: Some(film),
            ..entry.clone()
        })
    }
}

fn matches_query(entry: &WatchlistEntry, query: &WatchlistQuery) -> bool {
    query.watched.map_or(true, |watched| entry.watched == watched)
        && query.priority.map_or(true, |priority| entry.priority == priority)
}

/// Ascending order with NULLs last, as PostgreSQL sorts nullable columns
fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

fn compare_column(a: &WatchlistEntry, b: &WatchlistEntry, column: &str) -> Ordering {
    match column {
        "id" => a.id.cmp(&b.id),
        "added_at" => a.added_at.cmp(&b.added_at),
        "priority" => a.priority.cmp(&b.priority),
        "rating" => nulls_last(a.rating, b.rating),
        "watched_at" => nulls_last(a.watched_at, b.watched_at),
        _ => Ordering::Equal,
    }
}

fn compare_entries(a: &WatchlistEntry, b: &WatchlistEntry, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|key| {
            let ordering = compare_column(a, b, key.column);
            match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
        .then(b.added_at.cmp(&a.added_at))
        .then(b.id.cmp(&a.id))
}

#[async_trait]
impl WatchlistStore for InMemoryWatchlist {
    async fn insert(&self, entry: &WatchlistEntry) -> Result<WatchlistEntry, RepositoryError> {
        if self.catalog.film(entry.film_id).is_none() {
            return Err(StorageFailure::Constraint(format!(
                "film {} does not exist",
                entry.film_id
            ))
            .into());
        }

        let mut state = self.state();
        let duplicate = state
            .entries
            .values()
            .any(|e| e.user_id == entry.user_id && e.film_id == entry.film_id);
        if duplicate {
            return Err(RepositoryError::DuplicateEntry(
                DUPLICATE_ENTRY_MESSAGE.to_string(),
            ));
        }

        state.last_id += 1;
        let created = WatchlistEntry {
            id: state.last_id,
            film: None,
            added_at: Utc::now(),
            version: 1,
            ..entry.clone()
        };
        state.entries.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get(&self, user_id: i64, id: i64) -> Result<WatchlistEntry, RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }
        let stored = self
            .state()
            .entries
            .get(&id)
            .filter(|e| e.user_id == user_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        self.joined(&stored).ok_or(RepositoryError::NotFound)
    }

    async fn get_all(
        &self,
        user_id: i64,
        query: &WatchlistQuery,
        filters: &Filters,
    ) -> Result<(Vec<WatchlistEntry>, Metadata), RepositoryError> {
        let keys = filters.sort_keys()?;

        let owned: Vec<WatchlistEntry> = self
            .state()
            .entries
            .values()
            .filter(|e| e.user_id == user_id && matches_query(e, query))
            .cloned()
            .collect();
        let mut matched: Vec<WatchlistEntry> =
            owned.iter().filter_map(|e| self.joined(e)).collect();
        matched.sort_by(|a, b| compare_entries(a, b, &keys));

        let matched_count = matched.len() as i64;
        let page: Vec<WatchlistEntry> = matched
            .into_iter()
            .skip(filters.offset().max(0) as usize)
            .take(filters.limit().max(0) as usize)
            .collect();
        // The window count only exists on returned rows
        let total_records = if page.is_empty() { 0 } else { matched_count };

        Ok((page, filters.metadata(total_records)))
    }

    async fn update(&self, entry: &WatchlistEntry) -> Result<WatchlistEntry, RepositoryError> {
        let mut state = self.state();
        let matches = state
            .entries
            .get(&entry.id)
            .is_some_and(|stored| stored.user_id == entry.user_id && stored.version == entry.version);
        if !matches {
            return Err(RepositoryError::EditConflict);
        }

        let updated = WatchlistEntry {
            version: entry.version + 1,
            ..entry.clone()
        };
        state.entries.insert(
            updated.id,
            WatchlistEntry {
                film: None,
                ..updated.clone()
            },
        );

        Ok(updated)
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }
        let mut state = self.state();
        match state.entries.get(&id) {
            Some(e) if e.user_id == user_id => {
                state.entries.remove(&id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn exists(&self, user_id: i64, film_id: i64) -> Result<bool, RepositoryError> {
        if self.catalog.film(film_id).is_none() {
            return Ok(false);
        }
        Ok(self
            .state()
            .entries
            .values()
            .any(|e| e.user_id == user_id && e.film_id == film_id))
    }
}
