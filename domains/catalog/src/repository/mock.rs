//! In-memory catalog store
//!
//! Implements the same contract as the PostgreSQL repositories under a single
//! mutex, so every operation is trivially atomic. Used by unit tests here and
//! by the in-memory watchlist store.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reelbase_common::{Filters, Metadata, RepositoryError, SortDirection, SortKey};

use super::{FilmStore, ReferenceStore};
use crate::domain::entities::{Film, FilmQuery, ReferenceKind, ResolvedReference};

#[derive(Debug, Default)]
struct CatalogState {
    last_film_id: i64,
    films: BTreeMap<i64, Film>,
    last_reference_id: HashMap<ReferenceKind, i64>,
    references: HashMap<ReferenceKind, BTreeMap<String, i64>>,
}

impl CatalogState {
    fn resolve(&mut self, kind: ReferenceKind, name: &str) -> ResolvedReference {
        if let Some(&id) = self.references.get(&kind).and_then(|rows| rows.get(name)) {
            return ResolvedReference {
                id,
                name: name.to_string(),
            };
        }

        let id = self.last_reference_id.entry(kind).or_insert(0);
        *id += 1;
        let id = *id;
        self.references
            .entry(kind)
            .or_default()
            .insert(name.to_string(), id);
        ResolvedReference {
            id,
            name: name.to_string(),
        }
    }

    /// Resolve every name of every kind and return the film with its
    /// collections as stored: deduplicated and ordered by name.
    fn link_all(&mut self, film: &Film) -> Film {
        let mut linked = film.clone();
        for kind in ReferenceKind::ALL {
            let mut names: Vec<String> = film
                .names(kind)
                .iter()
                .map(|name| self.resolve(kind, name).name)
                .collect();
            names.sort();
            names.dedup();
            *linked.names_mut(kind) = names;
        }
        linked
    }
}

/// Catalog store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current stored copy of a film, if any
    pub fn film(&self, id: i64) -> Option<Film> {
        self.state().films.get(&id).cloned()
    }
}

fn title_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches_query(film: &Film, query: &FilmQuery) -> bool {
    if !query.title.is_empty() {
        let have = title_tokens(&film.title);
        let wanted = title_tokens(&query.title);
        if wanted.is_empty() || !wanted.iter().all(|token| have.contains(token)) {
            return false;
        }
    }

    ReferenceKind::ALL.into_iter().all(|kind| {
        let wanted = query.names(kind);
        wanted.is_empty() || film.names(kind).iter().any(|name| wanted.contains(name))
    })
}

fn compare_column(a: &Film, b: &Film, column: &str) -> Ordering {
    match column {
        "id" => a.id.cmp(&b.id),
        "title" => a.title.cmp(&b.title),
        "year" => a.year.cmp(&b.year),
        "runtime" => a.runtime.cmp(&b.runtime),
        "rating" => a.rating.total_cmp(&b.rating),
        _ => Ordering::Equal,
    }
}

fn compare_films(a: &Film, b: &Film, keys: &[SortKey]) -> Ordering {
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
        .then(a.id.cmp(&b.id))
}

#[async_trait]
impl FilmStore for InMemoryCatalog {
    async fn get(&self, id: i64) -> Result<Film, RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }
        self.film(id).ok_or(RepositoryError::NotFound)
    }

    async fn insert(&self, film: &Film) -> Result<Film, RepositoryError> {
        let mut state = self.state();
        state.last_film_id += 1;

        let mut created = state.link_all(film);
        created.id = state.last_film_id;
        created.version = 1;
        state.films.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, film: &Film) -> Result<Film, RepositoryError> {
        let mut state = self.state();
        let current_version = state.films.get(&film.id).map(|stored| stored.version);
        if current_version != Some(film.version) {
            return Err(RepositoryError::EditConflict);
        }

        let mut updated = state.link_all(film);
        updated.version = film.version + 1;
        state.films.insert(updated.id, updated.clone());

        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }
        self.state()
            .films
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_all(
        &self,
        query: &FilmQuery,
        filters: &Filters,
    ) -> Result<(Vec<Film>, Metadata), RepositoryError> {
        let keys = filters.sort_keys()?;

        let mut matched: Vec<Film> = self
            .state()
            .films
            .values()
            .filter(|film| matches_query(film, query))
            .cloned()
            .collect();
        matched.sort_by(|a, b| compare_films(a, b, &keys));

        let matched_count = matched.len() as i64;
        let page: Vec<Film> = matched
            .into_iter()
            .skip(filters.offset().max(0) as usize)
            .take(filters.limit().max(0) as usize)
            .collect();
        // The window count only exists on returned rows
        let total_records = if page.is_empty() { 0 } else { matched_count };

        Ok((page, filters.metadata(total_records)))
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(self.state().films.len() as i64)
    }
}

#[async_trait]
impl ReferenceStore for InMemoryCatalog {
    async fn resolve(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<ResolvedReference, RepositoryError> {
        Ok(self.state().resolve(kind, name))
    }

    async fn list(&self, kind: ReferenceKind) -> Result<Vec<ResolvedReference>, RepositoryError> {
        let state = self.state();
        let rows = state
            .references
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .map(|(name, &id)| ResolvedReference {
                        id,
                        name: name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}
