//! Repository implementations for the catalog domain
//!
//! Storage is expressed as async traits so the PostgreSQL repositories and the
//! in-memory catalog share one contract.

pub mod films;
pub mod mock;
pub mod references;
pub mod transactions;

use std::time::Duration;

use async_trait::async_trait;
use reelbase_common::{Filters, Metadata, RepositoryError};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::entities::{Film, FilmQuery, ReferenceKind, ResolvedReference};

pub use films::FilmRepository;
pub use mock::InMemoryCatalog;
pub use references::ReferenceRepository;
pub use transactions::{
    insert_film_tx, link_tx, resolve_and_link_tx, resolve_tx, unlink_missing_tx, update_film_tx,
};

/// Film aggregate storage
#[async_trait]
pub trait FilmStore: Send + Sync {
    /// Fetch a film with its genre, actor, and director names
    async fn get(&self, id: i64) -> Result<Film, RepositoryError>;

    /// Insert the base row and resolve and link every collection atomically.
    ///
    /// Returns the stored film with its generated id and version 1.
    async fn insert(&self, film: &Film) -> Result<Film, RepositoryError>;

    /// Conditional update against `film.version`.
    ///
    /// Returns the stored film at its new version, or `EditConflict`.
    async fn update(&self, film: &Film) -> Result<Film, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    /// One page of films matching `query`, with page metadata
    async fn get_all(
        &self,
        query: &FilmQuery,
        filters: &Filters,
    ) -> Result<(Vec<Film>, Metadata), RepositoryError>;

    async fn count(&self) -> Result<i64, RepositoryError>;
}

/// Shared genre/actor/director reference data
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Resolve a name to its stable id, creating the row only if absent
    async fn resolve(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<ResolvedReference, RepositoryError>;

    /// All rows of one kind, ordered by name
    async fn list(&self, kind: ReferenceKind) -> Result<Vec<ResolvedReference>, RepositoryError>;
}

/// Combined repository access for the catalog domain
#[derive(Clone)]
pub struct CatalogRepositories {
    pool: PgPool,
    pub films: FilmRepository,
    pub references: ReferenceRepository,
}

impl CatalogRepositories {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            films: FilmRepository::new(pool.clone()).with_query_timeout(query_timeout),
            references: ReferenceRepository::new(pool.clone()).with_query_timeout(query_timeout),
            pool,
        }
    }

    /// Begin a new database transaction.
    pub async fn begin(&self) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
