//! Reference data repository (genres, actors, directors)

use std::time::Duration;

use async_trait::async_trait;
use reelbase_common::db::DEFAULT_QUERY_TIMEOUT;
use reelbase_common::{with_timeout, RepositoryError};
use sqlx::PgPool;

use super::transactions::resolve_tx;
use super::ReferenceStore;
use crate::domain::entities::{ReferenceKind, ResolvedReference};

#[derive(Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
    timeout: Duration,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ReferenceStore for ReferenceRepository {
    async fn resolve(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<ResolvedReference, RepositoryError> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let resolved = resolve_tx(&mut tx, kind, name).await?;
            tx.commit().await?;
            Ok(resolved)
        })
        .await
    }

    async fn list(&self, kind: ReferenceKind) -> Result<Vec<ResolvedReference>, RepositoryError> {
        with_timeout(self.timeout, async {
            let query = format!("SELECT id, name FROM {} ORDER BY name", kind.table());
            let rows = sqlx::query_as::<_, ResolvedReference>(&query)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        })
        .await
    }
}
