//! Film repository

use std::time::Duration;

use async_trait::async_trait;
use reelbase_common::db::DEFAULT_QUERY_TIMEOUT;
use reelbase_common::{with_timeout, Filters, Metadata, RepositoryError};
use sqlx::PgPool;

use super::transactions::{insert_film_tx, resolve_and_link_tx, unlink_missing_tx, update_film_tx};
use super::FilmStore;
use crate::domain::entities::{Film, FilmQuery, ReferenceKind};

/// Film columns plus the three name arrays, as correlated sub-selects so a
/// film is always one row. Used for SELECT lists over `films f`.
pub(crate) const FILM_COLUMNS: &str = "\
    f.id, f.title, f.year, f.runtime, f.rating, f.description, f.image, f.version, \
    COALESCE((SELECT array_agg(g.name ORDER BY g.name) FROM film_genres fg \
              JOIN genres g ON fg.genre_id = g.id WHERE fg.film_id = f.id), '{}') AS genres, \
    COALESCE((SELECT array_agg(a.name ORDER BY a.name) FROM film_actors fa \
              JOIN actors a ON fa.actor_id = a.id WHERE fa.film_id = f.id), '{}') AS actors, \
    COALESCE((SELECT array_agg(d.name ORDER BY d.name) FROM film_directors fd \
              JOIN directors d ON fd.director_id = d.id WHERE fd.film_id = f.id), '{}') AS directors";

#[derive(sqlx::FromRow)]
struct FilmListRow {
    total_records: i64,
    #[sqlx(flatten)]
    film: Film,
}

#[derive(Clone)]
pub struct FilmRepository {
    pool: PgPool,
    timeout: Duration,
}

impl FilmRepository {
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
impl FilmStore for FilmRepository {
    async fn get(&self, id: i64) -> Result<Film, RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }

        with_timeout(self.timeout, async {
            let query = format!("SELECT {FILM_COLUMNS} FROM films f WHERE f.id = $1");
            sqlx::query_as::<_, Film>(&query)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)
        })
        .await
    }

    async fn insert(&self, film: &Film) -> Result<Film, RepositoryError> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let (id, version) = insert_film_tx(&mut tx, film).await?;

            let mut created = film.clone();
            created.id = id;
            created.version = version;
            for kind in ReferenceKind::ALL {
                let resolved = resolve_and_link_tx(&mut tx, kind, id, film.names(kind)).await?;
                *created.names_mut(kind) = resolved.into_iter().map(|r| r.name).collect();
            }

            tx.commit().await?;

            tracing::debug!(film_id = id, "Film inserted");
            Ok(created)
        })
        .await
    }

    async fn update(&self, film: &Film) -> Result<Film, RepositoryError> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let Some(version) = update_film_tx(&mut tx, film).await? else {
                tracing::debug!(
                    film_id = film.id,
                    expected_version = film.version,
                    "Film update lost a version race"
                );
                return Err(RepositoryError::EditConflict);
            };

            let mut updated = film.clone();
            updated.version = version;
            for kind in ReferenceKind::ALL {
                let names = film.names(kind);
                let resolved = resolve_and_link_tx(&mut tx, kind, film.id, names).await?;
                let removed = unlink_missing_tx(&mut tx, kind, film.id, names).await?;
                if removed > 0 {
                    tracing::debug!(film_id = film.id, %kind, removed, "Stale film links removed");
                }
                *updated.names_mut(kind) = resolved.into_iter().map(|r| r.name).collect();
            }

            tx.commit().await?;

            Ok(updated)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }

        with_timeout(self.timeout, async {
            // Junction rows go with the film via ON DELETE CASCADE
            let result = sqlx::query("DELETE FROM films WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn get_all(
        &self,
        query: &FilmQuery,
        filters: &Filters,
    ) -> Result<(Vec<Film>, Metadata), RepositoryError> {
        let order = filters.order_clause()?;
        let order_by = if order.is_empty() {
            "f.id ASC".to_string()
        } else {
            format!("{order}, f.id ASC")
        };

        with_timeout(self.timeout, async {
            let sql = format!(
                "SELECT COUNT(*) OVER() AS total_records, {FILM_COLUMNS} \
                 FROM films f \
                 WHERE (to_tsvector('simple', f.title) @@ plainto_tsquery('simple', $1) OR $1 = '') \
                   AND (cardinality($2::text[]) = 0 OR EXISTS ( \
                        SELECT 1 FROM film_genres fg JOIN genres g ON fg.genre_id = g.id \
                        WHERE fg.film_id = f.id AND g.name = ANY($2))) \
                   AND (cardinality($3::text[]) = 0 OR EXISTS ( \
                        SELECT 1 FROM film_actors fa JOIN actors a ON fa.actor_id = a.id \
                        WHERE fa.film_id = f.id AND a.name = ANY($3))) \
                   AND (cardinality($4::text[]) = 0 OR EXISTS ( \
                        SELECT 1 FROM film_directors fd JOIN directors d ON fd.director_id = d.id \
                        WHERE fd.film_id = f.id AND d.name = ANY($4))) \
                 ORDER BY {order_by} \
                 LIMIT $5 OFFSET $6"
            );

            let rows = sqlx::query_as::<_, FilmListRow>(&sql)
                .bind(&query.title)
                .bind(&query.genres)
                .bind(&query.actors)
                .bind(&query.directors)
                .bind(filters.limit())
                .bind(filters.offset())
                .fetch_all(&self.pool)
                .await?;

            let total_records = rows.first().map(|row| row.total_records).unwrap_or(0);
            let films = rows.into_iter().map(|row| row.film).collect();

            Ok((films, filters.metadata(total_records)))
        })
        .await
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        with_timeout(self.timeout, async {
            let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM films")
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        })
        .await
    }
}
