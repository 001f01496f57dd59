//! Watchlist repository

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelbase_catalog::{Film, Runtime};
use reelbase_common::db::DEFAULT_QUERY_TIMEOUT;
use reelbase_common::{is_unique_violation, with_timeout, Filters, Metadata, RepositoryError};
use sqlx::PgPool;

use super::{WatchlistStore, DUPLICATE_ENTRY_MESSAGE};
use crate::domain::entities::{WatchlistEntry, WatchlistQuery};

const USER_FILM_UNIQUE: &str = "watchlist_user_film_unique";

/// Entry columns plus the joined film, with film columns prefixed so sort
/// tokens resolve to the entry's own columns.
const ENTRY_COLUMNS: &str = "\
    w.id, w.user_id, w.film_id, w.added_at, w.notes, w.priority, \
    w.watched, w.watched_at, w.rating, w.version, \
    f.title AS film_title, f.year AS film_year, f.runtime AS film_runtime, \
    f.rating AS film_rating, f.description AS film_description, f.image AS film_image, \
    f.version AS film_version, \
    COALESCE((SELECT array_agg(g.name ORDER BY g.name) FROM film_genres fg \
              JOIN genres g ON fg.genre_id = g.id WHERE fg.film_id = f.id), '{}') AS film_genres, \
    COALESCE((SELECT array_agg(a.name ORDER BY a.name) FROM film_actors fa \
              JOIN actors a ON fa.actor_id = a.id WHERE fa.film_id = f.id), '{}') AS film_actors, \
    COALESCE((SELECT array_agg(d.name ORDER BY d.name) FROM film_directors fd \
              JOIN directors d ON fd.director_id = d.id WHERE fd.film_id = f.id), '{}') AS film_directors";

#[derive(sqlx::FromRow)]
struct WatchlistRow {
    #[sqlx(default)]
    total_records: i64,
    #[sqlx(flatten)]
    entry: WatchlistEntry,
    film_title: String,
    film_year: i32,
    film_runtime: Runtime,
    film_rating: f32,
    film_description: String,
    film_image: String,
    film_version: i32,
    film_genres: Vec<String>,
    film_actors: Vec<String>,
    film_directors: Vec<String>,
}

impl WatchlistRow {
    fn into_entry(self) -> WatchlistEntry {
        let mut entry = self.entry;
        entry.film = Some(Film {
            id: entry.film_id,
            title: self.film_title,
            year: self.film_year,
            runtime: self.film_runtime,
            genres: self.film_genres,
            directors: self.film_directors,
            actors: self.film_actors,
            rating: self.film_rating,
            description: self.film_description,
            image_url: self.film_image,
            version: self.film_version,
        });
        entry
    }
}

#[derive(Clone)]
pub struct WatchlistRepository {
    pool: PgPool,
    timeout: Duration,
}

impl WatchlistRepository {
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
impl WatchlistStore for WatchlistRepository {
    async fn insert(&self, entry: &WatchlistEntry) -> Result<WatchlistEntry, RepositoryError> {
        with_timeout(self.timeout, async {
            let result = sqlx::query_as::<_, (i64, DateTime<Utc>, i32)>(
                r#"
                INSERT INTO watchlist (user_id, film_id, notes, priority, watched, watched_at, rating)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, added_at, version
                "#,
            )
            .bind(entry.user_id)
            .bind(entry.film_id)
            .bind(&entry.notes)
            .bind(entry.priority)
            .bind(entry.watched)
            .bind(entry.watched_at)
            .bind(entry.rating)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok((id, added_at, version)) => {
                    tracing::debug!(
                        user_id = entry.user_id,
                        film_id = entry.film_id,
                        entry_id = id,
                        "Watchlist entry added"
                    );
                    Ok(WatchlistEntry {
                        id,
                        added_at,
                        version,
                        ..entry.clone()
                    })
                }
                Err(e) if is_unique_violation(&e, USER_FILM_UNIQUE) => {
                    tracing::debug!(
                        user_id = entry.user_id,
                        film_id = entry.film_id,
                        "Film already on watchlist"
                    );
                    Err(RepositoryError::DuplicateEntry(
                        DUPLICATE_ENTRY_MESSAGE.to_string(),
                    ))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to insert watchlist entry");
                    Err(e.into())
                }
            }
        })
        .await
    }

    async fn get(&self, user_id: i64, id: i64) -> Result<WatchlistEntry, RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }

        with_timeout(self.timeout, async {
            let query = format!(
                "SELECT {ENTRY_COLUMNS} \
                 FROM watchlist w \
                 INNER JOIN films f ON w.film_id = f.id \
                 WHERE w.id = $1 AND w.user_id = $2"
            );
            let row = sqlx::query_as::<_, WatchlistRow>(&query)
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            Ok(row.into_entry())
        })
        .await
    }

    async fn get_all(
        &self,
        user_id: i64,
        query: &WatchlistQuery,
        filters: &Filters,
    ) -> Result<(Vec<WatchlistEntry>, Metadata), RepositoryError> {
        let order = filters.order_clause()?;
        let order_by = if order.is_empty() {
            "w.added_at DESC, w.id DESC".to_string()
        } else {
            format!("{order}, w.added_at DESC, w.id DESC")
        };

        with_timeout(self.timeout, async {
            let sql = format!(
                "SELECT COUNT(*) OVER() AS total_records, {ENTRY_COLUMNS} \
                 FROM watchlist w \
                 INNER JOIN films f ON w.film_id = f.id \
                 WHERE w.user_id = $1 \
                   AND ($2::boolean IS NULL OR w.watched = $2) \
                   AND ($3::integer IS NULL OR w.priority = $3) \
                 ORDER BY {order_by} \
                 LIMIT $4 OFFSET $5"
            );

            let rows = sqlx::query_as::<_, WatchlistRow>(&sql)
                .bind(user_id)
                .bind(query.watched)
                .bind(query.priority)
                .bind(filters.limit())
                .bind(filters.offset())
                .fetch_all(&self.pool)
                .await?;

            let total_records = rows.first().map(|row| row.total_records).unwrap_or(0);
            let entries = rows.into_iter().map(WatchlistRow::into_entry).collect();

            Ok((entries, filters.metadata(total_records)))
        })
        .await
    }

    async fn update(&self, entry: &WatchlistEntry) -> Result<WatchlistEntry, RepositoryError> {
        with_timeout(self.timeout, async {
            let version = sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE watchlist
                SET notes = $1, priority = $2, watched = $3, watched_at = $4, rating = $5,
                    version = version + 1
                WHERE id = $6 AND user_id = $7 AND version = $8
                RETURNING version
                "#,
            )
            .bind(&entry.notes)
            .bind(entry.priority)
            .bind(entry.watched)
            .bind(entry.watched_at)
            .bind(entry.rating)
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(entry.version)
            .fetch_optional(&self.pool)
            .await?;

            match version {
                Some(version) => Ok(WatchlistEntry {
                    version,
                    ..entry.clone()
                }),
                None => {
                    tracing::debug!(
                        entry_id = entry.id,
                        expected_version = entry.version,
                        "Watchlist update lost a version race"
                    );
                    Err(RepositoryError::EditConflict)
                }
            }
        })
        .await
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }

        with_timeout(self.timeout, async {
            let result = sqlx::query("DELETE FROM watchlist WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn exists(&self, user_id: i64, film_id: i64) -> Result<bool, RepositoryError> {
        with_timeout(self.timeout, async {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM watchlist WHERE user_id = $1 AND film_id = $2)",
            )
            .bind(user_id)
            .bind(film_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(exists)
        })
        .await
    }
}
