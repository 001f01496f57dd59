//! Transactional free functions for the catalog domain
//!
//! Every function runs inside the caller's transaction and leaves commit or
//! rollback to the caller. Table and column names are spliced only from
//! `ReferenceKind`'s fixed vocabulary; every value is a bound parameter.

use sqlx::{Postgres, Transaction};

use crate::domain::entities::{Film, ReferenceKind, ResolvedReference};

/// Resolve one name to its reference row, creating it if absent.
///
/// `DO UPDATE` rather than `DO NOTHING`: a row committed by a concurrent
/// resolver after this statement's snapshot is still locked and returned, so
/// racing resolvers converge on the same id instead of getting no row back.
pub async fn resolve_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: ReferenceKind,
    name: &str,
) -> Result<ResolvedReference, sqlx::Error> {
    let query = format!(
        "INSERT INTO {table} (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id, name",
        table = kind.table()
    );
    let resolved = sqlx::query_as::<_, ResolvedReference>(&query)
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    Ok(resolved)
}

/// Link a film to a reference row. Returns false if the link already existed.
pub async fn link_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: ReferenceKind,
    film_id: i64,
    entity_id: i64,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "INSERT INTO {junction} (film_id, {column}) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
        junction = kind.junction_table(),
        column = kind.junction_column()
    );
    let result = sqlx::query(&query)
        .bind(film_id)
        .bind(entity_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Resolve a whole collection of names and link them to a film in one statement.
///
/// Returns the resolved rows ordered by name.
pub async fn resolve_and_link_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: ReferenceKind,
    film_id: i64,
    names: &[String],
) -> Result<Vec<ResolvedReference>, sqlx::Error> {
    // Sorted and deduplicated: an upsert may not touch the same row twice,
    // and concurrent writers lock shared rows in the same order.
    let mut names = names.to_vec();
    names.sort();
    names.dedup();

    if names.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "WITH resolved AS ( \
             INSERT INTO {table} (name) \
             SELECT unnest($2::text[]) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, name \
         ), linked AS ( \
             INSERT INTO {junction} (film_id, {column}) \
             SELECT $1, id FROM resolved \
             ON CONFLICT DO NOTHING \
         ) \
         SELECT id, name FROM resolved ORDER BY name",
        table = kind.table(),
        junction = kind.junction_table(),
        column = kind.junction_column()
    );
    let resolved = sqlx::query_as::<_, ResolvedReference>(&query)
        .bind(film_id)
        .bind(&names)
        .fetch_all(&mut **tx)
        .await?;
    Ok(resolved)
}

/// Remove a film's links whose reference name is not in `keep`.
///
/// Reference rows are never deleted. Returns the number of links removed.
pub async fn unlink_missing_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: ReferenceKind,
    film_id: i64,
    keep: &[String],
) -> Result<u64, sqlx::Error> {
    let query = format!(
        "DELETE FROM {junction} j USING {table} r \
         WHERE j.{column} = r.id AND j.film_id = $1 AND NOT (r.name = ANY($2))",
        junction = kind.junction_table(),
        table = kind.table(),
        column = kind.junction_column()
    );
    let result = sqlx::query(&query)
        .bind(film_id)
        .bind(keep)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

/// Insert a film's base row. Returns the generated id and the initial version.
pub async fn insert_film_tx(
    tx: &mut Transaction<'_, Postgres>,
    film: &Film,
) -> Result<(i64, i32), sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, i32)>(
        r#"
        INSERT INTO films (title, year, runtime, rating, description, image, version)
        VALUES ($1, $2, $3, $4, $5, $6, 1)
        RETURNING id, version
        "#,
    )
    .bind(&film.title)
    .bind(film.year)
    .bind(film.runtime)
    .bind(film.rating)
    .bind(&film.description)
    .bind(&film.image_url)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Compare-and-swap update of a film's base row.
///
/// Matches on `id` and the version the caller read. Returns the new version,
/// or `None` when no row matched: either another writer got there first or
/// the film was deleted. Callers cannot tell the two apart.
pub async fn update_film_tx(
    tx: &mut Transaction<'_, Postgres>,
    film: &Film,
) -> Result<Option<i32>, sqlx::Error> {
    let version = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE films
        SET title = $1, year = $2, runtime = $3, rating = $4,
            description = $5, image = $6, version = version + 1
        WHERE id = $7 AND version = $8
        RETURNING version
        "#,
    )
    .bind(&film.title)
    .bind(film.year)
    .bind(film.runtime)
    .bind(film.rating)
    .bind(&film.description)
    .bind(&film.image_url)
    .bind(film.id)
    .bind(film.version)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(version)
}
