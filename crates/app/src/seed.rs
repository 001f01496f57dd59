//! Seeding the catalog from a JSON file of films

use std::path::Path;

use anyhow::Context;
use reelbase_catalog::{Film, FilmInput, FilmStore};

/// Read a JSON array of films, e.g.
/// `[{"title": "Heat", "year": 1995, "runtime": "170 mins", ...}]`
pub fn load_seed_file(path: &Path) -> anyhow::Result<Vec<FilmInput>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let films = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse seed file {}", path.display()))?;
    Ok(films)
}

/// Insert `films` when the catalog holds fewer films than the seed set.
///
/// Invalid seed records are skipped with a warning. Returns how many films
/// were inserted.
pub async fn seed_films<S>(store: &S, films: Vec<FilmInput>) -> anyhow::Result<usize>
where
    S: FilmStore + ?Sized,
{
    let existing = store.count().await?;
    if existing >= films.len() as i64 {
        tracing::info!(existing, "Catalog already seeded, skipping");
        return Ok(0);
    }

    let mut inserted = 0;
    for input in films {
        let title = input.title.clone();
        let film = match Film::new(input) {
            Ok(film) => film,
            Err(e) => {
                tracing::warn!(%title, error = %e, "Skipping invalid seed film");
                continue;
            }
        };
        store.insert(&film).await?;
        inserted += 1;
    }

    tracing::info!(inserted, "Catalog seeded");
    Ok(inserted)
}
