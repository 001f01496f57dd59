//! Catalog domain: films and their genre, actor, and director references

pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{
    Film, FilmInput, FilmPatch, FilmQuery, ReferenceKind, ResolvedReference, Runtime,
    FILM_SORT_SAFELIST,
};

// Re-export repository types
pub use repository::{
    insert_film_tx, link_tx, resolve_and_link_tx, resolve_tx, unlink_missing_tx, update_film_tx,
    CatalogRepositories, FilmRepository, FilmStore, InMemoryCatalog, ReferenceRepository,
    ReferenceStore,
};
