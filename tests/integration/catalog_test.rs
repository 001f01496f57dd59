//! Film catalog persistence against PostgreSQL

mod common;

use std::time::Duration;

use reelbase_catalog::{
    link_tx, resolve_tx, FilmQuery, FilmRepository, FilmStore, ReferenceKind, ReferenceStore,
    FILM_SORT_SAFELIST,
};
use reelbase_common::{Filters, Metadata, RepositoryError, StorageFailure};
use serial_test::serial;

use crate::common::{film, names, TestApp};

async fn seed(app: &TestApp) {
    let films = &app.repos.catalog.films;
    for f in [
        film("Heat", 1995, &["Crime", "Thriller"], &["Al Pacino", "Robert De Niro"], &["Michael Mann"]),
        film("The Godfather", 1972, &["Crime", "Drama"], &["Al Pacino", "Marlon Brando"], &["Francis Ford Coppola"]),
        film("Collateral", 2004, &["Thriller"], &["Tom Cruise"], &["Michael Mann"]),
        film("Amelie", 2001, &["Comedy", "Romance"], &["Audrey Tautou"], &["Jean-Pierre Jeunet"]),
    ] {
        films.insert(&f).await.unwrap();
    }
}

mod test_reference_resolution {
    use super::*;

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_concurrent_resolvers_converge_on_one_row() {
        let app = TestApp::new().await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let references = app.repos.catalog.references.clone();
                tokio::spawn(async move { references.resolve(ReferenceKind::Genre, "Noir").await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(app.count_rows("genres").await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_link_is_idempotent_and_rolls_back_with_caller() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;

        let mut tx = app.repos.catalog.begin().await.unwrap();
        let western = resolve_tx(&mut tx, ReferenceKind::Genre, "Western").await.unwrap();
        assert!(link_tx(&mut tx, ReferenceKind::Genre, 3, western.id).await.unwrap());
        assert!(!link_tx(&mut tx, ReferenceKind::Genre, 3, western.id).await.unwrap());

        let again = resolve_tx(&mut tx, ReferenceKind::Genre, "Western").await.unwrap();
        assert_eq!(again, western);
        tx.rollback().await.unwrap();

        let collateral = app.repos.catalog.films.get(3).await.unwrap();
        assert_eq!(collateral.genres, names(&["Thriller"]));
        let genres = app.repos.catalog.references.list(ReferenceKind::Genre).await.unwrap();
        assert!(genres.iter().all(|g| g.name != "Western"));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_films_share_reference_rows() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;

        let actors = app.repos.catalog.references.list(ReferenceKind::Actor).await.unwrap();
        assert_eq!(actors.iter().filter(|a| a.name == "Al Pacino").count(), 1);
        assert_eq!(app.count_rows("directors").await.unwrap(), 3);
        assert_eq!(app.count_rows("film_actors").await.unwrap(), 6);
    }
}

mod test_film_lifecycle {
    use super::*;

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_insert_then_get() {
        let app = TestApp::new().await.unwrap();
        let films = &app.repos.catalog.films;

        let created = films
            .insert(&film("Heat", 1995, &["Thriller", "Crime"], &["Al Pacino"], &["Michael Mann"]))
            .await
            .unwrap();
        assert!(created.id > 0);
        assert_eq!(created.version, 1);

        let fetched = films.get(created.id).await.unwrap();
        assert_eq!(fetched.title, "Heat");
        assert_eq!(fetched.genres, names(&["Crime", "Thriller"]));
        assert_eq!(fetched.actors, names(&["Al Pacino"]));
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_insert_with_five_genres_links_each_once() {
        let app = TestApp::new().await.unwrap();
        let created = app
            .repos
            .catalog
            .films
            .insert(&film("Anthology", 2010, &["A", "B", "C", "D", "E"], &[], &[]))
            .await
            .unwrap();

        assert_eq!(created.genres.len(), 5);
        assert_eq!(app.count_rows("film_genres").await.unwrap(), 5);
        assert!(created.actors.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_get_missing_and_non_positive_ids() {
        let app = TestApp::new().await.unwrap();
        let films = &app.repos.catalog.films;

        assert!(matches!(films.get(0).await, Err(RepositoryError::NotFound)));
        assert!(matches!(films.get(12345).await, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_two_writers_on_one_version() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;
        let films = &app.repos.catalog.films;

        let mut first = films.get(1).await.unwrap();
        let mut second = first.clone();
        first.rating = 8.3;
        second.rating = 2.0;

        let (a, b) = tokio::join!(films.update(&first), films.update(&second));
        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert!(matches!(
            [a, b].into_iter().find(Result::is_err),
            Some(Err(RepositoryError::EditConflict))
        ));
        assert_eq!(films.get(1).await.unwrap().version, 2);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_update_reconciles_links() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;
        let films = &app.repos.catalog.films;

        let mut heat = films.get(1).await.unwrap();
        heat.genres = names(&["Crime", "Heist"]);
        heat.actors = names(&["Al Pacino"]);
        let updated = films.update(&heat).await.unwrap();
        assert_eq!(updated.version, 2);

        let stored = films.get(1).await.unwrap();
        assert_eq!(stored.genres, names(&["Crime", "Heist"]));
        assert_eq!(stored.actors, names(&["Al Pacino"]));

        // Unlinked reference rows stay
        let genres = app.repos.catalog.references.list(ReferenceKind::Genre).await.unwrap();
        assert!(genres.iter().any(|g| g.name == "Thriller"));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_update_of_deleted_film_is_edit_conflict() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;
        let films = &app.repos.catalog.films;

        let heat = films.get(1).await.unwrap();
        films.delete(1).await.unwrap();
        assert!(matches!(films.update(&heat).await, Err(RepositoryError::EditConflict)));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_delete_cascades_to_links_only() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;
        let films = &app.repos.catalog.films;

        films.delete(2).await.unwrap();

        assert!(matches!(films.get(2).await, Err(RepositoryError::NotFound)));
        assert!(matches!(films.delete(2).await, Err(RepositoryError::NotFound)));
        assert!(matches!(films.delete(-1).await, Err(RepositoryError::NotFound)));
        assert_eq!(films.count().await.unwrap(), 3);
        assert_eq!(app.count_rows("actors").await.unwrap(), 5);
        let linked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM film_actors WHERE film_id = 2")
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(linked, 0);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_blocked_update_times_out_and_rolls_back() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;

        let mut lock = app.pool.begin().await.unwrap();
        sqlx::query("SELECT id FROM films WHERE id = 1 FOR UPDATE")
            .execute(&mut *lock)
            .await
            .unwrap();

        let impatient = FilmRepository::new(app.pool.clone())
            .with_query_timeout(Duration::from_millis(200));
        let mut heat = impatient.get(1).await.unwrap();
        heat.genres = names(&["Drama"]);

        let err = impatient.update(&heat).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::StorageFailure(StorageFailure::TimedOut(_))
        ));

        lock.rollback().await.unwrap();

        let stored = app.repos.catalog.films.get(1).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.genres, names(&["Crime", "Thriller"]));
    }
}

mod test_listing {
    use super::*;

    fn filters() -> Filters {
        Filters::new(FILM_SORT_SAFELIST)
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_filters_match_any_within_and_all_across_dimensions() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;
        let films = &app.repos.catalog.films;

        let query = FilmQuery {
            genres: names(&["Drama", "Comedy"]),
            ..FilmQuery::default()
        };
        let (found, metadata) = films.get_all(&query, &filters()).await.unwrap();
        assert_eq!(
            found.iter().map(|f| f.title.as_str()).collect::<Vec<_>>(),
            vec!["The Godfather", "Amelie"]
        );
        assert_eq!(metadata.total_records, 2);

        let query = FilmQuery {
            genres: names(&["Thriller"]),
            directors: names(&["Michael Mann"]),
            actors: names(&["Al Pacino"]),
            ..FilmQuery::default()
        };
        let (found, _) = films.get_all(&query, &filters()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Heat");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_title_search() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;

        let query = FilmQuery {
            title: "GODFATHER".to_string(),
            ..FilmQuery::default()
        };
        let (found, _) = app.repos.catalog.films.get_all(&query, &filters()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].year, 1972);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_sort_and_paging_metadata() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;

        let filters = filters().with_sort(["-year"]).with_page(2, 3);
        let (found, metadata) = app
            .repos
            .catalog
            .films
            .get_all(&FilmQuery::default(), &filters)
            .await
            .unwrap();

        assert_eq!(found.iter().map(|f| f.year).collect::<Vec<_>>(), vec![1972]);
        assert_eq!(metadata.current_page, 2);
        assert_eq!(metadata.last_page, 2);
        assert_eq!(metadata.total_records, 4);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_empty_result_has_zero_metadata() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;

        let query = FilmQuery {
            actors: names(&["Nobody"]),
            ..FilmQuery::default()
        };
        let (found, metadata) = app.repos.catalog.films.get_all(&query, &filters()).await.unwrap();
        assert!(found.is_empty());
        assert_eq!(metadata, Metadata::default());
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_page_past_end_has_zero_metadata() {
        let app = TestApp::new().await.unwrap();
        seed(&app).await;

        let filters = filters().with_page(5, 2);
        let (found, metadata) = app
            .repos
            .catalog
            .films
            .get_all(&FilmQuery::default(), &filters)
            .await
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(metadata, Metadata::default());
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    #[serial]
    async fn test_unknown_sort_is_rejected_before_querying() {
        let app = TestApp::new().await.unwrap();

        let filters = filters().with_sort(["title", "title; DROP TABLE films"]);
        let err = app
            .repos
            .catalog
            .films
            .get_all(&FilmQuery::default(), &filters)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidSort(_)));
        assert_eq!(app.count_rows("films").await.unwrap(), 0);
    }
}
