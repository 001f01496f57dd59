//! Domain entities for the catalog domain
//!
//! Films own their genre/actor/director associations; the reference rows
//! themselves are shared, append-only data addressed by name.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::validation::{has_unique_values, validate_image_url};
use reelbase_common::{Error, Result};

/// Minimum number of genres a film carries
pub const MIN_GENRES: usize = 1;

/// Maximum number of genres a film carries
pub const MAX_GENRES: usize = 5;

/// Maximum title length in bytes
const MAX_TITLE_BYTES: usize = 500;

/// Year of the earliest surviving motion picture
const EARLIEST_FILM_YEAR: i32 = 1888;

/// Sort tokens accepted by film listings
pub const FILM_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "rating", "-id", "-title", "-year", "-runtime", "-rating",
];

/// Film runtime in whole minutes.
///
/// Serializes as `"<n> mins"` and parses only that shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Runtime(pub i32);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid format for runtime: expected \"<minutes> mins\", got {0:?}")]
pub struct RuntimeParseError(String);

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl FromStr for Runtime {
    type Err = RuntimeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || RuntimeParseError(s.to_string());
        match s.split(' ').collect::<Vec<_>>().as_slice() {
            [minutes, "mins"] => minutes.parse().map(Runtime).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Kinds of shared reference data a film links to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Genre,
    Actor,
    Director,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 3] = [
        ReferenceKind::Genre,
        ReferenceKind::Actor,
        ReferenceKind::Director,
    ];

    /// Table holding the reference rows
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Genre => "genres",
            ReferenceKind::Actor => "actors",
            ReferenceKind::Director => "directors",
        }
    }

    /// Junction table linking films to this kind
    pub fn junction_table(self) -> &'static str {
        match self {
            ReferenceKind::Genre => "film_genres",
            ReferenceKind::Actor => "film_actors",
            ReferenceKind::Director => "film_directors",
        }
    }

    /// Foreign key column in the junction table
    pub fn junction_column(self) -> &'static str {
        match self {
            ReferenceKind::Genre => "genre_id",
            ReferenceKind::Actor => "actor_id",
            ReferenceKind::Director => "director_id",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Genre => write!(f, "genre"),
            ReferenceKind::Actor => write!(f, "actor"),
            ReferenceKind::Director => write!(f, "director"),
        }
    }
}

/// A reference row: a stable id for a unique name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResolvedReference {
    pub id: i64,
    pub name: String,
}

/// Film aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Film {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub rating: f32,
    pub description: String,
    #[serde(rename = "image")]
    #[sqlx(rename = "image")]
    pub image_url: String,
    pub version: i32,
}

/// Payload for creating a film
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilmInput {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "image")]
    pub image_url: String,
}

/// Partial update payload; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilmPatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
    pub directors: Option<Vec<String>>,
    pub actors: Option<Vec<String>>,
    pub rating: Option<f32>,
    pub description: Option<String>,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
}

impl Film {
    /// Create an unsaved film; the store assigns `id` and `version`
    pub fn new(input: FilmInput) -> Result<Self> {
        let film = Film {
            id: 0,
            title: input.title,
            year: input.year,
            runtime: input.runtime,
            genres: input.genres,
            directors: input.directors,
            actors: input.actors,
            rating: input.rating,
            description: input.description,
            image_url: input.image_url,
            version: 0,
        };
        film.validate()?;
        Ok(film)
    }

    /// Apply a partial update read at `self.version`.
    ///
    /// The version is left untouched; the store bumps it on a successful write.
    pub fn apply(&mut self, patch: FilmPatch) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(year) = patch.year {
            self.year = year;
        }
        if let Some(runtime) = patch.runtime {
            self.runtime = runtime;
        }
        if let Some(genres) = patch.genres {
            self.genres = genres;
        }
        if let Some(directors) = patch.directors {
            self.directors = directors;
        }
        if let Some(actors) = patch.actors {
            self.actors = actors;
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        self.validate()
    }

    /// Validate film invariants
    pub fn validate(&self) -> Result<()> {
        if self.title.is_empty() {
            return Err(Error::Validation("title: must be provided".to_string()));
        }
        if self.title.len() > MAX_TITLE_BYTES {
            return Err(Error::Validation(format!(
                "title: must not be more than {} bytes long",
                MAX_TITLE_BYTES
            )));
        }

        if self.year < EARLIEST_FILM_YEAR {
            return Err(Error::Validation(format!(
                "year: must be greater than or equal to {}",
                EARLIEST_FILM_YEAR
            )));
        }
        if self.year > Utc::now().year() {
            return Err(Error::Validation(
                "year: must not be in the future".to_string(),
            ));
        }

        if self.runtime.0 <= 0 {
            return Err(Error::Validation(
                "runtime: must be a positive integer".to_string(),
            ));
        }

        if self.genres.len() < MIN_GENRES {
            return Err(Error::Validation(
                "genres: must contain at least 1 genre".to_string(),
            ));
        }
        if self.genres.len() > MAX_GENRES {
            return Err(Error::Validation(format!(
                "genres: must not contain more than {} genres",
                MAX_GENRES
            )));
        }
        if !has_unique_values(&self.genres) {
            return Err(Error::Validation(
                "genres: must not contain duplicate values".to_string(),
            ));
        }

        for kind in ReferenceKind::ALL {
            if self.names(kind).iter().any(|name| name.trim().is_empty()) {
                return Err(Error::Validation(format!(
                    "{}s: names must not be blank",
                    kind
                )));
            }
        }

        if !validate_image_url(&self.image_url) {
            return Err(Error::Validation("image: must be a URL".to_string()));
        }

        Ok(())
    }

    /// Names linked to this film for one reference kind
    pub fn names(&self, kind: ReferenceKind) -> &[String] {
        match kind {
            ReferenceKind::Genre => &self.genres,
            ReferenceKind::Actor => &self.actors,
            ReferenceKind::Director => &self.directors,
        }
    }

    pub fn names_mut(&mut self, kind: ReferenceKind) -> &mut Vec<String> {
        match kind {
            ReferenceKind::Genre => &mut self.genres,
            ReferenceKind::Actor => &mut self.actors,
            ReferenceKind::Director => &mut self.directors,
        }
    }
}

/// Attribute filters for film listings.
///
/// Within one dimension a film matches if it has any of the names; across
/// dimensions all non-empty filters must match. Empty filters match all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilmQuery {
    pub title: String,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

impl FilmQuery {
    pub fn names(&self, kind: ReferenceKind) -> &[String] {
        match kind {
            ReferenceKind::Genre => &self.genres,
            ReferenceKind::Actor => &self.actors,
            ReferenceKind::Director => &self.directors,
        }
    }
}
