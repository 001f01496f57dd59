//! Domain entities for the watchlist domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use reelbase_catalog::Film;
use reelbase_common::{Error, Result};

/// Priority given to entries created without one
pub const DEFAULT_PRIORITY: i32 = 5;

const MIN_PRIORITY: i32 = 1;
const MAX_PRIORITY: i32 = 10;
const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 10;
const MAX_NOTES_CHARS: usize = 1000;

/// Sort tokens accepted by watchlist listings
pub const WATCHLIST_SORT_SAFELIST: &[&str] = &[
    "id",
    "added_at",
    "priority",
    "rating",
    "watched_at",
    "-id",
    "-added_at",
    "-priority",
    "-rating",
    "-watched_at",
];

/// One film on one user's watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchlistEntry {
    pub id: i64,
    pub user_id: i64,
    pub film_id: i64,
    /// The referenced film, filled in on reads
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[sqlx(skip)]
    pub film: Option<Film>,
    pub added_at: DateTime<Utc>,
    pub notes: String,
    pub priority: i32,
    pub watched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    pub version: i32,
}

/// Payload for adding a film to a watchlist
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewWatchlistEntry {
    pub film_id: i64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub rating: Option<i32>,
}

/// Partial update payload.
///
/// `rating` distinguishes absent (`None`) from an explicit `null`
/// (`Some(None)`), which clears the rating.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WatchlistPatch {
    pub notes: Option<String>,
    pub priority: Option<i32>,
    pub watched: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub rating: Option<Option<i32>>,
}

fn deserialize_present<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl WatchlistEntry {
    /// Create an unsaved entry for `user_id`.
    ///
    /// A zero priority becomes [`DEFAULT_PRIORITY`]. A rating implies the film
    /// was watched; watched entries are stamped with `now`.
    pub fn new(user_id: i64, input: NewWatchlistEntry, now: DateTime<Utc>) -> Result<Self> {
        let priority = if input.priority == 0 {
            DEFAULT_PRIORITY
        } else {
            input.priority
        };
        let watched = input.watched || input.rating.is_some();

        let entry = WatchlistEntry {
            id: 0,
            user_id,
            film_id: input.film_id,
            film: None,
            added_at: now,
            notes: input.notes,
            priority,
            watched,
            watched_at: watched.then_some(now),
            rating: input.rating,
            version: 0,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Apply a partial update read at `self.version`.
    pub fn apply(&mut self, patch: WatchlistPatch, now: DateTime<Utc>) -> Result<()> {
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }

        match patch.watched {
            Some(false) => {
                if matches!(patch.rating, Some(Some(_))) {
                    return Err(Error::Validation(
                        "rating: cannot rate a film marked as unwatched".to_string(),
                    ));
                }
                self.mark_unwatched();
            }
            Some(true) => self.mark_watched(now),
            None => {}
        }

        match patch.rating {
            Some(Some(rating)) => {
                self.mark_watched(now);
                self.rating = Some(rating);
            }
            Some(None) => self.rating = None,
            None => {}
        }

        self.validate()
    }

    fn mark_watched(&mut self, now: DateTime<Utc>) {
        if !self.watched || self.watched_at.is_none() {
            self.watched = true;
            self.watched_at = Some(now);
        }
    }

    fn mark_unwatched(&mut self) {
        self.watched = false;
        self.watched_at = None;
        self.rating = None;
    }

    /// Validate entry invariants
    pub fn validate(&self) -> Result<()> {
        if self.film_id <= 0 {
            return Err(Error::Validation(
                "film_id: must be provided and greater than 0".to_string(),
            ));
        }

        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(Error::Validation(format!(
                "priority: must be between {} and {}",
                MIN_PRIORITY, MAX_PRIORITY
            )));
        }

        if self.notes.chars().count() > MAX_NOTES_CHARS {
            return Err(Error::Validation(format!(
                "notes: must not be more than {} characters long",
                MAX_NOTES_CHARS
            )));
        }

        if let Some(rating) = self.rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(Error::Validation(format!(
                    "rating: must be between {} and {}",
                    MIN_RATING, MAX_RATING
                )));
            }
            if !self.watched {
                return Err(Error::Validation(
                    "rating: only watched films can be rated".to_string(),
                ));
            }
        }

        if self.watched != self.watched_at.is_some() {
            return Err(Error::Validation(
                "watched_at: must be set exactly when the film is watched".to_string(),
            ));
        }

        Ok(())
    }
}

/// Optional filters for watchlist listings; `None` matches every entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchlistQuery {
    pub watched: Option<bool>,
    pub priority: Option<i32>,
}
