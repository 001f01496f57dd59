//! Validation helpers and constants for catalog entities

use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;

lazy_static::lazy_static! {
    /// Poster image URL validation regex
    /// http(s) host followed by a path ending in a known image extension,
    /// optionally with a query string
    pub static ref IMAGE_URL_REGEX: Regex = Regex::new(
        r"^https?://([\da-z.-]+\.[a-z.]{2,6})([/\w .-]*)\.(jpg|jpeg|png|gif|bmp|svg|webp)(\?.*)?$"
    )
    .unwrap();
}

/// Validate a poster image URL
pub fn validate_image_url(url: &str) -> bool {
    IMAGE_URL_REGEX.is_match(url)
}

/// True when no value appears twice
pub fn has_unique_values<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|value| seen.insert(value))
}
