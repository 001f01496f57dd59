//! Query filter building for list endpoints
//!
//! Turns untrusted page/sort parameters into the fragments a repository embeds
//! in a parameterized statement: an ORDER BY list built only from safelist
//! entries, a LIMIT/OFFSET pair, and the page metadata returned alongside the
//! rows. Nothing here executes a query.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::RepositoryError;
use crate::Error;

/// Largest page number a caller may request
pub const MAX_PAGE: i64 = 10_000_000;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A sort token resolved against a safelist.
///
/// `column` always borrows from the safelist entry, never from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl SortKey {
    /// Look up `token` verbatim in `safelist`.
    pub fn resolve(token: &str, safelist: &[&'static str]) -> Result<Self, RepositoryError> {
        let entry = safelist
            .iter()
            .copied()
            .find(|candidate| *candidate == token)
            .ok_or_else(|| RepositoryError::InvalidSort(token.to_string()))?;

        Ok(match entry.strip_prefix('-') {
            Some(column) => SortKey {
                column,
                direction: SortDirection::Desc,
            },
            None => SortKey {
                column: entry,
                direction: SortDirection::Asc,
            },
        })
    }
}

/// Build the ORDER BY list for the requested tokens, in caller order.
///
/// Any token outside the safelist rejects the whole request.
pub fn build_order_clause<S: AsRef<str>>(
    tokens: &[S],
    safelist: &[&'static str],
) -> Result<String, RepositoryError> {
    let keys = tokens
        .iter()
        .map(|token| SortKey::resolve(token.as_ref(), safelist))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keys
        .iter()
        .map(|key| format!("{} {}", key.column, key.direction.as_sql()))
        .collect::<Vec<_>>()
        .join(","))
}

/// LIMIT and OFFSET for an already range-checked page request
pub fn build_page(page: i64, page_size: i64) -> (i64, i64) {
    (page_size, (page - 1) * page_size)
}

/// Page metadata returned alongside list results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

pub fn build_metadata(total_records: i64, page: i64, page_size: i64) -> Metadata {
    if total_records == 0 {
        return Metadata::default();
    }

    Metadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: (total_records + page_size - 1) / page_size,
        total_records,
    }
}

/// Request-scoped paging and sorting parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: Vec<String>,
    pub sort_safelist: &'static [&'static str],
}

impl Filters {
    /// First page, default page size, no explicit sort
    pub fn new(sort_safelist: &'static [&'static str]) -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
            sort_safelist,
        }
    }

    pub fn with_page(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_sort<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_clause(&self) -> Result<String, RepositoryError> {
        build_order_clause(&self.sort, self.sort_safelist)
    }

    /// Resolved sort keys, for stores that sort in memory
    pub fn sort_keys(&self) -> Result<Vec<SortKey>, RepositoryError> {
        self.sort
            .iter()
            .map(|token| SortKey::resolve(token, self.sort_safelist))
            .collect()
    }

    pub fn limit(&self) -> i64 {
        build_page(self.page, self.page_size).0
    }

    pub fn offset(&self) -> i64 {
        build_page(self.page, self.page_size).1
    }

    pub fn metadata(&self, total_records: i64) -> Metadata {
        build_metadata(total_records, self.page, self.page_size)
    }
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Paging parameters as they arrive on a query string.
///
/// `sort` is a comma-separated token list, e.g. `-year,title`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FilterParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 10_000_000, message = "must be between 1 and 10 million"))]
    pub page: i64,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub page_size: i64,

    #[serde(default)]
    pub sort: Option<String>,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            sort: None,
        }
    }
}

impl FilterParams {
    /// Range-check the page parameters and bind them to a resource safelist.
    ///
    /// Sort tokens are only split here; safelist membership is enforced when
    /// the repository builds its ORDER BY.
    pub fn into_filters(self, sort_safelist: &'static [&'static str]) -> crate::Result<Filters> {
        self.validate()
            .map_err(|e| Error::Validation(format!("Validation failed: {}", e)))?;

        let sort = self
            .sort
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Filters {
            page: self.page,
            page_size: self.page_size,
            sort,
            sort_safelist,
        })
    }
}
