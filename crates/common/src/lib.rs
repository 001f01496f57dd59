//! Shared utilities, configuration, and error handling for Reelbase
//!
//! This crate provides common functionality used across the Reelbase workspace:
//! - Configuration management following 12-factor principles
//! - Application and repository error types
//! - The query filter builder (sort safelists, pagination, page metadata)

pub mod config;
pub mod db;
pub mod error;
pub mod filters;

pub use db::{is_unique_violation, with_timeout, RepositoryError, StorageFailure};
pub use error::{Error, Result};
pub use filters::{
    build_metadata, build_order_clause, build_page, FilterParams, Filters, Metadata, SortDirection,
    SortKey,
};
