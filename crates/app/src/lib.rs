//! Reelbase composition root
//!
//! Owns the connection pool and hands out repositories built on it.

pub mod database;
pub mod seed;

pub use database::{Database, Repositories};
pub use seed::{load_seed_file, seed_films};
