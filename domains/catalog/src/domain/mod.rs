//! Catalog domain types

pub mod entities;
pub mod validation;
