//! Core data models for the bootcamp directory.
//!
//! Rows map to the `bootcamps` table via `sqlx::FromRow` and serialize as
//! camelCase JSON via `serde`.

pub mod bootcamp;
pub mod geo;
pub mod response;
