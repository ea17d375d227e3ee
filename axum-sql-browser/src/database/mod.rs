//! Engine adapters
//!
//! Each adapter loads the schema graph from its engine's catalog, names the
//! SQL dialect for the query builder and executes the built statements.

pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-export the main trait
pub use traits::{DatabaseError, DatabaseProvider};
