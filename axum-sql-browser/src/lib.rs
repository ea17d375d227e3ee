//! # axum-sql-browser
//!
//! A development tool for browsing relational databases by following their
//! foreign keys, easily integrable as an Axum layer.
//!
//! ## Features
//!
//! - Schema graph of tables, columns, primary keys, foreign keys and indexes,
//!   navigable in both directions
//! - Peek columns: preview values of referenced rows next to each foreign key
//! - Counts of referencing rows for every inbound foreign key
//! - Equality filters, multi-column sorting and paging
//! - Support for SQLite and PostgreSQL
//!
//! ## Security Warning
//!
//! **This is a development tool only!**
//!
//! - No authentication/authorization built-in
//! - Exposes full database schema and data
//! - Should never be exposed in production or public networks
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use axum_sql_browser::{BrowserConfig, SqlBrowserLayer};
//! use sqlx::SqlitePool;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = SqlitePool::connect("sqlite::memory:").await?;
//!     let config = BrowserConfig::default().with_peek_columns("customers", ["name"]);
//!
//!     let app: Router = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(SqlBrowserLayer::sqlite(pool, config).await?.into_router());
//!
//!     // Serve the application...
//!     Ok(())
//! }
//! ```

// Public modules
pub mod api;
pub mod browser;
pub mod config;
pub mod convert;
pub mod database;
pub mod graph;
pub mod layer;
pub mod layout;
pub mod query;
pub mod schema;

#[cfg(test)]
mod test_support;

// Public exports
pub use browser::Browser;
pub use config::BrowserConfig;
pub use graph::{Database, SchemaError, SupportedFeatures};
pub use layer::SqlBrowserLayer;
pub use schema::{ColumnInfo, ForeignKey, IndexInfo, RowRequest, RowsResponse, TableSchema};

// Re-export database providers
pub use database::{DatabaseError, DatabaseProvider};

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
pub use database::postgres::PostgresProvider;
