//! Database provider trait
//!
//! This trait defines the interface that all engine adapters must provide:
//! loading the schema graph from the engine catalog and executing statements
//! produced by the query builder.

use crate::convert::RawValue;
use crate::graph::{Database, SchemaError};
use crate::layout::RowShapeError;
use crate::query::{BuiltQuery, Dialect};
use async_trait::async_trait;
use thiserror::Error;

/// Database provider trait for schema discovery and data access
///
/// Implementations of this trait provide engine-specific catalog loading,
/// SQL dialect and row decoding.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// Short engine name used in logs
    fn engine_name(&self) -> &'static str;

    /// SQL spelling used when building statements for this engine
    fn dialect(&self) -> &'static dyn Dialect;

    /// Load the complete schema graph
    ///
    /// Tables and columns are loaded first; keys and indexes are then
    /// resolved against them. Any unresolvable reference fails the load.
    ///
    /// # Returns
    ///
    /// A fully built graph, not yet published
    async fn load_schema(&self) -> Result<Database, DatabaseError>;

    /// Execute a row statement
    ///
    /// # Arguments
    ///
    /// * `query` - Statement and bound values from the query builder
    ///
    /// # Returns
    ///
    /// Every result row as raw values, in select-list order
    async fn fetch_rows(&self, query: &BuiltQuery) -> Result<Vec<Vec<RawValue>>, DatabaseError>;

    /// Execute a `SELECT COUNT(*)` statement
    async fn fetch_count(&self, query: &BuiltQuery) -> Result<u64, DatabaseError>;
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Generic database error
    #[error("Database error: {0}")]
    Query(String),

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Invalid column name
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// Malformed request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Engine metadata could not be turned into a schema graph
    #[error("Schema load failed: {0}")]
    Schema(#[from] SchemaError),

    /// A result row did not match the planned layout
    #[error(transparent)]
    RowShape(#[from] RowShapeError),

    /// The engine lacks a capability the operation needs
    #[error("Not supported by this database: {0}")]
    Unsupported(String),

    /// Query timeout
    #[error("Query timeout exceeded")]
    Timeout,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::Query(error.to_string())
    }
}
