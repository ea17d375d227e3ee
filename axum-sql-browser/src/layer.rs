//! SqlBrowserLayer - Main Axum integration layer
//!
//! This module provides the main entry point for integrating axum-sql-browser
//! into an Axum application.

use crate::api::create_api_router;
use crate::browser::Browser;
use crate::config::BrowserConfig;
use crate::database::{DatabaseError, DatabaseProvider};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
use crate::database::postgres::PostgresProvider;

/// Main layer for integrating the SQL browser into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_sql_browser::{BrowserConfig, SqlBrowserLayer};
/// use sqlx::SqlitePool;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite::memory:").await?;
/// let browser = SqlBrowserLayer::sqlite(pool, BrowserConfig::default()).await?;
/// let app: Router = Router::new().merge(browser.into_router());
/// # Ok(())
/// # }
/// ```
pub struct SqlBrowserLayer<DB: DatabaseProvider> {
    base_path: String,
    browser: Arc<Browser<DB>>,
}

impl<DB: DatabaseProvider> SqlBrowserLayer<DB> {
    /// Wrap a connected browser; the API is mounted under its configured base path
    pub fn new(browser: Browser<DB>) -> Self {
        Self {
            base_path: browser.config().base_path.clone(),
            browser: Arc::new(browser),
        }
    }

    /// Load the schema through `provider` and wrap the resulting browser
    pub async fn connect(provider: DB, config: BrowserConfig) -> Result<Self, DatabaseError> {
        Ok(Self::new(Browser::connect(provider, config).await?))
    }

    /// Shared handle to the browser, e.g. to trigger reloads from elsewhere
    pub fn browser(&self) -> Arc<Browser<DB>> {
        self.browser.clone()
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router serves the API endpoints at `{base_path}/api/*`
    /// with permissive CORS middleware for development.
    pub fn into_router(self) -> Router {
        let api_router = create_api_router(self.browser);

        Router::new()
            .nest(&format!("{}/api", self.base_path.trim_end_matches('/')), api_router)
            .layer(
                CorsLayer::permissive(), // Permissive CORS for development
            )
    }
}

#[cfg(feature = "sqlite")]
impl SqlBrowserLayer<SqliteProvider> {
    /// Create a new SQL browser for SQLite
    ///
    /// # Arguments
    ///
    /// * `pool` - The SQLite connection pool
    /// * `config` - Browser settings, including the mount path
    pub async fn sqlite(
        pool: sqlx::SqlitePool,
        config: BrowserConfig,
    ) -> Result<Self, DatabaseError> {
        Self::connect(SqliteProvider::new(pool), config).await
    }
}

#[cfg(feature = "postgres")]
impl SqlBrowserLayer<PostgresProvider> {
    /// Create a new SQL browser for PostgreSQL
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    /// * `config` - Browser settings, including the mount path
    pub async fn postgres(pool: sqlx::PgPool, config: BrowserConfig) -> Result<Self, DatabaseError> {
        Self::connect(PostgresProvider::new(pool), config).await
    }
}
