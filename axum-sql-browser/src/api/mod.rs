//! REST API endpoints
//!
//! This module contains all API endpoint handlers for the SQL browser.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::browser::Browser;
use crate::database::{DatabaseError, DatabaseProvider};

pub mod rows;
pub mod tables;

// Re-export handlers for convenience
pub use rows::{count_rows_handler, get_rows_handler};
pub use tables::{
    get_table_schema_handler, list_tables_handler, reload_handler, set_description_handler,
};

/// Create the API router with all endpoints
///
/// # Arguments
///
/// * `browser` - Shared browser service used as router state
///
/// # Returns
///
/// An Axum Router configured with all API routes
pub fn create_api_router<DB: DatabaseProvider>(browser: Arc<Browser<DB>>) -> Router {
    // Axum 0.8 uses {param} syntax instead of :param
    Router::new()
        .route("/tables", get(list_tables_handler::<DB>))
        .route("/tables/{name}", get(get_table_schema_handler::<DB>))
        .route("/tables/{name}/rows", get(get_rows_handler::<DB>))
        .route("/tables/{name}/count", get(count_rows_handler::<DB>))
        .route("/tables/{name}/description", put(set_description_handler::<DB>))
        .route("/reload", post(reload_handler::<DB>))
        .with_state(browser)
}

/// HTTP status for a failed browser operation
pub(crate) fn status_for(error: &DatabaseError) -> StatusCode {
    match error {
        DatabaseError::TableNotFound(_) => StatusCode::NOT_FOUND,
        DatabaseError::InvalidColumn(_)
        | DatabaseError::InvalidRequest(_)
        | DatabaseError::Unsupported(_) => StatusCode::BAD_REQUEST,
        DatabaseError::Timeout => StatusCode::REQUEST_TIMEOUT,
        DatabaseError::Query(_) | DatabaseError::Schema(_) | DatabaseError::RowShape(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Log a failure and render it as `{"error": ...}`
pub(crate) fn error_response(context: &str, error: DatabaseError) -> Response {
    tracing::error!(%error, "{}", context);
    (
        status_for(&error),
        Json(serde_json::json!({
            "error": error.to_string()
        })),
    )
        .into_response()
}
