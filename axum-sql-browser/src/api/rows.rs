//! Row fetching endpoints with pagination

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use super::error_response;
use crate::browser::Browser;
use crate::database::DatabaseProvider;
use crate::schema::{CountResponse, RowRequest};

/// Handler for GET /api/tables/{name}/rows
///
/// Fetches one page of a table with peek values through its foreign keys
/// and counts of referencing rows.
///
/// Query parameters:
/// - offset: Starting row offset (default: 0)
/// - limit: Maximum rows to return (default and maximum from the config)
/// - sort: Comma separated column names, `-name` for descending
/// - any other key: equality filter on that column; repeating the key adds
///   values, of which only the first is applied
pub async fn get_rows_handler<DB: DatabaseProvider>(
    State(browser): State<Arc<Browser<DB>>>,
    Path(table_name): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let result = match RowRequest::from_query_pairs(pairs) {
        Ok(request) => browser.rows(&table_name, request).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error_response(
            &format!("Failed to get rows from table '{}'", table_name),
            error,
        ),
    }
}

/// Handler for GET /api/tables/{name}/count
///
/// Returns the row count for a table with the same filter parameters as
/// the rows endpoint. Paging and sort parameters are ignored.
pub async fn count_rows_handler<DB: DatabaseProvider>(
    State(browser): State<Arc<Browser<DB>>>,
    Path(table_name): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let result = match RowRequest::from_query_pairs(pairs) {
        Ok(request) => browser.count_rows(&table_name, &request).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(count) => (StatusCode::OK, Json(CountResponse { count })).into_response(),
        Err(error) => error_response(
            &format!("Failed to count rows from table '{}'", table_name),
            error,
        ),
    }
}
