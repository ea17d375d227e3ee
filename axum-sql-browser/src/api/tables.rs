//! Table listing, schema, description and reload endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use super::error_response;
use crate::browser::Browser;
use crate::database::DatabaseProvider;
use crate::schema::DescriptionRequest;

/// Handler for GET /api/tables
///
/// Returns every table of the published graph with its row count (when
/// known), description and the engine's supported features.
pub async fn list_tables_handler<DB: DatabaseProvider>(
    State(browser): State<Arc<Browser<DB>>>,
) -> Response {
    (StatusCode::OK, Json(browser.list_tables())).into_response()
}

/// Handler for GET /api/tables/{name}
///
/// Returns the schema information for a specific table including columns,
/// primary key, outbound and inbound foreign keys, indexes and peek columns.
///
/// # Arguments
///
/// * `browser` - Browser service from state
/// * `table_name` - `schema.table` or bare table name
pub async fn get_table_schema_handler<DB: DatabaseProvider>(
    State(browser): State<Arc<Browser<DB>>>,
    Path(table_name): Path<String>,
) -> Response {
    match browser.table_schema(&table_name) {
        Ok(schema) => (StatusCode::OK, Json(schema)).into_response(),
        Err(error) => error_response(
            &format!("Failed to get schema for table '{}'", table_name),
            error,
        ),
    }
}

/// Handler for PUT /api/tables/{name}/description
///
/// Sets the description of the table, or of one of its columns when the
/// body names a column. Only engines with description support accept this.
pub async fn set_description_handler<DB: DatabaseProvider>(
    State(browser): State<Arc<Browser<DB>>>,
    Path(table_name): Path<String>,
    Json(request): Json<DescriptionRequest>,
) -> Response {
    let result = match &request.column {
        Some(column) => browser.set_column_description(&table_name, column, request.description),
        None => browser.set_table_description(&table_name, request.description),
    };

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(
            &format!("Failed to set description on '{}'", table_name),
            error,
        ),
    }
}

/// Handler for POST /api/reload
///
/// Reloads the schema from the engine catalog and answers with the new
/// table list. A failed reload keeps the previous schema.
pub async fn reload_handler<DB: DatabaseProvider>(
    State(browser): State<Arc<Browser<DB>>>,
) -> Response {
    match browser.reload().await {
        Ok(_) => (StatusCode::OK, Json(browser.list_tables())).into_response(),
        Err(error) => error_response("Failed to reload schema", error),
    }
}
