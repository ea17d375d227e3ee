//! Browsing service over one database connection
//!
//! [`Browser`] owns the engine adapter and the published schema graph. Every
//! request works on a snapshot of the graph, so a reload never changes the
//! tables a request is in the middle of reading.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BrowserConfig;
use crate::database::{DatabaseError, DatabaseProvider};
use crate::graph::{Column, Database, SchemaError, SchemaStore, Table};
use crate::layout::{decode_row, Layout};
use crate::query::{build_count_query, build_query, Filter, QueryParams, SortColumn};
use crate::schema::{
    FilterTerm, InboundInfo, PeekColumnInfo, RowRequest, RowView, RowsResponse, TableInfo,
    TableSchema, TablesResponse,
};

/// Schema graph plus row access for one database
pub struct Browser<DB: DatabaseProvider> {
    provider: Arc<DB>,
    config: BrowserConfig,
    store: SchemaStore,
}

impl<DB: DatabaseProvider> Browser<DB> {
    /// Load the schema and publish it
    pub async fn connect(provider: DB, config: BrowserConfig) -> Result<Self, DatabaseError> {
        let database = load_database(&provider, &config).await?;
        Ok(Self {
            provider: Arc::new(provider),
            config,
            store: SchemaStore::new(database),
        })
    }

    /// Rebuild the schema graph from the engine catalog and publish it
    ///
    /// On failure the previous graph stays published.
    pub async fn reload(&self) -> Result<Arc<Database>, DatabaseError> {
        let database = load_database(self.provider.as_ref(), &self.config).await?;
        self.store.replace(database);
        Ok(self.store.snapshot())
    }

    /// The currently published graph
    pub fn schema(&self) -> Arc<Database> {
        self.store.snapshot()
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn provider(&self) -> &DB {
        &self.provider
    }

    pub fn list_tables(&self) -> TablesResponse {
        let database = self.store.snapshot();
        TablesResponse {
            tables: database
                .tables()
                .iter()
                .map(|table| TableInfo {
                    name: table.qualified_name(),
                    row_count: table.row_count(),
                    description: table.description(),
                })
                .collect(),
            features: database.features(),
        }
    }

    pub fn table_schema(&self, path: &str) -> Result<TableSchema, DatabaseError> {
        let database = self.store.snapshot();
        let table = resolve_table(&database, path)?;
        Ok(TableSchema::from_table(&database, table))
    }

    /// Fetch one page of `path` with peek values and inbound counts
    pub async fn rows(&self, path: &str, request: RowRequest) -> Result<RowsResponse, DatabaseError> {
        let database = self.store.snapshot();
        let table = resolve_table(&database, path)?;
        let limit = self.config.page_size(request.limit);
        let params = resolve_params(table, &request, limit)?;

        let layout = Layout::build(&database, table);
        let dialect = self.provider.dialect();
        let query = build_query(dialect, &database, table, &params, &layout);
        let raw_rows = self.with_timeout(self.provider.fetch_rows(&query)).await?;

        let rows = raw_rows
            .iter()
            .map(|raw| {
                let decoded = decode_row(&database, &layout, raw)?;
                Ok(RowView {
                    values: decoded.base(&layout).to_vec(),
                    peeks: layout
                        .peek_slots()
                        .iter()
                        .map(|slot| decoded.peek(&layout, slot.fk, slot.column).map(str::to_string))
                        .collect(),
                    inbound_counts: layout
                        .inbound_fks()
                        .iter()
                        .map(|fk| decoded.inbound_count(&layout, *fk))
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let total = self.count(table, &filter_params(&params)).await?;
        let table_total = if has_active_filters(&params) {
            self.count(table, &QueryParams::default()).await?
        } else {
            total
        };
        table.set_row_count(table_total);

        tracing::debug!(
            table = %table.qualified_name(),
            rows = rows.len(),
            total,
            "Fetched rows"
        );

        Ok(RowsResponse {
            table: table.qualified_name(),
            columns: table
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect(),
            peek_columns: layout
                .peek_slots()
                .iter()
                .map(|slot| {
                    let fk = database.fk(slot.fk);
                    let destination = database.table(fk.destination_table());
                    PeekColumnInfo {
                        foreign_key: fk.name().to_string(),
                        via_columns: fk
                            .source_columns()
                            .iter()
                            .map(|position| table.columns()[*position].name().to_string())
                            .collect(),
                        table: destination.qualified_name(),
                        column: database.column(slot.column).name().to_string(),
                    }
                })
                .collect(),
            inbound: layout
                .inbound_fks()
                .iter()
                .map(|fk| {
                    let fk = database.fk(*fk);
                    let source = database.table(fk.source_table());
                    InboundInfo {
                        foreign_key: fk.name().to_string(),
                        table: source.qualified_name(),
                        columns: fk
                            .source_columns()
                            .iter()
                            .map(|position| source.columns()[*position].name().to_string())
                            .collect(),
                    }
                })
                .collect(),
            has_more: request.offset + (rows.len() as u64) < total,
            rows,
            total,
            table_total,
            offset: request.offset,
            limit,
        })
    }

    /// Count the rows of `path` matching the request's filters
    ///
    /// Without filters this is the table total and also refreshes `RowCount`.
    pub async fn count_rows(&self, path: &str, request: &RowRequest) -> Result<u64, DatabaseError> {
        let database = self.store.snapshot();
        let table = resolve_table(&database, path)?;
        let params = QueryParams {
            filters: resolve_filters(table, &request.filters)?,
            ..QueryParams::default()
        };

        let count = self.count(table, &params).await?;
        if !has_active_filters(&params) {
            table.set_row_count(count);
        }
        Ok(count)
    }

    /// Recount the rows of `path` and store the result as its `RowCount`
    pub async fn refresh_row_count(&self, path: &str) -> Result<u64, DatabaseError> {
        self.count_rows(path, &RowRequest::default()).await
    }

    pub fn set_table_description(
        &self,
        path: &str,
        description: Option<String>,
    ) -> Result<(), DatabaseError> {
        let database = self.store.snapshot();
        require_descriptions(&database)?;
        resolve_table(&database, path)?.set_description(description);
        Ok(())
    }

    pub fn set_column_description(
        &self,
        path: &str,
        column: &str,
        description: Option<String>,
    ) -> Result<(), DatabaseError> {
        let database = self.store.snapshot();
        require_descriptions(&database)?;
        let table = resolve_table(&database, path)?;
        let (_, column) = resolve_column(table, column)?;
        column.set_description(description);
        Ok(())
    }

    async fn count(&self, table: &Table, params: &QueryParams) -> Result<u64, DatabaseError> {
        let query = build_count_query(self.provider.dialect(), table, params);
        self.with_timeout(self.provider.fetch_count(&query)).await
    }

    async fn with_timeout<T>(
        &self,
        operation: impl Future<Output = Result<T, DatabaseError>>,
    ) -> Result<T, DatabaseError> {
        run_with_timeout(self.config.query_timeout_seconds, operation).await
    }
}

async fn run_with_timeout<T>(
    seconds: u64,
    operation: impl Future<Output = Result<T, DatabaseError>>,
) -> Result<T, DatabaseError> {
    if seconds == 0 {
        return operation.await;
    }
    tokio::time::timeout(Duration::from_secs(seconds), operation)
        .await
        .map_err(|_| DatabaseError::Timeout)?
}

/// Load, configure and optionally count a new graph without publishing it
async fn load_database<DB: DatabaseProvider>(
    provider: &DB,
    config: &BrowserConfig,
) -> Result<Database, DatabaseError> {
    let mut database = provider.load_schema().await?;
    apply_peek_columns(&mut database, &config.peek_columns)?;

    if config.count_rows_on_load {
        for table in database.tables() {
            let query = build_count_query(provider.dialect(), table, &QueryParams::default());
            let count =
                run_with_timeout(config.query_timeout_seconds, provider.fetch_count(&query)).await?;
            table.set_row_count(count);
        }
    }

    tracing::info!(
        engine = provider.engine_name(),
        tables = database.tables().len(),
        foreign_keys = database.fks().len(),
        indexes = database.indexes().len(),
        "Loaded schema"
    );

    Ok(database)
}

fn apply_peek_columns(
    database: &mut Database,
    peek_columns: &BTreeMap<String, Vec<String>>,
) -> Result<(), SchemaError> {
    for (path, columns) in peek_columns {
        let table = database
            .find_table_by_path(path)
            .map(Table::id)
            .ok_or_else(|| SchemaError::UnknownTable(path.clone()))?;
        database.set_peek_columns(table, columns)?;
    }
    Ok(())
}

fn require_descriptions(database: &Database) -> Result<(), DatabaseError> {
    if database.features().descriptions {
        Ok(())
    } else {
        Err(DatabaseError::Unsupported("descriptions".to_string()))
    }
}

fn resolve_table<'a>(database: &'a Database, path: &str) -> Result<&'a Table, DatabaseError> {
    database
        .find_table_by_path(path)
        .ok_or_else(|| DatabaseError::TableNotFound(path.to_string()))
}

fn resolve_column<'a>(
    table: &'a Table,
    name: &str,
) -> Result<(usize, &'a Column), DatabaseError> {
    table
        .find_column(name)
        .ok_or_else(|| DatabaseError::InvalidColumn(format!("{}.{}", table.qualified_name(), name)))
}

fn resolve_filters(table: &Table, filters: &[FilterTerm]) -> Result<Vec<Filter>, DatabaseError> {
    filters
        .iter()
        .map(|filter| {
            Ok(Filter {
                column: resolve_column(table, &filter.column)?.0,
                values: filter.values.clone(),
            })
        })
        .collect()
}

/// Turn a by-name request into builder parameters
fn resolve_params(
    table: &Table,
    request: &RowRequest,
    limit: u64,
) -> Result<QueryParams, DatabaseError> {
    let sort = request
        .sort
        .iter()
        .map(|term| {
            Ok(SortColumn {
                column: resolve_column(table, &term.column)?.0,
                order: term.order,
            })
        })
        .collect::<Result<Vec<_>, DatabaseError>>()?;

    Ok(QueryParams {
        filters: resolve_filters(table, &request.filters)?,
        sort,
        row_limit: limit,
        skip_rows: request.offset,
    })
}

fn filter_params(params: &QueryParams) -> QueryParams {
    QueryParams {
        filters: params.filters.clone(),
        ..QueryParams::default()
    }
}

fn has_active_filters(params: &QueryParams) -> bool {
    params.filters.iter().any(|filter| !filter.values.is_empty())
}
