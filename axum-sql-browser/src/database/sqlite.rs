//! SQLite database provider implementation

use crate::convert::RawValue;
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::graph::{
    ColumnRecord, Database, ForeignKeyRecord, IndexColumnRecord, KeyColumnRecord, SchemaBuilder,
    SchemaError, SupportedFeatures, TableRecord,
};
use crate::query::{BuiltQuery, Dialect, SqliteDialect};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, TypeInfo, ValueRef};

/// SQLite has no schemas, descriptions or constraint names
const FEATURES: SupportedFeatures = SupportedFeatures {
    schemas: false,
    descriptions: false,
    named_fks: false,
    paging_without_sort: true,
};

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn quote_identifier(identifier: &str) -> String {
        SqliteDialect.quote_identifier(identifier)
    }

    /// Bind the builder's values in placeholder order
    fn bind_query<'q>(
        query: &'q BuiltQuery,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        let mut sql_query = sqlx::query(&query.sql);
        for value in &query.values {
            sql_query = sql_query.bind(value);
        }
        sql_query
    }

    /// Convert a SQLite row to raw values, by position
    fn row_to_raw(row: &SqliteRow) -> Result<Vec<RawValue>, DatabaseError> {
        (0..row.len())
            .map(|index| Self::extract_raw_value(row, index))
            .collect()
    }

    /// Extract one value using the storage class SQLite reports for it
    fn extract_raw_value(row: &SqliteRow, index: usize) -> Result<RawValue, DatabaseError> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(RawValue::Null);
        }
        let type_name = raw.type_info().name().to_string();

        // SQLite has dynamic typing; values report INTEGER, REAL, TEXT or BLOB,
        // or the declared type of the column they came from
        match type_name.as_str() {
            "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => {
                if let Ok(value) = row.try_get_unchecked::<i64, _>(index) {
                    return Ok(RawValue::Integer(value));
                }
            }
            "REAL" | "FLOAT" | "DOUBLE" => {
                if let Ok(value) = row.try_get_unchecked::<f64, _>(index) {
                    return Ok(RawValue::Float(value));
                }
            }
            "BLOB" => {
                if let Ok(value) = row.try_get_unchecked::<Vec<u8>, _>(index) {
                    return Ok(RawValue::Bytes(value));
                }
            }
            _ => {
                if let Ok(value) = row.try_get_unchecked::<String, _>(index) {
                    return Ok(RawValue::Text(value));
                }
            }
        }

        // Fallback: try common types in order
        if let Ok(value) = row.try_get_unchecked::<i64, _>(index) {
            return Ok(RawValue::Integer(value));
        }
        if let Ok(value) = row.try_get_unchecked::<f64, _>(index) {
            return Ok(RawValue::Float(value));
        }
        if let Ok(value) = row.try_get_unchecked::<String, _>(index) {
            return Ok(RawValue::Text(value));
        }
        if let Ok(value) = row.try_get_unchecked::<Vec<u8>, _>(index) {
            return Ok(RawValue::Bytes(value));
        }

        Ok(RawValue::Null)
    }

    /// Table names in catalog order, without SQLite's internal tables
    async fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    fn engine_name(&self) -> &'static str {
        "sqlite"
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &SqliteDialect
    }

    async fn load_schema(&self) -> Result<Database, DatabaseError> {
        let table_names = self.table_names().await?;
        let mut builder = SchemaBuilder::new("", FEATURES);
        let mut primary_key_columns = Vec::new();

        for table in &table_names {
            builder.add_table(TableRecord {
                schema_name: String::new(),
                name: table.clone(),
                description: None,
            })?;

            // PRAGMA table_info returns: cid, name, type, notnull, dflt_value, pk
            let table_info_query = format!("PRAGMA table_info({})", Self::quote_identifier(table));
            let column_rows = sqlx::query(&table_info_query)
                .fetch_all(&self.pool)
                .await?;

            for row in column_rows {
                let name: String = row.try_get("name")?;
                let type_name: String = row.try_get("type")?;
                let not_null: i32 = row.try_get("notnull")?;
                let primary_key: i32 = row.try_get("pk")?;

                if primary_key > 0 {
                    primary_key_columns.push(KeyColumnRecord {
                        schema_name: String::new(),
                        table_name: table.clone(),
                        column_name: name.clone(),
                        ordinal: i64::from(primary_key),
                    });
                }

                builder.add_column(ColumnRecord {
                    schema_name: String::new(),
                    table_name: table.clone(),
                    name,
                    type_name,
                    nullable: not_null == 0,
                    description: None,
                })?;
            }
        }

        let mut constraints = builder.into_constraints();
        for record in primary_key_columns {
            constraints.add_primary_key_column(record)?;
        }

        for table in &table_names {
            // PRAGMA foreign_key_list returns: id, seq, table, from, to, on_update, on_delete, match
            // Rows of one multi-column key share an id and are ordered by seq
            let foreign_key_query =
                format!("PRAGMA foreign_key_list({})", Self::quote_identifier(table));
            let mut foreign_key_rows = sqlx::query(&foreign_key_query)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|row| {
                    Ok((
                        row.try_get::<i64, _>("id")?,
                        row.try_get::<i64, _>("seq")?,
                        row.try_get::<String, _>("table")?,
                        row.try_get::<String, _>("from")?,
                        row.try_get::<Option<String>, _>("to")?,
                    ))
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()?;
            foreign_key_rows.sort_by_key(|(id, seq, ..)| (*id, *seq));

            for (id, seq, destination_table, column, destination_column) in foreign_key_rows {
                // "to" is NULL when the key references the destination's primary key
                let destination_column = match destination_column {
                    Some(name) => name,
                    None => constraints
                        .primary_key_column_name("", &destination_table, seq as usize)
                        .ok_or_else(|| SchemaError::UnknownColumn {
                            table: destination_table.clone(),
                            column: format!("primary key column {}", seq),
                        })?,
                };

                constraints.add_foreign_key(ForeignKeyRecord {
                    name: format!("fk_{}_{}", table, id),
                    schema_name: String::new(),
                    table_name: table.clone(),
                    column_name: column,
                    destination_schema_name: String::new(),
                    destination_table_name: destination_table,
                    destination_column_name: destination_column,
                })?;
            }

            // PRAGMA index_list returns: seq, name, unique, origin, partial
            let index_list_query = format!("PRAGMA index_list({})", Self::quote_identifier(table));
            let index_rows = sqlx::query(&index_list_query)
                .fetch_all(&self.pool)
                .await?;

            for row in index_rows {
                let index_name: String = row.try_get("name")?;
                let unique: i32 = row.try_get("unique")?;

                // PRAGMA index_info returns: seqno, cid, name (NULL for expressions)
                let index_info_query =
                    format!("PRAGMA index_info({})", Self::quote_identifier(&index_name));
                let index_column_rows = sqlx::query(&index_info_query)
                    .fetch_all(&self.pool)
                    .await?;

                for column_row in index_column_rows {
                    let column_name: Option<String> = column_row.try_get("name")?;
                    if let Some(column_name) = column_name {
                        constraints.add_index_column(IndexColumnRecord {
                            name: index_name.clone(),
                            schema_name: String::new(),
                            table_name: table.clone(),
                            column_name,
                            is_unique: unique != 0,
                        })?;
                    }
                }
            }
        }

        Ok(constraints.finish())
    }

    async fn fetch_rows(&self, query: &BuiltQuery) -> Result<Vec<Vec<RawValue>>, DatabaseError> {
        let rows = Self::bind_query(query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_raw).collect()
    }

    async fn fetch_count(&self, query: &BuiltQuery) -> Result<u64, DatabaseError> {
        let mut sql_query = sqlx::query_scalar::<_, i64>(&query.sql);
        for value in &query.values {
            sql_query = sql_query.bind(value);
        }
        let count: i64 = sql_query.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqliteProvider::quote_identifier("users"), "\"users\"");
        assert_eq!(
            SqliteProvider::quote_identifier("table\"name"),
            "\"table\"\"name\""
        );
    }

    #[test]
    fn test_features() {
        assert!(!FEATURES.schemas);
        assert!(FEATURES.paging_without_sort);
    }
}
