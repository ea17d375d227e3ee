//! PostgreSQL database provider implementation

use crate::convert::RawValue;
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::graph::{
    ColumnRecord, Database, ForeignKeyRecord, IndexColumnRecord, KeyColumnRecord, SchemaBuilder,
    SupportedFeatures, TableRecord,
};
use crate::query::{BuiltQuery, Dialect, PostgresDialect};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Column, PgPool, Row, TypeInfo, ValueRef};

const FEATURES: SupportedFeatures = SupportedFeatures {
    schemas: true,
    descriptions: true,
    named_fks: true,
    paging_without_sort: true,
};

const DEFAULT_SCHEMA: &str = "public";

/// Catalog filter shared by every metadata query (`n` is the table's namespace)
const USER_SCHEMAS: &str =
    "n.nspname NOT IN ('pg_catalog', 'information_schema') AND n.nspname NOT LIKE 'pg_toast%'";

/// PostgreSQL database provider
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert a PostgreSQL row to raw values, by position
    fn row_to_raw(row: &PgRow) -> Result<Vec<RawValue>, DatabaseError> {
        row.columns()
            .iter()
            .map(|column| Self::extract_raw_value(row, column.ordinal(), column.type_info().name()))
            .collect()
    }

    fn extract_raw_value(
        row: &PgRow,
        index: usize,
        type_name: &str,
    ) -> Result<RawValue, DatabaseError> {
        if row.try_get_raw(index)?.is_null() {
            return Ok(RawValue::Null);
        }

        let value = match type_name {
            "BOOL" => {
                let value: bool = row.try_get(index)?;
                RawValue::Text(value.to_string())
            }
            "INT2" => RawValue::Integer(i64::from(row.try_get::<i16, _>(index)?)),
            "INT4" => RawValue::Integer(i64::from(row.try_get::<i32, _>(index)?)),
            "INT8" => RawValue::Integer(row.try_get::<i64, _>(index)?),
            "OID" => RawValue::Integer(i64::from(row.try_get::<sqlx::postgres::types::Oid, _>(index)?.0)),
            "FLOAT4" => RawValue::Float(f64::from(row.try_get::<f32, _>(index)?)),
            "FLOAT8" => RawValue::Float(row.try_get::<f64, _>(index)?),
            "BYTEA" => RawValue::Bytes(row.try_get::<Vec<u8>, _>(index)?),
            "UUID" => RawValue::Text(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
            "JSON" | "JSONB" => {
                let value: serde_json::Value = row.try_get(index)?;
                RawValue::Text(value.to_string())
            }
            // Text types, and every other type since the dialect selects those as text
            _ => RawValue::Text(row.try_get_unchecked::<String, _>(index)?),
        };

        Ok(value)
    }
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    fn engine_name(&self) -> &'static str {
        "postgres"
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &PostgresDialect
    }

    async fn load_schema(&self) -> Result<Database, DatabaseError> {
        let mut builder = SchemaBuilder::new(DEFAULT_SCHEMA, FEATURES);

        // Tables (ordinary and partitioned)
        let table_query = format!(
            r#"
            SELECT n.nspname::text AS schema_name,
                   c.relname::text AS table_name,
                   obj_description(c.oid, 'pg_class') AS description
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind IN ('r', 'p') AND {USER_SCHEMAS}
            ORDER BY n.nspname, c.relname
            "#
        );
        for row in sqlx::query(&table_query).fetch_all(&self.pool).await? {
            builder.add_table(TableRecord {
                schema_name: row.try_get("schema_name")?,
                name: row.try_get("table_name")?,
                description: row.try_get("description")?,
            })?;
        }

        // Columns in physical order
        let column_query = format!(
            r#"
            SELECT n.nspname::text AS schema_name,
                   c.relname::text AS table_name,
                   a.attname::text AS column_name,
                   format_type(a.atttypid, a.atttypmod) AS type_name,
                   NOT a.attnotnull AS nullable,
                   col_description(c.oid, a.attnum) AS description
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE a.attnum > 0 AND NOT a.attisdropped
              AND c.relkind IN ('r', 'p') AND {USER_SCHEMAS}
            ORDER BY n.nspname, c.relname, a.attnum
            "#
        );
        for row in sqlx::query(&column_query).fetch_all(&self.pool).await? {
            builder.add_column(ColumnRecord {
                schema_name: row.try_get("schema_name")?,
                table_name: row.try_get("table_name")?,
                name: row.try_get("column_name")?,
                type_name: row.try_get("type_name")?,
                nullable: row.try_get("nullable")?,
                description: row.try_get("description")?,
            })?;
        }

        let mut constraints = builder.into_constraints();

        // Primary keys with key ordinal
        let primary_key_query = format!(
            r#"
            SELECT n.nspname::text AS schema_name,
                   c.relname::text AS table_name,
                   a.attname::text AS column_name,
                   k.ordinality AS ordinal
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ordinality)
            JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
            WHERE con.contype = 'p' AND {USER_SCHEMAS}
            ORDER BY n.nspname, c.relname, k.ordinality
            "#
        );
        for row in sqlx::query(&primary_key_query).fetch_all(&self.pool).await? {
            constraints.add_primary_key_column(KeyColumnRecord {
                schema_name: row.try_get("schema_name")?,
                table_name: row.try_get("table_name")?,
                column_name: row.try_get("column_name")?,
                ordinal: row.try_get("ordinal")?,
            })?;
        }

        // Foreign keys, one row per column pair in constraint order
        let foreign_key_query = format!(
            r#"
            SELECT con.conname::text AS constraint_name,
                   n.nspname::text AS schema_name,
                   c.relname::text AS table_name,
                   a.attname::text AS column_name,
                   fn.nspname::text AS destination_schema_name,
                   fc.relname::text AS destination_table_name,
                   fa.attname::text AS destination_column_name
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_class fc ON fc.oid = con.confrelid
            JOIN pg_namespace fn ON fn.oid = fc.relnamespace
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(attnum, destination_attnum, ordinality)
            JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
            JOIN pg_attribute fa ON fa.attrelid = fc.oid AND fa.attnum = k.destination_attnum
            WHERE con.contype = 'f' AND {USER_SCHEMAS}
            ORDER BY n.nspname, c.relname, con.conname, k.ordinality
            "#
        );
        for row in sqlx::query(&foreign_key_query).fetch_all(&self.pool).await? {
            constraints.add_foreign_key(ForeignKeyRecord {
                name: row.try_get("constraint_name")?,
                schema_name: row.try_get("schema_name")?,
                table_name: row.try_get("table_name")?,
                column_name: row.try_get("column_name")?,
                destination_schema_name: row.try_get("destination_schema_name")?,
                destination_table_name: row.try_get("destination_table_name")?,
                destination_column_name: row.try_get("destination_column_name")?,
            })?;
        }

        // Indexes; expression keys (attnum 0) have no column and are skipped
        let index_query = format!(
            r#"
            SELECT i.relname::text AS index_name,
                   n.nspname::text AS schema_name,
                   c.relname::text AS table_name,
                   a.attname::text AS column_name,
                   ix.indisunique AS is_unique
            FROM pg_index ix
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_class c ON c.oid = ix.indrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ordinality)
            JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
            WHERE c.relkind IN ('r', 'p') AND {USER_SCHEMAS}
            ORDER BY n.nspname, c.relname, i.relname, k.ordinality
            "#
        );
        for row in sqlx::query(&index_query).fetch_all(&self.pool).await? {
            constraints.add_index_column(IndexColumnRecord {
                name: row.try_get("index_name")?,
                schema_name: row.try_get("schema_name")?,
                table_name: row.try_get("table_name")?,
                column_name: row.try_get("column_name")?,
                is_unique: row.try_get("is_unique")?,
            })?;
        }

        Ok(constraints.finish())
    }

    async fn fetch_rows(&self, query: &BuiltQuery) -> Result<Vec<Vec<RawValue>>, DatabaseError> {
        let mut query_builder = sqlx::query(&query.sql);
        for value in &query.values {
            query_builder = query_builder.bind(value);
        }

        let rows = query_builder.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_raw).collect()
    }

    async fn fetch_count(&self, query: &BuiltQuery) -> Result<u64, DatabaseError> {
        let mut query_builder = sqlx::query_scalar::<_, i64>(&query.sql);
        for value in &query.values {
            query_builder = query_builder.bind(value);
        }

        let count = query_builder.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }
}
