//! SQL dialect differences between engines
//!
//! Only quoting, placeholders, filter comparison and paging syntax differ;
//! the statement shape is produced once in [`super::build_query`].

use crate::convert::base_type_name;
use crate::graph::Table;

/// Engine-specific SQL spelling
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quote an identifier (table or column name) to prevent SQL injection
    fn quote_identifier(&self, identifier: &str) -> String;

    fn qualified_table(&self, table: &Table) -> String {
        if table.schema_name().is_empty() {
            self.quote_identifier(table.name())
        } else {
            format!(
                "{}.{}",
                self.quote_identifier(table.schema_name()),
                self.quote_identifier(table.name())
            )
        }
    }

    /// Placeholder for the 1-based `index`-th bound value
    fn placeholder(&self, index: usize) -> String;

    /// Equality between a column expression and a string-bound placeholder
    fn filter_predicate(&self, column: &str, placeholder: &str) -> String {
        format!("{} = {}", column, placeholder)
    }

    /// Select-list expression for a column of `type_name`
    fn select_column(&self, expression: String, _type_name: &str) -> String {
        expression
    }

    /// ORDER BY expression used when the engine cannot page unsorted rows
    /// and the table has no primary key
    fn arbitrary_order(&self) -> &'static str {
        "(SELECT NULL)"
    }

    /// Paging clause; a zero `row_limit` means unlimited, a zero `skip_rows`
    /// means no skip
    fn paging_clause(&self, row_limit: u64, skip_rows: u64) -> Option<String>;
}

/// SQLite
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    // Column affinity decides whether a text value converts before comparing,
    // so compare the same text the page shows
    fn filter_predicate(&self, column: &str, placeholder: &str) -> String {
        format!("CAST({} AS TEXT) = {}", column, placeholder)
    }

    fn paging_clause(&self, row_limit: u64, skip_rows: u64) -> Option<String> {
        match (row_limit, skip_rows) {
            (0, 0) => None,
            (limit, 0) => Some(format!("LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT; -1 is unbounded
            (0, skip) => Some(format!("LIMIT -1 OFFSET {}", skip)),
            (limit, skip) => Some(format!("LIMIT {} OFFSET {}", limit, skip)),
        }
    }
}

/// Types the PostgreSQL adapter decodes from the binary protocol
const POSTGRES_NATIVE_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "bigint",
    "oid",
    "real",
    "double precision",
    "boolean",
    "bytea",
    "uuid",
    "json",
    "jsonb",
    "text",
    "character varying",
    "character",
    "varchar",
    "char",
    "name",
];

/// PostgreSQL
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    // Filter values are bound as text, so compare in text
    fn filter_predicate(&self, column: &str, placeholder: &str) -> String {
        format!("CAST({} AS text) = {}", column, placeholder)
    }

    // Anything the adapter does not decode natively comes back in its text
    // output form, which also covers NaN numerics and infinite timestamps
    fn select_column(&self, expression: String, type_name: &str) -> String {
        if POSTGRES_NATIVE_TYPES.contains(&base_type_name(type_name).as_str()) {
            expression
        } else {
            format!("CAST({} AS text)", expression)
        }
    }

    fn paging_clause(&self, row_limit: u64, skip_rows: u64) -> Option<String> {
        let mut parts = Vec::new();
        if row_limit > 0 {
            parts.push(format!("LIMIT {}", row_limit));
        }
        if skip_rows > 0 {
            parts.push(format!("OFFSET {}", skip_rows));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Microsoft SQL Server (T-SQL)
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlDialect;

impl Dialect for MsSqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("[{}]", identifier.replace(']', "]]"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn paging_clause(&self, row_limit: u64, skip_rows: u64) -> Option<String> {
        match (row_limit, skip_rows) {
            (0, 0) => None,
            (0, skip) => Some(format!("OFFSET {} ROWS", skip)),
            (limit, skip) => Some(format!(
                "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                skip, limit
            )),
        }
    }
}
