//! Request and response types of the browser API
//!
//! These types are the serialized view of the schema graph and of table
//! pages; they carry names rather than graph handles.

use serde::{Deserialize, Serialize};

use crate::database::DatabaseError;
use crate::graph::{Database, Fk, SupportedFeatures, Table};
use crate::query::SortOrder;

/// Complete schema information for a database table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Qualified name (`schema.table`, or `table` without schemas)
    pub name: String,

    pub schema_name: String,

    pub description: Option<String>,

    /// Columns in physical order
    pub columns: Vec<ColumnInfo>,

    /// Primary key column names in key order (if any)
    pub primary_key: Option<Vec<String>>,

    /// Foreign keys defined on this table
    pub foreign_keys: Vec<ForeignKey>,

    /// Foreign keys on other tables referencing this table
    pub inbound_foreign_keys: Vec<ForeignKey>,

    /// Index definitions
    pub indexes: Vec<IndexInfo>,

    /// Columns other tables preview through their foreign keys
    pub peek_columns: Vec<String>,

    pub row_count: Option<u64>,
}

impl TableSchema {
    pub fn from_table(database: &Database, table: &Table) -> Self {
        let column_names = |positions: &[usize]| -> Vec<String> {
            positions
                .iter()
                .map(|position| table.columns()[*position].name().to_string())
                .collect()
        };

        Self {
            name: table.qualified_name(),
            schema_name: table.schema_name().to_string(),
            description: table.description(),
            columns: table
                .columns()
                .iter()
                .map(|column| ColumnInfo {
                    name: column.name().to_string(),
                    data_type: column.type_name().to_string(),
                    nullable: column.nullable(),
                    is_primary_key: column.is_in_primary_key(),
                    description: column.description(),
                })
                .collect(),
            primary_key: table.pk().map(|pk| column_names(pk.columns())),
            foreign_keys: table
                .fks()
                .iter()
                .map(|fk| ForeignKey::from_fk(database, database.fk(*fk)))
                .collect(),
            inbound_foreign_keys: table
                .inbound_fks()
                .iter()
                .map(|fk| ForeignKey::from_fk(database, database.fk(*fk)))
                .collect(),
            indexes: table
                .indexes()
                .iter()
                .map(|index| {
                    let index = database.index(*index);
                    IndexInfo {
                        name: index.name().to_string(),
                        columns: column_names(index.columns()),
                        unique: index.is_unique(),
                    }
                })
                .collect(),
            peek_columns: column_names(table.peek_columns()),
            row_count: table.row_count(),
        }
    }
}

/// Information about a single column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// SQL data type as reported by the engine (e.g. "INTEGER", "varchar(255)")
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Whether this column is part of the primary key
    pub is_primary_key: bool,

    pub description: Option<String>,
}

/// Foreign key constraint information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub name: String,

    /// Table holding the key
    pub table: String,

    /// Key columns, paired by index with `references_columns`
    pub columns: Vec<String>,

    /// Referenced table
    pub references_table: String,

    pub references_columns: Vec<String>,
}

impl ForeignKey {
    pub fn from_fk(database: &Database, fk: &Fk) -> Self {
        let source = database.table(fk.source_table());
        let destination = database.table(fk.destination_table());
        let (columns, references_columns) = fk
            .column_pairs()
            .map(|(source_column, destination_column)| {
                (
                    source.columns()[source_column].name().to_string(),
                    destination.columns()[destination_column].name().to_string(),
                )
            })
            .unzip();

        Self {
            name: fk.name().to_string(),
            table: source.qualified_name(),
            columns,
            references_table: destination.qualified_name(),
            references_columns,
        }
    }
}

/// Index information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Index name
    pub name: String,

    /// Columns included in the index, in key order
    pub columns: Vec<String>,

    /// Whether the index enforces uniqueness
    pub unique: bool,
}

/// Information about a table (for listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Qualified table name
    pub name: String,

    /// Row count, once it has been counted
    pub row_count: Option<u64>,

    pub description: Option<String>,
}

/// Response from listing tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesResponse {
    /// List of tables
    pub tables: Vec<TableInfo>,

    pub features: SupportedFeatures,
}

/// One ORDER BY entry by column name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortTerm {
    pub column: String,
    pub order: SortOrder,
}

/// An equality filter by column name
///
/// Only the first value is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTerm {
    pub column: String,
    pub values: Vec<String>,
}

/// Page request against a table, by column names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRequest {
    /// Rows to skip
    #[serde(default)]
    pub offset: u64,

    /// Maximum rows to return; 0 selects the configured default
    #[serde(default)]
    pub limit: u64,

    #[serde(default)]
    pub sort: Vec<SortTerm>,

    #[serde(default)]
    pub filters: Vec<FilterTerm>,
}

impl RowRequest {
    /// Parse URL query pairs
    ///
    /// `offset` and `limit` are numbers, `sort` is a comma separated column
    /// list where a leading `-` sorts descending, and every other key filters
    /// that column. Repeated filter keys collect into one multi-value filter.
    pub fn from_query_pairs(pairs: Vec<(String, String)>) -> Result<Self, DatabaseError> {
        let mut request = RowRequest::default();

        for (key, value) in pairs {
            match key.as_str() {
                "offset" => request.offset = parse_number(&key, &value)?,
                "limit" => request.limit = parse_number(&key, &value)?,
                "sort" => {
                    for term in value.split(',').map(str::trim).filter(|term| !term.is_empty()) {
                        let (column, order) = match term.strip_prefix('-') {
                            Some(column) => (column, SortOrder::Descending),
                            None => (term.trim_start_matches('+'), SortOrder::Ascending),
                        };
                        request.sort.push(SortTerm {
                            column: column.to_string(),
                            order,
                        });
                    }
                }
                _ => match request.filters.iter_mut().find(|filter| filter.column == key) {
                    Some(filter) => filter.values.push(value),
                    None => request.filters.push(FilterTerm {
                        column: key,
                        values: vec![value],
                    }),
                },
            }
        }

        Ok(request)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, DatabaseError> {
    value
        .parse()
        .map_err(|_| DatabaseError::InvalidRequest(format!("{} must be a non-negative integer", key)))
}

/// A peek value column in a page response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeekColumnInfo {
    /// Foreign key the value is reached through
    pub foreign_key: String,

    /// Source columns of that foreign key
    pub via_columns: Vec<String>,

    /// Destination table
    pub table: String,

    pub column: String,
}

/// A relationship whose referencing rows are counted per page row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundInfo {
    pub foreign_key: String,

    /// Referencing table
    pub table: String,

    /// Referencing columns
    pub columns: Vec<String>,
}

/// One page row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    /// Display values of the table's columns
    pub values: Vec<Option<String>>,

    /// Display values aligned with `RowsResponse::peek_columns`
    pub peeks: Vec<Option<String>>,

    /// Referencing row counts aligned with `RowsResponse::inbound`
    pub inbound_counts: Vec<u64>,
}

/// Response containing table rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsResponse {
    pub table: String,

    /// Column names of the table
    pub columns: Vec<String>,

    pub peek_columns: Vec<PeekColumnInfo>,

    pub inbound: Vec<InboundInfo>,

    /// The rows returned
    pub rows: Vec<RowView>,

    /// Number of rows matching the filters
    pub total: u64,

    /// Number of rows in the table
    pub table_total: u64,

    /// Current offset
    pub offset: u64,

    /// Limit used for this query
    pub limit: u64,

    /// Whether there are more rows available
    pub has_more: bool,
}

/// Response for row count queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    /// Total number of rows
    pub count: u64,
}

/// Request to change a table or column description
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    /// Column to describe; the table itself when absent
    pub column: Option<String>,

    /// New description; `None` clears it
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{shop_database, shop_with_peeks};

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_row_request_from_query_pairs() {
        let request = RowRequest::from_query_pairs(pairs(&[
            ("pattern", "plain"),
            ("sort", "colour,-size"),
            ("limit", "10"),
            ("pattern", "striped"),
        ]))
        .unwrap();

        assert_eq!(request.limit, 10);
        assert_eq!(request.offset, 0);
        assert_eq!(
            request.sort,
            vec![
                SortTerm {
                    column: "colour".to_string(),
                    order: SortOrder::Ascending
                },
                SortTerm {
                    column: "size".to_string(),
                    order: SortOrder::Descending
                },
            ]
        );
        assert_eq!(
            request.filters,
            vec![FilterTerm {
                column: "pattern".to_string(),
                values: vec!["plain".to_string(), "striped".to_string()],
            }]
        );
    }

    #[test]
    fn test_row_request_rejects_bad_numbers() {
        let error = RowRequest::from_query_pairs(pairs(&[("offset", "-1")])).unwrap_err();
        assert!(matches!(error, DatabaseError::InvalidRequest(_)));
    }

    #[test]
    fn test_table_schema_lists_both_directions() {
        let database = shop_with_peeks();
        let orders = database.find_table("", "orders").unwrap();
        let schema = TableSchema::from_table(&database, orders);

        assert_eq!(schema.primary_key, Some(vec!["id".to_string()]));
        assert_eq!(schema.foreign_keys.len(), 2);
        assert_eq!(schema.foreign_keys[0].columns, vec!["customer_id".to_string()]);
        assert_eq!(schema.foreign_keys[0].references_table, "customers");
        assert_eq!(schema.foreign_keys[0].references_columns, vec!["id".to_string()]);
        assert_eq!(
            schema
                .inbound_foreign_keys
                .iter()
                .map(|fk| fk.table.as_str())
                .collect::<Vec<_>>(),
            vec!["order_notes", "returns"]
        );

        let customers = TableSchema::from_table(&database, database.find_table("", "customers").unwrap());
        assert_eq!(customers.peek_columns, vec!["name".to_string(), "email".to_string()]);
    }

    #[test]
    fn test_table_schema_serializes_camel_case() {
        let database = shop_database();
        let schema = TableSchema::from_table(&database, database.find_table("", "products").unwrap());
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["columns"][2]["dataType"], "decimal(10,2)");
        assert_eq!(json["inboundForeignKeys"][0]["referencesTable"], "products");
    }
}
