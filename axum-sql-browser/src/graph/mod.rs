//! Schema graph for one database connection
//!
//! The graph is an arena: the [`Database`] owns every table, foreign key and
//! index, and cross references are plain integer handles ([`TableId`],
//! [`FkId`], [`IndexId`]). A relationship seen from its source table, its
//! destination table and each participating column is therefore always the
//! same `FkId`.
//!
//! Graphs are built once through [`builder::SchemaBuilder`] and are read-only
//! afterwards, except for the lazily populated row count and the description
//! fields.

pub mod builder;
pub mod store;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builder::{
    ColumnRecord, ConstraintBuilder, ForeignKeyRecord, IndexColumnRecord, KeyColumnRecord,
    SchemaBuilder, TableRecord,
};
pub use store::SchemaStore;

/// Handle of a table inside its [`Database`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

/// Handle of a foreign key inside its [`Database`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FkId(pub(crate) usize);

/// Handle of an index inside its [`Database`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(pub(crate) usize);

/// A column addressed by its owning table and physical position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: TableId,
    pub position: usize,
}

/// Capabilities of the engine behind a [`Database`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedFeatures {
    /// Tables live in named schemas
    pub schemas: bool,

    /// Tables and columns carry descriptions
    pub descriptions: bool,

    /// Foreign keys have engine-assigned names
    pub named_fks: bool,

    /// LIMIT/OFFSET may be applied without an ORDER BY
    pub paging_without_sort: bool,
}

/// Errors raised while constructing a schema graph
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Duplicate table: {0}")]
    DuplicateTable(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column '{column}' on table {table}")]
    UnknownColumn { table: String, column: String },
}

/// The full structure of one database
#[derive(Debug)]
pub struct Database {
    pub(crate) default_schema_name: String,
    pub(crate) features: SupportedFeatures,
    pub(crate) tables: Vec<Table>,
    pub(crate) fks: Vec<Fk>,
    pub(crate) indexes: Vec<Index>,
}

impl Database {
    pub(crate) fn empty(default_schema_name: String, features: SupportedFeatures) -> Self {
        Self {
            default_schema_name,
            features,
            tables: Vec::new(),
            fks: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn default_schema_name(&self) -> &str {
        &self.default_schema_name
    }

    pub fn features(&self) -> SupportedFeatures {
        self.features
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn fks(&self) -> &[Fk] {
        &self.fks
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Table behind a handle issued by this database
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn fk(&self, id: FkId) -> &Fk {
        &self.fks[id.0]
    }

    pub fn index(&self, id: IndexId) -> &Index {
        &self.indexes[id.0]
    }

    pub fn column(&self, column: ColumnRef) -> &Column {
        &self.table(column.table).columns[column.position]
    }

    /// Find a table by schema and name
    ///
    /// Matching is ASCII case-insensitive. When the engine has schemas, an
    /// empty `schema_name` means the default schema; without schema support
    /// the schema name is ignored.
    pub fn find_table(&self, schema_name: &str, name: &str) -> Option<&Table> {
        if !self.features.schemas {
            return self
                .tables
                .iter()
                .find(|table| table.name.eq_ignore_ascii_case(name));
        }

        let schema_name = if schema_name.is_empty() {
            self.default_schema_name.as_str()
        } else {
            schema_name
        };

        self.tables.iter().find(|table| {
            table.schema_name.eq_ignore_ascii_case(schema_name)
                && table.name.eq_ignore_ascii_case(name)
        })
    }

    /// Find a table from its dotted `schema.table` form or a bare `table`
    pub fn find_table_by_path(&self, path: &str) -> Option<&Table> {
        if self.features.schemas {
            if let Some((schema_name, name)) = path.split_once('.') {
                return self.find_table(schema_name, name);
            }
        }
        self.find_table("", path)
    }

    /// Replace the peek columns of a table, resolving each name on that table
    ///
    /// A column named more than once keeps its first position.
    pub fn set_peek_columns(
        &mut self,
        table: TableId,
        column_names: &[String],
    ) -> Result<(), SchemaError> {
        let target = &self.tables[table.0];
        let mut positions = Vec::with_capacity(column_names.len());
        for name in column_names {
            let (position, _) =
                target
                    .find_column(name)
                    .ok_or_else(|| SchemaError::UnknownColumn {
                        table: target.qualified_name(),
                        column: name.clone(),
                    })?;
            if !positions.contains(&position) {
                positions.push(position);
            }
        }

        self.tables[table.0].peek_columns = positions;
        Ok(())
    }
}

/// A table and its physical column order
#[derive(Debug)]
pub struct Table {
    pub(crate) id: TableId,
    pub(crate) schema_name: String,
    pub(crate) name: String,
    pub(crate) columns: Vec<Column>,
    pub(crate) pk: Option<Pk>,
    pub(crate) fks: Vec<FkId>,
    pub(crate) inbound_fks: Vec<FkId>,
    pub(crate) indexes: Vec<IndexId>,
    pub(crate) peek_columns: Vec<usize>,
    pub(crate) row_count: RwLock<Option<u64>>,
    pub(crate) description: RwLock<Option<String>>,
}

impl Table {
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Schema name, empty when the engine has no namespacing
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `schema.table`, or just `table` without a schema
    pub fn qualified_name(&self) -> String {
        if self.schema_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema_name, self.name)
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn pk(&self) -> Option<&Pk> {
        self.pk.as_ref()
    }

    /// Foreign keys defined on this table
    pub fn fks(&self) -> &[FkId] {
        &self.fks
    }

    /// Foreign keys on other tables that reference this table
    pub fn inbound_fks(&self) -> &[FkId] {
        &self.inbound_fks
    }

    pub fn indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    /// Positions of the columns other tables may preview through a foreign key
    pub fn peek_columns(&self) -> &[usize] {
        &self.peek_columns
    }

    /// Find a column by name, case-insensitively
    pub fn find_column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.name.eq_ignore_ascii_case(name))
    }

    pub fn column_ref(&self, position: usize) -> ColumnRef {
        ColumnRef {
            table: self.id,
            position,
        }
    }

    pub fn row_count(&self) -> Option<u64> {
        *self.row_count.read()
    }

    pub fn set_row_count(&self, count: u64) {
        *self.row_count.write() = Some(count);
    }

    pub fn description(&self) -> Option<String> {
        self.description.read().clone()
    }

    pub fn set_description(&self, description: Option<String>) {
        *self.description.write() = description;
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.schema_name.eq_ignore_ascii_case(&other.schema_name)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Table {}

/// A column of a table
#[derive(Debug)]
pub struct Column {
    pub(crate) table: TableId,
    pub(crate) position: usize,
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) nullable: bool,
    pub(crate) is_in_primary_key: bool,
    pub(crate) fks: Vec<FkId>,
    pub(crate) inbound_fks: Vec<FkId>,
    pub(crate) indexes: Vec<IndexId>,
    pub(crate) description: RwLock<Option<String>>,
}

impl Column {
    pub fn table(&self) -> TableId {
        self.table
    }

    /// 0-based position in the table; result rows are decoded by this ordinal
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type name as reported by the engine, e.g. `varchar(50)`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_in_primary_key(&self) -> bool {
        self.is_in_primary_key
    }

    pub fn fks(&self) -> &[FkId] {
        &self.fks
    }

    pub fn inbound_fks(&self) -> &[FkId] {
        &self.inbound_fks
    }

    pub fn indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    pub fn description(&self) -> Option<String> {
        self.description.read().clone()
    }

    pub fn set_description(&self, description: Option<String>) {
        *self.description.write() = description;
    }
}

/// Primary key columns in key order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pk {
    pub(crate) columns: Vec<usize>,
}

impl Pk {
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }
}

/// A foreign key from a source table to a destination table
///
/// `source_columns[i]` references `destination_columns[i]`.
#[derive(Debug)]
pub struct Fk {
    pub(crate) id: FkId,
    pub(crate) name: String,
    pub(crate) source_table: TableId,
    pub(crate) source_columns: Vec<usize>,
    pub(crate) destination_table: TableId,
    pub(crate) destination_columns: Vec<usize>,
}

impl Fk {
    pub fn id(&self) -> FkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_table(&self) -> TableId {
        self.source_table
    }

    pub fn source_columns(&self) -> &[usize] {
        &self.source_columns
    }

    pub fn destination_table(&self) -> TableId {
        self.destination_table
    }

    pub fn destination_columns(&self) -> &[usize] {
        &self.destination_columns
    }

    /// `(source position, destination position)` pairs in constraint order
    pub fn column_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.source_columns
            .iter()
            .copied()
            .zip(self.destination_columns.iter().copied())
    }
}

/// An index and its key columns in declared order
#[derive(Debug)]
pub struct Index {
    pub(crate) id: IndexId,
    pub(crate) name: String,
    pub(crate) table: TableId,
    pub(crate) columns: Vec<usize>,
    pub(crate) is_unique: bool,
}

impl Index {
    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{shop_database, shop_with_schemas};

    #[test]
    fn test_find_table_is_case_insensitive() {
        let database = shop_database();
        let table = database.find_table("", "ORDERS").unwrap();
        assert_eq!(table.name(), "orders");
        assert!(database.find_table("", "missing").is_none());
    }

    #[test]
    fn test_find_table_without_schema_support_ignores_schema() {
        let database = shop_database();
        assert!(database.find_table("whatever", "customers").is_some());
        assert!(database.find_table_by_path("customers").is_some());
    }

    #[test]
    fn test_find_table_by_path_with_schemas() {
        let database = shop_with_schemas();
        assert_eq!(
            database.find_table_by_path("Sales.Orders").unwrap().qualified_name(),
            "sales.orders"
        );
        // Bare names fall back to the default schema
        assert_eq!(
            database.find_table_by_path("customers").unwrap().qualified_name(),
            "public.customers"
        );
        assert!(database.find_table_by_path("orders").is_none());
    }

    #[test]
    fn test_find_column_returns_ordinal() {
        let database = shop_database();
        let orders = database.find_table("", "orders").unwrap();
        let (position, column) = orders.find_column("Customer_Id").unwrap();
        assert_eq!(position, 1);
        assert_eq!(column.position(), 1);
        assert_eq!(column.name(), "customer_id");
        assert!(orders.find_column("nope").is_none());
    }

    #[test]
    fn test_fk_is_shared_between_table_and_columns() {
        let database = shop_database();
        let orders = database.find_table("", "orders").unwrap();
        let customers = database.find_table("", "customers").unwrap();
        let fk = orders
            .fks()
            .iter()
            .copied()
            .find(|fk| database.fk(*fk).destination_table() == customers.id())
            .unwrap();

        assert!(customers.inbound_fks().contains(&fk));
        assert!(orders.columns()[1].fks().contains(&fk));
        assert!(customers.columns()[0].inbound_fks().contains(&fk));
        assert!(database.fks().iter().any(|candidate| candidate.id() == fk));
    }

    #[test]
    fn test_set_peek_columns_rejects_unknown_column() {
        let mut database = shop_database();
        let customers = database.find_table("", "customers").unwrap().id();
        let error = database
            .set_peek_columns(customers, &["nickname".to_string()])
            .unwrap_err();
        assert!(error.to_string().contains("nickname"));

        database
            .set_peek_columns(customers, &["EMAIL".to_string(), "name".to_string()])
            .unwrap();
        assert_eq!(database.table(customers).peek_columns(), &[2, 1]);
    }

    #[test]
    fn test_set_peek_columns_ignores_repeated_names() {
        let mut database = shop_database();
        let customers = database.find_table("", "customers").unwrap().id();
        database
            .set_peek_columns(
                customers,
                &["name".to_string(), "email".to_string(), "Name".to_string()],
            )
            .unwrap();
        assert_eq!(database.table(customers).peek_columns(), &[1, 2]);

        let orders = database.find_table("", "orders").unwrap();
        let layout = crate::layout::Layout::build(&database, orders);
        assert_eq!(layout.peek_slots().len(), 2);
    }

    #[test]
    fn test_row_count_and_description_are_mutable_through_shared_reference() {
        let database = shop_database();
        let orders = database.find_table("", "orders").unwrap();
        assert_eq!(orders.row_count(), None);
        orders.set_row_count(42);
        assert_eq!(orders.row_count(), Some(42));

        orders.set_description(Some("Customer orders".to_string()));
        assert_eq!(orders.description().as_deref(), Some("Customer orders"));
    }

    #[test]
    fn test_table_equality_uses_schema_and_name() {
        let first = shop_database();
        let second = shop_database();
        let left = first.find_table("", "orders").unwrap();
        let right = second.find_table("", "orders").unwrap();
        assert_eq!(left, right);
        assert_ne!(left, second.find_table("", "customers").unwrap());
    }
}
