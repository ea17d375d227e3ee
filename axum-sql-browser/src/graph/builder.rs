//! Two-pass schema graph construction
//!
//! Engine adapters feed catalog rows into a [`SchemaBuilder`] (tables and
//! columns), then convert it into a [`ConstraintBuilder`] that resolves
//! primary keys, foreign keys and indexes against the tables loaded in the
//! first pass. Any reference that cannot be resolved aborts the build.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{
    Column, Database, Fk, FkId, Index, IndexId, Pk, SchemaError, SupportedFeatures, Table,
    TableId,
};

/// A table as reported by the engine catalog
#[derive(Debug, Clone, Default)]
pub struct TableRecord {
    pub schema_name: String,
    pub name: String,
    pub description: Option<String>,
}

/// A column as reported by the engine catalog, in physical column order
#[derive(Debug, Clone, Default)]
pub struct ColumnRecord {
    pub schema_name: String,
    pub table_name: String,
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    pub description: Option<String>,
}

/// One primary key column and its key ordinal
#[derive(Debug, Clone, Default)]
pub struct KeyColumnRecord {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub ordinal: i64,
}

/// One column pair of a foreign key
///
/// Multi-column keys arrive as several records sharing a name.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyRecord {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub destination_schema_name: String,
    pub destination_table_name: String,
    pub destination_column_name: String,
}

/// One key column of an index, in index key order
#[derive(Debug, Clone, Default)]
pub struct IndexColumnRecord {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub is_unique: bool,
}

/// First pass: tables and their columns
pub struct SchemaBuilder {
    database: Database,
}

impl SchemaBuilder {
    pub fn new(default_schema_name: impl Into<String>, features: SupportedFeatures) -> Self {
        Self {
            database: Database::empty(default_schema_name.into(), features),
        }
    }

    pub fn add_table(&mut self, record: TableRecord) -> Result<TableId, SchemaError> {
        if let Some(existing) = self
            .database
            .find_table(&record.schema_name, &record.name)
        {
            return Err(SchemaError::DuplicateTable(existing.qualified_name()));
        }

        let id = TableId(self.database.tables.len());
        self.database.tables.push(Table {
            id,
            schema_name: record.schema_name,
            name: record.name,
            columns: Vec::new(),
            pk: None,
            fks: Vec::new(),
            inbound_fks: Vec::new(),
            indexes: Vec::new(),
            peek_columns: Vec::new(),
            row_count: RwLock::new(None),
            description: RwLock::new(record.description),
        });
        Ok(id)
    }

    /// Append a column; its position is the number of columns already loaded
    pub fn add_column(&mut self, record: ColumnRecord) -> Result<usize, SchemaError> {
        let table = resolve_table(&self.database, &record.schema_name, &record.table_name)?;
        let table = &mut self.database.tables[table.0];
        let position = table.columns.len();

        table.columns.push(Column {
            table: table.id,
            position,
            name: record.name,
            type_name: record.type_name,
            nullable: record.nullable,
            is_in_primary_key: false,
            fks: Vec::new(),
            inbound_fks: Vec::new(),
            indexes: Vec::new(),
            description: RwLock::new(record.description),
        });
        Ok(position)
    }

    /// Close the first pass
    pub fn into_constraints(self) -> ConstraintBuilder {
        ConstraintBuilder {
            database: self.database,
            pk_ordinals: HashMap::new(),
            fks_by_name: HashMap::new(),
            indexes_by_name: HashMap::new(),
        }
    }
}

/// Second pass: keys and indexes, resolved against the first pass
pub struct ConstraintBuilder {
    database: Database,
    pk_ordinals: HashMap<TableId, Vec<(i64, usize)>>,
    fks_by_name: HashMap<(TableId, String), FkId>,
    indexes_by_name: HashMap<(TableId, String), IndexId>,
}

impl ConstraintBuilder {
    pub fn add_primary_key_column(&mut self, record: KeyColumnRecord) -> Result<(), SchemaError> {
        let table = resolve_table(&self.database, &record.schema_name, &record.table_name)?;
        let position = resolve_column(&self.database, table, &record.column_name)?;

        let ordinals = self.pk_ordinals.entry(table).or_default();
        let slot = ordinals.partition_point(|(ordinal, _)| *ordinal <= record.ordinal);
        ordinals.insert(slot, (record.ordinal, position));

        let target = &mut self.database.tables[table.0];
        target.columns[position].is_in_primary_key = true;
        target.pk = Some(Pk {
            columns: ordinals.iter().map(|(_, position)| *position).collect(),
        });
        Ok(())
    }

    /// Name of the primary key column at `ordinal` (0-based) of a table
    ///
    /// Used by engines whose foreign key metadata omits the referenced column
    /// when it is the destination's primary key.
    pub fn primary_key_column_name(
        &self,
        schema_name: &str,
        table_name: &str,
        ordinal: usize,
    ) -> Option<String> {
        let table = self.database.find_table(schema_name, table_name)?;
        let position = *table.pk.as_ref()?.columns.get(ordinal)?;
        Some(table.columns[position].name.clone())
    }

    /// Add one column pair of a foreign key
    ///
    /// A record whose (source table, name) is already known extends that
    /// foreign key's column lists in arrival order.
    pub fn add_foreign_key(&mut self, record: ForeignKeyRecord) -> Result<FkId, SchemaError> {
        let source = resolve_table(&self.database, &record.schema_name, &record.table_name)?;
        let source_column = resolve_column(&self.database, source, &record.column_name)?;
        let destination = resolve_table(
            &self.database,
            &record.destination_schema_name,
            &record.destination_table_name,
        )?;
        let destination_column =
            resolve_column(&self.database, destination, &record.destination_column_name)?;

        let id = match self.fks_by_name.get(&(source, record.name.clone())) {
            Some(id) => {
                let fk = &mut self.database.fks[id.0];
                fk.source_columns.push(source_column);
                fk.destination_columns.push(destination_column);
                *id
            }
            None => {
                let id = FkId(self.database.fks.len());
                self.database.fks.push(Fk {
                    id,
                    name: record.name.clone(),
                    source_table: source,
                    source_columns: vec![source_column],
                    destination_table: destination,
                    destination_columns: vec![destination_column],
                });
                self.database.tables[source.0].fks.push(id);
                self.database.tables[destination.0].inbound_fks.push(id);
                self.fks_by_name.insert((source, record.name), id);
                id
            }
        };

        push_unique(
            &mut self.database.tables[source.0].columns[source_column].fks,
            id,
        );
        push_unique(
            &mut self.database.tables[destination.0].columns[destination_column].inbound_fks,
            id,
        );
        Ok(id)
    }

    /// Add one key column of an index; records sharing a name extend it
    pub fn add_index_column(&mut self, record: IndexColumnRecord) -> Result<IndexId, SchemaError> {
        let table = resolve_table(&self.database, &record.schema_name, &record.table_name)?;
        let position = resolve_column(&self.database, table, &record.column_name)?;

        let id = match self.indexes_by_name.get(&(table, record.name.clone())) {
            Some(id) => {
                self.database.indexes[id.0].columns.push(position);
                *id
            }
            None => {
                let id = IndexId(self.database.indexes.len());
                self.database.indexes.push(Index {
                    id,
                    name: record.name.clone(),
                    table,
                    columns: vec![position],
                    is_unique: record.is_unique,
                });
                self.database.tables[table.0].indexes.push(id);
                self.indexes_by_name.insert((table, record.name), id);
                id
            }
        };

        push_unique(
            &mut self.database.tables[table.0].columns[position].indexes,
            id,
        );
        Ok(id)
    }

    pub fn finish(self) -> Database {
        self.database
    }
}

fn resolve_table(
    database: &Database,
    schema_name: &str,
    table_name: &str,
) -> Result<TableId, SchemaError> {
    database
        .find_table(schema_name, table_name)
        .map(Table::id)
        .ok_or_else(|| {
            if schema_name.is_empty() {
                SchemaError::UnknownTable(table_name.to_string())
            } else {
                SchemaError::UnknownTable(format!("{}.{}", schema_name, table_name))
            }
        })
}

fn resolve_column(
    database: &Database,
    table: TableId,
    column_name: &str,
) -> Result<usize, SchemaError> {
    let table = database.table(table);
    table
        .find_column(column_name)
        .map(|(position, _)| position)
        .ok_or_else(|| SchemaError::UnknownColumn {
            table: table.qualified_name(),
            column: column_name.to_string(),
        })
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
