//! Positional layout of a table page's result row
//!
//! A row is `[base columns][outbound peek values][inbound counts]`. The
//! [`Layout`] is the single source of that order: the query builder emits
//! its extra select expressions by walking [`Layout::peek_slots`] and
//! [`Layout::inbound_fks`], and the decoder finds values through
//! [`Layout::find`] and [`Layout::find_inbound`] over the same lists.

use thiserror::Error;

use crate::convert::{to_display_string, RawValue};
use crate::graph::{ColumnRef, Database, FkId, Table, TableId};

/// Declared type used to convert inbound relationship counts
const COUNT_TYPE: &str = "bigint";

/// One outbound peek value: a destination column reached through a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeekSlot {
    pub fk: FkId,
    pub column: ColumnRef,
}

/// Peek slots of a table in foreign-key-then-column order
///
/// Every outbound foreign key whose destination table has peek columns
/// contributes one slot per destination peek column.
pub fn peek_slots(database: &Database, table: &Table) -> Vec<PeekSlot> {
    let mut slots = Vec::new();
    for &fk in table.fks() {
        let destination = database.table(database.fk(fk).destination_table());
        for &position in destination.peek_columns() {
            slots.push(PeekSlot {
                fk,
                column: destination.column_ref(position),
            });
        }
    }
    slots
}

/// Result row shape for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    table: TableId,
    base_column_count: usize,
    outbound_peek_start: usize,
    inbound_start: usize,
    total_slots: usize,
    peeks: Vec<PeekSlot>,
    inbound: Vec<FkId>,
}

impl Layout {
    pub fn build(database: &Database, table: &Table) -> Self {
        let peeks = peek_slots(database, table);
        let inbound = table.inbound_fks().to_vec();

        let base_column_count = table.columns().len();
        let outbound_peek_start = base_column_count;
        let inbound_start = outbound_peek_start + peeks.len();
        let total_slots = inbound_start + inbound.len();

        tracing::debug!(
            table = %table.qualified_name(),
            base_column_count,
            peek_slots = peeks.len(),
            inbound_slots = inbound.len(),
            "Built result layout"
        );

        Self {
            table: table.id(),
            base_column_count,
            outbound_peek_start,
            inbound_start,
            total_slots,
            peeks,
            inbound,
        }
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn base_column_count(&self) -> usize {
        self.base_column_count
    }

    pub fn outbound_peek_start(&self) -> usize {
        self.outbound_peek_start
    }

    pub fn inbound_start(&self) -> usize {
        self.inbound_start
    }

    /// Width of a full result row
    pub fn total_slots(&self) -> usize {
        self.total_slots
    }

    pub fn peek_slots(&self) -> &[PeekSlot] {
        &self.peeks
    }

    /// Peek slots grouped per foreign key, in slot order
    pub fn peek_groups(&self) -> impl Iterator<Item = (FkId, &[PeekSlot])> + '_ {
        self.peeks
            .chunk_by(|left, right| left.fk == right.fk)
            .map(|group| (group[0].fk, group))
    }

    pub fn inbound_fks(&self) -> &[FkId] {
        &self.inbound
    }

    /// Row index of the peek value for `column` reached through `fk`
    ///
    /// # Panics
    ///
    /// If the pair is not part of this layout; the caller and the query
    /// disagree about what was selected.
    pub fn find(&self, fk: FkId, column: ColumnRef) -> usize {
        let mut index = self.outbound_peek_start;
        for slot in &self.peeks {
            if slot.fk == fk && slot.column == column {
                return index;
            }
            index += 1;
        }
        panic!(
            "peek column {:?} through {:?} is not part of the layout of {:?}",
            column, fk, self.table
        );
    }

    /// Row index of the count of rows referencing this row through `fk`
    ///
    /// # Panics
    ///
    /// If `fk` is not an inbound foreign key of the layout's table.
    pub fn find_inbound(&self, fk: FkId) -> usize {
        match self.inbound.iter().position(|candidate| *candidate == fk) {
            Some(offset) => self.inbound_start + offset,
            None => panic!(
                "{:?} is not an inbound foreign key of {:?}",
                fk, self.table
            ),
        }
    }
}

/// Raised when a result row does not have the layout's width
#[derive(Debug, Error)]
#[error("Result row has {actual} values, layout expects {expected}")]
pub struct RowShapeError {
    pub expected: usize,
    pub actual: usize,
}

/// A result row converted to display strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    cells: Vec<Option<String>>,
}

impl DecodedRow {
    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|cell| cell.as_deref())
    }

    /// Values of the table's own columns
    pub fn base<'a>(&'a self, layout: &Layout) -> &'a [Option<String>] {
        &self.cells[..layout.base_column_count()]
    }

    pub fn peek(&self, layout: &Layout, fk: FkId, column: ColumnRef) -> Option<&str> {
        self.cell(layout.find(fk, column))
    }

    pub fn inbound_count(&self, layout: &Layout, fk: FkId) -> u64 {
        self.cell(layout.find_inbound(fk))
            .and_then(|count| count.parse().ok())
            .unwrap_or(0)
    }
}

/// Convert a positional result row using the declared type behind each slot
pub fn decode_row(
    database: &Database,
    layout: &Layout,
    row: &[RawValue],
) -> Result<DecodedRow, RowShapeError> {
    if row.len() != layout.total_slots() {
        return Err(RowShapeError {
            expected: layout.total_slots(),
            actual: row.len(),
        });
    }

    let table = database.table(layout.table());
    let slot_types = table
        .columns()
        .iter()
        .map(|column| column.type_name())
        .chain(
            layout
                .peek_slots()
                .iter()
                .map(|slot| database.column(slot.column).type_name()),
        )
        .chain(layout.inbound_fks().iter().map(|_| COUNT_TYPE));

    let cells = row
        .iter()
        .zip(slot_types)
        .map(|(value, type_name)| to_display_string(value, type_name))
        .collect();

    Ok(DecodedRow { cells })
}
