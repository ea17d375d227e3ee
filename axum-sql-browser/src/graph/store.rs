//! Published schema graph
//!
//! Readers take a cheap `Arc` snapshot; a reload builds a complete new graph
//! off to the side and swaps it in with a single write.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Database;

/// Holder of the currently published [`Database`]
#[derive(Debug)]
pub struct SchemaStore {
    current: RwLock<Arc<Database>>,
}

impl SchemaStore {
    pub fn new(database: Database) -> Self {
        Self {
            current: RwLock::new(Arc::new(database)),
        }
    }

    /// The graph as of now; unaffected by later reloads
    pub fn snapshot(&self) -> Arc<Database> {
        self.current.read().clone()
    }

    /// Publish a new graph, returning the one it replaced
    pub fn replace(&self, database: Database) -> Arc<Database> {
        let next = Arc::new(database);
        std::mem::replace(&mut *self.current.write(), next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::shop_database;

    #[test]
    fn test_snapshot_survives_replace() {
        let store = SchemaStore::new(shop_database());
        let before = store.snapshot();
        before.tables()[0].set_row_count(7);

        let previous = store.replace(shop_database());
        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.tables()[0].row_count(), Some(7));
        assert_eq!(store.snapshot().tables()[0].row_count(), None);
    }
}
