use std::collections::HashMap;

use thiserror::Error;

use crate::types::ReferenceId;

/// Category a reference table is scoped to. Both ends must hold identical
/// table contents per category for decoding to be possible at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefCategory {
    Entity,
    Inventory,
    Power,
    Property,
    All,
}

/// Errors raised when a logical id or wire index cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefError {
    /// The id has no entry in the requested category. Fatal for decoding the
    /// enclosing record; a logic error when encoding (the caller attempted to
    /// serialize a reference the table doesn't know about).
    #[error("id {id:#x} has no entry in the {category:?} reference table")]
    UnknownReference {
        id: ReferenceId,
        category: RefCategory,
    },

    /// A received index is past the end of the category's table.
    #[error("index {index} is out of range for the {category:?} reference table")]
    UnknownIndex { index: u64, category: RefCategory },
}

/// One category's ordered id sequence plus the reverse map built once at load
/// time, so lookups are O(1) in both directions.
pub struct RefTable {
    ordered: Vec<ReferenceId>,
    index_by_id: HashMap<ReferenceId, u64>,
}

impl RefTable {
    pub fn new(ordered: Vec<ReferenceId>) -> Self {
        let mut index_by_id = HashMap::with_capacity(ordered.len());
        for (index, id) in ordered.iter().enumerate() {
            index_by_id.insert(*id, index as u64);
        }
        Self {
            ordered,
            index_by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// The full set of category-scoped tables, supplied by the data-loading
/// collaborator at startup. Read-only thereafter; lookups require no locking.
#[derive(Default)]
pub struct RefTables {
    tables: HashMap<RefCategory, RefTable>,
}

impl RefTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the table for a category. Called during startup only.
    pub fn insert(&mut self, category: RefCategory, ordered: Vec<ReferenceId>) {
        self.tables.insert(category, RefTable::new(ordered));
    }

    /// Compact wire index of a logical id within its category's table.
    pub fn index_of(&self, id: ReferenceId, category: RefCategory) -> Result<u64, RefError> {
        self.tables
            .get(&category)
            .and_then(|table| table.index_by_id.get(&id).copied())
            .ok_or(RefError::UnknownReference { id, category })
    }

    /// Logical id stored at a received wire index.
    pub fn id_at(&self, index: u64, category: RefCategory) -> Result<ReferenceId, RefError> {
        self.tables
            .get(&category)
            .and_then(|table| table.ordered.get(index as usize).copied())
            .ok_or(RefError::UnknownIndex { index, category })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn power_tables() -> RefTables {
        let mut tables = RefTables::new();
        tables.insert(RefCategory::Power, vec![0xAAAA, 0xBBBB, 0xCCCC]);
        tables
    }

    #[test]
    fn resolves_both_directions() {
        let tables = power_tables();
        assert_eq!(tables.index_of(0xBBBB, RefCategory::Power).unwrap(), 1);
        assert_eq!(tables.id_at(2, RefCategory::Power).unwrap(), 0xCCCC);
    }

    #[test]
    fn unknown_id_fails() {
        let tables = power_tables();
        assert_eq!(
            tables.index_of(0xDEAD, RefCategory::Power),
            Err(RefError::UnknownReference {
                id: 0xDEAD,
                category: RefCategory::Power
            })
        );
    }

    #[test]
    fn out_of_range_index_fails() {
        let tables = power_tables();
        assert_eq!(
            tables.id_at(3, RefCategory::Power),
            Err(RefError::UnknownIndex {
                index: 3,
                category: RefCategory::Power
            })
        );
    }

    #[test]
    fn missing_category_fails() {
        let tables = power_tables();
        assert!(tables.index_of(0xAAAA, RefCategory::Entity).is_err());
    }
}
