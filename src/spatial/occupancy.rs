//! Occupancy index: which entities currently claim which grid cell

use ahash::{AHashMap, AHashSet};

use crate::core::error::{GridError, Result};
use crate::core::types::{Cell, EntityId};

/// Flat cell -> entity-id map with O(1) membership
///
/// Holds membership only; entity lifetime belongs to the entity table.
/// Buckets are dropped as soon as they become empty.
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    cells: AHashMap<Cell, AHashSet<EntityId>>,
}

impl OccupancyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Claim `cell` for `entity`; inserting twice is a no-op
    pub fn insert(&mut self, entity: EntityId, cell: Cell) {
        self.cells.entry(cell).or_default().insert(entity);
    }

    /// Release `cell` for `entity`
    ///
    /// A missing pair means entity state and the index have already drifted
    /// apart. That is logged loudly and reported, never panicked on.
    pub fn remove(&mut self, entity: EntityId, cell: Cell) -> Result<()> {
        let removed = match self.cells.get_mut(&cell) {
            Some(bucket) => {
                let removed = bucket.remove(&entity);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
                removed
            }
            None => false,
        };

        if removed {
            Ok(())
        } else {
            tracing::error!(
                entity = %entity,
                row = cell.row,
                col = cell.col,
                occupants = self.entities_at(cell).len(),
                "requested removal of an entity that is not indexed at this cell"
            );
            Err(GridError::IndexDesync { entity, cell })
        }
    }

    /// Entities claiming `cell`; empty for unoccupied cells
    pub fn entities_at(&self, cell: Cell) -> AHashSet<EntityId> {
        self.cells.get(&cell).cloned().unwrap_or_default()
    }

    /// Borrowing iterator over the entities claiming `cell`
    pub fn iter_at(&self, cell: Cell) -> impl Iterator<Item = EntityId> + '_ {
        self.cells.get(&cell).into_iter().flatten().copied()
    }

    pub fn contains(&self, entity: EntityId, cell: Cell) -> bool {
        self.cells
            .get(&cell)
            .map(|bucket| bucket.contains(&entity))
            .unwrap_or(false)
    }

    /// Every cell `entity` is indexed under (linear scan, diagnostics only)
    pub fn cells_of(&self, entity: EntityId) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .cells
            .iter()
            .filter(|(_, bucket)| bucket.contains(&entity))
            .map(|(cell, _)| *cell)
            .collect();
        cells.sort();
        cells
    }

    /// Number of occupied cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All non-empty buckets
    pub fn buckets(&self) -> impl Iterator<Item = (Cell, &AHashSet<EntityId>)> + '_ {
        self.cells.iter().map(|(cell, bucket)| (*cell, bucket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = OccupancyIndex::new();
        let id = EntityId::new();
        index.insert(id, Cell::new(1, 1));
        index.insert(id, Cell::new(1, 1));
        assert_eq!(index.entities_at(Cell::new(1, 1)).len(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_prunes_empty_bucket() {
        let mut index = OccupancyIndex::new();
        let id = EntityId::new();
        index.insert(id, Cell::new(3, 4));
        index.remove(id, Cell::new(3, 4)).unwrap();
        assert!(index.is_empty());
        assert!(index.entities_at(Cell::new(3, 4)).is_empty());
    }

    #[test]
    fn test_remove_keeps_other_occupants() {
        let mut index = OccupancyIndex::new();
        let a = EntityId::new();
        let b = EntityId::new();
        index.insert(a, Cell::new(0, 0));
        index.insert(b, Cell::new(0, 0));
        index.remove(a, Cell::new(0, 0)).unwrap();
        assert_eq!(index.iter_at(Cell::new(0, 0)).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_remove_missing_pair_is_desync() {
        let mut index = OccupancyIndex::new();
        let a = EntityId::new();
        let b = EntityId::new();
        index.insert(a, Cell::new(2, 2));

        let err = index.remove(b, Cell::new(2, 2)).unwrap_err();
        assert!(matches!(err, GridError::IndexDesync { entity, .. } if entity == b));
        // No-op: the other occupant is untouched
        assert!(index.contains(a, Cell::new(2, 2)));

        assert!(index.remove(a, Cell::new(9, 9)).is_err());
    }

    #[test]
    fn test_cells_of() {
        let mut index = OccupancyIndex::new();
        let id = EntityId::new();
        index.insert(id, Cell::new(0, 1));
        index.insert(id, Cell::new(0, 0));
        assert_eq!(index.cells_of(id), vec![Cell::new(0, 0), Cell::new(0, 1)]);
    }
}
