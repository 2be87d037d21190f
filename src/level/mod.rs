//! Levels: the fixed terrain a simulation runs on, and how levels are loaded

pub mod loader;
pub mod terrain;

pub use loader::{LevelDescriptor, LevelLoader, LoadedLevel};
pub use terrain::{TerrainCatalog, TerrainCode, TerrainGrid, TerrainType};

use crate::core::error::{GridError, Result};
use crate::core::types::Cell;

/// Terrain grid paired with the catalog that gives its codes meaning
#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    grid: TerrainGrid,
    terrain: TerrainCatalog,
}

impl Level {
    /// Every code in `grid` must be known to `terrain`
    pub fn new(name: &str, grid: TerrainGrid, terrain: TerrainCatalog) -> Result<Self> {
        if let Some(code) = grid.codes().find(|code| !terrain.contains(*code)) {
            return Err(GridError::InvalidLevel(format!(
                "level '{}' uses unknown terrain code {}",
                name, code
            )));
        }
        Ok(Self {
            name: name.to_string(),
            grid,
            terrain,
        })
    }

    /// Open floor of the given size, using the built-in terrain
    pub fn open(width: usize, height: usize) -> Self {
        Self {
            name: format!("open {}x{}", width, height),
            grid: TerrainGrid::filled(width, height, 0),
            terrain: TerrainCatalog::builtin(),
        }
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    pub fn terrain(&self) -> &TerrainCatalog {
        &self.terrain
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        self.grid.in_bounds(cell)
    }

    /// In bounds and on passable terrain
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.grid
            .get(cell)
            .map(|code| self.terrain.is_passable(code))
            .unwrap_or(false)
    }

    pub fn terrain_at(&self, cell: Cell) -> Option<&TerrainType> {
        self.grid.get(cell).and_then(|code| self.terrain.get(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_level_is_passable() {
        let level = Level::open(5, 1);
        assert!(level.is_passable(Cell::new(0, 4)));
        assert!(!level.is_passable(Cell::new(0, 5)));
        assert!(!level.is_passable(Cell::new(-1, 0)));
    }

    #[test]
    fn test_unknown_code_rejected() {
        let grid = TerrainGrid::from_rows(2, 1, &[vec![0, 7]]).unwrap();
        let err = Level::new("bad", grid, TerrainCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("unknown terrain code 7"));
    }

    #[test]
    fn test_wall_is_solid() {
        let grid = TerrainGrid::from_rows(3, 1, &[vec![0, 1, 0]]).unwrap();
        let level = Level::new("walled", grid, TerrainCatalog::builtin()).unwrap();
        assert!(!level.is_passable(Cell::new(0, 1)));
        assert_eq!(level.terrain_at(Cell::new(0, 1)).map(|t| t.name.as_str()), Some("wall"));
    }
}
