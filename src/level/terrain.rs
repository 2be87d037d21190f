//! Terrain types and the per-level terrain grid
//!
//! Terrain is fixed for the lifetime of a level; only passability matters to
//! the collision resolver, the sprite is carried for renderers.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{GridError, Result};
use crate::core::types::Cell;

/// Numeric terrain code as stored in level files
pub type TerrainCode = u16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainType {
    pub code: TerrainCode,
    pub name: String,
    pub passable: bool,
    #[serde(default)]
    pub sprite: Option<String>,
}

impl TerrainType {
    pub fn new(code: TerrainCode, name: &str, passable: bool) -> Self {
        Self {
            code,
            name: name.to_string(),
            passable,
            sprite: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TerrainFile {
    terrain: Vec<TerrainType>,
}

/// Terrain code -> passability + drawable
#[derive(Debug, Clone, Default)]
pub struct TerrainCatalog {
    types: AHashMap<TerrainCode, TerrainType>,
}

impl TerrainCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Floor, wall and water, enough for the bundled levels and tests
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(TerrainType::new(0, "floor", true));
        catalog.register(TerrainType::new(1, "wall", false));
        catalog.register(TerrainType::new(2, "water", false));
        catalog
    }

    pub fn register(&mut self, terrain: TerrainType) {
        self.types.insert(terrain.code, terrain);
    }

    /// Parse `[[terrain]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TerrainFile = toml::from_str(content)?;
        let mut catalog = Self::new();
        for terrain in file.terrain {
            if catalog.types.contains_key(&terrain.code) {
                return Err(GridError::InvalidLevel(format!(
                    "terrain code {} defined twice",
                    terrain.code
                )));
            }
            catalog.register(terrain);
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn get(&self, code: TerrainCode) -> Option<&TerrainType> {
        self.types.get(&code)
    }

    pub fn contains(&self, code: TerrainCode) -> bool {
        self.types.contains_key(&code)
    }

    /// Unknown codes are treated as solid
    pub fn is_passable(&self, code: TerrainCode) -> bool {
        self.get(code).map(|t| t.passable).unwrap_or(false)
    }
}

/// Dense row-major grid of terrain codes
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    codes: Vec<TerrainCode>,
}

impl TerrainGrid {
    /// Grid of a single terrain code
    pub fn filled(width: usize, height: usize, code: TerrainCode) -> Self {
        Self {
            width,
            height,
            codes: vec![code; width * height],
        }
    }

    /// Build from rows; every row must be `width` long and there must be `height` rows
    pub fn from_rows(width: usize, height: usize, rows: &[Vec<TerrainCode>]) -> Result<Self> {
        if rows.len() != height {
            return Err(GridError::InvalidLevel(format!(
                "expected {} terrain rows, found {}",
                height,
                rows.len()
            )));
        }
        let mut codes = Vec::with_capacity(width * height);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(GridError::InvalidLevel(format!(
                    "terrain row {} has {} columns, expected {}",
                    r,
                    row.len(),
                    width
                )));
            }
            codes.extend_from_slice(row);
        }
        Ok(Self {
            width,
            height,
            codes,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row >= 0
            && cell.col >= 0
            && (cell.row as usize) < self.height
            && (cell.col as usize) < self.width
    }

    #[inline]
    pub fn get(&self, cell: Cell) -> Option<TerrainCode> {
        if self.in_bounds(cell) {
            Some(self.codes[cell.row as usize * self.width + cell.col as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, cell: Cell, code: TerrainCode) {
        if self.in_bounds(cell) {
            self.codes[cell.row as usize * self.width + cell.col as usize] = code;
        }
    }

    /// Every code in row-major order
    pub fn codes(&self) -> impl Iterator<Item = TerrainCode> + '_ {
        self.codes.iter().copied()
    }
}
