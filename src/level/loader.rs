//! Load levels from JSON or TOML descriptors
//!
//! `LevelLoader` turns a `LevelDescriptor` into a running `Simulation`:
//! terrain is validated up front and fails the whole load, while a bad
//! entity entry is skipped with a warning so one typo doesn't lose a level.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{GridError, Result};
use crate::entity::template::{EntityCatalog, EntityTemplate};
use crate::level::terrain::{TerrainCatalog, TerrainCode, TerrainGrid};
use crate::level::Level;
use crate::simulation::Simulation;

/// On-disk level: terrain rows plus entity entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    #[serde(default)]
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub terrain: Vec<Vec<TerrainCode>>,
    #[serde(default)]
    pub entities: Vec<EntityTemplate>,
}

impl LevelDescriptor {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Pick the format from the file extension; anything but `.toml` is JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut descriptor = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            _ => Self::from_json_str(&content)?,
        };
        if descriptor.name.is_empty() {
            descriptor.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("level")
                .to_string();
        }
        Ok(descriptor)
    }
}

/// A freshly loaded simulation and the entity entries that were rejected
#[derive(Debug)]
pub struct LoadedLevel {
    pub simulation: Simulation,
    pub skipped: Vec<GridError>,
}

/// Builds simulations from descriptors against a pair of catalogs
pub struct LevelLoader<'a> {
    terrain: &'a TerrainCatalog,
    entity_types: &'a EntityCatalog,
}

impl<'a> LevelLoader<'a> {
    pub fn new(terrain: &'a TerrainCatalog, entity_types: &'a EntityCatalog) -> Self {
        Self {
            terrain,
            entity_types,
        }
    }

    pub fn load_from_json(&self, json: &str, config: SimulationConfig) -> Result<LoadedLevel> {
        let descriptor = LevelDescriptor::from_json_str(json)?;
        self.build(&descriptor, config)
    }

    pub fn load_from_file(&self, path: &Path, config: SimulationConfig) -> Result<LoadedLevel> {
        let descriptor = LevelDescriptor::load(path)?;
        self.build(&descriptor, config)
    }

    /// Validate terrain, then spawn every entity entry in order
    pub fn build(&self, descriptor: &LevelDescriptor, config: SimulationConfig) -> Result<LoadedLevel> {
        let grid = TerrainGrid::from_rows(descriptor.width, descriptor.height, &descriptor.terrain)?;
        let level = Level::new(&descriptor.name, grid, self.terrain.clone())?;
        let mut simulation = Simulation::new(level, self.entity_types.clone(), config)?;

        let mut skipped = Vec::new();
        for (i, template) in descriptor.entities.iter().enumerate() {
            if let Err(err) = simulation.create_entity(template) {
                tracing::warn!(
                    level = %descriptor.name,
                    entry = i,
                    entity_type = %template.type_name,
                    "skipping entity: {}",
                    err
                );
                skipped.push(err);
            }
        }

        tracing::info!(
            level = %descriptor.name,
            width = descriptor.width,
            height = descriptor.height,
            entities = simulation.entities().count(),
            skipped = skipped.len(),
            "level loaded"
        );

        Ok(LoadedLevel {
            simulation,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Cell;

    const LEVEL: &str = r#"{
        "name": "corridor",
        "width": 4,
        "height": 2,
        "terrain": [[0, 0, 0, 1], [1, 1, 1, 1]],
        "entities": [
            { "type": "player", "row_start": 0, "col_start": 0 },
            { "type": "box", "row_start": 0, "col_start": 1, "has_energy": true },
            { "type": "unicorn", "row_start": 0, "col_start": 2 }
        ]
    }"#;

    #[test]
    fn test_load_skips_bad_entities() {
        let terrain = TerrainCatalog::builtin();
        let types = EntityCatalog::builtin();
        let loaded = LevelLoader::new(&terrain, &types)
            .load_from_json(LEVEL, SimulationConfig::default().with_seed(1))
            .unwrap();

        assert_eq!(loaded.skipped.len(), 1);
        assert!(matches!(loaded.skipped[0], GridError::InvalidEntityTemplate { .. }));

        let sim = loaded.simulation;
        assert_eq!(sim.entities().count(), 2);
        assert_eq!(sim.level().name, "corridor");
        assert!(!sim.level().is_passable(Cell::new(0, 3)));
        assert_eq!(sim.entities_at(Cell::new(0, 1)).len(), 1);
    }

    #[test]
    fn test_unknown_terrain_fails_load() {
        let terrain = TerrainCatalog::builtin();
        let types = EntityCatalog::builtin();
        let json = r#"{ "width": 1, "height": 1, "terrain": [[42]] }"#;
        let result = LevelLoader::new(&terrain, &types).load_from_json(json, SimulationConfig::default());
        assert!(matches!(result, Err(GridError::InvalidLevel(_))));
    }

    #[test]
    fn test_descriptor_from_toml() {
        let descriptor = LevelDescriptor::from_toml_str(
            r#"
            name = "tiny"
            width = 2
            height = 1
            terrain = [[0, 0]]

            [[entities]]
            type = "hole"
            row_start = 0
            col_start = 1
            "#,
        )
        .unwrap();
        assert_eq!(descriptor.entities.len(), 1);
        assert_eq!(descriptor.entities[0].type_name, "hole");
        assert_eq!(descriptor.entities[0].overrides.col_start, Some(1));
    }
}
