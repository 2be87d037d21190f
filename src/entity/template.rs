//! Entity-type catalog and the template builder
//!
//! An entity is built from its type's defaults with level-specific overrides
//! layered on top, field by field. Validation happens here, once, so the
//! simulation never sees a half-specified entity.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{GridError, Result};
use crate::core::types::{Cell, EntityId};
use crate::entity::behavior::{Behavior, BehaviorKind, InputControl, RandomWalk, TrackFollow};
use crate::entity::{Entity, EntityFlags};

/// Optional entity fields shared by type defaults and level overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFields {
    pub movement_speed: Option<f64>,
    pub ghost: Option<bool>,
    pub no_clip: Option<bool>,
    pub can_push: Option<bool>,
    pub heavy: Option<bool>,
    #[serde(alias = "hole")]
    pub is_pit: Option<bool>,
    pub allowed_to_leave_map: Option<bool>,
    pub is_player: Option<bool>,
    pub has_energy: Option<bool>,
    pub input_speed: Option<f64>,
    pub input_refractory_period: Option<f64>,
    pub random_walk_speed: Option<f64>,
    pub random_walk_interval: Option<f64>,
    pub track: Option<Vec<[i32; 2]>>,
    #[serde(alias = "image_path")]
    pub sprite: Option<String>,
    pub row_start: Option<i32>,
    pub col_start: Option<i32>,
    pub row_src: Option<i32>,
    pub col_src: Option<i32>,
    pub row_dst: Option<i32>,
    pub col_dst: Option<i32>,
}

impl EntityFields {
    /// `overrides` wins wherever it sets a field
    pub fn merged(&self, overrides: &EntityFields) -> EntityFields {
        EntityFields {
            movement_speed: overrides.movement_speed.or(self.movement_speed),
            ghost: overrides.ghost.or(self.ghost),
            no_clip: overrides.no_clip.or(self.no_clip),
            can_push: overrides.can_push.or(self.can_push),
            heavy: overrides.heavy.or(self.heavy),
            is_pit: overrides.is_pit.or(self.is_pit),
            allowed_to_leave_map: overrides.allowed_to_leave_map.or(self.allowed_to_leave_map),
            is_player: overrides.is_player.or(self.is_player),
            has_energy: overrides.has_energy.or(self.has_energy),
            input_speed: overrides.input_speed.or(self.input_speed),
            input_refractory_period: overrides
                .input_refractory_period
                .or(self.input_refractory_period),
            random_walk_speed: overrides.random_walk_speed.or(self.random_walk_speed),
            random_walk_interval: overrides.random_walk_interval.or(self.random_walk_interval),
            track: overrides.track.clone().or_else(|| self.track.clone()),
            sprite: overrides.sprite.clone().or_else(|| self.sprite.clone()),
            row_start: overrides.row_start.or(self.row_start),
            col_start: overrides.col_start.or(self.col_start),
            row_src: overrides.row_src.or(self.row_src),
            col_src: overrides.col_src.or(self.col_src),
            row_dst: overrides.row_dst.or(self.row_dst),
            col_dst: overrides.col_dst.or(self.col_dst),
        }
    }

    /// Place the entity at a single cell
    pub fn at(mut self, row: i32, col: i32) -> Self {
        self.row_start = Some(row);
        self.col_start = Some(col);
        self
    }

    /// Resolve grid placement as (src, dst)
    ///
    /// Either all four src/dst fields, or a start pair, or nothing at all.
    fn placement(&self) -> std::result::Result<Option<(Cell, Cell)>, String> {
        match (self.row_src, self.col_src, self.row_dst, self.col_dst) {
            (Some(rs), Some(cs), Some(rd), Some(cd)) => {
                return Ok(Some((Cell::new(rs, cs), Cell::new(rd, cd))))
            }
            (None, None, None, None) => {}
            _ => return Err("row_src, col_src, row_dst and col_dst must be given together".into()),
        }
        match (self.row_start, self.col_start) {
            (Some(row), Some(col)) => Ok(Some((Cell::new(row, col), Cell::new(row, col)))),
            (None, None) => Ok(None),
            _ => Err("row_start and col_start must be given together".into()),
        }
    }
}

/// Default capability list and field values for one entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    pub behaviors: Vec<BehaviorKind>,
    #[serde(flatten)]
    pub defaults: EntityFields,
}

impl EntityType {
    pub fn new(behaviors: Vec<BehaviorKind>, defaults: EntityFields) -> Self {
        Self {
            behaviors,
            defaults,
        }
    }

    /// Build a validated entity with a fresh id
    pub fn instantiate(
        &self,
        type_name: &str,
        overrides: &EntityFields,
        config: &SimulationConfig,
    ) -> Result<Entity> {
        let invalid = |reason: String| GridError::invalid_template(type_name, reason);
        let fields = self.defaults.merged(overrides);

        let speed = fields
            .movement_speed
            .unwrap_or(config.default_movement_speed);
        require_speed("movement_speed", speed).map_err(invalid)?;

        let has_movement = self.behaviors.contains(&BehaviorKind::Movement);
        // A pushed entity must run the motion evaluator to give up its source cell
        if fields.can_push.unwrap_or(false) && !has_movement {
            return Err(invalid("can_push requires the movement behavior".into()));
        }
        let mut behaviors = Vec::with_capacity(self.behaviors.len());
        for (i, kind) in self.behaviors.iter().enumerate() {
            if self.behaviors[..i].contains(kind) {
                return Err(invalid(format!("behavior {:?} listed twice", kind)));
            }
            behaviors.push(build_behavior(*kind, &fields, speed, has_movement).map_err(invalid)?);
        }

        let placement = fields.placement().map_err(invalid)?;
        let (src, dst, placed) = match placement {
            Some((src, dst)) => (src, dst, true),
            // Movers without explicit placement start at the origin
            None => (Cell::ORIGIN, Cell::ORIGIN, has_movement),
        };

        let id = EntityId::new();
        Ok(Entity {
            id,
            name: format!("{} #{}", type_name, id.short()),
            type_name: type_name.to_string(),
            src,
            dst,
            movement_speed: speed,
            move_start_tick: 0,
            flags: EntityFlags {
                ghost: fields.ghost.unwrap_or(false),
                no_clip: fields.no_clip.unwrap_or(false),
                can_push: fields.can_push.unwrap_or(false),
                heavy: fields.heavy.unwrap_or(false),
                is_pit: fields.is_pit.unwrap_or(false),
                allowed_to_leave_map: fields.allowed_to_leave_map.unwrap_or(false),
                is_player: fields.is_player.unwrap_or(false),
                eliminated: false,
            },
            behaviors,
            sprite: fields.sprite.clone(),
            placed,
            indexed: false,
        })
    }
}

fn require_speed(field: &str, value: f64) -> std::result::Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a positive number, got {}", field, value))
    }
}

fn build_behavior(
    kind: BehaviorKind,
    fields: &EntityFields,
    movement_speed: f64,
    has_movement: bool,
) -> std::result::Result<Behavior, String> {
    let needs_movement = matches!(
        kind,
        BehaviorKind::Input | BehaviorKind::RandomWalk | BehaviorKind::TrackFollow
    );
    if needs_movement && !has_movement {
        return Err(format!("behavior {:?} requires the movement behavior", kind));
    }

    let behavior = match kind {
        BehaviorKind::Movement => Behavior::Movement,
        BehaviorKind::Input => {
            let speed = fields.input_speed.unwrap_or(movement_speed);
            require_speed("input_speed", speed)?;
            let refractory = fields.input_refractory_period.unwrap_or(0.0);
            if !refractory.is_finite() || refractory < 0.0 {
                return Err(format!("input_refractory_period must be >= 0, got {}", refractory));
            }
            Behavior::Input(InputControl::new(refractory, speed))
        }
        BehaviorKind::RandomWalk => {
            let speed = fields.random_walk_speed.unwrap_or(movement_speed);
            require_speed("random_walk_speed", speed)?;
            let interval = fields.random_walk_interval.unwrap_or(1.0);
            if !interval.is_finite() || interval < 0.0 {
                return Err(format!("random_walk_interval must be >= 0, got {}", interval));
            }
            Behavior::RandomWalk(RandomWalk::new(interval, speed))
        }
        BehaviorKind::TrackFollow => {
            let track = fields
                .track
                .as_ref()
                .map(|cells| cells.iter().map(|&c| Cell::from(c)).collect())
                .unwrap_or_default();
            Behavior::TrackFollow(TrackFollow::new(track))
        }
        BehaviorKind::EnergyHolder => Behavior::EnergyHolder {
            has_energy: fields.has_energy.unwrap_or(false),
        },
    };
    Ok(behavior)
}

/// One entity entry in a level: a type name plus overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTemplate {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(flatten)]
    pub overrides: EntityFields,
}

impl EntityTemplate {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            overrides: EntityFields::default(),
        }
    }

    pub fn at(mut self, row: i32, col: i32) -> Self {
        self.overrides = self.overrides.at(row, col);
        self
    }

    pub fn with(mut self, overrides: EntityFields) -> Self {
        self.overrides = self.overrides.merged(&overrides);
        self
    }
}

/// Type name -> defaults
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    types: AHashMap<String, EntityType>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock puzzle pieces: player, roamer, box, crate and hole
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(
            "player",
            EntityType::new(
                vec![BehaviorKind::Movement, BehaviorKind::Input, BehaviorKind::TrackFollow],
                EntityFields {
                    input_refractory_period: Some(0.2),
                    input_speed: Some(10.0),
                    sprite: Some("img/player.png".into()),
                    is_player: Some(true),
                    can_push: Some(true),
                    track: Some(Vec::new()),
                    ..EntityFields::default()
                },
            ),
        );
        catalog.register(
            "roamer",
            EntityType::new(
                vec![BehaviorKind::Movement, BehaviorKind::RandomWalk],
                EntityFields {
                    random_walk_speed: Some(15.0),
                    random_walk_interval: Some(2.0),
                    can_push: Some(true),
                    ..EntityFields::default()
                },
            ),
        );
        catalog.register(
            "box",
            EntityType::new(
                vec![BehaviorKind::Movement, BehaviorKind::EnergyHolder],
                EntityFields {
                    sprite: Some("img/crate2.png".into()),
                    can_push: Some(true),
                    has_energy: Some(false),
                    ..EntityFields::default()
                },
            ),
        );
        catalog.register(
            "crate",
            EntityType::new(
                vec![BehaviorKind::Movement, BehaviorKind::EnergyHolder],
                EntityFields {
                    sprite: Some("img/crate1.png".into()),
                    can_push: Some(true),
                    has_energy: Some(false),
                    heavy: Some(true),
                    ..EntityFields::default()
                },
            ),
        );
        catalog.register(
            "hole",
            EntityType::new(
                vec![BehaviorKind::Movement],
                EntityFields {
                    is_pit: Some(true),
                    ghost: Some(true),
                    ..EntityFields::default()
                },
            ),
        );
        catalog
    }

    pub fn register(&mut self, name: &str, entity_type: EntityType) {
        self.types.insert(name.to_string(), entity_type);
    }

    /// Parse a TOML document whose top-level tables are entity types
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let types: AHashMap<String, EntityType> = toml::from_str(content)?;
        Ok(Self { types })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn instantiate(&self, template: &EntityTemplate, config: &SimulationConfig) -> Result<Entity> {
        let entity_type = self.get(&template.type_name).ok_or_else(|| {
            GridError::invalid_template(&template.type_name, "unknown entity type")
        })?;
        entity_type.instantiate(&template.type_name, &template.overrides, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig::default()
    }

    #[test]
    fn test_builtin_player() {
        let catalog = EntityCatalog::builtin();
        let player = catalog
            .instantiate(&EntityTemplate::new("player").at(3, 4), &config())
            .unwrap();
        assert!(player.flags.is_player);
        assert!(player.flags.can_push);
        assert_eq!(player.src, Cell::new(3, 4));
        assert_eq!(player.dst, Cell::new(3, 4));
        assert!(player.has_movement());
        assert!(player.name.starts_with("player #"));
        let kinds: Vec<_> = player.behaviors.iter().map(|b| b.kind()).collect();
        assert_eq!(
            kinds,
            vec![BehaviorKind::Movement, BehaviorKind::Input, BehaviorKind::TrackFollow]
        );
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let catalog = EntityCatalog::builtin();
        let template = EntityTemplate::new("box").at(0, 0).with(EntityFields {
            heavy: Some(true),
            has_energy: Some(true),
            ..EntityFields::default()
        });
        let entity = catalog.instantiate(&template, &config()).unwrap();
        assert!(entity.flags.heavy);
        assert_eq!(entity.has_energy(), Some(true));
    }

    #[test]
    fn test_fresh_ids() {
        let catalog = EntityCatalog::builtin();
        let a = catalog.instantiate(&EntityTemplate::new("box"), &config()).unwrap();
        let b = catalog.instantiate(&EntityTemplate::new("box"), &config()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_unknown_type_is_invalid() {
        let catalog = EntityCatalog::builtin();
        let err = catalog
            .instantiate(&EntityTemplate::new("dragon"), &config())
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidEntityTemplate { .. }));
    }

    #[test]
    fn test_partial_placement_is_invalid() {
        let catalog = EntityCatalog::builtin();
        let template = EntityTemplate::new("box").with(EntityFields {
            row_src: Some(1),
            col_src: Some(1),
            ..EntityFields::default()
        });
        assert!(catalog.instantiate(&template, &config()).is_err());

        let template = EntityTemplate::new("box").with(EntityFields {
            row_start: Some(1),
            ..EntityFields::default()
        });
        assert!(catalog.instantiate(&template, &config()).is_err());
    }

    #[test]
    fn test_explicit_src_dst() {
        let catalog = EntityCatalog::builtin();
        let template = EntityTemplate::new("box").with(EntityFields {
            row_src: Some(1),
            col_src: Some(1),
            row_dst: Some(1),
            col_dst: Some(2),
            ..EntityFields::default()
        });
        let entity = catalog.instantiate(&template, &config()).unwrap();
        assert_eq!(entity.claimed_cells(), vec![Cell::new(1, 1), Cell::new(1, 2)]);
    }

    #[test]
    fn test_rejects_bad_speed() {
        let catalog = EntityCatalog::builtin();
        let template = EntityTemplate::new("box").with(EntityFields {
            movement_speed: Some(0.0),
            ..EntityFields::default()
        });
        assert!(catalog.instantiate(&template, &config()).is_err());
    }

    #[test]
    fn test_walker_without_movement_is_invalid() {
        let mut catalog = EntityCatalog::new();
        catalog.register(
            "drifter",
            EntityType::new(vec![BehaviorKind::RandomWalk], EntityFields::default()),
        );
        let err = catalog
            .instantiate(&EntityTemplate::new("drifter"), &config())
            .unwrap_err();
        assert!(err.to_string().contains("requires the movement behavior"));
    }

    #[test]
    fn test_pushable_without_movement_is_invalid() {
        let mut catalog = EntityCatalog::new();
        catalog.register(
            "stone",
            EntityType::new(
                Vec::new(),
                EntityFields {
                    can_push: Some(true),
                    ..EntityFields::default()
                },
            ),
        );
        let err = catalog
            .instantiate(&EntityTemplate::new("stone").at(0, 1), &config())
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidEntityTemplate { .. }));
        assert!(err.to_string().contains("can_push requires the movement behavior"));

        // Still fine as a fixed obstacle
        let post = EntityTemplate::new("stone").at(0, 1).with(EntityFields {
            can_push: Some(false),
            ..EntityFields::default()
        });
        assert!(catalog.instantiate(&post, &config()).is_ok());
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = EntityCatalog::from_toml_str(
            r#"
            [boulder]
            behaviors = ["movement"]
            can_push = true
            heavy = true
            image_path = "img/boulder.png"

            [ghoul]
            behaviors = ["movement", "random_walk"]
            random_walk_speed = 4.0
            random_walk_interval = 0.5
            ghost = true
            "#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);

        let boulder = catalog
            .instantiate(&EntityTemplate::new("boulder").at(2, 2), &config())
            .unwrap();
        assert!(boulder.flags.heavy);
        assert_eq!(boulder.sprite.as_deref(), Some("img/boulder.png"));

        let ghoul = catalog.instantiate(&EntityTemplate::new("ghoul"), &config()).unwrap();
        assert!(ghoul.flags.ghost);
        assert!(matches!(&ghoul.behaviors[1], Behavior::RandomWalk(walk) if walk.speed == 4.0));
    }

    #[test]
    fn test_template_from_json_uses_type_key() {
        let template: EntityTemplate =
            serde_json::from_str(r#"{ "type": "hole", "row_start": 2, "col_start": 5 }"#).unwrap();
        assert_eq!(template.type_name, "hole");
        let hole = EntityCatalog::builtin()
            .instantiate(&template, &config())
            .unwrap();
        assert!(hole.flags.is_pit && hole.flags.ghost);
        assert_eq!(hole.dst, Cell::new(2, 5));
    }
}
