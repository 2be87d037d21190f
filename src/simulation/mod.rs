//! The simulation context: level, entities, occupancy index and clock
//!
//! Everything the movement core touches is owned here and reached through
//! `&mut self`; there is no global state.

pub mod collision;
pub mod dispatch;
pub mod motion;

pub use collision::{Scene, TerrainVerdict, Verdict};
pub use motion::{Clock, Kinematics, Progress};

use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{GridError, Result};
use crate::core::input::InputState;
use crate::core::types::{Cell, EntityId, Position, Tick};
use crate::entity::behavior::Overlay;
use crate::entity::template::{EntityCatalog, EntityTemplate};
use crate::entity::{Entity, EntityTable};
use crate::level::Level;
use crate::spatial::OccupancyIndex;

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub pushes: usize,
    /// Moves sent back to their source by terrain or another entity
    pub bounces: usize,
    pub eliminated: Vec<EntityId>,
    /// Index removals that found nothing to remove
    pub desyncs: usize,
}

#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    level: Level,
    catalog: EntityCatalog,
    index: OccupancyIndex,
    entities: EntityTable,
    clock: Clock,
    input: InputState,
    rng: ChaCha8Rng,
    player: Option<EntityId>,
    report: TickReport,
}

impl Simulation {
    pub fn new(level: Level, catalog: EntityCatalog, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            clock: Clock::new(config.ticks_per_second),
            config,
            level,
            catalog,
            index: OccupancyIndex::new(),
            entities: EntityTable::new(),
            input: InputState::new(),
            rng,
            player: None,
            report: TickReport::default(),
        })
    }

    /// Build an entity from a template, initialize it and index it
    pub fn create_entity(&mut self, template: &EntityTemplate) -> Result<EntityId> {
        let entity = self.catalog.instantiate(template, &self.config)?;
        let id = entity.id;
        let is_player = entity.flags.is_player;
        let slot = self.entities.push(entity);

        self.init_entity(slot);
        self.register(slot);

        if is_player && self.player.is_none() {
            self.player = Some(id);
        }
        let entity = self.entities.at(slot);
        tracing::debug!(entity = %id, name = %entity.name, cell = %entity.dst, "entity created");
        Ok(id)
    }

    /// Run every live entity's behaviors at `current_tick`
    pub fn tick(&mut self, current_tick: Tick) -> TickReport {
        if current_tick < self.clock.current {
            tracing::warn!(from = self.clock.current, to = current_tick, "clock moved backwards");
        }
        self.clock.current = current_tick;
        self.report = TickReport {
            tick: current_tick,
            ..TickReport::default()
        };

        for slot in 0..self.entities.len() {
            if !self.entities.at(slot).is_eliminated() {
                self.update_entity(slot);
            }
        }

        if self.report.desyncs > 0 {
            tracing::error!(tick = current_tick, desyncs = self.report.desyncs, "occupancy index drifted this tick");
        }
        std::mem::take(&mut self.report)
    }

    /// Advance the clock by one tick
    pub fn step(&mut self) -> TickReport {
        self.tick(self.clock.current + 1)
    }

    /// Start a move toward (`row`, `col`) at the current tick
    ///
    /// Rejected requests leave the entity untouched. An accepted request may
    /// still bounce; inspect `dst` afterwards to see where it is headed.
    pub fn issue_move(&mut self, id: EntityId, row: i32, col: i32) -> Result<()> {
        let slot = self
            .entities
            .slot_of(id)
            .ok_or_else(|| GridError::malformed_move(id, "unknown entity"))?;
        let entity = self.entities.at(slot);
        let rejection = if !entity.has_movement() {
            Some("entity has no movement capability")
        } else if entity.is_eliminated() {
            Some("entity has been eliminated")
        } else if !(entity.movement_speed.is_finite() && entity.movement_speed > 0.0) {
            Some("movement speed must be a positive number")
        } else {
            None
        };
        if let Some(reason) = rejection {
            let err = GridError::malformed_move(id, reason);
            tracing::warn!("{}", err);
            return Err(err);
        }

        self.move_entity(slot, Cell::new(row, col), self.clock.current);
        Ok(())
    }

    /// Non-mutating check of a fresh move by `id` to `target`
    pub fn probe_move(&self, id: EntityId, target: Cell) -> Result<(TerrainVerdict, Verdict)> {
        let entity = self.entities.get(id).ok_or(GridError::UnknownEntity(id))?;
        let here = Kinematics::of(entity);
        let probe = Kinematics {
            src: here.dst,
            dst: target,
            start_tick: self.clock.current,
            ..here
        };
        let scene = self.scene();
        Ok((scene.check_terrain(&probe), scene.check_entities(&probe)))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// All entities in update order, eliminated ones included
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entities.get(id))
    }

    pub fn fraction(&self, id: EntityId) -> Option<f64> {
        self.entities
            .get(id)
            .map(|entity| Kinematics::of(entity).fraction(self.clock))
    }

    /// Interpolated position for renderers
    pub fn position(&self, id: EntityId) -> Option<Position> {
        self.entities
            .get(id)
            .map(|entity| Kinematics::of(entity).position(self.clock))
    }

    pub fn entities_at(&self, cell: Cell) -> AHashSet<EntityId> {
        self.index.entities_at(cell)
    }

    pub fn draw_hooks(&self, id: EntityId) -> Vec<Overlay> {
        self.entities
            .get(id)
            .map(|entity| entity.draw_hooks())
            .unwrap_or_default()
    }

    pub fn set_energy(&mut self, id: EntityId, has_energy: bool) -> Result<bool> {
        let entity = self.entities.get_mut(id).ok_or(GridError::UnknownEntity(id))?;
        Ok(entity.set_energy(has_energy))
    }

    pub fn index(&self) -> &OccupancyIndex {
        &self.index
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Held keys, polled by input-driven entities on the next tick
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Compare the index against every entity's claimed cells
    ///
    /// Returns one line per mismatch; empty when consistent.
    pub fn index_mismatches(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut expected = 0;
        for entity in self.entities.iter() {
            let mut wanted = entity.claimed_cells();
            wanted.sort();
            expected += wanted.len();
            let indexed = self.index.cells_of(entity.id);
            if indexed != wanted {
                problems.push(format!(
                    "{} claims {:?} but is indexed at {:?}",
                    entity.name, wanted, indexed
                ));
            }
        }
        let total: usize = self.index.buckets().map(|(_, bucket)| bucket.len()).sum();
        if total != expected {
            problems.push(format!("index holds {} entries, entities claim {}", total, expected));
        }
        problems
    }
}
