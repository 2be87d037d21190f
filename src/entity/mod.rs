//! Entity model: kinematic state, flags and attached behaviors

pub mod behavior;
pub mod template;

use ahash::AHashMap;

use crate::core::types::{Cell, EntityId, Tick};

pub use behavior::{Behavior, BehaviorKind, InputControl, Overlay, RandomWalk, TrackFollow};
pub use template::{EntityCatalog, EntityFields, EntityTemplate, EntityType};

/// Boolean traits that steer collision and elimination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityFlags {
    /// Exempt from all entity-entity collision
    pub ghost: bool,
    /// Exempt from terrain collision
    pub no_clip: bool,
    /// Can be pushed by a moving entity
    pub can_push: bool,
    /// Cannot be the middle link of a push train
    pub heavy: bool,
    /// Swallows entities that arrive on or leave its cell
    pub is_pit: bool,
    pub allowed_to_leave_map: bool,
    pub is_player: bool,
    /// Set once a pit has swallowed this entity
    pub eliminated: bool,
}

/// A grid entity
///
/// The continuous position is never stored: it is derived from `src`, `dst`
/// and the move fraction, which itself is derived from the tick counters.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub type_name: String,
    pub src: Cell,
    pub dst: Cell,
    /// Cells per second
    pub movement_speed: f64,
    pub move_start_tick: Tick,
    pub flags: EntityFlags,
    pub behaviors: Vec<Behavior>,
    pub sprite: Option<String>,
    /// Has grid placement and belongs in the occupancy index
    pub(crate) placed: bool,
    /// Currently registered in the occupancy index
    pub(crate) indexed: bool,
}

impl Entity {
    pub fn has_behavior(&self, kind: BehaviorKind) -> bool {
        self.behaviors.iter().any(|b| b.kind() == kind)
    }

    pub fn has_movement(&self) -> bool {
        self.has_behavior(BehaviorKind::Movement)
    }

    pub fn is_moving_between_cells(&self) -> bool {
        self.src != self.dst
    }

    /// Cells this entity claims in the occupancy index
    pub fn claimed_cells(&self) -> Vec<Cell> {
        if !self.placed || self.flags.eliminated {
            Vec::new()
        } else if self.src == self.dst {
            vec![self.dst]
        } else {
            vec![self.src, self.dst]
        }
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn is_eliminated(&self) -> bool {
        self.flags.eliminated
    }

    /// Energy flag of the energy-holder capability, if attached
    pub fn has_energy(&self) -> Option<bool> {
        self.behaviors.iter().find_map(|b| match b {
            Behavior::EnergyHolder { has_energy } => Some(*has_energy),
            _ => None,
        })
    }

    pub fn set_energy(&mut self, value: bool) -> bool {
        for behavior in &mut self.behaviors {
            if let Behavior::EnergyHolder { has_energy } = behavior {
                *has_energy = value;
                return true;
            }
        }
        false
    }

    pub fn track(&self) -> Option<&TrackFollow> {
        self.behaviors.iter().find_map(|b| match b {
            Behavior::TrackFollow(track) => Some(track),
            _ => None,
        })
    }

    pub fn draw_hooks(&self) -> Vec<Overlay> {
        self.behaviors.iter().filter_map(|b| b.draw_hook()).collect()
    }
}

/// Entities in stable update order, with O(1) lookup by id
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    entities: Vec<Entity>,
    slots: AHashMap<EntityId, usize>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity and return its slot
    pub fn push(&mut self, entity: Entity) -> usize {
        let slot = self.entities.len();
        self.slots.insert(entity.id, slot);
        self.entities.push(entity);
        slot
    }

    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slot_of(id).map(|slot| &self.entities[slot])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = self.slot_of(id)?;
        self.entities.get_mut(slot)
    }

    pub fn at(&self, slot: usize) -> &Entity {
        &self.entities[slot]
    }

    pub fn at_mut(&mut self, slot: usize) -> &mut Entity {
        &mut self.entities[slot]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_entity(src: Cell, dst: Cell) -> Entity {
        Entity {
            id: EntityId::new(),
            name: "box".into(),
            type_name: "box".into(),
            src,
            dst,
            movement_speed: 1.0,
            move_start_tick: 0,
            flags: EntityFlags::default(),
            behaviors: vec![Behavior::Movement, Behavior::EnergyHolder { has_energy: false }],
            sprite: None,
            placed: true,
            indexed: false,
        }
    }

    #[test]
    fn test_claimed_cells() {
        let still = bare_entity(Cell::new(1, 1), Cell::new(1, 1));
        assert_eq!(still.claimed_cells(), vec![Cell::new(1, 1)]);

        let moving = bare_entity(Cell::new(1, 1), Cell::new(1, 2));
        assert_eq!(moving.claimed_cells(), vec![Cell::new(1, 1), Cell::new(1, 2)]);

        let mut dead = bare_entity(Cell::new(1, 1), Cell::new(1, 1));
        dead.flags.eliminated = true;
        assert!(dead.claimed_cells().is_empty());
    }

    #[test]
    fn test_energy_toggle() {
        let mut entity = bare_entity(Cell::ORIGIN, Cell::ORIGIN);
        assert_eq!(entity.has_energy(), Some(false));
        assert!(entity.set_energy(true));
        assert_eq!(entity.draw_hooks(), vec![Overlay::Energy]);
    }

    #[test]
    fn test_table_lookup_keeps_order() {
        let mut table = EntityTable::new();
        let a = bare_entity(Cell::ORIGIN, Cell::ORIGIN);
        let b = bare_entity(Cell::ORIGIN, Cell::ORIGIN);
        let (a_id, b_id) = (a.id, b.id);
        table.push(a);
        table.push(b);
        assert_eq!(table.slot_of(a_id), Some(0));
        assert_eq!(table.get(b_id).map(|e| e.id), Some(b_id));
        let order: Vec<_> = table.iter().map(|e| e.id).collect();
        assert_eq!(order, vec![a_id, b_id]);
    }
}
