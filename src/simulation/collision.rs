//! Collision resolver
//!
//! Every check here is a pure read over a `Scene` and by-value `Kinematics`,
//! so push chains and random-walk candidates can be probed without touching
//! the live entity. Only `Simulation::swallow` mutates.

use crate::core::types::{EntityId, Tick};
use crate::entity::EntityTable;
use crate::level::Level;
use crate::simulation::motion::{Clock, Kinematics};
use crate::simulation::Simulation;
use crate::spatial::OccupancyIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainVerdict {
    Clear,
    Blocked,
}

/// Outcome of an entity-entity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Free,
    Blocked,
    /// Allowed, provided the named entity is pushed along
    Pushing(EntityId),
}

/// Read-only view of the world for collision checks
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub level: &'a Level,
    pub index: &'a OccupancyIndex,
    pub entities: &'a EntityTable,
    pub clock: Clock,
}

impl<'a> Scene<'a> {
    fn now(&self) -> Tick {
        self.clock.current
    }

    /// Terrain at the destination
    pub fn check_terrain(&self, mover: &Kinematics) -> TerrainVerdict {
        if !self.level.in_bounds(mover.dst) {
            return if mover.flags.allowed_to_leave_map {
                TerrainVerdict::Clear
            } else {
                TerrainVerdict::Blocked
            };
        }
        if !mover.flags.no_clip && !self.level.is_passable(mover.dst) {
            TerrainVerdict::Blocked
        } else {
            TerrainVerdict::Clear
        }
    }

    /// Every entity indexed at the destination; any block beats any push
    ///
    /// Occupants are visited in entity-list order, so when several could be
    /// pushed the last one in that order wins.
    pub fn check_entities(&self, mover: &Kinematics) -> Verdict {
        let mut occupants: Vec<(usize, EntityId)> = Vec::new();
        for other_id in self.index.iter_at(mover.dst) {
            match self.entities.slot_of(other_id) {
                Some(slot) => occupants.push((slot, other_id)),
                None => {
                    tracing::warn!(entity = %other_id, cell = %mover.dst, "index names an unknown entity");
                }
            }
        }
        occupants.sort();

        let mut outcome = Verdict::Free;
        for (slot, _) in occupants {
            let other = self.entities.at(slot);
            match self.collide(mover, &Kinematics::of(other)) {
                Verdict::Blocked => return Verdict::Blocked,
                Verdict::Pushing(id) => outcome = Verdict::Pushing(id),
                Verdict::Free => {}
            }
        }
        outcome
    }

    /// Is `mover` blocked by, pushing, or free of `other`?
    pub fn collide(&self, mover: &Kinematics, other: &Kinematics) -> Verdict {
        if mover.id == other.id || mover.flags.ghost || other.flags.ghost {
            return Verdict::Free;
        }
        if mover.is_arrived(self.clock) {
            return Verdict::Free;
        }

        if other.is_arrived(self.clock) {
            if other.dst != mover.dst {
                return Verdict::Free;
            }
            if !other.flags.can_push {
                return Verdict::Blocked;
            }
            return self.probe_push(mover, other);
        }

        if is_synchronized_swap(mover, other) {
            return Verdict::Free;
        }
        let theirs = other.occupied(self.clock);
        if mover.occupied(self.clock).iter().any(|cell| theirs.contains(cell)) {
            Verdict::Blocked
        } else {
            Verdict::Free
        }
    }

    /// Follow the push chain through `other` without moving anything
    ///
    /// The mover itself is not in the index while it is being evaluated, so
    /// the chain never loops back to it.
    fn probe_push(&self, mover: &Kinematics, other: &Kinematics) -> Verdict {
        let shoved = other.pushed_by(mover, self.now());
        if self.check_terrain(&shoved) == TerrainVerdict::Blocked {
            return Verdict::Blocked;
        }
        match self.check_entities(&shoved) {
            Verdict::Blocked => Verdict::Blocked,
            Verdict::Pushing(_) if other.flags.heavy => Verdict::Blocked,
            _ => Verdict::Pushing(other.id),
        }
    }

    /// Entities a settled pit swallows this tick
    pub fn pit_victims(&self, pit: &Kinematics) -> Vec<EntityId> {
        if !pit.is_arrived(self.clock) {
            return Vec::new();
        }
        let mut victims: Vec<(usize, EntityId)> = self
            .index
            .iter_at(pit.dst)
            .filter(|id| *id != pit.id)
            .filter_map(|id| Some((self.entities.slot_of(id)?, self.entities.get(id)?)))
            .filter(|(_, other)| !other.flags.ghost && !other.is_eliminated())
            .filter(|(_, other)| {
                let k = Kinematics::of(other);
                (k.is_arrived(self.clock) && k.dst == pit.dst)
                    || (k.is_departing(self.clock) && k.src == pit.dst)
            })
            .map(|(slot, other)| (slot, other.id))
            .collect();
        victims.sort();
        victims.into_iter().map(|(_, id)| id).collect()
    }
}

/// Two movers sliding along the same line, the follower no faster than the leader
fn is_synchronized_swap(mover: &Kinematics, other: &Kinematics) -> bool {
    if mover.displacement() != other.displacement() {
        return false;
    }
    (mover.dst == other.src && mover.speed <= other.speed)
        || (other.dst == mover.src && other.speed <= mover.speed)
}

impl Simulation {
    pub(crate) fn scene(&self) -> Scene<'_> {
        Scene {
            level: &self.level,
            index: &self.index,
            entities: &self.entities,
            clock: self.clock,
        }
    }

    /// Eliminate whatever the pit at `pit` has caught
    pub(crate) fn swallow(&mut self, pit: &Kinematics) {
        for victim in self.scene().pit_victims(pit) {
            if let Some(slot) = self.entities.slot_of(victim) {
                self.eliminate(slot);
                tracing::info!(pit = %pit.id, victim = %victim, cell = %pit.dst, "entity fell into a pit");
            }
        }
    }

    /// Pull an entity out of play; it stays in the entity list as a ghost
    pub(crate) fn eliminate(&mut self, slot: usize) {
        if self.entities.at(slot).is_eliminated() {
            return;
        }
        self.unregister(slot);
        let entity = self.entities.at_mut(slot);
        entity.src = Default::default();
        entity.dst = Default::default();
        entity.flags.ghost = true;
        entity.flags.no_clip = true;
        entity.flags.eliminated = true;
        let id = entity.id;
        self.report.eliminated.push(id);
    }
}
