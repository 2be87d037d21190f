//! Motion evaluator
//!
//! Move progress is never accumulated. Every read recomputes it from the
//! absolute tick counters, so two evaluations at the same tick always agree.
//! Boundary tests compare `elapsed_ticks * speed` against whole multiples of
//! `ticks_per_second`, which keeps "exactly arrived" and "exactly departing"
//! free of division error.

use crate::core::types::{Cell, EntityId, Offset, Position, Tick};
use crate::entity::{Entity, EntityFlags};
use crate::simulation::collision::{TerrainVerdict, Verdict};
use crate::simulation::Simulation;

/// The simulation clock as seen by one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub current: Tick,
    pub ticks_per_second: u32,
}

impl Clock {
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            current: 0,
            ticks_per_second,
        }
    }

    /// Ticks one full move takes at `speed`, rounded up
    pub fn ticks_per_move(&self, speed: f64) -> Tick {
        (self.ticks_per_second as f64 / speed).ceil() as Tick
    }
}

/// Progress along one move in speed-scaled ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    scaled: f64,
    span: f64,
}

impl Progress {
    pub fn measure(start_tick: Tick, speed: f64, clock: Clock) -> Self {
        Self {
            scaled: (clock.current - start_tick) as f64 * speed,
            span: clock.ticks_per_second as f64,
        }
    }

    /// Moves completed since the start, without clamping
    pub fn unclamped(&self) -> f64 {
        self.scaled / self.span
    }

    pub fn fraction(&self) -> f64 {
        if self.is_arrived() {
            1.0
        } else if self.is_departing() {
            0.0
        } else {
            self.unclamped()
        }
    }

    pub fn is_arrived(&self) -> bool {
        self.scaled >= self.span
    }

    pub fn is_departing(&self) -> bool {
        self.scaled <= 0.0
    }

    /// At least `moves` full move durations have elapsed
    pub fn has_reached(&self, moves: f64) -> bool {
        self.scaled >= self.span * moves
    }
}

/// By-value snapshot of everything collision checks read from an entity
///
/// Speculative checks build hypothetical snapshots with `pushed_by` and
/// `stepped`; nothing is written back unless the caller commits a move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub id: EntityId,
    pub src: Cell,
    pub dst: Cell,
    pub start_tick: Tick,
    pub speed: f64,
    pub flags: EntityFlags,
}

impl Kinematics {
    pub fn of(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            src: entity.src,
            dst: entity.dst,
            start_tick: entity.move_start_tick,
            speed: entity.movement_speed,
            flags: entity.flags,
        }
    }

    pub fn progress(&self, clock: Clock) -> Progress {
        Progress::measure(self.start_tick, self.speed, clock)
    }

    /// Clamped move fraction; an entity with `src == dst` is always at 1.0
    pub fn fraction(&self, clock: Clock) -> f64 {
        if self.src == self.dst {
            1.0
        } else {
            self.progress(clock).fraction()
        }
    }

    /// Fraction exactly 1.0
    pub fn is_arrived(&self, clock: Clock) -> bool {
        self.src == self.dst || self.progress(clock).is_arrived()
    }

    /// Fraction exactly 0.0 on a real move
    pub fn is_departing(&self, clock: Clock) -> bool {
        self.src != self.dst && self.progress(clock).is_departing()
    }

    pub fn displacement(&self) -> Offset {
        self.dst.offset_from(self.src)
    }

    /// Cells this entity blocks for collision purposes
    pub fn occupied(&self, clock: Clock) -> Vec<Cell> {
        if self.is_arrived(clock) {
            vec![self.dst]
        } else {
            vec![self.src, self.dst]
        }
    }

    /// This entity as it would be if `pusher` shoved it this tick
    pub fn pushed_by(&self, pusher: &Kinematics, now: Tick) -> Self {
        Self {
            src: self.dst,
            dst: self.dst + pusher.displacement(),
            start_tick: now,
            speed: pusher.speed,
            ..*self
        }
    }

    /// A fresh one-cell move from the current destination
    pub fn stepped(&self, step: Offset, speed: f64, now: Tick) -> Self {
        Self {
            src: self.dst,
            dst: self.dst + step,
            start_tick: now,
            speed,
            ..*self
        }
    }

    pub fn position(&self, clock: Clock) -> Position {
        Position::lerp(self.src, self.dst, self.fraction(clock))
    }
}

impl Simulation {
    /// Per-tick movement update: re-evaluate in place and re-commit
    pub(crate) fn update_motion(&mut self, slot: usize) {
        if self.entities.at(slot).is_eliminated() {
            return;
        }
        self.unregister(slot);
        self.evaluate(slot);
        self.register(slot);
    }

    /// Start a move toward `target` and commit whatever the resolver allows
    ///
    /// The index is always left matching the final src/dst, bounced or not.
    pub(crate) fn move_entity(&mut self, slot: usize, target: Cell, start_tick: Tick) {
        self.unregister(slot);
        let entity = self.entities.at_mut(slot);
        entity.src = entity.dst;
        entity.dst = target;
        entity.move_start_tick = start_tick;
        self.evaluate(slot);
        self.register(slot);
    }

    /// Retire the source, resolve collisions, and run push and pit effects
    ///
    /// The entity must be unregistered while this runs.
    fn evaluate(&mut self, slot: usize) {
        let clock = self.clock;
        let mut kin = Kinematics::of(self.entities.at(slot));

        if kin.src != kin.dst && kin.progress(clock).has_reached(self.config.retire_source_after) {
            tracing::trace!(entity = %kin.id, cell = %kin.src, "retiring source cell");
            kin.src = kin.dst;
        }

        if self.scene().check_terrain(&kin) == TerrainVerdict::Blocked {
            tracing::debug!(entity = %kin.id, from = %kin.src, to = %kin.dst, "terrain bounce");
            kin.dst = kin.src;
            self.report.bounces += 1;
        }

        let verdict = self.scene().check_entities(&kin);
        if verdict == Verdict::Blocked {
            tracing::debug!(entity = %kin.id, from = %kin.src, to = %kin.dst, "blocked by entity");
            kin.dst = kin.src;
            self.report.bounces += 1;
        }

        let entity = self.entities.at_mut(slot);
        entity.src = kin.src;
        entity.dst = kin.dst;

        if let Verdict::Pushing(other) = verdict {
            self.execute_push(&kin, other);
        }

        if kin.flags.is_pit {
            self.swallow(&kin);
        }
    }

    /// Shove `other` one displacement along, in lock-step with `pusher`
    fn execute_push(&mut self, pusher: &Kinematics, other: EntityId) {
        let Some(slot) = self.entities.slot_of(other) else {
            tracing::warn!(pusher = %pusher.id, pushed = %other, "push target vanished");
            return;
        };
        let target = self.entities.at(slot).dst + pusher.displacement();
        self.entities.at_mut(slot).movement_speed = pusher.speed;
        tracing::debug!(pusher = %pusher.id, pushed = %other, to = %target, "push");
        self.report.pushes += 1;
        self.move_entity(slot, target, pusher.start_tick);
    }

    /// Claim the entity's cells in the occupancy index
    pub(crate) fn register(&mut self, slot: usize) {
        let entity = self.entities.at(slot);
        let id = entity.id;
        let cells = entity.claimed_cells();
        if cells.is_empty() {
            return;
        }
        for cell in cells {
            self.index.insert(id, cell);
        }
        self.entities.at_mut(slot).indexed = true;
    }

    /// Release whatever the entity was registered under
    ///
    /// Uses the src/dst the entity was registered with, so callers must not
    /// touch those fields between `register` and `unregister`.
    pub(crate) fn unregister(&mut self, slot: usize) {
        let entity = self.entities.at(slot);
        if !entity.indexed {
            return;
        }
        let id = entity.id;
        let cells = if entity.src == entity.dst {
            vec![entity.src]
        } else {
            vec![entity.src, entity.dst]
        };
        for cell in cells {
            if self.index.remove(id, cell).is_err() {
                self.report.desyncs += 1;
            }
        }
        self.entities.at_mut(slot).indexed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(current: Tick) -> Clock {
        Clock {
            current,
            ticks_per_second: 60,
        }
    }

    fn kin(src: Cell, dst: Cell, start_tick: Tick, speed: f64) -> Kinematics {
        Kinematics {
            id: EntityId::new(),
            src,
            dst,
            start_tick,
            speed,
            flags: EntityFlags::default(),
        }
    }

    #[test]
    fn test_fraction_is_clamped() {
        let k = kin(Cell::new(0, 0), Cell::new(0, 1), 100, 10.0);
        assert_eq!(k.fraction(clock_at(90)), 0.0);
        assert_eq!(k.fraction(clock_at(100)), 0.0);
        assert_eq!(k.fraction(clock_at(103)), 0.5);
        assert_eq!(k.fraction(clock_at(106)), 1.0);
        assert_eq!(k.fraction(clock_at(500)), 1.0);
    }

    #[test]
    fn test_exact_boundaries() {
        // 60 tps at speed 10: six ticks per move
        let k = kin(Cell::new(0, 0), Cell::new(0, 1), 0, 10.0);
        assert!(k.is_departing(clock_at(0)));
        assert!(!k.is_departing(clock_at(1)));
        assert!(!k.is_arrived(clock_at(5)));
        assert!(k.is_arrived(clock_at(6)));
        assert!(!k.progress(clock_at(17)).has_reached(3.0));
        assert!(k.progress(clock_at(18)).has_reached(3.0));
    }

    #[test]
    fn test_boundaries_with_awkward_speed() {
        // 60 / 7 is not a whole number of ticks; arrival must still be exact
        let k = kin(Cell::new(0, 0), Cell::new(1, 0), 0, 7.0);
        assert!(!k.is_arrived(clock_at(8)));
        assert!(k.is_arrived(clock_at(9)));
        assert_eq!(clock_at(0).ticks_per_move(7.0), 9);
    }

    #[test]
    fn test_stationary_entity_is_always_arrived() {
        let k = kin(Cell::new(2, 2), Cell::new(2, 2), 50, 1.0);
        assert_eq!(k.fraction(clock_at(50)), 1.0);
        assert!(!k.is_departing(clock_at(50)));
        assert_eq!(k.occupied(clock_at(50)), vec![Cell::new(2, 2)]);
    }

    #[test]
    fn test_occupied_while_moving() {
        let k = kin(Cell::new(0, 0), Cell::new(0, 1), 0, 1.0);
        assert_eq!(k.occupied(clock_at(30)), vec![Cell::new(0, 0), Cell::new(0, 1)]);
        assert_eq!(k.occupied(clock_at(60)), vec![Cell::new(0, 1)]);
    }

    #[test]
    fn test_position_interpolates() {
        let k = kin(Cell::new(0, 0), Cell::new(0, 2), 0, 1.0);
        assert_eq!(k.position(clock_at(30)), Position::new(0.0, 1.0));
    }

    #[test]
    fn test_hypotheticals() {
        let pusher = kin(Cell::new(0, 0), Cell::new(0, 1), 40, 10.0);
        let block = kin(Cell::new(0, 1), Cell::new(0, 1), 0, 1.0);
        let shoved = block.pushed_by(&pusher, 42);
        assert_eq!(shoved.src, Cell::new(0, 1));
        assert_eq!(shoved.dst, Cell::new(0, 2));
        assert_eq!(shoved.start_tick, 42);
        assert_eq!(shoved.speed, 10.0);
        assert_eq!(shoved.id, block.id);

        let step = block.stepped(Offset::UP, 15.0, 7);
        assert_eq!(step.dst, Cell::new(-1, 1));
        assert!(step.is_departing(clock_at(7)));
    }
}
