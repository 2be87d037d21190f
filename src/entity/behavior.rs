//! Behavior capabilities attached to entities
//!
//! The capability list is resolved once at construction. Each variant keeps
//! its own state here; the simulation drives `init`/`update`/`draw_hook`
//! through a fixed dispatch (see `simulation::dispatch`). The decision logic
//! that doesn't need the world lives on the state structs below.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::core::input::{InputKey, InputState};
use crate::core::types::{Cell, Offset, Tick};

/// Capability names as they appear in the entity-type catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Movement,
    Input,
    RandomWalk,
    TrackFollow,
    EnergyHolder,
}

/// Presentation overlay requested by a draw hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Overlay {
    /// Lightning badge on an energized box
    Energy,
}

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Fraction/position bookkeeping and collision (the motion evaluator)
    Movement,
    Input(InputControl),
    RandomWalk(RandomWalk),
    TrackFollow(TrackFollow),
    EnergyHolder { has_energy: bool },
}

impl Behavior {
    pub fn kind(&self) -> BehaviorKind {
        match self {
            Behavior::Movement => BehaviorKind::Movement,
            Behavior::Input(_) => BehaviorKind::Input,
            Behavior::RandomWalk(_) => BehaviorKind::RandomWalk,
            Behavior::TrackFollow(_) => BehaviorKind::TrackFollow,
            Behavior::EnergyHolder { .. } => BehaviorKind::EnergyHolder,
        }
    }

    pub fn draw_hook(&self) -> Option<Overlay> {
        match self {
            Behavior::EnergyHolder { has_energy: true } => Some(Overlay::Energy),
            _ => None,
        }
    }
}

/// Keyboard-driven movement with edge-triggered taps and a held-key repeat
#[derive(Debug, Clone)]
pub struct InputControl {
    /// Seconds a key must be held before it starts repeating
    pub refractory_period: f64,
    /// Movement speed applied to every input-issued move
    pub speed: f64,
    held_since: AHashMap<InputKey, Tick>,
    hit: AHashSet<InputKey>,
}

impl InputControl {
    pub fn new(refractory_period: f64, speed: f64) -> Self {
        Self {
            refractory_period,
            speed,
            held_since: AHashMap::new(),
            hit: AHashSet::new(),
        }
    }

    /// Record newly pressed keys and forget released ones
    ///
    /// Runs every tick, arrived or not, so a tap during a move is not lost.
    pub fn observe(&mut self, input: &InputState, now: Tick) {
        for key in input.held() {
            if !self.held_since.contains_key(&key) {
                self.hit.insert(key);
                self.held_since.insert(key, now);
            }
        }
        self.held_since.retain(|key, _| input.is_held(*key));
    }

    /// Consume pending taps and combine them with repeating keys into one step
    ///
    /// Call only once the entity has arrived. Vertical input wins over
    /// horizontal when both are present.
    pub fn take_step(&mut self, now: Tick, ticks_per_second: u32) -> Option<Offset> {
        let hit = std::mem::take(&mut self.hit);
        let repeat_after = self.refractory_period * ticks_per_second as f64;
        let acts = |key: InputKey| {
            hit.contains(&key)
                || self
                    .held_since
                    .get(&key)
                    .map(|since| (now - since) as f64 > repeat_after)
                    .unwrap_or(false)
        };

        let mut step = Offset::ZERO;
        for key in InputKey::ALL {
            if acts(key) {
                let delta = key.step();
                step.row += delta.row;
                step.col += delta.col;
            }
        }
        if step.row != 0 {
            step.col = 0;
        }

        (!step.is_zero()).then_some(step)
    }
}

/// Periodic random single-step wandering
#[derive(Debug, Clone)]
pub struct RandomWalk {
    /// Seconds between walk attempts
    pub interval: f64,
    pub speed: f64,
    pub last_trigger: Tick,
}

impl RandomWalk {
    pub fn new(interval: f64, speed: f64) -> Self {
        Self {
            interval,
            speed,
            last_trigger: 0,
        }
    }

    pub fn is_due(&self, now: Tick, ticks_per_second: u32) -> bool {
        (now - self.last_trigger) as f64 > self.interval * ticks_per_second as f64
    }
}

/// Fixed route of destination cells
#[derive(Debug, Clone, Default)]
pub struct TrackFollow {
    pub track: Vec<Cell>,
    pub cursor: usize,
}

impl TrackFollow {
    pub fn new(track: Vec<Cell>) -> Self {
        Self { track, cursor: 0 }
    }

    pub fn next_target(&self) -> Option<Cell> {
        self.track.get(self.cursor).copied()
    }

    /// Advance past `target` only if the move actually landed there
    pub fn confirm(&mut self, target: Cell, reached: Cell) {
        if target == reached {
            self.cursor += 1;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.track.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_moves_once() {
        let mut control = InputControl::new(0.2, 10.0);
        let mut input = InputState::new();
        input.press(InputKey::Right);

        control.observe(&input, 100);
        assert_eq!(control.take_step(100, 60), Some(Offset::RIGHT));

        // Still held but inside the refractory window
        control.observe(&input, 101);
        assert_eq!(control.take_step(101, 60), None);
    }

    #[test]
    fn test_held_key_repeats_after_refractory() {
        let mut control = InputControl::new(0.2, 10.0);
        let mut input = InputState::new();
        input.press(InputKey::Down);
        control.observe(&input, 0);
        control.take_step(0, 60);

        // 0.2s at 60 tps = 12 ticks; repeat begins strictly after that
        control.observe(&input, 12);
        assert_eq!(control.take_step(12, 60), None);
        control.observe(&input, 13);
        assert_eq!(control.take_step(13, 60), Some(Offset::DOWN));
    }

    #[test]
    fn test_tap_survives_until_arrival() {
        let mut control = InputControl::new(0.2, 10.0);
        let mut input = InputState::new();
        input.press(InputKey::Left);
        control.observe(&input, 5);
        input.release(InputKey::Left);
        control.observe(&input, 6);

        // Released before the entity arrived, the tap still counts once
        assert_eq!(control.take_step(7, 60), Some(Offset::LEFT));
        assert_eq!(control.take_step(8, 60), None);
    }

    #[test]
    fn test_vertical_beats_horizontal() {
        let mut control = InputControl::new(0.0, 10.0);
        let mut input = InputState::new();
        input.press(InputKey::Up);
        input.press(InputKey::Right);
        control.observe(&input, 0);
        assert_eq!(control.take_step(0, 60), Some(Offset::UP));
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut control = InputControl::new(0.0, 10.0);
        let mut input = InputState::new();
        input.press(InputKey::Left);
        input.press(InputKey::Right);
        control.observe(&input, 0);
        assert_eq!(control.take_step(0, 60), None);
    }

    #[test]
    fn test_random_walk_interval() {
        let mut walk = RandomWalk::new(2.0, 15.0);
        walk.last_trigger = 10;
        assert!(!walk.is_due(130, 60));
        assert!(walk.is_due(131, 60));
    }

    #[test]
    fn test_track_cursor_only_advances_on_arrival() {
        let mut track = TrackFollow::new(vec![Cell::new(0, 1), Cell::new(0, 2)]);
        let target = track.next_target().unwrap();
        track.confirm(target, Cell::new(0, 0));
        assert_eq!(track.cursor, 0);
        track.confirm(target, Cell::new(0, 1));
        assert_eq!(track.next_target(), Some(Cell::new(0, 2)));
        track.confirm(Cell::new(0, 2), Cell::new(0, 2));
        assert!(track.is_finished());
    }

    #[test]
    fn test_energy_draw_hook() {
        assert_eq!(Behavior::EnergyHolder { has_energy: true }.draw_hook(), Some(Overlay::Energy));
        assert_eq!(Behavior::EnergyHolder { has_energy: false }.draw_hook(), None);
        assert_eq!(Behavior::Movement.draw_hook(), None);
    }
}
