//! Behavior dispatch
//!
//! Capabilities run in the order the entity type declares them. While an
//! entity's behaviors run they are taken out of the entity, so each variant
//! can mutate its own state and still call back into the simulation.

use rand::seq::SliceRandom;

use crate::core::types::{Cell, Offset};
use crate::entity::behavior::{Behavior, InputControl, RandomWalk, TrackFollow};
use crate::simulation::collision::{TerrainVerdict, Verdict};
use crate::simulation::motion::Kinematics;
use crate::simulation::Simulation;

impl Simulation {
    pub(crate) fn init_entity(&mut self, slot: usize) {
        let mut behaviors = std::mem::take(&mut self.entities.at_mut(slot).behaviors);
        for behavior in behaviors.iter_mut() {
            self.init_behavior(slot, behavior);
        }
        self.entities.at_mut(slot).behaviors = behaviors;
    }

    pub(crate) fn update_entity(&mut self, slot: usize) {
        let mut behaviors = std::mem::take(&mut self.entities.at_mut(slot).behaviors);
        for behavior in behaviors.iter_mut() {
            if self.entities.at(slot).is_eliminated() {
                break;
            }
            self.update_behavior(slot, behavior);
        }
        self.entities.at_mut(slot).behaviors = behaviors;
    }

    fn init_behavior(&mut self, slot: usize, behavior: &mut Behavior) {
        let now = self.clock.current;
        match behavior {
            Behavior::Movement => {
                let entity = self.entities.at_mut(slot);
                // Backdate one full move so the entity starts settled
                entity.move_start_tick = now - self.clock.ticks_per_move(entity.movement_speed);
                self.update_motion(slot);
            }
            Behavior::Input(control) => {
                self.entities.at_mut(slot).movement_speed = control.speed;
            }
            Behavior::RandomWalk(walk) => {
                walk.last_trigger = now;
                self.entities.at_mut(slot).movement_speed = walk.speed;
            }
            Behavior::TrackFollow(track) => {
                track.cursor = 0;
            }
            Behavior::EnergyHolder { .. } => {}
        }
    }

    fn update_behavior(&mut self, slot: usize, behavior: &mut Behavior) {
        match behavior {
            Behavior::Movement => self.update_motion(slot),
            Behavior::Input(control) => self.update_input(slot, control),
            Behavior::RandomWalk(walk) => self.update_random_walk(slot, walk),
            Behavior::TrackFollow(track) => self.update_track(slot, track),
            Behavior::EnergyHolder { .. } => {}
        }
    }

    fn is_arrived(&self, slot: usize) -> bool {
        Kinematics::of(self.entities.at(slot)).is_arrived(self.clock)
    }

    fn update_input(&mut self, slot: usize, control: &mut InputControl) {
        let now = self.clock.current;
        control.observe(&self.input, now);
        if !self.is_arrived(slot) {
            return;
        }
        if let Some(step) = control.take_step(now, self.clock.ticks_per_second) {
            let entity = self.entities.at_mut(slot);
            entity.movement_speed = control.speed;
            let target = entity.dst + step;
            self.move_entity(slot, target, now);
        }
    }

    fn update_random_walk(&mut self, slot: usize, walk: &mut RandomWalk) {
        let now = self.clock.current;
        if !walk.is_due(now, self.clock.ticks_per_second) || !self.is_arrived(slot) {
            return;
        }
        self.entities.at_mut(slot).movement_speed = walk.speed;

        let candidates = self.walk_candidates(slot, walk.speed);
        match candidates.choose(&mut self.rng) {
            Some(&target) => self.move_entity(slot, target, now),
            None => {
                tracing::debug!(entity = %self.entities.at(slot).id, "random walker is boxed in");
            }
        }
        walk.last_trigger = now;
    }

    /// Neighbor cells a fresh step could enter; pushes count as possible
    fn walk_candidates(&self, slot: usize, speed: f64) -> Vec<Cell> {
        let here = Kinematics::of(self.entities.at(slot));
        let scene = self.scene();
        Offset::CARDINALS
            .iter()
            .map(|step| here.stepped(*step, speed, self.clock.current))
            .filter(|probe| scene.check_terrain(probe) == TerrainVerdict::Clear)
            .filter(|probe| scene.check_entities(probe) != Verdict::Blocked)
            .map(|probe| probe.dst)
            .collect()
    }

    fn update_track(&mut self, slot: usize, track: &mut TrackFollow) {
        let Some(target) = track.next_target() else {
            return;
        };
        if !self.is_arrived(slot) {
            return;
        }
        self.move_entity(slot, target, self.clock.current);
        let reached = self.entities.at(slot).dst;
        track.confirm(target, reached);
    }
}
