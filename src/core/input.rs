//! Held-key state polled by input-driven entities
//!
//! Key capture happens outside the core; the driver reports presses and
//! releases here and the simulation reads the held set once per tick.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::Offset;

/// Directional input identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKey {
    Up,
    Down,
    Left,
    Right,
}

impl InputKey {
    pub const ALL: [InputKey; 4] = [InputKey::Down, InputKey::Up, InputKey::Right, InputKey::Left];

    /// Map a browser-style key code (`ArrowUp`, ...) or a short name (`up`)
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ArrowUp" | "up" | "w" => Some(InputKey::Up),
            "ArrowDown" | "down" | "s" => Some(InputKey::Down),
            "ArrowLeft" | "left" | "a" => Some(InputKey::Left),
            "ArrowRight" | "right" | "d" => Some(InputKey::Right),
            _ => None,
        }
    }

    pub fn step(&self) -> Offset {
        match self {
            InputKey::Up => Offset::UP,
            InputKey::Down => Offset::DOWN,
            InputKey::Left => Offset::LEFT,
            InputKey::Right => Offset::RIGHT,
        }
    }
}

/// Set of currently held keys
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: AHashSet<InputKey>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: InputKey) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: InputKey) {
        self.held.remove(&key);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: InputKey) -> bool {
        self.held.contains(&key)
    }

    pub fn held(&self) -> impl Iterator<Item = InputKey> + '_ {
        self.held.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
