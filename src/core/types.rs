//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for display names and log lines
    pub fn short(&self) -> String {
        let mut text = self.0.simple().to_string();
        text.truncate(8);
        text
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Simulation tick counter
///
/// Signed so that a freshly spawned entity can backdate its move start
/// before tick zero and begin fully arrived.
pub type Tick = i64;

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const ORIGIN: Cell = Cell { row: 0, col: 0 };

    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Displacement that carries `from` onto `self`
    pub fn offset_from(&self, from: Cell) -> Offset {
        Offset::new(self.row - from.row, self.col - from.col)
    }
}

impl std::ops::Add<Offset> for Cell {
    type Output = Cell;
    fn add(self, rhs: Offset) -> Cell {
        Cell::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl From<[i32; 2]> for Cell {
    fn from([row, col]: [i32; 2]) -> Self {
        Cell::new(row, col)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Row/column displacement between two cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub row: i32,
    pub col: i32,
}

impl Offset {
    pub const ZERO: Offset = Offset { row: 0, col: 0 };
    pub const UP: Offset = Offset { row: -1, col: 0 };
    pub const DOWN: Offset = Offset { row: 1, col: 0 };
    pub const LEFT: Offset = Offset { row: 0, col: -1 };
    pub const RIGHT: Offset = Offset { row: 0, col: 1 };

    /// The four axis-aligned unit steps, in random-walk sampling order
    pub const CARDINALS: [Offset; 4] = [Offset::DOWN, Offset::RIGHT, Offset::UP, Offset::LEFT];

    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn is_zero(&self) -> bool {
        self.row == 0 && self.col == 0
    }
}

/// Continuous (interpolated) grid position, for rendering collaborators
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub row: f64,
    pub col: f64,
}

impl Position {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Linear interpolation `(1-t)*from + t*to`
    pub fn lerp(from: Cell, to: Cell, t: f64) -> Self {
        Self {
            row: (1.0 - t) * from.row as f64 + t * to.row as f64,
            col: (1.0 - t) * from.col as f64 + t * to.col as f64,
        }
    }
}
