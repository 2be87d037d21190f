pub mod config;
pub mod error;
pub mod input;
pub mod types;

pub use config::SimulationConfig;
pub use error::{GridError, Result};
pub use input::{InputKey, InputState};
pub use types::{Cell, EntityId, Offset, Position, Tick};
