//! Blockgrid - tile-grid movement and collision engine
//!
//! Entities hop between integer cells over a fixed time window, push one
//! another in chains, and fall into pits. The crate owns the motion,
//! occupancy and collision rules; rendering and the frame loop live outside.

pub mod core;
pub mod entity;
pub mod level;
pub mod simulation;
pub mod spatial;

pub use crate::core::{Cell, EntityId, GridError, Result, SimulationConfig};
pub use crate::simulation::{Simulation, TickReport};
