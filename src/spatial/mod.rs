//! Spatial bookkeeping for the tile grid

pub mod occupancy;

pub use occupancy::OccupancyIndex;
