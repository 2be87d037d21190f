use thiserror::Error;

use crate::core::types::{Cell, EntityId};

#[derive(Error, Debug)]
pub enum GridError {
    /// Removal requested for an (entity, cell) pair the occupancy index does not hold
    #[error("Index desync: entity {entity} is not indexed at {cell}")]
    IndexDesync { entity: EntityId, cell: Cell },

    #[error("Invalid entity template '{type_name}': {reason}")]
    InvalidEntityTemplate { type_name: String, reason: String },

    #[error("Malformed move target for entity {entity}: {reason}")]
    MalformedMoveTarget { entity: EntityId, reason: String },

    #[error("Entity not found: {0}")]
    UnknownEntity(EntityId),

    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl GridError {
    pub fn invalid_template(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        GridError::InvalidEntityTemplate {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_move(entity: EntityId, reason: impl Into<String>) -> Self {
        GridError::MalformedMoveTarget {
            entity,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
