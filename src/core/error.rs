use thiserror::Error;

use crate::core::types::EntityId;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Entity {0} has no active weapon")]
    NoWeapon(EntityId),

    #[error("Weapon '{weapon}' has no state named '{state}'")]
    MissingState { weapon: String, state: String },

    #[error("Unknown weapon definition: {0}")]
    UnknownWeapon(String),

    #[error("Invalid weapon definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;
