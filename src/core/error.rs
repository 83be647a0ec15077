use thiserror::Error;

use crate::care::resolver::CareRejection;
use crate::lifecycle::evolution::EvolutionError;
use crate::sync::coordinator::SyncError;
use crate::sync::remote::RemoteError;

#[derive(Error, Debug)]
pub enum PetError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Care rejected: {0}")]
    Care(#[from] CareRejection),

    #[error("Evolution failed: {0}")]
    Evolution(#[from] EvolutionError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PetError>;
