use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PreingestError {
    #[error("settings file not found: {0}")]
    SettingsNotFound(PathBuf),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("invalid collection name '{0}': must be a plain file name")]
    InvalidCollectionName(String),

    #[error("target file not found or not readable: {0}")]
    TargetNotFound(PathBuf),

    #[error("path is not valid UTF-8 and cannot be sent to the fixity service: {0}")]
    UnencodablePath(PathBuf),

    #[error("action not found: {0}")]
    ActionNotFound(Uuid),

    #[error("step '{0}' was already executed; a step instance is single-use")]
    StepAlreadyExecuted(String),

    #[error("fixity service error: {0}")]
    FixityService(String),

    #[error("action store error: {0}")]
    Store(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PreingestError>;
