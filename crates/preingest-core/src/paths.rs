use crate::error::{PreingestError, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// File name constants
// ---------------------------------------------------------------------------

pub const DATABASE_FILE: &str = "preingest.db";
pub const SETTINGS_FILE: &str = "preingest.yaml";
pub const RESULT_EXTENSION: &str = "json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn default_database(data_folder: &Path) -> PathBuf {
    data_folder.join(DATABASE_FILE)
}

/// The submitted container file for a collection.
pub fn collection_path(data_folder: &Path, name: &str) -> PathBuf {
    data_folder.join(name)
}

/// Per-session output folder: `<data_folder>/<session_id>`.
pub fn session_folder(data_folder: &Path, session_id: Uuid) -> PathBuf {
    data_folder.join(session_id.to_string())
}

/// Result file written by a step: `<session_folder>/<step_name>.json`.
pub fn result_file(data_folder: &Path, session_id: Uuid, step_name: &str) -> PathBuf {
    session_folder(data_folder, session_id).join(format!("{step_name}.{RESULT_EXTENSION}"))
}

// ---------------------------------------------------------------------------
// Collection name validation
// ---------------------------------------------------------------------------

/// A collection name must be a single file name inside the data folder.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(PreingestError::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
