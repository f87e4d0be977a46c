use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::paths;

/// A submitted collection: one container file under the data folder.
///
/// The session id is derived from the file name, so every action run against
/// the same collection lands in the same session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    name: String,
    session_id: Uuid,
    data_folder: PathBuf,
}

impl Collection {
    pub fn new(data_folder: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        paths::validate_collection_name(&name)?;
        Ok(Self {
            session_id: session_id_for(&name),
            name,
            data_folder: data_folder.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Path of the container file.
    pub fn target(&self) -> PathBuf {
        paths::collection_path(&self.data_folder, &self.name)
    }

    pub fn exists(&self) -> bool {
        self.target().is_file()
    }

    pub fn session_folder(&self) -> PathBuf {
        paths::session_folder(&self.data_folder, self.session_id)
    }

    pub fn result_file(&self, step_name: &str) -> PathBuf {
        paths::result_file(&self.data_folder, self.session_id, step_name)
    }
}

/// Deterministic session id for a collection file name.
pub fn session_id_for(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn session_id_is_stable_per_name() {
        let a = Collection::new("/data", "archief.tar").unwrap();
        let b = Collection::new("/other", "archief.tar").unwrap();
        let c = Collection::new("/data", "andere.tar").unwrap();
        assert_eq!(a.session_id(), b.session_id());
        assert_ne!(a.session_id(), c.session_id());
    }

    #[test]
    fn target_and_session_folder_live_under_data_folder() {
        let c = Collection::new("/data", "archief.tar").unwrap();
        assert_eq!(c.target(), PathBuf::from("/data/archief.tar"));
        assert_eq!(
            c.session_folder(),
            PathBuf::from(format!("/data/{}", c.session_id()))
        );
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(Collection::new("/data", "../secret.tar").is_err());
    }

    #[test]
    fn exists_checks_the_container_file() {
        let dir = TempDir::new().unwrap();
        let c = Collection::new(dir.path(), "archief.tar").unwrap();
        assert!(!c.exists());
        std::fs::write(c.target(), b"tar").unwrap();
        assert!(c.exists());
    }
}
