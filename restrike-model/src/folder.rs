use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::FolderId;

/// A storage folder participating in artifact placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFolder {
    pub id: FolderId,
    pub path: PathBuf,
    pub is_active: bool,
}

impl StorageFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: FolderId::new(),
            path: path.into(),
            is_active: true,
        }
    }

    pub fn with_id(mut self, id: FolderId) -> Self {
        self.id = id;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}
