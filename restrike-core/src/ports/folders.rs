//! Registry of storage folders artifacts can be placed in.

use std::sync::Arc;

use async_trait::async_trait;
use restrike_model::{FolderId, StorageFolder};
use tokio::sync::Mutex;

use crate::error::Result;

/// Lookup port for the storage folders known to the deployment.
///
/// The selector treats the returned set as a snapshot; activation state
/// is honored per call, so flapping folders change placement between
/// calls but never within one.
#[async_trait]
pub trait StorageFolderRegistry: Send + Sync {
    async fn all_folders(&self) -> Result<Vec<StorageFolder>>;
}

/// Reference registry over a mutable in-memory folder set.
#[derive(Clone, Debug, Default)]
pub struct InMemoryFolderRegistry {
    folders: Arc<Mutex<Vec<StorageFolder>>>,
}

impl InMemoryFolderRegistry {
    pub fn new(folders: Vec<StorageFolder>) -> Self {
        Self {
            folders: Arc::new(Mutex::new(folders)),
        }
    }

    pub async fn add(&self, folder: StorageFolder) {
        let mut guard = self.folders.lock().await;
        guard.push(folder);
    }

    pub async fn remove(&self, id: FolderId) {
        let mut guard = self.folders.lock().await;
        guard.retain(|folder| folder.id != id);
    }

    /// Replaces the whole folder set.
    pub async fn set_folders(&self, folders: Vec<StorageFolder>) {
        let mut guard = self.folders.lock().await;
        *guard = folders;
    }
}

#[async_trait]
impl StorageFolderRegistry for InMemoryFolderRegistry {
    async fn all_folders(&self) -> Result<Vec<StorageFolder>> {
        let guard = self.folders.lock().await;
        Ok(guard.clone())
    }
}
