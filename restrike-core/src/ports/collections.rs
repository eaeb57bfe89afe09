//! Read access to collection metadata and image references.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use restrike_model::{Collection, CollectionId};
use tokio::sync::Mutex;

use crate::error::Result;

/// Lookup port for the collections jobs operate on.
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Fetches a collection by id. `Ok(None)` means the collection no
    /// longer exists, which permanently ends resumption for its jobs.
    async fn get(&self, id: CollectionId) -> Result<Option<Collection>>;
}

/// Reference repository over an in-memory collection map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCollectionRepository {
    collections: Arc<Mutex<HashMap<CollectionId, Collection>>>,
}

impl InMemoryCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: Collection) {
        let mut guard = self.collections.lock().await;
        guard.insert(collection.id, collection);
    }

    pub async fn remove(&self, id: CollectionId) {
        let mut guard = self.collections.lock().await;
        guard.remove(&id);
    }
}

#[async_trait]
impl CollectionRepository for InMemoryCollectionRepository {
    async fn get(&self, id: CollectionId) -> Result<Option<Collection>> {
        let guard = self.collections.lock().await;
        Ok(guard.get(&id).cloned())
    }
}
