use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::{CollectionId, ImageId};

/// Origin shape of a collection on disk.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Folder,
    Archive,
}

/// A still-resolvable image entry inside a collection document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub id: ImageId,
    pub filename: String,
    pub file_size: u64,
}

/// Collection document as the recovery pass sees it.
///
/// `image_ids` is the authoritative reference list that fixed `total_images`
/// when jobs were created; `images` holds the entries that still resolve. An
/// id with no matching entry is an image that no longer exists and must be
/// skip-accounted rather than retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub path: PathBuf,
    pub kind: CollectionKind,
    pub image_ids: Vec<ImageId>,
    pub images: Vec<ImageEntry>,
}

impl Collection {
    /// Lookup table from image id to its hydrated entry.
    pub fn image_index(&self) -> HashMap<&ImageId, &ImageEntry> {
        self.images.iter().map(|entry| (&entry.id, entry)).collect()
    }

    pub fn has_image(&self, id: &ImageId) -> bool {
        self.images.iter().any(|entry| &entry.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_reference_is_absent_from_index() {
        let collection = Collection {
            id: CollectionId::new(),
            path: PathBuf::from("/photos/holiday"),
            kind: CollectionKind::Folder,
            image_ids: vec![ImageId::from("a"), ImageId::from("gone")],
            images: vec![ImageEntry {
                id: ImageId::from("a"),
                filename: "a.jpg".into(),
                file_size: 1024,
            }],
        };

        let index = collection.image_index();
        assert!(index.contains_key(&ImageId::from("a")));
        assert!(!index.contains_key(&ImageId::from("gone")));
        assert!(!collection.has_image(&ImageId::from("gone")));
    }
}
