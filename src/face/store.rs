//! Persistence for the ReID gallery and its face crops.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use super::registry::FaceIdentity;

/// Durable storage for face identities.
///
/// The in-memory [`FaceRegistry`](super::registry::FaceRegistry) is the source
/// of truth while the process runs; every mutation is written through here.
#[async_trait]
pub trait FaceStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<FaceIdentity>>;
    async fn insert(&self, identity: &FaceIdentity) -> Result<()>;
    async fn update_name(&self, reid_num: u32, name: &str) -> Result<bool>;
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryFaceStore {
    rows: DashMap<u32, FaceIdentity>,
}

impl MemoryFaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identities(rows: impl IntoIterator<Item = FaceIdentity>) -> Self {
        let store = Self::new();
        for row in rows {
            store.rows.insert(row.reid_num, row);
        }
        store
    }

    pub fn name_of(&self, reid_num: u32) -> Option<String> {
        self.rows.get(&reid_num).map(|r| r.name.clone())
    }
}

#[async_trait]
impl FaceStore for MemoryFaceStore {
    async fn load_all(&self) -> Result<Vec<FaceIdentity>> {
        let mut rows: Vec<FaceIdentity> = self.rows.iter().map(|r| r.value().clone()).collect();
        rows.sort_by_key(|r| r.reid_num);
        Ok(rows)
    }

    async fn insert(&self, identity: &FaceIdentity) -> Result<()> {
        self.rows.insert(identity.reid_num, identity.clone());
        Ok(())
    }

    async fn update_name(&self, reid_num: u32, name: &str) -> Result<bool> {
        match self.rows.get_mut(&reid_num) {
            Some(mut row) => {
                row.name = name.to_owned();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Face crops on disk, one `reid_{n}.jpg` per identity.
#[derive(Debug, Clone)]
pub struct FaceImages {
    dir: PathBuf,
}

impl FaceImages {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, reid_num: u32) -> PathBuf {
        self.dir.join(format!("reid_{reid_num}.jpg"))
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub async fn save(&self, reid_num: u32, jpeg: &[u8]) -> std::io::Result<()> {
        self.ensure_dir().await?;
        tokio::fs::write(self.path_for(reid_num), jpeg).await
    }

    pub async fn exists(&self, reid_num: u32) -> bool {
        tokio::fs::try_exists(self.path_for(reid_num))
            .await
            .unwrap_or(false)
    }

    /// Read a crop, `None` when no image was ever saved for this ReID.
    pub async fn load(&self, reid_num: u32) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(reid_num)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::embedding::Embedding;

    #[tokio::test]
    async fn memory_store_round_trips_names() {
        let store = MemoryFaceStore::new();
        store
            .insert(&FaceIdentity {
                reid_num: 2,
                name: "Unknown_2".into(),
                embedding: Embedding::new(vec![1.0, 0.0]),
            })
            .await
            .unwrap();
        assert!(store.update_name(2, "Adil Sharma").await.unwrap());
        assert!(!store.update_name(3, "Nobody").await.unwrap());
        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Adil Sharma");
    }

    #[tokio::test]
    async fn images_missing_file_is_none() {
        let dir = std::env::temp_dir().join(format!("attendex-faces-{}", ulid::Ulid::new()));
        let images = FaceImages::new(&dir);
        assert!(images.load(1).await.unwrap().is_none());
        images.save(1, b"\xff\xd8\xff").await.unwrap();
        assert!(images.exists(1).await);
        assert_eq!(images.load(1).await.unwrap().unwrap(), b"\xff\xd8\xff");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn crops_are_named_by_reid() {
        let dir = std::env::temp_dir().join(format!("attendex-faces-{}", ulid::Ulid::new()));
        let images = FaceImages::new(&dir);
        assert_eq!(images.path_for(7), dir.join("reid_7.jpg"));
        images.save(7, b"\xff\xd8\xff").await.unwrap();
        assert!(tokio::fs::try_exists(dir.join("reid_7.jpg")).await.unwrap());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
