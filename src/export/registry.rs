//! Artifact storage keyed by restaurant and menu item
//!
//! On disk every trained item owns one directory:
//!
//! ```text
//! <root>/<restaurant_id>/<menu_item>/model.bin
//! <root>/<restaurant_id>/<menu_item>/meta.json
//! ```
//!
//! Both files are written to a temporary sibling and renamed into place, so
//! readers only ever observe a complete previous or complete new artifact.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::artifact::{ArtifactMetadata, ModelArtifact};
use super::serializer;
use crate::error::{ForecastError, Result};

pub const MODEL_FILE: &str = "model.bin";
pub const META_FILE: &str = "meta.json";

/// Identifies one menu item's artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub restaurant_id: String,
    pub menu_item: String,
}

impl ArtifactKey {
    /// Build a key, rejecting names that could escape the storage root
    pub fn new(restaurant_id: impl Into<String>, menu_item: impl Into<String>) -> Result<Self> {
        let key = Self {
            restaurant_id: restaurant_id.into(),
            menu_item: menu_item.into(),
        };
        validate_segment(&key.restaurant_id)?;
        validate_segment(&key.menu_item)?;
        Ok(key)
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.restaurant_id, self.menu_item)
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    let bad = segment.trim().is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(ForecastError::InvalidKey(segment.to_string()));
    }
    Ok(())
}

/// Resolved location of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub key: ArtifactKey,
    pub location: PathBuf,
}

impl ArtifactHandle {
    pub fn model_path(&self) -> PathBuf {
        self.location.join(MODEL_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.location.join(META_FILE)
    }
}

/// Where trained artifacts live
///
/// The filesystem layout is the default; anything that can map a key to a
/// blob and a metadata record can stand in for it.
pub trait ArtifactStore: Send + Sync {
    /// Resolve a key without touching storage
    fn locate(&self, restaurant_id: &str, menu_item: &str) -> Result<ArtifactHandle>;

    /// Replace the artifact for a key
    fn publish(
        &self,
        handle: &ArtifactHandle,
        artifact: &ModelArtifact,
        metadata: &ArtifactMetadata,
    ) -> Result<()>;

    /// Load a published artifact, `NotTrained` if none exists
    fn load(&self, handle: &ArtifactHandle) -> Result<ModelArtifact>;

    /// Read the metadata record, `NotTrained` if none exists
    fn metadata(&self, handle: &ArtifactHandle) -> Result<ArtifactMetadata>;

    /// Menu items with a published artifact, sorted by name
    fn list_trained(&self, restaurant_id: &str) -> Result<Vec<String>>;
}

fn not_trained(key: &ArtifactKey) -> ForecastError {
    ForecastError::NotTrained {
        restaurant_id: key.restaurant_id.clone(),
        menu_item: key.menu_item.clone(),
    }
}

fn storage_err(action: &str, path: &Path, e: std::io::Error) -> ForecastError {
    ForecastError::Storage(format!("failed to {} {}: {}", action, path.display(), e))
}

/// Temporary sibling that is renamed over the target on commit
///
/// The temp name carries a random suffix, so concurrent writers of one target
/// never share a temp file. Dropping without commit removes the temp file.
pub(crate) struct AtomicFile {
    file: File,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl AtomicFile {
    pub(crate) fn create(final_path: PathBuf) -> Result<Self> {
        let file_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let temp_path = final_path.with_file_name(format!(".{}.{}.tmp", file_name, &suffix[..8]));

        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .map_err(|e| storage_err("create", &temp_path, e))?;

        Ok(Self {
            file,
            temp_path,
            final_path,
        })
    }

    pub(crate) fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .map_err(|e| storage_err("write", &self.temp_path, e))
    }

    /// Flush the temp file to disk without publishing it
    pub(crate) fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| storage_err("sync", &self.temp_path, e))
    }

    /// Rename over the target; the temp file must already be synced
    fn persist(self) -> Result<()> {
        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|e| storage_err("publish", &self.final_path, e))
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.sync()?;
        self.persist()
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        // No-op after a successful rename
        let _ = fs::remove_file(&self.temp_path);
    }
}

/// Filesystem-backed artifact store
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    /// Serializes publishers of the same key within this process
    locks: Mutex<HashMap<ArtifactKey, Arc<Mutex<()>>>>,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_lock(&self, key: &ArtifactKey) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Put back the model that was live before a failed publish
    fn restore_model(handle: &ArtifactHandle, previous: Option<&[u8]>) {
        let path = handle.model_path();
        let restored = match previous {
            Some(bytes) => AtomicFile::create(path.clone()).and_then(|mut file| {
                file.write_all(bytes)?;
                file.commit()
            }),
            None => fs::remove_file(&path).map_err(|e| storage_err("remove", &path, e)),
        };
        match restored {
            Ok(()) => warn!(key = %handle.key, "Metadata publish failed, model rolled back"),
            Err(e) => error!(key = %handle.key, error = %e, "Model rollback failed"),
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn locate(&self, restaurant_id: &str, menu_item: &str) -> Result<ArtifactHandle> {
        let key = ArtifactKey::new(restaurant_id, menu_item)?;
        let location = self.root.join(&key.restaurant_id).join(&key.menu_item);
        Ok(ArtifactHandle { key, location })
    }

    fn publish(
        &self,
        handle: &ArtifactHandle,
        artifact: &ModelArtifact,
        metadata: &ArtifactMetadata,
    ) -> Result<()> {
        let model_bytes = serializer::to_bytes(artifact)?;
        let meta_bytes = serde_json::to_vec_pretty(metadata)?;

        let lock = self.key_lock(&handle.key);
        let _guard = lock.lock();

        fs::create_dir_all(&handle.location)
            .map_err(|e| storage_err("create", &handle.location, e))?;

        // Both blobs are fully on disk before anything is renamed
        let mut model_file = AtomicFile::create(handle.model_path())?;
        model_file.write_all(&model_bytes)?;
        model_file.sync()?;
        let mut meta_file = AtomicFile::create(handle.meta_path())?;
        meta_file.write_all(&meta_bytes)?;
        meta_file.sync()?;

        let previous_model = match fs::read(handle.model_path()) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(storage_err("read", &handle.model_path(), e)),
        };

        // Model first: a reader that sees the new metadata always finds the new model
        model_file.persist()?;
        if let Err(e) = meta_file.persist() {
            Self::restore_model(handle, previous_model.as_deref());
            return Err(e);
        }

        debug!(
            key = %handle.key,
            bytes = model_bytes.len(),
            "Artifact published"
        );
        Ok(())
    }

    fn load(&self, handle: &ArtifactHandle) -> Result<ModelArtifact> {
        let path = handle.model_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_trained(&handle.key))
            }
            Err(e) => return Err(storage_err("read", &path, e)),
        };
        serializer::from_bytes(&bytes)
    }

    fn metadata(&self, handle: &ArtifactHandle) -> Result<ArtifactMetadata> {
        let path = handle.meta_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_trained(&handle.key))
            }
            Err(e) => return Err(storage_err("read", &path, e)),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| ForecastError::Storage(format!("unreadable {}: {}", path.display(), e)))
    }

    fn list_trained(&self, restaurant_id: &str) -> Result<Vec<String>> {
        validate_segment(restaurant_id)?;
        let dir = self.root.join(restaurant_id);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("list", &dir, e)),
        };

        let mut items = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| storage_err("list", &dir, e))?;
            let path = entry.path();
            if path.join(MODEL_FILE).is_file() && path.join(META_FILE).is_file() {
                items.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        items.sort();
        Ok(items)
    }
}

/// In-process artifact store
///
/// Keeps serialized blobs, so loads go through the same decoding path as the
/// filesystem store.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: RwLock<HashMap<ArtifactKey, (Vec<u8>, ArtifactMetadata)>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn locate(&self, restaurant_id: &str, menu_item: &str) -> Result<ArtifactHandle> {
        let key = ArtifactKey::new(restaurant_id, menu_item)?;
        let location = PathBuf::from(key.to_string());
        Ok(ArtifactHandle { key, location })
    }

    fn publish(
        &self,
        handle: &ArtifactHandle,
        artifact: &ModelArtifact,
        metadata: &ArtifactMetadata,
    ) -> Result<()> {
        let bytes = serializer::to_bytes(artifact)?;
        self.entries
            .write()
            .insert(handle.key.clone(), (bytes, metadata.clone()));
        Ok(())
    }

    fn load(&self, handle: &ArtifactHandle) -> Result<ModelArtifact> {
        let entries = self.entries.read();
        let (bytes, _) = entries.get(&handle.key).ok_or_else(|| not_trained(&handle.key))?;
        serializer::from_bytes(bytes)
    }

    fn metadata(&self, handle: &ArtifactHandle) -> Result<ArtifactMetadata> {
        self.entries
            .read()
            .get(&handle.key)
            .map(|(_, meta)| meta.clone())
            .ok_or_else(|| not_trained(&handle.key))
    }

    fn list_trained(&self, restaurant_id: &str) -> Result<Vec<String>> {
        validate_segment(restaurant_id)?;
        let mut items: Vec<String> = self
            .entries
            .read()
            .keys()
            .filter(|k| k.restaurant_id == restaurant_id)
            .map(|k| k.menu_item.clone())
            .collect();
        items.sort();
        Ok(items)
    }
}
