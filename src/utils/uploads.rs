//! Storage for uploaded sales histories

use crate::error::{ForecastError, Result};
use crate::export::{ArtifactKey, AtomicFile};
use crate::preprocessing::{trailing_average, TRAILING_WINDOW};
use polars::prelude::DataFrame;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::data_loader::DataLoader;

/// Keeps the most recent upload per (restaurant, menu item) as
/// `<root>/<restaurant_id>/<normalized item>.csv`
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    loader: DataLoader,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loader: DataLoader::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lower-case, spaces become `_`, anything outside `[a-z0-9_-]` is dropped
    pub fn normalize_item(menu_item: &str) -> String {
        menu_item
            .trim()
            .to_lowercase()
            .chars()
            .filter_map(|c| match c {
                ' ' => Some('_'),
                c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Where the upload for this key lives
    pub fn path_for(&self, restaurant_id: &str, menu_item: &str) -> Result<PathBuf> {
        let key = ArtifactKey::new(restaurant_id, menu_item)?;
        let file_stem = Self::normalize_item(&key.menu_item);
        if file_stem.is_empty() {
            return Err(ForecastError::InvalidKey(key.menu_item));
        }
        Ok(self
            .root
            .join(&key.restaurant_id)
            .join(format!("{}.csv", file_stem)))
    }

    /// Store an upload, replacing the previous one
    pub fn save(&self, restaurant_id: &str, menu_item: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(restaurant_id, menu_item)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Unique temp name per call; concurrent saves race only on the rename
        let mut file = AtomicFile::create(path.clone())?;
        file.write_all(bytes)?;
        file.commit()?;
        debug!(path = %path.display(), bytes = bytes.len(), "Upload stored");
        Ok(path)
    }

    /// The stored upload, if any
    pub fn load(&self, restaurant_id: &str, menu_item: &str) -> Result<Option<DataFrame>> {
        let path = self.path_for(restaurant_id, menu_item)?;
        if !path.is_file() {
            return Ok(None);
        }
        self.loader.load_csv(&path).map(Some)
    }

    /// Trailing mean servings of the stored upload, 0.0 when there is none
    pub fn trailing_average(&self, restaurant_id: &str, menu_item: &str) -> Result<f64> {
        match self.load(restaurant_id, menu_item)? {
            Some(df) => trailing_average(&df, TRAILING_WINDOW),
            None => Ok(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_item() {
        assert_eq!(UploadStore::normalize_item("Masala Dosa"), "masala_dosa");
        assert_eq!(UploadStore::normalize_item("  Chai (Large)!"), "chai_large");
        assert_eq!(UploadStore::normalize_item("Café-Latte"), "caf-latte");
    }

    #[test]
    fn test_path_layout() {
        let store = UploadStore::new("/data/uploads");
        let path = store.path_for("r7", "Masala Dosa").unwrap();
        assert_eq!(path, PathBuf::from("/data/uploads/r7/masala_dosa.csv"));
        assert!(store.path_for("r7", "!!!").is_err());
        assert!(store.path_for("../r7", "Idli").is_err());
    }

    #[test]
    fn test_save_and_average() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());
        assert_eq!(store.trailing_average("r1", "Idli").unwrap(), 0.0);

        let csv = "Date,no_of_servings\n03-01-2024,30\n01-01-2024,10\n02-01-2024,20\n";
        let path = store.save("r1", "Idli", csv.as_bytes()).unwrap();
        assert!(path.is_file());

        let avg = store.trailing_average("r1", "Idli").unwrap();
        assert!((avg - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_saves_keep_one_whole_body() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let mut large = String::from("Date,no_of_servings\n");
        for i in 0..20_000 {
            large.push_str(&format!("{:02}-01-2024,{}\n", i % 28 + 1, 100));
        }
        let small = "Date,no_of_servings\n01-01-2024,7\n".to_string();

        for _ in 0..20 {
            let handles: Vec<_> = [large.clone(), small.clone()]
                .into_iter()
                .map(|body| {
                    let store = store.clone();
                    std::thread::spawn(move || store.save("r1", "Idli", body.as_bytes()))
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }

            let stored = fs::read_to_string(store.path_for("r1", "Idli").unwrap()).unwrap();
            assert!(stored == large || stored == small, "upload was interleaved");
        }

        let leftovers = fs::read_dir(dir.path().join("r1"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
