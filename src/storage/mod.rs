//! File-system photo store.
//!
//! Photo rows in the database hold a URI; the bytes live here. Rows and
//! files have independent lifetimes, so callers pair row deletes with
//! [`PhotoStore::remove_file`] on the returned URIs.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the photo directory exists.
    pub fn ensure_dir(&self) -> Result<&Path> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)
                .context("Failed to create photo directory")?;
        }
        Ok(&self.root)
    }

    /// Generate a unique photo filename. Uses a global atomic counter so
    /// concurrent callers within the same second cannot collide.
    fn generate_name(&self, prefix: &str, extension: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = Utc::now().timestamp_millis();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!("{}_{}_{}.{}", prefix, timestamp, seq, extension))
    }

    /// Copy an external file into the store under a fresh name and return
    /// the new path. Files already inside the store are returned as-is.
    pub fn import_file(&self, source: &Path) -> Result<PathBuf> {
        if source.starts_with(&self.root) {
            return Ok(source.to_path_buf());
        }
        self.ensure_dir()?;
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "jpg".to_string());
        let dest = self.generate_name("img", &extension);
        fs::copy(source, &dest)
            .with_context(|| format!("Failed to copy {} into photo store", source.display()))?;
        Ok(dest)
    }

    /// Write raw photo bytes to a freshly named file and return its path.
    pub fn write_bytes(&self, prefix: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.ensure_dir()?;
        let dest = self.generate_name(prefix, "jpg");
        fs::write(&dest, bytes)
            .with_context(|| format!("Failed to write photo file {}", dest.display()))?;
        Ok(dest)
    }

    /// Best-effort file removal. Missing files and failures are logged and
    /// otherwise ignored.
    pub fn remove_file(&self, uri: &str) {
        let path = Path::new(uri);
        if !path.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!(uri, error = %e, "failed to remove photo file");
        }
    }
}
