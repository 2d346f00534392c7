//! Durable dataset storage.
//!
//! The cache only needs "write under key", "read under key" and "key exists";
//! [`DatasetStore`] is that capability.  [`FsStore`] keeps one
//! `<variety key>.tsv` file per variety in a directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::table::VarietyKey;

/// Raw dataset text plus the time it was written.
#[derive(Debug, Clone)]
pub struct StoredDataset {
    pub content: String,
    pub modified: SystemTime,
}

// ---------------------------------------------------------------------------
// CleanupReport
// ---------------------------------------------------------------------------

/// Result of wiping the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub files_removed: usize,
    pub bytes_freed: u64,
}

impl CleanupReport {
    /// Freed space as `0 bytes`, `512.0 bytes`, `1.5 KB`, `3.2 MB`, ...
    pub fn formatted_size(&self) -> String {
        if self.bytes_freed == 0 {
            return "0 bytes".to_string();
        }
        let mut size = self.bytes_freed as f64;
        for unit in ["bytes", "KB", "MB", "GB", "TB"] {
            if size < 1024.0 {
                return format!("{size:.1} {unit}");
            }
            size /= 1024.0;
        }
        format!("{size:.1} PB")
    }
}

// ---------------------------------------------------------------------------
// DatasetStore trait
// ---------------------------------------------------------------------------

/// Blocking key/value storage for dataset text.
///
/// Calls are made from `spawn_blocking`, so implementations may do ordinary
/// file I/O.
pub trait DatasetStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &VarietyKey) -> io::Result<Option<StoredDataset>>;

    /// Replace whatever is stored under `key`.  Readers never observe a
    /// partially written value.
    fn write(&self, key: &VarietyKey, content: &str) -> io::Result<()>;

    fn exists(&self, key: &VarietyKey) -> bool;

    /// Remove every stored dataset.
    fn clear(&self) -> io::Result<CleanupReport>;
}

// ---------------------------------------------------------------------------
// FsStore
// ---------------------------------------------------------------------------

/// Directory-backed store.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Create the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &VarietyKey) -> PathBuf {
        self.dir.join(format!("{key}.tsv"))
    }
}

impl DatasetStore for FsStore {
    fn read(&self, key: &VarietyKey) -> io::Result<Option<StoredDataset>> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        Ok(Some(StoredDataset { content, modified }))
    }

    fn write(&self, key: &VarietyKey, content: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("tsv.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)
    }

    fn exists(&self, key: &VarietyKey) -> bool {
        self.path_for(key).is_file()
    }

    fn clear(&self) -> io::Result<CleanupReport> {
        let mut report = CleanupReport::default();
        if !self.dir.exists() {
            return Ok(report);
        }

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    report.files_removed += 1;
                    report.bytes_freed += size;
                }
                Err(e) => log::warn!("could not remove {}: {e}", path.display()),
            }
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
