//! Artifact Store
//!
//! Owns every on-disk path the pipeline produces. Persisted clips are named
//! `v{index}.{ext}`, the combined artifact `{combined_name}.{ext}`; names are
//! stable across process restarts so an interrupted session resumes without
//! refetching.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{BooktrackError, Result};

/// Index-keyed durable storage for one session
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    extension: String,
}

impl ArtifactStore {
    /// Open (creating if needed) a store rooted at `dir`
    ///
    /// The directory is created once and never torn down by the store.
    pub fn open(dir: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| BooktrackError::DirectoryCreateError {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let dir = dir.canonicalize()?;

        Ok(Self {
            dir,
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    /// Open the store of one session under a shared root
    ///
    /// Keeps concurrent sessions from colliding on `v{index}` names.
    pub fn for_session(root: impl AsRef<Path>, session_id: Uuid, extension: &str) -> Result<Self> {
        Self::open(root.as_ref().join(session_id.to_string()), extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Deterministic path of a version's clip; no I/O
    pub fn resolve_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("v{}.{}", index, self.extension))
    }

    /// Whether the clip for `index` has been materialized
    pub fn exists(&self, index: usize) -> bool {
        self.resolve_path(index).is_file()
    }

    /// Fixed path of a named artifact (e.g. the combined output)
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, self.extension))
    }

    /// Write raw clip bytes for `index` unless already present
    ///
    /// Returns `false` when the clip already existed and nothing was written.
    pub fn persist_clip(&self, index: usize, bytes: &[u8]) -> Result<bool> {
        let path = self.resolve_path(index);
        if path.is_file() {
            return Ok(false);
        }
        self.write_atomic(&path, |file| file.write_all(bytes).map_err(BooktrackError::from))?;
        Ok(true)
    }

    /// Read the persisted bytes of `index`
    pub fn read_clip(&self, index: usize) -> Result<Vec<u8>> {
        Ok(fs::read(self.resolve_path(index))?)
    }

    /// Indices of all persisted clips, ascending
    pub fn persisted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.parse_index(entry.path()))
            .collect();
        indices.sort_unstable();
        indices
    }

    fn parse_index(&self, path: &Path) -> Option<usize> {
        if path.extension()?.to_str()? != self.extension {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let digits = stem.strip_prefix('v')?;
        // Reject "v01" so every index has exactly one spelling
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok()
    }

    /// Produce `target` via a sibling temp file renamed into place
    ///
    /// Readers see either the previous file or the complete new one. The
    /// temp file keeps the store's extension because encoders pick their
    /// output format from it.
    pub fn write_atomic<F>(&self, target: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut fs::File) -> Result<()>,
    {
        let stem = target
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("artifact");
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{}-", stem))
            .suffix(&format!(".{}", self.extension))
            .tempfile_in(&self.dir)?;

        write(temp.as_file_mut())?;
        temp.as_file_mut().sync_all()?;
        temp.persist(target).map_err(|e| BooktrackError::FileWriteError {
            path: target.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    /// Like [`ArtifactStore::write_atomic`], for writers that need a path
    pub fn write_atomic_path<F>(&self, target: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let stem = target
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("artifact");
        let temp = tempfile::Builder::new()
            .prefix(&format!(".{}-", stem))
            .suffix(&format!(".{}", self.extension))
            .tempfile_in(&self.dir)?;

        write(temp.path())?;
        temp.persist(target).map_err(|e| BooktrackError::FileWriteError {
            path: target.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path_is_deterministic() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), "mp3").unwrap();

        assert_eq!(store.resolve_path(0), store.dir().join("v0.mp3"));
        assert_eq!(store.resolve_path(12), store.dir().join("v12.mp3"));
        assert_eq!(store.resolve_path(3), store.resolve_path(3));
        assert_eq!(
            store.artifact_path("combined_output"),
            store.dir().join("combined_output.mp3")
        );
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = ArtifactStore::open(&nested, ".wav").unwrap();

        assert!(nested.is_dir());
        assert_eq!(store.extension(), "wav");
    }

    #[test]
    fn test_sessions_do_not_collide() {
        let dir = tempdir().unwrap();
        let a = ArtifactStore::for_session(dir.path(), Uuid::new_v4(), "wav").unwrap();
        let b = ArtifactStore::for_session(dir.path(), Uuid::new_v4(), "wav").unwrap();

        a.persist_clip(0, b"first").unwrap();
        assert!(a.exists(0));
        assert!(!b.exists(0));
    }

    #[test]
    fn test_persist_clip_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), "wav").unwrap();

        assert!(store.persist_clip(1, b"original").unwrap());
        assert!(!store.persist_clip(1, b"replacement").unwrap());
        assert_eq!(store.read_clip(1).unwrap(), b"original");
    }

    #[test]
    fn test_persisted_indices_sorted() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), "wav").unwrap();

        for index in [10, 2, 0] {
            store.persist_clip(index, b"x").unwrap();
        }
        fs::write(store.dir().join("combined_output.wav"), b"x").unwrap();
        fs::write(store.dir().join("v3.mp3"), b"x").unwrap();
        fs::write(store.dir().join("v04.wav"), b"x").unwrap();

        assert_eq!(store.persisted_indices(), vec![0, 2, 10]);
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), "wav").unwrap();
        let target = store.artifact_path("combined_output");

        store
            .write_atomic(&target, |f| f.write_all(b"one").map_err(BooktrackError::from))
            .unwrap();
        store
            .write_atomic(&target, |f| f.write_all(b"two").map_err(BooktrackError::from))
            .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"two");
        let entries = fs::read_dir(store.dir()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), "wav").unwrap();
        let target = store.artifact_path("combined_output");
        fs::write(&target, b"previous").unwrap();

        let result = store.write_atomic_path(&target, |_| {
            Err(BooktrackError::EncodeError {
                reason: "encoder crashed".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(fs::read(&target).unwrap(), b"previous");
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 1);
    }
}
