//! Exporter
//!
//! Writes the combined clip to its fixed path through the store's atomic
//! write, so a reader never observes a half-encoded file.

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{AudioBuffer, ClipCodec};
use crate::error::{BooktrackError, Result};
use crate::store::ArtifactStore;

/// Encodes a clip into the artifact store under a fixed name
#[derive(Clone)]
pub struct Exporter {
    store: ArtifactStore,
    codec: Arc<dyn ClipCodec>,
}

impl Exporter {
    pub fn new(store: ArtifactStore, codec: Arc<dyn ClipCodec>) -> Self {
        Self { store, codec }
    }

    /// Write `clip` to `{fixed_name}.{ext}`, replacing any previous export
    ///
    /// On failure the previous artifact, if any, is left as it was.
    pub fn export(&self, clip: &AudioBuffer, fixed_name: &str) -> Result<PathBuf> {
        let path = self.store.artifact_path(fixed_name);

        if fixed_name.is_empty() || fixed_name.contains(['/', '\\']) {
            return Err(BooktrackError::ExportError {
                path,
                reason: format!("'{}' is not a plain file name", fixed_name),
            });
        }
        if clip.is_empty() {
            return Err(BooktrackError::ExportError {
                path,
                reason: "nothing to export".to_string(),
            });
        }

        self.store
            .write_atomic_path(&path, |temp| self.codec.encode(clip, temp))
            .map_err(|e| BooktrackError::ExportError {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            path = %path.display(),
            duration_ms = clip.duration_ms(),
            "Exported combined artifact"
        );
        Ok(path)
    }
}
