//! Assembly of the combined artifact

pub mod exporter;
pub mod sequencer;

pub use exporter::Exporter;
pub use sequencer::{MergedClips, Sequencer, MIN_TRACKS};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A version left out of an assembly, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedClip {
    pub index: usize,
    pub reason: String,
}

/// The single stitched output of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedArtifact {
    /// Absolute, fixed path; overwritten by every assembly
    pub path: PathBuf,
    /// Versions that made it into the merge, in merge order
    pub source_indices: Vec<usize>,
    pub skipped: Vec<SkippedClip>,
    pub duration_ms: u64,
    /// Hex SHA-256 of the exported file
    pub checksum: String,
}

impl CombinedArtifact {
    pub fn source_version_count(&self) -> usize {
        self.source_indices.len()
    }
}
