//! Sequencer
//!
//! Stitches persisted clips left to right into one combined artifact. A
//! missing or undecodable clip is skipped with a warning; the assembly only
//! fails when fewer than two clips remain.

use std::collections::HashSet;
use std::fs;

use sha2::{Digest, Sha256};

use super::{CombinedArtifact, Exporter, SkippedClip};
use crate::config::TrackConfig;
use crate::dsp::{crossfade_append, FadeCurve};
use crate::engine::AudioBuffer;
use crate::error::{BooktrackError, Result};
use crate::fetch::{ClipLoader, ProcessedClip};

/// Minimum number of usable clips for a crossfade merge
pub const MIN_TRACKS: usize = 2;

/// Left-to-right crossfade assembler
#[derive(Clone)]
pub struct Sequencer {
    loader: ClipLoader,
    exporter: Exporter,
    crossfade_ms: u64,
    crossfade_curve: FadeCurve,
    combined_name: String,
}

/// Result of merging in memory, before export
#[derive(Debug, Clone)]
pub struct MergedClips {
    pub buffer: AudioBuffer,
    pub indices: Vec<usize>,
    pub skipped: Vec<SkippedClip>,
}

impl Sequencer {
    pub fn new(loader: ClipLoader, config: &TrackConfig) -> Self {
        let exporter = Exporter::new(loader.store().clone(), loader.codec().clone());
        Self {
            loader,
            exporter,
            crossfade_ms: config.crossfade_ms,
            crossfade_curve: config.crossfade_curve,
            combined_name: config.combined_name.clone(),
        }
    }

    pub fn loader(&self) -> &ClipLoader {
        &self.loader
    }

    /// Merge the given versions and export the result
    ///
    /// Indices are merged in the order given. Nothing is written when the
    /// merge fails.
    pub fn assemble(&self, ordered_version_indices: &[usize]) -> Result<CombinedArtifact> {
        let merged = self.merge(ordered_version_indices)?;
        let path = self.exporter.export(&merged.buffer, &self.combined_name)?;

        let checksum = checksum_file(&path)?;
        tracing::info!(
            path = %path.display(),
            indices = ?merged.indices,
            skipped = merged.skipped.len(),
            "Assembled combined artifact"
        );

        Ok(CombinedArtifact {
            path,
            source_indices: merged.indices,
            skipped: merged.skipped,
            duration_ms: merged.buffer.duration_ms(),
            checksum,
        })
    }

    /// Load and crossfade the given versions without exporting
    pub fn merge(&self, ordered_version_indices: &[usize]) -> Result<MergedClips> {
        check_sequence(ordered_version_indices)?;

        let mut clips: Vec<ProcessedClip> = Vec::with_capacity(ordered_version_indices.len());
        let mut skipped = Vec::new();

        for &index in ordered_version_indices {
            if !self.loader.store().exists(index) {
                tracing::warn!(index, "Clip not persisted, skipping");
                skipped.push(SkippedClip {
                    index,
                    reason: "not persisted".to_string(),
                });
                continue;
            }

            match self.loader.load(index) {
                Ok(clip) => clips.push(clip),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Clip unusable, skipping");
                    skipped.push(SkippedClip {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if clips.len() < MIN_TRACKS {
            return Err(BooktrackError::InsufficientTracks {
                available: clips.len(),
                required: MIN_TRACKS,
            });
        }

        let indices = clips.iter().map(|clip| clip.index).collect();
        let mut remaining = clips.into_iter().map(|clip| clip.buffer);
        let first = remaining.next().ok_or(BooktrackError::InsufficientTracks {
            available: 0,
            required: MIN_TRACKS,
        })?;

        let buffer = remaining.fold(first, |acc, next| {
            crossfade_append(&acc, &next, self.crossfade_ms, self.crossfade_curve)
        });

        Ok(MergedClips {
            buffer,
            indices,
            skipped,
        })
    }
}

fn check_sequence(indices: &[usize]) -> Result<()> {
    if indices.is_empty() {
        return Err(BooktrackError::InvalidSequence {
            reason: "no versions given".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(indices.len());
    for &index in indices {
        if !seen.insert(index) {
            return Err(BooktrackError::InvalidSequence {
                reason: format!("version v{} appears more than once", index),
            });
        }
    }
    Ok(())
}

fn checksum_file(path: &std::path::Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioFormat;
    use crate::dsp::FadeProcessor;
    use crate::engine::{encode_wav_bytes, generate_test_tone, WavCodec};
    use crate::store::ArtifactStore;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sequencer(dir: &std::path::Path) -> Sequencer {
        let config = TrackConfig {
            format: AudioFormat::Wav,
            fade_out_ms: 200,
            crossfade_ms: 300,
            ..TrackConfig::default()
        };
        let store = ArtifactStore::open(dir, "wav").unwrap();
        let loader = ClipLoader::new(
            store,
            Arc::new(WavCodec { bit_depth: 32 }),
            FadeProcessor::from_config(&config),
        );
        Sequencer::new(loader, &config)
    }

    fn persist_tone(sequencer: &Sequencer, index: usize, seconds: f32) {
        let tone = generate_test_tone(50.0 * (index + 1) as f32, seconds, 1_000, 0.5);
        sequencer
            .loader()
            .store()
            .persist_clip(index, &encode_wav_bytes(&tone, 32).unwrap())
            .unwrap();
    }

    #[test]
    fn test_rejects_empty_and_duplicate_sequences() {
        let dir = tempdir().unwrap();
        let sequencer = sequencer(dir.path());

        assert!(matches!(
            sequencer.assemble(&[]),
            Err(BooktrackError::InvalidSequence { .. })
        ));
        assert!(matches!(
            sequencer.assemble(&[0, 1, 0]),
            Err(BooktrackError::InvalidSequence { .. })
        ));
    }

    #[test]
    fn test_single_clip_writes_nothing() {
        let dir = tempdir().unwrap();
        let sequencer = sequencer(dir.path());
        persist_tone(&sequencer, 0, 1.0);

        match sequencer.assemble(&[0]) {
            Err(BooktrackError::InsufficientTracks {
                available,
                required,
            }) => {
                assert_eq!(available, 1);
                assert_eq!(required, 2);
            }
            other => panic!("Expected InsufficientTracks, got: {:?}", other),
        }
        assert!(!sequencer
            .loader()
            .store()
            .artifact_path("combined_output")
            .exists());
    }

    #[test]
    fn test_missing_clip_is_skipped() {
        let dir = tempdir().unwrap();
        let sequencer = sequencer(dir.path());
        persist_tone(&sequencer, 0, 1.0);
        persist_tone(&sequencer, 2, 1.0);

        let artifact = sequencer.assemble(&[0, 1, 2]).unwrap();
        assert_eq!(artifact.source_indices, vec![0, 2]);
        assert_eq!(artifact.skipped.len(), 1);
        assert_eq!(artifact.skipped[0].index, 1);
        assert_eq!(artifact.source_version_count(), 2);
        // 1000 + 1000 - 300 frames at 1 kHz
        assert_eq!(artifact.duration_ms, 1_700);
        assert_eq!(artifact.checksum.len(), 64);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let dir = tempdir().unwrap();
        let sequencer = sequencer(dir.path());
        for index in 0..3 {
            persist_tone(&sequencer, index, 1.0);
        }

        let first = sequencer.assemble(&[0, 1, 2]).unwrap();
        let second = sequencer.assemble(&[0, 1, 2]).unwrap();
        assert_eq!(first.checksum, second.checksum);
        assert_eq!(first.path, second.path);
    }
}
