//! Clip Fetcher
//!
//! Materializes each generated clip exactly once: the first call downloads
//! and persists the raw bytes, later calls decode what is already on disk.
//! Every clip handed out is normalized and faded, so nothing downstream
//! sees an unfaded tail.

mod source;

pub use source::{ClipSource, InMemoryClipSource, RemoteClipSource, SourceError};

use std::sync::Arc;

use crate::dsp::FadeProcessor;
use crate::engine::{AudioBuffer, ClipCodec};
use crate::error::{BooktrackError, Result};
use crate::store::ArtifactStore;

/// A decoded clip with its trailing fade applied; lives only in memory
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedClip {
    pub index: usize,
    pub buffer: AudioBuffer,
}

impl ProcessedClip {
    pub fn duration_ms(&self) -> u64 {
        self.buffer.duration_ms()
    }
}

/// Decodes and shapes persisted clips
///
/// Shared by the fetcher and the sequencer so both produce identical
/// processed clips from the same bytes.
#[derive(Clone)]
pub struct ClipLoader {
    store: ArtifactStore,
    codec: Arc<dyn ClipCodec>,
    processor: FadeProcessor,
}

impl ClipLoader {
    pub fn new(store: ArtifactStore, codec: Arc<dyn ClipCodec>, processor: FadeProcessor) -> Self {
        Self {
            store,
            codec,
            processor,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn codec(&self) -> &Arc<dyn ClipCodec> {
        &self.codec
    }

    pub fn processor(&self) -> &FadeProcessor {
        &self.processor
    }

    /// Decode the persisted clip of `index` and fade it
    ///
    /// A file that does not decode stays on disk for inspection.
    pub fn load(&self, index: usize) -> Result<ProcessedClip> {
        let path = self.store.resolve_path(index);
        let bytes = self.store.read_clip(index)?;

        let decoded = self
            .codec
            .decode(&bytes)
            .map_err(|e| BooktrackError::DecodeError {
                index,
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(ProcessedClip {
            index,
            buffer: self.processor.process(&decoded),
        })
    }
}

/// Retrieves remote clips into the artifact store
pub struct ClipFetcher {
    loader: ClipLoader,
    source: Arc<dyn ClipSource>,
}

impl ClipFetcher {
    pub fn new(loader: ClipLoader, source: Arc<dyn ClipSource>) -> Self {
        Self { loader, source }
    }

    pub fn loader(&self) -> &ClipLoader {
        &self.loader
    }

    /// Make sure version `index` is on disk, then return it processed
    ///
    /// No network I/O happens when the clip is already materialized.
    /// Failures are not retried.
    pub fn fetch_and_persist(&self, remote_locator: &str, index: usize) -> Result<ProcessedClip> {
        let store = self.loader.store();

        if store.exists(index) {
            tracing::debug!(index, path = %store.resolve_path(index).display(), "Clip already persisted, skipping fetch");
        } else {
            let bytes = self
                .source
                .fetch(remote_locator)
                .map_err(|e| fetch_error(index, remote_locator, e))?;
            store.persist_clip(index, &bytes)?;
            tracing::info!(
                index,
                bytes = bytes.len(),
                path = %store.resolve_path(index).display(),
                "Persisted clip"
            );
        }

        self.loader.load(index)
    }
}

fn fetch_error(index: usize, locator: &str, error: SourceError) -> BooktrackError {
    match error {
        SourceError::Timeout { timeout_ms } => BooktrackError::FetchTimeout { index, timeout_ms },
        other => BooktrackError::FetchError {
            index,
            locator: locator.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{encode_wav_bytes, generate_test_tone, WavCodec};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    fn fetcher(dir: &std::path::Path, source: Arc<InMemoryClipSource>) -> ClipFetcher {
        let store = ArtifactStore::open(dir, "wav").unwrap();
        let loader = ClipLoader::new(store, Arc::new(WavCodec::default()), FadeProcessor::default());
        ClipFetcher::new(loader, source)
    }

    #[test]
    fn test_second_fetch_hits_cache() {
        let dir = tempdir().unwrap();
        let tone = generate_test_tone(440.0, 1.0, 8_000, 0.5);
        let source = Arc::new(
            InMemoryClipSource::new().with_clip("mem://v0", encode_wav_bytes(&tone, 16).unwrap()),
        );
        let fetcher = fetcher(dir.path(), source.clone());

        let first = fetcher.fetch_and_persist("mem://v0", 0).unwrap();
        let second = fetcher.fetch_and_persist("mem://v0", 0).unwrap();

        assert_eq!(source.fetch_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first.index, 0);
    }

    #[test]
    fn test_fetch_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let fetcher = fetcher(dir.path(), Arc::new(InMemoryClipSource::new()));

        match fetcher.fetch_and_persist("mem://gone", 4) {
            Err(BooktrackError::FetchError { index, locator, .. }) => {
                assert_eq!(index, 4);
                assert_eq!(locator, "mem://gone");
            }
            other => panic!("Expected FetchError, got: {:?}", other),
        }
        assert!(!fetcher.loader().store().exists(4));
    }

    #[test]
    fn test_stalled_download_times_out_and_writes_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1.mp3", listener.local_addr().unwrap());
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(Duration::from_secs(3));
                drop(stream);
            }
        });

        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), "wav").unwrap();
        let loader = ClipLoader::new(store, Arc::new(WavCodec::default()), FadeProcessor::default());
        let source = RemoteClipSource::new(Duration::from_millis(300)).unwrap();
        let fetcher = ClipFetcher::new(loader, Arc::new(source));

        let err = fetcher.fetch_and_persist(&url, 1).unwrap_err();
        assert!(
            matches!(
                err,
                BooktrackError::FetchTimeout {
                    index: 1,
                    timeout_ms: 300
                }
            ),
            "Expected FetchTimeout, got: {:?}",
            err
        );
        assert!(err.is_fetch_failure());
        assert!(!fetcher.loader().store().exists(1));
    }

    #[test]
    fn test_corrupt_payload_is_kept_for_inspection() {
        let dir = tempdir().unwrap();
        let source = Arc::new(InMemoryClipSource::new().with_clip("mem://bad", b"garbage".to_vec()));
        let fetcher = fetcher(dir.path(), source);

        match fetcher.fetch_and_persist("mem://bad", 2) {
            Err(BooktrackError::DecodeError { index, path, .. }) => {
                assert_eq!(index, 2);
                assert!(path.is_file());
            }
            other => panic!("Expected DecodeError, got: {:?}", other),
        }
    }

    #[test]
    fn test_fetched_clip_is_faded() {
        let dir = tempdir().unwrap();
        let tone = generate_test_tone(440.0, 8.0, 8_000, 0.5);
        let source = Arc::new(
            InMemoryClipSource::new().with_clip("mem://v0", encode_wav_bytes(&tone, 32).unwrap()),
        );
        let fetcher = fetcher(dir.path(), source);

        let clip = fetcher.fetch_and_persist("mem://v0", 0).unwrap();
        assert_eq!(clip.buffer.len(), tone.len());
        assert_eq!(*clip.buffer.channel(0).last().unwrap(), 0.0);
    }
}
