//! Pipeline orchestrator
//!
//! Fetches each version as it is created and assembles the whole session
//! on demand. Takes `&mut self` for both, so two assemblies of one session
//! never race on the combined artifact's fixed path.

use std::sync::Arc;

use super::{Session, SessionEvent, VersionDraft};
use crate::assembly::{CombinedArtifact, Sequencer};
use crate::config::TrackConfig;
use crate::dsp::FadeProcessor;
use crate::error::{BooktrackError, Result};
use crate::fetch::{ClipFetcher, ClipLoader, ClipSource, ProcessedClip, RemoteClipSource};
use crate::store::ArtifactStore;

/// Callback notified of every [`SessionEvent`]
pub type Listener = Box<dyn FnMut(&SessionEvent) + Send>;

/// Coordinates the fetcher and sequencer of one session
pub struct Orchestrator {
    fetcher: ClipFetcher,
    sequencer: Sequencer,
    listeners: Vec<Listener>,
}

impl Orchestrator {
    pub fn new(fetcher: ClipFetcher, sequencer: Sequencer) -> Self {
        Self {
            fetcher,
            sequencer,
            listeners: Vec::new(),
        }
    }

    /// Wire up a session against the network
    ///
    /// Fails early with `MissingCodec` when the configured encoder is absent.
    pub fn from_config(config: &TrackConfig, session: &Session) -> Result<Self> {
        let source = RemoteClipSource::new(config.fetch_timeout()).map_err(|e| {
            BooktrackError::InvalidConfig {
                field: "fetch_timeout_ms".to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::with_source(config, session, Arc::new(source))
    }

    /// Wire up a session against an arbitrary clip source
    pub fn with_source(
        config: &TrackConfig,
        session: &Session,
        source: Arc<dyn ClipSource>,
    ) -> Result<Self> {
        let codec = config.validated_codec()?;
        let store = ArtifactStore::for_session(&config.output_dir, session.id, codec.extension())?;
        let loader = ClipLoader::new(store, codec, FadeProcessor::from_config(config));

        tracing::debug!(session = %session.id, dir = %loader.store().dir().display(), "Opened session store");

        let sequencer = Sequencer::new(loader.clone(), config);
        Ok(Self::new(ClipFetcher::new(loader, source), sequencer))
    }

    pub fn store(&self) -> &ArtifactStore {
        self.fetcher.loader().store()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: SessionEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Append a freshly generated version and materialize it
    ///
    /// The version stays in the session even when fetching fails; the
    /// error is reported to listeners and returned, and the version is
    /// simply unusable for assembly until a later fetch succeeds.
    pub fn on_version_created(
        &mut self,
        session: &mut Session,
        draft: VersionDraft,
    ) -> Result<ProcessedClip> {
        let locator = draft.remote_locator.clone();
        let index = session.push(draft);
        self.notify(SessionEvent::VersionCreated { index });

        self.materialize(session, index, &locator)
    }

    fn materialize(
        &mut self,
        session: &mut Session,
        index: usize,
        locator: &str,
    ) -> Result<ProcessedClip> {
        match self.fetcher.fetch_and_persist(locator, index) {
            Ok(clip) => {
                let path = self.store().resolve_path(index);
                if let Some(version) = session.versions.get_mut(index) {
                    version.local_path = Some(path.clone());
                }
                self.notify(SessionEvent::VersionPersisted { index, path });
                Ok(clip)
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Version could not be materialized");
                self.notify(SessionEvent::VersionFailed {
                    index,
                    code: e.error_code(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Stitch every version of the session in ascending index order
    ///
    /// Versions whose clip is not on disk are fetched first; ones that
    /// still fail are left for the sequencer to skip.
    pub fn assemble_session(&mut self, session: &mut Session) -> Result<CombinedArtifact> {
        let pending: Vec<(usize, String)> = session
            .versions
            .iter()
            .filter(|v| !self.store().exists(v.index))
            .map(|v| (v.index, v.remote_locator.clone()))
            .collect();

        for (index, locator) in pending {
            // Failure was already reported; assembly goes ahead without it
            let _ = self.materialize(session, index, &locator);
        }

        match self.sequencer.assemble(&session.indices()) {
            Ok(artifact) => {
                session.combined = Some(artifact.clone());
                self.notify(SessionEvent::Assembled {
                    artifact: artifact.clone(),
                });
                Ok(artifact)
            }
            Err(e) => {
                self.notify(SessionEvent::AssemblyFailed {
                    code: e.error_code(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
