//! Session state
//!
//! A `Session` is a plain value owned by the caller: the ordered list of
//! versions generated so far. Nothing here performs I/O; the
//! [`Orchestrator`] drives fetching and assembly against it.

mod orchestrator;

pub use orchestrator::{Listener, Orchestrator};

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assembly::CombinedArtifact;

/// One generated clip in the session's sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Position in the sequence, assigned as the sequence length at creation
    pub index: usize,
    /// Where the generator left the raw audio
    pub remote_locator: String,
    /// Set once the clip is materialized in the store
    pub local_path: Option<PathBuf>,
    /// Music direction the clip was generated from
    pub prompt: Option<String>,
    /// Free-text note on what this version continues
    pub based_on: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the generation layer reports for a new clip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionDraft {
    pub remote_locator: String,
    pub prompt: Option<String>,
    pub based_on: Option<String>,
}

impl VersionDraft {
    pub fn new(remote_locator: impl Into<String>) -> Self {
        Self {
            remote_locator: remote_locator.into(),
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn based_on(mut self, note: impl Into<String>) -> Self {
        self.based_on = Some(note.into());
        self
    }
}

/// Caller-owned sequence of versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub versions: Vec<Version>,
    /// Most recent successful assembly
    pub combined: Option<CombinedArtifact>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Resume a session whose store already exists
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            versions: Vec::new(),
            combined: None,
        }
    }

    /// Index the next version will receive
    pub fn next_index(&self) -> usize {
        self.versions.len()
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn version(&self, index: usize) -> Option<&Version> {
        self.versions.get(index)
    }

    /// Append a version for `draft`, returning its index
    pub fn push(&mut self, draft: VersionDraft) -> usize {
        let index = self.next_index();
        self.versions.push(Version {
            index,
            remote_locator: draft.remote_locator,
            local_path: None,
            prompt: draft.prompt,
            based_on: draft.based_on,
            created_at: Utc::now(),
        });
        index
    }

    /// Indices of every version, ascending
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.versions.iter().map(|v| v.index).collect();
        indices.sort_unstable();
        indices
    }
}

/// Notifications emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    VersionCreated {
        index: usize,
    },
    VersionPersisted {
        index: usize,
        path: PathBuf,
    },
    VersionFailed {
        index: usize,
        code: &'static str,
        message: String,
    },
    Assembled {
        artifact: CombinedArtifact,
    },
    AssemblyFailed {
        code: &'static str,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_creation_order() {
        let mut session = Session::new();
        assert_eq!(session.next_index(), 0);

        assert_eq!(session.push(VersionDraft::new("https://a")), 0);
        assert_eq!(
            session.push(VersionDraft::new("https://b").with_prompt("slow strings")),
            1
        );

        assert_eq!(session.indices(), vec![0, 1]);
        let latest = session.latest().unwrap();
        assert_eq!(latest.index, 1);
        assert_eq!(latest.prompt.as_deref(), Some("slow strings"));
        assert!(latest.local_path.is_none());
    }

    #[test]
    fn test_session_serializes() {
        let mut session = Session::new();
        session.push(VersionDraft::new("https://a").based_on("chapter one"));

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_event_tagging() {
        let event = SessionEvent::VersionCreated { index: 3 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "version_created");
        assert_eq!(json["index"], 3);
    }
}
