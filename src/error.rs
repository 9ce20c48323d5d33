//! Error handling for Booktrack
//!
//! Every error carries enough context (version index, path, locator) for the
//! caller to decide whether to retry, skip the version, or give up.
//!
//! A download that exceeds the fetch timeout is reported as `FetchTimeout`,
//! every other retrieval failure as `FetchError`. Callers that only care
//! whether the clip could be retrieved should use
//! [`BooktrackError::is_fetch_failure`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Booktrack operations
pub type Result<T> = std::result::Result<T, BooktrackError>;

/// Main error type for Booktrack operations
#[derive(Error, Debug)]
pub enum BooktrackError {
    // Retrieval Errors
    #[error("Failed to fetch clip v{index} from {locator}: {reason}")]
    FetchError {
        index: usize,
        locator: String,
        reason: String,
    },

    /// Retrieval failure caused by the fetch timeout; sibling of `FetchError`
    #[error("Fetch of v{index} timed out after {timeout_ms}ms")]
    FetchTimeout { index: usize, timeout_ms: u64 },

    // Audio Errors
    #[error("Clip v{index} at {path} is not valid audio: {reason}")]
    DecodeError {
        index: usize,
        path: PathBuf,
        reason: String,
    },

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Assembly Errors
    #[error("Not enough usable tracks to assemble: {available} available, {required} required")]
    InsufficientTracks { available: usize, required: usize },

    #[error("Invalid version sequence: {reason}")]
    InvalidSequence { reason: String },

    #[error("Failed to export combined artifact to {path}: {reason}")]
    ExportError { path: PathBuf, reason: String },

    // Codec Errors
    #[error("Encoder binary '{binary}' is not usable: {reason}")]
    MissingCodec { binary: String, reason: String },

    #[error("Encoding failed: {reason}")]
    EncodeError { reason: String },

    // Configuration Errors
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Store Errors
    #[error("Failed to create store directory {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BooktrackError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            BooktrackError::FetchError { .. } => "FETCH_ERROR",
            BooktrackError::FetchTimeout { .. } => "FETCH_TIMEOUT",
            BooktrackError::DecodeError { .. } => "DECODE_ERROR",
            BooktrackError::EmptyAudio => "EMPTY_AUDIO",
            BooktrackError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            BooktrackError::InsufficientTracks { .. } => "INSUFFICIENT_TRACKS",
            BooktrackError::InvalidSequence { .. } => "INVALID_SEQUENCE",
            BooktrackError::ExportError { .. } => "EXPORT_ERROR",
            BooktrackError::MissingCodec { .. } => "MISSING_CODEC",
            BooktrackError::EncodeError { .. } => "ENCODE_ERROR",
            BooktrackError::InvalidConfig { .. } => "INVALID_CONFIG",
            BooktrackError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            BooktrackError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            BooktrackError::Io(_) => "IO_ERROR",
            BooktrackError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if re-invoking the failed operation may succeed.
    ///
    /// Nothing in the crate retries on its own; this is a hint for callers.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BooktrackError::FetchError { .. }
                | BooktrackError::FetchTimeout { .. }
                | BooktrackError::InsufficientTracks { .. }
                | BooktrackError::ExportError { .. }
                | BooktrackError::FileWriteError { .. }
        )
    }

    /// Check if the clip could not be retrieved, for any reason
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            BooktrackError::FetchError { .. } | BooktrackError::FetchTimeout { .. }
        )
    }

    /// Version index this error is attached to, if any
    pub fn version_index(&self) -> Option<usize> {
        match self {
            BooktrackError::FetchError { index, .. }
            | BooktrackError::FetchTimeout { index, .. }
            | BooktrackError::DecodeError { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BooktrackError::FetchError { .. } | BooktrackError::FetchTimeout { .. } => vec![
                "Check network connectivity to the audio host",
                "Generated clip URLs expire; regenerate the version if it keeps failing",
                "Re-run the fetch, already persisted clips are not downloaded again",
            ],
            BooktrackError::DecodeError { .. } => vec![
                "The persisted file was left on disk for inspection",
                "Delete the file and fetch the version again",
            ],
            BooktrackError::InsufficientTracks { .. } => vec![
                "Generate at least two versions before assembling",
                "Check the warnings for versions that were skipped",
            ],
            BooktrackError::MissingCodec { .. } => vec![
                "Install ffmpeg or lame, or point the encoder setting at its full path",
                "Use the wav format, which needs no external encoder",
            ],
            BooktrackError::ExportError { .. } => vec![
                "Free up disk space",
                "The previous combined artifact was left untouched",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = BooktrackError::InsufficientTracks {
            available: 1,
            required: 2,
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_TRACKS");
        assert!(err.to_string().contains("1 available"));
    }

    #[test]
    fn test_version_index() {
        let err = BooktrackError::DecodeError {
            index: 3,
            path: PathBuf::from("v3.mp3"),
            reason: "truncated".to_string(),
        };
        assert_eq!(err.version_index(), Some(3));
        assert!(!err.is_recoverable());

        let err = BooktrackError::EmptyAudio;
        assert_eq!(err.version_index(), None);
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = BooktrackError::FetchError {
            index: 0,
            locator: "https://example.invalid/a.mp3".to_string(),
            reason: "404".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(!err.recovery_suggestions().is_empty());
    }
    #[test]
    fn test_timeout_is_a_fetch_failure() {
        let timeout = BooktrackError::FetchTimeout {
            index: 2,
            timeout_ms: 300,
        };
        let refused = BooktrackError::FetchError {
            index: 2,
            locator: "https://example.invalid/v2.mp3".to_string(),
            reason: "connection refused".to_string(),
        };

        assert!(timeout.is_fetch_failure());
        assert!(refused.is_fetch_failure());
        assert_eq!(timeout.error_code(), "FETCH_TIMEOUT");
        assert_eq!(timeout.version_index(), Some(2));
        assert_eq!(timeout.recovery_suggestions(), refused.recovery_suggestions());
        assert!(!BooktrackError::EmptyAudio.is_fetch_failure());
    }
}
