//! External compressed-audio encoder
//!
//! There is no pure-Rust MP3 encoder in our stack, so compressed export goes
//! through an encoder binary named in configuration (`ffmpeg` or `lame`).
//! The binary is probed once at startup so a missing encoder surfaces as
//! `MissingCodec` instead of failing halfway through an export.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::engine::buffer::AudioBuffer;
use crate::engine::io::write_wav;
use crate::error::{BooktrackError, Result};

/// Command-line dialect of the encoder binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    Ffmpeg,
    Lame,
}

impl EncoderKind {
    /// Guess the dialect from the binary's file name
    pub fn detect(binary: &Path) -> Option<Self> {
        let stem = binary.file_stem()?.to_str()?.to_lowercase();
        if stem.starts_with("ffmpeg") {
            Some(Self::Ffmpeg)
        } else if stem.starts_with("lame") {
            Some(Self::Lame)
        } else {
            None
        }
    }

    fn version_flag(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "-version",
            Self::Lame => "--version",
        }
    }
}

/// Encoder binary plus the VBR quality passed to it
#[derive(Debug, Clone)]
pub struct ExternalEncoder {
    binary: PathBuf,
    kind: EncoderKind,
    /// LAME VBR quality, 0 (best) to 9 (smallest)
    quality: u8,
}

impl ExternalEncoder {
    /// Create an encoder for `binary`, inferring its dialect from the name
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self> {
        let binary = binary.into();
        let kind = EncoderKind::detect(&binary).ok_or_else(|| BooktrackError::MissingCodec {
            binary: binary.display().to_string(),
            reason: "unrecognized encoder, expected ffmpeg or lame".to_string(),
        })?;
        Ok(Self::with_kind(binary, kind))
    }

    /// Create an encoder with an explicit dialect
    pub fn with_kind(binary: impl Into<PathBuf>, kind: EncoderKind) -> Self {
        Self {
            binary: binary.into(),
            kind,
            quality: 2,
        }
    }

    /// Override the VBR quality (clamped to 0..=9)
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(9);
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn kind(&self) -> EncoderKind {
        self.kind
    }

    /// Check that the binary can be spawned
    pub fn validate(&self) -> Result<()> {
        let status = Command::new(&self.binary)
            .arg(self.kind.version_flag())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| BooktrackError::MissingCodec {
                binary: self.binary.display().to_string(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(BooktrackError::MissingCodec {
                binary: self.binary.display().to_string(),
                reason: format!("version probe exited with {}", status),
            });
        }

        tracing::debug!(binary = %self.binary.display(), "Encoder available");
        Ok(())
    }

    /// Encode `buffer` into `output`
    ///
    /// The buffer is staged as a temporary 16-bit WAV, then handed to the
    /// encoder binary.
    pub fn encode(&self, buffer: &AudioBuffer, output: &Path) -> Result<()> {
        let staging = tempfile::Builder::new()
            .prefix("booktrack-stage-")
            .suffix(".wav")
            .tempfile()?;
        write_wav(buffer, staging.path(), 16)?;

        let mut cmd = Command::new(&self.binary);
        match self.kind {
            EncoderKind::Ffmpeg => {
                cmd.arg("-y")
                    .arg("-loglevel")
                    .arg("error")
                    .arg("-i")
                    .arg(staging.path())
                    .arg("-codec:a")
                    .arg("libmp3lame")
                    .arg("-q:a")
                    .arg(self.quality.to_string())
                    .arg(output);
            }
            EncoderKind::Lame => {
                cmd.arg("--quiet")
                    .arg("-V")
                    .arg(self.quality.to_string())
                    .arg(staging.path())
                    .arg(output);
            }
        }

        let result = cmd.stdin(Stdio::null()).output().map_err(|e| {
            BooktrackError::MissingCodec {
                binary: self.binary.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        if !result.status.success() {
            return Err(BooktrackError::EncodeError {
                reason: format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }

        Ok(())
    }
}
