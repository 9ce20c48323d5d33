//! Configuration for the track assembly pipeline
//!
//! Layering, lowest precedence first: built-in defaults, an optional JSON
//! file, `BOOKTRACK_*` environment variables, then CLI flags (applied by the
//! binary).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::{FadeCurve, DEFAULT_CROSSFADE_MS, DEFAULT_FADE_OUT_MS};
use crate::engine::{ClipCodec, EncoderKind, ExternalEncoder, Mp3Codec, WavCodec};
use crate::error::{BooktrackError, Result};

/// Default fixed name of the combined artifact (without extension)
pub const DEFAULT_COMBINED_NAME: &str = "combined_output";

/// On-disk format of persisted clips and the combined artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "wav" | "wave" => Some(Self::Wav),
            _ => None,
        }
    }
}

/// All tunables of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Root of the artifact store
    pub output_dir: PathBuf,
    pub format: AudioFormat,
    /// Encoder binary for compressed export (`ffmpeg` or `lame`, name or path)
    pub encoder: PathBuf,
    /// Encoder dialect; inferred from the binary name when unset
    pub encoder_kind: Option<EncoderKind>,
    /// VBR quality passed to the encoder, 0 (best) to 9
    pub encoder_quality: u8,
    /// WAV export bit depth: 16, 24 or 32
    pub export_bit_depth: u16,
    pub fade_out_ms: u64,
    pub fade_curve: FadeCurve,
    pub crossfade_ms: u64,
    pub crossfade_curve: FadeCurve,
    /// Peak target in dBFS applied to each clip before fading
    pub normalize_peak_db: Option<f32>,
    pub fetch_timeout_ms: u64,
    /// Fixed file name (without extension) of the combined artifact
    pub combined_name: String,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            format: AudioFormat::Mp3,
            encoder: PathBuf::from("ffmpeg"),
            encoder_kind: None,
            encoder_quality: 2,
            export_bit_depth: 16,
            fade_out_ms: DEFAULT_FADE_OUT_MS,
            fade_curve: FadeCurve::Linear,
            crossfade_ms: DEFAULT_CROSSFADE_MS,
            crossfade_curve: FadeCurve::EqualPower,
            normalize_peak_db: Some(-1.0),
            fetch_timeout_ms: 30_000,
            combined_name: DEFAULT_COMBINED_NAME.to_string(),
        }
    }
}

impl TrackConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: TrackConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply `BOOKTRACK_*` overrides looked up through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup("BOOKTRACK_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(format) = lookup("BOOKTRACK_FORMAT") {
            self.format = AudioFormat::parse(&format).ok_or_else(|| invalid("format", &format))?;
        }
        if let Some(encoder) = lookup("BOOKTRACK_ENCODER") {
            self.encoder = PathBuf::from(encoder);
        }
        if let Some(value) = lookup("BOOKTRACK_FADE_OUT_MS") {
            self.fade_out_ms = parse_number("fade_out_ms", &value)?;
        }
        if let Some(value) = lookup("BOOKTRACK_CROSSFADE_MS") {
            self.crossfade_ms = parse_number("crossfade_ms", &value)?;
        }
        if let Some(value) = lookup("BOOKTRACK_CROSSFADE_CURVE") {
            self.crossfade_curve =
                FadeCurve::parse(&value).ok_or_else(|| invalid("crossfade_curve", &value))?;
        }
        if let Some(value) = lookup("BOOKTRACK_FETCH_TIMEOUT_MS") {
            self.fetch_timeout_ms = parse_number("fetch_timeout_ms", &value)?;
        }
        Ok(self)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        // A zero crossfade is a hard cut and a zero fade leaves the tail unfaded
        for (field, value) in [
            ("crossfade_ms", self.crossfade_ms),
            ("fade_out_ms", self.fade_out_ms),
        ] {
            if value == 0 {
                return Err(BooktrackError::InvalidConfig {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.fetch_timeout_ms == 0 {
            return Err(BooktrackError::InvalidConfig {
                field: "fetch_timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !matches!(self.export_bit_depth, 16 | 24 | 32) {
            return Err(BooktrackError::InvalidConfig {
                field: "export_bit_depth".to_string(),
                reason: format!("{} is not one of 16, 24, 32", self.export_bit_depth),
            });
        }
        if self.encoder_quality > 9 {
            return Err(BooktrackError::InvalidConfig {
                field: "encoder_quality".to_string(),
                reason: "must be between 0 and 9".to_string(),
            });
        }
        if let Some(db) = self.normalize_peak_db {
            if !(db.is_finite() && db <= 0.0) {
                return Err(BooktrackError::InvalidConfig {
                    field: "normalize_peak_db".to_string(),
                    reason: format!("{} dBFS would clip", db),
                });
            }
        }
        let name = self.combined_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(BooktrackError::InvalidConfig {
                field: "combined_name".to_string(),
                reason: "must be a plain, non-empty file name".to_string(),
            });
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Build the codec for the configured format
    ///
    /// Does not probe the encoder; see [`TrackConfig::validated_codec`].
    pub fn codec(&self) -> Result<Arc<dyn ClipCodec>> {
        match self.format {
            AudioFormat::Wav => Ok(Arc::new(WavCodec {
                bit_depth: self.export_bit_depth,
            })),
            AudioFormat::Mp3 => {
                let encoder = match self.encoder_kind {
                    Some(kind) => ExternalEncoder::with_kind(&self.encoder, kind),
                    None => ExternalEncoder::new(&self.encoder)?,
                };
                Ok(Arc::new(Mp3Codec::new(
                    encoder.with_quality(self.encoder_quality),
                )))
            }
        }
    }

    /// Build the codec and check its external requirements up front
    pub fn validated_codec(&self) -> Result<Arc<dyn ClipCodec>> {
        self.validate()?;
        let codec = self.codec()?;
        codec.validate()?;
        Ok(codec)
    }
}

fn invalid(field: &str, value: &str) -> BooktrackError {
    BooktrackError::InvalidConfig {
        field: field.to_string(),
        reason: format!("unrecognized value '{}'", value),
    }
}

fn parse_number(field: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| invalid(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = TrackConfig::default();
        assert_eq!(config.fade_out_ms, 5_000);
        assert_eq!(config.crossfade_ms, 3_000);
        assert_eq!(config.format, AudioFormat::Mp3);
        assert_eq!(config.combined_name, "combined_output");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BOOKTRACK_FORMAT", "wav"),
            ("BOOKTRACK_CROSSFADE_MS", "1500"),
            ("BOOKTRACK_CROSSFADE_CURVE", "linear"),
            ("BOOKTRACK_OUTPUT_DIR", "/tmp/booktrack"),
        ]
        .into_iter()
        .collect();

        let config = TrackConfig::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.format, AudioFormat::Wav);
        assert_eq!(config.crossfade_ms, 1_500);
        assert_eq!(config.crossfade_curve, FadeCurve::Linear);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/booktrack"));
        assert_eq!(config.fade_out_ms, 5_000);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let result = TrackConfig::default().with_overrides(|key| {
            (key == "BOOKTRACK_FADE_OUT_MS").then(|| "five seconds".to_string())
        });
        assert!(matches!(result, Err(BooktrackError::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("booktrack.json");
        fs::write(&path, r#"{ "format": "wav", "fade_curve": "s_curve" }"#).unwrap();

        let config = TrackConfig::load(&path).unwrap();
        assert_eq!(config.format, AudioFormat::Wav);
        assert_eq!(config.fade_curve, FadeCurve::SCurve);
        assert_eq!(config.crossfade_ms, 3_000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = TrackConfig {
            export_bit_depth: 12,
            ..TrackConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TrackConfig {
            combined_name: "../escape".to_string(),
            ..TrackConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TrackConfig {
            normalize_peak_db: Some(3.0),
            ..TrackConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_windows() {
        let config = TrackConfig {
            crossfade_ms: 0,
            ..TrackConfig::default()
        };
        match config.validate() {
            Err(BooktrackError::InvalidConfig { field, .. }) => assert_eq!(field, "crossfade_ms"),
            other => panic!("Expected InvalidConfig, got: {:?}", other),
        }

        let config = TrackConfig {
            fade_out_ms: 0,
            ..TrackConfig::default()
        };
        match config.validate() {
            Err(BooktrackError::InvalidConfig { field, .. }) => assert_eq!(field, "fade_out_ms"),
            other => panic!("Expected InvalidConfig, got: {:?}", other),
        }
    }

    #[test]
    fn test_wav_codec_needs_no_encoder() {
        let config = TrackConfig {
            format: AudioFormat::Wav,
            encoder: PathBuf::from("/nonexistent/ffmpeg"),
            ..TrackConfig::default()
        };
        let codec = config.validated_codec().unwrap();
        assert_eq!(codec.extension(), "wav");
    }

    #[test]
    fn test_missing_encoder_fails_at_startup() {
        let config = TrackConfig {
            encoder: PathBuf::from("/nonexistent/booktrack/ffmpeg"),
            ..TrackConfig::default()
        };
        match config.validated_codec() {
            Err(err) => assert_eq!(err.error_code(), "MISSING_CODEC"),
            Ok(_) => panic!("Expected MissingCodec"),
        }
    }
}
