//! Clip shaping
//!
//! Everything done to a decoded clip before it is stitched: peak
//! normalization, the trailing fade-out, and the crossfade merge itself.

pub mod crossfade;
pub mod fade;

pub use crossfade::{crossfade_append, effective_overlap_frames};
pub use fade::{apply_fade_out, fade_out_in_place, FadeCurve};

use crate::config::TrackConfig;
use crate::engine::AudioBuffer;

/// Default trailing fade-out applied to every clip (ms)
pub const DEFAULT_FADE_OUT_MS: u64 = 5_000;

/// Default crossfade window between consecutive clips (ms)
pub const DEFAULT_CROSSFADE_MS: u64 = 3_000;

/// Prepares decoded clips for the merge step
///
/// Deterministic and free of I/O: the same input always yields the same
/// processed clip.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeProcessor {
    pub fade_out_ms: u64,
    pub curve: FadeCurve,
    /// Peak target in dBFS; `None` leaves levels as decoded
    pub normalize_peak_db: Option<f32>,
}

impl Default for FadeProcessor {
    fn default() -> Self {
        Self {
            fade_out_ms: DEFAULT_FADE_OUT_MS,
            curve: FadeCurve::Linear,
            normalize_peak_db: Some(-1.0),
        }
    }
}

impl FadeProcessor {
    pub fn from_config(config: &TrackConfig) -> Self {
        Self {
            fade_out_ms: config.fade_out_ms,
            curve: config.fade_curve,
            normalize_peak_db: config.normalize_peak_db,
        }
    }

    /// Normalize (if configured), then fade out the tail
    pub fn process(&self, clip: &AudioBuffer) -> AudioBuffer {
        let mut processed = clip.clone();
        if let Some(target_db) = self.normalize_peak_db {
            processed.normalize_peak(target_db);
        }
        fade_out_in_place(&mut processed, self.fade_out_ms, self.curve);
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate_test_tone;
    use approx::assert_relative_eq;

    #[test]
    fn test_process_normalizes_then_fades() {
        let tone = generate_test_tone(50.0, 2.0, 1_000, 0.25);
        let processor = FadeProcessor {
            fade_out_ms: 1_000,
            curve: FadeCurve::Linear,
            normalize_peak_db: Some(0.0),
        };

        let processed = processor.process(&tone);
        assert_eq!(processed.len(), tone.len());
        assert_relative_eq!(processed.peak(), 1.0, epsilon = 1e-4);
        assert_eq!(*processed.channel(0).last().unwrap(), 0.0);
    }

    #[test]
    fn test_process_without_normalization_keeps_head() {
        let tone = generate_test_tone(50.0, 2.0, 1_000, 0.25);
        let processor = FadeProcessor {
            normalize_peak_db: None,
            fade_out_ms: 500,
            ..FadeProcessor::default()
        };

        let processed = processor.process(&tone);
        assert_eq!(&processed.channel(0)[..1_500], &tone.channel(0)[..1_500]);
    }

    #[test]
    fn test_process_is_deterministic() {
        let tone = generate_test_tone(440.0, 0.5, 8_000, 0.7);
        let processor = FadeProcessor::default();
        assert_eq!(processor.process(&tone), processor.process(&tone));
    }
}
