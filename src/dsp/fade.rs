//! Fade curves and the trailing fade-out
//!
//! Curves map a normalized position `t` in `[0, 1]` through the fade to a
//! gain multiplier. Fade-in gains rise from 0 to 1, fade-out gains fall from
//! 1 to 0.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::engine::buffer::{ms_to_frames, AudioBuffer};

/// Gain curve used for fades and crossfades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    #[default]
    Linear,
    /// v(t) = sin(t * pi/2); fade-in² + fade-out² = 1 across a crossfade
    EqualPower,
    /// v(t) = 0.5 * (1 - cos(pi * t))
    SCurve,
}

impl FadeCurve {
    /// Fade-in multiplier at `position` (0.0 = start of fade, 1.0 = end)
    pub fn fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
        }
    }

    /// Fade-out multiplier at `position` (0.0 = start of fade, 1.0 = end)
    pub fn fade_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        if t >= 1.0 {
            // cos(pi/2) is not exactly zero in f32
            return 0.0;
        }
        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
            FadeCurve::SCurve => 0.5 * (1.0 + (PI * t).cos()),
        }
    }

    /// Parse a curve name as it appears in config files and on the CLI
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "linear" => Some(FadeCurve::Linear),
            "equal_power" | "equalpower" => Some(FadeCurve::EqualPower),
            "s_curve" | "scurve" | "cosine" => Some(FadeCurve::SCurve),
            _ => None,
        }
    }
}

/// Attenuate the final `fade_duration_ms` of `clip` to silence
///
/// Returns a new buffer; the source is untouched. A fade longer than the
/// clip is clamped to the whole clip.
pub fn apply_fade_out(clip: &AudioBuffer, fade_duration_ms: u64, curve: FadeCurve) -> AudioBuffer {
    let mut faded = clip.clone();
    fade_out_in_place(&mut faded, fade_duration_ms, curve);
    faded
}

/// In-place variant of [`apply_fade_out`]
pub fn fade_out_in_place(clip: &mut AudioBuffer, fade_duration_ms: u64, curve: FadeCurve) {
    let len = clip.len();
    let fade_frames = ms_to_frames(fade_duration_ms, clip.sample_rate).min(len);
    if fade_frames == 0 {
        return;
    }

    let start = len - fade_frames;
    for channel in &mut clip.samples {
        for (i, sample) in channel[start..].iter_mut().enumerate() {
            // Last frame lands exactly on t = 1.0, i.e. silence
            let t = (i + 1) as f32 / fade_frames as f32;
            *sample *= curve.fade_out(t);
        }
    }
}
