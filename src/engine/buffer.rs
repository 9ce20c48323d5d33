//! Audio Buffer Management
//!
//! Provides the decoded, in-memory clip representation used by every stage
//! after the Clip Fetcher. Samples are planar 32-bit float; each buffer
//! keeps its own sample rate because generated clips are not guaranteed to
//! agree on one.

use crate::error::{BooktrackError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Number of frames covering `duration_ms` at `sample_rate` (rounded)
#[inline]
pub fn ms_to_frames(duration_ms: u64, sample_rate: u32) -> usize {
    ((duration_ms as f64 * sample_rate as f64) / 1000.0).round() as usize
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar audio buffer
///
/// # Example
/// ```
/// use booktrack::engine::{AudioBuffer, ChannelLayout};
///
/// // One second of stereo silence at 32kHz
/// let buffer = AudioBuffer::new(32_000, ChannelLayout::Stereo, 32_000);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.duration_ms(), 1000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer with `num_samples` frames per channel
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        let num_channels = layout.num_channels();
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// Fails if the data length does not divide evenly into frames.
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(BooktrackError::UnsupportedFormat {
                format: format!(
                    "interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of frames (samples per channel)
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get the duration in whole milliseconds (rounded)
    #[inline]
    pub fn duration_ms(&self) -> u64 {
        (self.duration_secs() * 1000.0).round() as u64
    }

    /// Get the channel layout
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Absolute peak across all channels (linear)
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Scale the buffer so its absolute peak sits at `target_db`
    ///
    /// Silent buffers are left alone.
    pub fn normalize_peak(&mut self, target_db: f32) {
        let peak = self.peak();
        if peak <= 0.0 {
            return;
        }
        let gain = db_to_linear(target_db) / peak;
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Return a copy with `layout` channels
    ///
    /// Mono is duplicated to stereo; stereo is averaged down to mono.
    pub fn with_layout(&self, layout: ChannelLayout) -> AudioBuffer {
        match (self.channels(), layout) {
            (1, ChannelLayout::Stereo) => AudioBuffer {
                samples: vec![self.samples[0].clone(), self.samples[0].clone()],
                sample_rate: self.sample_rate,
            },
            (2, ChannelLayout::Mono) => {
                let mixed = self.samples[0]
                    .iter()
                    .zip(self.samples[1].iter())
                    .map(|(l, r)| 0.5 * (l + r))
                    .collect();
                AudioBuffer {
                    samples: vec![mixed],
                    sample_rate: self.sample_rate,
                }
            }
            _ => self.clone(),
        }
    }

    /// Return a copy resampled to `target_rate`
    ///
    /// Uses linear interpolation, which is adequate for lining up clips from
    /// the same generator before a crossfade.
    pub fn resampled(&self, target_rate: u32) -> AudioBuffer {
        if target_rate == self.sample_rate || self.sample_rate == 0 {
            return self.clone();
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        AudioBuffer {
            samples: self
                .samples
                .iter()
                .map(|channel| resample_linear(channel, ratio))
                .collect(),
            sample_rate: target_rate,
        }
    }
}

/// Linear interpolation resampling of a single channel
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================
