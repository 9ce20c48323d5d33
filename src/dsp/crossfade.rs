//! Overlapping crossfade between consecutive clips
//!
//! The tail of the accumulated result and the head of the next clip are
//! blended over a window; the merged length is `acc + next - overlap`.

use crate::dsp::fade::FadeCurve;
use crate::engine::buffer::{ms_to_frames, AudioBuffer, ChannelLayout};

/// Overlap actually used for a merge
///
/// The nominal window is clamped to the shorter of the two clips.
pub fn effective_overlap_frames(
    accumulated: &AudioBuffer,
    next: &AudioBuffer,
    window_ms: u64,
) -> usize {
    ms_to_frames(window_ms, accumulated.sample_rate)
        .min(accumulated.len())
        .min(next.len())
}

/// Append `next` to `accumulated` with an overlapping crossfade
///
/// `next` is first brought to the accumulator's sample rate and channel
/// count (mono is upmixed when the other side is stereo). Not commutative:
/// the accumulator's tail always fades out and `next`'s head fades in.
pub fn crossfade_append(
    accumulated: &AudioBuffer,
    next: &AudioBuffer,
    window_ms: u64,
    curve: FadeCurve,
) -> AudioBuffer {
    let (acc, next) = reconcile(accumulated, next);

    let overlap = effective_overlap_frames(&acc, &next, window_ms);
    let acc_len = acc.len();
    let start = acc_len - overlap;
    let total = acc_len + next.len() - overlap;

    let samples = acc
        .samples
        .iter()
        .zip(next.samples.iter())
        .map(|(head, tail)| {
            let mut out = Vec::with_capacity(total);
            out.extend_from_slice(&head[..start]);
            for i in 0..overlap {
                let t = if overlap > 1 {
                    i as f32 / (overlap - 1) as f32
                } else {
                    1.0
                };
                out.push(head[start + i] * curve.fade_out(t) + tail[i] * curve.fade_in(t));
            }
            out.extend_from_slice(&tail[overlap..]);
            out
        })
        .collect();

    AudioBuffer {
        samples,
        sample_rate: acc.sample_rate,
    }
}

/// Bring both sides to a common sample rate and channel count
fn reconcile(accumulated: &AudioBuffer, next: &AudioBuffer) -> (AudioBuffer, AudioBuffer) {
    let next = next.resampled(accumulated.sample_rate);

    let layout = if accumulated.channels().max(next.channels()) >= 2 {
        ChannelLayout::Stereo
    } else {
        ChannelLayout::Mono
    };

    (accumulated.with_layout(layout), next.with_layout(layout))
}
