//! Audio codecs for Booktrack
//!
//! A `ClipCodec` decides the on-disk extension, turns persisted bytes into an
//! `AudioBuffer`, and writes buffers back out. Two codecs ship:
//! - `WavCodec`: hound in both directions, no external dependencies
//! - `Mp3Codec`: symphonia for decoding, an external encoder for export

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::engine::encoder::ExternalEncoder;
use crate::error::{BooktrackError, Result};

/// Decoder/encoder pair for one on-disk audio format
pub trait ClipCodec: Send + Sync {
    /// File extension used for persisted clips and the combined artifact
    fn extension(&self) -> &'static str;

    /// Check that everything the codec needs is present
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Decode persisted bytes into a buffer
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer>;

    /// Write `buffer` to `path`, replacing whatever is there
    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()>;
}

// ============================================================================
// WAV
// ============================================================================

/// WAV via hound
#[derive(Debug, Clone)]
pub struct WavCodec {
    /// Bit depth used on export: 16, 24 or 32 (float)
    pub bit_depth: u16,
}

impl Default for WavCodec {
    fn default() -> Self {
        Self { bit_depth: 16 }
    }
}

impl ClipCodec for WavCodec {
    fn extension(&self) -> &'static str {
        "wav"
    }

    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer> {
        read_wav(Cursor::new(bytes))
    }

    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        write_wav(buffer, path, self.bit_depth)
    }
}

// ============================================================================
// MP3
// ============================================================================

/// MP3: symphonia decode, external encoder for export
#[derive(Debug, Clone)]
pub struct Mp3Codec {
    encoder: ExternalEncoder,
}

impl Mp3Codec {
    pub fn new(encoder: ExternalEncoder) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &ExternalEncoder {
        &self.encoder
    }
}

impl ClipCodec for Mp3Codec {
    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn validate(&self) -> Result<()> {
        self.encoder.validate()
    }

    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer> {
        decode_compressed(bytes, "mp3")
    }

    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        self.encoder.encode(buffer, path)
    }
}

/// Decode a compressed payload with symphonia
///
/// Packets that fail to decode are skipped, as players do; a payload that
/// yields no audio at all is an error.
pub fn decode_compressed(bytes: &[u8], extension: &str) -> Result<AudioBuffer> {
    if bytes.is_empty() {
        return Err(BooktrackError::EmptyAudio);
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| BooktrackError::UnsupportedFormat {
            format: format!("unrecognized {} payload: {}", extension, e),
        })?;
    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| BooktrackError::UnsupportedFormat {
                format: "no audio track found".to_string(),
            })?;
        (track.id, track.codec_params.clone())
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| BooktrackError::UnsupportedFormat {
            format: format!("no decoder for track: {}", e),
        })?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count());
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(BooktrackError::UnsupportedFormat {
                    format: format!("error reading packet: {}", e),
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count());
                if decoded.frames() == 0 {
                    continue;
                }
                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(sample_buf.samples());
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                tracing::debug!(reason, "Skipping undecodable packet");
            }
            Err(e) => {
                return Err(BooktrackError::UnsupportedFormat {
                    format: format!("decoder failure: {}", e),
                })
            }
        }
    }

    if interleaved.is_empty() {
        return Err(BooktrackError::EmptyAudio);
    }

    let channel_count = channels.unwrap_or(1);
    let layout =
        ChannelLayout::from_count(channel_count).ok_or_else(|| BooktrackError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channel_count),
        })?;
    let sample_rate = sample_rate.ok_or_else(|| BooktrackError::UnsupportedFormat {
        format: "sample rate unknown".to_string(),
    })?;

    AudioBuffer::from_interleaved(&interleaved, layout, sample_rate)
}

// ============================================================================
// WAV helpers
// ============================================================================

/// Read a WAV stream into a buffer, converting to 32-bit float
pub fn read_wav<R: Read>(source: R) -> Result<AudioBuffer> {
    let reader = WavReader::new(source).map_err(|e| BooktrackError::UnsupportedFormat {
        format: format!("not a WAV stream: {}", e),
    })?;

    let spec = reader.spec();
    let layout = ChannelLayout::from_count(spec.channels as usize).ok_or_else(|| {
        BooktrackError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", spec.channels),
        }
    })?;

    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples.is_empty() {
        return Err(BooktrackError::EmptyAudio);
    }

    AudioBuffer::from_interleaved(&samples, layout, spec.sample_rate)
}

/// Write a buffer as a WAV file at its own sample rate
pub fn write_wav(buffer: &AudioBuffer, path: &Path, bit_depth: u16) -> Result<()> {
    let writer = WavWriter::create(path, wav_spec(buffer, bit_depth)?).map_err(hound_error)?;
    write_wav_samples(writer, buffer, bit_depth)
}

/// Encode a buffer as WAV bytes in memory
pub fn encode_wav_bytes(buffer: &AudioBuffer, bit_depth: u16) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let writer =
            WavWriter::new(&mut cursor, wav_spec(buffer, bit_depth)?).map_err(hound_error)?;
        write_wav_samples(writer, buffer, bit_depth)?;
    }
    Ok(cursor.into_inner())
}

fn wav_spec(buffer: &AudioBuffer, bit_depth: u16) -> Result<WavSpec> {
    if !matches!(bit_depth, 16 | 24 | 32) {
        return Err(BooktrackError::UnsupportedFormat {
            format: format!("{}-bit audio (only 16, 24, 32 supported)", bit_depth),
        });
    }

    Ok(WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: bit_depth,
        sample_format: if bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    })
}

fn write_wav_samples<W: Write + Seek>(
    mut writer: WavWriter<W>,
    buffer: &AudioBuffer,
    bit_depth: u16,
) -> Result<()> {
    for sample in buffer.to_interleaved() {
        match bit_depth {
            16 => {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(hound_error)?;
            }
            24 => {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(hound_error)?;
            }
            _ => writer.write_sample(sample).map_err(hound_error)?,
        }
    }

    writer.finalize().map_err(hound_error)
}

fn read_samples_as_f32<R: Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let samples: std::result::Result<Vec<f32>, hound::Error> = match sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect(),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect(),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect(),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect(),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect(),
            _ => {
                return Err(BooktrackError::UnsupportedFormat {
                    format: format!("{}-bit integer audio", bits_per_sample),
                })
            }
        },
    };

    samples.map_err(|e| BooktrackError::UnsupportedFormat {
        format: format!("truncated or corrupt WAV data: {}", e),
    })
}

fn hound_error(e: hound::Error) -> BooktrackError {
    match e {
        hound::Error::IoError(io) => BooktrackError::Io(io),
        other => BooktrackError::EncodeError {
            reason: other.to_string(),
        },
    }
}

// ============================================================================
// Test signals
// ============================================================================

/// Generate a mono sine tone
///
/// Useful for exercising the pipeline without a generator.
pub fn generate_test_tone(
    frequency: f32,
    duration_secs: f32,
    sample_rate: u32,
    amplitude: f32,
) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    let mut buffer = AudioBuffer::new(num_samples, ChannelLayout::Mono, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = amplitude * (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate a stereo tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate, 0.8);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate, 0.8);

    AudioBuffer {
        samples: vec![left.samples[0].clone(), right.samples[0].clone()],
        sample_rate,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_wav_bytes_32bit_lossless() {
        let original = generate_test_tone(440.0, 0.25, 8_000, 0.5);
        let bytes = encode_wav_bytes(&original, 32).unwrap();
        let decoded = WavCodec::default().decode(&bytes).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_wav_file_16bit_stereo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let original = generate_stereo_test_tone(440.0, 880.0, 0.2, 16_000);
        let codec = WavCodec { bit_depth: 16 };
        codec.encode(&original, &path).unwrap();

        let decoded = codec.decode(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded.channels(), 2);
        assert_eq!(decoded.len(), original.len());
        assert_eq!(decoded.sample_rate, 16_000);
        for (orig, dec) in original.channel(1).iter().zip(decoded.channel(1)) {
            assert!((orig - dec).abs() < 0.001, "Sample mismatch: {} vs {}", orig, dec);
        }
    }

    #[test]
    fn test_wav_rejects_garbage() {
        let result = WavCodec::default().decode(b"definitely not a riff header");
        assert!(matches!(result, Err(BooktrackError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let tone = generate_test_tone(440.0, 0.1, 8_000, 0.5);
        assert!(encode_wav_bytes(&tone, 12).is_err());
    }

    #[test]
    fn test_decode_compressed_empty() {
        assert!(matches!(
            decode_compressed(&[], "mp3"),
            Err(BooktrackError::EmptyAudio)
        ));
    }

    #[test]
    fn test_decode_compressed_garbage() {
        let garbage = vec![0x5a_u8; 4096];
        assert!(decode_compressed(&garbage, "mp3").is_err());
    }

    #[test]
    fn test_decode_compressed_reads_wav_container() {
        // symphonia's probe also understands RIFF/WAV
        let original = generate_test_tone(220.0, 0.1, 8_000, 0.5);
        let bytes = encode_wav_bytes(&original, 16).unwrap();
        let decoded = decode_compressed(&bytes, "wav").unwrap();

        assert_eq!(decoded.sample_rate, 8_000);
        assert_eq!(decoded.len(), original.len());
    }
}
