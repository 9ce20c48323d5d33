//! Audio Engine Module
//!
//! - Audio buffer management
//! - Codecs for persisted clips and the combined artifact
//! - External encoder integration

pub mod buffer;
pub mod encoder;
pub mod io;

pub use buffer::{db_to_linear, ms_to_frames, AudioBuffer, ChannelLayout};
pub use encoder::{EncoderKind, ExternalEncoder};
pub use io::{
    decode_compressed, encode_wav_bytes, generate_stereo_test_tone, generate_test_tone, read_wav,
    write_wav, ClipCodec, Mp3Codec, WavCodec,
};
