//! Booktrack - Track Assembly Pipeline
//!
//! Turns a series of independently generated music clips (one per
//! narrative "version") into one continuous listening track:
//!
//! 1. [`fetch`] downloads each clip once and persists it in the [`store`]
//! 2. [`dsp`] normalizes each clip and fades out its tail
//! 3. [`assembly`] crossfades the clips left to right and exports the
//!    combined artifact to a fixed path
//!
//! [`session`] ties these together for a caller-owned list of versions.

pub mod assembly;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod session;
pub mod store;

pub use error::{BooktrackError, Result};
