//! CLI Module
//!
//! Command-line interface for the booktrack assembly pipeline.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::{AudioFormat, TrackConfig};
use crate::error::{BooktrackError, Result};

/// Booktrack - stitch generated reading music into one continuous track
#[derive(Parser, Debug)]
#[command(name = "booktrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON config file (defaults and BOOKTRACK_* variables still apply)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding persisted clips and the combined output
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Use the store of this session under the output directory
    #[arg(long, global = true)]
    pub session: Option<Uuid>,

    /// Clip format: mp3 or wav
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Encoder binary used for mp3 export (ffmpeg or lame)
    #[arg(long, global = true)]
    pub encoder: Option<PathBuf>,

    /// Crossfade window between consecutive clips, in milliseconds
    #[arg(long, global = true)]
    pub crossfade_ms: Option<u64>,

    /// Trailing fade-out applied to each clip, in milliseconds
    #[arg(long, global = true)]
    pub fade_out_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Resolve the effective configuration: file, then env, then flags
    pub fn resolve_config(&self) -> Result<TrackConfig> {
        self.resolve_config_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Cli::resolve_config`] with variables read through `lookup`
    pub fn resolve_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<TrackConfig> {
        let config = match &self.config {
            Some(path) => TrackConfig::load(path)?,
            None => TrackConfig::default(),
        };
        let mut config = config.with_overrides(lookup)?;

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(format) = &self.format {
            config.format =
                AudioFormat::parse(format).ok_or_else(|| BooktrackError::InvalidConfig {
                    field: "format".to_string(),
                    reason: format!("unrecognized value '{}'", format),
                })?;
        }
        if let Some(encoder) = &self.encoder {
            config.encoder = encoder.clone();
        }
        if let Some(ms) = self.crossfade_ms {
            config.crossfade_ms = ms;
        }
        if let Some(ms) = self.fade_out_ms {
            config.fade_out_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download one version's clip into the store (skipped if present)
    #[command(name = "fetch")]
    Fetch {
        /// Version index the clip is stored under
        #[arg(short, long)]
        index: usize,

        /// URL or path of the generated clip
        locator: String,
    },

    /// Crossfade persisted versions into the combined output
    #[command(name = "assemble")]
    Assemble {
        /// Version indices in merge order (default: every persisted clip)
        indices: Vec<usize>,
    },

    /// Fetch a list of clips as a new session and assemble them
    #[command(name = "stitch")]
    Stitch {
        /// Clip locators in narrative order
        #[arg(required = true, num_args = 1..)]
        locators: Vec<String>,
    },

    /// Check that the configured encoder is usable
    #[command(name = "check-codec")]
    CheckCodec,

    /// List persisted versions and the combined output
    #[command(name = "list")]
    List,
}
