//! Run configuration for a render job.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of the metadata sidecar written next to the snapshots.
pub const METADATA_FILE_NAME: &str = "rule_info.txt";

/// Output path used when none is given.
pub const DEFAULT_OUTPUT: &str = "automata.mp4";

/// Frame rate used when neither fps nor duration is given.
pub const DEFAULT_FPS: f64 = 60.0;

/// Smallest canvas side that fits the overlay text.
pub const MIN_CANVAS: u32 = 256;

/// Largest canvas side accepted.
pub const MAX_CANVAS: u32 = 4096;

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_canvas() -> u32 {
    700
}

fn default_progress_interval() -> usize {
    100
}

/// A rate specifier as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateSpec {
    /// Explicit frames per second.
    Fps(f64),
    /// Target video duration in seconds; fps becomes frames / duration.
    Duration(f64),
}

impl FromStr for RateSpec {
    type Err = ConfigError;

    /// Parses `duration=<seconds>` or a bare frames-per-second number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(secs) = s.strip_prefix("duration=") {
            secs.trim()
                .parse::<f64>()
                .map(RateSpec::Duration)
                .map_err(|_| ConfigError::InvalidRate(s.to_string()))
        } else {
            s.parse::<f64>()
                .map(RateSpec::Fps)
                .map_err(|_| ConfigError::InvalidRate(s.to_string()))
        }
    }
}

impl fmt::Display for RateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateSpec::Fps(fps) => write!(f, "{}", fps),
            RateSpec::Duration(secs) => write!(f, "duration={}", secs),
        }
    }
}

/// Settings handed to the ffmpeg encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// ffmpeg executable. `AUTOMATA_FFMPEG` overrides the default.
    pub ffmpeg: String,
    /// Video codec passed to `-c:v`.
    pub codec: String,
    /// x264 preset.
    pub preset: String,
    /// Constant rate factor (0-51, lower is better).
    pub crf: u8,
    /// Output pixel format.
    pub pixel_format: String,
    /// Bitrate ceiling in kbit/s (0 = uncapped).
    pub max_bitrate_kbps: u32,
    /// Value for the container's artist tag.
    pub artist: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg: std::env::var("AUTOMATA_FFMPEG").unwrap_or_else(|_| "ffmpeg".into()),
            codec: "libx264".into(),
            preset: "slow".into(),
            crf: 18,
            pixel_format: "yuv420p".into(),
            max_bitrate_kbps: 5000,
            artist: "Daily Cellular Automata".into(),
        }
    }
}

/// Top-level render configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory containing `gen_*.bin` snapshots.
    pub input_dir: PathBuf,
    /// Output video path.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Explicit frames per second. Takes precedence over `duration`.
    #[serde(default)]
    pub fps: Option<f64>,
    /// Target duration in seconds, used when `fps` is unset.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Optional cap on the number of rendered frames.
    #[serde(default)]
    pub max_frames: Option<usize>,
    /// Metadata sidecar. Defaults to `<input_dir>/rule_info.txt`.
    #[serde(default)]
    pub metadata_file: Option<PathBuf>,
    /// Output frame width in pixels.
    #[serde(default = "default_canvas")]
    pub canvas_width: u32,
    /// Output frame height in pixels.
    #[serde(default = "default_canvas")]
    pub canvas_height: u32,
    /// Log progress every N frames.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    /// Encoder settings.
    #[serde(default)]
    pub encoder: EncoderSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("output"),
            output: default_output(),
            fps: None,
            duration: None,
            max_frames: None,
            metadata_file: None,
            canvas_width: default_canvas(),
            canvas_height: default_canvas(),
            progress_interval: default_progress_interval(),
            encoder: EncoderSettings::default(),
        }
    }
}

impl RenderConfig {
    /// Configuration for an input directory with everything else defaulted.
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Default::default()
        }
    }

    /// Apply a command-line rate specifier.
    pub fn set_rate(&mut self, rate: RateSpec) {
        match rate {
            RateSpec::Fps(fps) => self.fps = Some(fps),
            RateSpec::Duration(secs) => self.duration = Some(secs),
        }
    }

    /// Resolved path of the metadata sidecar.
    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_file
            .clone()
            .unwrap_or_else(|| self.input_dir.join(METADATA_FILE_NAME))
    }

    /// Output path as given.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(fps) = self.fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(ConfigError::InvalidFps(fps));
            }
        }
        if let Some(secs) = self.duration {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(ConfigError::InvalidDuration(secs));
            }
        }
        if self.max_frames == Some(0) {
            return Err(ConfigError::ZeroMaxFrames);
        }
        let side_ok = |side: u32| (MIN_CANVAS..=MAX_CANVAS).contains(&side) && side % 2 == 0;
        if !side_ok(self.canvas_width) || !side_ok(self.canvas_height) {
            return Err(ConfigError::InvalidCanvas {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::ZeroProgressInterval);
        }
        if self.encoder.crf > 51 {
            return Err(ConfigError::InvalidCrf(self.encoder.crf));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid rate specifier {0:?} (expected fps or duration=<seconds>)")]
    InvalidRate(String),
    #[error("Frames per second must be positive and finite, got {0}")]
    InvalidFps(f64),
    #[error("Duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
    #[error("Maximum frame count must be non-zero")]
    ZeroMaxFrames,
    #[error("Canvas size {width}x{height} must be even and between 256 and 4096 per side")]
    InvalidCanvas { width: u32, height: u32 },
    #[error("Progress interval must be non-zero")]
    ZeroProgressInterval,
    #[error("CRF must be in 0..=51, got {0}")]
    InvalidCrf(u8),
}
