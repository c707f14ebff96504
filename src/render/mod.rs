//! Render module - Canvas drawing, overlay composition and video encoding.

mod canvas;
mod composer;
pub(crate) mod encoder;
mod font;
mod progress;

pub use canvas::{Canvas, GRADIENT_LEVELS, Gradient, Rect, line_height};
pub use composer::{
    ComposeError, CompositionStats, Layout, Overlay, TITLE, VideoComposer, date_label,
};
pub use encoder::{EncodeError, EncodeRequest, FfmpegEncoder, StagedOutput, StagedVideo, VideoEncoder};
pub use progress::ProgressReporter;
