//! Automata Render - Turn cellular automaton snapshots into a video.
//!
//! An external simulator writes one binary snapshot per generation
//! (`gen_000000.bin`, `gen_000001.bin`, ...) plus a `rule_info.txt`
//! sidecar. This crate loads those snapshots in parallel, picks a color
//! scheme for the run, maps multi-state cells to a display intensity and
//! encodes the frames with overlay text into a single MP4.
//!
//! # Architecture
//!
//! - `schema`: Run configuration, metadata sidecar and color catalog
//! - `snapshot`: Snapshot decoding and parallel frame loading
//! - `compute`: Frame planning, color selection and intensity mapping
//! - `render`: Canvas drawing, composition and ffmpeg encoding
//! - `pipeline`: The end-to-end render job
//!
//! # Example
//!
//! ```rust,no_run
//! use automata_render::{RenderConfig, RenderJob};
//!
//! let mut config = RenderConfig::new("output");
//! config.output = "videos/today.mp4".into();
//! config.duration = Some(30.0);
//!
//! let summary = RenderJob::new(config).run()?;
//! println!("{} frames at {:.2} fps", summary.frames, summary.fps);
//! # Ok::<(), automata_render::RenderError>(())
//! ```

pub mod compute;
pub mod pipeline;
pub mod render;
pub mod schema;
pub mod snapshot;

// Re-export commonly used types
pub use pipeline::{RenderError, RenderJob, RenderSummary};
pub use schema::{AutomatonMetadata, ColorScheme, RenderConfig};
pub use snapshot::{FrameSequence, Snapshot};
