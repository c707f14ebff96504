//! Frame count truncation and display rate resolution.

use serde::Serialize;

use crate::schema::DEFAULT_FPS;

/// Why the frame count ended where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameLimit {
    /// Every snapshot is rendered.
    AllSnapshots,
    /// Truncated to the metadata's generation limit.
    Generations,
    /// Truncated to the explicit max-frame cap.
    MaxFrames,
}

/// Resolved frame count and display rate for a job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FramePlan {
    /// Number of frames to render.
    pub frame_count: usize,
    /// Frames per second.
    pub fps: f64,
    /// Which rule set `frame_count`.
    pub limit: FrameLimit,
}

impl FramePlan {
    /// Approximate video duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

/// Apply truncation and rate rules, in order:
///
/// 1. A generation limit below `snapshot_count` truncates to it.
/// 2. A max-frame cap truncates further (it never grows the count).
/// 3. Explicit fps wins over duration (`fps = frames / duration`);
///    otherwise [`DEFAULT_FPS`].
pub fn resolve_frame_plan(
    snapshot_count: usize,
    generation_limit: Option<usize>,
    max_frames: Option<usize>,
    fps: Option<f64>,
    duration: Option<f64>,
) -> FramePlan {
    let mut frame_count = snapshot_count;
    let mut limit = FrameLimit::AllSnapshots;

    if let Some(generations) = generation_limit {
        if generations < frame_count {
            log::info!(
                "Limiting frames to {} (from metadata generation limit)",
                generations
            );
            frame_count = generations;
            limit = FrameLimit::Generations;
        }
    }

    if let Some(cap) = max_frames {
        if cap < frame_count {
            frame_count = cap;
            limit = FrameLimit::MaxFrames;
        }
    }

    let fps = match (fps, duration) {
        (Some(fps), _) => fps,
        (None, Some(secs)) if secs > 0.0 && frame_count > 0 => {
            let fps = frame_count as f64 / secs;
            log::info!("Calculating FPS for {}s video: {:.2} fps", secs, fps);
            fps
        }
        _ => DEFAULT_FPS,
    };

    FramePlan {
        frame_count,
        fps,
        limit,
    }
}
