//! Frame composition: colorized grid, overlay text, encoding.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use log::warn;
use rayon::prelude::*;
use serde::Serialize;

use crate::compute::{IntensityFrames, SeedDate};
use crate::schema::{AutomatonMetadata, ColorScheme, MetadataWriter, Rgb};
use crate::snapshot::FrameSequence;

use super::canvas::{Canvas, Gradient, Rect, fit_scale, line_height};
use super::encoder::{EncodeError, StagedOutput, VideoEncoder};
use super::progress::ProgressReporter;

/// Title drawn at the top of every frame.
pub const TITLE: &str = "Daily Cellular Automata";

const BACKGROUND: Rgb = Rgb::WHITE;
const TEXT: Rgb = Rgb::BLACK;

/// Composition errors.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("No frames to compose")]
    Empty,
    #[error("Failed to record colors in {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Static text drawn on every frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub title: String,
    pub date_label: String,
    pub activity: String,
}

impl Overlay {
    /// Overlay for a run. The date comes from a `YYYYMMDD` seed when there
    /// is one, otherwise from today's local date.
    pub fn for_metadata(metadata: &AutomatonMetadata) -> Self {
        Self {
            title: TITLE.to_string(),
            date_label: date_label(metadata.seed),
            activity: metadata.activity.clone(),
        }
    }

    fn counter(index: usize, alive: usize) -> String {
        format!("Generation {} | Alive: {}", index, alive)
    }

    fn activity_line(&self) -> String {
        format!("Activity Score: {}", self.activity)
    }
}

/// Date label such as `01 January 2025`.
pub fn date_label(seed: Option<i64>) -> String {
    match seed.and_then(SeedDate::from_seed) {
        Some(date) => date.label(),
        None => chrono::Local::now().format("%d %B %Y").to_string(),
    }
}

/// Pixel positions of the overlay elements and the grid area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub title_y: usize,
    pub title_scale: usize,
    pub date_y: usize,
    pub text_scale: usize,
    pub grid: Rect,
    pub counter_y: usize,
    pub activity_y: usize,
}

impl Layout {
    /// Layout for a canvas: title and date on top, counter and activity at
    /// the bottom, the grid fitted in between.
    pub fn new(width: usize, height: usize) -> Self {
        let title_scale = (width / 230).max(1);
        let text_scale = (width / 350).max(1);
        let margin = (height / 35).max(1);
        let gap = margin / 2;

        let title_y = margin;
        let date_y = title_y + line_height(title_scale) + gap;
        let grid_top = date_y + line_height(text_scale) + margin;

        let activity_y = height.saturating_sub(margin + line_height(text_scale));
        let counter_y = activity_y.saturating_sub(line_height(text_scale) + gap);
        let grid_bottom = counter_y.saturating_sub(margin);

        Self {
            title_y,
            title_scale,
            date_y,
            text_scale,
            grid: Rect {
                x: margin.min(width),
                y: grid_top,
                width: width.saturating_sub(2 * margin),
                height: grid_bottom.saturating_sub(grid_top),
            },
            counter_y,
            activity_y,
        }
    }
}

/// Summary of one composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionStats {
    pub frames: usize,
    pub width: usize,
    pub height: usize,
    pub render_secs: f64,
}

/// Turns mapped frames into video frames and feeds them to an encoder.
#[derive(Debug, Clone)]
pub struct VideoComposer {
    width: usize,
    height: usize,
    scheme: ColorScheme,
    gradient: Gradient,
    overlay: Overlay,
    layout: Layout,
}

impl VideoComposer {
    pub fn new(width: usize, height: usize, scheme: ColorScheme, overlay: Overlay) -> Self {
        Self {
            width,
            height,
            gradient: Gradient::from_scheme(&scheme),
            scheme,
            overlay,
            layout: Layout::new(width, height),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Draw frame `index` with its intensity grid and raw alive count.
    pub fn render_frame(
        &self,
        index: usize,
        grid: &[f32],
        grid_w: usize,
        grid_h: usize,
        alive: usize,
    ) -> Canvas {
        let layout = &self.layout;
        let mut canvas = Canvas::new(self.width, self.height);
        canvas.clear(BACKGROUND);

        let title = &self.overlay.title;
        let title_scale = fit_scale(title, layout.title_scale, self.width.saturating_sub(1));
        canvas.draw_text_centered_bold(layout.title_y, title, title_scale, TEXT);
        self.draw_line(&mut canvas, layout.date_y, &self.overlay.date_label);

        let target = layout.grid.fit(grid_w, grid_h);
        canvas.blit_grid(grid, grid_w, grid_h, target, &self.gradient);

        self.draw_line(&mut canvas, layout.counter_y, &Overlay::counter(index, alive));
        self.draw_line(&mut canvas, layout.activity_y, &self.overlay.activity_line());
        canvas
    }

    fn draw_line(&self, canvas: &mut Canvas, y: usize, text: &str) {
        let scale = fit_scale(text, self.layout.text_scale, self.width);
        canvas.draw_text_centered(y, text, scale, TEXT);
    }

    /// Render every mapped frame into `encoder`, then record the colors.
    ///
    /// Alive counts come from `raw` (cells whose state is exactly 1).
    /// Frames are drawn in parallel batches and written in order. The
    /// colors are appended through `writer` only after the encoder has
    /// finished, and the staged video is committed after that. A failed
    /// commit rolls the sidecar back.
    pub fn compose<E: VideoEncoder>(
        &self,
        raw: &FrameSequence,
        mapped: &IntensityFrames,
        mut encoder: E,
        progress: &mut ProgressReporter,
        writer: MetadataWriter,
    ) -> Result<(<E::Output as StagedOutput>::Committed, CompositionStats), ComposeError> {
        let total = mapped.len().min(raw.len());
        if total == 0 {
            return Err(ComposeError::Empty);
        }

        let start = Instant::now();
        let batch = (rayon::current_num_threads() * 2).max(1);
        let (grid_w, grid_h) = (mapped.width, mapped.height);

        for first in (0..total).step_by(batch) {
            let last = (first + batch).min(total);
            let canvases: Vec<Canvas> = (first..last)
                .into_par_iter()
                .map(|i| {
                    let alive = raw.get(i).map_or(0, |s| s.alive_count());
                    self.render_frame(i, &mapped.frames[i], grid_w, grid_h, alive)
                })
                .collect();

            for (offset, canvas) in canvases.iter().enumerate() {
                progress.observe(first + offset);
                encoder.write_frame(canvas.as_bytes())?;
            }
        }

        let frames = encoder.frames_written();
        let staged = encoder.finish()?;
        let render_secs = start.elapsed().as_secs_f64();

        let path = writer.path().to_path_buf();
        let appended = writer
            .append_colors(&self.scheme)
            .map_err(|source| ComposeError::Metadata { path, source })?;

        let output = match staged.commit() {
            Ok(output) => output,
            Err(e) => {
                if let Err(revert) = appended.revert() {
                    warn!("Failed to roll back colors after encoder error: {}", revert);
                }
                return Err(e.into());
            }
        };

        Ok((
            output,
            CompositionStats {
                frames,
                width: self.width,
                height: self.height,
                render_secs,
            },
        ))
    }
}
