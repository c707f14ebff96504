//! End-to-end render job: snapshots in, video out.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::compute::{ColorSchemeSelector, FrameLimit, map_intensities, resolve_frame_plan};
use crate::render::{
    ComposeError, EncodeError, EncodeRequest, FfmpegEncoder, Overlay, ProgressReporter,
    StagedOutput, VideoComposer, VideoEncoder,
};
use crate::schema::{ColorScheme, ConfigError, MetadataWriter, RenderConfig, read_metadata};
use crate::snapshot::{FrameLoader, LoadError, SnapshotError, discover_snapshots};

/// Errors that abort a render job.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("No generation files found in {}", .0.display())]
    MissingInput(PathBuf),
    #[error("Corrupt snapshot #{index} ({}): {source}", .path.display())]
    CorruptSnapshot {
        index: usize,
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },
    #[error("Snapshot #{index} is {found_width}x{found_height}, expected {width}x{height}")]
    InconsistentDimensions {
        index: usize,
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },
    #[error("Video encoding failed: {0}")]
    EncodingFailure(#[source] EncodeError),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to start decode workers: {0}")]
    WorkerPool(#[source] rayon::ThreadPoolBuildError),
}

impl From<LoadError> for RenderError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Corrupt {
                index,
                path,
                source,
            } => RenderError::CorruptSnapshot {
                index,
                path,
                source,
            },
            LoadError::InconsistentDimensions {
                index,
                width,
                height,
                found_width,
                found_height,
            } => RenderError::InconsistentDimensions {
                index,
                width,
                height,
                found_width,
                found_height,
            },
            LoadError::WorkerPool(e) => RenderError::WorkerPool(e),
        }
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub frames: usize,
    pub fps: f64,
    pub duration_secs: f64,
    pub limit: FrameLimit,
    pub grid_width: usize,
    pub grid_height: usize,
    pub canvas_width: usize,
    pub canvas_height: usize,
    pub max_state: u8,
    pub scheme_index: usize,
    pub scheme: ColorScheme,
    /// True if the scheme was shifted to avoid repeating the previous day's.
    pub scheme_adjusted: bool,
    pub date_label: String,
    pub load_secs: f64,
    pub render_secs: f64,
    pub total_secs: f64,
}

/// A configured render job.
#[derive(Debug, Clone)]
pub struct RenderJob {
    config: RenderConfig,
    loader: FrameLoader,
}

impl RenderJob {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            loader: FrameLoader::new(),
        }
    }

    /// Use a specific loader (e.g. one with a worker cap).
    pub fn with_loader(mut self, loader: FrameLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Run the job, encoding with ffmpeg.
    pub fn run(&self) -> Result<RenderSummary, RenderError> {
        let settings = self.config.encoder.clone();
        self.run_with(|request| FfmpegEncoder::spawn(&settings, request))
            .map(|(_, summary)| summary)
    }

    /// Run the job with an encoder built by `make_encoder` once the
    /// frame rate and canvas size are known.
    pub fn run_with<E, F>(
        &self,
        make_encoder: F,
    ) -> Result<(<E::Output as StagedOutput>::Committed, RenderSummary), RenderError>
    where
        E: VideoEncoder,
        F: FnOnce(&EncodeRequest) -> Result<E, EncodeError>,
    {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        let metadata_path = config.metadata_path();
        let metadata = read_metadata(&metadata_path).map_err(|source| RenderError::Io {
            path: metadata_path.clone(),
            source,
        })?;

        let mut paths = find_snapshots(&config.input_dir)?;
        let plan = resolve_frame_plan(
            paths.len(),
            metadata.generations,
            config.max_frames,
            config.fps,
            config.duration,
        );
        paths.truncate(plan.frame_count);

        log::info!("Loading {} generations in parallel...", paths.len());
        let load_start = Instant::now();
        let frames = self.loader.load(&paths)?;
        let load_secs = load_start.elapsed().as_secs_f64();

        let Some((grid_width, grid_height)) = frames.dimensions() else {
            return Err(RenderError::MissingInput(config.input_dir.clone()));
        };
        let alive_first = frames.get(0).map_or(0, |s| s.alive_count());
        log::info!("Grid dimensions: {}x{}", grid_width, grid_height);
        log::info!("Alive cells in first frame: {}", alive_first);

        let selection = ColorSchemeSelector::default().select(metadata.seed);
        if selection.was_adjusted() {
            log::info!(
                "Color scheme {} matches the previous day, using {}",
                selection.raw_index,
                selection.index
            );
        }
        log::info!(
            "Using color scheme #{}: alive {}, dead {}",
            selection.index,
            selection.scheme.alive,
            selection.scheme.dead
        );

        let (intensity, mapped) = map_intensities(&frames);
        log::info!("Max state value: {}", intensity.max_state());

        let overlay = Overlay::for_metadata(&metadata);
        let date_label = overlay.date_label.clone();
        let canvas_width = config.canvas_width as usize;
        let canvas_height = config.canvas_height as usize;
        let composer = VideoComposer::new(canvas_width, canvas_height, selection.scheme, overlay);

        log::info!(
            "Saving video to {} ({:.2} fps, ~{:.1}s duration)...",
            config.output.display(),
            plan.fps,
            plan.duration_secs()
        );
        let request = EncodeRequest {
            width: canvas_width,
            height: canvas_height,
            fps: plan.fps,
            output: config.output.clone(),
        };
        let writer = MetadataWriter::open(&metadata_path).map_err(|source| RenderError::Io {
            path: metadata_path.clone(),
            source,
        })?;
        let encoder = make_encoder(&request).map_err(RenderError::EncodingFailure)?;
        let mut progress = ProgressReporter::new(mapped.len(), config.progress_interval);

        let (output, stats) = composer
            .compose(&frames, &mapped, encoder, &mut progress, writer)
            .map_err(|err| match err {
                ComposeError::Encode(e) => RenderError::EncodingFailure(e),
                ComposeError::Empty => RenderError::MissingInput(config.input_dir.clone()),
                ComposeError::Metadata { path, source } => RenderError::Io { path, source },
            })?;

        let total_secs = start.elapsed().as_secs_f64();
        log::info!("Frame loading time: {:.2} seconds", load_secs);
        log::info!("Video rendering time: {:.2} seconds", stats.render_secs);
        log::info!("Total execution time: {:.2} seconds", total_secs);

        let summary = RenderSummary {
            output: config.output.clone(),
            frames: stats.frames,
            fps: plan.fps,
            duration_secs: plan.duration_secs(),
            limit: plan.limit,
            grid_width,
            grid_height,
            canvas_width,
            canvas_height,
            max_state: intensity.max_state(),
            scheme_index: selection.index,
            scheme: selection.scheme,
            scheme_adjusted: selection.was_adjusted(),
            date_label,
            load_secs,
            render_secs: stats.render_secs,
            total_secs,
        };
        Ok((output, summary))
    }
}

/// Snapshot paths in `dir`; a missing or empty directory is `MissingInput`.
fn find_snapshots(dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let paths = match discover_snapshots(dir) {
        Ok(paths) => paths,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RenderError::MissingInput(dir.to_path_buf()));
        }
        Err(source) => {
            return Err(RenderError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    if paths.is_empty() {
        return Err(RenderError::MissingInput(dir.to_path_buf()));
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::encoder::testing::MemoryEncoder;
    use crate::schema::COLOR_SCHEMES;
    use crate::snapshot::Snapshot;
    use std::fs;
    use tempfile::tempdir;

    fn write_generations(dir: &Path, n: usize) {
        for g in 0..n {
            let cells = (0..36).map(|i| ((i + g) % 4) as u8).collect();
            let snapshot = Snapshot::new(6, 6, cells).unwrap();
            fs::write(dir.join(format!("gen_{:06}.bin", g)), snapshot.to_bytes()).unwrap();
        }
    }

    fn config(dir: &Path) -> RenderConfig {
        let mut config = RenderConfig::new(dir);
        config.output = dir.join("out").join("video.mp4");
        config.canvas_width = 256;
        config.canvas_height = 256;
        config
    }

    fn memory(request: &EncodeRequest) -> Result<MemoryEncoder, EncodeError> {
        Ok(MemoryEncoder::new(request))
    }

    #[test]
    fn test_end_to_end_with_metadata() {
        let dir = tempdir().unwrap();
        write_generations(dir.path(), 40);
        fs::write(
            dir.path().join("rule_info.txt"),
            "Rule: B3/S23 Moore r1 4-state\nGenerations: 30\nSeed: 20250101\nActivity: 12.5%\n",
        )
        .unwrap();

        let mut config = config(dir.path());
        config.max_frames = Some(20);
        config.duration = Some(2.0);

        let (frames, summary) = RenderJob::new(config).run_with(memory).unwrap();
        assert_eq!(frames.len(), 20);
        assert_eq!(summary.frames, 20);
        assert_eq!(summary.limit, FrameLimit::MaxFrames);
        assert!((summary.fps - 10.0).abs() < 1e-9);
        assert_eq!((summary.grid_width, summary.grid_height), (6, 6));
        assert_eq!(summary.max_state, 3);
        assert_eq!(summary.date_label, "01 January 2025");
        assert_eq!(summary.scheme, COLOR_SCHEMES[summary.scheme_index]);

        let text = fs::read_to_string(dir.path().join("rule_info.txt")).unwrap();
        assert!(text.starts_with("Rule: B3/S23 Moore r1 4-state\n"));
        assert!(text.ends_with(&format!(
            "Colors_Alive: {}\nColors_Dead: {}\n",
            summary.scheme.alive, summary.scheme.dead
        )));
        assert_eq!(text.matches("Colors_Alive").count(), 1);
    }

    #[test]
    fn test_generation_limit_and_default_rate() {
        let dir = tempdir().unwrap();
        write_generations(dir.path(), 12);
        fs::write(dir.path().join("rule_info.txt"), "Generations: 5\n").unwrap();

        let (frames, summary) = RenderJob::new(config(dir.path())).run_with(memory).unwrap();
        assert_eq!(frames.len(), 5);
        assert_eq!(summary.limit, FrameLimit::Generations);
        assert_eq!(summary.fps, 60.0);
    }

    #[test]
    fn test_missing_metadata_creates_sidecar() {
        let dir = tempdir().unwrap();
        write_generations(dir.path(), 3);

        let (_, summary) = RenderJob::new(config(dir.path())).run_with(memory).unwrap();
        let text = fs::read_to_string(dir.path().join("rule_info.txt")).unwrap();
        assert_eq!(
            text,
            format!(
                "Colors_Alive: {}\nColors_Dead: {}\n",
                summary.scheme.alive, summary.scheme.dead
            )
        );
    }

    #[test]
    fn test_missing_and_empty_input() {
        let dir = tempdir().unwrap();
        let result = RenderJob::new(config(&dir.path().join("absent"))).run_with(memory);
        assert!(matches!(result, Err(RenderError::MissingInput(_))));

        fs::write(dir.path().join("notes.txt"), "not a snapshot").unwrap();
        let result = RenderJob::new(config(dir.path())).run_with(memory);
        assert!(matches!(result, Err(RenderError::MissingInput(_))));
    }

    #[test]
    fn test_corrupt_snapshot_aborts_before_encoding() {
        let dir = tempdir().unwrap();
        write_generations(dir.path(), 8);
        fs::write(dir.path().join("gen_000004.bin"), [6, 0, 0, 0, 6, 0, 0, 0, 1]).unwrap();
        fs::write(dir.path().join("rule_info.txt"), "Rule: test\n").unwrap();

        let mut encoder_built = false;
        let result = RenderJob::new(config(dir.path())).run_with(|request| {
            encoder_built = true;
            memory(request)
        });
        assert!(matches!(
            result,
            Err(RenderError::CorruptSnapshot { index: 4, .. })
        ));
        assert!(!encoder_built);
        assert_eq!(
            fs::read_to_string(dir.path().join("rule_info.txt")).unwrap(),
            "Rule: test\n"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        write_generations(dir.path(), 2);
        let mut config = config(dir.path());
        config.max_frames = Some(0);
        let result = RenderJob::new(config).run_with(memory);
        assert!(matches!(result, Err(RenderError::Config(ConfigError::ZeroMaxFrames))));
    }

    #[test]
    fn test_encoder_failure_is_reported() {
        let dir = tempdir().unwrap();
        write_generations(dir.path(), 4);
        let result = RenderJob::new(config(dir.path())).run_with(|request| {
            let mut sink = MemoryEncoder::new(request);
            sink.fail_at = Some(1);
            Ok(sink)
        });
        assert!(matches!(result, Err(RenderError::EncodingFailure(_))));
        assert!(!dir.path().join("rule_info.txt").exists());
    }

    #[test]
    fn test_unwritable_sidecar_fails_before_encoding() {
        let dir = tempdir().unwrap();
        write_generations(dir.path(), 4);
        let mut config = config(dir.path());
        config.metadata_file = Some(dir.path().join("missing").join("rule_info.txt"));
        let output = config.output.clone();

        let mut encoder_built = false;
        let result = RenderJob::new(config).run_with(|request| {
            encoder_built = true;
            memory(request)
        });
        assert!(matches!(result, Err(RenderError::Io { .. })));
        assert!(!encoder_built);
        assert!(!output.exists());
    }
}
