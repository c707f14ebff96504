//! Automata Render CLI - Turn simulator snapshots into a video.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use env_logger::Env;

use automata_render::{
    pipeline::RenderJob,
    schema::{RateSpec, RenderConfig},
    snapshot::FrameLoader,
};

/// Render a directory of cellular automaton generations to an MP4.
#[derive(Parser, Debug)]
#[command(name = "automata-render")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory containing gen_*.bin snapshots
    #[arg(required_unless_present = "config")]
    input_dir: Option<PathBuf>,

    /// Output video path [default: automata.mp4]
    output: Option<PathBuf>,

    /// Frames per second, or duration=<seconds> to fit the video to a length
    rate: Option<RateSpec>,

    /// Render at most this many frames
    max_frames: Option<usize>,

    /// Metadata sidecar [default: <input_dir>/rule_info.txt]
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Output frame size as WIDTHxHEIGHT
    #[arg(long)]
    size: Option<CanvasSize>,

    /// Log progress every N frames
    #[arg(long)]
    progress_interval: Option<usize>,

    /// Maximum number of snapshot decode workers
    #[arg(long)]
    workers: Option<usize>,

    /// Load the run configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Print the render summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy)]
struct CanvasSize {
    width: u32,
    height: u32,
}

impl FromStr for CanvasSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid size {:?}: {}", s, e))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = build_config(&cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let loader = match cli.workers {
        Some(n) => FrameLoader::with_workers(n),
        None => FrameLoader::new(),
    };

    log::info!("automata-render v{}", env!("CARGO_PKG_VERSION"));
    let summary = RenderJob::new(config).with_loader(loader).run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("Done!");
        println!("Output: {}", summary.output.display());
        println!(
            "Frames: {} at {:.2} fps (~{:.1}s)",
            summary.frames, summary.fps, summary.duration_secs
        );
        println!(
            "Colors: alive {}, dead {}",
            summary.scheme.alive, summary.scheme.dead
        );
    }
    Ok(())
}

/// Start from `--config` (or defaults) and apply command-line overrides.
fn build_config(cli: &Cli) -> Result<RenderConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Error reading config file {}: {}", path.display(), e))?;
            serde_json::from_str::<RenderConfig>(&text)
                .map_err(|e| format!("Error parsing config: {}", e))?
        }
        None => RenderConfig::default(),
    };

    if let Some(dir) = &cli.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(rate) = cli.rate {
        config.set_rate(rate);
    }
    if let Some(max_frames) = cli.max_frames {
        config.max_frames = Some(max_frames);
    }
    if let Some(metadata) = &cli.metadata {
        config.metadata_file = Some(metadata.clone());
    }
    if let Some(size) = cli.size {
        config.canvas_width = size.width;
        config.canvas_height = size.height;
    }
    if let Some(interval) = cli.progress_interval {
        config.progress_interval = interval;
    }

    config.validate()?;
    Ok(config)
}
