//! Discovery and parallel decoding of snapshot directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use super::format::{Snapshot, SnapshotError, read_snapshot};

/// File name prefix of generation snapshots.
pub const SNAPSHOT_PREFIX: &str = "gen_";

/// File extension of generation snapshots.
pub const SNAPSHOT_EXTENSION: &str = "bin";

/// List `gen_*.bin` files in `dir`, sorted by file name.
///
/// The simulator zero-pads the generation number, so name order is
/// generation order.
pub fn discover_snapshots(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_snapshot = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(SNAPSHOT_PREFIX))
            && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION);
        if is_snapshot {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Errors that abort a load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Corrupt snapshot #{index} ({}): {source}", .path.display())]
    Corrupt {
        index: usize,
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },
    #[error(
        "Snapshot #{index} is {found_width}x{found_height}, expected {width}x{height}"
    )]
    InconsistentDimensions {
        index: usize,
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },
    #[error("Failed to start decode workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Ordered generations sharing one width and height.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<Snapshot>,
}

impl FrameSequence {
    /// Wrap decoded frames, checking that all share the first frame's dimensions.
    pub fn new(frames: Vec<Snapshot>) -> Result<Self, LoadError> {
        if let Some(first) = frames.first() {
            let (width, height) = first.dimensions();
            for (index, frame) in frames.iter().enumerate().skip(1) {
                let (found_width, found_height) = frame.dimensions();
                if (found_width, found_height) != (width, height) {
                    return Err(LoadError::InconsistentDimensions {
                        index,
                        width,
                        height,
                        found_width,
                        found_height,
                    });
                }
            }
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Snapshot] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.frames.get(index)
    }

    /// Shared (width, height), or `None` if empty.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.frames.first().map(Snapshot::dimensions)
    }

    /// Highest state value across every frame.
    pub fn max_state(&self) -> u8 {
        self.frames
            .par_iter()
            .map(Snapshot::max_state)
            .max()
            .unwrap_or(0)
    }

    /// Keep only the first `len` frames.
    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }
}

/// Decodes snapshot files on a bounded worker pool.
#[derive(Debug, Clone, Default)]
pub struct FrameLoader {
    /// Upper bound on workers; `None` uses available parallelism.
    pub max_workers: Option<usize>,
}

impl FrameLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader capped at `workers` threads.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            max_workers: Some(workers.max(1)),
        }
    }

    /// Worker count for `n` files: `min(parallelism, n)`, at least 1.
    pub fn worker_count(&self, n: usize) -> usize {
        let parallelism = self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1)
        });
        parallelism.min(n).max(1)
    }

    /// Decode `paths` concurrently and return them in input order.
    ///
    /// Each task yields `(index, snapshot)`; results are sorted on index
    /// after all tasks finish, so completion order never matters. The
    /// first failure aborts the load and no partial sequence is returned.
    pub fn load(&self, paths: &[PathBuf]) -> Result<FrameSequence, LoadError> {
        if paths.is_empty() {
            return Ok(FrameSequence::default());
        }

        let workers = self.worker_count(paths.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("snapshot-decode-{}", i))
            .build()?;

        let start = Instant::now();
        let mut decoded: Vec<(usize, Snapshot)> = pool.install(|| {
            paths
                .par_iter()
                .enumerate()
                .map(|(index, path)| decode_indexed(index, path))
                .collect::<Result<Vec<_>, _>>()
        })?;
        decoded.sort_unstable_by_key(|(index, _)| *index);

        log::info!(
            "Loaded {} frames in {:.2} seconds using {} workers",
            decoded.len(),
            start.elapsed().as_secs_f64(),
            workers
        );

        FrameSequence::new(decoded.into_iter().map(|(_, snapshot)| snapshot).collect())
    }

    /// Decode `paths` one at a time on the calling thread.
    pub fn load_sequential(&self, paths: &[PathBuf]) -> Result<FrameSequence, LoadError> {
        let frames = paths
            .iter()
            .enumerate()
            .map(|(index, path)| decode_indexed(index, path).map(|(_, snapshot)| snapshot))
            .collect::<Result<Vec<_>, _>>()?;
        FrameSequence::new(frames)
    }
}

fn decode_indexed(index: usize, path: &Path) -> Result<(usize, Snapshot), LoadError> {
    log::debug!("Decoding {}", path.display());
    read_snapshot(path)
        .map(|snapshot| (index, snapshot))
        .map_err(|source| LoadError::Corrupt {
            index,
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::{TempDir, tempdir};

    /// Write `count` distinct w x h snapshots as gen_NNNNNN.bin.
    fn write_frames(dir: &Path, count: usize, width: usize, height: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|g| {
                let cells = (0..width * height)
                    .map(|i| ((i * 7 + g * 13) % 251) as u8)
                    .collect();
                let snapshot = Snapshot::new(width, height, cells).unwrap();
                let path = dir.join(format!("gen_{:06}.bin", g));
                fs::write(&path, snapshot.to_bytes()).unwrap();
                path
            })
            .collect()
    }

    fn frame_dir(count: usize) -> (TempDir, Vec<PathBuf>) {
        let dir = tempdir().unwrap();
        let paths = write_frames(dir.path(), count, 6, 4);
        (dir, paths)
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempdir().unwrap();
        write_frames(dir.path(), 3, 2, 2);
        fs::write(dir.path().join("rule_info.txt"), "Rule: X\n").unwrap();
        fs::write(dir.path().join("gen_000009.txt"), "").unwrap();
        fs::create_dir(dir.path().join("gen_000010.bin")).unwrap();

        let paths = discover_snapshots(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["gen_000000.bin", "gen_000001.bin", "gen_000002.bin"]
        );
    }

    #[test]
    fn test_parallel_preserves_order() {
        let (_dir, paths) = frame_dir(40);
        let loader = FrameLoader::with_workers(8);

        let parallel = loader.load(&paths).unwrap();
        let sequential = loader.load_sequential(&paths).unwrap();

        assert_eq!(parallel.len(), 40);
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.dimensions(), Some((6, 4)));
    }

    #[test]
    fn test_empty_input() {
        let loaded = FrameLoader::new().load(&[]).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimensions(), None);
        assert_eq!(loaded.max_state(), 0);
    }

    #[test]
    fn test_worker_count_bounds() {
        let loader = FrameLoader::with_workers(8);
        assert_eq!(loader.worker_count(3), 3);
        assert_eq!(loader.worker_count(100), 8);
        assert_eq!(loader.worker_count(0), 1);
    }

    #[test]
    fn test_corrupt_snapshot_aborts() {
        let (_dir, paths) = frame_dir(10);
        let bytes = fs::read(&paths[5]).unwrap();
        fs::write(&paths[5], &bytes[..bytes.len() - 3]).unwrap();

        let err = FrameLoader::with_workers(4).load(&paths).unwrap_err();
        match err {
            LoadError::Corrupt { index, source, .. } => {
                assert_eq!(index, 5);
                assert!(matches!(source, SnapshotError::TruncatedPayload { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inconsistent_dimensions() {
        let dir = tempdir().unwrap();
        let mut paths = write_frames(dir.path(), 3, 4, 4);
        let odd = Snapshot::new(2, 8, vec![0; 16]).unwrap();
        let odd_path = dir.path().join("gen_000003.bin");
        fs::write(&odd_path, odd.to_bytes()).unwrap();
        paths.push(odd_path);

        let err = FrameLoader::new().load(&paths).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InconsistentDimensions { index: 3, .. }
        ));
    }

    #[test]
    fn test_max_state_and_truncate() {
        let (_dir, paths) = frame_dir(5);
        let mut frames = FrameLoader::new().load(&paths).unwrap();
        // 23 * 7 + 4 * 13
        assert_eq!(frames.max_state(), 213);

        frames.truncate(2);
        assert_eq!(frames.len(), 2);
        frames.truncate(10);
        assert_eq!(frames.len(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_parallel_matches_sequential(count in 0usize..24, workers in 1usize..6) {
            let (_dir, paths) = frame_dir(count);
            let loader = FrameLoader::with_workers(workers);
            let parallel = loader.load(&paths).unwrap();
            let sequential = loader.load_sequential(&paths).unwrap();
            prop_assert_eq!(parallel.len(), count);
            prop_assert_eq!(parallel, sequential);
        }
    }
}
