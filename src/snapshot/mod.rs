//! Generation snapshots produced by the simulator.
//!
//! # File Format
//!
//! One file per generation, named `gen_NNNNNN.bin`:
//!
//! ```text
//! Width: i32 (little-endian)
//! Height: i32 (little-endian)
//! Cells: width * height bytes, row-major, one state per cell
//! ```
//!
//! A file whose length differs from `8 + width * height` is corrupt.

mod format;
mod loader;

pub use format::{HEADER_SIZE, Snapshot, SnapshotError, decode_snapshot, read_snapshot};
pub use loader::{
    FrameLoader, FrameSequence, LoadError, SNAPSHOT_EXTENSION, SNAPSHOT_PREFIX,
    discover_snapshots,
};
