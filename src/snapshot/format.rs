//! Binary layout of a single generation snapshot.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Size of the snapshot header: width (i32) + height (i32).
pub const HEADER_SIZE: usize = 8;

/// One generation's grid of cell states, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Snapshot {
    /// Build a snapshot from row-major cells.
    ///
    /// Returns `None` if `cells.len() != width * height`.
    pub fn new(width: usize, height: usize, cells: Vec<u8>) -> Option<Self> {
        (width.checked_mul(height)? == cells.len()).then_some(Self {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height).
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Row-major cell states.
    #[inline]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// State at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[y * self.width + x]
    }

    /// Highest state value in the grid (0 for an empty grid).
    pub fn max_state(&self) -> u8 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Number of cells whose state is exactly 1.
    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == 1).count()
    }

    /// Write the snapshot in its binary layout.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let width = i32::try_from(self.width)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "width exceeds i32"))?;
        let height = i32::try_from(self.height)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "height exceeds i32"))?;
        w.write_all(&width.to_le_bytes())?;
        w.write_all(&height.to_le_bytes())?;
        w.write_all(&self.cells)?;
        Ok(())
    }

    /// Encode to a byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.cells.len());
        // Writing to a Vec cannot fail; dimensions came from a valid snapshot.
        let _ = self.write_to(&mut bytes);
        bytes
    }
}

/// Snapshot decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Snapshot header is truncated ({len} bytes, need 8)")]
    TruncatedHeader { len: usize },
    #[error("Snapshot dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("Snapshot payload is truncated ({actual} bytes, expected {expected})")]
    TruncatedPayload { expected: usize, actual: usize },
    #[error("Snapshot has {extra} trailing bytes after the {expected}-byte payload")]
    TrailingBytes { expected: usize, extra: usize },
}

/// Decode a snapshot from its complete binary contents.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, SnapshotError> {
    if bytes.len() < HEADER_SIZE {
        return Err(SnapshotError::TruncatedHeader { len: bytes.len() });
    }

    let width = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let height = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if width <= 0 || height <= 0 {
        return Err(SnapshotError::InvalidDimensions { width, height });
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .ok_or(SnapshotError::InvalidDimensions { width, height })?;
    let payload = &bytes[HEADER_SIZE..];

    if payload.len() < expected {
        return Err(SnapshotError::TruncatedPayload {
            expected,
            actual: payload.len(),
        });
    }
    if payload.len() > expected {
        return Err(SnapshotError::TrailingBytes {
            expected,
            extra: payload.len() - expected,
        });
    }

    Ok(Snapshot {
        width: width as usize,
        height: height as usize,
        cells: payload.to_vec(),
    })
}

/// Read and decode the snapshot file at `path`.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let bytes = fs::read(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_snapshot(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(width: i32, height: i32, cells: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(cells);
        bytes
    }

    #[test]
    fn test_decode_row_major() {
        // 3 wide, 2 tall
        let bytes = raw(3, 2, &[0, 1, 2, 3, 4, 5]);
        let snap = decode_snapshot(&bytes).unwrap();

        assert_eq!(snap.dimensions(), (3, 2));
        assert_eq!(snap.get(0, 0), 0);
        assert_eq!(snap.get(2, 0), 2);
        assert_eq!(snap.get(0, 1), 3);
        assert_eq!(snap.get(2, 1), 5);
        assert_eq!(snap.max_state(), 5);
        assert_eq!(snap.alive_count(), 1);
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_snapshot(&[1, 0, 0]),
            Err(SnapshotError::TruncatedHeader { len: 3 })
        ));

        let bytes = raw(4, 4, &[0; 10]);
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(SnapshotError::TruncatedPayload {
                expected: 16,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_decode_trailing_and_invalid() {
        let bytes = raw(2, 2, &[0; 5]);
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(SnapshotError::TrailingBytes { extra: 1, .. })
        ));

        let bytes = raw(-2, 2, &[0; 4]);
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(SnapshotError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_snapshot(Path::new("/nonexistent/gen_000000.bin")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    proptest! {
        #[test]
        fn prop_decode_yields_w_times_h(
            (width, height, cells) in (1usize..24, 1usize..24).prop_flat_map(|(w, h)| {
                (Just(w), Just(h), proptest::collection::vec(any::<u8>(), w * h))
            })
        ) {
            let bytes = raw(width as i32, height as i32, &cells);
            let snap = decode_snapshot(&bytes).unwrap();
            prop_assert_eq!(snap.cells().len(), width * height);
            prop_assert_eq!(snap.cells(), &cells[..]);
            prop_assert_eq!(snap.to_bytes(), bytes);
        }
    }
}
