//! Frame progress reporting.

use std::time::Instant;

/// Logs `Processing frame i/N` every `interval` frames.
///
/// Each frame index is reported at most once, even if the same frame is
/// observed repeatedly.
#[derive(Debug)]
pub struct ProgressReporter {
    interval: usize,
    total: usize,
    last_reported: Option<usize>,
    reported: usize,
    started: Instant,
}

impl ProgressReporter {
    /// Reporter for `total` frames; an `interval` of 0 is treated as 1.
    pub fn new(total: usize, interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            total,
            last_reported: None,
            reported: 0,
            started: Instant::now(),
        }
    }

    /// Note that `frame` is being rendered. Returns true if it was reported.
    pub fn observe(&mut self, frame: usize) -> bool {
        if frame % self.interval != 0 || self.last_reported == Some(frame) {
            return false;
        }
        self.last_reported = Some(frame);
        self.reported += 1;
        log::info!(
            "Processing frame {}/{} ({:.1}s elapsed)",
            frame,
            self.total,
            self.started.elapsed().as_secs_f64()
        );
        true
    }

    /// Number of progress lines emitted so far.
    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
