//! Seeded color scheme selection with day-to-day anti-repeat.
//!
//! Each day's scheme is drawn from a generator seeded with that day's seed.
//! For `YYYYMMDD` seeds, a draw that matches the previous day's final
//! scheme is advanced by one catalog slot, so consecutive dates never
//! share a scheme. Every per-day draw uses its own freshly seeded
//! generator, so no generator state is shared between days.

use chrono::{Datelike, NaiveDate};
use rand::prelude::*;

use crate::schema::{COLOR_SCHEMES, ColorScheme};

/// A seed that encodes a calendar date as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeedDate(NaiveDate);

impl SeedDate {
    /// Decode an 8-digit `YYYYMMDD` seed. Anything else is not a date.
    pub fn from_seed(seed: i64) -> Option<Self> {
        if !(10_000_000..=99_999_999).contains(&seed) {
            return None;
        }
        let year = (seed / 10_000) as i32;
        let month = ((seed / 100) % 100) as u32;
        let day = (seed % 100) as u32;
        NaiveDate::from_ymd_opt(year, month, day).map(SeedDate)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The `YYYYMMDD` seed for this date.
    pub fn seed(&self) -> i64 {
        self.0.year() as i64 * 10_000 + self.0.month() as i64 * 100 + self.0.day() as i64
    }

    /// The previous calendar day, if it still encodes as 8 digits.
    pub fn previous(&self) -> Option<Self> {
        self.0
            .pred_opt()
            .map(SeedDate)
            .filter(|d| Self::from_seed(d.seed()).is_some())
    }

    /// The next calendar day, if it still encodes as 8 digits.
    pub fn next(&self) -> Option<Self> {
        self.0
            .succ_opt()
            .map(SeedDate)
            .filter(|d| Self::from_seed(d.seed()).is_some())
    }

    /// Label such as `01 January 2025`.
    pub fn label(&self) -> String {
        self.0.format("%d %B %Y").to_string()
    }
}

/// Outcome of a selection.
#[derive(Debug, Clone)]
pub struct ColorSelection {
    /// Catalog index of the chosen scheme.
    pub index: usize,
    /// The chosen scheme.
    pub scheme: ColorScheme,
    /// Index before the anti-repeat adjustment.
    pub raw_index: usize,
    /// Generator for downstream draws. Freshly seeded with the job seed
    /// (or from entropy when there is none), unaffected by the per-day draws.
    pub rng: StdRng,
}

impl ColorSelection {
    /// True if the draw was advanced to avoid repeating yesterday's scheme.
    pub fn was_adjusted(&self) -> bool {
        self.index != self.raw_index
    }
}

/// Picks a [`ColorScheme`] from a catalog.
#[derive(Debug, Clone, Copy)]
pub struct ColorSchemeSelector<'a> {
    catalog: &'a [ColorScheme],
}

impl Default for ColorSchemeSelector<'static> {
    fn default() -> Self {
        Self {
            catalog: &COLOR_SCHEMES,
        }
    }
}

impl<'a> ColorSchemeSelector<'a> {
    /// Selector over a custom catalog.
    ///
    /// Returns `None` for an empty catalog.
    pub fn with_catalog(catalog: &'a [ColorScheme]) -> Option<Self> {
        (!catalog.is_empty()).then_some(Self { catalog })
    }

    pub fn catalog(&self) -> &'a [ColorScheme] {
        self.catalog
    }

    /// Choose a scheme for `seed`.
    ///
    /// Without a seed the draw comes from entropy. With a non-date seed the
    /// draw is a pure function of the seed. With a `YYYYMMDD` seed the draw
    /// also avoids the previous day's scheme.
    pub fn select(&self, seed: Option<i64>) -> ColorSelection {
        let Some(seed) = seed else {
            let mut rng = StdRng::from_entropy();
            let index = rng.gen_range(0..self.catalog.len());
            return ColorSelection {
                index,
                scheme: self.catalog[index],
                raw_index: index,
                rng,
            };
        };

        let raw_index = self.raw_index(seed);
        let index = match SeedDate::from_seed(seed) {
            Some(date) => self.index_for_date(date),
            None => raw_index,
        };

        ColorSelection {
            index,
            scheme: self.catalog[index],
            raw_index,
            rng: seeded_rng(seed),
        }
    }

    /// Index drawn by a generator freshly seeded with `seed`.
    pub fn raw_index(&self, seed: i64) -> usize {
        seeded_rng(seed).gen_range(0..self.catalog.len())
    }

    /// Final index for a date, after the anti-repeat rule.
    ///
    /// The chain starts at the earliest 8-digit date (`10000101`), whose
    /// final index is its raw draw; every later day is `avoid(raw, final
    /// of the day before)`. A day whose raw draw is neither the previous
    /// day's raw draw nor the one after it has a final index that does
    /// not depend on history, so the chain only needs to be replayed from
    /// the nearest such day.
    pub fn index_for_date(&self, date: SeedDate) -> usize {
        let len = self.catalog.len();
        match len {
            1 => return 0,
            // Every day shifts off its predecessor: the chain alternates.
            2 => {
                let first = earliest_date();
                let days = (date.date() - first.date()).num_days().unsigned_abs() as usize;
                return (self.raw_index(first.seed()) + days) % 2;
            }
            _ => {}
        }

        // Raw draws from `date` backwards to the chain's restart point.
        let mut raw = self.raw_index(date.seed());
        let mut raws = vec![raw];
        let mut day = date;
        while let Some(prev) = day.previous() {
            let prev_raw = self.raw_index(prev.seed());
            if raw != prev_raw && raw != (prev_raw + 1) % len {
                break;
            }
            raws.push(prev_raw);
            raw = prev_raw;
            day = prev;
        }

        let mut replay = raws.into_iter().rev();
        let start = replay.next().unwrap_or(0);
        replay.fold(start, |previous, raw| self.avoid(raw, previous))
    }

    #[inline]
    fn avoid(&self, index: usize, previous: usize) -> usize {
        if index == previous {
            (index + 1) % self.catalog.len()
        } else {
            index
        }
    }
}

/// First date that still encodes as an 8-digit seed.
fn earliest_date() -> SeedDate {
    SeedDate(NaiveDate::from_ymd_opt(1000, 1, 1).unwrap_or(NaiveDate::MIN))
}

/// Generator seeded from the seed's two's-complement bits.
pub fn seeded_rng(seed: i64) -> StdRng {
    StdRng::seed_from_u64(seed as u64)
}
