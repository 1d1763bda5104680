//! TemporalIndex - a single segment's time base.
//!
//! One recording segment is a regular grid of samples: a start instant, an
//! exact rational step, and a sample count. Three independent exclusion
//! mechanisms carve samples out of the logical timeline:
//!
//! - **dropped**: expected but never recorded; storage indices compact
//!   around them.
//! - **cropped**: recorded but excluded from playback; still occupy
//!   storage. Stored as canonical inclusive ranges.
//! - **blank**: present but synthetic filler, not acquired data.
//!
//! Exclusion is boolean per index: an index excluded by several mechanisms
//! at once still counts as one invalid sample.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RecordingError;
use crate::time::{Ratio, Time};

/// Inclusive index range `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub first: usize,
    pub last: usize,
}

impl IndexRange {
    /// Create a range; fails if `first > last`.
    pub fn new(first: usize, last: usize) -> Result<Self, RecordingError> {
        if first > last {
            return Err(RecordingError::data_format(format!(
                "malformed cropped range: start {first} > end {last}"
            )));
        }
        Ok(Self { first, last })
    }

    pub fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Immutable time base for one segment.
///
/// Construction canonicalizes the cropped ranges and validates every
/// exclusion index against `sample_count`; after that the value never
/// changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalIndex {
    start: Time,
    /// Seconds per sample. `Ratio::ZERO` is the gapless-aggregate sentinel:
    /// only counts are meaningful, not elapsed time.
    step: Ratio,
    sample_count: usize,
    dropped: BTreeSet<usize>,
    cropped: Vec<IndexRange>,
    blank: BTreeSet<usize>,
}

impl TemporalIndex {
    /// Time base without exclusions.
    pub fn new(start: Time, step: Ratio, sample_count: usize) -> Self {
        Self {
            start,
            step,
            sample_count,
            dropped: BTreeSet::new(),
            cropped: Vec::new(),
            blank: BTreeSet::new(),
        }
    }

    /// Time base with exclusion sets.
    ///
    /// # Errors
    /// `RecordingError::DataFormat` if any range is malformed or any index
    /// lies at or beyond `sample_count`.
    pub fn with_exclusions(
        start: Time,
        step: Ratio,
        sample_count: usize,
        dropped: impl IntoIterator<Item = usize>,
        cropped: Vec<IndexRange>,
        blank: impl IntoIterator<Item = usize>,
    ) -> Result<Self, RecordingError> {
        let dropped: BTreeSet<usize> = dropped.into_iter().collect();
        let blank: BTreeSet<usize> = blank.into_iter().collect();

        for &i in dropped.iter().chain(blank.iter()) {
            if i >= sample_count {
                return Err(RecordingError::data_format(format!(
                    "exclusion index {i} out of range for {sample_count} samples"
                )));
            }
        }
        for range in &cropped {
            if range.first > range.last {
                return Err(RecordingError::data_format(format!(
                    "malformed cropped range: start {} > end {}",
                    range.first, range.last
                )));
            }
            if range.last >= sample_count {
                return Err(RecordingError::data_format(format!(
                    "cropped range {}..={} out of range for {sample_count} samples",
                    range.first, range.last
                )));
            }
        }

        Ok(Self {
            start,
            step,
            sample_count,
            dropped,
            cropped: canonicalize(cropped),
            blank,
        })
    }

    /// Synthesized aggregate for a multi-segment series: per-segment gaps
    /// make a single step meaningless, so the step is the zero sentinel and
    /// only `sample_count` carries information.
    pub fn gapless(start: Time, sample_count: usize) -> Self {
        Self::new(start, Ratio::ZERO, sample_count)
    }

    pub fn start(&self) -> Time {
        self.start
    }

    pub fn step(&self) -> Ratio {
        self.step
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Canonical cropped ranges: ascending, disjoint, non-adjacent.
    pub fn cropped_ranges(&self) -> &[IndexRange] {
        &self.cropped
    }

    pub fn dropped_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.dropped.iter().copied()
    }

    pub fn blank_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.blank.iter().copied()
    }

    /// Start time of sample `i`; extrapolates past `sample_count`.
    /// With zero samples, this is the segment start.
    pub fn index_to_start_time(&self, index: usize) -> Time {
        if self.sample_count == 0 {
            return self.start;
        }
        self.start + self.step.mul_int(index as i64)
    }

    /// Midpoint time of sample `i`: `start + step * (i + 1/2)`.
    pub fn index_to_mid_time(&self, index: usize) -> Time {
        if self.sample_count == 0 {
            return self.start;
        }
        self.start + self.step.mul_int(index as i64) + self.step * Ratio::HALF
    }

    /// Inverse mapping, clamped into `[0, sample_count - 1]`.
    ///
    /// Rounds to the nearest sample boundary; a time exactly half a step
    /// from both neighbors maps to the earlier index.
    pub fn time_to_index(&self, time: Time) -> usize {
        if self.sample_count == 0 || self.step.is_zero() {
            return 0;
        }
        let offset = time - self.start;
        let raw = offset.div(self.step).round_half_down_i64();
        raw.clamp(0, self.sample_count as i64 - 1) as usize
    }

    pub fn is_dropped(&self, index: usize) -> bool {
        self.dropped.contains(&index)
    }

    pub fn is_cropped(&self, index: usize) -> bool {
        // Canonical ordering admits a binary search on range starts.
        match self.cropped.partition_point(|r| r.first <= index) {
            0 => false,
            n => self.cropped[n - 1].contains(index),
        }
    }

    pub fn is_blank(&self, index: usize) -> bool {
        self.blank.contains(&index)
    }

    /// True iff `index` is in range and excluded by no mechanism.
    pub fn is_index_valid(&self, index: usize) -> bool {
        index < self.sample_count
            && !self.is_dropped(index)
            && !self.is_cropped(index)
            && !self.is_blank(index)
    }

    /// First in-range index that is excluded by no mechanism.
    pub fn first_valid_index(&self) -> Option<usize> {
        (0..self.sample_count).find(|&i| self.is_index_valid(i))
    }

    /// Physical storage index of logical sample `index`: dropped samples
    /// occupy no storage, so every dropped index before `index` shifts it
    /// down by one. `None` for a dropped `index` itself.
    pub fn recorded_index(&self, index: usize) -> Option<usize> {
        if self.dropped.contains(&index) {
            return None;
        }
        Some(index - self.dropped.range(..index).count())
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Number of indices covered by cropped ranges.
    pub fn cropped_count(&self) -> usize {
        self.cropped.iter().map(IndexRange::len).sum()
    }

    pub fn blank_count(&self) -> usize {
        self.blank.len()
    }

    /// Count of valid samples. Exclusion is boolean per index: an index
    /// that is simultaneously dropped and cropped is subtracted once.
    pub fn valid_count(&self) -> usize {
        let point_excluded: BTreeSet<usize> = self
            .dropped
            .iter()
            .chain(self.blank.iter())
            .copied()
            .collect();
        let mut excluded = point_excluded.len();
        for range in &self.cropped {
            let already = point_excluded.range(range.first..=range.last).count();
            excluded += range.len() - already;
        }
        self.sample_count - excluded
    }

    /// Total spanned duration: `step * sample_count`.
    pub fn duration(&self) -> Ratio {
        self.step.mul_int(self.sample_count as i64)
    }

    /// End of the last sample's slot: `start + duration`.
    pub fn end(&self) -> Time {
        self.start + self.duration()
    }
}

/// Merge overlapping and touching ranges into the minimal equivalent set,
/// ascending by start index. Touching means `last + 1 == next.first`.
fn canonicalize(mut ranges: Vec<IndexRange>) -> Vec<IndexRange> {
    if ranges.is_empty() {
        return ranges;
    }
    ranges.sort_by_key(|r| r.first);
    let mut merged: Vec<IndexRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(prev) if range.first <= prev.last.saturating_add(1) => {
                prev.last = prev.last.max(range.last);
            }
            _ => merged.push(range),
        }
    }
    merged
}
