//! Series composition: many recording segments, one logical timeline.
//!
//! `SegmentCollection` owns segments sorted by start time, validates them
//! pairwise, exposes a gapless aggregate time base, and fans reads out
//! concurrently across segments with offset-addressed reassembly.

mod collection;
mod fanout;
mod mock;

pub use collection::{SegmentCollection, SegmentLocation};
pub use mock::MockSegment;
