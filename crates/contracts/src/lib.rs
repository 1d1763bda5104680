//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-crate data structures
//! and traits. All business crates can only depend on this crate, reverse
//! dependencies are prohibited.
//!
//! ## Time Model
//! - Sample steps are exact rationals (`Ratio`), never floats
//! - Wall-clock instants (`Time`) are rational seconds since the Unix
//!   epoch; persisted headers store epoch milliseconds
//! - Hardware device ticks (TSC) are free-running microsecond counters,
//!   `u64`, reconciled against wall time by `clock_sync`

mod channel_id;
mod error;
mod kind;
mod segment;
mod sync;
mod time;
mod timing;

pub use channel_id::ChannelId;
pub use error::{series_rule, RecordingError};
pub use kind::{DataKind, DataType, SpacingInfo, TaskStatus};
pub use segment::{FrameData, LocalSegment, Segment};
pub use sync::{
    GpioProperties, MovieTimestamps, RecordingRef, SyncReport, SyncRequest, TargetOutcome,
};
pub use time::{Ratio, Time};
pub use timing::{IndexRange, TemporalIndex};
