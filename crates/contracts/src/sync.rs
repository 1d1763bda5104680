//! Start-time synchronization contracts.
//!
//! One recording (the reference) has a trusted wall-clock start; targets on
//! other devices get theirs corrected from hardware-tick deltas. The
//! request is transient, the report is the durable outcome record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{DataKind, RecordingError, TaskStatus, TemporalIndex};

/// One recording named by path + kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingRef {
    pub path: PathBuf,
    pub kind: DataKind,
}

impl RecordingRef {
    pub fn new(path: impl Into<PathBuf>, kind: DataKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Transient input of one synchronization call; never persisted.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Ground-truth recording; its wall-clock start is trusted.
    pub reference: RecordingRef,
    /// Recordings whose wall-clock start gets corrected.
    pub targets: Vec<RecordingRef>,
}

/// Per-target outcome of a synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub path: PathBuf,
    /// Expected wall-clock start in epoch milliseconds.
    pub expected_start_ms: i64,
    /// Stored wall-clock start before the run.
    pub actual_start_ms: i64,
    /// Whether the header was rewritten (false when already correct).
    pub patched: bool,
    /// Per-target failure; other targets still proceed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of one synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub status: TaskStatus,
    pub outcomes: Vec<TargetOutcome>,
}

impl SyncReport {
    pub fn patched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.patched).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// Movie-like recording, as seen by the clock synchronizer.
///
/// Frame timestamps are hardware ticks (microseconds on a free-running
/// device counter) sampled alongside each stored frame, addressed by
/// storage index.
pub trait MovieTimestamps {
    fn timing_info(&self) -> &TemporalIndex;

    fn has_frame_timestamps(&self) -> bool;

    /// Device tick of the frame at `storage_index`.
    ///
    /// # Errors
    /// `RecordingError::DataFormat` when the index has no stored timestamp.
    fn frame_timestamp(&self, storage_index: usize) -> Result<u64, RecordingError>;
}

/// GPIO-like recording, as seen by the clock synchronizer.
///
/// GPIO headers carry the device tick of the very first packet directly,
/// so no extrapolation is ever needed for a GPIO reference.
pub trait GpioProperties {
    fn first_tsc(&self) -> Option<u64>;
}
