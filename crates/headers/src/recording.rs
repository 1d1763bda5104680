//! Loaded recording: a header bound to its decoded time base.
//!
//! This is the object the clock synchronizer sees, through the
//! `MovieTimestamps` / `GpioProperties` contract traits. Raw device packet
//! bytes never cross this boundary; by the time a recording is loaded, the
//! timestamps are plain (storage index, tick) tuples.

use std::path::{Path, PathBuf};

use contracts::{
    DataKind, GpioProperties, MovieTimestamps, RecordingError, TemporalIndex,
};

use crate::model::RecordingHeader;
use crate::store::load_header;

/// A recording header plus its validated, in-memory time base.
#[derive(Debug, Clone)]
pub struct LoadedRecording {
    path: PathBuf,
    header: RecordingHeader,
    timing: TemporalIndex,
}

impl LoadedRecording {
    /// Load and validate a recording from disk.
    ///
    /// # Errors
    /// IO and data-format errors from header loading.
    pub fn load(path: &Path) -> Result<Self, RecordingError> {
        let header = load_header(path)?;
        let timing = header.timing.to_temporal_index()?;
        Ok(Self {
            path: path.to_path_buf(),
            header,
            timing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DataKind {
        self.header.kind
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }
}

impl MovieTimestamps for LoadedRecording {
    fn timing_info(&self) -> &TemporalIndex {
        &self.timing
    }

    fn has_frame_timestamps(&self) -> bool {
        self.header.frame_timestamps.is_some()
    }

    fn frame_timestamp(&self, storage_index: usize) -> Result<u64, RecordingError> {
        let ticks = self.header.frame_timestamps.as_deref().ok_or_else(|| {
            RecordingError::data_format_at(&self.path, "recording carries no frame timestamps")
        })?;
        ticks.get(storage_index).copied().ok_or_else(|| {
            RecordingError::data_format_at(
                &self.path,
                format!("no timestamp stored for frame {storage_index}"),
            )
        })
    }
}

impl GpioProperties for LoadedRecording {
    fn first_tsc(&self) -> Option<u64> {
        self.header.first_tsc
    }
}
