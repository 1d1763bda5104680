//! Recording kinds, sample shapes, and task status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a recording file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Microscope movie timed by the acquisition device's own clock.
    Movie,
    /// Movie timed by an external device clock (behaves like GPIO on disk).
    ExternallyClockedMovie,
    /// Digital/analog IO channel log.
    Gpio,
    /// Per-cell activity traces derived from a movie.
    CellSet,
    /// Per-vessel diameter traces.
    VesselSet,
    /// Discrete event log per channel.
    EventSet,
}

impl DataKind {
    /// Kinds whose wall-clock start is trusted as synchronization ground
    /// truth.
    pub fn can_reference(&self) -> bool {
        matches!(
            self,
            DataKind::Gpio | DataKind::Movie | DataKind::ExternallyClockedMovie
        )
    }

    /// Kinds whose wall-clock start may be corrected.
    pub fn can_target(&self) -> bool {
        matches!(self, DataKind::Movie | DataKind::ExternallyClockedMovie)
    }

    /// Kinds whose first hardware tick is stored directly in the header
    /// instead of alongside each frame.
    pub fn uses_first_tsc(&self) -> bool {
        matches!(self, DataKind::Gpio)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Movie => "movie",
            DataKind::ExternallyClockedMovie => "externally-clocked movie",
            DataKind::Gpio => "gpio",
            DataKind::CellSet => "cell set",
            DataKind::VesselSet => "vessel set",
            DataKind::EventSet => "event set",
        };
        f.write_str(name)
    }
}

/// Pixel/channel grid shape of one sample.
///
/// Movies use rows x cols; trace-like kinds use 1 x channel width. Series
/// composition requires an exact match between segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacingInfo {
    pub rows: u32,
    pub cols: u32,
}

impl SpacingInfo {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }
}

impl fmt::Display for SpacingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// On-disk sample element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    U8,
    U16,
    F32,
}

/// Completion status of an asynchronous task, consumed as given from the
/// task-dispatch runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Complete,
    Cancelled,
    Error,
}
