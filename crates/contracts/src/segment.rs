//! Segment trait - capability surface of one recording file.
//!
//! A segment is one physical file's worth of temporally-contiguous samples.
//! Series composition is generic over this trait, so the validation and
//! index arithmetic exist once, not once per kind (movie / cell set / GPIO
//! set / vessel set / event set).
//!
//! Reads may suspend (disk-backed segments dispatch onto the work queue);
//! everything else is synchronous. Mutating setters exist because per-cell
//! metadata (name, activity) is writable, but sample data never is.

use std::path::Path;

use bytes::Bytes;

use crate::{ChannelId, DataType, RecordingError, SpacingInfo, TemporalIndex};

/// One decoded movie frame, handed out by single-representative reads.
#[derive(Debug, Clone)]
pub struct FrameData {
    pub spacing: SpacingInfo,
    pub data_type: DataType,
    /// Raw sample bytes, row-major; already decoded from the vendor codec.
    pub data: Bytes,
}

/// Capability surface of one recording segment.
///
/// Implementations: `MockSegment` (in-memory, tests), `HeaderSegment`
/// (JSON-header-backed files, CLI).
#[trait_variant::make(Segment: Send)]
pub trait LocalSegment {
    /// This segment's time base.
    fn temporal_index(&self) -> &TemporalIndex;

    /// Sample grid shape; must match across a series.
    fn spacing(&self) -> &SpacingInfo;

    /// On-disk element type; must match across a series.
    fn data_type(&self) -> DataType;

    /// Number of cells / channels / vessels; must match across a series.
    fn channel_count(&self) -> usize;

    /// Path of the backing file, for error reporting.
    fn file_path(&self) -> &Path;

    /// Read the full trace of one channel: `temporal_index().sample_count()`
    /// samples in logical order.
    ///
    /// # Errors
    /// IO or data-format errors from the backing store.
    async fn read_channel(&self, channel: usize) -> Result<Vec<f32>, RecordingError>;

    /// Read one frame by logical index.
    async fn read_frame(&self, index: usize) -> Result<FrameData, RecordingError>;

    /// Per-channel acceptance status. Not time-varying.
    fn channel_status(&self, channel: usize) -> bool;

    /// Accept or reject one channel. Not time-varying, so a series
    /// broadcasts it to every segment identically.
    fn set_channel_status(&mut self, channel: usize, accepted: bool);

    /// Rename one channel. Not time-varying, so a series broadcasts it to
    /// every segment identically.
    fn set_channel_name(&mut self, channel: usize, name: ChannelId);

    /// Display color of one channel, packed `0x00RRGGBB`. Not time-varying.
    fn channel_color(&self, channel: usize) -> u32;

    /// Recolor one channel. Not time-varying, so a series broadcasts it to
    /// every segment identically.
    fn set_channel_color(&mut self, channel: usize, color: u32);

    /// Time-varying per-sample activity flags, logical order, length
    /// `temporal_index().sample_count()`.
    fn activity_vector(&self) -> Vec<bool>;

    /// Overwrite the per-sample activity flags. Implementations adapt a
    /// vector of a different length (the series-level "set all" broadcast
    /// hands every segment the same vector).
    fn set_activity_vector(&mut self, samples: &[bool]);

    /// Cancel reads not yet issued. Idempotent; in-flight reads run to
    /// completion.
    fn cancel_pending_reads(&self);

    /// Flush and drop write access to the backing file.
    fn close_for_writing(&mut self);
}
