//! Header-backed segment.
//!
//! Adapts an on-disk recording header to the `Segment` trait so series
//! validation can run over real files. Trace-like kinds carry their sample
//! arrays in the header body; movie pixel payloads live past the header
//! and are not readable through this adapter.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::warn;

use contracts::{
    ChannelId, DataKind, DataType, FrameData, RecordingError, Segment, SpacingInfo, TemporalIndex,
};
use headers::{save_header, RecordingHeader};

pub struct HeaderSegment {
    path: PathBuf,
    header: RecordingHeader,
    timing: TemporalIndex,
    /// Per-sample activity, logical order; not persisted in the header, so
    /// it starts from timing validity and lives in memory only.
    activity: Vec<bool>,
    dirty: bool,
    closed: bool,
}

impl HeaderSegment {
    /// Load and validate a recording file.
    ///
    /// # Errors
    /// IO and data-format errors from header loading.
    pub fn load(path: &Path) -> Result<Self, RecordingError> {
        let header = headers::load_header(path)?;
        header.validate()?;
        let timing = header.timing.to_temporal_index()?;
        let activity = (0..timing.sample_count())
            .map(|i| timing.is_index_valid(i))
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            header,
            timing,
            activity,
            dirty: false,
            closed: false,
        })
    }

    pub fn kind(&self) -> DataKind {
        self.header.kind
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    fn has_traces(&self) -> bool {
        !self.header.traces.is_empty()
    }
}

impl Segment for HeaderSegment {
    fn temporal_index(&self) -> &TemporalIndex {
        &self.timing
    }

    fn spacing(&self) -> &SpacingInfo {
        &self.header.spacing
    }

    fn data_type(&self) -> DataType {
        self.header.data_type
    }

    fn channel_count(&self) -> usize {
        self.header.channel_count
    }

    fn file_path(&self) -> &Path {
        &self.path
    }

    async fn read_channel(&self, channel: usize) -> Result<Vec<f32>, RecordingError> {
        if !self.has_traces() {
            return Err(RecordingError::data_format_at(
                &self.path,
                format!("{} header carries no trace data", self.header.kind),
            ));
        }
        let stored = self.header.traces.get(channel).ok_or_else(|| {
            RecordingError::data_format_at(&self.path, format!("no such channel {channel}"))
        })?;

        // Logical order: dropped samples occupy no storage slot and read
        // back as zero.
        let trace = (0..self.timing.sample_count())
            .map(|i| {
                self.timing
                    .recorded_index(i)
                    .and_then(|s| stored.get(s).copied())
                    .unwrap_or(0.0)
            })
            .collect();
        Ok(trace)
    }

    async fn read_frame(&self, index: usize) -> Result<FrameData, RecordingError> {
        if !self.has_traces() {
            return Err(RecordingError::data_format_at(
                &self.path,
                "pixel data lives outside the header and is decoded elsewhere",
            ));
        }
        let storage = self.timing.recorded_index(index);
        let mut data = Vec::with_capacity(self.header.channel_count * 4);
        for trace in &self.header.traces {
            let value = storage.and_then(|s| trace.get(s).copied()).unwrap_or(0.0);
            data.extend_from_slice(&value.to_le_bytes());
        }
        Ok(FrameData {
            spacing: self.header.spacing,
            data_type: self.header.data_type,
            data: Bytes::from(data),
        })
    }

    fn channel_status(&self, channel: usize) -> bool {
        self.header
            .channel_activity
            .get(channel)
            .copied()
            .unwrap_or(true)
    }

    fn set_channel_status(&mut self, channel: usize, accepted: bool) {
        if self.header.channel_activity.is_empty() {
            self.header.channel_activity = vec![true; self.header.channel_count];
        }
        if let Some(flag) = self.header.channel_activity.get_mut(channel) {
            *flag = accepted;
            self.dirty = true;
        }
    }

    fn set_channel_name(&mut self, channel: usize, name: ChannelId) {
        if self.header.channel_names.is_empty() {
            self.header.channel_names = (0..self.header.channel_count)
                .map(|c| ChannelId::from(format!("C{c:03}")))
                .collect();
        }
        if let Some(slot) = self.header.channel_names.get_mut(channel) {
            *slot = name;
            self.dirty = true;
        }
    }

    fn channel_color(&self, channel: usize) -> u32 {
        self.header
            .channel_colors
            .get(channel)
            .copied()
            .unwrap_or(0x00ff_ffff)
    }

    fn set_channel_color(&mut self, channel: usize, color: u32) {
        if self.header.channel_colors.is_empty() {
            self.header.channel_colors = vec![0x00ff_ffff; self.header.channel_count];
        }
        if let Some(slot) = self.header.channel_colors.get_mut(channel) {
            *slot = color;
            self.dirty = true;
        }
    }

    fn activity_vector(&self) -> Vec<bool> {
        self.activity.clone()
    }

    fn set_activity_vector(&mut self, samples: &[bool]) {
        let fill = samples.last().copied().unwrap_or(true);
        let mut samples = samples.to_vec();
        samples.resize(self.timing.sample_count(), fill);
        samples.truncate(self.timing.sample_count());
        self.activity = samples;
    }

    fn cancel_pending_reads(&self) {
        // Header reads resolve inline; nothing is ever pending.
    }

    fn close_for_writing(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.dirty {
            return;
        }
        if let Err(e) = save_header(&self.path, &self.header) {
            warn!(path = %self.path.display(), error = %e, "failed to persist header on close");
        }
    }
}
