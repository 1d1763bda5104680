//! Mock segment
//!
//! In-memory `Segment` implementation for tests without real recording
//! files on disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use contracts::{
    ChannelId, DataType, FrameData, RecordingError, Ratio, Segment, SpacingInfo, TemporalIndex,
    Time,
};

/// In-memory segment with configurable failure and latency injection.
pub struct MockSegment {
    path: PathBuf,
    timing: TemporalIndex,
    spacing: SpacingInfo,
    data_type: DataType,
    channel_count: usize,
    names: Vec<ChannelId>,
    status: Vec<bool>,
    colors: Vec<u32>,
    activity: Vec<bool>,
    traces: Vec<Vec<f32>>,
    fail_reads: bool,
    read_delay: Option<Duration>,
    read_counter: Option<Arc<AtomicUsize>>,
    cancel_calls: AtomicUsize,
    closed: bool,
}

impl MockSegment {
    /// Movie-shaped segment: `spacing` pixel grid, u16 samples, 1 channel.
    pub fn movie(
        path: &str,
        start: Time,
        step: Ratio,
        sample_count: usize,
        spacing: SpacingInfo,
    ) -> Self {
        Self::build(
            path,
            TemporalIndex::new(start, step, sample_count),
            spacing,
            DataType::U16,
            1,
        )
    }

    /// Cell-set-shaped segment: one f32 trace per cell.
    pub fn cell_set(
        path: &str,
        start: Time,
        step: Ratio,
        sample_count: usize,
        cells: usize,
    ) -> Self {
        Self::build(
            path,
            TemporalIndex::new(start, step, sample_count),
            SpacingInfo::new(1, cells as u32),
            DataType::F32,
            cells,
        )
    }

    fn build(
        path: &str,
        timing: TemporalIndex,
        spacing: SpacingInfo,
        data_type: DataType,
        channel_count: usize,
    ) -> Self {
        let sample_count = timing.sample_count();
        let traces = (0..channel_count)
            .map(|c| (0..sample_count).map(|i| (c * 100 + i) as f32).collect())
            .collect();
        Self {
            path: PathBuf::from(path),
            timing,
            spacing,
            data_type,
            channel_count,
            names: (0..channel_count)
                .map(|c| ChannelId::from(format!("C{c:03}")))
                .collect(),
            status: vec![true; channel_count],
            colors: vec![0x00ff_ffff; channel_count],
            activity: vec![true; sample_count],
            traces,
            fail_reads: false,
            read_delay: None,
            read_counter: None,
            cancel_calls: AtomicUsize::new(0),
            closed: false,
        }
    }

    /// Replace the default time base (for exclusion-set scenarios).
    pub fn with_timing(mut self, timing: TemporalIndex) -> Self {
        self.activity = vec![true; timing.sample_count()];
        self.traces = (0..self.channel_count)
            .map(|c| {
                (0..timing.sample_count())
                    .map(|i| (c * 100 + i) as f32)
                    .collect()
            })
            .collect();
        self.timing = timing;
        self
    }

    pub fn with_spacing(mut self, spacing: SpacingInfo) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_trace(mut self, channel: usize, samples: Vec<f32>) -> Self {
        self.traces[channel] = samples;
        self
    }

    /// Every read fails (error-latch scenarios).
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Delay every read (completion-ordering scenarios).
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Share a counter incremented on every read actually issued.
    pub fn with_read_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.read_counter = Some(counter);
        self
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn channel_name(&self, channel: usize) -> &ChannelId {
        &self.names[channel]
    }
}

impl Segment for MockSegment {
    fn temporal_index(&self) -> &TemporalIndex {
        &self.timing
    }

    fn spacing(&self) -> &SpacingInfo {
        &self.spacing
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn file_path(&self) -> &Path {
        &self.path
    }

    async fn read_channel(&self, channel: usize) -> Result<Vec<f32>, RecordingError> {
        if let Some(counter) = &self.read_counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads {
            return Err(RecordingError::Other(format!(
                "mock read failure for '{}'",
                self.path.display()
            )));
        }
        Ok(self.traces[channel].clone())
    }

    async fn read_frame(&self, index: usize) -> Result<FrameData, RecordingError> {
        if let Some(counter) = &self.read_counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads {
            return Err(RecordingError::Other(format!(
                "mock read failure for '{}'",
                self.path.display()
            )));
        }
        let pixels = (self.spacing.rows * self.spacing.cols) as usize;
        Ok(FrameData {
            spacing: self.spacing,
            data_type: self.data_type,
            data: Bytes::from(vec![index as u8; pixels]),
        })
    }

    fn channel_status(&self, channel: usize) -> bool {
        self.status[channel]
    }

    fn set_channel_status(&mut self, channel: usize, accepted: bool) {
        self.status[channel] = accepted;
    }

    fn set_channel_name(&mut self, channel: usize, name: ChannelId) {
        self.names[channel] = name;
    }

    fn channel_color(&self, channel: usize) -> u32 {
        self.colors[channel]
    }

    fn set_channel_color(&mut self, channel: usize, color: u32) {
        self.colors[channel] = color;
    }

    fn activity_vector(&self) -> Vec<bool> {
        self.activity.clone()
    }

    fn set_activity_vector(&mut self, samples: &[bool]) {
        // Broadcast vectors may not match this segment's length; resize
        // with the last flag (covers the "set all" case).
        let fill = samples.last().copied().unwrap_or(true);
        let mut samples = samples.to_vec();
        samples.resize(self.timing.sample_count(), fill);
        samples.truncate(self.timing.sample_count());
        self.activity = samples;
    }

    fn cancel_pending_reads(&self) {
        self.cancel_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn close_for_writing(&mut self) {
        self.closed = true;
    }
}
