//! Typed header model and cross-field validation.

use serde::{Deserialize, Serialize};

use contracts::{
    ChannelId, DataKind, DataType, IndexRange, Ratio, RecordingError, SpacingInfo, TemporalIndex,
    Time,
};

/// At-rest description of a segment's time base.
///
/// Mirrors `TemporalIndex` field for field, but in plain integers so the
/// JSON stays diffable; conversion re-validates and re-canonicalizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingDescriptor {
    /// Wall-clock start, epoch milliseconds.
    pub start_ms: i64,
    /// Sample step numerator (seconds).
    pub step_num: i64,
    /// Sample step denominator.
    pub step_den: i64,
    pub sample_count: usize,
    #[serde(default)]
    pub dropped: Vec<usize>,
    #[serde(default)]
    pub cropped: Vec<IndexRange>,
    #[serde(default)]
    pub blank: Vec<usize>,
}

impl TimingDescriptor {
    /// Descriptor without exclusions.
    pub fn regular(start_ms: i64, step_num: i64, step_den: i64, sample_count: usize) -> Self {
        Self {
            start_ms,
            step_num,
            step_den,
            sample_count,
            dropped: Vec::new(),
            cropped: Vec::new(),
            blank: Vec::new(),
        }
    }

    /// Build the in-memory time base.
    ///
    /// # Errors
    /// `RecordingError::DataFormat` on a zero step denominator, malformed
    /// cropped ranges, or out-of-range exclusion indices.
    pub fn to_temporal_index(&self) -> Result<TemporalIndex, RecordingError> {
        if self.step_den == 0 {
            return Err(RecordingError::data_format(
                "sample step with zero denominator",
            ));
        }
        TemporalIndex::with_exclusions(
            Time::from_millis(self.start_ms),
            Ratio::new(self.step_num, self.step_den),
            self.sample_count,
            self.dropped.iter().copied(),
            self.cropped.clone(),
            self.blank.iter().copied(),
        )
    }
}

impl From<&TemporalIndex> for TimingDescriptor {
    fn from(index: &TemporalIndex) -> Self {
        Self {
            start_ms: index.start().to_millis_floor(),
            step_num: index.step().numerator(),
            step_den: index.step().denominator(),
            sample_count: index.sample_count(),
            dropped: index.dropped_indices().collect(),
            cropped: index.cropped_ranges().to_vec(),
            blank: index.blank_indices().collect(),
        }
    }
}

/// Persisted recording header.
///
/// Sample payloads for trace-like kinds (cell sets, GPIO, vessels, events)
/// ride in the header body as per-channel arrays; movie pixel data lives
/// past the header and is decoded elsewhere (out of scope here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingHeader {
    pub kind: DataKind,
    pub timing: TimingDescriptor,
    pub spacing: SpacingInfo,
    pub data_type: DataType,
    pub channel_count: usize,
    #[serde(default)]
    pub channel_names: Vec<ChannelId>,
    #[serde(default)]
    pub channel_activity: Vec<bool>,
    /// Per-channel display colors, packed `0x00RRGGBB`.
    #[serde(default)]
    pub channel_colors: Vec<u32>,
    /// Device tick of the first packet (GPIO and externally clocked kinds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_tsc: Option<u64>,
    /// Device tick per stored frame (movie kinds), storage order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_timestamps: Option<Vec<u64>>,
    /// Per-channel sample arrays, storage order (dropped samples absent).
    #[serde(default)]
    pub traces: Vec<Vec<f32>>,
    /// Opaque vendor metadata, preserved verbatim.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RecordingHeader {
    /// Cross-field validation; rules the serde derive cannot express.
    ///
    /// # Errors
    /// `RecordingError::DataFormat` naming the first violated rule.
    pub fn validate(&self) -> Result<(), RecordingError> {
        let timing = self.timing.to_temporal_index()?;
        let stored = timing.sample_count() - timing.dropped_count();

        if !self.channel_names.is_empty() && self.channel_names.len() != self.channel_count {
            return Err(RecordingError::data_format(format!(
                "{} channel names for {} channels",
                self.channel_names.len(),
                self.channel_count
            )));
        }
        if !self.channel_activity.is_empty() && self.channel_activity.len() != self.channel_count {
            return Err(RecordingError::data_format(format!(
                "{} activity flags for {} channels",
                self.channel_activity.len(),
                self.channel_count
            )));
        }
        if !self.channel_colors.is_empty() && self.channel_colors.len() != self.channel_count {
            return Err(RecordingError::data_format(format!(
                "{} channel colors for {} channels",
                self.channel_colors.len(),
                self.channel_count
            )));
        }
        if !self.traces.is_empty() {
            if self.traces.len() != self.channel_count {
                return Err(RecordingError::data_format(format!(
                    "{} trace arrays for {} channels",
                    self.traces.len(),
                    self.channel_count
                )));
            }
            for (channel, trace) in self.traces.iter().enumerate() {
                if trace.len() != stored {
                    return Err(RecordingError::data_format(format!(
                        "trace for channel {channel} has {} samples, expected {stored} stored",
                        trace.len()
                    )));
                }
            }
        }
        if let Some(ticks) = &self.frame_timestamps {
            if ticks.len() != stored {
                return Err(RecordingError::data_format(format!(
                    "{} frame timestamps for {stored} stored samples",
                    ticks.len()
                )));
            }
        }
        Ok(())
    }
}
