//! SegmentCollection - ordered, validated composition of segments.
//!
//! One generic collection replaces a composition class per kind: the
//! sorting, pairwise validation, gapless aggregate, and global-to-local
//! index arithmetic exist once, and the per-kind differences stay behind
//! the `Segment` trait.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use contracts::{
    series_rule, ChannelId, DataType, FrameData, RecordingError, Segment, SpacingInfo,
    TemporalIndex,
};

use crate::fanout;

/// Shared state behind a valid collection. Fan-out tasks hold this weakly.
pub(crate) struct SeriesInner<S> {
    /// Segments in sorted start-time order; the write lock covers the
    /// write-rare metadata setters only.
    pub(crate) segments: Vec<RwLock<S>>,
    /// Gapless aggregate time base (step is the zero sentinel).
    pub(crate) aggregate: TemporalIndex,
    /// Global sample offset where each segment begins.
    pub(crate) offsets: Vec<usize>,
    /// Per-segment sample counts.
    pub(crate) counts: Vec<usize>,
    spacing: SpacingInfo,
    data_type: DataType,
    channel_count: usize,
    identity: String,
}

/// Result of mapping a global sample index onto a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLocation {
    /// Sorted position of the owning segment.
    pub segment: usize,
    /// Sample index within that segment.
    pub local_index: usize,
}

/// Ordered, validated series of homogeneous segments presented as one
/// logical timeline.
///
/// Segment order is fixed at construction: sorted ascending by start time,
/// permanently. Every index-taking API addresses the *sorted* position,
/// not the caller's input order.
pub struct SegmentCollection<S> {
    inner: Option<Arc<SeriesInner<S>>>,
}

impl<S> SegmentCollection<S> {
    /// Explicitly invalid placeholder. Every accessor except `is_valid`
    /// asserts against it.
    pub fn placeholder() -> Self {
        Self { inner: None }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }
}

impl<S> Default for SegmentCollection<S> {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl<S> fmt::Debug for SegmentCollection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("SegmentCollection")
                .field("identity", &inner.identity)
                .finish_non_exhaustive(),
            None => f.write_str("SegmentCollection(placeholder)"),
        }
    }
}

impl<S: Segment + Send + Sync + 'static> SegmentCollection<S> {
    /// Compose a series from loaded segments.
    ///
    /// Segments are sorted by start time, then each is validated pairwise
    /// against its predecessor. Construction is atomic: any failure leaves
    /// no partially-valid collection behind.
    ///
    /// # Errors
    /// `RecordingError::Series` naming the offending file and the violated
    /// rule (spacing, data type, frame rate, overlap, channel count).
    #[instrument(name = "series_build", skip(segments), fields(count = segments.len()))]
    pub fn from_segments(mut segments: Vec<S>) -> Result<Self, RecordingError> {
        if segments.is_empty() {
            return Err(RecordingError::series(PathBuf::new(), series_rule::EMPTY));
        }

        segments.sort_by_key(|s| s.temporal_index().start());
        Self::validate_sorted(&segments)?;

        let counts: Vec<usize> = segments
            .iter()
            .map(|s| s.temporal_index().sample_count())
            .collect();
        let mut offsets = Vec::with_capacity(counts.len());
        let mut running = 0usize;
        for &count in &counts {
            offsets.push(running);
            running += count;
        }

        let first = &segments[0];
        let aggregate = TemporalIndex::gapless(first.temporal_index().start(), running);
        let identity = format!("series({} segments, {} samples)", segments.len(), running);
        let spacing = *first.spacing();
        let data_type = first.data_type();
        let channel_count = first.channel_count();

        counter!("recsync_series_built_total").increment(1);
        debug!(segments = counts.len(), samples = running, "series composed");

        Ok(Self {
            inner: Some(Arc::new(SeriesInner {
                segments: segments.into_iter().map(RwLock::new).collect(),
                aggregate,
                offsets,
                counts,
                spacing,
                data_type,
                channel_count,
                identity,
            })),
        })
    }

    /// Pairwise checks against the previous segment in sorted order.
    fn validate_sorted(segments: &[S]) -> Result<(), RecordingError> {
        for i in 1..segments.len() {
            let previous = &segments[i - 1];
            let current = &segments[i];
            let path = current.file_path();

            if current.spacing() != previous.spacing() {
                return Err(RecordingError::series(path, series_rule::SPACING));
            }
            if current.data_type() != previous.data_type() {
                return Err(RecordingError::series(path, series_rule::DATA_TYPE));
            }
            if current.temporal_index().step() != previous.temporal_index().step() {
                return Err(RecordingError::series(path, series_rule::FRAME_RATE));
            }
            if current.temporal_index().start() < previous.temporal_index().end() {
                return Err(RecordingError::series(path, series_rule::OVERLAP));
            }
            if current.channel_count() != previous.channel_count() {
                return Err(RecordingError::series(path, series_rule::CHANNEL_COUNT));
            }
        }
        Ok(())
    }

    fn inner(&self) -> &Arc<SeriesInner<S>> {
        self.inner
            .as_ref()
            .expect("operation on an invalid placeholder series")
    }

    pub fn segment_count(&self) -> usize {
        self.inner().segments.len()
    }

    /// The gapless aggregate time base.
    pub fn temporal_index(&self) -> &TemporalIndex {
        &self.inner().aggregate
    }

    pub fn spacing(&self) -> &SpacingInfo {
        &self.inner().spacing
    }

    pub fn data_type(&self) -> DataType {
        self.inner().data_type
    }

    pub fn channel_count(&self) -> usize {
        self.inner().channel_count
    }

    /// Synthetic series identifier; never a real file path.
    pub fn file_identity(&self) -> &str {
        &self.inner().identity
    }

    /// Map a global sample index to (sorted segment position, local index).
    ///
    /// # Panics
    /// An out-of-range global index is a programming-precondition
    /// violation, not recoverable input, and asserts.
    pub fn locate(&self, global_index: usize) -> SegmentLocation {
        let inner = self.inner();
        let total = inner.aggregate.sample_count();
        assert!(
            global_index < total,
            "global index {global_index} beyond last segment ({total} samples)"
        );

        let mut remaining = global_index;
        for (segment, &count) in inner.counts.iter().enumerate() {
            if remaining < count {
                return SegmentLocation {
                    segment,
                    local_index: remaining,
                };
            }
            remaining -= count;
        }
        unreachable!("accumulated counts shorter than aggregate sample count");
    }

    /// Concatenated trace for one channel across the whole series, in
    /// sorted-segment order.
    ///
    /// # Errors
    /// The first per-segment read failure, with later successes discarded.
    pub async fn read_channel_series(&self, channel: usize) -> Result<Vec<f32>, RecordingError> {
        fanout::read_concatenated(self.inner(), channel).await
    }

    /// Frame at a global sample index, resolved through `locate`.
    pub async fn read_frame(&self, global_index: usize) -> Result<FrameData, RecordingError> {
        let location = self.locate(global_index);
        let inner = self.inner();
        let segment = inner.segments[location.segment].read().await;
        segment.read_frame(location.local_index).await
    }

    /// Representative single-sample read: forwarded to the first segment
    /// only, since one value stands for the whole series.
    pub async fn representative_frame(&self) -> Result<FrameData, RecordingError> {
        let inner = self.inner();
        let segment = inner.segments[0].read().await;
        segment.read_frame(0).await
    }

    /// Broadcast: channel names are not time-varying, so every segment
    /// gets the same value.
    pub async fn set_channel_name(&self, channel: usize, name: ChannelId) {
        for lock in &self.inner().segments {
            lock.write().await.set_channel_name(channel, name.clone());
        }
    }

    /// Broadcast, same rule as `set_channel_name`.
    pub async fn set_channel_status(&self, channel: usize, accepted: bool) {
        for lock in &self.inner().segments {
            lock.write().await.set_channel_status(channel, accepted);
        }
    }

    /// Broadcast, same rule as `set_channel_name`.
    pub async fn set_channel_color(&self, channel: usize, color: u32) {
        for lock in &self.inner().segments {
            lock.write().await.set_channel_color(channel, color);
        }
    }

    /// Per-sample activity flags concatenated across segments, like trace
    /// data.
    pub async fn activity_vector(&self) -> Vec<bool> {
        let inner = self.inner();
        let mut combined = Vec::with_capacity(inner.aggregate.sample_count());
        for lock in &inner.segments {
            combined.extend(lock.read().await.activity_vector());
        }
        combined
    }

    /// Distribute per-segment activity vectors, one per sorted segment.
    ///
    /// A single-element `parts` is the explicit "set all" special case:
    /// that one vector is broadcast to every segment instead of being
    /// distributed.
    ///
    /// # Panics
    /// Asserts that `parts` has either one element or one per segment.
    pub async fn set_activity_vectors(&self, parts: Vec<Vec<bool>>) {
        let inner = self.inner();
        if parts.len() == 1 {
            for lock in &inner.segments {
                lock.write().await.set_activity_vector(&parts[0]);
            }
            return;
        }
        assert_eq!(
            parts.len(),
            inner.segments.len(),
            "one activity vector per segment, or exactly one to broadcast"
        );
        for (lock, part) in inner.segments.iter().zip(&parts) {
            lock.write().await.set_activity_vector(part);
        }
    }

    /// Forwarded to every owned segment unconditionally; idempotent.
    pub async fn cancel_pending_reads(&self) {
        for lock in &self.inner().segments {
            lock.read().await.cancel_pending_reads();
        }
    }

    /// Flush and drop write access on every segment.
    pub async fn close_for_writing(&self) {
        for lock in &self.inner().segments {
            lock.write().await.close_for_writing();
        }
    }

    /// Run `f` against the segment at a sorted position (test and
    /// inspection hook).
    pub async fn with_segment<R>(&self, position: usize, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.inner().segments[position].read().await;
        f(&guard)
    }
}
