//! AsyncFanout - one read issued against every segment, one combined
//! outcome.
//!
//! Each segment's read lands in a shared aggregate buffer at an offset
//! precomputed from the sample counts of the segments issued before it, so
//! correctness never depends on completion order. The combined result
//! resolves when an atomic pending count reaches zero; "the last segment
//! issued" is not a sound trigger on a concurrent dispatcher, because
//! segments may finish in any order.
//!
//! Spawned per-segment tasks hold only a `Weak` reference to the owning
//! collection state: if the collection is destroyed while reads are in
//! flight, late callbacks become no-ops instead of touching freed state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use metrics::counter;
use tokio::sync::{oneshot, Mutex};
use tracing::{instrument, trace, warn};

use contracts::{RecordingError, Segment};

use crate::collection::SeriesInner;

/// Shared fan-out outcome. The first failure latches: a success arriving
/// after a recorded failure copies nothing and never clears the error.
struct Aggregate {
    buffer: Vec<f32>,
    failure: Option<RecordingError>,
    finished: Option<oneshot::Sender<()>>,
}

/// Read `channel` from every segment and concatenate into one buffer
/// sized to the aggregate sample count.
#[instrument(name = "fanout_read_channel", skip(inner), fields(channel, segments = inner.segments.len()))]
pub(crate) async fn read_concatenated<S>(
    inner: &Arc<SeriesInner<S>>,
    channel: usize,
) -> Result<Vec<f32>, RecordingError>
where
    S: Segment + Send + Sync + 'static,
{
    let total = inner.aggregate.sample_count();
    let issued = inner.segments.len();

    let (finished_tx, finished_rx) = oneshot::channel();
    let state = Arc::new(Mutex::new(Aggregate {
        buffer: vec![0.0; total],
        failure: None,
        finished: Some(finished_tx),
    }));
    let pending = Arc::new(AtomicUsize::new(issued));

    // Issue in sorted-segment order; completion order is unconstrained.
    for position in 0..issued {
        let weak: Weak<SeriesInner<S>> = Arc::downgrade(inner);
        let state = Arc::clone(&state);
        let pending = Arc::clone(&pending);
        let offset = inner.offsets[position];
        let expected = inner.counts[position];

        counter!("recsync_fanout_reads_total").increment(1);
        tokio::spawn(async move {
            let result = match weak.upgrade() {
                None => {
                    // Owning collection destroyed mid-flight: no-op.
                    trace!(position, "segment read resolved after series drop");
                    None
                }
                Some(inner) => {
                    let segment = inner.segments[position].read().await;
                    Some(segment.read_channel(channel).await)
                }
            };

            if let Some(result) = result {
                let mut aggregate = state.lock().await;
                match result {
                    Ok(_) if aggregate.failure.is_some() => {
                        // Keep the recorded failure; drop the late success.
                    }
                    Ok(samples) if samples.len() != expected => {
                        warn!(
                            position,
                            got = samples.len(),
                            expected,
                            "segment returned a short read"
                        );
                        aggregate.failure = Some(RecordingError::data_format(format!(
                            "segment {position} returned {} samples, expected {expected}",
                            samples.len()
                        )));
                    }
                    Ok(samples) => {
                        aggregate.buffer[offset..offset + expected].copy_from_slice(&samples);
                    }
                    Err(e) => {
                        if aggregate.failure.is_none() {
                            counter!("recsync_fanout_failures_total").increment(1);
                            aggregate.failure = Some(e);
                        }
                    }
                }
            }

            if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                let mut aggregate = state.lock().await;
                if let Some(tx) = aggregate.finished.take() {
                    let _ = tx.send(());
                }
            }
        });
    }

    finished_rx
        .await
        .map_err(|_| RecordingError::Other("fan-out completion channel closed".to_string()))?;

    let mut aggregate = state.lock().await;
    match aggregate.failure.take() {
        Some(e) => Err(e),
        None => Ok(std::mem::take(&mut aggregate.buffer)),
    }
}
