//! Start-time synchronizer.
//!
//! One reference recording's wall-clock start is trusted; every target's
//! start is recomputed from the hardware-tick delta between the two
//! devices and patched in place when it disagrees with what is stored.
//!
//! The run is phased: Validating rejects unsupported data kinds before any
//! file is touched, Computing derives expected starts, Persisting patches
//! headers. Targets fail independently; one broken target never aborts the
//! rest of the run.

use std::path::Path;

use metrics::counter;
use tracing::{debug, info, instrument, warn};

use contracts::{
    GpioProperties, MovieTimestamps, RecordingError, RecordingRef, SyncReport, SyncRequest,
    TargetOutcome, TaskStatus,
};
use headers::LoadedRecording;

use crate::tick;

/// Phase of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Validating,
    Computing,
    Persisting,
    Complete,
    Failed,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Computing => "computing",
            Self::Persisting => "persisting",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Access to recordings, abstracted so the synchronizer itself never knows
/// about on-disk layouts and tests can run against in-memory recordings.
pub trait RecordingStore {
    type Recording: MovieTimestamps + GpioProperties;

    /// Open and decode one recording.
    ///
    /// # Errors
    /// IO and data-format errors from the backing store.
    fn open(&self, recording: &RecordingRef) -> Result<Self::Recording, RecordingError>;

    /// Overwrite only the persisted start-time field, in place.
    ///
    /// # Errors
    /// IO errors from the backing store.
    fn patch_start_time(&self, recording: &RecordingRef, start_ms: i64)
        -> Result<(), RecordingError>;
}

/// Filesystem-backed store over recording header files.
#[derive(Debug, Default)]
pub struct FsStore;

impl RecordingStore for FsStore {
    type Recording = LoadedRecording;

    fn open(&self, recording: &RecordingRef) -> Result<Self::Recording, RecordingError> {
        LoadedRecording::load(&recording.path)
    }

    fn patch_start_time(
        &self,
        recording: &RecordingRef,
        start_ms: i64,
    ) -> Result<(), RecordingError> {
        headers::patch_start_time(&recording.path, recording.kind, start_ms)
    }
}

/// Clock synchronizer over an abstract recording store.
pub struct ClockSynchronizer<S> {
    store: S,
    phase: SyncPhase,
}

impl Default for ClockSynchronizer<FsStore> {
    fn default() -> Self {
        Self::new(FsStore)
    }
}

impl<S: RecordingStore> ClockSynchronizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Run one synchronization pass.
    ///
    /// Already-correct targets are left untouched, so a second run over
    /// corrected files writes nothing.
    ///
    /// # Errors
    /// `RecordingError::UserInput` for an unsupported reference or target
    /// kind, and reference read failures; both abort before any write.
    /// Per-target failures are reported in the outcome list instead.
    #[instrument(name = "clock_sync", skip(self, request), fields(targets = request.targets.len()))]
    pub fn synchronize(&mut self, request: &SyncRequest) -> Result<SyncReport, RecordingError> {
        counter!("recsync_sync_runs_total").increment(1);

        self.phase = SyncPhase::Validating;
        if let Err(e) = validate(request) {
            self.phase = SyncPhase::Failed;
            return Err(e);
        }

        self.phase = SyncPhase::Computing;
        let (reference_start_ms, reference_tick) = match self.reference_clock(&request.reference) {
            Ok(clock) => clock,
            Err(e) => {
                self.phase = SyncPhase::Failed;
                return Err(e);
            }
        };
        debug!(reference_start_ms, reference_tick, "reference clock resolved");

        self.phase = SyncPhase::Persisting;
        let mut outcomes = Vec::with_capacity(request.targets.len());
        for target in &request.targets {
            let outcome = self.synchronize_target(target, reference_start_ms, reference_tick);
            if let Some(error) = &outcome.error {
                warn!(path = %target.path.display(), error, "target failed");
            } else if outcome.patched {
                counter!("recsync_targets_patched_total").increment(1);
            }
            outcomes.push(outcome);
        }

        let report = SyncReport {
            status: if outcomes.iter().any(|o| o.error.is_some()) {
                TaskStatus::Error
            } else {
                TaskStatus::Complete
            },
            outcomes,
        };
        self.phase = match report.status {
            TaskStatus::Complete => SyncPhase::Complete,
            _ => SyncPhase::Failed,
        };
        info!(
            patched = report.patched_count(),
            failed = report.failed_count(),
            status = ?report.status,
            "synchronization finished"
        );
        Ok(report)
    }

    /// Wall-clock start (ms) and first-sample device tick of the reference.
    fn reference_clock(&self, reference: &RecordingRef) -> Result<(i64, i64), RecordingError> {
        let recording = self.store.open(reference)?;
        let start_ms = recording.timing_info().start().to_millis_floor();
        let tick = if reference.kind.uses_first_tsc() {
            recording.first_tsc().map(|t| t as i64).ok_or_else(|| {
                RecordingError::data_format_at(
                    &reference.path,
                    "GPIO recording carries no first hardware tick",
                )
            })?
        } else {
            first_sample_tick(&recording, &reference.path)?
        };
        Ok((start_ms, tick))
    }

    fn synchronize_target(
        &self,
        target: &RecordingRef,
        reference_start_ms: i64,
        reference_tick: i64,
    ) -> TargetOutcome {
        let mut outcome = TargetOutcome {
            path: target.path.clone(),
            expected_start_ms: 0,
            actual_start_ms: 0,
            patched: false,
            error: None,
        };

        let recording = match self.store.open(target) {
            Ok(r) => r,
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.actual_start_ms = recording.timing_info().start().to_millis_floor();

        let target_tick = match first_sample_tick(&recording, &target.path) {
            Ok(tick) => tick,
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.expected_start_ms =
            reference_start_ms + tick::delta_ticks_to_millis(target_tick, reference_tick);

        if outcome.actual_start_ms == outcome.expected_start_ms {
            debug!(path = %target.path.display(), "start already correct");
            return outcome;
        }
        match self
            .store
            .patch_start_time(target, outcome.expected_start_ms)
        {
            Ok(()) => outcome.patched = true,
            Err(e) => outcome.error = Some(e.to_string()),
        }
        outcome
    }
}

/// Data-kind validation; runs before any file access.
fn validate(request: &SyncRequest) -> Result<(), RecordingError> {
    if !request.reference.kind.can_reference() {
        return Err(RecordingError::user_input(format!(
            "'{}' of kind {} cannot serve as a synchronization reference",
            request.reference.path.display(),
            request.reference.kind
        )));
    }
    for target in &request.targets {
        if !target.kind.can_target() {
            return Err(RecordingError::user_input(format!(
                "'{}' of kind {} cannot be a synchronization target",
                target.path.display(),
                target.kind
            )));
        }
    }
    Ok(())
}

/// Device tick of the (conceptual) first sample of a movie-like recording.
///
/// The first valid sample's stored timestamp is looked up through the
/// logical-to-storage mapping; if leading samples were dropped, the tick is
/// extrapolated backward to where sample zero would have been.
fn first_sample_tick<R: MovieTimestamps>(
    recording: &R,
    path: &Path,
) -> Result<i64, RecordingError> {
    if !recording.has_frame_timestamps() {
        return Err(RecordingError::data_format_at(
            path,
            "recording carries no frame timestamps",
        ));
    }
    let timing = recording.timing_info();
    let first_valid = timing.first_valid_index().ok_or_else(|| {
        RecordingError::data_format_at(path, "recording has no valid samples")
    })?;
    let storage = timing.recorded_index(first_valid).ok_or_else(|| {
        RecordingError::data_format_at(
            path,
            format!("sample {first_valid} occupies no storage slot"),
        )
    })?;
    let tick = recording.frame_timestamp(storage)?;
    Ok(tick::extrapolate_first_tick(tick, first_valid, timing.step()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DataKind, Ratio, TemporalIndex, Time};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct FakeRecording {
        timing: TemporalIndex,
        first_tsc: Option<u64>,
        frame_ticks: Option<Vec<u64>>,
    }

    impl MovieTimestamps for FakeRecording {
        fn timing_info(&self) -> &TemporalIndex {
            &self.timing
        }

        fn has_frame_timestamps(&self) -> bool {
            self.frame_ticks.is_some()
        }

        fn frame_timestamp(&self, storage_index: usize) -> Result<u64, RecordingError> {
            self.frame_ticks
                .as_deref()
                .and_then(|t| t.get(storage_index).copied())
                .ok_or_else(|| {
                    RecordingError::data_format(format!(
                        "no timestamp stored for frame {storage_index}"
                    ))
                })
        }
    }

    impl GpioProperties for FakeRecording {
        fn first_tsc(&self) -> Option<u64> {
            self.first_tsc
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        recordings: HashMap<PathBuf, FakeRecording>,
        patches: RefCell<Vec<(PathBuf, i64)>>,
    }

    impl MemoryStore {
        fn insert(&mut self, path: &str, recording: FakeRecording) {
            self.recordings.insert(PathBuf::from(path), recording);
        }
    }

    impl RecordingStore for &MemoryStore {
        type Recording = FakeRecording;

        fn open(&self, recording: &RecordingRef) -> Result<Self::Recording, RecordingError> {
            let found = self.recordings.get(&recording.path).ok_or_else(|| {
                RecordingError::Other(format!("no such recording '{}'", recording.path.display()))
            })?;
            Ok(FakeRecording {
                timing: found.timing.clone(),
                first_tsc: found.first_tsc,
                frame_ticks: found.frame_ticks.clone(),
            })
        }

        fn patch_start_time(
            &self,
            recording: &RecordingRef,
            start_ms: i64,
        ) -> Result<(), RecordingError> {
            self.patches
                .borrow_mut()
                .push((recording.path.clone(), start_ms));
            Ok(())
        }
    }

    const REF_WALL_MS: i64 = 1_700_000_000_000;
    const REF_TSC: u64 = 10_000_000;

    fn gpio_reference() -> FakeRecording {
        FakeRecording {
            timing: TemporalIndex::new(Time::from_millis(REF_WALL_MS), Ratio::new(1, 1000), 100),
            first_tsc: Some(REF_TSC),
            frame_ticks: None,
        }
    }

    fn movie_target(timing: TemporalIndex, ticks: Vec<u64>) -> FakeRecording {
        FakeRecording {
            timing,
            first_tsc: None,
            frame_ticks: Some(ticks),
        }
    }

    fn request(reference: (&str, DataKind), targets: &[(&str, DataKind)]) -> SyncRequest {
        SyncRequest {
            reference: RecordingRef::new(reference.0, reference.1),
            targets: targets
                .iter()
                .map(|(p, k)| RecordingRef::new(*p, *k))
                .collect(),
        }
    }

    #[test]
    fn test_gpio_reference_tick_delta_shifts_target_start() {
        let mut store = MemoryStore::default();
        store.insert("ref.gpio", gpio_reference());
        store.insert(
            "target.rsg",
            movie_target(
                TemporalIndex::new(Time::from_millis(0), Ratio::new(1, 10), 5),
                vec![REF_TSC + 500_000, REF_TSC + 600_000],
            ),
        );

        let mut sync = ClockSynchronizer::new(&store);
        let report = sync
            .synchronize(&request(
                ("ref.gpio", DataKind::Gpio),
                &[("target.rsg", DataKind::Movie)],
            ))
            .unwrap();

        assert_eq!(report.status, TaskStatus::Complete);
        assert_eq!(report.outcomes[0].expected_start_ms, REF_WALL_MS + 500);
        assert!(report.outcomes[0].patched);
        assert_eq!(
            store.patches.borrow().as_slice(),
            &[(PathBuf::from("target.rsg"), REF_WALL_MS + 500)]
        );
        assert_eq!(sync.phase(), SyncPhase::Complete);
    }

    #[test]
    fn test_dropped_first_sample_extrapolates_backward() {
        let mut store = MemoryStore::default();
        store.insert("ref.gpio", gpio_reference());
        // 100 ms steps; sample 0 dropped, so storage slot 0 holds sample 1.
        let timing = TemporalIndex::with_exclusions(
            Time::from_millis(0),
            Ratio::new(1, 10),
            5,
            [0],
            vec![],
            [],
        )
        .unwrap();
        store.insert(
            "target.rsg",
            movie_target(timing, vec![REF_TSC + 500_000, REF_TSC + 600_000]),
        );

        let mut sync = ClockSynchronizer::new(&store);
        let report = sync
            .synchronize(&request(
                ("ref.gpio", DataKind::Gpio),
                &[("target.rsg", DataKind::Movie)],
            ))
            .unwrap();

        // Extrapolated first tick is 100 ms earlier than the first valid one.
        assert_eq!(report.outcomes[0].expected_start_ms, REF_WALL_MS + 400);
    }

    #[test]
    fn test_movie_reference_uses_frame_timestamps() {
        let mut store = MemoryStore::default();
        store.insert(
            "ref.rsg",
            movie_target(
                TemporalIndex::new(Time::from_millis(REF_WALL_MS), Ratio::new(1, 10), 5),
                vec![REF_TSC, REF_TSC + 100_000],
            ),
        );
        store.insert(
            "target.rsg",
            movie_target(
                TemporalIndex::new(Time::from_millis(0), Ratio::new(1, 10), 5),
                vec![REF_TSC + 250_000],
            ),
        );

        let mut sync = ClockSynchronizer::new(&store);
        let report = sync
            .synchronize(&request(
                ("ref.rsg", DataKind::Movie),
                &[("target.rsg", DataKind::Movie)],
            ))
            .unwrap();
        assert_eq!(report.outcomes[0].expected_start_ms, REF_WALL_MS + 250);
    }

    #[test]
    fn test_idempotent_when_start_already_correct() {
        let mut store = MemoryStore::default();
        store.insert("ref.gpio", gpio_reference());
        store.insert(
            "target.rsg",
            movie_target(
                TemporalIndex::new(
                    Time::from_millis(REF_WALL_MS + 500),
                    Ratio::new(1, 10),
                    5,
                ),
                vec![REF_TSC + 500_000],
            ),
        );

        let mut sync = ClockSynchronizer::new(&store);
        let report = sync
            .synchronize(&request(
                ("ref.gpio", DataKind::Gpio),
                &[("target.rsg", DataKind::Movie)],
            ))
            .unwrap();

        assert_eq!(report.status, TaskStatus::Complete);
        assert!(!report.outcomes[0].patched);
        assert!(store.patches.borrow().is_empty());
    }

    #[test]
    fn test_unsupported_reference_kind_fails_before_any_access() {
        let store = MemoryStore::default();
        let mut sync = ClockSynchronizer::new(&store);
        let err = sync
            .synchronize(&request(
                ("events.json", DataKind::EventSet),
                &[("target.rsg", DataKind::Movie)],
            ))
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("events.json"));
        assert!(text.contains("reference"));
        assert!(store.patches.borrow().is_empty());
        assert_eq!(sync.phase(), SyncPhase::Failed);
    }

    #[test]
    fn test_unsupported_target_kind_rejected() {
        let store = MemoryStore::default();
        let mut sync = ClockSynchronizer::new(&store);
        let err = sync
            .synchronize(&request(
                ("ref.gpio", DataKind::Gpio),
                &[("cells.json", DataKind::CellSet)],
            ))
            .unwrap_err();
        assert!(err.to_string().contains("cells.json"));
    }

    #[test]
    fn test_one_broken_target_does_not_abort_the_rest() {
        let mut store = MemoryStore::default();
        store.insert("ref.gpio", gpio_reference());
        store.insert(
            "good.rsg",
            movie_target(
                TemporalIndex::new(Time::from_millis(0), Ratio::new(1, 10), 5),
                vec![REF_TSC + 500_000],
            ),
        );

        let mut sync = ClockSynchronizer::new(&store);
        let report = sync
            .synchronize(&request(
                ("ref.gpio", DataKind::Gpio),
                &[
                    ("missing.rsg", DataKind::Movie),
                    ("good.rsg", DataKind::Movie),
                ],
            ))
            .unwrap();

        assert_eq!(report.status, TaskStatus::Error);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.patched_count(), 1);
        assert!(report.outcomes[0].error.is_some());
        assert!(report.outcomes[1].patched);
    }

    #[test]
    fn test_target_without_timestamps_reports_per_target_error() {
        let mut store = MemoryStore::default();
        store.insert("ref.gpio", gpio_reference());
        store.insert(
            "target.rsg",
            FakeRecording {
                timing: TemporalIndex::new(Time::from_millis(0), Ratio::new(1, 10), 5),
                first_tsc: None,
                frame_ticks: None,
            },
        );

        let mut sync = ClockSynchronizer::new(&store);
        let report = sync
            .synchronize(&request(
                ("ref.gpio", DataKind::Gpio),
                &[("target.rsg", DataKind::Movie)],
            ))
            .unwrap();
        let error = report.outcomes[0].error.as_deref().unwrap();
        assert!(error.contains("frame timestamps"));
    }
}
