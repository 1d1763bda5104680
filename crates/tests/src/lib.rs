//! # Integration Tests
//!
//! End-to-end tests across crate boundaries.
//!
//! Covers:
//! - Series composition and fan-out reads over mock segments
//! - Start-time synchronization over real header files on disk
//! - Run metrics aggregation from sync reports

#[cfg(test)]
mod series_e2e {
    use contracts::{IndexRange, Ratio, Segment, SpacingInfo, TemporalIndex, Time};
    use series::{MockSegment, SegmentCollection};

    fn t0() -> Time {
        Time::from_secs(1_700_000_000)
    }

    /// Two cell-set segments with exclusions, composed and read end to end.
    #[tokio::test]
    async fn test_series_compose_and_read_with_exclusions() {
        let step = Ratio::new(1, 10);
        let first_timing = TemporalIndex::with_exclusions(
            t0(),
            step,
            4,
            [1],
            vec![IndexRange { first: 3, last: 3 }],
            [],
        )
        .unwrap();
        let second_timing = TemporalIndex::new(t0() + Ratio::from_int(60), step, 3);

        let segments = vec![
            MockSegment::cell_set("a.json", t0(), step, 4, 2)
                .with_timing(first_timing)
                .with_trace(0, vec![1.0, 2.0, 3.0, 4.0]),
            MockSegment::cell_set("b.json", t0() + Ratio::from_int(60), step, 3, 2)
                .with_timing(second_timing)
                .with_trace(0, vec![5.0, 6.0, 7.0]),
        ];

        let series = SegmentCollection::from_segments(segments).unwrap();
        assert_eq!(series.temporal_index().sample_count(), 7);

        // Fan-out read concatenates in sorted order.
        let trace = series.read_channel_series(0).await.unwrap();
        assert_eq!(trace, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

        // Per-segment exclusions stay with the segment, not the aggregate.
        let first_valid = series
            .with_segment(0, |s| s.temporal_index().valid_count())
            .await;
        assert_eq!(first_valid, 2);
        assert_eq!(series.temporal_index().valid_count(), 7);
    }

    /// Aggregate index arithmetic round trip: locate + per-segment timing.
    #[tokio::test]
    async fn test_global_index_resolves_to_segment_times() {
        let step = Ratio::new(1, 20);
        let segments = vec![
            MockSegment::movie("a.rsg", t0(), step, 3, SpacingInfo::new(4, 3)),
            MockSegment::movie(
                "b.rsg",
                t0() + Ratio::from_int(60),
                step,
                4,
                SpacingInfo::new(4, 3),
            ),
        ];
        let series = SegmentCollection::from_segments(segments).unwrap();

        let location = series.locate(4);
        assert_eq!(location.segment, 1);
        assert_eq!(location.local_index, 1);

        let time = series
            .with_segment(location.segment, |s| {
                s.temporal_index().index_to_start_time(location.local_index)
            })
            .await;
        assert_eq!(time, t0() + Ratio::from_int(60) + step);
    }
}

#[cfg(test)]
mod sync_e2e {
    use std::path::{Path, PathBuf};

    use clock_sync::ClockSynchronizer;
    use contracts::{DataKind, DataType, RecordingRef, SpacingInfo, SyncRequest, TaskStatus};
    use headers::{load_header, save_header, RecordingHeader, TimingDescriptor};
    use tempfile::TempDir;

    const REF_WALL_MS: i64 = 1_700_000_000_000;
    const REF_TSC: u64 = 50_000_000;

    fn gpio_header(start_ms: i64, first_tsc: u64) -> RecordingHeader {
        RecordingHeader {
            kind: DataKind::Gpio,
            timing: TimingDescriptor::regular(start_ms, 1, 1000, 8),
            spacing: SpacingInfo::new(1, 2),
            data_type: DataType::F32,
            channel_count: 2,
            channel_names: Vec::new(),
            channel_activity: Vec::new(),
            channel_colors: Vec::new(),
            first_tsc: Some(first_tsc),
            frame_timestamps: None,
            traces: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    fn movie_header(start_ms: i64, timing: TimingDescriptor, ticks: Vec<u64>) -> RecordingHeader {
        let mut timing = timing;
        timing.start_ms = start_ms;
        RecordingHeader {
            kind: DataKind::Movie,
            timing,
            spacing: SpacingInfo::new(4, 3),
            data_type: DataType::U16,
            channel_count: 1,
            channel_names: Vec::new(),
            channel_activity: Vec::new(),
            channel_colors: Vec::new(),
            first_tsc: None,
            frame_timestamps: Some(ticks),
            traces: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    fn write(dir: &TempDir, name: &str, header: &RecordingHeader) -> PathBuf {
        let path = dir.path().join(name);
        save_header(&path, header).unwrap();
        path
    }

    fn request(reference: &Path, kind: DataKind, targets: &[&Path]) -> SyncRequest {
        SyncRequest {
            reference: RecordingRef::new(reference, kind),
            targets: targets
                .iter()
                .map(|p| RecordingRef::new(*p, DataKind::Movie))
                .collect(),
        }
    }

    /// Full disk round trip: GPIO reference, movie target, patched preamble.
    #[test]
    fn test_sync_patches_movie_file_on_disk() {
        let dir = TempDir::new().unwrap();
        let reference = write(&dir, "gpio.json", &gpio_header(REF_WALL_MS, REF_TSC));
        let ticks = vec![REF_TSC + 500_000, REF_TSC + 600_000, REF_TSC + 700_000];
        let target = write(
            &dir,
            "movie.rsg",
            &movie_header(0, TimingDescriptor::regular(0, 1, 10, 3), ticks),
        );

        let report = ClockSynchronizer::default()
            .synchronize(&request(&reference, DataKind::Gpio, &[&target]))
            .unwrap();
        assert_eq!(report.status, TaskStatus::Complete);
        assert!(report.outcomes[0].patched);

        let patched = load_header(&target).unwrap();
        assert_eq!(patched.timing.start_ms, REF_WALL_MS + 500);
        // Only the start field moved.
        assert_eq!(patched.frame_timestamps.as_deref().unwrap().len(), 3);
        assert_eq!(patched.kind, DataKind::Movie);
    }

    /// Leading dropped sample: expected start extrapolates backward.
    #[test]
    fn test_sync_with_dropped_leading_sample() {
        let dir = TempDir::new().unwrap();
        let reference = write(&dir, "gpio.json", &gpio_header(REF_WALL_MS, REF_TSC));
        let timing = TimingDescriptor {
            start_ms: 0,
            step_num: 1,
            step_den: 10,
            sample_count: 3,
            dropped: vec![0],
            cropped: vec![],
            blank: vec![],
        };
        // 3 logical samples, 1 dropped -> 2 stored timestamps.
        let ticks = vec![REF_TSC + 500_000, REF_TSC + 600_000];
        let target = write(&dir, "movie.rsg", &movie_header(0, timing, ticks));

        let report = ClockSynchronizer::default()
            .synchronize(&request(&reference, DataKind::Gpio, &[&target]))
            .unwrap();

        // 100 ms step walked back once from the first valid tick.
        assert_eq!(report.outcomes[0].expected_start_ms, REF_WALL_MS + 400);
        let patched = load_header(&target).unwrap();
        assert_eq!(patched.timing.start_ms, REF_WALL_MS + 400);
    }

    /// Second run over corrected files writes nothing.
    #[test]
    fn test_sync_is_idempotent_on_disk() {
        let dir = TempDir::new().unwrap();
        let reference = write(&dir, "gpio.json", &gpio_header(REF_WALL_MS, REF_TSC));
        let ticks = vec![REF_TSC + 250_000];
        let target = write(
            &dir,
            "movie.rsg",
            &movie_header(0, TimingDescriptor::regular(0, 1, 10, 1), ticks),
        );
        let request = request(&reference, DataKind::Gpio, &[&target]);

        let first = ClockSynchronizer::default().synchronize(&request).unwrap();
        assert!(first.outcomes[0].patched);

        let second = ClockSynchronizer::default().synchronize(&request).unwrap();
        assert_eq!(second.status, TaskStatus::Complete);
        assert!(!second.outcomes[0].patched);
        assert_eq!(
            second.outcomes[0].actual_start_ms,
            second.outcomes[0].expected_start_ms
        );
    }

    /// Unsupported kinds are rejected before any file is touched.
    #[test]
    fn test_sync_rejects_trace_kinds_without_writing() {
        let dir = TempDir::new().unwrap();
        let reference = write(&dir, "gpio.json", &gpio_header(REF_WALL_MS, REF_TSC));
        let target = write(
            &dir,
            "movie.rsg",
            &movie_header(
                0,
                TimingDescriptor::regular(0, 1, 10, 1),
                vec![REF_TSC + 250_000],
            ),
        );

        let mut bad = request(&reference, DataKind::Gpio, &[&target]);
        bad.targets[0].kind = DataKind::CellSet;
        let err = ClockSynchronizer::default().synchronize(&bad).unwrap_err();
        assert!(err.to_string().contains("cannot be a synchronization target"));

        // Target untouched.
        assert_eq!(load_header(&target).unwrap().timing.start_ms, 0);
    }
}

#[cfg(test)]
mod metrics_e2e {
    use contracts::{SyncReport, TargetOutcome, TaskStatus};
    use observability::SyncRunAggregator;
    use std::path::PathBuf;

    #[test]
    fn test_aggregator_accumulates_across_runs() {
        let mut aggregator = SyncRunAggregator::new();

        for run in 0..3 {
            aggregator.update(&SyncReport {
                status: TaskStatus::Complete,
                outcomes: vec![TargetOutcome {
                    path: PathBuf::from(format!("movie-{run}.rsg")),
                    expected_start_ms: 1_000 + run,
                    actual_start_ms: 0,
                    patched: true,
                    error: None,
                }],
            });
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_runs, 3);
        assert_eq!(summary.total_patched, 3);
        assert!((summary.patch_rate - 100.0).abs() < 1e-10);
        assert!(summary.correction_ms.mean > 999.0);
    }
}
