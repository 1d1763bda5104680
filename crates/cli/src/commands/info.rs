//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::Segment;

use crate::cli::InfoArgs;
use crate::error::CliError;
use crate::segment::HeaderSegment;

/// Recording info for JSON output
#[derive(Serialize)]
struct RecordingInfo {
    path: String,
    kind: String,
    start_ms: i64,
    step: String,
    sample_count: usize,
    valid_count: usize,
    spacing: String,
    channel_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    timing: Option<TimingInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<Vec<ChannelInfo>>,
}

#[derive(Serialize)]
struct TimingInfo {
    dropped: Vec<usize>,
    cropped: Vec<String>,
    blank: Vec<usize>,
}

#[derive(Serialize)]
struct ChannelInfo {
    name: String,
    accepted: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(file = %args.file.display(), "Loading recording info");

    if !args.file.exists() {
        return Err(CliError::recording_not_found(args.file.display().to_string()).into());
    }

    let segment = HeaderSegment::load(&args.file)
        .with_context(|| format!("Failed to load '{}'", args.file.display()))?;
    let built = build_info(&segment, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&built).context("Failed to serialize recording info")?;
        println!("{}", json);
    } else {
        print_info(&built);
    }

    Ok(())
}

fn build_info(segment: &HeaderSegment, args: &InfoArgs) -> RecordingInfo {
    let timing = segment.temporal_index();
    let header = segment.header();

    let step = if timing.step().is_zero() {
        "aggregate".to_string()
    } else {
        format!(
            "{}/{} s",
            timing.step().numerator(),
            timing.step().denominator()
        )
    };

    let timing_detail = args.timing.then(|| TimingInfo {
        dropped: timing.dropped_indices().collect(),
        cropped: timing
            .cropped_ranges()
            .iter()
            .map(|r| format!("{}..={}", r.first, r.last))
            .collect(),
        blank: timing.blank_indices().collect(),
    });

    let channels = args.channels.then(|| {
        (0..header.channel_count)
            .map(|c| ChannelInfo {
                name: header
                    .channel_names
                    .get(c)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("C{c:03}")),
                accepted: segment.channel_status(c),
            })
            .collect()
    });

    RecordingInfo {
        path: segment.file_path().display().to_string(),
        kind: segment.kind().to_string(),
        start_ms: timing.start().to_millis_floor(),
        step,
        sample_count: timing.sample_count(),
        valid_count: timing.valid_count(),
        spacing: segment.spacing().to_string(),
        channel_count: header.channel_count,
        timing: timing_detail,
        channels,
    }
}

fn print_info(info: &RecordingInfo) {
    println!("Recording: {}", info.path);
    println!("  Kind:      {}", info.kind);
    println!("  Start:     {} ms", info.start_ms);
    println!("  Step:      {}", info.step);
    println!(
        "  Samples:   {} ({} valid)",
        info.sample_count, info.valid_count
    );
    println!("  Spacing:   {}", info.spacing);
    println!("  Channels:  {}", info.channel_count);

    if let Some(timing) = &info.timing {
        println!("  Dropped:   {:?}", timing.dropped);
        println!("  Cropped:   {:?}", timing.cropped);
        println!("  Blank:     {:?}", timing.blank);
    }
    if let Some(channels) = &info.channels {
        println!("  Channel detail:");
        for channel in channels {
            let mark = if channel.accepted { "+" } else { "-" };
            println!("    {} {}", mark, channel.name);
        }
    }
}
