//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use series::SegmentCollection;

use crate::cli::ValidateArgs;
use crate::error::CliError;
use crate::segment::HeaderSegment;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SeriesSummary>,
}

#[derive(Serialize)]
struct SeriesSummary {
    segments: usize,
    samples: usize,
    start_ms: i64,
    spacing: String,
    channel_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(files = args.files.len(), "Validating series composition");

    let result = validate_series(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        let message = result.error.unwrap_or_else(|| "unknown".to_string());
        Err(CliError::series_validation(message).into())
    }
}

fn validate_series(args: &ValidateArgs) -> ValidationResult {
    let files: Vec<String> = args.files.iter().map(|p| p.display().to_string()).collect();

    let mut segments = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match HeaderSegment::load(path) {
            Ok(segment) => segments.push(segment),
            Err(e) => {
                return ValidationResult {
                    valid: false,
                    files,
                    error: Some(e.to_string()),
                    summary: None,
                };
            }
        }
    }

    match SegmentCollection::from_segments(segments) {
        Ok(series) => {
            let timing = series.temporal_index();
            observability::record_series_built(series.segment_count(), timing.sample_count());
            ValidationResult {
                valid: true,
                files,
                error: None,
                summary: Some(SeriesSummary {
                    segments: series.segment_count(),
                    samples: timing.sample_count(),
                    start_ms: timing.start().to_millis_floor(),
                    spacing: series.spacing().to_string(),
                    channel_count: series.channel_count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            files,
            error: Some(e.to_string()),
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("Series is valid");
        if let Some(summary) = &result.summary {
            println!("  Segments:  {}", summary.segments);
            println!("  Samples:   {}", summary.samples);
            println!("  Start:     {} ms", summary.start_ms);
            println!("  Spacing:   {}", summary.spacing);
            println!("  Channels:  {}", summary.channel_count);
        }
    } else {
        println!("Series is INVALID");
        if let Some(error) = &result.error {
            println!("  Error: {}", error);
        }
    }
}
