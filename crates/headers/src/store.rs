//! On-disk header layouts and the start-time patch primitives.
//!
//! Two layouts exist:
//!
//! - **Movie kind**: fixed 24-byte binary preamble (magic, version,
//!   start-time field, header length) followed by the JSON header, then
//!   the opaque sample payload. The preamble start-time field is
//!   authoritative and can be overwritten in place at a fixed byte offset
//!   without touching anything else in the file.
//! - **GPIO / externally clocked kinds**: plain JSON document; patching the
//!   start time is a structured read-modify-rewrite of that one field.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, instrument};

use contracts::{DataKind, RecordingError};

use crate::model::RecordingHeader;

/// Magic bytes opening a movie-layout file.
pub const MOVIE_MAGIC: [u8; 4] = *b"RSG1";

/// Byte offset of the i64 LE start-time-ms field inside the preamble.
pub const MOVIE_START_TIME_OFFSET: u64 = 8;

const MOVIE_PREAMBLE_LEN: usize = 24;
const MOVIE_LAYOUT_VERSION: u32 = 1;

/// Load a recording header from either layout, sniffing the magic bytes.
///
/// # Errors
/// IO errors, or `RecordingError::DataFormat` naming the file for
/// malformed preambles/JSON and failed cross-field validation.
#[instrument(name = "headers_load", skip_all, fields(path = %path.display()))]
pub fn load_header(path: &Path) -> Result<RecordingHeader, RecordingError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    let sniffed = file.read(&mut magic)?;

    let header = if sniffed == 4 && magic == MOVIE_MAGIC {
        load_movie_layout(path, &mut file)?
    } else {
        file.seek(SeekFrom::Start(0))?;
        let mut body = String::new();
        file.read_to_string(&mut body)?;
        serde_json::from_str(&body)
            .map_err(|e| RecordingError::data_format_at(path, format!("invalid header: {e}")))?
    };

    header.validate().map_err(|e| match e {
        RecordingError::DataFormat { message } => {
            RecordingError::data_format_at(path, message)
        }
        other => other,
    })?;

    debug!(kind = %header.kind, samples = header.timing.sample_count, "header loaded");
    Ok(header)
}

fn load_movie_layout(path: &Path, file: &mut File) -> Result<RecordingHeader, RecordingError> {
    file.seek(SeekFrom::Start(0))?;
    let mut preamble = [0u8; MOVIE_PREAMBLE_LEN];
    file.read_exact(&mut preamble).map_err(|_| {
        RecordingError::data_format_at(path, "truncated movie preamble")
    })?;

    let version = u32::from_le_bytes(preamble[4..8].try_into().expect("4-byte slice"));
    if version != MOVIE_LAYOUT_VERSION {
        return Err(RecordingError::data_format_at(
            path,
            format!("unsupported movie layout version {version}"),
        ));
    }
    let start_ms = i64::from_le_bytes(preamble[8..16].try_into().expect("8-byte slice"));
    let header_len = u64::from_le_bytes(preamble[16..24].try_into().expect("8-byte slice"));

    let mut body = vec![0u8; header_len as usize];
    file.read_exact(&mut body).map_err(|_| {
        RecordingError::data_format_at(path, "truncated movie header body")
    })?;

    let mut header: RecordingHeader = serde_json::from_slice(&body)
        .map_err(|e| RecordingError::data_format_at(path, format!("invalid header: {e}")))?;

    // The preamble field is authoritative: an in-place patch updates it
    // without rewriting the JSON body.
    header.timing.start_ms = start_ms;
    Ok(header)
}

/// Write a recording header in the layout its kind mandates.
///
/// # Errors
/// IO errors; serialization failures surface as data-format errors.
#[instrument(name = "headers_save", skip(header), fields(path = %path.display(), kind = %header.kind))]
pub fn save_header(path: &Path, header: &RecordingHeader) -> Result<(), RecordingError> {
    match header.kind {
        DataKind::Movie => save_movie_layout(path, header),
        _ => save_json_layout(path, header),
    }
}

fn save_movie_layout(path: &Path, header: &RecordingHeader) -> Result<(), RecordingError> {
    let body = serde_json::to_vec(header)
        .map_err(|e| RecordingError::data_format(format!("header serialize error: {e}")))?;

    let mut file = File::create(path)?;
    file.write_all(&MOVIE_MAGIC)?;
    file.write_all(&MOVIE_LAYOUT_VERSION.to_le_bytes())?;
    file.write_all(&header.timing.start_ms.to_le_bytes())?;
    file.write_all(&(body.len() as u64).to_le_bytes())?;
    file.write_all(&body)?;
    Ok(())
}

fn save_json_layout(path: &Path, header: &RecordingHeader) -> Result<(), RecordingError> {
    let body = serde_json::to_vec_pretty(header)
        .map_err(|e| RecordingError::data_format(format!("header serialize error: {e}")))?;
    let mut file = File::create(path)?;
    file.write_all(&body)?;
    Ok(())
}

/// Overwrite only the persisted wall-clock start of a recording, leaving
/// sample data and all other metadata untouched.
///
/// # Errors
/// IO errors, or data-format errors when the file does not match the
/// layout its kind mandates.
#[instrument(name = "headers_patch_start", fields(path = %path.display(), %kind, start_ms))]
pub fn patch_start_time(path: &Path, kind: DataKind, start_ms: i64) -> Result<(), RecordingError> {
    match kind {
        DataKind::Movie => patch_movie_start_time(path, start_ms),
        DataKind::Gpio | DataKind::ExternallyClockedMovie => {
            rewrite_json_start_time(path, start_ms)
        }
        other => Err(RecordingError::user_input(format!(
            "cannot patch start time of a {other} recording"
        ))),
    }
}

/// Movie layout: seek to the fixed preamble offset and overwrite 8 bytes.
/// File size and every other byte stay untouched.
pub fn patch_movie_start_time(path: &Path, start_ms: i64) -> Result<(), RecordingError> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;

    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if magic != MOVIE_MAGIC {
        return Err(RecordingError::data_format_at(
            path,
            "not a movie-layout recording",
        ));
    }

    file.seek(SeekFrom::Start(MOVIE_START_TIME_OFFSET))?;
    file.write_all(&start_ms.to_le_bytes())?;
    file.flush()?;
    debug!(path = %path.display(), start_ms, "movie preamble patched in place");
    Ok(())
}

/// JSON layout: parse, replace the one field, rewrite the document.
pub fn rewrite_json_start_time(path: &Path, start_ms: i64) -> Result<(), RecordingError> {
    let body = std::fs::read_to_string(path)?;
    let mut header: RecordingHeader = serde_json::from_str(&body)
        .map_err(|e| RecordingError::data_format_at(path, format!("invalid header: {e}")))?;
    header.timing.start_ms = start_ms;
    save_json_layout(path, &header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimingDescriptor;
    use contracts::{DataType, SpacingInfo};
    use tempfile::TempDir;

    fn header(kind: DataKind, start_ms: i64) -> RecordingHeader {
        RecordingHeader {
            kind,
            timing: TimingDescriptor::regular(start_ms, 1, 20, 3),
            spacing: SpacingInfo::new(4, 3),
            data_type: DataType::U16,
            channel_count: 1,
            channel_names: Vec::new(),
            channel_activity: Vec::new(),
            channel_colors: Vec::new(),
            first_tsc: if kind == DataKind::Gpio { Some(42) } else { None },
            frame_timestamps: if kind == DataKind::Movie {
                Some(vec![100, 200, 300])
            } else {
                None
            },
            traces: vec![vec![1.0, 2.0, 3.0]],
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_movie_layout_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rec.rsg");
        save_header(&path, &header(DataKind::Movie, 9_000)).unwrap();

        let loaded = load_header(&path).unwrap();
        assert_eq!(loaded.kind, DataKind::Movie);
        assert_eq!(loaded.timing.start_ms, 9_000);
        assert_eq!(loaded.frame_timestamps, Some(vec![100, 200, 300]));
    }

    #[test]
    fn test_json_layout_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gpio.json");
        save_header(&path, &header(DataKind::Gpio, 7_500)).unwrap();

        let loaded = load_header(&path).unwrap();
        assert_eq!(loaded.kind, DataKind::Gpio);
        assert_eq!(loaded.timing.start_ms, 7_500);
        assert_eq!(loaded.first_tsc, Some(42));
    }

    #[test]
    fn test_movie_patch_preserves_file_size_and_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rec.rsg");
        save_header(&path, &header(DataKind::Movie, 9_000)).unwrap();
        let before = std::fs::read(&path).unwrap();

        patch_start_time(&path, DataKind::Movie, 9_750).unwrap();

        let after = std::fs::read(&path).unwrap();
        assert_eq!(before.len(), after.len());
        // Only the 8 bytes of the start-time field changed.
        assert_eq!(before[..8], after[..8]);
        assert_eq!(before[16..], after[16..]);
        assert_eq!(load_header(&path).unwrap().timing.start_ms, 9_750);
    }

    #[test]
    fn test_json_patch_changes_only_start_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gpio.json");
        save_header(&path, &header(DataKind::Gpio, 7_500)).unwrap();

        patch_start_time(&path, DataKind::Gpio, 8_000).unwrap();

        let loaded = load_header(&path).unwrap();
        assert_eq!(loaded.timing.start_ms, 8_000);
        assert_eq!(loaded.first_tsc, Some(42));
        assert_eq!(loaded.traces, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_patch_rejects_trace_kinds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.json");
        let err = patch_start_time(&path, DataKind::CellSet, 1).unwrap_err();
        assert!(matches!(err, RecordingError::UserInput { .. }));
    }

    #[test]
    fn test_truncated_movie_preamble_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.rsg");
        std::fs::write(&path, MOVIE_MAGIC).unwrap();
        let err = load_header(&path).unwrap_err();
        assert!(err.to_string().contains("truncated movie preamble"));
    }

    #[test]
    fn test_malformed_json_rejected_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_header(&path).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("invalid header"));
        assert!(text.contains("bad.json"));
    }
}
