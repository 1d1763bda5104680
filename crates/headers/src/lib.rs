//! # Headers
//!
//! Persisted recording headers: the typed model, both on-disk layouts, and
//! the narrow "overwrite start-time field in place" primitives that
//! start-time synchronization persists through.
//!
//! Responsibilities:
//! - Parse and validate recording headers (movie preamble or plain JSON)
//! - Patch the wall-clock start field without disturbing anything else
//! - Expose loaded recordings through the contract clock-source traits
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use headers::LoadedRecording;
//!
//! let recording = LoadedRecording::load(Path::new("session/gpio.json")).unwrap();
//! println!("{} starting at {}", recording.kind(), recording.header().timing.start_ms);
//! ```

mod model;
mod recording;
mod store;

pub use model::{RecordingHeader, TimingDescriptor};
pub use recording::LoadedRecording;
pub use store::{
    load_header, patch_movie_start_time, patch_start_time, rewrite_json_start_time, save_header,
    MOVIE_MAGIC, MOVIE_START_TIME_OFFSET,
};
