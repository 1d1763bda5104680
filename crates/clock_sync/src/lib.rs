//! # Clock synchronization
//!
//! Corrects the persisted wall-clock start of recordings made on devices
//! with independent clocks. One reference recording's start is ground
//! truth; every target's start is recomputed from the delta between the
//! two devices' hardware tick counters and patched in place only when the
//! stored value disagrees.

mod synchronizer;
mod tick;

pub use synchronizer::{ClockSynchronizer, FsStore, RecordingStore, SyncPhase};
pub use tick::{delta_ticks_to_millis, extrapolate_first_tick, step_ticks};
