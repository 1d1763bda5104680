//! Device-tick arithmetic.
//!
//! Wall time is persisted in epoch milliseconds; device ticks are
//! microseconds on a free-running hardware counter. The 1000:1 conversion
//! is fixed device-wide. Intermediate math stays rational so repeated
//! multiplication never accumulates rounding error.

use contracts::Ratio;

/// Microseconds per second, the tick resolution.
const TICKS_PER_SECOND: i64 = 1_000_000;

/// Ticks per millisecond of wall time.
const TICKS_PER_MILLI: i64 = 1_000;

/// Sample step expressed in device ticks, kept rational.
pub fn step_ticks(step: Ratio) -> Ratio {
    step.mul_int(TICKS_PER_SECOND)
}

/// Device tick of the conceptual first sample, extrapolated backward from
/// the first valid one.
///
/// When leading samples were lost at acquisition the stored timestamps
/// begin at `first_valid_index`; walking back `first_valid_index` steps
/// recovers the tick the recording would have started at.
pub fn extrapolate_first_tick(first_valid_tick: u64, first_valid_index: usize, step: Ratio) -> i64 {
    let offset = step_ticks(step)
        .mul_int(first_valid_index as i64)
        .round_half_down_i64();
    first_valid_tick as i64 - offset
}

/// Tick delta converted to milliseconds, rounded to nearest with halves
/// away from zero. The delta is signed: a target may have started before
/// the reference.
pub fn delta_ticks_to_millis(target_tick: i64, reference_tick: i64) -> i64 {
    let delta = target_tick - reference_tick;
    let half = TICKS_PER_MILLI / 2;
    if delta >= 0 {
        (delta + half) / TICKS_PER_MILLI
    } else {
        (delta - half) / TICKS_PER_MILLI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_ticks_exact_for_100ms() {
        assert_eq!(step_ticks(Ratio::new(1, 10)), Ratio::from_int(100_000));
    }

    #[test]
    fn test_step_ticks_stays_rational_for_ntsc_rates() {
        // 1/29.97 s steps have no exact tick count; the rational form does.
        let step = Ratio::new(1001, 30_000);
        assert_eq!(step_ticks(step), Ratio::new(1_001_000_000, 30_000));
    }

    #[test]
    fn test_extrapolation_walks_back_whole_steps() {
        // First valid sample is index 1, 100 ms steps.
        let tick = extrapolate_first_tick(1_500_000, 1, Ratio::new(1, 10));
        assert_eq!(tick, 1_400_000);
    }

    #[test]
    fn test_extrapolation_noop_when_first_sample_valid() {
        assert_eq!(
            extrapolate_first_tick(1_500_000, 0, Ratio::new(1, 10)),
            1_500_000
        );
    }

    #[test]
    fn test_delta_rounds_to_nearest_millisecond() {
        assert_eq!(delta_ticks_to_millis(500_000, 0), 500);
        assert_eq!(delta_ticks_to_millis(500_499, 0), 500);
        assert_eq!(delta_ticks_to_millis(500_500, 0), 501);
    }

    #[test]
    fn test_negative_delta_rounds_away_from_zero() {
        assert_eq!(delta_ticks_to_millis(0, 500_000), -500);
        assert_eq!(delta_ticks_to_millis(0, 500_500), -501);
        assert_eq!(delta_ticks_to_millis(0, 500_499), -500);
    }
}
