//! Exact rational time arithmetic.
//!
//! Sample steps are stored as exact rationals, never floats: a 20 Hz movie
//! has a step of exactly 1/20 s, and index↔time conversion must stay exact
//! over millions of samples. All products go through `i128` intermediates
//! before reduction, so steps with large numerators/denominators cannot
//! overflow mid-computation. Floats only appear at the display boundary
//! (`to_f64`).

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Exact rational number, always stored reduced with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratio {
    num: i64,
    den: i64,
}

impl Ratio {
    /// Zero, also the "gapless" sentinel step (see `TemporalIndex::gapless`).
    pub const ZERO: Ratio = Ratio { num: 0, den: 1 };

    /// One half, used for mid-sample times and tie rounding.
    pub const HALF: Ratio = Ratio { num: 1, den: 2 };

    /// Create a reduced rational.
    ///
    /// # Panics
    /// Panics on a zero denominator. Untrusted denominators must be checked
    /// at the decode boundary before reaching this constructor.
    pub fn new(num: i64, den: i64) -> Self {
        Self::normalized(num as i128, den as i128)
    }

    /// Whole-number rational.
    pub fn from_int(value: i64) -> Self {
        Self { num: value, den: 1 }
    }

    /// Reduce an i128 fraction back into i64 storage.
    ///
    /// Reduction happens in i128 so that intermediate products from `mul`
    /// and `add` never overflow; the result must fit i64 after reduction,
    /// which is an invariant of the quantities this system handles
    /// (seconds-scale steps, epoch-scale instants).
    fn normalized(num: i128, den: i128) -> Self {
        assert!(den != 0, "rational with zero denominator");
        let sign: i128 = if den < 0 { -1 } else { 1 };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i128;
        let num = sign * num / g;
        let den = den.abs() / g;
        assert!(
            i64::try_from(num).is_ok() && i64::try_from(den).is_ok(),
            "rational overflow after reduction: {num}/{den}"
        );
        Self {
            num: num as i64,
            den: den as i64,
        }
    }

    pub fn numerator(&self) -> i64 {
        self.num
    }

    pub fn denominator(&self) -> i64 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    /// Multiply by an integer count (index arithmetic).
    pub fn mul_int(&self, count: i64) -> Self {
        Self::normalized(self.num as i128 * count as i128, self.den as i128)
    }

    /// Exact division; panics on a zero divisor.
    pub fn div(&self, rhs: Ratio) -> Self {
        Self::normalized(
            self.num as i128 * rhs.den as i128,
            self.den as i128 * rhs.num as i128,
        )
    }

    /// Largest integer `<=` self.
    pub fn floor_i64(&self) -> i64 {
        self.num.div_euclid(self.den)
    }

    /// Round to the nearest integer; exact halves round down.
    ///
    /// A time exactly half a step from both neighboring samples must map to
    /// the earlier index, so this is `ceil(x - 1/2)` rather than the usual
    /// half-up rounding.
    pub fn round_half_down_i64(&self) -> i64 {
        // ceil((2*num - den) / (2*den)) in i128
        let num = 2 * self.num as i128 - self.den as i128;
        let den = 2 * self.den as i128;
        let q = num.div_euclid(den);
        let r = num.rem_euclid(den);
        (if r == 0 { q } else { q + 1 }) as i64
    }

    /// Lossy conversion for display and logging only.
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Add for Ratio {
    type Output = Ratio;

    fn add(self, rhs: Ratio) -> Ratio {
        Ratio::normalized(
            self.num as i128 * rhs.den as i128 + rhs.num as i128 * self.den as i128,
            self.den as i128 * rhs.den as i128,
        )
    }
}

impl Sub for Ratio {
    type Output = Ratio;

    fn sub(self, rhs: Ratio) -> Ratio {
        self + (-rhs)
    }
}

impl Mul for Ratio {
    type Output = Ratio;

    fn mul(self, rhs: Ratio) -> Ratio {
        Ratio::normalized(
            self.num as i128 * rhs.num as i128,
            self.den as i128 * rhs.den as i128,
        )
    }
}

impl Neg for Ratio {
    type Output = Ratio;

    fn neg(self) -> Ratio {
        Ratio {
            num: -self.num,
            den: self.den,
        }
    }
}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive, so cross-multiplication preserves order.
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

impl From<i64> for Ratio {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Absolute wall-clock instant: rational seconds since the Unix epoch.
///
/// Persisted headers carry milliseconds; in memory the instant stays
/// rational so that `start + step * i` never accumulates rounding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Time {
    secs: Ratio,
}

impl Time {
    pub const UNIX_EPOCH: Time = Time { secs: Ratio::ZERO };

    pub fn from_secs(secs: i64) -> Self {
        Self {
            secs: Ratio::from_int(secs),
        }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            secs: Ratio::new(millis, 1000),
        }
    }

    pub fn from_ratio(secs: Ratio) -> Self {
        Self { secs }
    }

    pub fn as_secs_ratio(&self) -> Ratio {
        self.secs
    }

    /// Milliseconds since epoch, floored (matches the at-rest header field).
    pub fn to_millis_floor(&self) -> i64 {
        self.secs.mul_int(1000).floor_i64()
    }
}

impl Add<Ratio> for Time {
    type Output = Time;

    fn add(self, rhs: Ratio) -> Time {
        Time {
            secs: self.secs + rhs,
        }
    }
}

impl Sub<Ratio> for Time {
    type Output = Time;

    fn sub(self, rhs: Ratio) -> Time {
        Time {
            secs: self.secs - rhs,
        }
    }
}

impl Sub for Time {
    type Output = Ratio;

    fn sub(self, rhs: Time) -> Ratio {
        self.secs - rhs.secs
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.to_millis_floor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction() {
        let r = Ratio::new(6, 4);
        assert_eq!(r.numerator(), 3);
        assert_eq!(r.denominator(), 2);

        let r = Ratio::new(3, -6);
        assert_eq!(r.numerator(), -1);
        assert_eq!(r.denominator(), 2);
    }

    #[test]
    fn test_equality_ignores_representation() {
        assert_eq!(Ratio::new(1, 2), Ratio::new(2, 4));
        assert_ne!(Ratio::new(1, 2), Ratio::new(1, 3));
    }

    #[test]
    fn test_ordering_cross_multiplies() {
        assert!(Ratio::new(1, 3) < Ratio::new(1, 2));
        assert!(Ratio::new(-1, 2) < Ratio::ZERO);
        assert!(Ratio::new(7, 3) > Ratio::new(2, 1));
    }

    #[test]
    fn test_widened_products_do_not_overflow() {
        // Large microsecond-denominated step times a large frame index:
        // the raw i64 product of numerators would overflow.
        let step = Ratio::new(1_000_000_007, 30_000_000);
        let scaled = step.mul_int(40_000_000_000);
        // 1_000_000_007 * 40e9 / 30e6 reduces exactly.
        assert_eq!(scaled, Ratio::new(4_000_000_028_000, 3));
    }

    #[test]
    fn test_round_half_down() {
        assert_eq!(Ratio::new(5, 2).round_half_down_i64(), 2);
        assert_eq!(Ratio::new(7, 2).round_half_down_i64(), 3);
        assert_eq!(Ratio::new(12, 5).round_half_down_i64(), 2);
        assert_eq!(Ratio::new(13, 5).round_half_down_i64(), 3);
        assert_eq!(Ratio::new(-5, 2).round_half_down_i64(), -3);
    }

    #[test]
    fn test_floor() {
        assert_eq!(Ratio::new(7, 2).floor_i64(), 3);
        assert_eq!(Ratio::new(-7, 2).floor_i64(), -4);
        assert_eq!(Ratio::from_int(5).floor_i64(), 5);
    }

    #[test]
    fn test_time_millis_round_trip() {
        let t = Time::from_millis(1_700_000_000_123);
        assert_eq!(t.to_millis_floor(), 1_700_000_000_123);

        let later = t + Ratio::new(1, 2);
        assert_eq!(later.to_millis_floor(), 1_700_000_000_623);
        assert_eq!(later - t, Ratio::new(1, 2));
    }

    #[test]
    #[should_panic(expected = "zero denominator")]
    fn test_zero_denominator_panics() {
        let _ = Ratio::new(1, 0);
    }
}
