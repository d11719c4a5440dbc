use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Units accepted as duration literal suffixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    /// Parse a literal suffix, e.g. `ms` or `H`
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ms" => Some(Self::Milliseconds),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" | "H" => Some(Self::Hours),
            "d" => Some(Self::Days),
            "w" => Some(Self::Weeks),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
            Self::Weeks => "w",
        }
    }

    pub fn millis(&self) -> i64 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
            Self::Weeks => 604_800_000,
        }
    }
}

/// A signed amount of time expressed in a unit.
///
/// Equality and ordering compare the magnitude, so `1m == 60s`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Duration {
    pub value: i64,
    pub unit: TimeUnit,
}

impl Duration {
    pub fn new(value: i64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    pub fn millis(value: i64) -> Self {
        Self::new(value, TimeUnit::Milliseconds)
    }

    pub fn seconds(value: i64) -> Self {
        Self::new(value, TimeUnit::Seconds)
    }

    fn magnitude(&self) -> i128 {
        i128::from(self.value) * i128::from(self.unit.millis())
    }

    /// Total milliseconds, `None` if that does not fit in an `i64`
    pub fn to_millis(&self) -> Option<i64> {
        self.value.checked_mul(self.unit.millis())
    }

    /// Express the duration in a finer `unit`
    pub fn convert(&self, unit: TimeUnit) -> Option<Duration> {
        if unit == self.unit {
            return Some(*self);
        }
        let factor = self.unit.millis() / unit.millis();
        self.value
            .checked_mul(factor)
            .map(|value| Duration::new(value, unit))
    }

    // Both operands expressed in the finer of the two units
    fn aligned(&self, other: &Duration) -> Option<(i64, i64, TimeUnit)> {
        let unit = self.unit.min(other.unit);
        let a = self.convert(unit)?;
        let b = other.convert(unit)?;
        Some((a.value, b.value, unit))
    }

    pub fn checked_add(&self, other: &Duration) -> Option<Duration> {
        let (a, b, unit) = self.aligned(other)?;
        a.checked_add(b).map(|value| Duration::new(value, unit))
    }

    pub fn checked_sub(&self, other: &Duration) -> Option<Duration> {
        let (a, b, unit) = self.aligned(other)?;
        a.checked_sub(b).map(|value| Duration::new(value, unit))
    }

    pub fn checked_neg(&self) -> Option<Duration> {
        self.value
            .checked_neg()
            .map(|value| Duration::new(value, self.unit))
    }

    pub fn checked_mul(&self, factor: i64) -> Option<Duration> {
        self.value
            .checked_mul(factor)
            .map(|value| Duration::new(value, self.unit))
    }

    /// Integer division; keeps the unit when exact, otherwise falls back to
    /// milliseconds. `None` on a zero divisor or overflow.
    pub fn checked_div(&self, divisor: i64) -> Option<Duration> {
        if divisor == 0 {
            return None;
        }
        if self.value.checked_rem(divisor) == Some(0) {
            return self
                .value
                .checked_div(divisor)
                .map(|value| Duration::new(value, self.unit));
        }
        self.to_millis()?
            .checked_div(divisor)
            .map(Duration::millis)
    }

    /// `numerator / self`, read in this duration's unit, so `60 / 2m` is
    /// `30m`. `None` on a zero duration or overflow.
    pub fn checked_div_into(&self, numerator: i64) -> Option<Duration> {
        Duration::new(numerator, self.unit).checked_div(self.value)
    }

    /// Scale by a floating point factor, truncating to milliseconds
    pub fn scale(&self, factor: f64) -> Option<Duration> {
        let scaled = self.to_millis()? as f64 * factor;
        if !scaled.is_finite() || scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return None;
        }
        Some(Duration::millis(scaled.trunc() as i64))
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.magnitude() == other.magnitude()
    }
}

impl Eq for Duration {}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude().cmp(&other.magnitude())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}
