//! Money as integer minor units. Division by 100 is forbidden outside
//! presentation — this type only exposes integer arithmetic.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// An amount of money in integer minor units (e.g. cents). Never a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    pub const ZERO: MinorUnits = MinorUnits(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Parses a decimal string like "10.00" into minor units, assuming two
    /// decimal places (the convention used by the commerce webhook payloads).
    /// Returns `None` if the string isn't a valid decimal amount.
    pub fn from_decimal_str(s: &str) -> Option<Self> {
        let s = s.trim();
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: i64 = whole.parse().ok()?;
        let frac_padded = format!("{:0<2}", frac);
        if frac_padded.len() != 2 || !frac_padded.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let frac_value: i64 = frac_padded.parse().ok()?;
        let magnitude = whole * 100 + frac_value;
        Some(Self(if negative { -magnitude } else { magnitude }))
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Add for MinorUnits {
    type Output = MinorUnits;
    fn add(self, rhs: Self) -> Self::Output {
        MinorUnits(self.0 + rhs.0)
    }
}

impl AddAssign for MinorUnits {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for MinorUnits {
    type Output = MinorUnits;
    fn sub(self, rhs: Self) -> Self::Output {
        MinorUnits(self.0 - rhs.0)
    }
}

impl SubAssign for MinorUnits {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_decimal() {
        assert_eq!(MinorUnits::from_decimal_str("10.00"), Some(MinorUnits(1000)));
        assert_eq!(MinorUnits::from_decimal_str("0.00"), Some(MinorUnits(0)));
        assert_eq!(MinorUnits::from_decimal_str("1.5"), Some(MinorUnits(150)));
        assert_eq!(MinorUnits::from_decimal_str("3"), Some(MinorUnits(300)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(MinorUnits::from_decimal_str("abc"), None);
        assert_eq!(MinorUnits::from_decimal_str("10.999"), None);
    }

    #[test]
    fn arithmetic_stays_integer() {
        let a = MinorUnits(1000);
        let b = MinorUnits(250);
        assert_eq!(a + b, MinorUnits(1250));
        assert_eq!(a - b, MinorUnits(750));
    }
}
