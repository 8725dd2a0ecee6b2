//! Fibonacci retracement / extension arithmetic
//!
//! All price levels are rounded to [`PRICE_DECIMALS`] places so that bound edges
//! computed from different legs compare equal instead of differing in the last ulp.

use serde::{Deserialize, Serialize};

/// Decimal places kept on every projected price level
pub const PRICE_DECIMALS: i32 = 6;

#[inline]
pub fn round6(value: f64) -> f64 {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (value * scale).round() / scale
}

/// Level `ratio` of the way back down from `high` toward `low`.
#[inline]
pub fn retracement_up(low: f64, high: f64, ratio: f64) -> f64 {
    round6(high - (high - low) * ratio)
}

/// Level `ratio` of the way back up from `low` toward `high`.
#[inline]
pub fn retracement_down(low: f64, high: f64, ratio: f64) -> f64 {
    round6(low + (high - low) * ratio)
}

/// Level `ratio` of the leg projected above `high`.
#[inline]
pub fn extension_up(low: f64, high: f64, ratio: f64) -> f64 {
    round6(high + (high - low) * ratio)
}

/// Level `ratio` of the leg projected below `low`.
#[inline]
pub fn extension_down(low: f64, high: f64, ratio: f64) -> f64 {
    round6(low - (high - low) * ratio)
}

// ============================================================
// RATIO RANGES
// ============================================================

/// Inclusive interval of Fibonacci ratios, always stored with `min <= max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct FibRange {
    min: f64,
    max: f64,
}

impl FibRange {
    /// Bounds may be given in either order.
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[doc(hidden)]
    pub const fn new_const(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Degenerate range holding a single ratio
    pub fn point(ratio: f64) -> Self {
        Self::new(ratio, ratio)
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }

    /// Relax both ends outward by a relative margin:
    /// `[min - |min| * t, max + |max| * t]`.
    pub fn widen(&self, tolerance: f64) -> Self {
        if tolerance <= 0.0 {
            return *self;
        }
        Self::new(
            self.min - self.min.abs() * tolerance,
            self.max + self.max.abs() * tolerance,
        )
    }
}

impl From<(f64, f64)> for FibRange {
    fn from((a, b): (f64, f64)) -> Self {
        FibRange::new(a, b)
    }
}

impl From<FibRange> for (f64, f64) {
    fn from(r: FibRange) -> Self {
        (r.min, r.max)
    }
}

// ============================================================
// PRICE BANDS
// ============================================================

/// Inclusive price interval projected from a ratio range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub lo: f64,
    pub hi: f64,
}

impl PriceBand {
    /// Build a band from two projected levels. The projection formulas invert the
    /// ratio order on one side of the leg, so the levels are normalized here.
    pub fn from_levels(a: f64, b: f64) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lo && price <= self.hi
    }

    /// Overlap of two bands, `None` when they are disjoint
    pub fn intersect(&self, other: &PriceBand) -> Option<PriceBand> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        (lo <= hi).then_some(PriceBand { lo, hi })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retracement_identities() {
        assert_eq!(retracement_up(100.0, 150.0, 0.0), 150.0);
        assert_eq!(retracement_up(100.0, 150.0, 1.0), 100.0);
        assert_eq!(retracement_down(100.0, 150.0, 0.0), 100.0);
        assert_eq!(retracement_down(100.0, 150.0, 1.0), 150.0);
    }

    #[test]
    fn test_extension_identities() {
        assert_eq!(extension_up(100.0, 150.0, 0.0), 150.0);
        assert_eq!(extension_up(100.0, 150.0, 1.0), 200.0);
        assert_eq!(extension_down(100.0, 150.0, 0.0), 100.0);
        assert_eq!(extension_down(100.0, 150.0, 1.0), 50.0);
    }

    #[test]
    fn test_common_levels() {
        assert_eq!(retracement_up(100.0, 150.0, 0.382), 130.9);
        assert_eq!(retracement_up(100.0, 150.0, 0.618), 119.1);
        assert_eq!(retracement_up(100.0, 180.0, 0.786), 117.12);
        assert_eq!(extension_up(125.0, 150.0, 1.13), 178.25);
    }

    #[test]
    fn test_rounding_to_six_places() {
        assert_eq!(round6(0.1 + 0.2), 0.3);
        assert_eq!(round6(1.234_567_89), 1.234_568);
        assert_eq!(retracement_down(0.1, 0.3, 0.5), 0.2);
    }

    #[test]
    fn test_negative_and_zero_ratio_pass_through() {
        assert_eq!(retracement_up(10.0, 20.0, -0.5), 25.0);
        assert_eq!(extension_down(10.0, 20.0, 0.0), 10.0);
    }

    #[test]
    fn test_fib_range_normalizes() {
        let r = FibRange::new(0.618, 0.382);
        assert_eq!(r.min(), 0.382);
        assert_eq!(r.max(), 0.618);
        assert!(r.contains(0.5));
        assert!(!r.contains(0.7));
    }

    #[test]
    fn test_fib_range_widen() {
        let r = FibRange::point(0.786).widen(0.02);
        assert!((r.min() - 0.786 * 0.98).abs() < 1e-12);
        assert!((r.max() - 0.786 * 1.02).abs() < 1e-12);
        assert_eq!(FibRange::point(0.5).widen(0.0), FibRange::point(0.5));
    }

    #[test]
    fn test_fib_range_widen_negative_bounds() {
        let r = FibRange::new(-0.5, -0.2).widen(0.1);
        assert!((r.min() - -0.55).abs() < 1e-12);
        assert!((r.max() - -0.18).abs() < 1e-12);
        assert!(r.contains(-0.52));

        let r = FibRange::new(-0.4, 0.6).widen(0.5);
        assert!((r.min() - -0.6).abs() < 1e-12);
        assert!((r.max() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_price_band_intersect() {
        let a = PriceBand::from_levels(120.0, 110.0);
        let b = PriceBand::from_levels(115.0, 130.0);
        let both = a.intersect(&b).unwrap();
        assert_eq!(both.lo, 115.0);
        assert_eq!(both.hi, 120.0);

        let c = PriceBand::from_levels(90.0, 100.0);
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_degenerate_band_is_a_point() {
        let band = PriceBand::from_levels(retracement_up(100.0, 100.0, 0.382), 100.0);
        assert!(band.contains(100.0));
        assert!(!band.contains(100.000_001));
    }
}
