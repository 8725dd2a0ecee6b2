//! Swing point extraction
//!
//! A swing low is a bar whose low is not undercut (beyond a small sensitivity margin)
//! by any bar within `lookback` positions on either side; swing highs are the mirror.
//! Swings of the same kind closer than `min_spacing` bars are merged, keeping the
//! more extreme one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    params::{get_period, get_ratio, ParamMeta, Parameterized},
    OHLCExt, PatternError, Period, Ratio, Result, OHLC,
};

// ============================================================
// TYPES
// ============================================================

/// Which extremum of the bar a swing point marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    Low,
    High,
}

impl SwingKind {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            SwingKind::Low => SwingKind::High,
            SwingKind::High => SwingKind::Low,
        }
    }
}

/// A local extremum in a bar series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Position of the bar in the scanned slice
    pub index: usize,
    pub kind: SwingKind,
    /// The bar's low for [`SwingKind::Low`], its high for [`SwingKind::High`]
    pub price: f64,
    /// Open time of the bar, when the data carries one
    pub time: Option<i64>,
}

impl SwingPoint {
    pub fn from_bar<T: OHLC>(index: usize, bar: &T, kind: SwingKind) -> Self {
        let price = match kind {
            SwingKind::Low => bar.low(),
            SwingKind::High => bar.high(),
        };
        Self {
            index,
            kind,
            price,
            time: bar.timestamp(),
        }
    }

    /// Lower low for swing lows, higher high for swing highs
    #[inline]
    pub fn is_more_extreme_than(&self, other: &SwingPoint) -> bool {
        match self.kind {
            SwingKind::Low => self.price < other.price,
            SwingKind::High => self.price > other.price,
        }
    }
}

/// Swing lows and highs of one series, each ordered by ascending bar index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingSet {
    pub lows: Vec<SwingPoint>,
    pub highs: Vec<SwingPoint>,
}

impl SwingSet {
    #[inline]
    pub fn of_kind(&self, kind: SwingKind) -> &[SwingPoint] {
        match kind {
            SwingKind::Low => &self.lows,
            SwingKind::High => &self.highs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lows.is_empty() && self.highs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lows.len() + self.highs.len()
    }
}

// ============================================================
// PROVIDER TRAIT
// ============================================================

/// Source of swing points for the pattern engine
pub trait SwingProvider: Send + Sync {
    fn extract<T: OHLC>(&self, bars: &[T]) -> SwingSet;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// DEFAULT EXTRACTOR
// ============================================================

/// Lookback-window swing extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingExtractor {
    /// Bars that must exist on each side of a candidate
    pub lookback: Period,
    /// Relative margin a neighbour must exceed to disqualify a candidate
    pub sensitivity: Ratio,
    /// Minimum index distance between two swings of the same kind
    pub min_spacing: Period,
}

impl Default for SwingExtractor {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(3),
            sensitivity: Ratio::new_const(0.0001),
            min_spacing: Period::new_const(3),
        }
    }
}

impl SwingExtractor {
    pub fn new(lookback: Period, sensitivity: Ratio, min_spacing: Period) -> Self {
        Self {
            lookback,
            sensitivity,
            min_spacing,
        }
    }

    /// Minimum series length that can yield any swing point
    #[inline]
    pub fn min_bars(&self) -> usize {
        2 * self.lookback.get() + 1
    }

    fn is_swing_low<T: OHLC>(&self, bars: &[T], i: usize) -> bool {
        let lookback = self.lookback.get();
        let floor = bars[i].low() * (1.0 - self.sensitivity.get());
        (1..=lookback).all(|j| bars[i - j].low() >= floor && bars[i + j].low() >= floor)
    }

    fn is_swing_high<T: OHLC>(&self, bars: &[T], i: usize) -> bool {
        let lookback = self.lookback.get();
        let ceiling = bars[i].high() * (1.0 + self.sensitivity.get());
        (1..=lookback).all(|j| bars[i - j].high() <= ceiling && bars[i + j].high() <= ceiling)
    }
}

/// Append `point`, or fold it into the last swing when the two are too close.
fn push_spaced(points: &mut Vec<SwingPoint>, point: SwingPoint, min_spacing: usize) {
    match points.last_mut() {
        Some(last) if point.index - last.index < min_spacing => {
            if point.is_more_extreme_than(last) {
                *last = point;
            }
        },
        _ => points.push(point),
    }
}

impl SwingProvider for SwingExtractor {
    fn extract<T: OHLC>(&self, bars: &[T]) -> SwingSet {
        let mut set = SwingSet::default();
        if bars.len() < self.min_bars() {
            return set;
        }

        let lookback = self.lookback.get();
        let min_spacing = self.min_spacing.get();

        for i in lookback..bars.len() - lookback {
            if self.is_swing_low(bars, i) {
                push_spaced(
                    &mut set.lows,
                    SwingPoint::from_bar(i, &bars[i], SwingKind::Low),
                    min_spacing,
                );
            }
            if self.is_swing_high(bars, i) {
                push_spaced(
                    &mut set.highs,
                    SwingPoint::from_bar(i, &bars[i], SwingKind::High),
                    min_spacing,
                );
            }
        }

        tracing::debug!(
            bars = bars.len(),
            swing_lows = set.lows.len(),
            swing_highs = set.highs.len(),
            "extracted swing points"
        );
        set
    }
}

static SWING_EXTRACTOR_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "lookback",
        3.0,
        (2.0, 10.0, 1.0),
        "Bars on each side a swing must dominate",
    ),
    ParamMeta::ratio(
        "sensitivity",
        0.0001,
        (0.0, 0.001, 0.0001),
        "Relative margin a neighbour must exceed to break a swing",
    ),
    ParamMeta::period(
        "min_spacing",
        3.0,
        (1.0, 10.0, 1.0),
        "Minimum bars between swings of the same kind",
    ),
];

impl Parameterized for SwingExtractor {
    fn param_meta() -> &'static [ParamMeta] {
        SWING_EXTRACTOR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 3)?,
            sensitivity: get_ratio(params, "sensitivity", 0.0001)?,
            min_spacing: get_period(params, "min_spacing", 3)?,
        })
    }
}

// ============================================================
// SIGNIFICANCE FILTER
// ============================================================

/// Drops swings whose amplitude to the nearest opposite swing is small
/// relative to the average true range of the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceFilter {
    /// Number of leading true ranges averaged into the ATR
    pub atr_period: Period,
    /// Minimum amplitude as a multiple of ATR
    pub min_amplitude: f64,
}

impl Default for SignificanceFilter {
    fn default() -> Self {
        Self {
            atr_period: Period::new_const(14),
            min_amplitude: 0.5,
        }
    }
}

impl SignificanceFilter {
    pub fn validate_config(&self) -> Result<()> {
        if !self.min_amplitude.is_finite() || self.min_amplitude < 0.0 {
            return Err(PatternError::InvalidValue(
                "min_amplitude must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Average true range over the first `atr_period` bar transitions.
    /// `None` for series with fewer than two bars.
    pub fn average_true_range<T: OHLC>(&self, bars: &[T]) -> Option<f64> {
        let ranges: Vec<f64> = bars
            .windows(2)
            .take(self.atr_period.get())
            .map(|w| {
                let (prev, cur) = (&w[0], &w[1]);
                cur.range()
                    .max((cur.high() - prev.close()).abs())
                    .max((cur.low() - prev.close()).abs())
            })
            .collect();
        if ranges.is_empty() {
            return None;
        }
        Some(ranges.iter().sum::<f64>() / ranges.len() as f64)
    }

    pub fn apply<T: OHLC>(&self, bars: &[T], swings: &SwingSet) -> SwingSet {
        let Some(atr) = self.average_true_range(bars) else {
            return swings.clone();
        };
        let threshold = atr * self.min_amplitude;

        let keep = |point: &SwingPoint, opposite: &[SwingPoint]| match nearest(point, opposite) {
            None => true,
            Some(other) => {
                let amplitude = match point.kind {
                    SwingKind::Low => other.price - point.price,
                    SwingKind::High => point.price - other.price,
                };
                amplitude >= threshold
            },
        };

        let filtered = SwingSet {
            lows: swings
                .lows
                .iter()
                .filter(|p| keep(*p, swings.highs.as_slice()))
                .copied()
                .collect(),
            highs: swings
                .highs
                .iter()
                .filter(|p| keep(*p, swings.lows.as_slice()))
                .copied()
                .collect(),
        };

        tracing::debug!(
            atr,
            dropped = swings.len() - filtered.len(),
            "filtered insignificant swings"
        );
        filtered
    }
}

/// Closest point by index distance; the earlier one wins ties.
fn nearest<'a>(point: &SwingPoint, candidates: &'a [SwingPoint]) -> Option<&'a SwingPoint> {
    candidates
        .iter()
        .fold(None, |best: Option<&SwingPoint>, c| match best {
            Some(b) if b.index.abs_diff(point.index) <= c.index.abs_diff(point.index) => Some(b),
            _ => Some(c),
        })
}
