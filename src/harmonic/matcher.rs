//! XABCD chain search
//!
//! One search serves every family and both orientations. The family only
//! contributes data: its [`PatternRatios`] and the [`CProjection`] / [`DProjection`]
//! strategies. The orientation decides which swing kind plays which role.
//!
//! Roles for a bullish chain (bearish swaps lows and highs):
//!
//! ```text
//!            A                C
//!           / \              / \
//!          /   \    ...     /   \
//!         /     B          /     \
//!        /                        D
//!       X
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    catalog::{CProjection, DProjection, PatternFamily, PatternRatios},
    fibonacci::{
        extension_down, extension_up, retracement_down, retracement_up, FibRange, PriceBand,
    },
    swing::{SwingKind, SwingPoint, SwingSet},
};
use crate::{
    params::{get_period, get_ratio, ParamMeta, Parameterized},
    Direction, Period, Ratio, Result, OHLC,
};

// ============================================================
// CONFIG
// ============================================================

/// Search settings shared by every family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum bar distance between X and A
    pub min_leg_bars: Period,
    /// Relative widening applied to every ratio range before projecting prices
    pub tolerance: Ratio,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_leg_bars: Period::new_const(10),
            tolerance: Ratio::new_const(0.0),
        }
    }
}

static MATCHER_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "min_leg_bars",
        10.0,
        (5.0, 30.0, 5.0),
        "Minimum bars between X and A",
    ),
    ParamMeta::ratio(
        "tolerance",
        0.0,
        (0.0, 0.05, 0.01),
        "Relative widening of every Fibonacci ratio range",
    ),
];

impl Parameterized for MatcherConfig {
    fn param_meta() -> &'static [ParamMeta] {
        MATCHER_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            min_leg_bars: get_period(params, "min_leg_bars", 10)?,
            tolerance: get_ratio(params, "tolerance", 0.0)?,
        })
    }
}

// ============================================================
// RESULTS
// ============================================================

/// X, A, B and C of a chain that has at least one admissible D
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XABCDCandidate {
    pub family: PatternFamily,
    pub direction: Direction,
    pub x: SwingPoint,
    pub a: SwingPoint,
    pub b: SwingPoint,
    pub c: SwingPoint,
}

/// A completed chain with every admissible D, ascending by bar index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: XABCDCandidate,
    pub d: Vec<SwingPoint>,
}

impl MatchResult {
    #[inline]
    pub fn family(&self) -> PatternFamily {
        self.candidate.family
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.candidate.direction
    }

    /// e.g. `"Bullish Cypher"`
    pub fn label(&self) -> String {
        self.candidate.family.label(self.candidate.direction)
    }

    #[inline]
    pub fn x(&self) -> &SwingPoint {
        &self.candidate.x
    }

    #[inline]
    pub fn a(&self) -> &SwingPoint {
        &self.candidate.a
    }

    #[inline]
    pub fn b(&self) -> &SwingPoint {
        &self.candidate.b
    }

    #[inline]
    pub fn c(&self) -> &SwingPoint {
        &self.candidate.c
    }

    pub fn d_prices(&self) -> Vec<f64> {
        self.d.iter().map(|p| p.price).collect()
    }

    pub fn d_indices(&self) -> Vec<usize> {
        self.d.iter().map(|p| p.index).collect()
    }

    /// Bar index of the first bar of the pattern (X)
    #[inline]
    pub fn start_index(&self) -> usize {
        self.candidate.x.index
    }

    /// Bar index of the latest admissible D
    pub fn end_index(&self) -> usize {
        self.d.last().map_or(self.candidate.c.index, |p| p.index)
    }
}

// ============================================================
// PRICE PROJECTION
// ============================================================

/// Level `ratio` of the leg `start -> end`, measured from `end` back toward `start`.
/// `up` tells whether the leg rises.
#[inline]
fn retrace(up: bool, start: f64, end: f64, ratio: f64) -> f64 {
    if up {
        retracement_up(start, end, ratio)
    } else {
        retracement_down(end, start, ratio)
    }
}

/// Level `ratio` of the leg `start -> end`, projected past `end`.
#[inline]
fn extend(up: bool, start: f64, end: f64, ratio: f64) -> f64 {
    if up {
        extension_up(start, end, ratio)
    } else {
        extension_down(end, start, ratio)
    }
}

fn band(range: FibRange, tolerance: f64, level: impl Fn(f64) -> f64) -> PriceBand {
    let range = range.widen(tolerance);
    PriceBand::from_levels(level(range.min()), level(range.max()))
}

// ============================================================
// LEG CHECKS
// ============================================================

#[inline]
fn extreme<T: OHLC>(bar: &T, kind: SwingKind) -> f64 {
    match kind {
        SwingKind::Low => bar.low(),
        SwingKind::High => bar.high(),
    }
}

/// `p` lies past `q` in the direction of `p`'s kind.
#[inline]
fn beyond(p: &SwingPoint, q: &SwingPoint) -> bool {
    match p.kind {
        SwingKind::High => p.price > q.price,
        SwingKind::Low => p.price < q.price,
    }
}

/// The other extreme of `p`'s bar does not cross `bound`.
fn contained_by<T: OHLC>(bars: &[T], p: &SwingPoint, bound: &SwingPoint) -> bool {
    let Some(bar) = bars.get(p.index) else {
        return false;
    };
    let v = extreme(bar, bound.kind);
    match bound.kind {
        SwingKind::High => v <= bound.price,
        SwingKind::Low => v >= bound.price,
    }
}

/// No bar strictly between the endpoints undercuts the low endpoint or
/// exceeds the high endpoint.
fn leg_intact<T: OHLC>(bars: &[T], p: &SwingPoint, q: &SwingPoint) -> bool {
    let (lo, hi) = match p.kind {
        SwingKind::Low => (p.price, q.price),
        SwingKind::High => (q.price, p.price),
    };
    let (from, to) = (p.index.min(q.index), p.index.max(q.index));
    if to <= from + 1 {
        return true;
    }
    bars.get(from + 1..to)
        .is_some_and(|inner| inner.iter().all(|b| b.low() >= lo && b.high() <= hi))
}

// ============================================================
// MATCHER
// ============================================================

/// Search for one family, parameterized by its ratios and projection strategies
#[derive(Debug, Clone)]
pub struct Matcher {
    pub family: PatternFamily,
    pub ratios: PatternRatios,
    pub c_projection: CProjection,
    pub d_projection: DProjection,
    pub config: MatcherConfig,
}

impl Matcher {
    pub fn new(family: PatternFamily, ratios: PatternRatios, config: MatcherConfig) -> Self {
        Self {
            family,
            ratios,
            c_projection: family.c_projection(),
            d_projection: family.d_projection(),
            config,
        }
    }

    #[inline]
    fn tolerance(&self) -> f64 {
        self.config.tolerance.get()
    }

    fn b_band(&self, up: bool, x: &SwingPoint, a: &SwingPoint) -> PriceBand {
        band(self.ratios.b, self.tolerance(), |r| retrace(up, x.price, a.price, r))
    }

    fn c_band(&self, up: bool, a: &SwingPoint, b: &SwingPoint) -> PriceBand {
        match self.c_projection {
            // B -> A continued past A
            CProjection::AbExtension => {
                band(self.ratios.c, self.tolerance(), |r| extend(up, b.price, a.price, r))
            },
            // A -> B taken back toward A
            CProjection::AbRetracement => {
                band(self.ratios.c, self.tolerance(), |r| retrace(!up, a.price, b.price, r))
            },
        }
    }

    /// `None` when the BC bound does not overlap the primary D bound.
    fn d_band(
        &self,
        up: bool,
        x: &SwingPoint,
        a: &SwingPoint,
        b: &SwingPoint,
        c: &SwingPoint,
    ) -> Option<PriceBand> {
        let tol = self.tolerance();
        let primary = match self.d_projection {
            DProjection::XaRetracement => band(self.ratios.d, tol, |r| retrace(up, x.price, a.price, r)),
            // A -> X continued past X; the ratio is quoted from A, so 1.27 lands 0.27 * XA beyond X
            DProjection::XaExtension => {
                band(self.ratios.d, tol, |r| extend(!up, a.price, x.price, r - 1.0))
            },
            DProjection::XcRetracement => band(self.ratios.d, tol, |r| retrace(up, x.price, c.price, r)),
        };
        match self.ratios.d_bc {
            Some(d_bc) => primary.intersect(&band(d_bc, tol, |r| retrace(up, b.price, c.price, r))),
            None => Some(primary),
        }
    }

    /// X must be a genuine pivot for the XA leg.
    fn valid_xa<T: OHLC>(
        &self,
        bars: &[T],
        x_points: &[SwingPoint],
        x: &SwingPoint,
        a: &SwingPoint,
    ) -> bool {
        if a.index - x.index < self.config.min_leg_bars.get() {
            return false;
        }
        if !contained_by(bars, x, a) || !leg_intact(bars, x, a) {
            return false;
        }
        !x_points
            .iter()
            .any(|p| p.index > x.index && p.index < a.index && p.is_more_extreme_than(x))
    }

    /// All chains for one orientation.
    pub fn find<T: OHLC>(
        &self,
        bars: &[T],
        swings: &SwingSet,
        direction: Direction,
    ) -> Vec<MatchResult> {
        let up = direction.is_bullish();
        let x_points = swings.of_kind(direction.x_kind());
        let a_points = swings.of_kind(direction.x_kind().opposite());
        let mut results = Vec::new();

        for (i, x) in x_points.iter().enumerate() {
            // Only record-breaking extrema start a chain.
            if i > 0 && !x.is_more_extreme_than(&x_points[i - 1]) {
                continue;
            }

            for a in a_points.iter().filter(|a| a.index > x.index && beyond(a, x)) {
                if !self.valid_xa(bars, x_points, x, a) {
                    continue;
                }

                let b_band = self.b_band(up, x, a);
                let b_points = x_points.iter().filter(|b| {
                    b.index >= a.index
                        && b_band.contains(b.price)
                        && contained_by(bars, b, a)
                        && leg_intact(bars, a, b)
                });

                for b in b_points {
                    let c_band = self.c_band(up, a, b);
                    let c_points = a_points.iter().filter(|c| {
                        c.index > b.index && c_band.contains(c.price) && leg_intact(bars, b, c)
                    });

                    for c in c_points {
                        let Some(d_band) = self.d_band(up, x, a, b, c) else {
                            continue;
                        };
                        let d: Vec<SwingPoint> = x_points
                            .iter()
                            .filter(|d| {
                                d.index > c.index
                                    && d_band.contains(d.price)
                                    && leg_intact(bars, c, d)
                            })
                            .copied()
                            .collect();

                        if !d.is_empty() {
                            results.push(MatchResult {
                                candidate: XABCDCandidate {
                                    family: self.family,
                                    direction,
                                    x: *x,
                                    a: *a,
                                    b: *b,
                                    c: *c,
                                },
                                d,
                            });
                        }
                    }
                }
            }
        }

        tracing::trace!(
            family = %self.family,
            direction = direction.as_str(),
            matches = results.len(),
            "xabcd search finished"
        );
        results
    }
}
