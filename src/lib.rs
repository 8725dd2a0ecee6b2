//! # harmonix - harmonic XABCD pattern detection
//!
//! Finds Cypher, Bat, Gartley, Butterfly, Crab and Shark patterns (bullish and
//! bearish) in OHLC bar series. Bars are reduced to swing points, then chains of
//! five swings X, A, B, C, D are matched against Fibonacci ratio bounds, with no
//! intervening bar allowed to break any leg.
//!
//! ## Quick Start
//!
//! ```rust
//! use harmonix::prelude::*;
//!
//! // Define your OHLC data
//! struct Bar { o: f64, h: f64, l: f64, c: f64 }
//!
//! impl OHLC for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//! }
//!
//! // Create engine with every family, both directions
//! let engine = EngineBuilder::new()
//!     .with_all_families()
//!     .build()
//!     .unwrap();
//!
//! // Scan your data
//! let bars: Vec<Bar> = vec![];
//! for m in engine.scan(&bars).unwrap() {
//!     println!("{} X={} D={:?}", m.label(), m.x().price, m.d_prices());
//! }
//! ```

pub mod harmonic;
pub mod params;

use harmonic::{
    MatchResult, Matcher, MatcherConfig, PatternCatalog, PatternFamily, PatternRatios,
    SignificanceFilter, SwingExtractor, SwingKind, SwingProvider, SwingSet,
};

pub mod prelude {
    pub use crate::{
        // Building blocks
        harmonic::{
            fibonacci::{extension_down, extension_up, retracement_down, retracement_up},
            CProjection, DProjection, FibRange, MatchResult, Matcher, MatcherConfig,
            PatternCatalog, PatternFamily, PatternRatios, PriceBand, SignificanceFilter,
            SwingExtractor, SwingKind, SwingPoint, SwingProvider, SwingSet, XABCDCandidate,
        },
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, Parameterized},
        // Parallel
        scan_parallel,
        // Types
        DefaultEngine,
        Direction,
        // Engine
        EngineBuilder,
        EngineConfig,
        FamilyIterator,
        FamilyMatches,
        OHLCExt,
        PatternEngine,
        // Errors
        PatternError,
        Period,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        // Core traits
        OHLC,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur during pattern detection
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown pattern: {0}")]
    UnknownPattern(String),

    #[error("Invalid OHLC at index {index}: {reason}")]
    InvalidOHLC { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core OHLC data trait
pub trait OHLC {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    /// Bar open time; must increase strictly along the series when present
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCExt: OHLC {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Validate OHLC data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(PatternError::InvalidOHLC {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(PatternError::InvalidOHLC {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidOHLC {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLC> OHLCExt for T {}

// ============================================================
// DIRECTION
// ============================================================

/// Orientation of a pattern
///
/// Bullish: X, B, D are swing lows and A, C swing highs. Bearish is the mirror.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Bullish, Direction::Bearish];

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "Bullish",
            Direction::Bearish => "Bearish",
        }
    }

    #[inline]
    pub fn mirror(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }

    /// Swing kind of X, B and D
    #[inline]
    pub fn x_kind(self) -> SwingKind {
        match self {
            Direction::Bullish => SwingKind::Low,
            Direction::Bearish => SwingKind::High,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub swing: SwingExtractor,
    pub matcher: MatcherConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<SignificanceFilter>,
    pub validate_data: bool,
}

/// Main pattern detection engine
pub struct PatternEngine<S: SwingProvider = SwingExtractor> {
    swing_provider: S,
    catalog: PatternCatalog,
    families: Vec<PatternFamily>,
    directions: Vec<Direction>,
    matcher: MatcherConfig,
    significance: Option<SignificanceFilter>,
    validate_data: bool,
}

impl<S: SwingProvider> PatternEngine<S> {
    // ===========================================
    // LOW-LEVEL: Primitives
    // ===========================================

    /// Swing points of the series, after the significance filter when one is set.
    pub fn extract_swings<T: OHLC>(&self, bars: &[T]) -> SwingSet {
        let swings = self.swing_provider.extract(bars);
        match &self.significance {
            Some(filter) => filter.apply(bars, &swings),
            None => swings,
        }
    }

    /// Search matcher for one family using this engine's catalog and settings.
    pub fn matcher(&self, family: PatternFamily) -> Matcher {
        Matcher::new(family, *self.catalog.get(family), self.matcher)
    }

    // ===========================================
    // MID-LEVEL: Single family
    // ===========================================

    /// Run one (family, direction) search over precomputed swings.
    /// User stores and reuses the swing set across calls.
    pub fn scan_family<T: OHLC>(
        &self,
        bars: &[T],
        swings: &SwingSet,
        family: PatternFamily,
        direction: Direction,
    ) -> Vec<MatchResult> {
        self.matcher(family).find(bars, swings, direction)
    }

    /// Run one family looked up by name, e.g. `"gartley"`.
    pub fn scan_named<T: OHLC>(
        &self,
        bars: &[T],
        name: &str,
        direction: Direction,
    ) -> Result<Vec<MatchResult>> {
        let family: PatternFamily = name.parse()?;
        let swings = self.checked_swings(bars)?;
        Ok(self.scan_family(bars, &swings, family, direction))
    }

    // ===========================================
    // HIGH-LEVEL: Batch processing
    // ===========================================

    /// Scan every selected family in both selected directions and return a flat list,
    /// in catalog order with bullish before bearish.
    pub fn scan<T: OHLC>(&self, bars: &[T]) -> Result<Vec<MatchResult>> {
        let swings = self.checked_swings(bars)?;

        let mut results = Vec::new();
        for (family, direction) in self.units() {
            results.extend(self.scan_family(bars, &swings, family, direction));
        }

        tracing::debug!(
            bars = bars.len(),
            swings = swings.len(),
            matches = results.len(),
            "harmonic scan finished"
        );
        Ok(results)
    }

    /// Scan and return matches grouped by (family, direction).
    pub fn scan_grouped<T: OHLC>(&self, bars: &[T]) -> Result<Vec<FamilyMatches>> {
        let swings = self.checked_swings(bars)?;

        Ok(self
            .units()
            .map(|(family, direction)| FamilyMatches {
                family,
                direction,
                matches: self.scan_family(bars, &swings, family, direction),
            })
            .collect())
    }

    /// Create an iterator yielding one (family, direction) group at a time.
    ///
    /// Bars are not validated, even with `validate_data` set. Use [`Self::try_iter`]
    /// to reject malformed input up front.
    pub fn iter<'a, T: OHLC>(&'a self, bars: &'a [T]) -> FamilyIterator<'a, T, S> {
        FamilyIterator::new(self, bars, self.extract_swings(bars))
    }

    /// Like [`Self::iter`], but validates bars first when `validate_data` is set.
    pub fn try_iter<'a, T: OHLC>(&'a self, bars: &'a [T]) -> Result<FamilyIterator<'a, T, S>> {
        let swings = self.checked_swings(bars)?;
        Ok(FamilyIterator::new(self, bars, swings))
    }

    pub fn families(&self) -> &[PatternFamily] {
        &self.families
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn units(&self) -> impl Iterator<Item = (PatternFamily, Direction)> + '_ {
        self.families
            .iter()
            .flat_map(move |&f| self.directions.iter().map(move |&d| (f, d)))
    }

    fn checked_swings<T: OHLC>(&self, bars: &[T]) -> Result<SwingSet> {
        if self.validate_data {
            validate_bars(bars)?;
        }
        Ok(self.extract_swings(bars))
    }

    fn validate(&self) -> Result<()> {
        if self.families.is_empty() {
            return Err(PatternError::InvalidConfig(
                "no pattern family selected".to_string(),
            ));
        }
        if self.directions.is_empty() {
            return Err(PatternError::InvalidConfig(
                "no direction selected".to_string(),
            ));
        }
        self.catalog.validate()?;
        self.swing_provider.validate_config()?;
        if let Some(filter) = &self.significance {
            filter.validate_config()?;
        }
        Ok(())
    }
}

impl PatternEngine<SwingExtractor> {
    /// Current settings as a serializable config
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            swing: self.swing_provider,
            matcher: self.matcher,
            significance: self.significance,
            validate_data: self.validate_data,
        }
    }
}

fn validate_bars<T: OHLC>(bars: &[T]) -> Result<()> {
    let mut last_time = None;
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            PatternError::InvalidOHLC { reason, .. } => PatternError::InvalidOHLC { index: i, reason },
            other => other,
        })?;
        if let Some(t) = bar.timestamp() {
            if last_time.is_some_and(|prev| t <= prev) {
                return Err(PatternError::InvalidOHLC {
                    index: i,
                    reason: "timestamp not increasing",
                });
            }
            last_time = Some(t);
        }
    }
    Ok(())
}

// ============================================================
// FAMILY ITERATOR
// ============================================================

/// Matches of one family in one direction
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FamilyMatches {
    pub family: PatternFamily,
    pub direction: Direction,
    pub matches: Vec<MatchResult>,
}

/// Iterator over (family, direction) groups; each search runs on `next`
pub struct FamilyIterator<'a, T: OHLC, S: SwingProvider> {
    engine: &'a PatternEngine<S>,
    bars: &'a [T],
    swings: SwingSet,
    units: Vec<(PatternFamily, Direction)>,
    current: usize,
}

impl<'a, T: OHLC, S: SwingProvider> FamilyIterator<'a, T, S> {
    fn new(engine: &'a PatternEngine<S>, bars: &'a [T], swings: SwingSet) -> Self {
        Self {
            engine,
            bars,
            swings,
            units: engine.units().collect(),
            current: 0,
        }
    }

    /// Swing points shared by every group
    pub fn swings(&self) -> &SwingSet {
        &self.swings
    }
}

impl<'a, T: OHLC, S: SwingProvider> Iterator for FamilyIterator<'a, T, S> {
    type Item = FamilyMatches;

    fn next(&mut self) -> Option<Self::Item> {
        let (family, direction) = *self.units.get(self.current)?;
        self.current += 1;

        let matches = self
            .engine
            .scan_family(self.bars, &self.swings, family, direction);
        Some(FamilyMatches {
            family,
            direction,
            matches,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.units.len().saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<'a, T: OHLC, S: SwingProvider> ExactSizeIterator for FamilyIterator<'a, T, S> {}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
pub struct EngineBuilder<S: SwingProvider = SwingExtractor> {
    swing_provider: S,
    catalog: PatternCatalog,
    families: Vec<PatternFamily>,
    directions: Vec<Direction>,
    matcher: MatcherConfig,
    min_leg_bars: Option<usize>,
    tolerance: Option<f64>,
    significance: Option<SignificanceFilter>,
    validate_data: bool,
}

impl Default for EngineBuilder<SwingExtractor> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<SwingExtractor> {
    pub fn new() -> Self {
        Self {
            swing_provider: SwingExtractor::default(),
            catalog: PatternCatalog::default(),
            families: Vec::new(),
            directions: Direction::ALL.to_vec(),
            matcher: MatcherConfig::default(),
            min_leg_bars: None,
            tolerance: None,
            significance: None,
            validate_data: false,
        }
    }

    /// Apply a full configuration, replacing swing, matcher and validation settings
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.swing_provider = config.swing;
        self.matcher = config.matcher;
        self.min_leg_bars = None;
        self.tolerance = None;
        self.significance = config.significance;
        self.validate_data = config.validate_data;
        self
    }
}

impl<S: SwingProvider> EngineBuilder<S> {
    /// Change swing provider
    pub fn swing_provider<S2: SwingProvider>(self, provider: S2) -> EngineBuilder<S2> {
        EngineBuilder {
            swing_provider: provider,
            catalog: self.catalog,
            families: self.families,
            directions: self.directions,
            matcher: self.matcher,
            min_leg_bars: self.min_leg_bars,
            tolerance: self.tolerance,
            significance: self.significance,
            validate_data: self.validate_data,
        }
    }

    /// Select all six families
    pub fn with_all_families(mut self) -> Self {
        self.families = PatternFamily::ALL.to_vec();
        self
    }

    /// Add one family
    pub fn family(mut self, family: PatternFamily) -> Self {
        self.families.push(family);
        self
    }

    /// Filter to specific families only
    pub fn only_families(mut self, families: impl IntoIterator<Item = PatternFamily>) -> Self {
        self.families = families.into_iter().collect();
        self
    }

    /// Restrict the searched orientations (both by default)
    pub fn directions(mut self, directions: impl IntoIterator<Item = Direction>) -> Self {
        self.directions = directions.into_iter().collect();
        self
    }

    /// Override one family's ratio bounds
    pub fn ratios(mut self, family: PatternFamily, ratios: PatternRatios) -> Self {
        self.catalog.set(family, ratios);
        self
    }

    /// Replace the whole ratio table
    pub fn catalog(mut self, catalog: PatternCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Minimum bar distance between X and A
    pub fn min_leg_bars(mut self, bars: usize) -> Self {
        self.min_leg_bars = Some(bars);
        self
    }

    /// Relative widening of every ratio range (0.0..=1.0)
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn significance_filter(mut self, filter: Option<SignificanceFilter>) -> Self {
        self.significance = filter;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<PatternEngine<S>> {
        let mut matcher = self.matcher;
        if let Some(bars) = self.min_leg_bars {
            matcher.min_leg_bars = Period::new(bars)?;
        }
        if let Some(tolerance) = self.tolerance {
            matcher.tolerance = Ratio::new(tolerance)?;
        }

        let mut families = self.families;
        families.sort_unstable();
        families.dedup();
        let mut directions = self.directions;
        directions.sort_unstable();
        directions.dedup();

        let engine = PatternEngine {
            swing_provider: self.swing_provider,
            catalog: self.catalog,
            families,
            directions,
            matcher,
            significance: self.significance,
            validate_data: self.validate_data,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub matches: Vec<MatchResult>,
}

/// Error from scanning a single instrument
#[derive(Debug, Clone)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Parallel scanning of multiple instruments.
///
/// Swing extraction runs once per instrument; every (instrument, family, direction)
/// search is then an independent task. Results keep the input instrument order.
pub fn scan_parallel<'a, T, I, S>(
    engine: &PatternEngine<S>,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
    S: SwingProvider,
{
    let prepared: Vec<(&str, &[T], Result<SwingSet>)> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| (symbol, bars, engine.checked_swings(bars)))
        .collect();

    let units: Vec<(PatternFamily, Direction)> = engine.units().collect();
    let found: Vec<(usize, Vec<MatchResult>)> = prepared
        .par_iter()
        .enumerate()
        .filter_map(|(i, (_, bars, swings))| swings.as_ref().ok().map(|s| (i, *bars, s)))
        .flat_map(|(i, bars, swings)| {
            units.par_iter().map(move |&(family, direction)| {
                (i, engine.scan_family(bars, swings, family, direction))
            })
        })
        .collect();

    let mut grouped = vec![Vec::new(); prepared.len()];
    for (i, matches) in found {
        grouped[i].extend(matches);
    }

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for ((symbol, _, swings), matches) in prepared.into_iter().zip(grouped) {
        match swings {
            Ok(_) => successes.push(ScanResult {
                symbol: symbol.to_string(),
                matches,
            }),
            Err(error) => {
                tracing::warn!(symbol, %error, "instrument scan failed");
                errors.push(ScanError {
                    symbol: symbol.to_string(),
                    error,
                });
            },
        }
    }

    (successes, errors)
}

// ============================================================
// TYPE ALIASES
// ============================================================

/// Default engine with the lookback-window swing extractor
pub type DefaultEngine = PatternEngine<SwingExtractor>;

// ============================================================
// TESTS
// ============================================================
