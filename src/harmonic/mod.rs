//! Harmonic XABCD pattern building blocks
//!
//! - [`fibonacci`] - retracement / extension price levels and ratio ranges
//! - [`swing`] - swing point extraction and the optional ATR significance filter
//! - [`catalog`] - the six pattern families and their ratio table
//! - [`matcher`] - the generic X -> A -> B -> C -> D search

pub mod catalog;
pub mod fibonacci;
pub mod matcher;
pub mod swing;

pub use catalog::{CProjection, DProjection, PatternCatalog, PatternFamily, PatternRatios};
pub use fibonacci::{FibRange, PriceBand};
pub use matcher::{MatchResult, Matcher, MatcherConfig, XABCDCandidate};
pub use swing::{
    SignificanceFilter, SwingExtractor, SwingKind, SwingPoint, SwingProvider, SwingSet,
};
