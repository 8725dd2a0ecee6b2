//! Parameter metadata for tunable components
//!
//! Swing extraction and the XABCD search both expose their knobs through
//! [`Parameterized`], which enables:
//! - Grid search over swing and matcher settings
//! - Parameter documentation
//! - Construction from loosely-typed key/value maps
//!
//! # Example
//!
//! ```rust
//! use harmonix::params::Parameterized;
//! use harmonix::prelude::*;
//!
//! for param in SwingExtractor::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{PatternError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Period value (positive integer)
  Period,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "lookback")
  pub name: &'static str,
  /// Parameter type (Ratio or Period)
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// All values for grid search, `min..=max` by `step`
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 {
      return vec![min];
    }
    let mut values = Vec::new();
    let mut i = 0u32;
    loop {
      let v = min + step * f64::from(i);
      if v > max + f64::EPSILON {
        break;
      }
      values.push(v);
      i += 1;
    }
    values
  }

  /// Check a value against the optimization range and the parameter type
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(PatternError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Components that can be built from a parameter map
pub trait Parameterized: Sized {
  /// Metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Build from a map. Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Default value of every parameter, keyed by name
  fn default_params() -> HashMap<&'static str, f64> {
    Self::param_meta().iter().map(|m| (m.name, m.default)).collect()
  }

  /// Rejects unknown keys and values outside the documented ranges
  fn validate_params(params: &HashMap<&str, f64>) -> Result<()> {
    let meta = Self::param_meta();
    for (key, value) in params {
      let m = meta
        .iter()
        .find(|m| m.name == *key)
        .ok_or_else(|| PatternError::InvalidConfig(format!("unknown parameter `{key}`")))?;
      m.validate(*value)?;
    }
    Ok(())
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if !value.is_finite() || value < 0.0 {
    return Err(PatternError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{harmonic::matcher::MatcherConfig, SwingExtractor};

  #[test]
  fn test_param_meta_ratio() {
    let meta = ParamMeta::ratio("tolerance", 0.0, (0.0, 0.05, 0.01), "Ratio widening");

    assert_eq!(meta.name, "tolerance");
    assert_eq!(meta.param_type, ParamType::Ratio);
    assert_eq!(meta.default, 0.0);
  }

  #[test]
  fn test_param_meta_period() {
    let meta = ParamMeta::period("lookback", 3.0, (2.0, 10.0, 1.0), "Swing window");

    assert_eq!(meta.name, "lookback");
    assert_eq!(meta.param_type, ParamType::Period);
    assert_eq!(meta.default, 3.0);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < f64::EPSILON);
    assert!((grid[1] - 0.5).abs() < f64::EPSILON);
    assert!((grid[2] - 0.7).abs() < 1e-12);
  }

  #[test]
  fn test_generate_grid_zero_step() {
    let meta = ParamMeta::period("test", 3.0, (3.0, 9.0, 0.0), "Test");
    assert_eq!(meta.generate_grid(), vec![3.0]);
  }

  #[test]
  fn test_validate_ratio() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.1), "Test");

    assert!(meta.validate(0.5).is_ok());
    assert!(meta.validate(0.3).is_ok());
    assert!(meta.validate(0.7).is_ok());
    assert!(meta.validate(0.2).is_err());
    assert!(meta.validate(0.8).is_err());
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("test", 14.0, (10.0, 20.0, 2.0), "Test");

    assert!(meta.validate(14.0).is_ok());
    assert!(meta.validate(10.0).is_ok());
    assert!(meta.validate(12.5).is_err());
    assert!(meta.validate(8.0).is_err());
    assert!(meta.validate(22.0).is_err());
  }

  #[test]
  fn test_get_ratio_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 0.8);

    assert!((get_ratio(&params, "key1", 0.5).unwrap().get() - 0.8).abs() < f64::EPSILON);
    assert!((get_ratio(&params, "key2", 0.5).unwrap().get() - 0.5).abs() < f64::EPSILON);
    params.insert("key3", 1.5);
    assert!(get_ratio(&params, "key3", 0.5).is_err());
  }

  #[test]
  fn test_get_period_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 20.0);
    params.insert("key2", -4.0);

    assert_eq!(get_period(&params, "key1", 14).unwrap().get(), 20);
    assert_eq!(get_period(&params, "key3", 14).unwrap().get(), 14);
    assert!(get_period(&params, "key2", 14).is_err());
  }

  #[test]
  fn test_default_params_round_trip() {
    let defaults = SwingExtractor::default_params();
    assert_eq!(defaults.get("lookback"), Some(&3.0));

    let extractor = SwingExtractor::with_params(&defaults).unwrap();
    assert_eq!(extractor, SwingExtractor::default());

    let matcher = MatcherConfig::with_params(&MatcherConfig::default_params()).unwrap();
    assert_eq!(matcher, MatcherConfig::default());
  }

  #[test]
  fn test_validate_params_rejects_unknown_key() {
    let mut params = HashMap::new();
    params.insert("lookback", 4.0);
    assert!(SwingExtractor::validate_params(&params).is_ok());

    params.insert("window", 4.0);
    assert!(matches!(
      SwingExtractor::validate_params(&params),
      Err(PatternError::InvalidConfig(_))
    ));
  }

  #[test]
  fn test_validate_params_checks_range() {
    let mut params = HashMap::new();
    params.insert("min_leg_bars", 50.0);
    assert!(matches!(
      MatcherConfig::validate_params(&params),
      Err(PatternError::OutOfRange { field: "min_leg_bars", .. })
    ));
  }
}
