//! Harmonic pattern families and their Fibonacci ratio table

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::fibonacci::FibRange;
use crate::{Direction, PatternError, Result};

// ============================================================
// FAMILIES
// ============================================================

/// The six supported harmonic pattern families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatternFamily {
    Cypher,
    Bat,
    Gartley,
    Butterfly,
    Crab,
    Shark,
}

impl PatternFamily {
    /// All families in catalog order
    pub const ALL: [PatternFamily; 6] = [
        PatternFamily::Cypher,
        PatternFamily::Bat,
        PatternFamily::Gartley,
        PatternFamily::Butterfly,
        PatternFamily::Crab,
        PatternFamily::Shark,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternFamily::Cypher => "CYPHER",
            PatternFamily::Bat => "BAT",
            PatternFamily::Gartley => "GARTLEY",
            PatternFamily::Butterfly => "BUTTERFLY",
            PatternFamily::Crab => "CRAB",
            PatternFamily::Shark => "SHARK",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            PatternFamily::Cypher => "Cypher",
            PatternFamily::Bat => "Bat",
            PatternFamily::Gartley => "Gartley",
            PatternFamily::Butterfly => "Butterfly",
            PatternFamily::Crab => "Crab",
            PatternFamily::Shark => "Shark",
        }
    }

    /// Human-readable label, e.g. `"Bearish Gartley"`
    pub fn label(self, direction: Direction) -> String {
        format!("{} {}", direction.as_str(), self.display_name())
    }

    /// How the C bound is projected from the AB leg
    pub fn c_projection(self) -> CProjection {
        match self {
            PatternFamily::Cypher | PatternFamily::Shark => CProjection::AbExtension,
            _ => CProjection::AbRetracement,
        }
    }

    /// Which leg anchors the D bound
    pub fn d_projection(self) -> DProjection {
        match self {
            PatternFamily::Bat => DProjection::XaRetracement,
            PatternFamily::Butterfly | PatternFamily::Crab => DProjection::XaExtension,
            PatternFamily::Cypher | PatternFamily::Gartley | PatternFamily::Shark => {
                DProjection::XcRetracement
            },
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PatternFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternFamily {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        PatternFamily::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PatternError::UnknownPattern(s.to_string()))
    }
}

// ============================================================
// PROJECTION STRATEGIES
// ============================================================

/// C is either projected beyond A along the AB leg, or taken back inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CProjection {
    AbExtension,
    AbRetracement,
}

/// D is measured against the XA leg or the XC leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DProjection {
    /// Retracement of XA measured from A
    XaRetracement,
    /// Ratio of XA measured from A that lands beyond X (ratio > 1)
    XaExtension,
    /// Retracement of XC measured from C
    XcRetracement,
}

// ============================================================
// RATIOS
// ============================================================

/// Ratio bounds for one pattern family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternRatios {
    /// B as a retracement of XA
    pub b: FibRange,
    /// C relative to AB
    pub c: FibRange,
    /// D relative to XA or XC
    pub d: FibRange,
    /// Additional D bound relative to BC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d_bc: Option<FibRange>,
}

impl PatternRatios {
    pub fn new(b: FibRange, c: FibRange, d: FibRange) -> Self {
        Self { b, c, d, d_bc: None }
    }

    pub fn with_d_bc(mut self, d_bc: FibRange) -> Self {
        self.d_bc = Some(d_bc);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut ranges = vec![("b", self.b), ("c", self.c), ("d", self.d)];
        if let Some(d_bc) = self.d_bc {
            ranges.push(("d_bc", d_bc));
        }
        for (name, r) in ranges {
            if !r.min().is_finite() || !r.max().is_finite() {
                return Err(PatternError::InvalidConfig(format!(
                    "ratio range `{name}` must be finite"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================
// CATALOG
// ============================================================

const fn range(min: f64, max: f64) -> FibRange {
    FibRange::new_const(min, max)
}

/// Ratio table indexed by [`PatternFamily`]
#[derive(Debug, Clone, PartialEq)]
pub struct PatternCatalog {
    entries: [PatternRatios; 6],
}

impl Default for PatternCatalog {
    fn default() -> Self {
        let entries = [
            // Cypher
            PatternRatios {
                b: range(0.382, 0.618),
                c: range(1.13, 1.414),
                d: range(0.782, 0.79),
                d_bc: None,
            },
            // Bat
            PatternRatios {
                b: range(0.382, 0.5),
                c: range(0.382, 0.886),
                d: range(0.88, 0.89),
                d_bc: Some(range(1.618, 2.618)),
            },
            // Gartley
            PatternRatios {
                b: range(0.61, 0.628),
                c: range(0.382, 0.886),
                d: range(0.782, 0.79),
                d_bc: None,
            },
            // Butterfly
            PatternRatios {
                b: range(0.78, 0.792),
                c: range(0.382, 0.886),
                d: range(1.27, 1.618),
                d_bc: None,
            },
            // Crab
            PatternRatios {
                b: range(0.382, 0.618),
                c: range(0.382, 0.886),
                d: range(1.618, 1.628),
                d_bc: None,
            },
            // Shark
            PatternRatios {
                b: range(0.382, 0.618),
                c: range(1.13, 1.618),
                d: range(0.88, 0.89),
                d_bc: None,
            },
        ];
        Self { entries }
    }
}

impl PatternCatalog {
    #[inline]
    pub fn get(&self, family: PatternFamily) -> &PatternRatios {
        &self.entries[family.slot()]
    }

    pub fn set(&mut self, family: PatternFamily, ratios: PatternRatios) {
        self.entries[family.slot()] = ratios;
    }

    /// Look up ratios by family name (case-insensitive)
    pub fn ratios_by_name(&self, name: &str) -> Result<&PatternRatios> {
        let family: PatternFamily = name.parse()?;
        Ok(self.get(family))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatternFamily, &PatternRatios)> {
        PatternFamily::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    pub fn validate(&self) -> Result<()> {
        for (family, ratios) in self.iter() {
            ratios.validate().map_err(|e| match e {
                PatternError::InvalidConfig(msg) => {
                    PatternError::InvalidConfig(format!("{family}: {msg}"))
                },
                other => other,
            })?;
        }
        Ok(())
    }
}
