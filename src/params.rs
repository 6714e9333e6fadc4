//! Parameter metadata for the wedge engine
//!
//! This module provides metadata about tuning parameters, enabling:
//! - Grid search optimization
//! - Parameter documentation
//! - Construction from loosely typed key/value maps
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use wedgefit::params::ParameterizedConfig;
//! use wedgefit::prelude::*;
//!
//! for param in WedgeConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("max_convergence", 0.2);
//! let config = WedgeConfig::with_params(&params).unwrap();
//! assert_eq!(config.max_convergence.get(), 0.2);
//! ```

use std::collections::HashMap;

use crate::detectors::{
  SearchPolicy, WedgeConfig, DIAGNOSTIC_LIMIT, HIGH_VOLUME_RATIO, MAX_CONVERGENCE,
  MAX_DURATION_HOURS, MIN_CONVERGENCE, MIN_DURATION_HOURS, MIN_HEIGHT, PIVOT_WINDOW,
  VOLUME_PERIOD,
};
use crate::{EngineConfig, PatternError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value (0.0..=1.0)
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Duration in hours (non-negative)
  Hours,
  /// Unbounded positive multiplier (e.g. a volume ratio)
  Factor,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "min_convergence")
  pub name: &'static str,
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

  pub const fn hours(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Hours, default, range, description }
  }

  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    if step <= 0.0 {
      return values;
    }
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(PatternError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Ratio | ParamType::Hours | ParamType::Factor => Ok(()),
    }
  }
}

// ============================================================
// PARAMETERIZED CONFIG TRAIT
// ============================================================

/// Trait for configuration structs that support parameterization
pub trait ParameterizedConfig: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a configuration from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

pub const WEDGE_PARAMS: &[ParamMeta] = &[
  ParamMeta::hours(
    "min_duration_hours",
    MIN_DURATION_HOURS,
    (24.0, 120.0, 24.0),
    "Shortest accepted span between the earliest and latest pivot",
  ),
  ParamMeta::hours(
    "max_duration_hours",
    MAX_DURATION_HOURS,
    (240.0, 960.0, 120.0),
    "Longest accepted span between the earliest and latest pivot",
  ),
  ParamMeta::ratio(
    "min_convergence",
    MIN_CONVERGENCE,
    (0.0, 0.1, 0.01),
    "Minimum fractional narrowing of the gap between the lines",
  ),
  ParamMeta::ratio(
    "max_convergence",
    MAX_CONVERGENCE,
    (0.1, 0.5, 0.05),
    "Maximum fractional narrowing of the gap between the lines",
  ),
  ParamMeta::ratio(
    "min_height",
    MIN_HEIGHT,
    (0.01, 0.1, 0.01),
    "Minimum wedge height relative to the highest upper-line price",
  ),
  ParamMeta::factor(
    "high_volume_ratio",
    HIGH_VOLUME_RATIO,
    (1.0, 3.0, 0.25),
    "Volume ratio at which a pivot counts as high-volume",
  ),
];

pub const ENGINE_PARAMS: &[ParamMeta] = &[
  ParamMeta::period(
    "pivot_window",
    PIVOT_WINDOW as f64,
    (2.0, 10.0, 1.0),
    "Bars on each side a pivot must dominate",
  ),
  ParamMeta::period(
    "volume_period",
    VOLUME_PERIOD as f64,
    (5.0, 50.0, 5.0),
    "Trailing bars for the volume ratio",
  ),
];

impl ParameterizedConfig for WedgeConfig {
  fn param_meta() -> &'static [ParamMeta] {
    WEDGE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let config = Self {
      min_duration_hours: get_value(params, "min_duration_hours", MIN_DURATION_HOURS)?,
      max_duration_hours: get_value(params, "max_duration_hours", MAX_DURATION_HOURS)?,
      min_convergence: get_ratio(params, "min_convergence", MIN_CONVERGENCE)?,
      max_convergence: get_ratio(params, "max_convergence", MAX_CONVERGENCE)?,
      min_height: get_ratio(params, "min_height", MIN_HEIGHT)?,
      high_volume_ratio: get_value(params, "high_volume_ratio", HIGH_VOLUME_RATIO)?,
    };
    config.validate()?;
    Ok(config)
  }
}

impl ParameterizedConfig for EngineConfig {
  fn param_meta() -> &'static [ParamMeta] {
    ENGINE_PARAMS
  }

  /// Engine knobs plus every [`WedgeConfig`] key.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self {
      wedge: WedgeConfig::with_params(params)?,
      pivot_window: get_period(params, "pivot_window", PIVOT_WINDOW)?,
      volume_period: get_period(params, "volume_period", VOLUME_PERIOD)?,
      search_policy: SearchPolicy::default(),
      diagnostic_limit: DIAGNOSTIC_LIMIT,
      validate_data: false,
    })
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 1.0 || value.fract() != 0.0 {
    return Err(PatternError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a finite, non-negative value (hours or a factor) with default fallback
pub fn get_value(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  if !value.is_finite() || value < 0.0 {
    return Err(PatternError::InvalidValue("value must be finite and non-negative"));
  }
  Ok(value)
}

// ============================================================
// TESTS
// ============================================================
