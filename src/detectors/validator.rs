//! Falling wedge validation for one (upper, lower) candidate pair
//!
//! Every check runs and appends its own reason, so a rejected pair explains all
//! of its problems at once. Only a structurally malformed line (not exactly two
//! points) stops validation early.

#![allow(clippy::neg_cmp_op_on_partial_ord)]

use std::fmt;

use serde::{Deserialize, Serialize};

use super::helpers::{
    hours_between, HIGH_VOLUME_RATIO, MAX_CONVERGENCE, MAX_DURATION_HOURS, MIN_CONVERGENCE,
    MIN_DURATION_HOURS, MIN_HEIGHT,
};
use super::lines::CandidateLine;
use super::volume::VolumeProfile;
use crate::{PatternError, Ratio, Result, OHLCV};

// ============================================================
// CONFIG
// ============================================================

/// Tuning for the wedge validator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WedgeConfig {
    pub min_duration_hours: f64,
    pub max_duration_hours: f64,
    /// Lower bound for the fractional narrowing of the gap
    pub min_convergence: Ratio,
    pub max_convergence: Ratio,
    /// Minimum wedge height relative to the highest upper-line price
    pub min_height: Ratio,
    /// Pivots at or above this volume ratio are reported as high-volume.
    /// Informational, does not affect validity.
    pub high_volume_ratio: f64,
}

impl Default for WedgeConfig {
    fn default() -> Self {
        Self {
            min_duration_hours: MIN_DURATION_HOURS,
            max_duration_hours: MAX_DURATION_HOURS,
            min_convergence: Ratio::new_const(MIN_CONVERGENCE),
            max_convergence: Ratio::new_const(MAX_CONVERGENCE),
            min_height: Ratio::new_const(MIN_HEIGHT),
            high_volume_ratio: HIGH_VOLUME_RATIO,
        }
    }
}

impl WedgeConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("min_duration_hours", self.min_duration_hours),
            ("max_duration_hours", self.max_duration_hours),
            ("high_volume_ratio", self.high_volume_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PatternError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        if self.min_duration_hours > self.max_duration_hours {
            return Err(PatternError::InvalidConfig(format!(
                "min_duration_hours {} exceeds max_duration_hours {}",
                self.min_duration_hours, self.max_duration_hours
            )));
        }
        if self.min_convergence > self.max_convergence {
            return Err(PatternError::InvalidConfig(format!(
                "min_convergence {} exceeds max_convergence {}",
                self.min_convergence.get(),
                self.max_convergence.get()
            )));
        }
        Ok(())
    }
}

// ============================================================
// FAILURE REASONS
// ============================================================

/// Which of the two lines a reason refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSide {
    Upper,
    Lower,
}

impl fmt::Display for LineSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineSide::Upper => "upper",
            LineSide::Lower => "lower",
        })
    }
}

/// Why a candidate pair was rejected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    InvalidLineLength { upper: usize, lower: usize },
    /// Both points share a timestamp (or run backwards), so no slope exists
    DegenerateLine { side: LineSide },
    UpperNotFalling { slope: f64 },
    LowerNotFalling { slope: f64 },
    NotConverging { upper_slope: f64, lower_slope: f64 },
    DurationTooShort { hours: f64, min: f64 },
    DurationTooLong { hours: f64, max: f64 },
    /// Lines touch at the start, so convergence is undefined
    ZeroStartGap,
    ConvergenceTooLow { convergence: f64, min: f64 },
    ConvergenceTooHigh { convergence: f64, max: f64 },
    HeightTooSmall { height: f64, min: f64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FailureReason::InvalidLineLength { upper, lower } => write!(
                f,
                "invalid line length: upper has {upper} points, lower has {lower} points"
            ),
            FailureReason::DegenerateLine { side } => {
                write!(f, "{side} line is degenerate: both points share a timestamp")
            },
            FailureReason::UpperNotFalling { .. } => f.write_str("upper line not falling"),
            FailureReason::LowerNotFalling { .. } => f.write_str("lower line not falling"),
            FailureReason::NotConverging { .. } => f.write_str("lines not converging"),
            FailureReason::DurationTooShort { hours, min } => {
                write!(f, "pattern duration too short: {hours:.1}h < {min:.1}h")
            },
            FailureReason::DurationTooLong { hours, max } => {
                write!(f, "pattern duration too long: {hours:.1}h > {max:.1}h")
            },
            FailureReason::ZeroStartGap => f.write_str("lines start at the same price"),
            FailureReason::ConvergenceTooLow { convergence, min } => write!(
                f,
                "convergence too low: {:.2}% < {:.2}%",
                convergence * 100.0,
                min * 100.0
            ),
            FailureReason::ConvergenceTooHigh { convergence, max } => write!(
                f,
                "convergence too high: {:.2}% > {:.2}%",
                convergence * 100.0,
                max * 100.0
            ),
            FailureReason::HeightTooSmall { height, min } => write!(
                f,
                "height too small: {:.2}% < {:.2}%",
                height * 100.0,
                min * 100.0
            ),
        }
    }
}

// ============================================================
// RESULT
// ============================================================

/// Outcome of validating one (upper, lower) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    pub upper: CandidateLine,
    pub lower: CandidateLine,
    /// Price change per hour; None when the line is degenerate or malformed
    pub upper_slope: Option<f64>,
    pub lower_slope: Option<f64>,
    /// Hours between the earliest and latest of the four points
    pub duration_hours: f64,
    /// Fractional narrowing of the gap; None when the start gap is zero
    pub convergence: Option<f64>,
    pub height: f64,
    pub valid: bool,
    pub reasons: Vec<FailureReason>,
    pub volume_profile: VolumeProfile,
    pub high_volume_pivots: usize,
}

impl PatternResult {
    fn malformed(upper: &CandidateLine, lower: &CandidateLine) -> Self {
        Self {
            upper: upper.clone(),
            lower: lower.clone(),
            upper_slope: None,
            lower_slope: None,
            duration_hours: 0.0,
            convergence: None,
            height: 0.0,
            valid: false,
            reasons: vec![FailureReason::InvalidLineLength {
                upper: upper.points().len(),
                lower: lower.points().len(),
            }],
            volume_profile: VolumeProfile::Flat,
            high_volume_pivots: 0,
        }
    }

    /// Quality score 0.0..=1.0: geometric mean of convergence and height.
    /// Always 0.0 for invalid results.
    pub fn strength(&self) -> f64 {
        match (self.valid, self.convergence) {
            (true, Some(c)) => (c.max(0.0) * self.height.max(0.0)).sqrt().min(1.0),
            _ => 0.0,
        }
    }

    /// Series positions of the earliest and latest pivots
    pub fn index_span(&self) -> Option<(usize, usize)> {
        let points = self.upper.points().iter().chain(self.lower.points());
        let start = points.clone().map(|p| p.index).min()?;
        let end = points.map(|p| p.index).max()?;
        Some((start, end))
    }
}

// ============================================================
// VALIDATION
// ============================================================

/// Validate an (upper, lower) candidate pair against `config`.
///
/// `bars` is the full series the pivots were taken from; it is only read for
/// the volume profile of the pattern window.
pub fn validate_pattern<T: OHLCV>(
    upper: &CandidateLine,
    lower: &CandidateLine,
    bars: &[T],
    config: &WedgeConfig,
) -> PatternResult {
    let (Some((u1, u2)), Some((l1, l2))) = (upper.endpoints(), lower.endpoints()) else {
        return PatternResult::malformed(upper, lower);
    };

    let mut reasons = Vec::new();
    let upper_slope = upper.slope();
    let lower_slope = lower.slope();

    match upper_slope {
        None => reasons.push(FailureReason::DegenerateLine { side: LineSide::Upper }),
        Some(slope) if !(slope < 0.0) => reasons.push(FailureReason::UpperNotFalling { slope }),
        Some(_) => {},
    }
    match lower_slope {
        None => reasons.push(FailureReason::DegenerateLine { side: LineSide::Lower }),
        Some(slope) if !(slope < 0.0) => reasons.push(FailureReason::LowerNotFalling { slope }),
        Some(_) => {},
    }
    if let (Some(us), Some(ls)) = (upper_slope, lower_slope) {
        if !(us < ls) {
            reasons.push(FailureReason::NotConverging { upper_slope: us, lower_slope: ls });
        }
    }

    let points = [u1, u2, l1, l2];
    let start = points.iter().map(|p| p.timestamp).min().unwrap_or_default();
    let end = points.iter().map(|p| p.timestamp).max().unwrap_or_default();
    let duration_hours = hours_between(start, end);
    if duration_hours < config.min_duration_hours {
        reasons.push(FailureReason::DurationTooShort {
            hours: duration_hours,
            min: config.min_duration_hours,
        });
    } else if duration_hours > config.max_duration_hours {
        reasons.push(FailureReason::DurationTooLong {
            hours: duration_hours,
            max: config.max_duration_hours,
        });
    }

    let start_gap = (u1.price - l1.price).abs();
    let end_gap = (u2.price - l2.price).abs();
    let convergence = (start_gap > 0.0).then(|| (start_gap - end_gap) / start_gap);
    match convergence {
        None => reasons.push(FailureReason::ZeroStartGap),
        Some(c) if c < config.min_convergence.get() => {
            reasons.push(FailureReason::ConvergenceTooLow {
                convergence: c,
                min: config.min_convergence.get(),
            })
        },
        Some(c) if c > config.max_convergence.get() => {
            reasons.push(FailureReason::ConvergenceTooHigh {
                convergence: c,
                max: config.max_convergence.get(),
            })
        },
        Some(_) => {},
    }

    let top = u1.price.max(u2.price);
    let bottom = l1.price.min(l2.price);
    let height = if top > 0.0 { (top - bottom) / top } else { 0.0 };
    if !(height >= config.min_height.get()) {
        reasons.push(FailureReason::HeightTooSmall { height, min: config.min_height.get() });
    }

    let first_index = points.iter().map(|p| p.index).min().unwrap_or_default();
    let last_index = points.iter().map(|p| p.index).max().unwrap_or_default();
    let volume_profile = VolumeProfile::classify(bars, first_index, last_index);
    let high_volume_pivots = points
        .iter()
        .filter(|p| p.volume_ratio >= config.high_volume_ratio)
        .count();

    PatternResult {
        upper: upper.clone(),
        lower: lower.clone(),
        upper_slope,
        lower_slope,
        duration_hours,
        convergence,
        height,
        valid: reasons.is_empty(),
        reasons,
        volume_profile,
        high_volume_pivots,
    }
}
