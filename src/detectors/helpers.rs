//! Common helper functions for wedge detection
//!
//! Reference thresholds and the small geometric primitives shared across the detector modules.

// ============================================================
// REFERENCE DEFAULTS
// ============================================================

/// Bars on each side of a pivot candidate
pub const PIVOT_WINDOW: usize = 5;
/// Trailing bars averaged for the volume ratio
pub const VOLUME_PERIOD: usize = 20;
/// Per-combination diagnostics kept when no pattern validates
pub const DIAGNOSTIC_LIMIT: usize = 10;

pub const MIN_DURATION_HOURS: f64 = 48.0;
pub const MAX_DURATION_HOURS: f64 = 480.0;
pub const MIN_CONVERGENCE: f64 = 0.02;
pub const MAX_CONVERGENCE: f64 = 0.15;
pub const MIN_HEIGHT: f64 = 0.03;
/// Volume ratio at or above which a pivot counts as high-volume
pub const HIGH_VOLUME_RATIO: f64 = 1.5;

/// Relative change between halves below which a volume profile is flat
pub const VOLUME_FLAT_BAND: f64 = 0.1;

const SECONDS_PER_HOUR: f64 = 3600.0;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Signed hours from `from` to `to` (unix seconds). Fractional hours are kept.
#[inline]
pub fn hours_between(from: i64, to: i64) -> f64 {
    (i128::from(to) - i128::from(from)) as f64 / SECONDS_PER_HOUR
}

/// Price change per hour between two points.
/// Returns None when the elapsed time is zero or negative.
#[inline]
pub fn slope_per_hour(t1: i64, p1: f64, t2: i64, p2: f64) -> Option<f64> {
    let hours = hours_between(t1, t2);
    (hours > 0.0).then(|| (p2 - p1) / hours)
}

/// Mean of `volume` over `bars[start..end]`, or None for an empty range.
#[inline]
pub fn mean_volume<T: crate::OHLCV>(bars: &[T], start: usize, end: usize) -> Option<f64> {
    let slice = bars.get(start..end)?;
    if slice.is_empty() {
        return None;
    }
    let sum: f64 = slice.iter().map(|b| b.volume() as f64).sum();
    Some(sum / slice.len() as f64)
}
