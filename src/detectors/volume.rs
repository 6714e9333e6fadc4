//! Trailing volume ratio and volume profile classification

use serde::{Deserialize, Serialize};

use super::helpers::{mean_volume, VOLUME_FLAT_BAND};
use crate::OHLCV;

/// Volume of `bars[index]` relative to the mean of the `period` bars before it.
///
/// Neutral `1.0` when fewer than `period` prior bars exist, when the trailing
/// mean is exactly zero, or when `index` is out of bounds.
pub fn volume_ratio<T: OHLCV>(bars: &[T], index: usize, period: usize) -> f64 {
    if period == 0 || index < period {
        return 1.0;
    }
    let Some(bar) = bars.get(index) else {
        return 1.0;
    };
    match mean_volume(bars, index - period, index) {
        Some(avg) if avg != 0.0 => bar.volume() as f64 / avg,
        _ => 1.0,
    }
}

/// How volume evolves across a pattern window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeProfile {
    /// Second half trades less than the first
    Contracting,
    #[default]
    Flat,
    Expanding,
}

impl VolumeProfile {
    /// Compare mean volume of the first and second halves of `bars[start..=end]`.
    ///
    /// Windows shorter than two bars, or with a silent first half, are `Flat`.
    pub fn classify<T: OHLCV>(bars: &[T], start: usize, end: usize) -> Self {
        if end >= bars.len() || end <= start {
            return VolumeProfile::Flat;
        }
        let mid = start + (end - start + 1) / 2;
        let (Some(first), Some(second)) = (
            mean_volume(bars, start, mid),
            mean_volume(bars, mid, end + 1),
        ) else {
            return VolumeProfile::Flat;
        };
        if first <= 0.0 {
            return VolumeProfile::Flat;
        }

        match (second - first) / first {
            c if c < -VOLUME_FLAT_BAND => VolumeProfile::Contracting,
            c if c > VOLUME_FLAT_BAND => VolumeProfile::Expanding,
            _ => VolumeProfile::Flat,
        }
    }
}
