//! Pivot extraction
//!
//! A bar is a significant high when its high is strictly above every other high
//! within `window` bars on both sides, and a significant low when its low is
//! strictly below every other low in the same span. Bars closer than `window`
//! to either edge of the series are never candidates.

use serde::{Deserialize, Serialize};

use super::volume::volume_ratio;
use crate::OHLCV;

/// A detected local extremum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    /// Position of the bar in the input series
    pub index: usize,
    /// Unix seconds
    pub timestamp: i64,
    /// The high (for highs) or low (for lows) that qualified the bar
    pub price: f64,
    pub volume: u64,
    /// Volume relative to the trailing average, 1.0 when not enough history
    pub volume_ratio: f64,
}

/// Significant highs and lows of one series, each sorted by timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pivots {
    pub highs: Vec<PivotPoint>,
    pub lows: Vec<PivotPoint>,
}

impl Pivots {
    /// True when both sides have enough pivots to form a line
    #[inline]
    pub fn has_lines(&self) -> bool {
        self.highs.len() >= 2 && self.lows.len() >= 2
    }
}

/// True if `bars[index]` has a strictly greater high than every other bar in ±`window`.
pub fn is_pivot_high<T: OHLCV>(bars: &[T], index: usize, window: usize) -> bool {
    if window == 0 || index < window || index.saturating_add(window) >= bars.len() {
        return false;
    }
    let hi = bars[index].high();
    bars[index - window..index].iter().all(|b| b.high() < hi)
        && bars[index + 1..=index + window].iter().all(|b| b.high() < hi)
}

/// True if `bars[index]` has a strictly lower low than every other bar in ±`window`.
pub fn is_pivot_low<T: OHLCV>(bars: &[T], index: usize, window: usize) -> bool {
    if window == 0 || index < window || index.saturating_add(window) >= bars.len() {
        return false;
    }
    let lo = bars[index].low();
    bars[index - window..index].iter().all(|b| b.low() > lo)
        && bars[index + 1..=index + window].iter().all(|b| b.low() > lo)
}

/// Scan the series for significant highs and lows.
///
/// `volume_period` feeds the trailing volume ratio stored on each pivot.
/// Fewer than `2 * window + 1` bars yields no pivots.
pub fn extract_pivots<T: OHLCV>(bars: &[T], window: usize, volume_period: usize) -> Pivots {
    let mut pivots = Pivots::default();
    if window == 0 || bars.len() < window.saturating_mul(2).saturating_add(1) {
        return pivots;
    }

    let make = |index: usize, price: f64| PivotPoint {
        index,
        timestamp: bars[index].timestamp(),
        price,
        volume: bars[index].volume(),
        volume_ratio: volume_ratio(bars, index, volume_period),
    };

    for i in window..bars.len() - window {
        if is_pivot_high(bars, i, window) {
            pivots.highs.push(make(i, bars[i].high()));
        }
        if is_pivot_low(bars, i, window) {
            pivots.lows.push(make(i, bars[i].low()));
        }
    }

    // Input is expected chronological; keep output ordered regardless.
    pivots.highs.sort_by_key(|p| p.timestamp);
    pivots.lows.sort_by_key(|p| p.timestamp);
    pivots
}
