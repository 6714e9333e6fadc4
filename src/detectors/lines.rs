//! Two-point trend-line candidates
//!
//! Pivots live in flat ordered vectors; candidates are addressed by index pairs
//! into those vectors and only materialized when a combination is validated.

use serde::{Deserialize, Serialize};

use super::helpers::{hours_between, slope_per_hour};
use super::pivots::PivotPoint;

/// Straight trend line through pivots of one kind (both highs or both lows).
///
/// Lines built by [`CandidateLine::new`] always hold exactly two points.
/// [`CandidateLine::from_points`] accepts any slice so externally assembled
/// lines can be passed through the validator's structural check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLine {
    points: Vec<PivotPoint>,
}

impl CandidateLine {
    pub fn new(first: PivotPoint, second: PivotPoint) -> Self {
        Self { points: vec![first, second] }
    }

    pub fn from_points(points: &[PivotPoint]) -> Self {
        Self { points: points.to_vec() }
    }

    #[inline]
    pub fn points(&self) -> &[PivotPoint] {
        &self.points
    }

    /// Both endpoints, if this is a well-formed two-point line
    #[inline]
    pub fn endpoints(&self) -> Option<(&PivotPoint, &PivotPoint)> {
        match self.points.as_slice() {
            [a, b] => Some((a, b)),
            _ => None,
        }
    }

    /// Price change per hour. None for malformed or zero-duration lines.
    pub fn slope(&self) -> Option<f64> {
        let (a, b) = self.endpoints()?;
        slope_per_hour(a.timestamp, a.price, b.timestamp, b.price)
    }

    /// Hours spanned by the line. None for malformed lines.
    pub fn duration_hours(&self) -> Option<f64> {
        let (a, b) = self.endpoints()?;
        Some(hours_between(a.timestamp, b.timestamp))
    }
}

/// Every index pair `(i, j)` with `i < j < len`, ascending by `i` then `j`.
pub fn candidate_pairs(len: usize) -> impl Iterator<Item = (usize, usize)> + Clone {
    (0..len).flat_map(move |i| (i + 1..len).map(move |j| (i, j)))
}

/// Number of pairs [`candidate_pairs`] yields for `len` pivots.
#[inline]
pub fn pair_count(len: usize) -> usize {
    len * len.saturating_sub(1) / 2
}

/// Build the line for an index pair into a pivot sequence.
#[inline]
pub fn line_at(pivots: &[PivotPoint], (i, j): (usize, usize)) -> CandidateLine {
    CandidateLine::new(pivots[i], pivots[j])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pivot(hour: i64, price: f64) -> PivotPoint {
        PivotPoint {
            index: hour as usize,
            timestamp: hour * 3600,
            price,
            volume: 1_000,
            volume_ratio: 1.0,
        }
    }

    #[test]
    fn test_pair_enumeration_order() {
        let pairs: Vec<_> = candidate_pairs(4).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(pair_count(4), 6);
    }

    #[test]
    fn test_pairs_need_two_pivots() {
        assert_eq!(candidate_pairs(0).count(), 0);
        assert_eq!(candidate_pairs(1).count(), 0);
        assert_eq!(pair_count(1), 0);
        assert_eq!(pair_count(0), 0);
    }

    #[test]
    fn test_line_slope_and_duration() {
        let line = CandidateLine::new(pivot(0, 150.0), pivot(100, 148.0));
        assert_eq!(line.slope(), Some(-0.02));
        assert_eq!(line.duration_hours(), Some(100.0));
    }

    #[test]
    fn test_degenerate_line_has_no_slope() {
        let line = CandidateLine::new(pivot(5, 150.0), pivot(5, 148.0));
        assert_eq!(line.slope(), None);
        assert_eq!(line.duration_hours(), Some(0.0));
    }

    #[test]
    fn test_malformed_line() {
        let line = CandidateLine::from_points(&[pivot(0, 1.0)]);
        assert!(line.endpoints().is_none());
        assert!(line.slope().is_none());
        assert!(line.duration_hours().is_none());
    }
}
