//! Exhaustive search over (upper, lower) line pairs
//!
//! Upper-line pairs form the outer loop and lower-line pairs the inner loop,
//! both in ascending index order. The cost is O(H^2 * L^2) in the pivot counts,
//! which is fine for the tens of pivots real series produce. Callers feeding
//! unbounded pivot counts should cap them before searching.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::lines::{candidate_pairs, line_at, pair_count};
use super::pivots::Pivots;
use super::validator::{validate_pattern, PatternResult, WedgeConfig};
use crate::OHLCV;

/// Which valid combination the search returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPolicy {
    /// Stop at the first valid combination in iteration order
    #[default]
    FirstMatch,
    /// Test every combination and keep the one with the highest strength.
    /// Ties go to the earlier combination.
    Strongest,
}

/// Why no pattern was returned, with a bounded sample of rejected combinations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTrace {
    pub highs: usize,
    pub lows: usize,
    /// Every combination the search validated
    pub combinations_tested: usize,
    /// The first `diagnostic_limit` rejected combinations, in search order
    pub diagnostics: Vec<PatternResult>,
}

/// Result of a search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchOutcome {
    Found {
        result: PatternResult,
        combinations_tested: usize,
    },
    NotFound(SearchTrace),
}

impl SearchOutcome {
    pub fn found(&self) -> Option<&PatternResult> {
        match self {
            SearchOutcome::Found { result, .. } => Some(result),
            SearchOutcome::NotFound(_) => None,
        }
    }

    pub fn combinations_tested(&self) -> usize {
        match self {
            SearchOutcome::Found { combinations_tested, .. } => *combinations_tested,
            SearchOutcome::NotFound(trace) => trace.combinations_tested,
        }
    }
}

/// Search every upper/lower line combination for a valid falling wedge.
pub fn search_wedge<T: OHLCV>(
    pivots: &Pivots,
    bars: &[T],
    config: &WedgeConfig,
    policy: SearchPolicy,
    diagnostic_limit: usize,
) -> SearchOutcome {
    let highs = &pivots.highs;
    let lows = &pivots.lows;
    let total = pair_count(highs.len()) * pair_count(lows.len());
    debug!(
        highs = highs.len(),
        lows = lows.len(),
        combinations = total,
        ?policy,
        "searching wedge candidates"
    );

    let mut tested = 0usize;
    let mut diagnostics = Vec::with_capacity(diagnostic_limit.min(total));
    let mut best: Option<PatternResult> = None;
    let lower_pairs = candidate_pairs(lows.len());

    for upper_pair in candidate_pairs(highs.len()) {
        let upper = line_at(highs, upper_pair);
        for lower_pair in lower_pairs.clone() {
            let lower = line_at(lows, lower_pair);
            let result = validate_pattern(&upper, &lower, bars, config);
            tested += 1;

            if !result.valid {
                trace!(
                    upper = ?upper_pair,
                    lower = ?lower_pair,
                    reasons = result.reasons.len(),
                    "combination rejected"
                );
                if diagnostics.len() < diagnostic_limit {
                    diagnostics.push(result);
                }
                continue;
            }

            match policy {
                SearchPolicy::FirstMatch => {
                    debug!(tested, upper = ?upper_pair, lower = ?lower_pair, "wedge found");
                    return SearchOutcome::Found { result, combinations_tested: tested };
                },
                SearchPolicy::Strongest => {
                    let stronger = best
                        .as_ref()
                        .map_or(true, |b| result.strength() > b.strength());
                    if stronger {
                        best = Some(result);
                    }
                },
            }
        }
    }

    match best {
        Some(result) => {
            debug!(tested, strength = result.strength(), "strongest wedge selected");
            SearchOutcome::Found { result, combinations_tested: tested }
        },
        None => {
            debug!(tested, "no valid wedge");
            SearchOutcome::NotFound(SearchTrace {
                highs: highs.len(),
                lows: lows.len(),
                combinations_tested: tested,
                diagnostics,
            })
        },
    }
}
