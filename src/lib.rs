//! # wedgefit - falling wedge detection
//!
//! Finds a falling wedge in an OHLCV series: significant pivots are extracted,
//! every two-point trend line through them is enumerated, and each
//! (upper, lower) combination is checked for slope direction, convergence,
//! duration and height.
//!
//! ## Quick Start
//!
//! ```rust
//! use wedgefit::prelude::*;
//!
//! let engine = EngineBuilder::new().build().unwrap();
//!
//! let bars: Vec<PricePoint> = vec![];
//! match engine.detect(&bars).unwrap() {
//!     Detection::Found(m) => println!("wedge, strength {:.2}", m.strength),
//!     other => println!("{}", Report::from(&other)),
//! }
//! ```

pub mod detectors;
pub mod params;
pub mod report;

pub mod prelude {
    pub use crate::{
        // Stages
        detectors::{
            candidate_pairs, extract_pivots, search_wedge, validate_pattern, volume_ratio,
            CandidateLine, FailureReason, LineSide, PatternResult, PivotPoint, Pivots,
            SearchOutcome, SearchPolicy, SearchTrace, VolumeProfile, WedgeConfig,
        },
        // Parameters
        params::{get_period, get_ratio, get_value, ParamMeta, ParamType, ParameterizedConfig},
        // Reporting
        report::{FailureSummary, LineSummary, PatternSummary, Report},
        // Parallel
        scan_parallel,
        // Types
        Detection,
        Direction,
        EngineBuilder,
        EngineConfig,
        InsufficientData,
        OHLCVExt,
        // Errors
        PatternError,
        PatternId,
        Period,
        PricePoint,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        WedgeEngine,
        WedgeMatch,
        OHLCV,
    };
}

use serde::{Deserialize, Serialize};
use tracing::debug;

use detectors::{
    extract_pivots, search_wedge, PatternResult, Pivots, SearchOutcome, SearchPolicy, SearchTrace,
    WedgeConfig, DIAGNOSTIC_LIMIT, PIVOT_WINDOW, VOLUME_PERIOD,
};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors from configuration or, when data validation is on, malformed input.
///
/// Short series, missing pivots and rejected geometry are not errors; they are
/// reported through [`Detection`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core price bar trait
pub trait OHLCV {
    /// Unix seconds; strictly increasing across a series
    fn timestamp(&self) -> i64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> u64;
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn timestamp(&self) -> i64 {
        (**self).timestamp()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> u64 {
        (**self).volume()
    }
}

/// Extension trait with computed properties for price bars
pub trait OHLCVExt: OHLCV {
    /// Bar time as UTC, None when the timestamp is out of chrono's range
    #[inline]
    fn datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.timestamp(), 0)
    }

    /// Validate bar consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if prices.iter().any(|&p| p <= 0.0) {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "non-positive price",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// One observation, provided for callers without their own bar type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(timestamp: i64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            timestamp,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for PricePoint {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> u64 {
        self.volume
    }
}

// ============================================================
// DETECTION RESULTS
// ============================================================

/// Unique identifier for a pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PatternId(pub &'static str);

impl PatternId {
    pub const FALLING_WEDGE: PatternId = PatternId("FALLING_WEDGE");

    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }
}

/// A validated wedge and where it sits in the series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WedgeMatch {
    pub pattern_id: PatternId,
    pub direction: Direction,
    /// Quality/confidence score 0.0..=1.0
    pub strength: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub combinations_tested: usize,
    pub result: PatternResult,
}

impl WedgeMatch {
    fn from_result(result: PatternResult, combinations_tested: usize) -> Self {
        let (start_index, end_index) = result.index_span().unwrap_or_default();
        Self {
            pattern_id: PatternId::FALLING_WEDGE,
            // falling wedges resolve upward
            direction: Direction::Bullish,
            strength: result.strength(),
            start_index,
            end_index,
            combinations_tested,
            result,
        }
    }
}

/// Not enough input to attempt a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsufficientData {
    TooFewBars { need: usize, got: usize },
    TooFewPivots { highs: usize, lows: usize },
}

impl std::fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsufficientData::TooFewBars { need, got } => {
                write!(f, "insufficient data: need {need} bars, got {got}")
            },
            InsufficientData::TooFewPivots { highs, lows } => write!(
                f,
                "insufficient data: need 2 highs and 2 lows, got {highs} highs and {lows} lows"
            ),
        }
    }
}

/// Outcome of one detection run. None of these are errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Detection {
    InsufficientData(InsufficientData),
    Found(WedgeMatch),
    NotFound(SearchTrace),
}

impl Detection {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, Detection::Found(_))
    }

    pub fn matched(&self) -> Option<&WedgeMatch> {
        match self {
            Detection::Found(m) => Some(m),
            _ => None,
        }
    }
}

// ============================================================
// WEDGE ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub wedge: WedgeConfig,
    /// Bars on each side a pivot must dominate
    pub pivot_window: Period,
    /// Trailing bars for the volume ratio
    pub volume_period: Period,
    pub search_policy: SearchPolicy,
    /// Rejected combinations kept in a [`SearchTrace`]
    pub diagnostic_limit: usize,
    pub validate_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wedge: WedgeConfig::default(),
            pivot_window: Period::new_const(PIVOT_WINDOW),
            volume_period: Period::new_const(VOLUME_PERIOD),
            search_policy: SearchPolicy::default(),
            diagnostic_limit: DIAGNOSTIC_LIMIT,
            validate_data: false,
        }
    }
}

/// Main detection engine. Holds only configuration; runs share no state.
#[derive(Debug, Clone)]
pub struct WedgeEngine {
    config: EngineConfig,
}

impl WedgeEngine {
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Smallest series that can produce a pivot
    #[inline]
    pub fn min_bars(&self) -> usize {
        self.config.pivot_window.get().saturating_mul(2).saturating_add(1)
    }

    // ===========================================
    // LOW-LEVEL: Primitives
    // ===========================================

    /// Extract pivots with the engine's window and volume period.
    #[inline]
    pub fn pivots<T: OHLCV>(&self, bars: &[T]) -> Pivots {
        extract_pivots(
            bars,
            self.config.pivot_window.get(),
            self.config.volume_period.get(),
        )
    }

    /// Run the line search over precomputed pivots.
    #[inline]
    pub fn search<T: OHLCV>(&self, pivots: &Pivots, bars: &[T]) -> SearchOutcome {
        search_wedge(
            pivots,
            bars,
            &self.config.wedge,
            self.config.search_policy,
            self.config.diagnostic_limit,
        )
    }

    // ===========================================
    // HIGH-LEVEL: Full pipeline
    // ===========================================

    /// Detect a falling wedge in `bars`.
    ///
    /// Errors only when data validation is enabled and a bar is malformed.
    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Detection> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let need = self.min_bars();
        if bars.len() < need {
            debug!(bars = bars.len(), need, "series too short");
            return Ok(Detection::InsufficientData(InsufficientData::TooFewBars {
                need,
                got: bars.len(),
            }));
        }

        let pivots = self.pivots(bars);
        debug!(
            bars = bars.len(),
            highs = pivots.highs.len(),
            lows = pivots.lows.len(),
            "pivots extracted"
        );
        if !pivots.has_lines() {
            return Ok(Detection::InsufficientData(InsufficientData::TooFewPivots {
                highs: pivots.highs.len(),
                lows: pivots.lows.len(),
            }));
        }

        Ok(match self.search(&pivots, bars) {
            SearchOutcome::Found { result, combinations_tested } => {
                Detection::Found(WedgeMatch::from_result(result, combinations_tested))
            },
            SearchOutcome::NotFound(trace) => Detection::NotFound(trace),
        })
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                PatternError::InvalidBar { reason, .. } => {
                    PatternError::InvalidBar { index: i, reason }
                },
                other => other,
            })?;
        }
        if let Some(i) = bars
            .windows(2)
            .position(|w| w[1].timestamp() <= w[0].timestamp())
        {
            return Err(PatternError::InvalidBar {
                index: i + 1,
                reason: "timestamps not strictly increasing",
            });
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.config.wedge.validate()
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating WedgeEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration, e.g. one deserialized by the caller
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Replace the validator thresholds
    pub fn wedge(mut self, wedge: WedgeConfig) -> Self {
        self.config.wedge = wedge;
        self
    }

    pub fn pivot_window(mut self, window: Period) -> Self {
        self.config.pivot_window = window;
        self
    }

    pub fn volume_period(mut self, period: Period) -> Self {
        self.config.volume_period = period;
        self
    }

    pub fn search_policy(mut self, policy: SearchPolicy) -> Self {
        self.config.search_policy = policy;
        self
    }

    /// Cap on rejected combinations kept for diagnostics
    pub fn diagnostic_limit(mut self, limit: usize) -> Self {
        self.config.diagnostic_limit = limit;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<WedgeEngine> {
        let engine = WedgeEngine { config: self.config };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub detection: Detection,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Parallel detection over multiple instruments
pub fn scan_parallel<'a, T, I>(
    engine: &WedgeEngine,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .detect(bars)
                .map(|detection| ScanResult {
                    symbol: symbol.to_string(),
                    detection,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
