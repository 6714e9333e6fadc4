//! Integration tests for wedge detection.
//!
//! These tests drive the full pipeline through the public API.

use serde_json::Value;
use wedgefit::prelude::*;

const HOUR: i64 = 3600;

/// Caller-owned bar type, to exercise the trait-based API
#[derive(Debug, Clone, Copy)]
struct TestBar {
    t: i64,
    h: f64,
    l: f64,
    v: u64,
}

impl TestBar {
    fn new(hour: i64, h: f64, l: f64) -> Self {
        Self {
            t: hour * HOUR,
            h,
            l,
            v: 1000,
        }
    }
}

impl OHLCV for TestBar {
    fn timestamp(&self) -> i64 {
        self.t
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        (self.h + self.l) / 2.0
    }

    fn volume(&self) -> u64 {
        self.v
    }
}

/// Hourly bars with a flat 145/143 range
fn make_flat(n: usize) -> Vec<TestBar> {
    (0..n).map(|i| TestBar::new(i as i64, 145.0, 143.0)).collect()
}

/// Place a high spike and/or low spike at `index`
fn spike(bars: &mut [TestBar], index: usize, high: Option<f64>, low: Option<f64>) {
    if let Some(h) = high {
        bars[index].h = h;
    }
    if let Some(l) = low {
        bars[index].l = l;
    }
}

fn default_engine() -> WedgeEngine {
    EngineBuilder::new().build().unwrap()
}

// ============================================================
// SCENARIOS
// ============================================================

#[test]
fn test_converging_falling_lines_validate() {
    // highs 150 -> 148 and lows 140 -> 139 over 100 hours
    let mut bars = make_flat(120);
    spike(&mut bars, 10, Some(150.0), Some(140.0));
    spike(&mut bars, 110, Some(148.0), Some(139.0));

    let detection = default_engine().detect(&bars).unwrap();
    let m = detection.matched().expect("wedge should be detected");

    assert!(m.result.valid);
    assert!(m.result.reasons.is_empty());
    assert_eq!(m.result.upper_slope, Some(-0.02));
    assert_eq!(m.result.lower_slope, Some(-0.01));
    assert_eq!(m.result.duration_hours, 100.0);
}

#[test]
fn test_parallel_lines_report_only_convergence_order() {
    // both lines fall 0.02/h; the lower line is sampled over half the span
    let mut bars = make_flat(120);
    spike(&mut bars, 10, Some(150.0), Some(140.0));
    spike(&mut bars, 60, None, Some(139.0));
    spike(&mut bars, 110, Some(148.0), None);

    let detection = default_engine().detect(&bars).unwrap();
    let Detection::NotFound(trace) = detection else {
        panic!("no wedge expected, got {detection:?}");
    };

    assert_eq!(trace.combinations_tested, 1);
    let reasons = &trace.diagnostics[0].reasons;
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].to_string(), "lines not converging");
}

#[test]
fn test_short_duration_names_measured_and_threshold() {
    let mut bars = make_flat(40);
    spike(&mut bars, 10, Some(150.0), Some(140.0));
    spike(&mut bars, 20, Some(148.0), Some(139.0));

    let detection = default_engine().detect(&bars).unwrap();
    let Detection::NotFound(trace) = detection else {
        panic!("no wedge expected");
    };

    let reasons = &trace.diagnostics[0].reasons;
    assert_eq!(
        reasons.as_slice(),
        &[FailureReason::DurationTooShort { hours: 10.0, min: 48.0 }]
    );
    let text = reasons[0].to_string();
    assert!(text.contains("10.0") && text.contains("48.0"), "{text}");
}

#[test]
fn test_first_match_in_search_order() {
    // three falling highs, two falling lows: (h0,h1) pairs with (l0,l1) first
    let mut bars = make_flat(200);
    spike(&mut bars, 10, Some(150.0), Some(140.0));
    spike(&mut bars, 110, Some(148.0), Some(139.0));
    spike(&mut bars, 130, Some(147.5), None);

    let engine = default_engine();
    let m = engine.detect(&bars).unwrap().matched().cloned().expect("wedge");
    assert_eq!(m.combinations_tested, 1);
    assert_eq!(m.result.upper.points()[0].index, 10);
    assert_eq!(m.result.upper.points()[1].index, 110);
}

#[test]
fn test_strongest_policy_scans_all_combinations() {
    let mut bars = make_flat(200);
    spike(&mut bars, 10, Some(150.0), Some(140.0));
    spike(&mut bars, 110, Some(148.0), Some(139.0));
    spike(&mut bars, 130, Some(147.5), None);

    let engine = EngineBuilder::new()
        .search_policy(SearchPolicy::Strongest)
        .build()
        .unwrap();
    let m = engine.detect(&bars).unwrap().matched().cloned().expect("wedge");
    assert_eq!(m.combinations_tested, 3);
    assert!(m.strength > 0.0);
}

#[test]
fn test_diagnostics_are_capped_but_total_is_reported() {
    // rising highs and rising lows never form a falling wedge
    let mut bars = make_flat(400);
    for k in 0..6 {
        let i = 20 + k * 60;
        spike(&mut bars, i, Some(150.0 + k as f64), None);
        spike(&mut bars, i + 20, None, Some(140.0 - 5.0 + k as f64));
    }

    let engine = EngineBuilder::new().diagnostic_limit(4).build().unwrap();
    let Detection::NotFound(trace) = engine.detect(&bars).unwrap() else {
        panic!("no wedge expected");
    };
    assert_eq!(trace.highs, 6);
    assert_eq!(trace.lows, 6);
    assert_eq!(trace.combinations_tested, 225);
    assert_eq!(trace.diagnostics.len(), 4);
}

#[test]
fn test_too_few_pivots_is_not_an_error() {
    let mut bars = make_flat(60);
    spike(&mut bars, 20, Some(150.0), Some(140.0));

    let detection = default_engine().detect(&bars).unwrap();
    assert_eq!(
        detection,
        Detection::InsufficientData(InsufficientData::TooFewPivots { highs: 1, lows: 1 })
    );
}

#[test]
fn test_short_series_is_not_an_error() {
    let bars = make_flat(8);
    let detection = default_engine().detect(&bars).unwrap();
    assert_eq!(
        detection,
        Detection::InsufficientData(InsufficientData::TooFewBars { need: 11, got: 8 })
    );
}

#[test]
fn test_custom_pivot_window() {
    let mut bars = make_flat(120);
    spike(&mut bars, 3, Some(150.0), Some(140.0));
    spike(&mut bars, 103, Some(148.0), Some(139.0));

    // bar 3 sits inside the default 5-bar edge
    assert!(!default_engine().detect(&bars).unwrap().is_found());

    let engine = EngineBuilder::new()
        .pivot_window(Period::new(3).unwrap())
        .build()
        .unwrap();
    assert!(engine.detect(&bars).unwrap().is_found());
}

// ============================================================
// REPORTING
// ============================================================

#[test]
fn test_pattern_report_serializes() {
    let mut bars = make_flat(120);
    spike(&mut bars, 10, Some(150.0), Some(140.0));
    spike(&mut bars, 110, Some(148.0), Some(139.0));

    let detection = default_engine().detect(&bars).unwrap();
    let json: Value = serde_json::to_value(Report::from(&detection)).unwrap();

    assert_eq!(json["status"], "pattern");
    assert_eq!(json["pattern"], "FALLING_WEDGE");
    assert_eq!(json["duration_hours"], 100.0);
    assert_eq!(json["upper"]["start_price"], 150.0);
    assert_eq!(json["volume_profile"], "Flat");
}

#[test]
fn test_failure_report_serializes() {
    let mut bars = make_flat(40);
    spike(&mut bars, 10, Some(150.0), Some(140.0));
    spike(&mut bars, 20, Some(148.0), Some(139.0));

    let detection = default_engine().detect(&bars).unwrap();
    let json: Value = serde_json::to_value(Report::from(&detection)).unwrap();

    assert_eq!(json["status"], "no_pattern");
    assert_eq!(json["combinations_tested"], 1);
    let reasons = json["diagnostics"][0]["reasons"].as_array().unwrap();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].as_str().unwrap().starts_with("pattern duration too short"));
}

#[test]
fn test_config_round_trips_through_json() {
    let json = r#"{
        "wedge": {
            "min_duration_hours": 24.0,
            "max_duration_hours": 240.0,
            "min_convergence": 0.01,
            "max_convergence": 0.3,
            "min_height": 0.02,
            "high_volume_ratio": 2.0
        },
        "pivot_window": 3,
        "volume_period": 10,
        "search_policy": "Strongest",
        "diagnostic_limit": 5,
        "validate_data": true
    }"#;
    let config: EngineConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.pivot_window.get(), 3);
    assert_eq!(config.search_policy, SearchPolicy::Strongest);

    let engine = EngineBuilder::from_config(config).build().unwrap();
    assert_eq!(engine.min_bars(), 7);
}

#[test]
fn test_config_rejects_out_of_range_ratio() {
    let json = r#"{
        "min_duration_hours": 24.0,
        "max_duration_hours": 240.0,
        "min_convergence": 1.5,
        "max_convergence": 0.3,
        "min_height": 0.02,
        "high_volume_ratio": 2.0
    }"#;
    assert!(serde_json::from_str::<WedgeConfig>(json).is_err());
}
