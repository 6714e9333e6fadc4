//! Transport-neutral summaries of a detection run
//!
//! [`Report`] is what a presentation layer consumes: it serializes with serde
//! and renders a short text through `Display`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detectors::{CandidateLine, PatternResult, SearchTrace, VolumeProfile};
use crate::{Detection, InsufficientData, WedgeMatch};

/// Endpoints and slope of one trend line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub slope_per_hour: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub start_price: Option<f64>,
    pub end_time: Option<DateTime<Utc>>,
    pub end_price: Option<f64>,
}

impl LineSummary {
    fn new(line: &CandidateLine, slope_per_hour: Option<f64>) -> Self {
        let first = line.points().first();
        let last = line.points().last();
        Self {
            slope_per_hour,
            start_time: first.and_then(|p| DateTime::from_timestamp(p.timestamp, 0)),
            start_price: first.map(|p| p.price),
            end_time: last.and_then(|p| DateTime::from_timestamp(p.timestamp, 0)),
            end_price: last.map(|p| p.price),
        }
    }
}

impl fmt::Display for LineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = |t: Option<DateTime<Utc>>| {
            t.map_or_else(|| "?".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
        };
        let price = |p: Option<f64>| p.map_or_else(|| "?".to_string(), |p| format!("{p:.2}"));
        let slope = self
            .slope_per_hour
            .map_or_else(|| "n/a".to_string(), |s| format!("{s:+.4}/h"));
        write!(
            f,
            "{} @ {} -> {} @ {} ({})",
            price(self.start_price),
            time(self.start_time),
            price(self.end_price),
            time(self.end_time),
            slope
        )
    }
}

/// Geometry of a validated wedge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSummary {
    pub pattern: &'static str,
    pub strength: f64,
    pub upper: LineSummary,
    pub lower: LineSummary,
    pub duration_hours: f64,
    pub convergence_pct: f64,
    pub height_pct: f64,
    pub volume_profile: VolumeProfile,
    pub high_volume_pivots: usize,
    pub combinations_tested: usize,
}

impl From<&WedgeMatch> for PatternSummary {
    fn from(m: &WedgeMatch) -> Self {
        let r = &m.result;
        Self {
            pattern: m.pattern_id.as_str(),
            strength: m.strength,
            upper: LineSummary::new(&r.upper, r.upper_slope),
            lower: LineSummary::new(&r.lower, r.lower_slope),
            duration_hours: r.duration_hours,
            convergence_pct: r.convergence.unwrap_or_default() * 100.0,
            height_pct: r.height * 100.0,
            volume_profile: r.volume_profile,
            high_volume_pivots: r.high_volume_pivots,
            combinations_tested: m.combinations_tested,
        }
    }
}

/// One rejected combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationSummary {
    pub upper: LineSummary,
    pub lower: LineSummary,
    pub reasons: Vec<String>,
}

impl From<&PatternResult> for CombinationSummary {
    fn from(r: &PatternResult) -> Self {
        Self {
            upper: LineSummary::new(&r.upper, r.upper_slope),
            lower: LineSummary::new(&r.lower, r.lower_slope),
            reasons: r.reasons.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Why no wedge was found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub highs: usize,
    pub lows: usize,
    pub combinations_tested: usize,
    pub diagnostics: Vec<CombinationSummary>,
}

impl From<&SearchTrace> for FailureSummary {
    fn from(trace: &SearchTrace) -> Self {
        Self {
            highs: trace.highs,
            lows: trace.lows,
            combinations_tested: trace.combinations_tested,
            diagnostics: trace.diagnostics.iter().map(CombinationSummary::from).collect(),
        }
    }
}

/// Summary handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    Pattern(PatternSummary),
    NoPattern(FailureSummary),
    InsufficientData { message: String },
}

impl From<&Detection> for Report {
    fn from(detection: &Detection) -> Self {
        match detection {
            Detection::Found(m) => Report::Pattern(PatternSummary::from(m)),
            Detection::NotFound(trace) => Report::NoPattern(FailureSummary::from(trace)),
            Detection::InsufficientData(why) => Report::from(why),
        }
    }
}

impl From<&InsufficientData> for Report {
    fn from(why: &InsufficientData) -> Self {
        Report::InsufficientData { message: why.to_string() }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Pattern(p) => {
                writeln!(f, "{} (strength {:.2})", p.pattern, p.strength)?;
                writeln!(f, "  upper: {}", p.upper)?;
                writeln!(f, "  lower: {}", p.lower)?;
                write!(
                    f,
                    "  duration {:.1}h, convergence {:.2}%, height {:.2}%, volume {:?}",
                    p.duration_hours, p.convergence_pct, p.height_pct, p.volume_profile
                )
            },
            Report::NoPattern(s) => {
                write!(
                    f,
                    "no falling wedge: {} combinations tested ({} highs, {} lows)",
                    s.combinations_tested, s.highs, s.lows
                )?;
                for (i, c) in s.diagnostics.iter().enumerate() {
                    write!(f, "\n  #{}: {}", i + 1, c.reasons.join("; "))?;
                }
                Ok(())
            },
            Report::InsufficientData { message } => f.write_str(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{FailureReason, PivotPoint};
    use crate::{Direction, PatternId};

    fn pivot(hour: i64, price: f64) -> PivotPoint {
        PivotPoint {
            index: hour as usize,
            timestamp: hour * 3600,
            price,
            volume: 1_000,
            volume_ratio: 1.0,
        }
    }

    fn result(valid: bool) -> PatternResult {
        PatternResult {
            upper: CandidateLine::new(pivot(0, 150.0), pivot(100, 148.0)),
            lower: CandidateLine::new(pivot(0, 140.0), pivot(100, 139.0)),
            upper_slope: Some(-0.02),
            lower_slope: Some(-0.01),
            duration_hours: 100.0,
            convergence: Some(0.1),
            height: 0.08,
            valid,
            reasons: if valid {
                vec![]
            } else {
                vec![FailureReason::DurationTooShort { hours: 10.0, min: 48.0 }]
            },
            volume_profile: VolumeProfile::Flat,
            high_volume_pivots: 0,
        }
    }

    #[test]
    fn test_pattern_summary() {
        let m = WedgeMatch {
            pattern_id: PatternId::FALLING_WEDGE,
            direction: Direction::Bullish,
            strength: 0.09,
            start_index: 0,
            end_index: 100,
            combinations_tested: 4,
            result: result(true),
        };
        let report = Report::from(&Detection::Found(m));

        let Report::Pattern(summary) = &report else {
            panic!("pattern report expected");
        };
        assert!((summary.convergence_pct - 10.0).abs() < 1e-9);
        assert!((summary.height_pct - 8.0).abs() < 1e-9);
        assert_eq!(summary.upper.start_price, Some(150.0));
        assert_eq!(summary.lower.end_price, Some(139.0));
        assert_eq!(summary.combinations_tested, 4);

        let text = report.to_string();
        assert!(text.starts_with("FALLING_WEDGE"));
        assert!(text.contains("-0.0200/h"));
        assert!(text.contains("1970-01-05 04:00"));
    }

    #[test]
    fn test_failure_summary_lists_reasons() {
        let trace = SearchTrace {
            highs: 3,
            lows: 2,
            combinations_tested: 3,
            diagnostics: vec![result(false)],
        };
        let report = Report::from(&Detection::NotFound(trace));
        let text = report.to_string();

        assert!(text.contains("3 combinations tested"));
        assert!(text.contains("#1: pattern duration too short: 10.0h < 48.0h"));
    }

    #[test]
    fn test_insufficient_data_message() {
        let report = Report::from(&InsufficientData::TooFewBars { need: 11, got: 4 });
        assert_eq!(report.to_string(), "insufficient data: need 11 bars, got 4");
    }

    #[test]
    fn test_malformed_line_summary() {
        let line = CandidateLine::from_points(&[]);
        let summary = LineSummary::new(&line, None);
        assert_eq!(summary.start_price, None);
        assert_eq!(summary.to_string(), "? @ ? -> ? @ ? (n/a)");
    }
}
