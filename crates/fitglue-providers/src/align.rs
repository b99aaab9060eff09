// ABOUTME: Time-series alignment of sparse external samples onto record timelines
// ABOUTME: Linear interpolation with edge fill and duration-drift reporting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default relative duration mismatch tolerated before flagging the result
pub const DEFAULT_DRIFT_THRESHOLD_PERCENT: f64 = 1.0;

/// Aligner configuration
#[derive(Debug, Clone, Copy)]
pub struct AlignerConfig {
    /// Drift percentage above which the alignment is flagged as best-effort
    pub drift_threshold_percent: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            drift_threshold_percent: DEFAULT_DRIFT_THRESHOLD_PERCENT,
        }
    }
}

/// Outcome classification of one alignment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    /// Samples projected onto the timeline within drift tolerance
    Success,
    /// Projection succeeded but durations diverged beyond tolerance
    HighDriftBestEffort,
    /// No external samples were available; output is all zeros
    SkippedNoHr,
    /// The activity has no record timeline to project onto
    SkippedNoGps,
}

impl AlignmentStatus {
    /// Snake-case identifier matching the wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::HighDriftBestEffort => "high_drift_best_effort",
            Self::SkippedNoHr => "skipped_no_hr",
            Self::SkippedNoGps => "skipped_no_gps",
        }
    }
}

/// Result of projecting a sample stream onto a record timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// One value per timeline entry
    pub values: Vec<u32>,
    /// Relative duration mismatch between the two series, in percent
    pub drift_percent: f64,
    /// Outcome classification
    pub status: AlignmentStatus,
    /// Operator-facing warning for skipped or high-drift alignments
    pub warning: Option<String>,
}

/// Project `samples` onto `timeline` by value-space linear interpolation.
///
/// Timeline entries before the first sample take the first sample's value;
/// entries after the last sample take the last sample's value. Small clock
/// skews are absorbed silently by the interpolation; larger duration
/// mismatches are reported as drift rather than corrected — the aligner
/// deliberately does not attempt DTW-style warping.
///
/// Both inputs must be ordered by timestamp.
#[must_use]
pub fn align_series(
    timeline: &[DateTime<Utc>],
    samples: &[(DateTime<Utc>, u32)],
    config: &AlignerConfig,
) -> Alignment {
    if timeline.is_empty() {
        return Alignment {
            values: Vec::new(),
            drift_percent: 0.0,
            status: AlignmentStatus::SkippedNoGps,
            warning: None,
        };
    }
    if samples.is_empty() {
        return Alignment {
            values: vec![0; timeline.len()],
            drift_percent: 0.0,
            status: AlignmentStatus::SkippedNoHr,
            warning: Some("no external samples to align; stream left empty".into()),
        };
    }

    let values = timeline
        .iter()
        .map(|point| interpolate_at(*point, samples))
        .collect();

    let drift_percent = duration_drift_percent(timeline, samples);
    if drift_percent > config.drift_threshold_percent {
        Alignment {
            values,
            drift_percent,
            status: AlignmentStatus::HighDriftBestEffort,
            warning: Some(format!(
                "sample stream duration drifts {drift_percent:.2}% from the record timeline; \
                 aligned best-effort"
            )),
        }
    } else {
        Alignment {
            values,
            drift_percent,
            status: AlignmentStatus::Success,
            warning: None,
        }
    }
}

fn interpolate_at(point: DateTime<Utc>, samples: &[(DateTime<Utc>, u32)]) -> u32 {
    // Index of the first sample strictly after `point`.
    let next = samples.partition_point(|(at, _)| *at <= point);
    if next == 0 {
        return samples[0].1;
    }
    if next == samples.len() {
        return samples[samples.len() - 1].1;
    }

    let (before_at, before_value) = samples[next - 1];
    let (after_at, after_value) = samples[next];
    let span_ms = after_at.signed_duration_since(before_at).num_milliseconds();
    if span_ms <= 0 {
        return before_value;
    }
    let offset_ms = point.signed_duration_since(before_at).num_milliseconds();
    let fraction = offset_ms as f64 / span_ms as f64;
    let interpolated =
        f64::from(before_value) + (f64::from(after_value) - f64::from(before_value)) * fraction;
    interpolated.round().max(0.0) as u32
}

fn duration_drift_percent(timeline: &[DateTime<Utc>], samples: &[(DateTime<Utc>, u32)]) -> f64 {
    let timeline_seconds = span_seconds(timeline.first(), timeline.last());
    if timeline_seconds <= 0.0 {
        return 0.0;
    }
    let sample_seconds = span_seconds(
        samples.first().map(|(at, _)| at),
        samples.last().map(|(at, _)| at),
    );
    (timeline_seconds - sample_seconds).abs() / timeline_seconds * 100.0
}

fn span_seconds(first: Option<&DateTime<Utc>>, last: Option<&DateTime<Utc>>) -> f64 {
    match (first, last) {
        (Some(first), Some(last)) => {
            last.signed_duration_since(*first).num_milliseconds() as f64 / 1000.0
        }
        _ => 0.0,
    }
}
