// ABOUTME: Property tests for the time-series aligner's drift and fill behaviour
// ABOUTME: Verifies the 1% status boundary and first/last-value edge filling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use fitglue_providers::align::{align_series, AlignerConfig, AlignmentStatus};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 6, 0, 0).unwrap()
}

fn timeline(seconds: i64) -> Vec<DateTime<Utc>> {
    (0..seconds).map(|k| base() + Duration::seconds(k)).collect()
}

/// Samples spanning `span_seconds` with a constant value
fn flat_samples(span_seconds: f64, value: u32) -> Vec<(DateTime<Utc>, u32)> {
    let count = 50;
    (0..=count)
        .map(|step| {
            let fraction = step as f64 / count as f64;
            (
                base() + Duration::milliseconds((span_seconds * 1000.0 * fraction) as i64),
                value,
            )
        })
        .collect()
}

#[test]
fn reported_drift_is_accurate_to_a_tenth_of_a_point() {
    // Timeline spans 999 s; sample stream spans various known fractions.
    let points = timeline(1000);
    for (sample_span, expected_drift) in [(999.0, 0.0), (994.005, 0.5), (979.02, 2.0)] {
        let alignment = align_series(&points, &flat_samples(sample_span, 120), &AlignerConfig::default());
        assert!(
            (alignment.drift_percent - expected_drift).abs() < 0.1,
            "span {sample_span}: reported {:.3}, wanted {expected_drift}",
            alignment.drift_percent
        );
    }
}

#[test]
fn status_crosses_at_exactly_one_percent() {
    let points = timeline(1000);
    // 0.9% drift: success.
    let alignment = align_series(
        &points,
        &flat_samples(999.0 * 0.991, 120),
        &AlignerConfig::default(),
    );
    assert_eq!(alignment.status, AlignmentStatus::Success);

    // 1.1% drift: flagged best-effort.
    let alignment = align_series(
        &points,
        &flat_samples(999.0 * 0.989, 120),
        &AlignerConfig::default(),
    );
    assert_eq!(alignment.status, AlignmentStatus::HighDriftBestEffort);
    assert!(alignment.warning.is_some());
}

#[test]
fn sparse_samples_fill_every_dense_index() {
    let points = timeline(600);
    let samples = vec![
        (base() + Duration::seconds(100), 95),
        (base() + Duration::seconds(300), 140),
        (base() + Duration::seconds(500), 120),
    ];
    let alignment = align_series(&points, &samples, &AlignerConfig::default());
    assert_eq!(alignment.values.len(), 600);
    assert!(alignment.values.iter().all(|value| *value > 0));

    // Pre-first and post-last indices take the first/last sample values.
    assert_eq!(alignment.values[0], 95);
    assert_eq!(alignment.values[50], 95);
    assert_eq!(alignment.values[599], 120);

    // Interpolation is monotone between the first two samples.
    assert_eq!(alignment.values[200], 118);
}

#[test]
fn interpolation_rounds_to_nearest_integer() {
    let points = vec![base(), base() + Duration::seconds(1), base() + Duration::seconds(2)];
    let samples = vec![(base(), 100), (base() + Duration::seconds(2), 101)];
    let alignment = align_series(&points, &samples, &AlignerConfig::default());
    // Midpoint 100.5 rounds away from zero.
    assert_eq!(alignment.values, vec![100, 101, 101]);
}

#[test]
fn statuses_for_missing_inputs() {
    let alignment = align_series(&[], &flat_samples(60.0, 100), &AlignerConfig::default());
    assert_eq!(alignment.status, AlignmentStatus::SkippedNoGps);

    let alignment = align_series(&timeline(60), &[], &AlignerConfig::default());
    assert_eq!(alignment.status, AlignmentStatus::SkippedNoHr);
    assert_eq!(alignment.values, vec![0; 60]);
    assert!(alignment.warning.is_some());
}
