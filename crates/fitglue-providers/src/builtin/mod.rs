// ABOUTME: Built-in enrichment provider catalogue and registration helper
// ABOUTME: Shared timeline helpers used by stream-producing providers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use fitglue_core::models::StandardizedActivity;

use crate::registry::ProviderRegistry;

/// Built-in attribution step appended at fan-in
pub mod branding;
/// Fitbit intraday heart-rate fetch and alignment
pub mod fitbit_heart_rate;
/// Raw-metadata passthrough
pub mod metadata_passthrough;
/// Per-muscle activation chart
pub mod muscle_heatmap;
/// Canonical upstream deep-links
pub mod source_link;
/// Wait-for-input gate on missing fields
pub mod user_input;
/// Synthetic GPS traces along named routes
pub mod virtual_gps;
/// Strength-set description summaries
pub mod workout_summary;

/// Register every built-in provider into `registry`.
///
/// Called once at process start; tests call it against private registries.
pub fn install(registry: &mut ProviderRegistry) {
    registry.register(Arc::new(metadata_passthrough::MetadataPassthroughProvider::new()));
    registry.register(Arc::new(workout_summary::WorkoutSummaryProvider::new()));
    registry.register(Arc::new(muscle_heatmap::MuscleHeatmapProvider::new()));
    registry.register(Arc::new(source_link::SourceLinkProvider::new()));
    registry.register(Arc::new(virtual_gps::VirtualGpsProvider::new()));
    registry.register(Arc::new(fitbit_heart_rate::FitbitHeartRateProvider::default()));
    registry.register(Arc::new(user_input::UserInputProvider::new()));
    registry.register(Arc::new(branding::BrandingProvider::new()));
}

/// The activity's own record timeline, used to project external streams.
///
/// Prefers the first lap's record timestamps; activities without records
/// (strength or indoor workouts) fall back to a synthetic 1 Hz timeline
/// spanning the session, matching the padding the fan-in applies.
#[must_use]
pub fn record_timeline(activity: &StandardizedActivity) -> Vec<DateTime<Utc>> {
    let Some(session) = activity.session.as_ref() else {
        return Vec::new();
    };
    if let Some(lap) = session.laps.first() {
        if !lap.records.is_empty() {
            return lap.records.iter().map(|record| record.timestamp).collect();
        }
    }
    let seconds = session.elapsed_whole_seconds();
    (0..seconds)
        .map(|offset| session.start_time + Duration::seconds(offset as i64))
        .collect()
}
