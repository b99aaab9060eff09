// ABOUTME: Fan-in phase merging provider outputs into one enriched activity event
// ABOUTME: Lap synthesis, 1 Hz record padding, stream merge, and metadata aggregation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::BTreeMap;

use chrono::Duration;
use uuid::Uuid;

use fitglue_core::models::{
    Lap, PipelineConfig, ProviderKind, Record, StandardizedActivity,
};
use fitglue_providers::EnrichmentResult;

use crate::events::{EnrichedActivityEvent, RawActivityEvent};

/// Apply the non-stream parts of a provider result to the working activity.
///
/// Streams are deliberately left out: they are held aside and merged at
/// fan-in so providers cannot corrupt each other's stream views.
pub fn apply_result(working: &mut StandardizedActivity, result: &EnrichmentResult) {
    if let Some(name) = &result.new_name {
        working.name = name.clone();
    }
    if let Some(suffix) = &result.name_suffix {
        working.name.push_str(suffix);
    }
    if let Some(fragment) = &result.description {
        append_fragment(&mut working.description, fragment);
    }
    if let Some(activity_type) = result.activity_type {
        working.activity_type = activity_type;
    }
    working.tags.extend(result.tags.iter().cloned());
}

/// Join a description fragment onto the working description with a blank
/// line, trimming whitespace on both sides.
pub fn append_fragment(description: &mut String, fragment: &str) {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return;
    }
    let existing = description.trim();
    *description = if existing.is_empty() {
        fragment.to_owned()
    } else {
        format!("{existing}\n\n{fragment}")
    };
}

/// Build the enriched event from the working activity and the provider
/// results collected during the pipeline run.
///
/// The activity id is minted deterministically from the pipeline execution:
/// redeliveries that carry the same correlation id reproduce the same event
/// bytes, and downstream consumers deduplicate on it.
#[must_use]
pub fn assemble_event(
    mut working: StandardizedActivity,
    raw: &RawActivityEvent,
    pipeline: &PipelineConfig,
    pipeline_execution_id: Uuid,
    results: &[(ProviderKind, EnrichmentResult)],
) -> EnrichedActivityEvent {
    let activity_id = Uuid::new_v5(
        &pipeline_execution_id,
        format!("{}:{}", pipeline.id, raw.activity.external_id).as_bytes(),
    );

    if let Some(session) = working.session.as_mut() {
        if session.laps.is_empty() {
            session.laps.push(Lap {
                start_time: session.start_time,
                total_elapsed_time: session.total_elapsed_time,
                records: Vec::new(),
            });
        }
        let start = session.start_time;
        let seconds = session.elapsed_whole_seconds();
        pad_records(&mut session.laps[0].records, start, seconds);
        for (_, result) in results {
            merge_streams(&mut session.laps[0].records, result);
        }
    }

    let mut metadata = BTreeMap::new();
    let mut applied_enrichments = Vec::with_capacity(results.len());
    for (kind, result) in results {
        for (key, value) in &result.metadata {
            metadata.insert(key.clone(), value.clone());
        }
        applied_enrichments.push(kind.as_str().to_owned());
    }

    EnrichedActivityEvent {
        user_id: raw.user_id,
        source: raw.source.clone(),
        activity_id,
        title: working.name.clone(),
        description: working.description.clone(),
        activity_type: working.activity_type,
        applied_enrichments,
        metadata,
        destinations: pipeline.destinations.clone(),
        pipeline_id: pipeline.id.clone(),
        pipeline_execution_id,
        artifact_uri: None,
        original_start_time: raw.activity.start_time,
        activity: working,
    }
}

/// Pad the record list to cover the full duration at 1 Hz; each missing
/// record is `(start + k seconds)` with every sensor field absent.
fn pad_records(records: &mut Vec<Record>, start: chrono::DateTime<chrono::Utc>, seconds: u64) {
    let target = seconds as usize;
    for offset in records.len()..target {
        records.push(Record::empty_at(start + Duration::seconds(offset as i64)));
    }
}

/// Merge one provider's streams into the records by index.
///
/// Heart rate and power only overwrite when the provider sample is
/// non-zero; latitude and longitude are written unconditionally where the
/// stream provides them.
fn merge_streams(records: &mut [Record], result: &EnrichmentResult) {
    if let Some(stream) = &result.heart_rate_stream {
        for (record, sample) in records.iter_mut().zip(stream) {
            if *sample > 0 {
                record.heart_rate = Some(*sample);
            }
        }
    }
    if let Some(stream) = &result.power_stream {
        for (record, sample) in records.iter_mut().zip(stream) {
            if *sample > 0 {
                record.power = Some(*sample);
            }
        }
    }
    if let Some(stream) = &result.latitude_stream {
        for (record, sample) in records.iter_mut().zip(stream) {
            record.latitude = Some(*sample);
        }
    }
    if let Some(stream) = &result.longitude_stream {
        for (record, sample) in records.iter_mut().zip(stream) {
            record.longitude = Some(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use fitglue_core::models::{ActivityType, Destination, Session};

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 7, 0, 0).unwrap()
    }

    fn working(elapsed: f64) -> StandardizedActivity {
        StandardizedActivity {
            external_id: "w-7".into(),
            user_id: Uuid::new_v4(),
            source: "SOURCE_HEVY".into(),
            start_time: start(),
            name: "Session".into(),
            description: String::new(),
            activity_type: ActivityType::Running,
            tags: Vec::new(),
            session: Some(Session {
                start_time: start(),
                total_elapsed_time: elapsed,
                total_distance: 0.0,
                laps: Vec::new(),
                strength_sets: Vec::new(),
            }),
        }
    }

    fn raw(activity: &StandardizedActivity) -> RawActivityEvent {
        RawActivityEvent {
            activity: activity.clone(),
            source: activity.source.clone(),
            user_id: activity.user_id,
            original_payload: None,
            metadata: HashMap::new(),
            pipeline_execution_id: None,
        }
    }

    fn pipeline() -> PipelineConfig {
        PipelineConfig {
            id: "p1".into(),
            source: "SOURCE_HEVY".into(),
            enrichers: Vec::new(),
            destinations: vec![Destination::Strava],
        }
    }

    #[test]
    fn fragments_join_with_blank_lines_and_trim() {
        let mut description = String::new();
        append_fragment(&mut description, "  first  ");
        append_fragment(&mut description, "\nsecond\n");
        append_fragment(&mut description, "   ");
        assert_eq!(description, "first\n\nsecond");
    }

    #[test]
    fn padding_covers_full_duration_at_one_hertz() {
        let activity = working(120.4);
        let raw = raw(&activity);
        let event = assemble_event(activity, &raw, &pipeline(), Uuid::new_v4(), &[]);
        let session = event.activity.session.unwrap();
        assert_eq!(session.laps.len(), 1);
        assert_eq!(session.laps[0].records.len(), 120);
        assert_eq!(session.laps[0].records[119].timestamp, start() + Duration::seconds(119));
        assert!(!session.laps[0].records[119].has_sensor_data());
    }

    #[test]
    fn zero_samples_never_overwrite_nonzero() {
        let activity = working(4.0);
        let raw = raw(&activity);
        let first = EnrichmentResult {
            heart_rate_stream: Some(vec![100, 101, 102, 103]),
            ..EnrichmentResult::default()
        };
        let second = EnrichmentResult {
            heart_rate_stream: Some(vec![0, 110, 0, 111]),
            ..EnrichmentResult::default()
        };
        let event = assemble_event(
            activity,
            &raw,
            &pipeline(),
            Uuid::new_v4(),
            &[
                (ProviderKind::FitbitHeartRate, first),
                (ProviderKind::MetadataPassthrough, second),
            ],
        );
        let records = event.activity.session.unwrap().laps[0].records.clone();
        let heart_rates: Vec<u32> = records.iter().filter_map(|record| record.heart_rate).collect();
        assert_eq!(heart_rates, vec![100, 110, 102, 111]);
    }

    #[test]
    fn later_metadata_wins_and_applied_order_is_kept() {
        let activity = working(2.0);
        let raw = raw(&activity);
        let mut first_metadata = HashMap::new();
        first_metadata.insert("key".to_owned(), "first".to_owned());
        let mut second_metadata = HashMap::new();
        second_metadata.insert("key".to_owned(), "second".to_owned());
        let event = assemble_event(
            activity,
            &raw,
            &pipeline(),
            Uuid::new_v4(),
            &[
                (
                    ProviderKind::WorkoutSummary,
                    EnrichmentResult {
                        metadata: first_metadata,
                        ..EnrichmentResult::default()
                    },
                ),
                (
                    ProviderKind::MuscleHeatmap,
                    EnrichmentResult {
                        metadata: second_metadata,
                        ..EnrichmentResult::default()
                    },
                ),
            ],
        );
        assert_eq!(event.metadata.get("key").map(String::as_str), Some("second"));
        assert_eq!(
            event.applied_enrichments,
            vec!["workout-summary".to_owned(), "muscle-heatmap".to_owned()]
        );
    }

    #[test]
    fn activity_id_is_deterministic_per_execution() {
        let activity = working(2.0);
        let raw = raw(&activity);
        let execution = Uuid::new_v4();
        let a = assemble_event(activity.clone(), &raw, &pipeline(), execution, &[]);
        let b = assemble_event(activity, &raw, &pipeline(), execution, &[]);
        assert_eq!(a.activity_id, b.activity_id);
    }

    #[test]
    fn apply_result_sets_name_suffix_and_type() {
        let mut activity = working(2.0);
        apply_result(
            &mut activity,
            &EnrichmentResult {
                new_name: Some("Morning Run".into()),
                name_suffix: Some(" 🏃".into()),
                activity_type: Some(ActivityType::Cycling),
                tags: vec!["tempo".into()],
                ..EnrichmentResult::default()
            },
        );
        assert_eq!(activity.name, "Morning Run 🏃");
        assert_eq!(activity.activity_type, ActivityType::Cycling);
        assert_eq!(activity.tags, vec!["tempo".to_owned()]);
    }
}
