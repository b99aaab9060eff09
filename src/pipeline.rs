// ABOUTME: Pipeline resolver mapping a raw event source onto the user's pipelines
// ABOUTME: Legacy Strava integration flag synthesizes a default pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use fitglue_core::models::{Destination, PipelineConfig, UserRecord};

/// Pipeline id used for the synthesized legacy Strava pipeline
pub const LEGACY_STRAVA_PIPELINE_ID: &str = "legacy-strava";

/// Resolve the ordered list of pipelines that must run for a raw event.
///
/// Pipelines whose source filter equals the event source (case-sensitive)
/// are kept in user-declared order. When nothing matches and the user still
/// carries the legacy "strava enabled" integration flag, a single default
/// pipeline with no providers and a Strava destination is synthesized. An
/// empty result is a SKIPPED invocation, not an error.
#[must_use]
pub fn resolve_pipelines(user: &UserRecord, source: &str) -> Vec<PipelineConfig> {
    let matched: Vec<PipelineConfig> = user
        .pipelines
        .iter()
        .filter(|pipeline| pipeline.source == source)
        .cloned()
        .collect();
    if !matched.is_empty() {
        return matched;
    }

    if user.legacy_strava_enabled() {
        tracing::debug!(user = %user.id, %source, "no pipelines matched; using legacy strava fallback");
        return vec![PipelineConfig {
            id: LEGACY_STRAVA_PIPELINE_ID.to_owned(),
            source: source.to_owned(),
            enrichers: Vec::new(),
            destinations: vec![Destination::Strava],
        }];
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitglue_core::models::{EnricherConfig, Integration, Plan, ProviderKind};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn pipeline(id: &str, source: &str) -> PipelineConfig {
        PipelineConfig {
            id: id.into(),
            source: source.into(),
            enrichers: vec![EnricherConfig::bare(ProviderKind::WorkoutSummary)],
            destinations: vec![Destination::Strava],
        }
    }

    fn user(pipelines: Vec<PipelineConfig>, strava_legacy: bool) -> UserRecord {
        let mut integrations = HashMap::new();
        if strava_legacy {
            integrations.insert(
                "strava".to_owned(),
                Integration {
                    enabled: true,
                    credentials_ref: Some("tok".into()),
                },
            );
        }
        UserRecord {
            id: Uuid::new_v4(),
            plan: Plan::Pro,
            integrations,
            pipelines,
            device_tokens: Vec::new(),
            sync_count_this_month: 0,
            sync_count_month: String::new(),
        }
    }

    #[test]
    fn matches_preserve_declaration_order() {
        let user = user(
            vec![
                pipeline("p1", "SOURCE_HEVY"),
                pipeline("p2", "SOURCE_FITBIT"),
                pipeline("p3", "SOURCE_HEVY"),
            ],
            false,
        );
        let resolved = resolve_pipelines(&user, "SOURCE_HEVY");
        let ids: Vec<&str> = resolved.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p1", "p3"]);
    }

    #[test]
    fn source_match_is_case_sensitive() {
        let user = user(vec![pipeline("p1", "SOURCE_HEVY")], false);
        assert!(resolve_pipelines(&user, "source_hevy").is_empty());
    }

    #[test]
    fn legacy_strava_flag_synthesizes_default_pipeline() {
        let user = user(Vec::new(), true);
        let resolved = resolve_pipelines(&user, "SOURCE_HEVY");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, LEGACY_STRAVA_PIPELINE_ID);
        assert!(resolved[0].enrichers.is_empty());
        assert_eq!(resolved[0].destinations, vec![Destination::Strava]);
    }

    #[test]
    fn no_match_and_no_fallback_is_empty() {
        let user = user(vec![pipeline("p1", "SOURCE_FITBIT")], false);
        assert!(resolve_pipelines(&user, "SOURCE_HEVY").is_empty());
    }

    #[test]
    fn explicit_pipelines_suppress_the_fallback() {
        let user = user(vec![pipeline("p1", "SOURCE_HEVY")], true);
        let resolved = resolve_pipelines(&user, "SOURCE_HEVY");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "p1");
    }
}
