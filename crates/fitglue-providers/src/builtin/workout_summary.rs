// ABOUTME: Workout summary provider rendering strength sets into a description fragment
// ABOUTME: Groups sets per exercise preserving declaration order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::fmt::Write as _;

use async_trait::async_trait;

use fitglue_core::models::{ProviderKind, StrengthSet};

use crate::contract::{
    ConfigField, EnrichContext, EnrichmentProvider, EnrichmentResult, FieldType, ProviderError,
    ProviderManifest,
};

/// Renders the session's strength sets into a per-exercise summary fragment.
pub struct WorkoutSummaryProvider;

impl WorkoutSummaryProvider {
    /// Create the workout-summary provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for WorkoutSummaryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentProvider for WorkoutSummaryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WorkoutSummary
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::WorkoutSummary,
            display_name: "Workout Summary".into(),
            description: "Summarizes strength exercises into the activity description".into(),
            icon: "list".into(),
            fields: vec![ConfigField::optional(
                "includeWeights",
                "Include weights",
                FieldType::Boolean,
            )],
        }
    }

    async fn enrich(
        &self,
        ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        let Some(session) = ctx.activity.session.as_ref() else {
            return Ok(None);
        };
        if session.strength_sets.is_empty() {
            return Ok(None);
        }
        let include_weights = ctx
            .config
            .get("includeWeights")
            .is_none_or(|value| value == "true");

        let fragment = render_summary(&session.strength_sets, include_weights);
        Ok(Some(EnrichmentResult {
            description: Some(fragment),
            ..EnrichmentResult::default()
        }))
    }
}

/// Group sets by exercise preserving first-seen order and render one line
/// per exercise.
fn render_summary(sets: &[StrengthSet], include_weights: bool) -> String {
    let mut order: Vec<&str> = Vec::new();
    for set in sets {
        if !order.contains(&set.exercise.as_str()) {
            order.push(&set.exercise);
        }
    }

    let mut fragment = String::from("Workout:");
    for exercise in order {
        let exercise_sets: Vec<&StrengthSet> = sets
            .iter()
            .filter(|set| set.exercise == exercise)
            .collect();
        let _ = write!(fragment, "\n{exercise}: ");
        fragment.push_str(&render_exercise(&exercise_sets, include_weights));
    }
    fragment
}

fn render_exercise(sets: &[&StrengthSet], include_weights: bool) -> String {
    let uniform = sets
        .iter()
        .all(|set| set.reps == sets[0].reps && (set.weight_kg - sets[0].weight_kg).abs() < f64::EPSILON);
    if uniform {
        let first = sets[0];
        format!(
            "{}\u{d7}{}{}",
            sets.len(),
            first.reps,
            render_weight(first.weight_kg, include_weights)
        )
    } else {
        sets.iter()
            .map(|set| format!("{}{}", set.reps, render_weight(set.weight_kg, include_weights)))
            .collect::<Vec<String>>()
            .join(", ")
    }
}

fn render_weight(weight_kg: f64, include_weights: bool) -> String {
    if !include_weights || weight_kg <= 0.0 {
        String::new()
    } else if (weight_kg - weight_kg.round()).abs() < 0.05 {
        format!(" @ {} kg", weight_kg.round() as i64)
    } else {
        format!(" @ {weight_kg:.1} kg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitglue_core::models::MuscleGroup;

    fn set(exercise: &str, reps: u32, weight_kg: f64) -> StrengthSet {
        StrengthSet {
            exercise: exercise.into(),
            reps,
            weight_kg,
            primary_muscle: MuscleGroup::Chest,
            secondary_muscles: Vec::new(),
            superset_id: None,
        }
    }

    #[test]
    fn uniform_sets_collapse() {
        let sets = vec![
            set("Bench Press", 10, 60.0),
            set("Bench Press", 10, 60.0),
            set("Bench Press", 10, 60.0),
        ];
        let fragment = render_summary(&sets, true);
        assert!(fragment.contains("Bench Press: 3\u{d7}10 @ 60 kg"));
    }

    #[test]
    fn varied_sets_list_individually() {
        let sets = vec![set("Deadlift", 5, 140.0), set("Deadlift", 3, 150.0)];
        let fragment = render_summary(&sets, true);
        assert!(fragment.contains("Deadlift: 5 @ 140 kg, 3 @ 150 kg"));
    }

    #[test]
    fn bodyweight_sets_omit_weight() {
        let sets = vec![set("Pull Up", 12, 0.0), set("Pull Up", 12, 0.0)];
        let fragment = render_summary(&sets, true);
        assert!(fragment.contains("Pull Up: 2\u{d7}12"));
        assert!(!fragment.contains("kg"));
    }

    #[test]
    fn exercises_keep_declaration_order() {
        let sets = vec![
            set("Squat", 5, 100.0),
            set("Bench Press", 5, 80.0),
            set("Squat", 5, 100.0),
        ];
        let fragment = render_summary(&sets, true);
        let squat = fragment.find("Squat").unwrap();
        let bench = fragment.find("Bench Press").unwrap();
        assert!(squat < bench);
    }
}
