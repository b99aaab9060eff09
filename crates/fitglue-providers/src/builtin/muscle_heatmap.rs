// ABOUTME: Muscle heatmap provider rendering per-muscle activation into a bar chart
// ABOUTME: Primary muscles score a full set, secondary muscles half
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;

use fitglue_core::models::{MuscleGroup, ProviderKind, StrengthSet};

use crate::contract::{
    EnrichContext, EnrichmentProvider, EnrichmentResult, ProviderError, ProviderManifest,
};

/// Widest bar rendered for the most-activated muscle group
const MAX_BAR_WIDTH: usize = 10;

/// Renders per-muscle activation of the session's strength sets into a
/// text chart fragment.
pub struct MuscleHeatmapProvider;

impl MuscleHeatmapProvider {
    /// Create the muscle-heatmap provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for MuscleHeatmapProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentProvider for MuscleHeatmapProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MuscleHeatmap
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::MuscleHeatmap,
            display_name: "Muscle Heatmap".into(),
            description: "Charts per-muscle activation in the activity description".into(),
            icon: "activity".into(),
            fields: Vec::new(),
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
        Ok(Some(EnrichmentResult {
            description: Some(render_heatmap(&session.strength_sets)),
            ..EnrichmentResult::default()
        }))
    }
}

/// Score activation per muscle group: each set counts 1.0 toward its primary
/// muscle and 0.5 toward each secondary muscle.
fn activation_scores(sets: &[StrengthSet]) -> BTreeMap<MuscleGroup, f64> {
    let mut scores: BTreeMap<MuscleGroup, f64> = BTreeMap::new();
    for set in sets {
        *scores.entry(set.primary_muscle).or_insert(0.0) += 1.0;
        for muscle in &set.secondary_muscles {
            *scores.entry(*muscle).or_insert(0.0) += 0.5;
        }
    }
    scores
}

fn render_heatmap(sets: &[StrengthSet]) -> String {
    let scores = activation_scores(sets);
    let max = scores.values().copied().fold(0.0_f64, f64::max).max(1.0);
    let widest_name = scores
        .keys()
        .map(|muscle| muscle.display_name().len())
        .max()
        .unwrap_or(0);

    let mut fragment = String::from("Muscle activation:");
    for (muscle, score) in &scores {
        let width = ((score / max) * MAX_BAR_WIDTH as f64).ceil() as usize;
        let bar = "\u{2587}".repeat(width.clamp(1, MAX_BAR_WIDTH));
        let _ = write!(
            fragment,
            "\n{name:<pad$} {bar} {score:.1}",
            name = muscle.display_name(),
            pad = widest_name,
        );
    }
    fragment
}
