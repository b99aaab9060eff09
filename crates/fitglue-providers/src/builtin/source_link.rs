// ABOUTME: Source link provider appending the canonical upstream deep-link
// ABOUTME: Maps known source tags to their public workout URL templates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use async_trait::async_trait;

use fitglue_core::models::ProviderKind;

use crate::contract::{
    EnrichContext, EnrichmentProvider, EnrichmentResult, ProviderError, ProviderManifest,
};

/// Appends a deep-link back to the workout on its upstream source.
///
/// Sources without a public URL scheme are skipped.
pub struct SourceLinkProvider;

impl SourceLinkProvider {
    /// Create the source-link provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SourceLinkProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn link_for(source: &str, external_id: &str) -> Option<(String, &'static str)> {
    match source {
        "SOURCE_HEVY" => Some((
            format!("https://hevy.com/workout/{external_id}"),
            "Hevy",
        )),
        "SOURCE_FITBIT" => Some((
            format!("https://www.fitbit.com/activities/exercise/{external_id}"),
            "Fitbit",
        )),
        _ => None,
    }
}

#[async_trait]
impl EnrichmentProvider for SourceLinkProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SourceLink
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::SourceLink,
            display_name: "Source Link".into(),
            description: "Appends a link back to the workout on its upstream source".into(),
            icon: "link".into(),
            fields: Vec::new(),
        }
    }

    async fn enrich(
        &self,
        ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        let Some((url, label)) = link_for(&ctx.activity.source, &ctx.activity.external_id) else {
            tracing::debug!(source = %ctx.activity.source, "no deep-link template for source");
            return Ok(None);
        };
        Ok(Some(EnrichmentResult {
            description: Some(format!("View on {label}: {url}")),
            ..EnrichmentResult::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hevy_links_to_workout_page() {
        let (url, label) = link_for("SOURCE_HEVY", "abc123").unwrap();
        assert_eq!(url, "https://hevy.com/workout/abc123");
        assert_eq!(label, "Hevy");
    }

    #[test]
    fn unknown_sources_have_no_link() {
        assert!(link_for("SOURCE_UNKNOWN", "x").is_none());
        // Case-sensitive like the rest of source matching.
        assert!(link_for("source_hevy", "x").is_none());
    }
}
