// ABOUTME: Built-in branding provider appending the FitGlue attribution fragment
// ABOUTME: Runs unconditionally at fan-in, outside the user's pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use async_trait::async_trait;

use fitglue_core::models::ProviderKind;

use crate::contract::{
    EnrichContext, EnrichmentProvider, EnrichmentResult, ProviderError, ProviderManifest,
};

/// Attribution line appended to every enriched activity
const ATTRIBUTION: &str = "Synced with FitGlue (https://fitglue.app)";

/// Appends the FitGlue attribution to the activity description.
///
/// Registered like every other provider, but invoked by the orchestrator at
/// fan-in rather than through user pipeline configuration.
pub struct BrandingProvider;

impl BrandingProvider {
    /// Create the branding provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BrandingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentProvider for BrandingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Branding
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::Branding,
            display_name: "FitGlue Branding".into(),
            description: "Appends the FitGlue attribution to the activity description".into(),
            icon: "sparkles".into(),
            fields: Vec::new(),
        }
    }

    async fn enrich(
        &self,
        _ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        Ok(Some(EnrichmentResult {
            description: Some(ATTRIBUTION.to_owned()),
            ..EnrichmentResult::default()
        }))
    }
}
