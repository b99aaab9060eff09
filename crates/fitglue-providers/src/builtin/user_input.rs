// ABOUTME: User-input provider gating the pipeline on missing activity fields
// ABOUTME: Raises WaitForInput so the orchestrator parks the activity for the resume path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use async_trait::async_trait;

use fitglue_core::models::{ActivityType, ProviderKind};

use crate::contract::{
    ConfigField, EnrichContext, EnrichmentProvider, EnrichmentResult, FieldType, ProviderError,
    ProviderManifest,
};

/// Field names the provider can require
const FIELD_OPTIONS: [&str; 3] = ["title", "description", "activity_type"];

/// Halts processing until the user supplies the configured fields.
///
/// The orchestrator persists a pending-input row and notifies the user; the
/// resume path re-publishes the original payload once the fields exist.
pub struct UserInputProvider;

impl UserInputProvider {
    /// Create the user-input provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for UserInputProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn field_is_missing(field: &str, ctx: &EnrichContext<'_>) -> bool {
    match field {
        "title" => ctx.activity.name.trim().is_empty(),
        "description" => ctx.activity.description.trim().is_empty(),
        "activity_type" => ctx.activity.activity_type == ActivityType::Other,
        _ => false,
    }
}

#[async_trait]
impl EnrichmentProvider for UserInputProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::UserInput
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::UserInput,
            display_name: "User Input".into(),
            description: "Pauses enrichment until the user fills in missing fields".into(),
            icon: "edit".into(),
            fields: vec![ConfigField::optional(
                "fields",
                "Required fields",
                FieldType::MultiSelect {
                    options: FIELD_OPTIONS.iter().map(|field| (*field).to_owned()).collect(),
                },
            )],
        }
    }

    async fn enrich(
        &self,
        ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        let configured = ctx.config.get("fields").map(String::as_str).unwrap_or("title");
        let missing: Vec<String> = configured
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .filter(|field| field_is_missing(field, &ctx))
            .map(str::to_owned)
            .collect();

        if missing.is_empty() {
            Ok(None)
        } else {
            Err(ProviderError::WaitForInput { fields: missing })
        }
    }
}
