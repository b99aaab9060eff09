// ABOUTME: Metadata passthrough provider copying raw-event metadata onto the enriched event
// ABOUTME: Supports an optional key prefix for namespacing downstream consumers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use async_trait::async_trait;

use fitglue_core::models::ProviderKind;

use crate::contract::{
    ConfigField, EnrichContext, EnrichmentProvider, EnrichmentResult, FieldType, ProviderError,
    ProviderManifest,
};

/// Copies the raw activity's metadata entries onto the enriched event.
pub struct MetadataPassthroughProvider;

impl MetadataPassthroughProvider {
    /// Create the passthrough provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for MetadataPassthroughProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentProvider for MetadataPassthroughProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MetadataPassthrough
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::MetadataPassthrough,
            display_name: "Metadata Passthrough".into(),
            description: "Copies upstream metadata entries onto the enriched event".into(),
            icon: "tag".into(),
            fields: vec![ConfigField::optional(
                "prefix",
                "Key prefix",
                FieldType::String,
            )],
        }
    }

    async fn enrich(
        &self,
        ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        if ctx.raw_metadata.is_empty() {
            return Ok(None);
        }
        let prefix = ctx.config.get("prefix").map(String::as_str).unwrap_or("");
        let metadata = ctx
            .raw_metadata
            .iter()
            .map(|(key, value)| (format!("{prefix}{key}"), value.clone()))
            .collect();
        Ok(Some(EnrichmentResult {
            metadata,
            ..EnrichmentResult::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use fitglue_core::models::{ActivityType, StandardizedActivity, UserRecord};
    use uuid::Uuid;

    fn user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            plan: fitglue_core::models::Plan::Free,
            integrations: HashMap::new(),
            pipelines: Vec::new(),
            device_tokens: Vec::new(),
            sync_count_this_month: 0,
            sync_count_month: String::new(),
        }
    }

    fn activity() -> StandardizedActivity {
        StandardizedActivity {
            external_id: "x".into(),
            user_id: Uuid::new_v4(),
            source: "SOURCE_HEVY".into(),
            start_time: Utc::now(),
            name: String::new(),
            description: String::new(),
            activity_type: ActivityType::Other,
            tags: Vec::new(),
            session: None,
        }
    }

    #[tokio::test]
    async fn copies_metadata_with_prefix() {
        let provider = MetadataPassthroughProvider::new();
        let activity = activity();
        let user = user();
        let config: HashMap<String, String> =
            [("prefix".to_owned(), "hevy.".to_owned())].into_iter().collect();
        let raw: HashMap<String, String> =
            [("routineId".to_owned(), "42".to_owned())].into_iter().collect();
        let result = provider
            .enrich(EnrichContext {
                activity: &activity,
                user: &user,
                config: &config,
                raw_metadata: &raw,
                do_not_retry: false,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.metadata.get("hevy.routineId").map(String::as_str), Some("42"));
    }

    #[tokio::test]
    async fn empty_metadata_skips() {
        let provider = MetadataPassthroughProvider::new();
        let activity = activity();
        let user = user();
        let config = HashMap::new();
        let raw = HashMap::new();
        let result = provider
            .enrich(EnrichContext {
                activity: &activity,
                user: &user,
                config: &config,
                raw_metadata: &raw,
                do_not_retry: false,
            })
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
