// ABOUTME: Raw and enriched activity event payloads plus the bus envelope
// ABOUTME: Canonical camelCase wire naming with snake_case ingress aliases
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fitglue_core::models::{ActivityType, Destination, StandardizedActivity};

/// Message-bus attribute keys recognized on event envelopes
pub mod attr {
    /// Marks where a message was (re-)published from; absent on first attempt
    pub const ORIGIN: &str = "origin";
    /// `origin` value set on lag-queue redeliveries
    pub const LAG_QUEUE: &str = "lag-queue";
    /// Correlates all rows and events of one pipeline execution
    pub const PIPELINE_EXECUTION_ID: &str = "pipeline_execution_id";
    /// Test-run correlation tag propagated to audit rows
    pub const TEST_RUN_ID: &str = "test_run_id";
}

/// A message as delivered by the bus: payload text, attributes, publish time.
///
/// The payload is kept as raw JSON text so lag-queue offloads republish the
/// original bytes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    /// JSON payload text
    pub data: String,
    /// Bus attributes (extensions)
    pub attributes: HashMap<String, String>,
    /// When the message was published
    pub publish_time: DateTime<Utc>,
}

impl EventEnvelope {
    /// Envelope with no attributes
    #[must_use]
    pub fn new(data: String, publish_time: DateTime<Utc>) -> Self {
        Self {
            data,
            attributes: HashMap::new(),
            publish_time,
        }
    }

    /// Attach an attribute, builder-style
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }

    /// The `origin` attribute, if present
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.attributes.get(attr::ORIGIN).map(String::as_str)
    }

    /// Whether this delivery came through the lag queue
    #[must_use]
    pub fn is_lag_redelivery(&self) -> bool {
        self.origin() == Some(attr::LAG_QUEUE)
    }

    /// The pipeline-execution correlation id attribute, parsed
    #[must_use]
    pub fn pipeline_execution_id(&self) -> Option<Uuid> {
        self.attributes
            .get(attr::PIPELINE_EXECUTION_ID)
            .and_then(|value| value.parse().ok())
    }

    /// The test-run correlation tag, if present
    #[must_use]
    pub fn test_run_id(&self) -> Option<&str> {
        self.attributes.get(attr::TEST_RUN_ID).map(String::as_str)
    }
}

/// A raw workout event consumed from the input queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawActivityEvent {
    /// The standardized activity produced by the ingestion adapter
    pub activity: StandardizedActivity,
    /// Source tag, duplicated from the activity for routing
    pub source: String,
    /// Owning user
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
    /// Provider-native payload kept for debugging and resume
    #[serde(
        default,
        alias = "original_payload",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_payload: Option<serde_json::Value>,
    /// Ingestion metadata forwarded to providers
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Pipeline-execution correlation id, when re-injected by the resume path
    #[serde(
        default,
        alias = "pipeline_execution_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub pipeline_execution_id: Option<Uuid>,
}

/// An enriched activity event published to the output queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedActivityEvent {
    /// Owning user
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
    /// Source tag of the raw activity
    pub source: String,
    /// Freshly minted activity id, unique per emitted event
    #[serde(alias = "activity_id")]
    pub activity_id: Uuid,
    /// The enriched standardized activity
    pub activity: StandardizedActivity,
    /// Resolved title
    pub title: String,
    /// Resolved description
    pub description: String,
    /// Resolved activity category
    #[serde(alias = "activity_type")]
    pub activity_type: ActivityType,
    /// Provider-type names applied during enrichment, in order
    #[serde(default, alias = "applied_enrichments")]
    pub applied_enrichments: Vec<String>,
    /// Merged metadata entries (later providers overwrite earlier keys).
    /// Ordered so identical inputs emit byte-identical payloads.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Destinations the routing workers should deliver to
    #[serde(default)]
    pub destinations: Vec<Destination>,
    /// Pipeline that produced this event
    #[serde(alias = "pipeline_id")]
    pub pipeline_id: String,
    /// Correlates this event with its audit rows
    #[serde(alias = "pipeline_execution_id")]
    pub pipeline_execution_id: Uuid,
    /// URI of the encoded artifact, when encoding succeeded
    #[serde(
        default,
        alias = "artifact_uri",
        skip_serializing_if = "Option::is_none"
    )]
    pub artifact_uri: Option<String>,
    /// Start time of the original raw activity
    #[serde(alias = "original_start_time")]
    pub original_start_time: DateTime<Utc>,
}
