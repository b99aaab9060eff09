// ABOUTME: User records, plans, integrations, and pipeline configuration models
// ABOUTME: Plan, Integration, PipelineConfig, EnricherConfig, and Destination definitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// User plan for tier gating - bounds the monthly sync counter
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free plan with a monthly sync cap
    #[default]
    Free,
    /// Paid plan with unlimited syncs
    Pro,
}

impl Plan {
    /// Monthly successful-sync limit for this plan, `None` meaning unlimited
    #[must_use]
    pub const fn monthly_limit(self) -> Option<u32> {
        match self {
            Self::Free => Some(30),
            Self::Pro => None,
        }
    }

    /// Convert to string for storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            other => Err(CoreError::InvalidPlan(other.to_owned())),
        }
    }
}

/// Stable identifier for an enrichment provider type.
///
/// Wire values are kebab-case (`"fitbit-heart-rate"`); this is the key the
/// provider registry resolves against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Copies raw metadata entries onto the enriched event
    MetadataPassthrough,
    /// Renders strength sets into a description fragment
    WorkoutSummary,
    /// Renders per-muscle activation into a description fragment
    MuscleHeatmap,
    /// Appends the canonical upstream deep-link
    SourceLink,
    /// Synthesizes a GPS trace along a named route
    VirtualGps,
    /// Fetches and aligns intraday heart-rate samples from Fitbit
    FitbitHeartRate,
    /// Requests missing fields from the user before continuing
    UserInput,
    /// Built-in attribution step appended at fan-in
    Branding,
}

impl ProviderKind {
    /// Kebab-case identifier, matching the wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MetadataPassthrough => "metadata-passthrough",
            Self::WorkoutSummary => "workout-summary",
            Self::MuscleHeatmap => "muscle-heatmap",
            Self::SourceLink => "source-link",
            Self::VirtualGps => "virtual-gps",
            Self::FitbitHeartRate => "fitbit-heart-rate",
            Self::UserInput => "user-input",
            Self::Branding => "branding",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metadata-passthrough" => Ok(Self::MetadataPassthrough),
            "workout-summary" => Ok(Self::WorkoutSummary),
            "muscle-heatmap" => Ok(Self::MuscleHeatmap),
            "source-link" => Ok(Self::SourceLink),
            "virtual-gps" => Ok(Self::VirtualGps),
            "fitbit-heart-rate" => Ok(Self::FitbitHeartRate),
            "user-input" => Ok(Self::UserInput),
            "branding" => Ok(Self::Branding),
            other => Err(CoreError::InvalidProviderType(other.to_owned())),
        }
    }
}

/// Downstream destination for an enriched event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Upload to Strava
    Strava,
    /// Upload to Runalyze
    Runalyze,
    /// Destination added after this build; routed by name downstream
    #[serde(other)]
    Unknown,
}

/// Per-provider integration state on a user record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    /// Whether the integration is enabled
    pub enabled: bool,
    /// Reference to stored credentials (token id in the secrets store)
    #[serde(
        default,
        alias = "credentials_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub credentials_ref: Option<String>,
}

/// One enrichment step inside a pipeline: provider type plus typed config.
///
/// Older rows stored the config under `inputs`; both spellings deserialize
/// into `typed_config`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnricherConfig {
    /// Provider type to resolve in the registry
    pub provider: ProviderKind,
    /// Typed configuration values, validated against the provider manifest
    #[serde(default, alias = "typed_config", alias = "inputs")]
    pub typed_config: HashMap<String, String>,
}

impl EnricherConfig {
    /// A step with an empty config map
    #[must_use]
    pub fn bare(provider: ProviderKind) -> Self {
        Self {
            provider,
            typed_config: HashMap::new(),
        }
    }
}

/// A user-configured enrichment pipeline keyed to a source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Stable pipeline id
    pub id: String,
    /// Source filter; matched case-sensitively against the raw event source
    pub source: String,
    /// Ordered enrichment steps
    #[serde(default)]
    pub enrichers: Vec<EnricherConfig>,
    /// Ordered destination set
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

/// A user's stored configuration, loaded once per invocation.
///
/// The orchestrator treats this as a read-only snapshot for the duration of
/// processing; only the monthly sync counter is written back, at the end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// User id
    pub id: Uuid,
    /// Billing plan, bounding the monthly sync counter
    #[serde(default)]
    pub plan: Plan,
    /// Integrations keyed by provider name (e.g. `"strava"`, `"fitbit"`)
    #[serde(default)]
    pub integrations: HashMap<String, Integration>,
    /// Ordered pipeline configurations
    #[serde(default)]
    pub pipelines: Vec<PipelineConfig>,
    /// Opaque push-notification device tokens
    #[serde(default, alias = "device_tokens")]
    pub device_tokens: Vec<String>,
    /// Successful syncs so far in `sync_count_month`
    #[serde(default, alias = "sync_count_this_month")]
    pub sync_count_this_month: u32,
    /// Month marker (`"2026-08"`) the counter belongs to
    #[serde(default, alias = "sync_count_month")]
    pub sync_count_month: String,
}

impl UserRecord {
    /// Month marker string for a timestamp, used for counter rollover
    #[must_use]
    pub fn month_marker(at: DateTime<Utc>) -> String {
        format!("{:04}-{:02}", at.year(), at.month())
    }

    /// Whether the legacy Strava integration flag is set.
    ///
    /// Users configured before pipelines existed have no pipeline rows; an
    /// enabled `strava` integration stands in for a default pipeline.
    #[must_use]
    pub fn legacy_strava_enabled(&self) -> bool {
        self.integrations
            .get("strava")
            .is_some_and(|integration| integration.enabled)
    }

    /// Integration entry for a provider, if enabled
    #[must_use]
    pub fn enabled_integration(&self, provider: &str) -> Option<&Integration> {
        self.integrations
            .get(provider)
            .filter(|integration| integration.enabled)
    }
}
