// ABOUTME: Core provider trait, enrichment result/error types, and manifest schema
// ABOUTME: Defines the uniform contract every enrichment step satisfies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use fitglue_core::errors::CoreError;
use fitglue_core::models::{ActivityType, ProviderKind, StandardizedActivity, UserRecord};

/// Read-only view a provider receives for one enrichment call.
///
/// The activity is borrowed immutably: providers describe mutations through
/// their [`EnrichmentResult`] and the orchestrator applies them, keeping the
/// contract agnostic of threading concerns.
#[derive(Debug, Clone, Copy)]
pub struct EnrichContext<'a> {
    /// The working activity, including mutations applied for providers
    /// declared earlier in the pipeline
    pub activity: &'a StandardizedActivity,
    /// The owning user's stored configuration snapshot
    pub user: &'a UserRecord,
    /// This step's typed configuration, already validated against the manifest
    pub config: &'a HashMap<String, String>,
    /// Metadata carried on the raw event
    pub raw_metadata: &'a HashMap<String, String>,
    /// When true, the provider MUST NOT signal `Retryable`: it degrades to a
    /// best-effort result or skips instead
    pub do_not_retry: bool,
}

/// What a provider returns when it has something to contribute.
///
/// Every field is optional; an all-default result is valid and applies
/// nothing. Streams are held aside by the orchestrator and merged at fan-in
/// rather than applied to the working activity between providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    /// Replacement activity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    /// Suffix appended to the activity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,
    /// Description fragment, joined to prior fragments by a blank line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Activity-type override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    /// Tags appended to the activity
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Full-length heart-rate stream over the record timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate_stream: Option<Vec<u32>>,
    /// Full-length power stream over the record timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_stream: Option<Vec<u32>>,
    /// Full-length latitude stream over the record timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude_stream: Option<Vec<f64>>,
    /// Full-length longitude stream over the record timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude_stream: Option<Vec<f64>>,
    /// Metadata entries merged onto the enriched event (last write wins)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Skip the remainder of the pipeline and suppress emission for it
    #[serde(default)]
    pub halt_pipeline: bool,
    /// Why the pipeline was halted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halt_reason: Option<String>,
}

impl EnrichmentResult {
    /// Whether this result carries any stream to merge at fan-in
    #[must_use]
    pub const fn has_streams(&self) -> bool {
        self.heart_rate_stream.is_some()
            || self.power_stream.is_some()
            || self.latitude_stream.is_some()
            || self.longitude_stream.is_some()
    }
}

/// Failure modes of one provider invocation.
///
/// `Retryable` and `WaitForInput` are control signals rather than failures;
/// everything else fails the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Upstream data is not yet readable; try the whole event again later
    #[error("upstream data not yet available: {reason}")]
    Retryable {
        /// Operator-facing reason recorded on the audit row
        reason: String,
        /// Upstream-suggested delay before the next attempt
        retry_after: Option<Duration>,
    },

    /// The provider cannot proceed without user-supplied fields
    #[error("waiting for user input: {}", fields.join(", "))]
    WaitForInput {
        /// Names of the fields the user must supply
        fields: Vec<String>,
    },

    /// The ambient deadline or host cancellation interrupted the call
    #[error("provider cancelled: {0}")]
    Cancelled(String),

    /// Any other failure; non-retryable
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ProviderError {
    /// Convenience constructor for the retryable signal
    #[must_use]
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
            retry_after: None,
        }
    }
}

/// The uniform interface each enrichment step satisfies.
///
/// Providers are stateless values stored behind this trait in the registry.
/// `Ok(None)` means the provider had nothing to contribute (recorded as
/// SKIPPED); mutations travel exclusively through the returned result.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Stable provider-type identifier
    fn kind(&self) -> ProviderKind;

    /// Manifest describing the provider and its config schema
    fn manifest(&self) -> ProviderManifest;

    /// Run one enrichment step.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Retryable`] when upstream data has not
    /// settled (never when `ctx.do_not_retry` is set),
    /// [`ProviderError::WaitForInput`] when user-supplied fields are
    /// required, and any other variant for non-retryable failures.
    async fn enrich(
        &self,
        ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError>;
}

/// Typed config field kinds recognized by manifest validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    /// Free-form string
    String,
    /// Numeric value with optional bounds
    Number {
        /// Inclusive lower bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive upper bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// `"true"` or `"false"`
    Boolean,
    /// One of a fixed option set
    Select {
        /// Legal option values
        options: Vec<String>,
    },
    /// Comma-separated subset of a fixed option set
    MultiSelect {
        /// Legal option values
        options: Vec<String>,
    },
    /// Comma-separated `key=value` pairs
    KeyValueMap,
}

/// One typed config field in a provider manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    /// Config-map key
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Whether the field must be present and non-empty
    pub required: bool,
    /// Validation rule for the value
    pub field_type: FieldType,
}

impl ConfigField {
    /// An optional field
    #[must_use]
    pub fn optional(key: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            required: false,
            field_type,
        }
    }

    /// A required field
    #[must_use]
    pub fn required(key: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            required: true,
            field_type,
        }
    }
}

/// Provider metadata for discovery and config validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderManifest {
    /// Provider type this manifest describes
    pub kind: ProviderKind,
    /// Human-readable name
    pub display_name: String,
    /// Human-readable description
    pub description: String,
    /// Icon identifier for discovery UIs
    pub icon: String,
    /// Ordered typed config fields
    pub fields: Vec<ConfigField>,
}

impl ProviderManifest {
    /// Validate a typed-config map against this manifest's schema.
    ///
    /// Unknown keys are ignored for forward compatibility; required fields
    /// must be present and non-empty, and every present value must satisfy
    /// its field's validation rule.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] naming the offending field.
    pub fn validate_config(&self, config: &HashMap<String, String>) -> Result<(), CoreError> {
        for field in &self.fields {
            let value = config.get(&field.key).map(String::as_str);
            match value {
                None | Some("") if field.required => {
                    return Err(CoreError::InvalidConfig {
                        field: field.key.clone(),
                        reason: "required field is missing or empty".into(),
                    });
                }
                None | Some("") => {}
                Some(value) => validate_value(&field.key, value, &field.field_type)?,
            }
        }
        Ok(())
    }
}

fn validate_value(key: &str, value: &str, field_type: &FieldType) -> Result<(), CoreError> {
    let invalid = |reason: String| CoreError::InvalidConfig {
        field: key.to_owned(),
        reason,
    };
    match field_type {
        FieldType::String => Ok(()),
        FieldType::Number { min, max } => {
            let number: f64 = value
                .parse()
                .map_err(|_| invalid(format!("'{value}' is not a number")))?;
            if let Some(min) = min {
                if number < *min {
                    return Err(invalid(format!("{number} is below the minimum of {min}")));
                }
            }
            if let Some(max) = max {
                if number > *max {
                    return Err(invalid(format!("{number} is above the maximum of {max}")));
                }
            }
            Ok(())
        }
        FieldType::Boolean => {
            if value == "true" || value == "false" {
                Ok(())
            } else {
                Err(invalid(format!("'{value}' is not 'true' or 'false'")))
            }
        }
        FieldType::Select { options } => {
            if options.iter().any(|option| option == value) {
                Ok(())
            } else {
                Err(invalid(format!("'{value}' is not one of {options:?}")))
            }
        }
        FieldType::MultiSelect { options } => {
            for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
                if !options.iter().any(|option| option == entry) {
                    return Err(invalid(format!("'{entry}' is not one of {options:?}")));
                }
            }
            Ok(())
        }
        FieldType::KeyValueMap => {
            for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
                if !entry.contains('=') {
                    return Err(invalid(format!("'{entry}' is not a key=value pair")));
                }
            }
            Ok(())
        }
    }
}
