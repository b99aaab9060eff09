// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses artifact bucket, lag ceiling, publish switch, and deadline from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

//! Environment-based configuration for the enricher worker

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default object-store bucket for encoded artifacts
pub const DEFAULT_ARTIFACT_BUCKET: &str = "fitglue-artifacts";

/// Default upper bound on total lag wait before `do_not_retry` is forced
pub const DEFAULT_LAG_CEILING_MINUTES: u64 = 15;

/// Default hard wall-clock deadline per invocation
pub const DEFAULT_INVOCATION_DEADLINE_SECONDS: u64 = 300;

/// Environment type for deployment-specific behaviour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated test environment
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Typed runtime configuration for the enricher worker
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Object-store bucket for encoded artifacts
    pub artifact_bucket: String,
    /// Upper bound on event age before `do_not_retry` is forced
    pub lag_ceiling: chrono::Duration,
    /// Master switch for output emission
    pub enable_publish: bool,
    /// Hard wall-clock deadline per invocation
    pub invocation_deadline: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            artifact_bucket: DEFAULT_ARTIFACT_BUCKET.into(),
            lag_ceiling: chrono::Duration::minutes(DEFAULT_LAG_CEILING_MINUTES as i64),
            enable_publish: true,
            invocation_deadline: Duration::from_secs(DEFAULT_INVOCATION_DEADLINE_SECONDS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults with a warning rather
    /// than failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT").unwrap_or_default(),
        );

        let artifact_bucket =
            env::var("ARTIFACT_BUCKET").unwrap_or_else(|_| DEFAULT_ARTIFACT_BUCKET.into());

        let lag_ceiling_minutes = parse_or_default(
            "LAG_CEILING_MINUTES",
            DEFAULT_LAG_CEILING_MINUTES,
        );

        let enable_publish = env::var("ENABLE_PUBLISH")
            .map(|value| value != "false" && value != "0")
            .unwrap_or(true);

        let deadline_seconds = parse_or_default(
            "INVOCATION_DEADLINE_SECONDS",
            DEFAULT_INVOCATION_DEADLINE_SECONDS,
        );

        Self {
            environment,
            artifact_bucket,
            lag_ceiling: chrono::Duration::minutes(lag_ceiling_minutes as i64),
            enable_publish,
            invocation_deadline: Duration::from_secs(deadline_seconds),
        }
    }
}

fn parse_or_default(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Err(_) => default,
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(%key, value = %raw, "unparseable numeric config value, using default {default}");
            default
        }),
    }
}
