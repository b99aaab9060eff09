// ABOUTME: Fitbit heart-rate provider fetching intraday samples and aligning them
// ABOUTME: Signals Retryable while the upstream intraday series has not settled
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Deserialize;

use fitglue_core::models::{ProviderKind, UserRecord};

use crate::align::{align_series, AlignerConfig, AlignmentStatus};
use crate::builtin::record_timeline;
use crate::contract::{
    EnrichContext, EnrichmentProvider, EnrichmentResult, ProviderError, ProviderManifest,
};

/// Fitbit Web API base URL
const FITBIT_API_BASE: &str = "https://api.fitbit.com";

/// One timestamped heart-rate sample
pub type HeartRateSample = (DateTime<Utc>, u32);

/// Source of intraday heart-rate samples for an activity window.
///
/// The HTTP client implements this against the Fitbit Web API; tests inject
/// fixed series.
#[async_trait]
pub trait HeartRateSeriesSource: Send + Sync {
    /// Fetch samples covering `[window_start, window_end]` for the user.
    ///
    /// An empty vector means the upstream series has not settled yet.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or authorization failures.
    async fn fetch(
        &self,
        user: &UserRecord,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HeartRateSample>>;
}

/// Fitbit intraday API response shape
#[derive(Debug, Deserialize)]
struct IntradayResponse {
    #[serde(rename = "activities-heart-intraday")]
    intraday: IntradaySeries,
}

#[derive(Debug, Deserialize)]
struct IntradaySeries {
    dataset: Vec<IntradayPoint>,
}

#[derive(Debug, Deserialize)]
struct IntradayPoint {
    /// Clock time within the requested day, `HH:MM:SS`
    time: String,
    value: u32,
}

/// HTTP client for the Fitbit intraday heart-rate endpoint
pub struct FitbitIntradayClient {
    client: reqwest::Client,
    base_url: String,
}

impl FitbitIntradayClient {
    /// Client against the production Fitbit API
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(FITBIT_API_BASE.to_owned())
    }

    /// Client against an alternate base URL (stub servers in tests)
    #[must_use]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl Default for FitbitIntradayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HeartRateSeriesSource for FitbitIntradayClient {
    async fn fetch(
        &self,
        user: &UserRecord,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HeartRateSample>> {
        let token = user
            .enabled_integration("fitbit")
            .and_then(|integration| integration.credentials_ref.clone())
            .ok_or_else(|| anyhow!("fitbit integration is not connected"))?;

        let date = window_start.format("%Y-%m-%d");
        let start = window_start.format("%H:%M");
        let end = window_end.format("%H:%M");
        let url = format!(
            "{}/1/user/-/activities/heart/date/{date}/1d/1sec/time/{start}/{end}.json",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("fitbit intraday request failed")?
            .error_for_status()
            .context("fitbit intraday request rejected")?;

        let body: IntradayResponse = response
            .json()
            .await
            .context("fitbit intraday response did not parse")?;

        let day_start = window_start
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let mut samples: Vec<HeartRateSample> = body
            .intraday
            .dataset
            .into_iter()
            .filter_map(|point| {
                let time = NaiveTime::parse_from_str(&point.time, "%H:%M:%S").ok()?;
                let offset = time.signed_duration_since(NaiveTime::MIN);
                Some((day_start + offset, point.value))
            })
            .collect();
        samples.sort_by_key(|(at, _)| *at);
        Ok(samples)
    }
}

/// Fetches intraday heart-rate samples for the activity window and aligns
/// them onto the activity's record timeline.
pub struct FitbitHeartRateProvider {
    source: Arc<dyn HeartRateSeriesSource>,
}

impl FitbitHeartRateProvider {
    /// Provider backed by an arbitrary sample source
    #[must_use]
    pub fn new(source: Arc<dyn HeartRateSeriesSource>) -> Self {
        Self { source }
    }
}

impl Default for FitbitHeartRateProvider {
    fn default() -> Self {
        Self::new(Arc::new(FitbitIntradayClient::new()))
    }
}

#[async_trait]
impl EnrichmentProvider for FitbitHeartRateProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::FitbitHeartRate
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::FitbitHeartRate,
            display_name: "Fitbit Heart Rate".into(),
            description: "Merges intraday heart-rate samples from Fitbit onto the activity"
                .into(),
            icon: "heart".into(),
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
        if ctx.user.enabled_integration("fitbit").is_none() {
            tracing::debug!(user = %ctx.user.id, "fitbit integration not enabled; skipping");
            return Ok(None);
        }

        let window_start = session.start_time;
        let window_end =
            session.start_time + Duration::seconds(session.total_elapsed_time.round() as i64);
        let samples = self
            .source
            .fetch(ctx.user, window_start, window_end)
            .await
            .map_err(ProviderError::Failed)?;

        if samples.is_empty() {
            if ctx.do_not_retry {
                // do_not_retry forbids Retryable; degrade to a streamless result.
                tracing::warn!(
                    activity = %ctx.activity.external_id,
                    "fitbit intraday series still empty; completing without heart rate"
                );
                let mut metadata = HashMap::new();
                metadata.insert(
                    "fitbitHeartRate.alignment".to_owned(),
                    AlignmentStatus::SkippedNoHr.as_str().to_owned(),
                );
                return Ok(Some(EnrichmentResult {
                    metadata,
                    ..EnrichmentResult::default()
                }));
            }
            return Err(ProviderError::Retryable {
                reason: "fitbit intraday series is empty for the activity window".into(),
                retry_after: Some(std::time::Duration::from_secs(60)),
            });
        }

        let timeline = record_timeline(ctx.activity);
        let alignment = align_series(&timeline, &samples, &AlignerConfig::default());
        if let Some(warning) = &alignment.warning {
            tracing::warn!(activity = %ctx.activity.external_id, %warning, "heart-rate alignment warning");
        }

        let mut metadata = HashMap::new();
        metadata.insert(
            "fitbitHeartRate.alignment".to_owned(),
            alignment.status.as_str().to_owned(),
        );
        metadata.insert(
            "fitbitHeartRate.driftPercent".to_owned(),
            format!("{:.2}", alignment.drift_percent),
        );

        Ok(Some(EnrichmentResult {
            heart_rate_stream: Some(alignment.values),
            metadata,
            ..EnrichmentResult::default()
        }))
    }
}
