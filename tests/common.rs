// ABOUTME: Shared test utilities and builders for enricher integration tests
// ABOUTME: Provides an in-memory harness, activity/user builders, and fake providers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
#![allow(missing_docs)]

//! Shared test utilities for `fitglue_enricher`

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use fitglue_core::models::{
    ActivityType, Destination, EnricherConfig, Integration, Lap, MuscleGroup, PipelineConfig,
    Plan, ProviderKind, Record, Session, StandardizedActivity, StrengthSet, UserRecord,
};
use fitglue_enricher::bus::MemoryBus;
use fitglue_enricher::config::ServerConfig;
use fitglue_enricher::events::{attr, EventEnvelope, RawActivityEvent};
use fitglue_enricher::notify::MemoryNotifier;
use fitglue_enricher::stores::{
    MemoryArtifactStore, MemoryExecutionStore, MemoryPendingInputStore, MemoryUserStore,
};
use fitglue_enricher::{Enricher, EnricherDeps};
use fitglue_providers::builtin;
use fitglue_providers::builtin::fitbit_heart_rate::{
    FitbitHeartRateProvider, HeartRateSample, HeartRateSeriesSource,
};
use fitglue_providers::{
    EnrichContext, EnrichmentProvider, EnrichmentResult, ProviderError, ProviderManifest,
    ProviderRegistry,
};

/// Fixed start time shared by test activities
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 7, 0, 0).unwrap()
}

/// Full in-memory harness around an [`Enricher`]
pub struct Harness {
    pub users: Arc<MemoryUserStore>,
    pub executions: Arc<MemoryExecutionStore>,
    pub pending: Arc<MemoryPendingInputStore>,
    pub artifacts: Arc<MemoryArtifactStore>,
    pub bus: Arc<MemoryBus>,
    pub notifier: Arc<MemoryNotifier>,
    pub registry: Arc<RwLock<ProviderRegistry>>,
    pub enricher: Enricher,
}

impl Harness {
    /// Harness with the default config and a private registry holding the
    /// built-in providers.
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self::with_config(ServerConfig::default(), users)
    }

    pub fn with_config(config: ServerConfig, users: Vec<UserRecord>) -> Self {
        let mut registry = ProviderRegistry::new();
        builtin::install(&mut registry);
        let registry = Arc::new(RwLock::new(registry));

        let users = Arc::new(MemoryUserStore::with_users(users));
        let executions = Arc::new(MemoryExecutionStore::new());
        let pending = Arc::new(MemoryPendingInputStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new(config.artifact_bucket.clone()));
        let bus = Arc::new(MemoryBus::new());
        let notifier = Arc::new(MemoryNotifier::new());

        let enricher = Enricher::new(
            config,
            EnricherDeps {
                registry: registry.clone(),
                users: users.clone(),
                executions: executions.clone(),
                pending_inputs: pending.clone(),
                artifacts: artifacts.clone(),
                bus: bus.clone(),
                notifier: notifier.clone(),
            },
        );

        Self {
            users,
            executions,
            pending,
            artifacts,
            bus,
            notifier,
            registry,
            enricher,
        }
    }

    /// Replace a provider registration with a test double
    pub fn register(&self, provider: Arc<dyn EnrichmentProvider>) {
        self.registry.write().unwrap().register(provider);
    }
}

/// Envelope around a raw event, published `age` ago
pub fn envelope(raw: &RawActivityEvent, age: Duration) -> EventEnvelope {
    EventEnvelope::new(serde_json::to_string(raw).unwrap(), Utc::now() - age)
}

/// Envelope marked as a lag-queue redelivery
pub fn lag_envelope(raw: &RawActivityEvent, age: Duration) -> EventEnvelope {
    envelope(raw, age).with_attribute(attr::ORIGIN, attr::LAG_QUEUE)
}

/// Raw event wrapper around an activity
pub fn raw_event(activity: StandardizedActivity) -> RawActivityEvent {
    RawActivityEvent {
        source: activity.source.clone(),
        user_id: activity.user_id,
        original_payload: Some(serde_json::json!({"provider": "native"})),
        metadata: HashMap::new(),
        pipeline_execution_id: None,
        activity,
    }
}

/// A user with the given pipelines on the free plan
pub fn user_with_pipelines(user_id: Uuid, pipelines: Vec<PipelineConfig>) -> UserRecord {
    UserRecord {
        id: user_id,
        plan: Plan::Free,
        integrations: HashMap::from([(
            "fitbit".to_owned(),
            Integration {
                enabled: true,
                credentials_ref: Some("fitbit-token".into()),
            },
        )]),
        pipelines,
        device_tokens: vec!["device-1".into()],
        sync_count_this_month: 0,
        sync_count_month: "2026-08".into(),
    }
}

/// Pipeline over the given providers with a Strava destination
pub fn pipeline(id: &str, source: &str, providers: Vec<EnricherConfig>) -> PipelineConfig {
    PipelineConfig {
        id: id.into(),
        source: source.into(),
        enrichers: providers,
        destinations: vec![Destination::Strava],
    }
}

fn strength_set(
    exercise: &str,
    reps: u32,
    weight_kg: f64,
    primary: MuscleGroup,
    secondary: &[MuscleGroup],
) -> StrengthSet {
    StrengthSet {
        exercise: exercise.into(),
        reps,
        weight_kg,
        primary_muscle: primary,
        secondary_muscles: secondary.to_vec(),
        superset_id: None,
    }
}

/// A 45-minute Hevy strength workout with three exercises and no GPS
pub fn strength_activity(user_id: Uuid) -> StandardizedActivity {
    StandardizedActivity {
        external_id: "hevy-workout-77".into(),
        user_id,
        source: "SOURCE_HEVY".into(),
        start_time: start_time(),
        name: "Push Day".into(),
        description: String::new(),
        activity_type: ActivityType::WeightTraining,
        tags: Vec::new(),
        session: Some(Session {
            start_time: start_time(),
            total_elapsed_time: 2700.0,
            total_distance: 0.0,
            laps: Vec::new(),
            strength_sets: vec![
                strength_set("Bench Press", 10, 60.0, MuscleGroup::Chest, &[MuscleGroup::Triceps]),
                strength_set("Bench Press", 10, 60.0, MuscleGroup::Chest, &[MuscleGroup::Triceps]),
                strength_set("Bench Press", 10, 60.0, MuscleGroup::Chest, &[MuscleGroup::Triceps]),
                strength_set("Overhead Press", 8, 40.0, MuscleGroup::Shoulders, &[]),
                strength_set("Overhead Press", 8, 40.0, MuscleGroup::Shoulders, &[]),
                strength_set("Push Up", 15, 0.0, MuscleGroup::Chest, &[MuscleGroup::Abs]),
            ],
        }),
    }
}

/// A cardio workout; `with_gps` fills a 1 Hz record timeline
pub fn cardio_activity(
    user_id: Uuid,
    source: &str,
    elapsed: f64,
    distance: f64,
    with_gps: bool,
) -> StandardizedActivity {
    let records = if with_gps {
        (0..elapsed.round() as i64)
            .map(|second| Record {
                timestamp: start_time() + Duration::seconds(second),
                heart_rate: None,
                power: None,
                latitude: Some(51.5 + second as f64 * 1e-5),
                longitude: Some(-0.17 + second as f64 * 1e-5),
                altitude: None,
                distance: None,
            })
            .collect()
    } else {
        Vec::new()
    };
    StandardizedActivity {
        external_id: format!("{}-run-9", source.to_lowercase()),
        user_id,
        source: source.into(),
        start_time: start_time(),
        name: "Morning Run".into(),
        description: String::new(),
        activity_type: ActivityType::Running,
        tags: Vec::new(),
        session: Some(Session {
            start_time: start_time(),
            total_elapsed_time: elapsed,
            total_distance: distance,
            laps: vec![Lap {
                start_time: start_time(),
                total_elapsed_time: elapsed,
                records,
            }],
            strength_sets: Vec::new(),
        }),
    }
}

/// Heart-rate series source returning a fixed sample list
pub struct FixedSeries(pub Vec<HeartRateSample>);

#[async_trait]
impl HeartRateSeriesSource for FixedSeries {
    async fn fetch(
        &self,
        _user: &UserRecord,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HeartRateSample>> {
        Ok(self.0.clone())
    }
}

/// Install a Fitbit heart-rate provider backed by fixed samples
pub fn install_fitbit_series(harness: &Harness, samples: Vec<HeartRateSample>) {
    harness.register(Arc::new(FitbitHeartRateProvider::new(Arc::new(FixedSeries(
        samples,
    )))));
}

/// A linear heart-rate ramp spanning `span_seconds` from the activity start
pub fn hr_ramp(span_seconds: f64, from: u32, to: u32) -> Vec<HeartRateSample> {
    let steps = 100;
    (0..=steps)
        .map(|step| {
            let fraction = step as f64 / steps as f64;
            let at = start_time()
                + Duration::milliseconds((span_seconds * 1000.0 * fraction) as i64);
            let value = from as f64 + (to as f64 - from as f64) * fraction;
            (at, value.round() as u32)
        })
        .collect()
}

/// Test provider masquerading as an existing kind with scripted behaviour
pub struct ScriptedProvider {
    pub kind: ProviderKind,
    pub behaviour: ScriptedBehaviour,
    /// Activity name observed on entry, for mutation-visibility assertions
    pub observed_name: Arc<Mutex<Option<String>>>,
}

pub enum ScriptedBehaviour {
    Result(Box<EnrichmentResult>),
    Skip,
    Halt(String),
    Fail(String),
    Retryable(String),
    WaitForInput(Vec<String>),
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind, behaviour: ScriptedBehaviour) -> Self {
        Self {
            kind,
            behaviour,
            observed_name: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl EnrichmentProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: self.kind,
            display_name: "Scripted".into(),
            description: "Scripted test provider".into(),
            icon: "test".into(),
            fields: Vec::new(),
        }
    }

    async fn enrich(
        &self,
        ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        *self.observed_name.lock().unwrap() = Some(ctx.activity.name.clone());
        match &self.behaviour {
            ScriptedBehaviour::Result(result) => Ok(Some((**result).clone())),
            ScriptedBehaviour::Skip => Ok(None),
            ScriptedBehaviour::Halt(reason) => Ok(Some(EnrichmentResult {
                halt_pipeline: true,
                halt_reason: Some(reason.clone()),
                ..EnrichmentResult::default()
            })),
            ScriptedBehaviour::Fail(message) => {
                Err(ProviderError::Failed(anyhow::anyhow!(message.clone())))
            }
            ScriptedBehaviour::Retryable(reason) => {
                if ctx.do_not_retry {
                    return Ok(None);
                }
                Err(ProviderError::retryable(reason.clone()))
            }
            ScriptedBehaviour::WaitForInput(fields) => Err(ProviderError::WaitForInput {
                fields: fields.clone(),
            }),
        }
    }
}
