// ABOUTME: Per-message orchestrator running resolved pipelines over a raw activity
// ABOUTME: Handles halt/wait/retry signals, fan-in, artifact encoding, and emission
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

/// Fan-in merge of provider outputs into the enriched event
pub mod fan_in;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fitglue_core::models::{
    ExecutionRecord, ExecutionStatus, PendingInput, PendingInputStatus, PipelineConfig,
    ProviderKind, StandardizedActivity, UserRecord,
};
use fitglue_providers::{
    EnrichContext, EnrichmentResult, ProviderError, ProviderRegistry,
};

use crate::bus::{EventPublisher, ENRICHED_TOPIC};
use crate::config::ServerConfig;
use crate::errors::EnricherError;
use crate::events::{attr, EnrichedActivityEvent, EventEnvelope, RawActivityEvent};
use crate::lag::{LagController, LagDisposition};
use crate::notify::{Notifier, PushNotification};
use crate::pipeline::resolve_pipelines;
use crate::stores::{ArtifactStore, ExecutionStore, PendingInputStore, UserStore};
use crate::tier::{self, TierGate};

/// External collaborators the orchestrator drives.
pub struct EnricherDeps {
    /// Provider registry (usually the process-global one)
    pub registry: Arc<RwLock<ProviderRegistry>>,
    /// User-config store
    pub users: Arc<dyn UserStore>,
    /// Audit store for execution rows
    pub executions: Arc<dyn ExecutionStore>,
    /// Pending-input rows for the wait-for-input path
    pub pending_inputs: Arc<dyn PendingInputStore>,
    /// Object store for encoded artifacts
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Message bus publisher
    pub bus: Arc<dyn EventPublisher>,
    /// Push-notification collaborator
    pub notifier: Arc<dyn Notifier>,
}

/// Aggregate result of one invocation, returned to the host for disposition.
#[derive(Debug)]
pub struct InvocationSummary {
    /// Worst non-skipped status observed
    pub status: ExecutionStatus,
    /// Number of events emitted downstream
    pub emitted: usize,
    /// All audit rows written for this invocation
    pub executions: Vec<ExecutionRecord>,
    /// The emitted events (empty for waiting/lagged/skipped runs)
    pub events: Vec<EnrichedActivityEvent>,
}

/// Outcome of running one pipeline
enum PipelineOutcome {
    /// The pipeline produced an event to emit
    Emitted(Box<EnrichedActivityEvent>),
    /// A provider halted the pipeline; no event, not a failure
    Suppressed,
    /// A provider failed non-retryably; no event
    Failed,
    /// A provider signalled data lag; the whole invocation defers
    Lagged {
        reason: String,
    },
    /// A provider needs user-supplied fields; the whole invocation parks
    Waiting {
        fields: Vec<String>,
    },
}

/// The per-message orchestrator.
///
/// Stateless across invocations: every `process` call loads a fresh user
/// snapshot and threads one working activity through the resolved pipelines
/// strictly sequentially.
pub struct Enricher {
    config: ServerConfig,
    lag: LagController,
    deps: EnricherDeps,
}

impl Enricher {
    /// Build an orchestrator over the given collaborators
    #[must_use]
    pub fn new(config: ServerConfig, deps: EnricherDeps) -> Self {
        let lag = LagController::new(config.lag_ceiling, deps.bus.clone());
        Self { config, lag, deps }
    }

    /// Process one raw activity envelope under the invocation deadline.
    ///
    /// # Errors
    ///
    /// `EnricherError::Retryable` asks the host to NACK for bus-backoff
    /// redelivery; every other error is a non-retryable failure return.
    pub async fn process(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<InvocationSummary, EnricherError> {
        let deadline = self.config.invocation_deadline;
        match tokio::time::timeout(deadline, self.process_inner(envelope)).await {
            Ok(result) => result,
            Err(_) => Err(EnricherError::DeadlineExceeded {
                seconds: deadline.as_secs(),
            }),
        }
    }

    async fn process_inner(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<InvocationSummary, EnricherError> {
        let raw: RawActivityEvent = serde_json::from_str(&envelope.data)?;
        let pipeline_execution_id = envelope
            .pipeline_execution_id()
            .or(raw.pipeline_execution_id)
            .unwrap_or_else(Uuid::new_v4);
        let test_run_id = envelope.test_run_id().map(str::to_owned);

        let mut executions = Vec::new();
        let mut root = ExecutionRecord::begin(
            raw.user_id,
            pipeline_execution_id,
            None,
            None,
            test_run_id.clone(),
        );
        root.inputs_json = Some(serde_json::json!({
            "source": raw.source,
            "externalId": raw.activity.external_id,
            "origin": envelope.origin(),
        }));
        self.record(&root).await;

        // 1. Load the user snapshot.
        let mut user = match self.deps.users.fetch(raw.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.finish_root(&mut root, &mut executions, ExecutionStatus::Failed, Some("user not found".into()))
                    .await;
                return Err(EnricherError::UserNotFound(raw.user_id));
            }
            Err(error) => {
                self.finish_root(&mut root, &mut executions, ExecutionStatus::Failed, Some(error.to_string()))
                    .await;
                return Err(EnricherError::Store(error));
            }
        };

        // 2. Tier gate; the counter increments only at the end, on success.
        if let TierGate::Exhausted { limit } = tier::check(&mut user, Utc::now()) {
            info!(user = %user.id, limit, "monthly tier limit reached; skipping");
            self.finish_root(&mut root, &mut executions, ExecutionStatus::Skipped, Some("tier limit".into()))
                .await;
            return Ok(InvocationSummary {
                status: ExecutionStatus::Skipped,
                emitted: 0,
                executions,
                events: Vec::new(),
            });
        }

        // 3. Validate the payload shape.
        if let Err(error) = raw.activity.validate() {
            self.finish_root(&mut root, &mut executions, ExecutionStatus::Failed, Some(error.to_string()))
                .await;
            return Err(EnricherError::Validation(error));
        }

        // 4. Resolve pipelines and validate their configs up front.
        let pipelines = resolve_pipelines(&user, &raw.source);
        if pipelines.is_empty() {
            debug!(user = %user.id, source = %raw.source, "no pipelines matched");
            self.finish_root(&mut root, &mut executions, ExecutionStatus::Skipped, Some("no matching pipelines".into()))
                .await;
            return Ok(InvocationSummary {
                status: ExecutionStatus::Skipped,
                emitted: 0,
                executions,
                events: Vec::new(),
            });
        }
        if let Err(error) = self.validate_pipeline_configs(&pipelines) {
            self.finish_root(&mut root, &mut executions, ExecutionStatus::Failed, Some(error.to_string()))
                .await;
            return Err(error);
        }

        // 5. Lag-exhaustion check.
        let do_not_retry = self.lag.do_not_retry(envelope, Utc::now());
        if do_not_retry {
            info!(
                publish_time = %envelope.publish_time,
                "event older than the lag ceiling; forcing best-effort completion"
            );
        }

        // 6. Run each pipeline sequentially.
        let mut collected = Vec::new();
        let mut pipeline_statuses = Vec::new();
        for pipeline in &pipelines {
            let outcome = self
                .run_pipeline(
                    &raw,
                    &user,
                    pipeline,
                    pipeline_execution_id,
                    root.id,
                    test_run_id.as_deref(),
                    do_not_retry,
                    &mut executions,
                )
                .await?;
            match outcome {
                PipelineOutcome::Emitted(event) => {
                    pipeline_statuses.push(ExecutionStatus::Success);
                    collected.push(*event);
                }
                PipelineOutcome::Suppressed => pipeline_statuses.push(ExecutionStatus::Skipped),
                PipelineOutcome::Failed => pipeline_statuses.push(ExecutionStatus::Failed),
                PipelineOutcome::Lagged { reason } => {
                    return self
                        .handle_lag(envelope, &mut root, &mut executions, reason)
                        .await;
                }
                PipelineOutcome::Waiting { fields } => {
                    return self
                        .handle_wait_for_input(envelope, &raw, &user, &mut root, &mut executions, fields)
                        .await;
                }
            }
        }

        // 7. Emit the collected events.
        let emitted = self.emit(&collected, pipeline_execution_id).await;

        // 8. Finalize: aggregate status and best-effort counter increment.
        let mut status = pipeline_statuses
            .iter()
            .copied()
            .max_by_key(|status| status.severity())
            .unwrap_or(ExecutionStatus::Skipped);
        if status == ExecutionStatus::Success && emitted == 0 && !collected.is_empty() {
            // Every publish failed; nothing reached downstream.
            status = ExecutionStatus::Failed;
        }

        if status == ExecutionStatus::Success && emitted > 0 {
            let month = UserRecord::month_marker(Utc::now());
            if let Err(error) = self.deps.users.increment_sync_count(user.id, &month).await {
                warn!(user = %user.id, %error, "failed to increment monthly sync counter");
            }
        }

        self.finish_root(&mut root, &mut executions, status, None).await;
        Ok(InvocationSummary {
            status,
            emitted,
            executions,
            events: collected,
        })
    }

    /// Validate every enricher config against its provider's manifest.
    ///
    /// Providers missing from the registry are skipped here and recorded as
    /// SKIPPED when the pipeline runs.
    fn validate_pipeline_configs(
        &self,
        pipelines: &[PipelineConfig],
    ) -> Result<(), EnricherError> {
        let registry = self
            .deps
            .registry
            .read()
            .map_err(|_| EnricherError::Store(anyhow!("provider registry lock poisoned")))?;
        for pipeline in pipelines {
            for enricher in &pipeline.enrichers {
                if let Some(manifest) = registry.manifest(enricher.provider) {
                    manifest
                        .validate_config(&enricher.typed_config)
                        .map_err(EnricherError::Validation)?;
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_pipeline(
        &self,
        raw: &RawActivityEvent,
        user: &UserRecord,
        pipeline: &PipelineConfig,
        pipeline_execution_id: Uuid,
        root_id: Uuid,
        test_run_id: Option<&str>,
        do_not_retry: bool,
        executions: &mut Vec<ExecutionRecord>,
    ) -> Result<PipelineOutcome, EnricherError> {
        debug!(pipeline = %pipeline.id, providers = pipeline.enrichers.len(), "running pipeline");
        let mut working = raw.activity.clone();
        let mut results: Vec<(ProviderKind, EnrichmentResult)> = Vec::new();

        for enricher in &pipeline.enrichers {
            let mut record = ExecutionRecord::begin(
                raw.user_id,
                pipeline_execution_id,
                Some(root_id),
                Some(enricher.provider),
                test_run_id.map(str::to_owned),
            );

            let provider = {
                let registry = self.deps.registry.read().map_err(|_| {
                    EnricherError::Store(anyhow!("provider registry lock poisoned"))
                })?;
                registry.get(enricher.provider)
            };
            let Some(provider) = provider else {
                warn!(provider = %enricher.provider, "provider not registered; skipping");
                record.finish(ExecutionStatus::Skipped, Some("provider not registered".into()));
                self.push_record(record, executions).await;
                continue;
            };

            let outcome = provider
                .enrich(EnrichContext {
                    activity: &working,
                    user,
                    config: &enricher.typed_config,
                    raw_metadata: &raw.metadata,
                    do_not_retry,
                })
                .await;

            match outcome {
                Err(ProviderError::Retryable { reason, retry_after }) => {
                    debug!(provider = %enricher.provider, %reason, ?retry_after, "provider signalled data lag");
                    record.finish(ExecutionStatus::LaggedRetry, Some(reason.clone()));
                    self.push_record(record, executions).await;
                    return Ok(PipelineOutcome::Lagged { reason });
                }
                Err(ProviderError::WaitForInput { fields }) => {
                    record.finish(
                        ExecutionStatus::Waiting,
                        Some(format!("waiting for: {}", fields.join(", "))),
                    );
                    self.push_record(record, executions).await;
                    return Ok(PipelineOutcome::Waiting { fields });
                }
                Err(error) => {
                    warn!(provider = %enricher.provider, %error, "provider failed; pipeline aborted");
                    record.finish(ExecutionStatus::Failed, Some(error.to_string()));
                    self.push_record(record, executions).await;
                    return Ok(PipelineOutcome::Failed);
                }
                Ok(None) => {
                    record.finish(ExecutionStatus::Skipped, None);
                    self.push_record(record, executions).await;
                }
                Ok(Some(result)) if result.halt_pipeline => {
                    let reason = result
                        .halt_reason
                        .clone()
                        .unwrap_or_else(|| "pipeline halted by provider".into());
                    info!(provider = %enricher.provider, %reason, "pipeline halted");
                    record.finish(ExecutionStatus::Skipped, Some(reason));
                    self.push_record(record, executions).await;
                    return Ok(PipelineOutcome::Suppressed);
                }
                Ok(Some(result)) => {
                    fan_in::apply_result(&mut working, &result);
                    record.outputs_json = Some(result_summary(&result));
                    record.finish(ExecutionStatus::Success, None);
                    self.push_record(record, executions).await;
                    results.push((enricher.provider, result));
                }
            }
        }

        // Branding runs unconditionally last, outside the user's pipeline.
        self.apply_branding(&mut working, user, raw, do_not_retry, &mut results)
            .await;

        let mut event = fan_in::assemble_event(
            working,
            raw,
            pipeline,
            pipeline_execution_id,
            &results,
        );
        self.encode_and_store_artifact(&mut event).await;
        Ok(PipelineOutcome::Emitted(Box::new(event)))
    }

    /// Invoke the built-in branding provider and fold its fragment into the
    /// working activity. Absence or failure is never fatal.
    async fn apply_branding(
        &self,
        working: &mut StandardizedActivity,
        user: &UserRecord,
        raw: &RawActivityEvent,
        do_not_retry: bool,
        results: &mut Vec<(ProviderKind, EnrichmentResult)>,
    ) {
        let provider = {
            let Ok(registry) = self.deps.registry.read() else {
                return;
            };
            registry.get(ProviderKind::Branding)
        };
        let Some(provider) = provider else {
            return;
        };
        let empty_config = HashMap::new();
        match provider
            .enrich(EnrichContext {
                activity: working,
                user,
                config: &empty_config,
                raw_metadata: &raw.metadata,
                do_not_retry,
            })
            .await
        {
            Ok(Some(result)) => {
                fan_in::apply_result(working, &result);
                results.push((ProviderKind::Branding, result));
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "branding provider failed; continuing without it"),
        }
    }

    /// Encode the FIT artifact and store it; failures are logged and the
    /// event still emits without a URI.
    async fn encode_and_store_artifact(&self, event: &mut EnrichedActivityEvent) {
        let Some(bytes) = crate::fit::encode_activity(&event.activity) else {
            debug!(activity = %event.activity_id, "nothing to encode; omitting artifact");
            return;
        };
        let key = format!("activities/{}/{}.fit", event.user_id, event.activity_id);
        match self.deps.artifacts.put(&key, bytes).await {
            Ok(uri) => event.artifact_uri = Some(uri),
            Err(error) => {
                warn!(%key, %error, "artifact write failed; emitting without artifact URI");
            }
        }
    }

    /// Publish collected events to the output topic, honouring the master
    /// publish switch. Returns the number of events that reached the bus
    /// (or would have, when publishing is disabled).
    async fn emit(&self, events: &[EnrichedActivityEvent], pipeline_execution_id: Uuid) -> usize {
        let mut emitted = 0;
        for event in events {
            if !self.config.enable_publish {
                debug!(event = %event.activity_id, "publishing disabled; counting event as emitted");
                emitted += 1;
                continue;
            }
            let payload = match serde_json::to_string(event) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(%error, "enriched event failed to serialize; dropping");
                    continue;
                }
            };
            let envelope = EventEnvelope::new(payload, Utc::now()).with_attribute(
                attr::PIPELINE_EXECUTION_ID,
                pipeline_execution_id.to_string(),
            );
            match self.deps.bus.publish(ENRICHED_TOPIC, envelope).await {
                Ok(()) => emitted += 1,
                Err(error) => warn!(%error, "publish failed; continuing with remaining events"),
            }
        }
        emitted
    }

    /// First attempt: offload to the lag topic and ACK. Redelivery: record
    /// LAGGED_RETRY and NACK so the bus retries with its configured backoff.
    async fn handle_lag(
        &self,
        envelope: &EventEnvelope,
        root: &mut ExecutionRecord,
        executions: &mut Vec<ExecutionRecord>,
        reason: String,
    ) -> Result<InvocationSummary, EnricherError> {
        match LagController::disposition(envelope) {
            LagDisposition::Offload => {
                if let Err(error) = self.lag.offload(envelope).await {
                    warn!(%error, "lag offload failed; NACKing the original");
                    self.finish_root(root, executions, ExecutionStatus::LaggedRetry, Some(reason.clone()))
                        .await;
                    return Err(EnricherError::Retryable { reason });
                }
                self.finish_root(root, executions, ExecutionStatus::LaggedRetry, Some(reason))
                    .await;
                Ok(InvocationSummary {
                    status: ExecutionStatus::LaggedRetry,
                    emitted: 0,
                    executions: std::mem::take(executions),
                    events: Vec::new(),
                })
            }
            LagDisposition::FailForBusRetry => {
                self.finish_root(root, executions, ExecutionStatus::LaggedRetry, Some(reason.clone()))
                    .await;
                Err(EnricherError::Retryable { reason })
            }
        }
    }

    /// Park the activity in a pending-input row, notify the user, and ACK
    /// with status WAITING and zero emitted events.
    async fn handle_wait_for_input(
        &self,
        envelope: &EventEnvelope,
        raw: &RawActivityEvent,
        user: &UserRecord,
        root: &mut ExecutionRecord,
        executions: &mut Vec<ExecutionRecord>,
        fields: Vec<String>,
    ) -> Result<InvocationSummary, EnricherError> {
        let row = PendingInput {
            activity_id: raw.activity.external_id.clone(),
            user_id: raw.user_id,
            required_fields: fields.clone(),
            original_payload: serde_json::from_str(&envelope.data)
                .unwrap_or(serde_json::Value::Null),
            status: PendingInputStatus::Waiting,
            created_at: Utc::now(),
        };
        match self.deps.pending_inputs.create_if_absent(&row).await {
            Ok(true) => {}
            Ok(false) => {
                info!(activity = %row.activity_id, "pending input already exists; continuing abort");
            }
            Err(error) => warn!(%error, "failed to persist pending input"),
        }

        let notification = PushNotification {
            user_id: user.id,
            title: "Your workout needs details".into(),
            body: format!("Add {} to finish syncing this workout", fields.join(", ")),
            device_tokens: user.device_tokens.clone(),
            data: HashMap::from([
                ("activityId".to_owned(), raw.activity.external_id.clone()),
                ("fields".to_owned(), fields.join(",")),
            ]),
        };
        if let Err(error) = self.deps.notifier.push(notification).await {
            warn!(%error, "wait-for-input notification failed");
        }

        self.finish_root(
            root,
            executions,
            ExecutionStatus::Waiting,
            Some(format!("waiting for: {}", fields.join(", "))),
        )
        .await;
        Ok(InvocationSummary {
            status: ExecutionStatus::Waiting,
            emitted: 0,
            executions: std::mem::take(executions),
            events: Vec::new(),
        })
    }

    async fn push_record(&self, record: ExecutionRecord, executions: &mut Vec<ExecutionRecord>) {
        self.record(&record).await;
        executions.push(record);
    }

    async fn finish_root(
        &self,
        root: &mut ExecutionRecord,
        executions: &mut Vec<ExecutionRecord>,
        status: ExecutionStatus,
        error: Option<String>,
    ) {
        root.finish(status, error);
        self.record(root).await;
        executions.push(root.clone());
    }

    /// Audit writes are transient: failures are logged, never fatal.
    async fn record(&self, record: &ExecutionRecord) {
        if let Err(error) = self.deps.executions.upsert(record).await {
            warn!(execution = %record.id, %error, "audit write failed");
        }
    }
}

/// Compact, stream-free snapshot of a provider result for the audit row.
fn result_summary(result: &EnrichmentResult) -> serde_json::Value {
    serde_json::json!({
        "setName": result.new_name.is_some(),
        "nameSuffix": result.name_suffix.is_some(),
        "descriptionChars": result.description.as_deref().map(str::len).unwrap_or(0),
        "activityTypeOverride": result.activity_type.is_some(),
        "tags": result.tags.len(),
        "streams": {
            "heartRate": result.heart_rate_stream.as_deref().map(<[u32]>::len),
            "power": result.power_stream.as_deref().map(<[u32]>::len),
            "latitude": result.latitude_stream.as_deref().map(<[f64]>::len),
            "longitude": result.longitude_stream.as_deref().map(<[f64]>::len),
        },
        "metadataKeys": result.metadata.len(),
    })
}
