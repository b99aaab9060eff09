// ABOUTME: Local worker harness: reads raw-event JSON lines, emits enriched events
// ABOUTME: Bootstraps logging, config, and the provider registry, then drains stdin
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

#![allow(clippy::print_stdout)]

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};

use fitglue_enricher::bus::MemoryBus;
use fitglue_enricher::config::ServerConfig;
use fitglue_enricher::events::EventEnvelope;
use fitglue_enricher::logging::LoggingConfig;
use fitglue_enricher::notify::LoggingNotifier;
use fitglue_enricher::stores::{
    LocalDirArtifactStore, MemoryExecutionStore, MemoryPendingInputStore, MemoryUserStore,
};
use fitglue_enricher::{Enricher, EnricherDeps};
use fitglue_providers::builtin;
use fitglue_providers::registry::global_registry;

/// One stdin line: either a bare raw event or an envelope with attributes.
#[derive(serde::Deserialize)]
struct InputLine {
    /// Raw event payload
    event: serde_json::Value,
    /// Optional bus attributes
    #[serde(default)]
    attributes: std::collections::HashMap<String, String>,
    /// Optional publish time; defaults to now
    #[serde(default)]
    publish_time: Option<chrono::DateTime<Utc>>,
    /// Optional user records to seed the in-memory store
    #[serde(default)]
    users: Vec<fitglue_core::models::UserRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env().init()?;
    let config = ServerConfig::from_env();
    tracing::info!(?config, "fitglue enricher starting");

    // Providers register themselves into the process-global registry.
    {
        let registry = global_registry();
        let mut registry = registry
            .write()
            .map_err(|_| anyhow::anyhow!("provider registry lock poisoned"))?;
        if registry.is_empty() {
            builtin::install(&mut registry);
        }
        tracing::info!(providers = registry.len(), "provider registry ready");
    }

    let users = Arc::new(MemoryUserStore::default());
    let bus = Arc::new(MemoryBus::new());
    let deps = EnricherDeps {
        registry: global_registry(),
        users: users.clone(),
        executions: Arc::new(MemoryExecutionStore::new()),
        pending_inputs: Arc::new(MemoryPendingInputStore::new()),
        artifacts: Arc::new(LocalDirArtifactStore::new(config.artifact_bucket.clone())),
        bus: bus.clone(),
        notifier: Arc::new(LoggingNotifier::new()),
    };
    let enricher = Enricher::new(config, deps);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_owned();
        if line.is_empty() {
            continue;
        }
        let parsed: InputLine = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::error!(%error, "input line did not parse; skipping");
                continue;
            }
        };
        for user in parsed.users {
            seed_user(&users, user).await;
        }

        let mut envelope = EventEnvelope::new(
            parsed.event.to_string(),
            parsed.publish_time.unwrap_or_else(Utc::now),
        );
        envelope.attributes = parsed.attributes;

        match enricher.process(&envelope).await {
            Ok(summary) => {
                tracing::info!(
                    status = ?summary.status,
                    emitted = summary.emitted,
                    "invocation complete"
                );
                for event in &summary.events {
                    println!("{}", serde_json::to_string(event)?);
                }
            }
            Err(error) if error.is_retryable() => {
                tracing::warn!(%error, "invocation deferred for bus retry");
            }
            Err(error) => {
                tracing::error!(%error, "invocation failed");
            }
        }
    }

    tracing::info!(publishes = bus.len(), "stdin drained; shutting down");
    Ok(())
}

async fn seed_user(store: &Arc<MemoryUserStore>, user: fitglue_core::models::UserRecord) {
    use fitglue_enricher::stores::UserStore as _;
    // MemoryUserStore has no direct insert; rebuild is overkill, so fetch
    // first to keep seeding idempotent across lines.
    if let Ok(Some(_)) = store.fetch(user.id).await {
        return;
    }
    tracing::info!(user = %user.id, "seeding user record");
    store.seed(user);
}
