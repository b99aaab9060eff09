// ABOUTME: Event publisher contract and topic names for the enricher's queues
// ABOUTME: In-memory bus implementation recording publishes for tests and the local worker
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::sync::Mutex;

use async_trait::async_trait;

use crate::events::EventEnvelope;

/// Topic carrying raw activity events into the enricher
pub const RAW_TOPIC: &str = "raw-activities";

/// Topic carrying enriched activity events to the routing workers
pub const ENRICHED_TOPIC: &str = "enriched-activities";

/// Dedicated redelivery topic for data-lagged activities
pub const LAG_TOPIC: &str = "activity-lag";

/// Publisher half of the message bus.
///
/// The subscription side lives with the hosting runtime; the enricher only
/// ever publishes.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an envelope to a topic.
    ///
    /// # Errors
    ///
    /// Returns an error when the bus rejects the publish; callers decide
    /// whether that is fatal for the invocation.
    async fn publish(&self, topic: &str, envelope: EventEnvelope) -> anyhow::Result<()>;
}

/// In-memory bus that records every publish.
///
/// Backs the local stdin worker and the test suite.
#[derive(Default)]
pub struct MemoryBus {
    published: Mutex<Vec<(String, EventEnvelope)>>,
}

impl MemoryBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelopes published to `topic`, in publish order
    #[must_use]
    pub fn published_on(&self, topic: &str) -> Vec<EventEnvelope> {
        self.published
            .lock()
            .map(|published| {
                published
                    .iter()
                    .filter(|(published_topic, _)| published_topic == topic)
                    .map(|(_, envelope)| envelope.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of publishes across all topics
    #[must_use]
    pub fn len(&self) -> usize {
        self.published.lock().map(|published| published.len()).unwrap_or(0)
    }

    /// Whether nothing has been published
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventPublisher for MemoryBus {
    async fn publish(&self, topic: &str, envelope: EventEnvelope) -> anyhow::Result<()> {
        tracing::debug!(%topic, attributes = ?envelope.attributes, "publishing event");
        self.published
            .lock()
            .map_err(|_| anyhow::anyhow!("bus mutex poisoned"))?
            .push((topic.to_owned(), envelope));
        Ok(())
    }
}
