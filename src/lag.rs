// ABOUTME: Lag controller implementing the bounded data-lag retry protocol
// ABOUTME: First attempts offload to the lag topic; redeliveries fail back to the bus
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::bus::{EventPublisher, LAG_TOPIC};
use crate::events::{attr, EventEnvelope};

/// Minimum backoff configured on the lag topic's push subscription
pub const LAG_MIN_BACKOFF_SECS: u64 = 60;

/// Maximum backoff configured on the lag topic's push subscription
pub const LAG_MAX_BACKOFF_SECS: u64 = 600;

/// Message retention configured on the lag topic
pub const LAG_RETENTION_SECS: u64 = 3600;

/// How a retryable provider signal should be handled for this delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagDisposition {
    /// First attempt: offload to the lag topic and ACK the original
    Offload,
    /// Lag-queue redelivery: fail the invocation so the bus retries with its
    /// configured backoff
    FailForBusRetry,
}

/// Implements the data-lag queueing protocol over the message bus.
///
/// The bus's built-in retry offers no usable backoff, so the first retryable
/// attempt is offloaded to a dedicated lag topic whose push subscription
/// provides bounded exponential backoff. The lag ceiling caps total wait by
/// forcing best-effort completion once the event is old enough.
pub struct LagController {
    ceiling: Duration,
    bus: Arc<dyn EventPublisher>,
}

impl LagController {
    /// Controller with the given age ceiling
    #[must_use]
    pub fn new(ceiling: Duration, bus: Arc<dyn EventPublisher>) -> Self {
        Self { ceiling, bus }
    }

    /// Whether providers must be forbidden from raising Retryable: the event
    /// has been waiting longer than the configured ceiling.
    #[must_use]
    pub fn do_not_retry(&self, envelope: &EventEnvelope, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(envelope.publish_time) > self.ceiling
    }

    /// How a retryable signal must be handled for this delivery
    #[must_use]
    pub fn disposition(envelope: &EventEnvelope) -> LagDisposition {
        if envelope.is_lag_redelivery() {
            LagDisposition::FailForBusRetry
        } else {
            LagDisposition::Offload
        }
    }

    /// Re-publish the raw payload verbatim to the lag topic with the
    /// `origin=lag-queue` extension set.
    ///
    /// # Errors
    ///
    /// Returns an error when the lag-topic publish fails; the caller must
    /// then NACK the original so nothing is lost.
    pub async fn offload(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        let mut attributes = envelope.attributes.clone();
        attributes.insert(attr::ORIGIN.to_owned(), attr::LAG_QUEUE.to_owned());
        let redelivery = EventEnvelope {
            data: envelope.data.clone(),
            attributes,
            publish_time: envelope.publish_time,
        };
        tracing::info!(
            age_secs = Utc::now()
                .signed_duration_since(envelope.publish_time)
                .num_seconds(),
            "offloading data-lagged event to the lag topic"
        );
        self.bus.publish(LAG_TOPIC, redelivery).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;

    fn envelope(age_minutes: i64, lagged: bool) -> EventEnvelope {
        let envelope = EventEnvelope::new(
            r#"{"payload": 1}"#.into(),
            Utc::now() - Duration::minutes(age_minutes),
        );
        if lagged {
            envelope.with_attribute(attr::ORIGIN, attr::LAG_QUEUE)
        } else {
            envelope
        }
    }

    #[test]
    fn ceiling_trips_after_fifteen_minutes() {
        let controller = LagController::new(Duration::minutes(15), Arc::new(MemoryBus::new()));
        assert!(!controller.do_not_retry(&envelope(14, false), Utc::now()));
        assert!(controller.do_not_retry(&envelope(16, false), Utc::now()));
    }

    #[test]
    fn disposition_depends_on_origin() {
        assert_eq!(
            LagController::disposition(&envelope(1, false)),
            LagDisposition::Offload
        );
        assert_eq!(
            LagController::disposition(&envelope(1, true)),
            LagDisposition::FailForBusRetry
        );
    }

    #[tokio::test]
    async fn offload_republishes_payload_verbatim_with_origin() {
        let bus = Arc::new(MemoryBus::new());
        let controller = LagController::new(Duration::minutes(15), bus.clone());
        let original = envelope(1, false);
        controller.offload(&original).await.unwrap();

        let published = bus.published_on(LAG_TOPIC);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].data, original.data);
        assert_eq!(published[0].origin(), Some(attr::LAG_QUEUE));
    }
}
