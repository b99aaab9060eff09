// ABOUTME: Push-notification collaborator contract for wait-for-input alerts
// ABOUTME: Errors are logged and swallowed; notifications never fail an invocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

/// One push notification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    /// Target user
    pub user_id: Uuid,
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Opaque device tokens to deliver to
    pub device_tokens: Vec<String>,
    /// Structured data payload
    pub data: HashMap<String, String>,
}

/// Delivery seam for push notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one push notification.
    ///
    /// # Errors
    ///
    /// Returns an error on delivery failure; callers log and swallow it.
    async fn push(&self, notification: PushNotification) -> anyhow::Result<()>;
}

/// Notifier that only logs; the default for local runs.
#[derive(Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    /// Create the logging notifier
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn push(&self, notification: PushNotification) -> anyhow::Result<()> {
        tracing::info!(
            user = %notification.user_id,
            title = %notification.title,
            tokens = notification.device_tokens.len(),
            "push notification (logging only)"
        );
        Ok(())
    }
}

/// Notifier recording deliveries for tests.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<PushNotification>>,
}

impl MemoryNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications delivered so far, in order
    #[must_use]
    pub fn sent(&self) -> Vec<PushNotification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn push(&self, notification: PushNotification) -> anyhow::Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("notifier mutex poisoned"))?
            .push(notification);
        Ok(())
    }
}
