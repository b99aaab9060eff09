// ABOUTME: Store contracts for user config, audit rows, pending inputs, and artifacts
// ABOUTME: In-memory implementations for tests plus a local-directory artifact store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use fitglue_core::models::{ExecutionRecord, PendingInput, UserRecord};

/// Read side of the user-config store plus the sync-counter write-back.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user record by id; `Ok(None)` when the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on store-level failures.
    async fn fetch(&self, user_id: Uuid) -> anyhow::Result<Option<UserRecord>>;

    /// Increment the user's monthly sync counter for `month`, resetting it
    /// first when the stored month marker differs.
    ///
    /// # Errors
    ///
    /// Returns an error on store-level failures; callers treat this write as
    /// best-effort.
    async fn increment_sync_count(&self, user_id: Uuid, month: &str) -> anyhow::Result<()>;
}

/// Append/update access to the `executions` audit collection.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert or update one execution row.
    ///
    /// # Errors
    ///
    /// Returns an error on store-level failures; audit writes are transient
    /// and never fail the invocation.
    async fn upsert(&self, record: &ExecutionRecord) -> anyhow::Result<()>;
}

/// Pending-input rows keyed by activity id.
#[async_trait]
pub trait PendingInputStore: Send + Sync {
    /// Create the row unless one already exists for its activity id.
    ///
    /// Returns `true` when the row was created, `false` when a row already
    /// existed (not an error: creation is idempotent).
    ///
    /// # Errors
    ///
    /// Returns an error on store-level failures.
    async fn create_if_absent(&self, row: &PendingInput) -> anyhow::Result<bool>;
}

/// Object store for encoded activity artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` at `key`, overwriting any previous object, and return
    /// the stored object's URI.
    ///
    /// # Errors
    ///
    /// Returns an error on store-level failures; the orchestrator logs the
    /// failure and emits the event without an artifact URI.
    async fn put(&self, key: &str, bytes: Bytes) -> anyhow::Result<String>;
}

/// In-memory user store backed by a `HashMap` snapshot.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserStore {
    /// Store seeded with the given users
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|user| (user.id, user)).collect()),
        }
    }

    /// Insert or replace a user record
    pub fn seed(&self, user: UserRecord) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.id, user);
        }
    }

    /// Current snapshot of a user, for test assertions
    #[must_use]
    pub fn get(&self, user_id: Uuid) -> Option<UserRecord> {
        self.users
            .read()
            .ok()
            .and_then(|users| users.get(&user_id).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn fetch(&self, user_id: Uuid) -> anyhow::Result<Option<UserRecord>> {
        let users = self.users.read().map_err(|_| anyhow!("user store poisoned"))?;
        Ok(users.get(&user_id).cloned())
    }

    async fn increment_sync_count(&self, user_id: Uuid, month: &str) -> anyhow::Result<()> {
        let mut users = self.users.write().map_err(|_| anyhow!("user store poisoned"))?;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("user {user_id} not found"))?;
        if user.sync_count_month != month {
            user.sync_count_month = month.to_owned();
            user.sync_count_this_month = 0;
        }
        user.sync_count_this_month += 1;
        Ok(())
    }
}

/// In-memory execution store recording every upsert.
#[derive(Default)]
pub struct MemoryExecutionStore {
    records: RwLock<HashMap<Uuid, ExecutionRecord>>,
}

impl MemoryExecutionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows, unordered
    #[must_use]
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn upsert(&self, record: &ExecutionRecord) -> anyhow::Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("execution store poisoned"))?;
        records.insert(record.id, record.clone());
        Ok(())
    }
}

/// In-memory pending-input store keyed by activity id.
#[derive(Default)]
pub struct MemoryPendingInputStore {
    rows: RwLock<HashMap<String, PendingInput>>,
}

impl MemoryPendingInputStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The row for an activity id, if any
    #[must_use]
    pub fn get(&self, activity_id: &str) -> Option<PendingInput> {
        self.rows
            .read()
            .ok()
            .and_then(|rows| rows.get(activity_id).cloned())
    }

    /// Number of stored rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    /// Whether the store has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PendingInputStore for MemoryPendingInputStore {
    async fn create_if_absent(&self, row: &PendingInput) -> anyhow::Result<bool> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| anyhow!("pending-input store poisoned"))?;
        if rows.contains_key(&row.activity_id) {
            return Ok(false);
        }
        rows.insert(row.activity_id.clone(), row.clone());
        Ok(true)
    }
}

/// In-memory artifact store, addressing objects as `mem://bucket/key`.
pub struct MemoryArtifactStore {
    bucket: String,
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryArtifactStore {
    /// Store for the named bucket
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// The stored object at `key`, if any
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes) -> anyhow::Result<String> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("artifact store poisoned"))?;
        objects.insert(key.to_owned(), bytes);
        Ok(format!("mem://{}/{key}", self.bucket))
    }
}

/// Artifact store writing objects under a local directory.
///
/// Used by the local worker harness; object keys map to relative paths and
/// URIs use the `file://` scheme.
pub struct LocalDirArtifactStore {
    root: PathBuf,
}

impl LocalDirArtifactStore {
    /// Store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalDirArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes) -> anyhow::Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating artifact directory {}", parent.display()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing artifact {}", path.display()))?;
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fitglue_core::models::{PendingInputStatus, Plan};

    fn user(id: Uuid) -> UserRecord {
        UserRecord {
            id,
            plan: Plan::Free,
            integrations: HashMap::new(),
            pipelines: Vec::new(),
            device_tokens: Vec::new(),
            sync_count_this_month: 2,
            sync_count_month: "2026-07".into(),
        }
    }

    #[tokio::test]
    async fn increment_resets_on_month_rollover() {
        let id = Uuid::new_v4();
        let store = MemoryUserStore::with_users([user(id)]);
        store.increment_sync_count(id, "2026-08").await.unwrap();
        let updated = store.get(id).unwrap();
        assert_eq!(updated.sync_count_month, "2026-08");
        assert_eq!(updated.sync_count_this_month, 1);

        store.increment_sync_count(id, "2026-08").await.unwrap();
        assert_eq!(store.get(id).unwrap().sync_count_this_month, 2);
    }

    #[tokio::test]
    async fn pending_input_creation_is_idempotent() {
        let store = MemoryPendingInputStore::new();
        let row = PendingInput {
            activity_id: "w-1".into(),
            user_id: Uuid::new_v4(),
            required_fields: vec!["title".into()],
            original_payload: serde_json::json!({}),
            status: PendingInputStatus::Waiting,
            created_at: Utc::now(),
        };
        assert!(store.create_if_absent(&row).await.unwrap());
        assert!(!store.create_if_absent(&row).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn memory_artifacts_round_trip() {
        let store = MemoryArtifactStore::new("fitglue-artifacts");
        let uri = store
            .put("activities/u/a.fit", Bytes::from_static(b"fit"))
            .await
            .unwrap();
        assert_eq!(uri, "mem://fitglue-artifacts/activities/u/a.fit");
        assert_eq!(store.get("activities/u/a.fit").unwrap(), Bytes::from_static(b"fit"));
    }
}
