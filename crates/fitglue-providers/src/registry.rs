// ABOUTME: Process-global provider registry keyed by stable provider type
// ABOUTME: Thread-safe registration at init, read-mostly lookup and manifest discovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use fitglue_core::models::ProviderKind;

use crate::contract::{EnrichmentProvider, ProviderManifest};

/// Registry holding every available enrichment provider and its manifest.
///
/// Read-mostly: mutations happen during process initialization (each
/// provider registers itself) and in tests that clear the registry.
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn EnrichmentProvider>>,
    manifests: HashMap<ProviderKind, ProviderManifest>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            manifests: HashMap::new(),
        }
    }

    /// Register a provider, replacing any previous registration of the same
    /// type. Later registrations win so tests can substitute fakes.
    pub fn register(&mut self, provider: Arc<dyn EnrichmentProvider>) {
        let kind = provider.kind();
        let manifest = provider.manifest();
        tracing::info!(provider = %kind, "registering enrichment provider");
        self.manifests.insert(kind, manifest);
        self.providers.insert(kind, provider);
    }

    /// Look up a provider by type
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn EnrichmentProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Manifest for a provider type
    #[must_use]
    pub fn manifest(&self, kind: ProviderKind) -> Option<&ProviderManifest> {
        self.manifests.get(&kind)
    }

    /// All manifests, ordered by provider-type identifier for stable
    /// discovery output
    #[must_use]
    pub fn all_manifests(&self) -> Vec<ProviderManifest> {
        let mut manifests: Vec<ProviderManifest> = self.manifests.values().cloned().collect();
        manifests.sort_by(|a, b| a.kind.as_str().cmp(b.kind.as_str()));
        manifests
    }

    /// Whether a provider type is registered
    #[must_use]
    pub fn has(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Remove every registration. Intended for tests that need a clean
    /// process-global registry.
    pub fn clear(&mut self) {
        self.providers.clear();
        self.manifests.clear();
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<RwLock<ProviderRegistry>>> = OnceLock::new();

/// Get the process-global provider registry instance
#[must_use]
pub fn global_registry() -> Arc<RwLock<ProviderRegistry>> {
    GLOBAL_REGISTRY
        .get_or_init(|| Arc::new(RwLock::new(ProviderRegistry::new())))
        .clone()
}
