// ABOUTME: Enrichment provider contract, registry, time-series aligner, and built-ins
// ABOUTME: Every enrichment step the orchestrator can run lives behind this crate's trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

#![deny(unsafe_code)]

//! # FitGlue Providers
//!
//! The provider layer of the enrichment pipeline. An enrichment provider is
//! one step in a user-configured pipeline: it observes the working activity
//! (read-only), and returns an [`contract::EnrichmentResult`] the
//! orchestrator applies, or signals that it must be retried later or that
//! user input is required.
//!
//! ## Modules
//!
//! - **contract**: the uniform provider interface, result and error types,
//!   manifests, and config-schema validation
//! - **registry**: the process-global provider registry
//! - **align**: projection of sparse external sample streams onto the
//!   activity's own record timeline
//! - **builtin**: the shipped provider catalogue

/// Time-series alignment of external sample streams onto record timelines
pub mod align;

/// Built-in provider catalogue
pub mod builtin;

/// Provider trait, outcome types, manifests, and config validation
pub mod contract;

/// Process-global provider registry
pub mod registry;

pub use contract::{
    ConfigField, EnrichContext, EnrichmentProvider, EnrichmentResult, FieldType, ProviderError,
    ProviderManifest,
};
pub use registry::{global_registry, ProviderRegistry};
