// ABOUTME: Configuration module for the enricher worker
// ABOUTME: Environment-based settings parsed into a typed ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

/// Environment-based configuration management
pub mod environment;

pub use environment::{Environment, ServerConfig};
