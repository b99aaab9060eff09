// ABOUTME: FIT binary artifact encoding for enriched activities
// ABOUTME: CRC-terminated little-endian container per the published FIT format
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

/// FIT CRC-16 checksum
pub mod crc;

/// Activity-file encoder
pub mod encoder;

pub use encoder::{encode_activity, fit_timestamp, semicircles, FIT_EPOCH_OFFSET};
