// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurevo-observability
//!
//! Logging initialization for the neurevo crates with per-crate debug flag
//! support.
//!
//! ## Features
//! - `file-logging`: Daily-rolling JSON log files in a per-run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use init::*;

/// Known neurevo crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "neurevo",
    "neurevo-config",
    "neurevo-observability",
    "neurevo-neural",
];
