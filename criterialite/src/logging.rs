// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logger initialisation
//!
//! The crate logs through the `log` facade. Applications without their own logger can
//! install `env_logger` here; per-module directives in `RUST_LOG` still apply.

use log::LevelFilter;

/// Install `env_logger` with `level` as the default filter.
///
/// Panics if a global logger is already installed, like `env_logger::Builder::init`.
pub fn init(level: LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Install a test logger that writes through the test harness capture.
///
/// Safe to call from every test; only the first call installs the logger.
pub fn try_init_for_tests() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}
