// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Values and rows

pub mod record;
pub mod value;

pub use record::Record;
pub use value::Value;
