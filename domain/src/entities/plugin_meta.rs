// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PluginMeta
//!
//! The reference source has a deep inheritance chain (`PluginBase` ->
//! `AudioUtilBase`/`TaskBase`/`ProcessorBase` -> concrete plugin) to share
//! the name/version/dependency bookkeeping every plugin kind needs. Here
//! that's flattened: `PluginMeta` is a plain struct every concrete plugin
//! embeds, and `AudioUtility`/`Task`/`Processor` (see `crate::services`) are
//! implemented directly — no base classes, no virtual dispatch through an
//! intermediate layer.

use crate::value_objects::{PluginVersion, TaskName};

/// Static, validated metadata shared by every plugin kind.
///
/// `PartialEq` only, not `Eq`: `cooldown_seconds` is a float.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginMeta {
    pub name: TaskName,
    pub description: String,
    pub version: PluginVersion,
    /// Audio-utility names this plugin requires, injected positionally at
    /// construction time (§4.1).
    pub depends: Vec<TaskName>,
    pub exclusive: bool,
    pub heavy_io: bool,
    pub cooldown_seconds: f64,
}

impl PluginMeta {
    pub const DEFAULT_COOLDOWN_SECONDS: f64 = 3600.0;
}
