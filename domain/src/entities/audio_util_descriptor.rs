// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Static metadata describing a registered audio-utility kind (§3). Audio
//! utilities are shared dependencies, not schedulable work: they have no
//! `task_type`/`stage_type`, just the flags governing how instantiation and
//! invocation are gated.

use crate::value_objects::{PluginVersion, TaskName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUtilDescriptor {
    pub name: TaskName,
    pub description: String,
    pub version: PluginVersion,
    pub depends: Vec<TaskName>,
    pub exclusive: bool,
    pub heavy_io: bool,
}
