// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Static metadata describing a registered processor kind (§3). Same shape
//! as `TaskDescriptor` minus `stage_type` — processors inspect external
//! state and emit tasks, they never advance a file's own stage.

use crate::entities::PluginMeta;
use crate::value_objects::TaskType;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorDescriptor {
    pub meta: PluginMeta,
    pub task_type: TaskType,
}

impl ProcessorDescriptor {
    pub fn name_str(&self) -> &str {
        self.meta.name.as_str()
    }
}
