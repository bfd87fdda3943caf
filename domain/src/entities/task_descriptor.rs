// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Static metadata describing a registered task kind (§3).

use crate::entities::PluginMeta;
use crate::value_objects::{Stage, TaskType};

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDescriptor {
    pub meta: PluginMeta,
    pub task_type: TaskType,
    /// The stage this task contributes to; the task is a candidate for
    /// scheduling whenever a file's next missing stage equals this value.
    pub stage_type: Stage,
}

impl TaskDescriptor {
    pub fn name_str(&self) -> &str {
        self.meta.name.as_str()
    }
}
