// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! An ephemeral request, produced by a processor, for a task to be
//! scheduled. Processors hand these to `ProcessorLoop::collect_emitted`,
//! which forwards each one to `TaskManager::run_task`.

use std::collections::HashMap;

use crate::value_objects::{Batch, TaskType};

#[derive(Debug, Clone, PartialEq)]
pub struct EmittedTask {
    pub task_type: TaskType,
    pub batch: Batch,
    /// Extra keyword overrides forwarded to `Registry::create_task`.
    pub kwargs: HashMap<String, String>,
}

impl EmittedTask {
    pub fn new(task_type: TaskType, batch: Batch) -> Self {
        Self {
            task_type,
            batch,
            kwargs: HashMap::new(),
        }
    }

    pub fn with_kwargs(mut self, kwargs: HashMap<String, String>) -> Self {
        self.kwargs = kwargs;
        self
    }
}
