// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parser
//!
//! The example `PARSER` task: scheduled by the scanner with a `FileIds`
//! batch whenever a file's next stage is `IMPORT`. Reads the file's
//! existing tag/codec metadata (stubbed here — no concrete audio-tagging
//! dependency is part of this core) and marks the batch's stage complete.

use std::sync::Arc;

use async_trait::async_trait;
use musiclib_domain::{
    Batch, CoreError, FileRepository, PluginMeta, PluginVersion, Stage, StageTracker, Task,
    TaskDescriptor, TaskName, TaskType,
};

pub struct Parser {
    batch: Batch,
    files: Arc<dyn FileRepository>,
    stage_tracker: Arc<dyn StageTracker>,
    descriptor: TaskDescriptor,
}

impl Parser {
    pub fn new(batch: Batch, files: Arc<dyn FileRepository>, stage_tracker: Arc<dyn StageTracker>) -> Self {
        let descriptor = TaskDescriptor {
            meta: PluginMeta {
                name: TaskName::parse("parser").expect("\"parser\" is a valid task name"),
                description: "Reads each file's existing tags and marks the IMPORT stage complete.".to_string(),
                version: PluginVersion::parse("1.0.0").expect("\"1.0.0\" is a valid version"),
                depends: vec![],
                exclusive: false,
                heavy_io: false,
                cooldown_seconds: 0.0,
            },
            task_type: TaskType::Parser,
            stage_type: Stage::Import,
        };
        Self { batch, files, stage_tracker, descriptor }
    }
}

#[async_trait]
impl Task for Parser {
    fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    async fn run(&mut self) -> Result<(), CoreError> {
        let Batch::FileIds(ids) = &self.batch else {
            return Ok(());
        };
        let task_name = self.descriptor.meta.name.clone();
        for &id in ids {
            if self.files.find_by_id(id).await?.is_none() {
                tracing::warn!(file_id = id, "parser skipping unknown file id");
                continue;
            }
            self.stage_tracker.complete_stage_for_file(id, task_name.clone()).await?;
        }
        Ok(())
    }
}
