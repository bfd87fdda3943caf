// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # StageTracker
//!
//! The sole mutator of `FileRecord::completed_tasks`/`stage` (§9's
//! `finalize_file`/`mark_task_completed` consolidation). Defined here as a
//! trait, not a concrete type, so that a task can hold an
//! `Arc<dyn StageTracker>` injected at construction without depending on
//! the engine crate's concrete persistence backend.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::value_objects::TaskName;

#[async_trait]
pub trait StageTracker: Send + Sync {
    /// Records `task_name` as completed for `file_id` (idempotent), then
    /// advances the file's stage if every task registered for its current
    /// stage has now completed (§4.3).
    async fn complete_stage_for_file(&self, file_id: i64, task_name: TaskName) -> Result<(), CoreError>;

    /// Applies [`Self::complete_stage_for_file`] to every id in `file_ids`,
    /// chunked in groups of 200 (§4.3).
    async fn batch_complete_stage(&self, file_ids: &[i64], task_name: TaskName) -> Result<(), CoreError>;
}
