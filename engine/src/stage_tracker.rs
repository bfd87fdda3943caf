// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Tracker
//!
//! [`StageTrackerImpl`] is the concrete, sqlite-backed implementation of
//! [`musiclib_domain::StageTracker`], the sole mutator of
//! `FileRecord::completed_tasks` and `FileRecord::stage`. No task body is
//! ever allowed to touch either field directly — tasks hold an
//! `Arc<dyn StageTracker>` handle and call `complete_stage_for_file` when
//! their work is done.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use musiclib_domain::{CoreError, FileRepository, StageTracker, TaskName};
use tokio::sync::Mutex;

use crate::registry::Registry;

/// Chunk size for [`StageTrackerImpl::batch_complete_stage`], per §4.3.
const BATCH_CHUNK_SIZE: usize = 200;

pub struct StageTrackerImpl {
    files: Arc<dyn FileRepository>,
    registry: Arc<Registry>,
    /// Per-file locks so concurrent completions of the same file serialize;
    /// different files proceed independently.
    file_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl StageTrackerImpl {
    pub fn new(files: Arc<dyn FileRepository>, registry: Arc<Registry>) -> Self {
        Self { files, registry, file_locks: Mutex::new(HashMap::new()) }
    }

    async fn file_lock(&self, file_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.file_locks.lock().await;
        locks.entry(file_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// One fetch/mutate/update pass — a "fresh transaction" in that it
    /// re-reads `file_id` from `self.files` rather than reusing any state
    /// from a prior attempt.
    async fn try_complete_once(&self, file_id: i64, task_name: &TaskName) -> Result<(), CoreError> {
        let mut file = self
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| CoreError::InvalidInput(format!("file {file_id} not found")))?;

        file.completed_tasks.insert(task_name.clone());

        let required: HashSet<TaskName> = self.registry.tasks_for_stage(file.stage).into_iter().collect();
        if required.is_subset(&file.completed_tasks) {
            if let Some(next) = file.stage.next_stage() {
                file.stage = next;
            }
        }
        file.processed_at = Some(Utc::now());

        self.files.update(&file).await
    }
}

#[async_trait]
impl StageTracker for StageTrackerImpl {
    /// Records `task_name` as completed for `file_id` (idempotent), then
    /// advances the file's stage if every task registered for its current
    /// stage has now completed. `processed_at` is refreshed on every call,
    /// advance or no-op alike.
    ///
    /// Per §7: a recoverable failure (`CoreError::is_recoverable`) is
    /// retried once with a fresh transaction. A repeat failure is logged
    /// and swallowed — the file's completion is simply not recorded this
    /// round, rather than propagated as an error to the caller.
    async fn complete_stage_for_file(&self, file_id: i64, task_name: TaskName) -> Result<(), CoreError> {
        let lock = self.file_lock(file_id).await;
        let _guard = lock.lock().await;

        match self.try_complete_once(file_id, &task_name).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_recoverable() => {
                tracing::warn!(file_id, %error, "stage completion failed, retrying with a fresh transaction");
                match self.try_complete_once(file_id, &task_name).await {
                    Ok(()) => Ok(()),
                    Err(error) => {
                        tracing::error!(
                            file_id,
                            %error,
                            "stage completion failed again after retry, not recorded this round"
                        );
                        Ok(())
                    }
                }
            }
            Err(error) => Err(error),
        }
    }

    /// Applies [`Self::complete_stage_for_file`] to every id in `file_ids`,
    /// chunked in groups of 200 per §4.3.
    async fn batch_complete_stage(&self, file_ids: &[i64], task_name: TaskName) -> Result<(), CoreError> {
        for chunk in file_ids.chunks(BATCH_CHUNK_SIZE) {
            for &file_id in chunk {
                self.complete_stage_for_file(file_id, task_name.clone()).await?;
            }
        }
        Ok(())
    }
}
