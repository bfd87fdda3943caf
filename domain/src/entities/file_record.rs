// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FileRecord
//!
//! The unit of work the pipeline progresses. A file's `stage` is
//! monotonically non-decreasing and its `completed_tasks` set only grows —
//! callers that rely on either invariant being violated have a bug, not a
//! feature to work around.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::value_objects::{Stage, TaskName};

/// A file tracked by the library.
///
/// # Invariants
///
/// - `stage` never decreases across successive snapshots of the same `id`.
/// - `completed_tasks` never loses an element across successive snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub path: PathBuf,
    pub stage: Stage,
    pub completed_tasks: BTreeSet<TaskName>,
    /// Set by `StageTracker::complete_stage_for_file` each time a stage
    /// advance (or a no-op completion) is committed. `None` until the first
    /// completion is recorded — explicit optionality instead of a sentinel
    /// timestamp.
    pub processed_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn new(id: i64, path: PathBuf) -> Self {
        Self {
            id,
            path,
            stage: Stage::FIRST,
            completed_tasks: BTreeSet::new(),
            processed_at: None,
        }
    }

    pub fn has_completed(&self, task: &TaskName) -> bool {
        self.completed_tasks.contains(task)
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_starts_at_first_stage_with_no_completed_tasks() {
        let file = FileRecord::new(1, PathBuf::from("/music/import/a.flac"));
        assert_eq!(file.stage, Stage::FIRST);
        assert!(file.completed_tasks.is_empty());
        assert!(file.processed_at.is_none());
        assert!(!file.is_terminal());
    }
}
