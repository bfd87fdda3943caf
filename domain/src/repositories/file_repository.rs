// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Repository
//!
//! Persistence contract for `File` rows (§6.2): single-row fetch by id,
//! filtered query by scalar/null predicates, insert, update, delete. The
//! StageTracker and Scanner are the only core components that reach through
//! this trait; both only ever need the predicates captured in
//! [`FileFilter`].

use async_trait::async_trait;

use crate::entities::FileRecord;
use crate::error::CoreError;
use crate::value_objects::Stage;

/// Scalar/null predicates supported by `find_where` (§6.2). `None` means
/// "don't filter on this field."
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Only files whose `stage` does not have this bit set.
    pub missing_stage: Option<Stage>,
    /// Only files whose `processed_at` is (or is not) null.
    pub processed_at_is_null: Option<bool>,
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, CoreError>;

    async fn find_where(&self, filter: FileFilter) -> Result<Vec<FileRecord>, CoreError>;

    async fn insert(&self, file: &FileRecord) -> Result<i64, CoreError>;

    async fn update(&self, file: &FileRecord) -> Result<(), CoreError>;

    async fn delete(&self, id: i64) -> Result<(), CoreError>;
}
