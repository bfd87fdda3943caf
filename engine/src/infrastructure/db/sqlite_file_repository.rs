// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `FileRepository` against the `files` table (§6.2).

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use musiclib_domain::{CoreError, FileFilter, FileRecord, FileRepository, Stage, TaskName};
use sqlx::SqlitePool;

#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    path: String,
    stage: i64,
    completed_tasks: String,
    processed_at: Option<DateTime<Utc>>,
}

impl FileRow {
    fn into_record(self) -> Result<FileRecord, CoreError> {
        let stage = Stage::from_bit(self.stage as u32)
            .ok_or_else(|| CoreError::internal(format!("row {} has unrecognized stage bit {}", self.id, self.stage)))?;
        let completed_task_names: Vec<String> = serde_json::from_str(&self.completed_tasks)
            .map_err(|error| CoreError::internal(format!("row {} has malformed completed_tasks: {error}", self.id)))?;
        let completed_tasks: BTreeSet<TaskName> = completed_task_names
            .iter()
            .map(|name| TaskName::parse(name))
            .collect::<Result<_, _>>()
            .map_err(|error| CoreError::internal(format!("row {} has invalid task name: {error}", self.id)))?;

        Ok(FileRecord {
            id: self.id,
            path: PathBuf::from(self.path),
            stage,
            completed_tasks,
            processed_at: self.processed_at,
        })
    }
}

fn completed_tasks_json(file: &FileRecord) -> Result<String, CoreError> {
    let names: Vec<&str> = file.completed_tasks.iter().map(TaskName::as_str).collect();
    serde_json::to_string(&names).map_err(|error| CoreError::internal(format!("failed to serialize completed_tasks: {error}")))
}

pub struct SqliteFileRepository {
    pool: SqlitePool,
}

impl SqliteFileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for SqliteFileRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, CoreError> {
        let row: Option<FileRow> = sqlx::query_as("SELECT id, path, stage, completed_tasks, processed_at FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| CoreError::internal(format!("find_by_id({id}) failed: {error}")))?;

        row.map(FileRow::into_record).transpose()
    }

    async fn find_where(&self, filter: FileFilter) -> Result<Vec<FileRecord>, CoreError> {
        let mut sql = String::from("SELECT id, path, stage, completed_tasks, processed_at FROM files WHERE 1 = 1");
        if filter.missing_stage.is_some() {
            sql.push_str(" AND (stage & ?) = 0");
        }
        match filter.processed_at_is_null {
            Some(true) => sql.push_str(" AND processed_at IS NULL"),
            Some(false) => sql.push_str(" AND processed_at IS NOT NULL"),
            None => {}
        }

        let mut query = sqlx::query_as::<_, FileRow>(&sql);
        if let Some(stage) = filter.missing_stage {
            query = query.bind(stage.as_bit() as i64);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|error| CoreError::internal(format!("find_where failed: {error}")))?;

        rows.into_iter().map(FileRow::into_record).collect()
    }

    async fn insert(&self, file: &FileRecord) -> Result<i64, CoreError> {
        let completed_tasks = completed_tasks_json(file)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (path, stage, completed_tasks, processed_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(file.path.to_string_lossy().to_string())
        .bind(file.stage.as_bit() as i64)
        .bind(completed_tasks)
        .bind(file.processed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| CoreError::internal(format!("insert failed: {error}")))?;

        Ok(id)
    }

    async fn update(&self, file: &FileRecord) -> Result<(), CoreError> {
        let completed_tasks = completed_tasks_json(file)?;
        sqlx::query("UPDATE files SET path = ?, stage = ?, completed_tasks = ?, processed_at = ? WHERE id = ?")
            .bind(file.path.to_string_lossy().to_string())
            .bind(file.stage.as_bit() as i64)
            .bind(completed_tasks)
            .bind(file.processed_at)
            .bind(file.id)
            .execute(&self.pool)
            .await
            .map_err(|error| CoreError::internal(format!("update({}) failed: {error}", file.id)))?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|error| CoreError::internal(format!("delete({id}) failed: {error}")))?;

        Ok(())
    }
}
