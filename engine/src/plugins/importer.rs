// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Importer
//!
//! The example `IMPORTER` task (`original_source/src/Tasks/importer.py`):
//! walks the import directory, registers every file whose extension is in
//! the configured allow-list as a new [`FileRecord`], and — when
//! `import.clean` is set — deletes files that don't match. Scheduled by the
//! scanner with `batch = Empty`; it discovers its own inputs rather than
//! operating on a given set of file ids.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use musiclib_domain::{
    CoreError, FileRecord, FileRepository, PluginMeta, PluginVersion, Stage, StageTracker, Task,
    TaskDescriptor, TaskName, TaskType,
};

use crate::scanner::list_all_entries;

pub struct Importer {
    import_dir: PathBuf,
    extensions: Vec<String>,
    clean: bool,
    files: Arc<dyn FileRepository>,
    stage_tracker: Arc<dyn StageTracker>,
    descriptor: TaskDescriptor,
}

impl Importer {
    pub fn new(
        import_dir: PathBuf,
        extensions: Vec<String>,
        clean: bool,
        files: Arc<dyn FileRepository>,
        stage_tracker: Arc<dyn StageTracker>,
    ) -> Self {
        let descriptor = TaskDescriptor {
            meta: PluginMeta {
                name: TaskName::parse("importer").expect("\"importer\" is a valid task name"),
                description: "Registers new files found under the import directory, \
                    optionally removing ones outside the extension allow-list."
                    .to_string(),
                version: PluginVersion::parse("1.0.0").expect("\"1.0.0\" is a valid version"),
                depends: vec![],
                exclusive: true,
                heavy_io: true,
                cooldown_seconds: 0.0,
            },
            task_type: TaskType::Importer,
            stage_type: Stage::Preimport,
        };
        Self { import_dir, extensions: lowercase_with_dot(extensions), clean, files, stage_tracker, descriptor }
    }

    async fn import_one(&self, path: &Path) -> Result<(), CoreError> {
        let task_name = self.descriptor.meta.name.clone();
        let record = FileRecord::new(0, path.to_path_buf());
        let id = self.files.insert(&record).await?;
        self.stage_tracker.complete_stage_for_file(id, task_name).await
    }
}

fn lowercase_with_dot(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            if lower.starts_with('.') { lower } else { format!(".{lower}") }
        })
        .collect()
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else { return false };
    let dotted = format!(".{}", ext.to_ascii_lowercase());
    extensions.iter().any(|allowed| allowed == &dotted)
}

#[async_trait]
impl Task for Importer {
    fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    async fn run(&mut self) -> Result<(), CoreError> {
        let entries = list_all_entries(&self.import_dir).await?;
        for entry in entries {
            if entry.is_dir {
                continue;
            }
            if matches_extension(&entry.path, &self.extensions) {
                if let Err(error) = self.import_one(&entry.path).await {
                    tracing::warn!(path = %entry.path.display(), %error, "failed to import file");
                }
            } else if self.clean {
                if let Err(error) = tokio::fs::remove_file(&entry.path).await {
                    tracing::warn!(path = %entry.path.display(), %error, "failed to remove non-matching file");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musiclib_domain::{FileFilter, TaskName as DomainTaskName};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct InMemoryFileRepository {
        files: StdMutex<HashMap<i64, FileRecord>>,
        next_id: StdMutex<i64>,
    }

    impl InMemoryFileRepository {
        fn new() -> Self {
            Self { files: StdMutex::new(HashMap::new()), next_id: StdMutex::new(1) }
        }
    }

    #[async_trait]
    impl FileRepository for InMemoryFileRepository {
        async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, CoreError> {
            Ok(self.files.lock().unwrap().get(&id).cloned())
        }

        async fn find_where(&self, _filter: FileFilter) -> Result<Vec<FileRecord>, CoreError> {
            Ok(self.files.lock().unwrap().values().cloned().collect())
        }

        async fn insert(&self, file: &FileRecord) -> Result<i64, CoreError> {
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            let mut file = file.clone();
            file.id = id;
            self.files.lock().unwrap().insert(id, file);
            Ok(id)
        }

        async fn update(&self, file: &FileRecord) -> Result<(), CoreError> {
            self.files.lock().unwrap().insert(file.id, file.clone());
            Ok(())
        }

        async fn delete(&self, id: i64) -> Result<(), CoreError> {
            self.files.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    struct NoopStageTracker;

    #[async_trait]
    impl StageTracker for NoopStageTracker {
        async fn complete_stage_for_file(&self, _file_id: i64, _task_name: DomainTaskName) -> Result<(), CoreError> {
            Ok(())
        }

        async fn batch_complete_stage(&self, _file_ids: &[i64], _task_name: DomainTaskName) -> Result<(), CoreError> {
            Ok(())
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("musiclib-importer-test-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn registers_files_matching_the_extension_allow_list() {
        let dir = scratch_dir("matching");
        std::fs::write(dir.join("track.flac"), b"fake").unwrap();
        std::fs::write(dir.join("notes.txt"), b"fake").unwrap();

        let files: Arc<dyn FileRepository> = Arc::new(InMemoryFileRepository::new());
        let mut importer = Importer::new(
            dir.clone(),
            vec!["flac".to_string()],
            false,
            files.clone(),
            Arc::new(NoopStageTracker),
        );

        importer.run().await.unwrap();

        let all = files.find_where(FileFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, dir.join("track.flac"));
        assert!(dir.join("notes.txt").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn clean_removes_non_matching_files() {
        let dir = scratch_dir("clean");
        std::fs::write(dir.join("notes.txt"), b"fake").unwrap();

        let files: Arc<dyn FileRepository> = Arc::new(InMemoryFileRepository::new());
        let mut importer = Importer::new(
            dir.clone(),
            vec!["flac".to_string()],
            true,
            files,
            Arc::new(NoopStageTracker),
        );

        importer.run().await.unwrap();

        assert!(!dir.join("notes.txt").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
