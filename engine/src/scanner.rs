// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scanner
//!
//! The canonical processor (§4.6): compares what exists on disk and in the
//! database against what the pipeline still has to do, and emits tasks to
//! close the gap. Runs five steps per tick: empty-directory pruning, import
//! detection, a stage scan (bucketing files that need a task by that task's
//! `task_type`), emission (chunked by `scanner_batch_size`), and an artwork
//! scan. `Scanner` is `exclusive = true, heavy_io = true`, so `ProcessorLoop`
//! never runs two ticks of it concurrently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use musiclib_domain::{
    ArtRepository, ArtType, Batch, CoreError, EmittedTask, FileFilter, FileRepository, PluginMeta,
    PluginVersion, Processor, ProcessorDescriptor, TaskName, TaskType,
};

use crate::registry::Registry;

/// A filesystem entry discovered under the import directory, along with
/// whether it's a directory (used both for pruning and for import
/// detection, so the tree is only walked once per tick).
pub(crate) struct Entry {
    pub(crate) path: PathBuf,
    pub(crate) is_dir: bool,
}

/// §6.3: a symlink is only followed if its target resolves inside the
/// import tree; symlinks pointing outside are ignored entirely (neither
/// walked nor reported as an entry).
async fn symlink_target_is_contained(path: &Path, root: &Path) -> bool {
    let Ok(target) = tokio::fs::canonicalize(path).await else { return false };
    let Ok(root) = tokio::fs::canonicalize(root).await else { return false };
    target.starts_with(root)
}

pub(crate) async fn list_all_entries(root: &Path) -> Result<Vec<Entry>, CoreError> {
    let mut results = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_symlink() && !symlink_target_is_contained(&path, root).await {
                continue;
            }
            let is_dir = if file_type.is_symlink() {
                tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false)
            } else {
                file_type.is_dir()
            };
            if is_dir {
                stack.push(path.clone());
            }
            results.push(Entry { path, is_dir });
        }
    }
    Ok(results)
}

pub struct Scanner {
    import_dir: PathBuf,
    files: Arc<dyn FileRepository>,
    art: Arc<dyn ArtRepository>,
    registry: Arc<Registry>,
    scanner_batch_size: usize,
    descriptor: ProcessorDescriptor,
    emitted: Vec<EmittedTask>,
}

impl Scanner {
    pub fn new(
        import_dir: PathBuf,
        files: Arc<dyn FileRepository>,
        art: Arc<dyn ArtRepository>,
        registry: Arc<Registry>,
        scanner_batch_size: usize,
    ) -> Self {
        let descriptor = ProcessorDescriptor {
            meta: PluginMeta {
                name: TaskName::parse("scanner").expect("\"scanner\" is a valid task name"),
                description: "Compares disk and database state against what the pipeline \
                    requires and emits tasks to close the gap."
                    .to_string(),
                version: PluginVersion::parse("1.0.0").expect("\"1.0.0\" is a valid version"),
                depends: vec![],
                exclusive: true,
                heavy_io: true,
                cooldown_seconds: 0.0,
            },
            task_type: TaskType::Custom("SCANNER".to_string()),
        };
        Self { import_dir, files, art, registry, scanner_batch_size, descriptor, emitted: Vec::new() }
    }

    /// Walk bottom-up, attempting to remove each empty directory. Failures
    /// (non-empty, permission denied, already gone) are ignored per §4.6
    /// step 1 — pruning is opportunistic, not authoritative.
    async fn prune_empty_directories(&self, entries: &[Entry]) {
        let mut dirs: Vec<&PathBuf> = entries.iter().filter(|e| e.is_dir).map(|e| &e.path).collect();
        dirs.sort_by_key(|path| std::cmp::Reverse(path.components().count()));
        for dir in dirs {
            let _ = tokio::fs::remove_dir(dir).await;
        }
    }

    /// §4.6 step 3-4: bucket files needing a task for their next stage by
    /// that task's `task_type`, then emit one task per `scanner_batch_size`
    /// chunk of each non-empty bucket.
    async fn stage_scan(&mut self) -> Result<(), CoreError> {
        let files = self.files.find_where(FileFilter::default()).await?;
        let mut buckets: HashMap<TaskType, Vec<i64>> = HashMap::new();

        for file in files {
            if file.is_terminal() {
                continue;
            }
            let Some(next) = file.stage.next_stage() else { continue };
            for task_name in self.registry.tasks_for_stage(next) {
                if file.completed_tasks.contains(&task_name) {
                    continue;
                }
                let Some(descriptor) = self.registry.task_descriptor(&task_name) else { continue };
                buckets.entry(descriptor.task_type.clone()).or_default().push(file.id);
            }
        }

        for (task_type, ids) in buckets {
            if ids.is_empty() {
                continue;
            }
            for chunk in Batch::FileIds(ids).chunked(self.scanner_batch_size) {
                self.emitted.push(EmittedTask::new(task_type.clone(), chunk));
            }
        }
        Ok(())
    }

    /// §4.6 step 5: albums/persons/labels missing artwork, aggregated by
    /// `ArtRepository::missing_art`, emitted as a single `ART_GETTER` task.
    async fn artwork_scan(&mut self) -> Result<(), CoreError> {
        let missing = self.art.missing_art().await?;
        if missing.is_empty() {
            return Ok(());
        }
        let map: HashMap<String, ArtType> = missing.into_iter().collect();
        self.emitted.push(EmittedTask::new(TaskType::ArtGetter, Batch::ArtMap(map)));
        Ok(())
    }
}

#[async_trait]
impl Processor for Scanner {
    fn descriptor(&self) -> &ProcessorDescriptor {
        &self.descriptor
    }

    async fn run(&mut self) -> Result<(), CoreError> {
        self.emitted.clear();

        let entries = list_all_entries(&self.import_dir).await.unwrap_or_default();
        self.prune_empty_directories(&entries).await;
        if entries.iter().any(|e| !e.is_dir) {
            self.emitted.push(EmittedTask::new(TaskType::Importer, Batch::Empty));
        }

        self.stage_scan().await?;
        self.artwork_scan().await?;
        Ok(())
    }

    fn collect_emitted(&mut self) -> Vec<EmittedTask> {
        std::mem::take(&mut self.emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musiclib_domain::{FileRecord, Stage, TaskDescriptor};
    use std::collections::BTreeSet;

    struct StubFileRepository {
        files: Vec<FileRecord>,
    }

    #[async_trait]
    impl FileRepository for StubFileRepository {
        async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, CoreError> {
            Ok(self.files.iter().find(|f| f.id == id).cloned())
        }

        async fn find_where(&self, _filter: FileFilter) -> Result<Vec<FileRecord>, CoreError> {
            Ok(self.files.clone())
        }

        async fn insert(&self, _file: &FileRecord) -> Result<i64, CoreError> {
            unimplemented!("not exercised by these tests")
        }

        async fn update(&self, _file: &FileRecord) -> Result<(), CoreError> {
            unimplemented!("not exercised by these tests")
        }

        async fn delete(&self, _id: i64) -> Result<(), CoreError> {
            unimplemented!("not exercised by these tests")
        }
    }

    struct StubArtRepository {
        missing: Vec<(String, ArtType)>,
    }

    #[async_trait]
    impl ArtRepository for StubArtRepository {
        async fn missing_art(&self) -> Result<Vec<(String, ArtType)>, CoreError> {
            Ok(self.missing.clone())
        }
    }

    fn scratch_import_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("musiclib-scanner-test-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn registry_with_parser() -> Arc<Registry> {
        let mut registry = Registry::new();
        registry
            .register_task(
                TaskDescriptor {
                    meta: PluginMeta {
                        name: TaskName::parse("parser").unwrap(),
                        description: "test".to_string(),
                        version: PluginVersion::parse("1.0.0").unwrap(),
                        depends: vec![],
                        exclusive: false,
                        heavy_io: false,
                        cooldown_seconds: 0.0,
                    },
                    task_type: TaskType::Parser,
                    stage_type: Stage::Import,
                },
                Arc::new(|_deps, _batch, _kwargs| {
                    Box::pin(async move { Err(CoreError::internal("unused in this test")) })
                }),
            )
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn emits_importer_task_when_import_directory_has_a_file() {
        let dir = scratch_import_dir("importer");
        std::fs::write(dir.join("track.flac"), b"fake").unwrap();

        let files: Arc<dyn FileRepository> = Arc::new(StubFileRepository { files: vec![] });
        let art: Arc<dyn ArtRepository> = Arc::new(StubArtRepository { missing: vec![] });
        let mut scanner = Scanner::new(dir.clone(), files, art, registry_with_parser(), 1000);

        scanner.run().await.unwrap();
        let emitted = scanner.collect_emitted();

        assert!(emitted.iter().any(|t| t.task_type == TaskType::Importer && t.batch == Batch::Empty));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn prunes_empty_subdirectories_but_keeps_the_import_root() {
        let dir = scratch_import_dir("prune");
        std::fs::create_dir_all(dir.join("empty/nested")).unwrap();

        let files: Arc<dyn FileRepository> = Arc::new(StubFileRepository { files: vec![] });
        let art: Arc<dyn ArtRepository> = Arc::new(StubArtRepository { missing: vec![] });
        let mut scanner = Scanner::new(dir.clone(), files, art, registry_with_parser(), 1000);

        scanner.run().await.unwrap();

        assert!(dir.exists());
        assert!(!dir.join("empty").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn buckets_files_needing_their_next_stage_task_by_task_type() {
        let dir = scratch_import_dir("stage-scan");

        let mut file = FileRecord::new(1, PathBuf::from("/music/import/a.flac"));
        file.stage = Stage::Preimport;
        let files: Arc<dyn FileRepository> = Arc::new(StubFileRepository { files: vec![file] });
        let art: Arc<dyn ArtRepository> = Arc::new(StubArtRepository { missing: vec![] });
        let mut scanner = Scanner::new(dir.clone(), files, art, registry_with_parser(), 1000);

        scanner.run().await.unwrap();
        let emitted = scanner.collect_emitted();

        let parser_batches: Vec<_> =
            emitted.iter().filter(|t| t.task_type == TaskType::Parser).collect();
        assert_eq!(parser_batches.len(), 1);
        assert_eq!(parser_batches[0].batch, Batch::FileIds(vec![1]));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn skips_files_that_already_completed_the_next_stage_task() {
        let dir = scratch_import_dir("already-done");

        let mut file = FileRecord::new(1, PathBuf::from("/music/import/a.flac"));
        file.stage = Stage::Preimport;
        file.completed_tasks = BTreeSet::from([TaskName::parse("parser").unwrap()]);
        let files: Arc<dyn FileRepository> = Arc::new(StubFileRepository { files: vec![file] });
        let art: Arc<dyn ArtRepository> = Arc::new(StubArtRepository { missing: vec![] });
        let mut scanner = Scanner::new(dir.clone(), files, art, registry_with_parser(), 1000);

        scanner.run().await.unwrap();
        let emitted = scanner.collect_emitted();

        assert!(!emitted.iter().any(|t| t.task_type == TaskType::Parser));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn emits_one_art_getter_task_for_non_empty_missing_art() {
        let dir = scratch_import_dir("art-scan");

        let files: Arc<dyn FileRepository> = Arc::new(StubFileRepository { files: vec![] });
        let art: Arc<dyn ArtRepository> = Arc::new(StubArtRepository {
            missing: vec![("mbid-1".to_string(), ArtType::Album), ("mbid-2".to_string(), ArtType::Artist)],
        });
        let mut scanner = Scanner::new(dir.clone(), files, art, registry_with_parser(), 1000);

        scanner.run().await.unwrap();
        let emitted = scanner.collect_emitted();

        let art_getters: Vec<_> = emitted.iter().filter(|t| t.task_type == TaskType::ArtGetter).collect();
        assert_eq!(art_getters.len(), 1);
        match &art_getters[0].batch {
            Batch::ArtMap(map) => assert_eq!(map.len(), 2),
            other => panic!("expected an ArtMap batch, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn list_all_entries_ignores_symlinks_pointing_outside_the_import_tree() {
        let dir = scratch_import_dir("symlink-outside");
        let outside = scratch_import_dir("symlink-outside-target");
        std::fs::write(outside.join("secret.flac"), b"fake").unwrap();
        std::fs::write(dir.join("inside.flac"), b"fake").unwrap();

        #[cfg(unix)]
        std::os::unix::fs::symlink(outside.join("secret.flac"), dir.join("escape.flac")).unwrap();

        let entries = list_all_entries(&dir).await.unwrap();

        assert!(entries.iter().any(|e| e.path == dir.join("inside.flac")));
        assert!(!entries.iter().any(|e| e.path == dir.join("escape.flac")));

        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::remove_dir_all(&outside);
    }

    #[tokio::test]
    async fn list_all_entries_follows_symlinks_that_point_within_the_import_tree() {
        let dir = scratch_import_dir("symlink-inside");
        std::fs::create_dir_all(dir.join("real")).unwrap();
        std::fs::write(dir.join("real/track.flac"), b"fake").unwrap();

        #[cfg(unix)]
        std::os::unix::fs::symlink(dir.join("real/track.flac"), dir.join("link.flac")).unwrap();

        let entries = list_all_entries(&dir).await.unwrap();

        assert!(entries.iter().any(|e| e.path == dir.join("link.flac")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn collect_emitted_drains_and_a_second_call_is_empty() {
        let dir = scratch_import_dir("drain");
        std::fs::write(dir.join("track.flac"), b"fake").unwrap();

        let files: Arc<dyn FileRepository> = Arc::new(StubFileRepository { files: vec![] });
        let art: Arc<dyn ArtRepository> = Arc::new(StubArtRepository { missing: vec![] });
        let mut scanner = Scanner::new(dir.clone(), files, art, registry_with_parser(), 1000);

        scanner.run().await.unwrap();
        assert!(!scanner.collect_emitted().is_empty());
        assert!(scanner.collect_emitted().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
