// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Task Manager
//!
//! Runs tasks and processors under the [`ConcurrencyController`], either
//! ad-hoc (a single named task), stage-driven (`run_stage`/`run_pipeline`,
//! for the `run --stage=<name>|--all` CLI command), or in response to an
//! emission handed over from a [`crate::processor_loop::ProcessorLoop`]
//! worker. Task bodies are solely responsible for advancing their own files'
//! stage through the `StageTracker` handle they were constructed with —
//! this type only decides whether and when a task gets to run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use musiclib_bootstrap::shutdown::CancellationToken;
use musiclib_domain::{Batch, CoreError, EmittedTask, Processor, Stage, Task, TaskName};
use tokio::sync::Mutex;

use crate::concurrency::{ConcurrencyController, InvocationSpec};
use crate::registry::Registry;

/// Default interval the idle loop waits with no task running before
/// invoking the `idle_runner` processor, per §4.4.
pub const DEFAULT_IDLE_INTERVAL_SECS: u64 = 300;

/// The processor name `start_idle_loop` invokes once `idle_interval` has
/// elapsed with no task running. Registering a processor under this name
/// is optional; the loop is a no-op if nothing is registered.
pub const IDLE_RUNNER_NAME: &str = "idle_runner";

pub struct TaskManager {
    registry: Arc<Registry>,
    concurrency: Arc<ConcurrencyController>,
    shutdown: CancellationToken,
    idle_interval: Duration,
    last_task_activity: Mutex<Instant>,
}

impl TaskManager {
    pub fn new(registry: Arc<Registry>, concurrency: Arc<ConcurrencyController>, shutdown: CancellationToken) -> Self {
        Self {
            registry,
            concurrency,
            shutdown,
            idle_interval: Duration::from_secs(DEFAULT_IDLE_INTERVAL_SECS),
            last_task_activity: Mutex::new(Instant::now()),
        }
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Instantiates and runs the named task under the concurrency
    /// controller. Returns `Ok(None)` if the controller skipped the
    /// invocation (cooldown or load); a task-body error is logged and
    /// folded into the returned instance rather than propagated, so a
    /// caller only ever sees `Err` for lookup/construction failures.
    pub async fn run_task(
        &self,
        name: &TaskName,
        batch: Batch,
        kwargs: HashMap<String, String>,
    ) -> Result<Option<Box<dyn Task>>, CoreError> {
        *self.last_task_activity.lock().await = Instant::now();

        let descriptor = self
            .registry
            .task_descriptor(name)
            .ok_or_else(|| CoreError::PluginNotFound(name.to_string()))?
            .clone();

        let spec = InvocationSpec {
            name: name.clone(),
            exclusive: descriptor.meta.exclusive,
            heavy_io: descriptor.meta.heavy_io,
            task_type: Some(descriptor.task_type.clone()),
            cooldown_seconds: descriptor.meta.cooldown_seconds,
        };

        let registry = self.registry.clone();
        let body_name = name.clone();
        self.concurrency
            .run(spec, move || async move {
                let mut task = registry.create_task(&body_name, batch, kwargs).await?;
                if let Err(error) = task.run().await {
                    tracing::error!(task = %body_name, %error, "task body failed");
                }
                Ok(task)
            })
            .await
    }

    /// Runs every task registered for `stage`, sequentially, in
    /// registration order. Each task manages its own batch internally
    /// (sourced from emissions), so tasks run here are scheduled with
    /// [`Batch::Empty`].
    pub async fn run_stage(&self, stage: Stage) {
        for name in self.registry.tasks_for_stage(stage) {
            if self.shutdown.is_cancelled() {
                return;
            }
            if let Err(error) = self.run_task(&name, Batch::Empty, HashMap::new()).await {
                tracing::error!(task = %name, %error, "failed to run task for stage");
            }
        }
    }

    /// Runs `run_stage` for each stage in order, short-circuiting as soon
    /// as shutdown is signaled.
    pub async fn run_pipeline(&self, stages: &[Stage]) {
        for &stage in stages {
            if self.shutdown.is_cancelled() {
                return;
            }
            self.run_stage(stage).await;
        }
    }

    /// Instantiates and runs the named processor once. Never advances any
    /// file's stage; only task bodies do that.
    pub async fn run_processor(
        &self,
        name: &TaskName,
        config: HashMap<String, String>,
    ) -> Result<Option<Box<dyn Processor>>, CoreError> {
        let descriptor = self
            .registry
            .processor_descriptor(name)
            .ok_or_else(|| CoreError::PluginNotFound(name.to_string()))?
            .clone();

        let spec = InvocationSpec {
            name: name.clone(),
            exclusive: descriptor.meta.exclusive,
            heavy_io: descriptor.meta.heavy_io,
            task_type: Some(descriptor.task_type.clone()),
            cooldown_seconds: descriptor.meta.cooldown_seconds,
        };

        let registry = self.registry.clone();
        let body_name = name.clone();
        self.concurrency
            .run(spec, move || async move {
                let mut processor = registry.create_processor(&body_name, config).await?;
                if let Err(error) = processor.run().await {
                    tracing::error!(processor = %body_name, %error, "processor run failed");
                }
                Ok(processor)
            })
            .await
    }

    /// Runs every registered processor once, sequentially.
    pub async fn run_all_processors(&self) {
        for name in self.registry.processor_names() {
            if self.shutdown.is_cancelled() {
                return;
            }
            if let Err(error) = self.run_processor(&name, HashMap::new()).await {
                tracing::error!(processor = %name, %error, "failed to run processor");
            }
        }
    }

    /// Resolves an emission (carrying a `TaskType`, not a `TaskName`) back
    /// to its registered task and runs it. Used by `ProcessorLoop` after
    /// draining a processor's `collect_emitted()`.
    pub async fn dispatch_emitted(&self, emitted: EmittedTask) -> Result<Option<Box<dyn Task>>, CoreError> {
        let name = self
            .registry
            .task_name_for_type(&emitted.task_type)
            .ok_or_else(|| CoreError::PluginNotFound(emitted.task_type.to_string()))?;
        self.run_task(&name, emitted.batch, emitted.kwargs).await
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    /// Background loop, per §4.4: while no task has run for `idle_interval`,
    /// invoke the `idle_runner` processor if one is registered. Runs until
    /// shutdown is signaled; intended to be spawned alongside the `serve`
    /// command's `ProcessorLoop`.
    pub async fn start_idle_loop(self: Arc<Self>) {
        let idle_runner = match TaskName::parse(IDLE_RUNNER_NAME) {
            Ok(name) => name,
            Err(error) => {
                tracing::error!(%error, "idle runner name failed to parse");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.idle_interval) => {}
                _ = self.shutdown.cancelled() => return,
            }

            let elapsed = self.last_task_activity.lock().await.elapsed();
            if elapsed < self.idle_interval {
                continue;
            }
            if self.registry.processor_descriptor(&idle_runner).is_none() {
                continue;
            }
            if let Err(error) = self.run_processor(&idle_runner, HashMap::new()).await {
                tracing::warn!(%error, "idle runner processor failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use musiclib_bootstrap::platform::{Platform, PlatformError};
    use musiclib_bootstrap::shutdown::ShutdownCoordinator;
    use musiclib_domain::{AudioUtility, PluginMeta, PluginVersion, ProcessorDescriptor, TaskDescriptor, TaskType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::concurrency::ConcurrencyConfig;

    struct AlwaysIdlePlatform;

    #[async_trait]
    impl Platform for AlwaysIdlePlatform {
        fn page_size(&self) -> usize {
            4096
        }
        fn cpu_count(&self) -> usize {
            4
        }
        fn total_memory(&self) -> Result<u64, PlatformError> {
            Ok(0)
        }
        fn available_memory(&self) -> Result<u64, PlatformError> {
            Ok(0)
        }
        fn line_separator(&self) -> &'static str {
            "\n"
        }
        fn path_separator(&self) -> char {
            ':'
        }
        fn platform_name(&self) -> &'static str {
            "test"
        }
        fn temp_dir(&self) -> std::path::PathBuf {
            std::path::PathBuf::from("/tmp")
        }
        fn is_elevated(&self) -> bool {
            false
        }
        fn set_permissions(&self, _path: &std::path::Path, _mode: u32) -> Result<(), PlatformError> {
            Ok(())
        }
        fn is_executable(&self, _path: &std::path::Path) -> bool {
            false
        }
        async fn sync_file(&self, _file: &tokio::fs::File) -> Result<(), PlatformError> {
            Ok(())
        }
        fn load_average_1m(&self) -> Result<f64, PlatformError> {
            Ok(0.0)
        }
    }

    struct CountingTask {
        descriptor: TaskDescriptor,
        ran: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Task for CountingTask {
        fn descriptor(&self) -> &TaskDescriptor {
            &self.descriptor
        }

        async fn run(&mut self) -> Result<(), CoreError> {
            self.ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn task_meta(name: &str) -> PluginMeta {
        PluginMeta {
            name: TaskName::parse(name).unwrap(),
            description: "test task".to_string(),
            version: PluginVersion::parse("1.0.0").unwrap(),
            depends: vec![],
            exclusive: false,
            heavy_io: false,
            cooldown_seconds: 0.0,
        }
    }

    fn manager_with_counting_task(task_type: TaskType, stage: Stage) -> (Arc<TaskManager>, Arc<AtomicUsize>) {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        let descriptor = TaskDescriptor { meta: task_meta("importer"), task_type, stage_type: stage };
        let factory_descriptor = descriptor.clone();
        let ran_for_factory = ran.clone();
        registry
            .register_task(
                descriptor,
                Arc::new(move |_deps: Vec<Arc<dyn AudioUtility>>, _batch: Batch, _kwargs: HashMap<String, String>| {
                    let descriptor = factory_descriptor.clone();
                    let ran = ran_for_factory.clone();
                    Box::pin(async move {
                        Ok(Box::new(CountingTask { descriptor, ran }) as Box<dyn Task>)
                    })
                }),
            )
            .unwrap();

        let concurrency = Arc::new(ConcurrencyController::new(
            ConcurrencyConfig::from_cpu_count(4),
            Arc::new(AlwaysIdlePlatform),
        ));
        let shutdown = ShutdownCoordinator::new(Duration::from_secs(30));
        let manager = Arc::new(TaskManager::new(Arc::new(registry), concurrency, shutdown.token()));
        (manager, ran)
    }

    #[tokio::test]
    async fn run_task_executes_registered_task() {
        let (manager, ran) = manager_with_counting_task(TaskType::Importer, Stage::Import);
        let name = TaskName::parse("importer").unwrap();

        let result = manager.run_task(&name, Batch::Empty, HashMap::new()).await.unwrap();
        assert!(result.is_some());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_task_reports_not_found_for_unknown_name() {
        let (manager, _ran) = manager_with_counting_task(TaskType::Importer, Stage::Import);
        let name = TaskName::parse("nonexistent").unwrap();

        let result = manager.run_task(&name, Batch::Empty, HashMap::new()).await;
        assert!(matches!(result, Err(CoreError::PluginNotFound(_))));
    }

    #[tokio::test]
    async fn run_stage_runs_every_task_registered_for_that_stage() {
        let (manager, ran) = manager_with_counting_task(TaskType::Importer, Stage::Import);
        manager.run_stage(Stage::Import).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_emitted_resolves_task_type_to_name() {
        let (manager, ran) = manager_with_counting_task(TaskType::Importer, Stage::Import);
        let emitted = EmittedTask::new(TaskType::Importer, Batch::Empty);

        manager.dispatch_emitted(emitted).await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_pipeline_short_circuits_once_shutdown_is_signaled() {
        let (manager, ran) = manager_with_counting_task(TaskType::Importer, Stage::Import);
        manager.shutdown_token().cancel();

        manager.run_pipeline(&[Stage::Import]).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    struct CountingProcessor {
        descriptor: ProcessorDescriptor,
        ran: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Processor for CountingProcessor {
        fn descriptor(&self) -> &ProcessorDescriptor {
            &self.descriptor
        }

        async fn run(&mut self) -> Result<(), CoreError> {
            self.ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn collect_emitted(&mut self) -> Vec<EmittedTask> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn start_idle_loop_invokes_the_idle_runner_processor_once_idle() {
        let mut registry = Registry::new();
        let idle_ran = Arc::new(AtomicUsize::new(0));
        let descriptor = ProcessorDescriptor { meta: task_meta(IDLE_RUNNER_NAME), task_type: TaskType::Custom("IDLE".to_string()) };
        let factory_descriptor = descriptor.clone();
        let ran_for_factory = idle_ran.clone();
        registry
            .register_processor(
                descriptor,
                Arc::new(move |_deps, _config: HashMap<String, String>| {
                    let descriptor = factory_descriptor.clone();
                    let ran = ran_for_factory.clone();
                    Box::pin(async move { Ok(Box::new(CountingProcessor { descriptor, ran }) as Box<dyn Processor>) })
                }),
            )
            .unwrap();

        let concurrency = Arc::new(ConcurrencyController::new(
            ConcurrencyConfig::from_cpu_count(4),
            Arc::new(AlwaysIdlePlatform),
        ));
        let shutdown = ShutdownCoordinator::new(Duration::from_secs(30));
        let manager = Arc::new(
            TaskManager::new(Arc::new(registry), concurrency, shutdown.token())
                .with_idle_interval(Duration::from_millis(10)),
        );

        let loop_handle = tokio::spawn(manager.clone().start_idle_loop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.shutdown_token().cancel();
        loop_handle.await.unwrap();

        assert!(idle_ran.load(Ordering::SeqCst) >= 1);
    }
}
