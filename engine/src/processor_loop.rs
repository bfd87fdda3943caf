// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processor Loop
//!
//! Runs every registered processor in its own long-lived worker (§4.5). A
//! worker repeatedly tries to acquire the processor's concurrency slot; on
//! a skip (cooldown/load) it backs off and retries, on success it runs the
//! processor once, drains whatever tasks it emitted, and hands each one to
//! the [`TaskManager`] before sleeping a small delta and looping again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use musiclib_bootstrap::shutdown::CancellationToken;
use musiclib_domain::{CoreError, EmittedTask, TaskName};

use crate::concurrency::{ConcurrencyController, InvocationSpec};
use crate::registry::Registry;
use crate::task_manager::TaskManager;

/// Retry delay after a skipped acquire, per §4.5 step 2.
const SKIP_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Delay between successful runs of the same processor, per §4.5 step 5.
const RUN_DELAY: Duration = Duration::from_millis(50);

pub struct ProcessorLoop {
    registry: Arc<Registry>,
    concurrency: Arc<ConcurrencyController>,
    task_manager: Arc<TaskManager>,
    shutdown: CancellationToken,
}

impl ProcessorLoop {
    pub fn new(
        registry: Arc<Registry>,
        concurrency: Arc<ConcurrencyController>,
        task_manager: Arc<TaskManager>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { registry, concurrency, task_manager, shutdown }
    }

    /// Spawns one worker per registered processor and waits for all of
    /// them to exit (which happens once `shutdown` is cancelled).
    pub async fn run(self: Arc<Self>) {
        let names = self.registry.processor_names();
        let mut workers = Vec::with_capacity(names.len());
        for name in names {
            let this = self.clone();
            workers.push(tokio::spawn(async move { this.worker(name).await }));
        }
        for worker in workers {
            let _ = worker.await;
        }
    }

    async fn worker(&self, name: TaskName) {
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }

            let Some(descriptor) = self.registry.processor_descriptor(&name).cloned() else {
                tracing::error!(processor = %name, "processor vanished from registry mid-run");
                return;
            };

            let spec = InvocationSpec {
                name: name.clone(),
                exclusive: descriptor.meta.exclusive,
                heavy_io: descriptor.meta.heavy_io,
                task_type: Some(descriptor.task_type.clone()),
                cooldown_seconds: descriptor.meta.cooldown_seconds,
            };

            let registry = self.registry.clone();
            let body_name = name.clone();
            let outcome = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                outcome = self.concurrency.run(spec, move || async move {
                    Self::run_once(&registry, &body_name).await
                }) => outcome,
            };

            match outcome {
                Ok(Some(emitted)) => {
                    self.dispatch_all(emitted).await;
                    tokio::time::sleep(RUN_DELAY).await;
                }
                Ok(None) => tokio::time::sleep(SKIP_RETRY_DELAY).await,
                Err(error) => {
                    tracing::error!(processor = %name, %error, "processor invocation failed");
                    tokio::time::sleep(SKIP_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn run_once(registry: &Arc<Registry>, name: &TaskName) -> Result<Vec<EmittedTask>, CoreError> {
        let mut processor = registry.create_processor(name, HashMap::new()).await?;
        match processor.run().await {
            Ok(()) => Ok(processor.collect_emitted()),
            Err(error) => {
                tracing::error!(processor = %name, %error, "processor run failed");
                Ok(Vec::new())
            }
        }
    }

    async fn dispatch_all(&self, emitted: Vec<EmittedTask>) {
        for task in emitted {
            if let Err(error) = self.task_manager.dispatch_emitted(task).await {
                tracing::error!(%error, "failed to schedule emitted task");
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
    use musiclib_domain::{
        AudioUtility, Batch, PluginMeta, PluginVersion, ProcessorDescriptor, Task, TaskDescriptor, TaskType,
    };
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

    struct EmitOnceProcessor {
        descriptor: ProcessorDescriptor,
        emitted_once: bool,
    }

    #[async_trait]
    impl musiclib_domain::Processor for EmitOnceProcessor {
        fn descriptor(&self) -> &ProcessorDescriptor {
            &self.descriptor
        }

        async fn run(&mut self) -> Result<(), CoreError> {
            Ok(())
        }

        fn collect_emitted(&mut self) -> Vec<EmittedTask> {
            if self.emitted_once {
                return Vec::new();
            }
            self.emitted_once = true;
            vec![EmittedTask::new(TaskType::Importer, Batch::Empty)]
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

    fn meta(name: &str) -> PluginMeta {
        PluginMeta {
            name: TaskName::parse(name).unwrap(),
            description: "test".to_string(),
            version: PluginVersion::parse("1.0.0").unwrap(),
            depends: vec![],
            exclusive: false,
            heavy_io: false,
            cooldown_seconds: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn worker_dispatches_emitted_tasks_to_task_manager() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();

        registry
            .register_processor(
                ProcessorDescriptor { meta: meta("scanner"), task_type: TaskType::Custom("SCANNER".to_string()) },
                Arc::new(|_deps: Vec<Arc<dyn AudioUtility>>, _config: HashMap<String, String>| {
                    Box::pin(async move {
                        Ok(Box::new(EmitOnceProcessor {
                            descriptor: ProcessorDescriptor {
                                meta: meta("scanner"),
                                task_type: TaskType::Custom("SCANNER".to_string()),
                            },
                            emitted_once: false,
                        }) as Box<dyn musiclib_domain::Processor>)
                    })
                }),
            )
            .unwrap();

        let task_descriptor = TaskDescriptor { meta: meta("importer"), task_type: TaskType::Importer, stage_type: musiclib_domain::Stage::Import };
        let ran_for_factory = ran.clone();
        registry
            .register_task(
                task_descriptor.clone(),
                Arc::new(move |_deps: Vec<Arc<dyn AudioUtility>>, _batch: Batch, _kwargs: HashMap<String, String>| {
                    let descriptor = task_descriptor.clone();
                    let ran = ran_for_factory.clone();
                    Box::pin(async move { Ok(Box::new(CountingTask { descriptor, ran }) as Box<dyn Task>) })
                }),
            )
            .unwrap();

        let registry = Arc::new(registry);
        let concurrency = Arc::new(ConcurrencyController::new(
            ConcurrencyConfig::from_cpu_count(4),
            Arc::new(AlwaysIdlePlatform),
        ));
        let shutdown_coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
        let task_manager = Arc::new(TaskManager::new(registry.clone(), concurrency.clone(), shutdown_coordinator.token()));
        let processor_loop =
            Arc::new(ProcessorLoop::new(registry, concurrency, task_manager, shutdown_coordinator.token()));

        let handle = tokio::spawn(processor_loop.clone().run());

        tokio::time::sleep(RUN_DELAY * 3).await;
        shutdown_coordinator.initiate_shutdown();
        let _ = handle.await;

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
