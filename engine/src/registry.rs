// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Registry
//!
//! Process-wide catalog of the three plugin kinds (§4.1). Plugins register
//! themselves at startup via [`Registry::register_task`],
//! [`Registry::register_processor`] and [`Registry::register_audioutil`];
//! the registry then produces fully-wired instances on demand.
//!
//! Name/description/version validity (§4.1's validation rules) is enforced
//! at the value-object boundary (`TaskName::parse`, `PluginVersion::parse`)
//! rather than re-checked here — a `TaskDescriptor` simply cannot be built
//! with an invalid name or version. What the registry itself still must
//! reject is a *duplicate* registration, which is a catalog-level concern,
//! not a value-level one.
//!
//! Stage indexing (the old `register_stage` operation) falls out for free:
//! `Stage` is a closed Rust enum rather than a runtime-registered class, so
//! `register_task` buckets each task under its declared `stage_type` as it
//! registers.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use musiclib_domain::{
    AudioUtilDescriptor, AudioUtility, Batch, CoreError, Processor, ProcessorDescriptor, Stage,
    Task, TaskDescriptor, TaskName,
};
use tokio::sync::{Mutex, OnceCell};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type AudioUtilFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn AudioUtility>, CoreError>> + Send + Sync>;

pub type TaskFactory = Arc<
    dyn Fn(Vec<Arc<dyn AudioUtility>>, Batch, HashMap<String, String>) -> BoxFuture<'static, Result<Box<dyn Task>, CoreError>>
        + Send
        + Sync,
>;

pub type ProcessorFactory = Arc<
    dyn Fn(Vec<Arc<dyn AudioUtility>>, HashMap<String, String>) -> BoxFuture<'static, Result<Box<dyn Processor>, CoreError>>
        + Send
        + Sync,
>;

struct AudioUtilRegistration {
    descriptor: AudioUtilDescriptor,
    factory: AudioUtilFactory,
}

struct TaskRegistration {
    descriptor: TaskDescriptor,
    factory: TaskFactory,
}

struct ProcessorRegistration {
    descriptor: ProcessorDescriptor,
    factory: ProcessorFactory,
}

#[derive(Default)]
pub struct Registry {
    audio_utils: HashMap<TaskName, AudioUtilRegistration>,
    tasks: HashMap<TaskName, TaskRegistration>,
    processors: HashMap<TaskName, ProcessorRegistration>,
    stage_tasks: HashMap<Stage, Vec<TaskName>>,
    audio_util_cells: Mutex<HashMap<TaskName, Arc<OnceCell<Arc<dyn AudioUtility>>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_audioutil(
        &mut self,
        descriptor: AudioUtilDescriptor,
        factory: AudioUtilFactory,
    ) -> Result<(), CoreError> {
        if self.audio_utils.contains_key(&descriptor.name) {
            return Err(CoreError::DuplicatePlugin(descriptor.name.to_string()));
        }
        self.audio_utils.insert(
            descriptor.name.clone(),
            AudioUtilRegistration { descriptor, factory },
        );
        Ok(())
    }

    pub fn register_task(
        &mut self,
        descriptor: TaskDescriptor,
        factory: TaskFactory,
    ) -> Result<(), CoreError> {
        if self.tasks.contains_key(&descriptor.meta.name) {
            return Err(CoreError::DuplicatePlugin(descriptor.meta.name.to_string()));
        }
        let name = descriptor.meta.name.clone();
        let stage = descriptor.stage_type;
        self.stage_tasks.entry(stage).or_default().push(name.clone());
        self.tasks.insert(name, TaskRegistration { descriptor, factory });
        Ok(())
    }

    pub fn register_processor(
        &mut self,
        descriptor: ProcessorDescriptor,
        factory: ProcessorFactory,
    ) -> Result<(), CoreError> {
        if self.processors.contains_key(&descriptor.meta.name) {
            return Err(CoreError::DuplicatePlugin(descriptor.meta.name.to_string()));
        }
        self.processors.insert(
            descriptor.meta.name.clone(),
            ProcessorRegistration { descriptor, factory },
        );
        Ok(())
    }

    /// Task names registered for `stage`, in registration order.
    pub fn tasks_for_stage(&self, stage: Stage) -> Vec<TaskName> {
        self.stage_tasks.get(&stage).cloned().unwrap_or_default()
    }

    pub fn task_descriptor(&self, name: &TaskName) -> Option<&TaskDescriptor> {
        self.tasks.get(name).map(|r| &r.descriptor)
    }

    pub fn processor_descriptor(&self, name: &TaskName) -> Option<&ProcessorDescriptor> {
        self.processors.get(name).map(|r| &r.descriptor)
    }

    pub fn processor_names(&self) -> Vec<TaskName> {
        self.processors.keys().cloned().collect()
    }

    pub fn task_names(&self) -> Vec<TaskName> {
        self.tasks.keys().cloned().collect()
    }

    /// Finds the task registered under `task_type`, used to resolve an
    /// `EmittedTask` (which carries a `TaskType`, not a `TaskName`) back to
    /// a schedulable name.
    pub fn task_name_for_type(&self, task_type: &musiclib_domain::TaskType) -> Option<TaskName> {
        self.tasks
            .values()
            .find(|r| &r.descriptor.task_type == task_type)
            .map(|r| r.descriptor.meta.name.clone())
    }

    pub async fn create_task(
        &self,
        name: &TaskName,
        batch: Batch,
        kwargs: HashMap<String, String>,
    ) -> Result<Box<dyn Task>, CoreError> {
        let reg = self
            .tasks
            .get(name)
            .ok_or_else(|| CoreError::PluginNotFound(name.to_string()))?;
        let deps = self.resolve_dependencies(&reg.descriptor.meta.depends).await?;
        (reg.factory)(deps, batch, kwargs).await
    }

    pub async fn create_processor(
        &self,
        name: &TaskName,
        config: HashMap<String, String>,
    ) -> Result<Box<dyn Processor>, CoreError> {
        let reg = self
            .processors
            .get(name)
            .ok_or_else(|| CoreError::PluginNotFound(name.to_string()))?;
        let deps = self.resolve_dependencies(&reg.descriptor.meta.depends).await?;
        (reg.factory)(deps, config).await
    }

    async fn resolve_dependencies(
        &self,
        depends: &[TaskName],
    ) -> Result<Vec<Arc<dyn AudioUtility>>, CoreError> {
        let mut out = Vec::with_capacity(depends.len());
        for dep in depends {
            out.push(self.get_or_init_audio_util(dep).await?);
        }
        Ok(out)
    }

    /// Lazily instantiates and memoizes an audio utility. Concurrent
    /// requests for the same utility block on the same `OnceCell`;
    /// different utilities initialize independently (§4.1).
    async fn get_or_init_audio_util(&self, name: &TaskName) -> Result<Arc<dyn AudioUtility>, CoreError> {
        let reg = self.audio_utils.get(name).ok_or_else(|| CoreError::DependencyUnavailable(name.to_string()))?;
        let cell = {
            let mut cells = self.audio_util_cells.lock().await;
            cells.entry(name.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        let util = cell
            .get_or_try_init(|| async { (reg.factory)().await })
            .await?;
        Ok(util.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musiclib_domain::{PluginMeta, PluginVersion, TaskType};

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

    fn noop_task_factory() -> TaskFactory {
        Arc::new(|_deps, _batch, _kwargs| Box::pin(async move { Err(CoreError::internal("unused in this test")) }))
    }

    #[test]
    fn duplicate_task_registration_is_rejected() {
        let mut registry = Registry::new();
        let descriptor = TaskDescriptor {
            meta: meta("parser"),
            task_type: TaskType::Parser,
            stage_type: Stage::Import,
        };
        registry
            .register_task(descriptor.clone(), noop_task_factory())
            .unwrap();
        let err = registry
            .register_task(descriptor, noop_task_factory())
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicatePlugin(_)));
    }

    #[test]
    fn tasks_for_stage_preserves_registration_order() {
        let mut registry = Registry::new();
        for (i, name) in ["b_task", "a_task"].iter().enumerate() {
            let mut m = meta(name);
            m.cooldown_seconds = i as f64;
            registry
                .register_task(
                    TaskDescriptor {
                        meta: m,
                        task_type: TaskType::Parser,
                        stage_type: Stage::Import,
                    },
                    noop_task_factory(),
                )
                .unwrap();
        }
        let names: Vec<_> = registry
            .tasks_for_stage(Stage::Import)
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["b_task".to_string(), "a_task".to_string()]);
    }
}
