// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `musiclib` Binary
//!
//! The composition root: parses and validates CLI arguments via
//! `musiclib-bootstrap`, loads [`AppConfig`], wires the registry with the
//! example plugins, and dispatches to `run`, `serve`, or `plugins` per
//! [`ValidatedCommand`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use musiclib_bootstrap::platform::{create_platform, Platform};
use musiclib_bootstrap::shutdown::{ShutdownCoordinator, DEFAULT_GRACE_PERIOD_SECS};
use musiclib_bootstrap::signals::{create_signal_handler, SystemSignals};
use musiclib_bootstrap::{bootstrap_cli, result_to_exit_code, ValidatedCommand};
use musiclib_domain::{
    ArtRepository, AudioUtility, Batch, CoreError, FileRepository, Processor, Stage, StageTracker, Task,
};
use musiclib_engine::concurrency::ConcurrencyController;
use musiclib_engine::infrastructure::config::AppConfig;
use musiclib_engine::infrastructure::db::schema::initialize_database;
use musiclib_engine::infrastructure::db::{SqliteArtRepository, SqliteFileRepository};
use musiclib_engine::infrastructure::logging;
use musiclib_engine::infrastructure::metrics::{serve_metrics, SchedulerMetrics};
use musiclib_engine::plugins::art_getter::ArtGetter;
use musiclib_engine::plugins::fingerprinter::{FingerprintClient, Fingerprinter};
use musiclib_engine::plugins::importer::Importer;
use musiclib_engine::plugins::parser::Parser;
use musiclib_engine::processor_loop::ProcessorLoop;
use musiclib_engine::registry::Registry;
use musiclib_engine::scanner::Scanner;
use musiclib_engine::stage_tracker::StageTrackerImpl;
use musiclib_engine::task_manager::TaskManager;

/// Registers every example plugin (§4.1's registry wiring): one
/// audio-utility, three stage tasks, an art-getter task, and the scanner
/// processor. `registry` and `stage_tracker` are filled in as `OnceLock`s
/// *after* the registry this function returns has been frozen into an
/// `Arc`, since the scanner's factory needs to hold that very `Arc` and
/// every task's `StageTracker` needs the same frozen registry to check
/// stage completion (§4.3). Factories only read the cells when invoked,
/// never at registration time, so the ordering is safe.
fn build_registry(
    files: Arc<dyn FileRepository>,
    art: Arc<dyn ArtRepository>,
    import_dir: PathBuf,
    extensions: Vec<String>,
    import_clean: bool,
    art_dir: PathBuf,
    scanner_batch_size: usize,
    registry_cell: Arc<OnceLock<Arc<Registry>>>,
    stage_tracker_cell: Arc<OnceLock<Arc<dyn StageTracker>>>,
) -> Result<Registry, CoreError> {
    let mut registry = Registry::new();

    registry.register_audioutil(
        FingerprintClient::new().descriptor().clone(),
        Arc::new(|| {
            Box::pin(async move {
                let client: Arc<dyn AudioUtility> = Arc::new(FingerprintClient::new());
                Ok(client)
            })
        }),
    )?;

    {
        let placeholder_tracker: Arc<dyn StageTracker> = empty_stage_tracker();
        let descriptor = Importer::new(
            import_dir.clone(),
            extensions.clone(),
            import_clean,
            files.clone(),
            placeholder_tracker,
        )
        .descriptor()
        .clone();
        let files = files.clone();
        let import_dir = import_dir.clone();
        let extensions = extensions.clone();
        let cell = stage_tracker_cell.clone();
        registry.register_task(
            descriptor,
            Arc::new(move |_deps, _batch, _kwargs| {
                let files = files.clone();
                let import_dir = import_dir.clone();
                let extensions = extensions.clone();
                let stage_tracker = cell.get().expect("stage tracker wired before first invocation").clone();
                Box::pin(async move {
                    let task: Box<dyn Task> =
                        Box::new(Importer::new(import_dir, extensions, import_clean, files, stage_tracker));
                    Ok(task)
                })
            }),
        )?;
    }

    {
        let placeholder_tracker: Arc<dyn StageTracker> = empty_stage_tracker();
        let descriptor = Parser::new(Batch::Empty, files.clone(), placeholder_tracker).descriptor().clone();
        let files = files.clone();
        let cell = stage_tracker_cell.clone();
        registry.register_task(
            descriptor,
            Arc::new(move |_deps, batch, _kwargs| {
                let files = files.clone();
                let stage_tracker = cell.get().expect("stage tracker wired before first invocation").clone();
                Box::pin(async move {
                    let task: Box<dyn Task> = Box::new(Parser::new(batch, files, stage_tracker));
                    Ok(task)
                })
            }),
        )?;
    }

    {
        let placeholder_client: Arc<dyn AudioUtility> = Arc::new(FingerprintClient::new());
        let placeholder_tracker: Arc<dyn StageTracker> = empty_stage_tracker();
        let descriptor = Fingerprinter::new(Batch::Empty, placeholder_client, files.clone(), placeholder_tracker)
            .descriptor()
            .clone();
        let files = files.clone();
        let cell = stage_tracker_cell.clone();
        registry.register_task(
            descriptor,
            Arc::new(move |deps, batch, _kwargs| {
                let files = files.clone();
                let stage_tracker = cell.get().expect("stage tracker wired before first invocation").clone();
                Box::pin(async move {
                    let client = deps
                        .into_iter()
                        .next()
                        .ok_or_else(|| CoreError::DependencyUnavailable("fingerprint_client".to_string()))?;
                    let task: Box<dyn Task> = Box::new(Fingerprinter::new(batch, client, files, stage_tracker));
                    Ok(task)
                })
            }),
        )?;
    }

    {
        let descriptor = ArtGetter::new(Batch::Empty, art_dir.clone()).descriptor().clone();
        let art_dir = art_dir.clone();
        registry.register_task(
            descriptor,
            Arc::new(move |_deps, batch, _kwargs| {
                let art_dir = art_dir.clone();
                Box::pin(async move {
                    let task: Box<dyn Task> = Box::new(ArtGetter::new(batch, art_dir));
                    Ok(task)
                })
            }),
        )?;
    }

    {
        let placeholder_registry = Arc::new(Registry::new());
        let descriptor = Scanner::new(import_dir.clone(), files.clone(), art.clone(), placeholder_registry, scanner_batch_size)
            .descriptor()
            .clone();
        let import_dir = import_dir.clone();
        let files = files.clone();
        let art = art.clone();
        let cell = registry_cell.clone();
        registry.register_processor(
            descriptor,
            Arc::new(move |_deps, _config| {
                let import_dir = import_dir.clone();
                let files = files.clone();
                let art = art.clone();
                let registry = cell.get().expect("registry wired before first invocation").clone();
                Box::pin(async move {
                    let processor: Box<dyn Processor> =
                        Box::new(Scanner::new(import_dir, files, art, registry, scanner_batch_size));
                    Ok(processor)
                })
            }),
        )?;
    }

    Ok(registry)
}

/// A `StageTracker` that is never actually invoked: only used to satisfy
/// a plugin constructor's signature while building its registration
/// descriptor, before the real, registry-backed tracker exists.
fn empty_stage_tracker() -> Arc<dyn StageTracker> {
    struct Unreachable;
    #[async_trait::async_trait]
    impl StageTracker for Unreachable {
        async fn complete_stage_for_file(&self, _file_id: i64, _task_name: musiclib_domain::TaskName) -> Result<(), CoreError> {
            unreachable!("placeholder stage tracker must never run")
        }
        async fn batch_complete_stage(&self, _file_ids: &[i64], _task_name: musiclib_domain::TaskName) -> Result<(), CoreError> {
            unreachable!("placeholder stage tracker must never run")
        }
    }
    Arc::new(Unreachable)
}

async fn run(cli_config: Option<PathBuf>, verbose: bool, command: ValidatedCommand) -> Result<(), CoreError> {
    let default_level = if verbose { "debug" } else { "info" };
    logging::init(default_level)?;

    let app_config = AppConfig::load(cli_config.as_deref())?;

    let pool = initialize_database(app_config.database_url())
        .await
        .map_err(|error| CoreError::Database(error.to_string()))?;
    let files: Arc<dyn FileRepository> = Arc::new(SqliteFileRepository::new(pool.clone()));
    let art: Arc<dyn ArtRepository> = Arc::new(SqliteArtRepository::new(pool));

    let registry_cell: Arc<OnceLock<Arc<Registry>>> = Arc::new(OnceLock::new());
    let stage_tracker_cell: Arc<OnceLock<Arc<dyn StageTracker>>> = Arc::new(OnceLock::new());

    let registry = build_registry(
        files.clone(),
        art.clone(),
        app_config.paths.import.clone(),
        app_config.extensions_import().to_vec(),
        app_config.import_clean(),
        app_config.paths.art.clone(),
        app_config.scanner_batch_size(),
        registry_cell.clone(),
        stage_tracker_cell.clone(),
    )?;
    let registry = Arc::new(registry);
    registry_cell.set(registry.clone()).ok();
    stage_tracker_cell
        .set(Arc::new(StageTrackerImpl::new(files.clone(), registry.clone())))
        .ok();

    let platform: Arc<dyn Platform> = Arc::from(create_platform());
    let concurrency = Arc::new(ConcurrencyController::new(app_config.concurrency_config(), platform));

    let shutdown = ShutdownCoordinator::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS));
    let signal_coordinator = shutdown.clone();
    tokio::spawn(async move {
        let handler = create_signal_handler();
        handler
            .wait_for_signal(Box::new(move || signal_coordinator.initiate_shutdown()))
            .await;
    });

    let metrics = Arc::new(SchedulerMetrics::new()?);
    let metrics_port = app_config.metrics_port();
    tokio::spawn(async move {
        if let Err(error) = serve_metrics(metrics, metrics_port).await {
            tracing::warn!(%error, "metrics endpoint stopped");
        }
    });

    let task_manager = Arc::new(
        TaskManager::new(registry.clone(), concurrency.clone(), shutdown.token())
            .with_idle_interval(Duration::from_secs(app_config.idle_interval_seconds())),
    );

    match command {
        ValidatedCommand::Run { stage, all } => {
            if let Some(stage) = stage {
                let stage =
                    Stage::from_str(&stage).map_err(|_| CoreError::Configuration(format!("unknown stage: {stage}")))?;
                task_manager.run_stage(stage).await;
            } else if all {
                let stages: Vec<Stage> = Stage::all().collect();
                task_manager.run_pipeline(&stages).await;
            }
            Ok(())
        }
        ValidatedCommand::Serve => {
            tokio::spawn(task_manager.clone().start_idle_loop());
            let processor_loop = Arc::new(ProcessorLoop::new(
                registry.clone(),
                concurrency.clone(),
                task_manager.clone(),
                shutdown.token(),
            ));
            processor_loop.run().await;
            shutdown.initiate_shutdown();
            if !shutdown.wait_for_shutdown().await {
                tracing::warn!("shutdown grace period expired");
            }
            shutdown.complete_shutdown();
            Ok(())
        }
        ValidatedCommand::Plugins => {
            println!("Tasks:");
            for name in registry.task_names() {
                println!("  {name}");
            }
            println!("Processors:");
            for name in registry.processor_names() {
                println!("  {name}");
            }
            Ok(())
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(error) => return result_to_exit_code::<(), _>(Err(error)),
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => return result_to_exit_code::<(), _>(Err(CoreError::internal(error.to_string()))),
    };

    let result = runtime.block_on(run(cli.config, cli.verbose, cli.command));
    result_to_exit_code(result)
}
