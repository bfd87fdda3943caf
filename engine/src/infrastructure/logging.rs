// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging
//!
//! Process-wide `tracing` setup. Every component logs through `tracing`
//! directly (`tracing::info!`/`warn!`/`error!`); this module only owns the
//! one-time subscriber initialization and the span constructors that attach
//! `file_id`/`task_name`/`task_type` fields consistently across the
//! Registry, ConcurrencyController, TaskManager, ProcessorLoop and Scanner.

use musiclib_domain::{CoreError, TaskName, TaskType};
use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. `default_level` is used when
/// `RUST_LOG` is unset. Safe to call at most once per process; a second call
/// returns a `CoreError::Configuration`.
pub fn init(default_level: &str) -> Result<(), CoreError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|error| CoreError::Configuration(format!("tracing subscriber already set: {error}")))
}

/// Span for a single task invocation, carrying the fields §4.4/§7 logging
/// expects on every task-related log line.
pub fn task_span(task_name: &TaskName, task_type: &TaskType) -> tracing::Span {
    tracing::info_span!("task", task_name = %task_name, task_type = %task_type)
}

/// Span for a single `StageTracker::complete_stage_for_file` call.
pub fn file_span(file_id: i64) -> tracing::Span {
    tracing::info_span!("file", file_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_span_carries_both_fields() {
        let span = task_span(&TaskName::parse("parser").unwrap(), &TaskType::Parser);
        assert_eq!(span.metadata().unwrap().name(), "task");
    }
}
