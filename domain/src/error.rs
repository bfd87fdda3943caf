// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A hierarchical error type for the pipeline core, organized around the
//! error taxonomy the scheduler distinguishes: configuration failures that
//! halt startup, plugin validation failures that reject a registration,
//! dependency failures that skip a single task, and the transient/database
//! failures a task body can hit per-item without bringing down the batch.
//!
//! `Skipped` is deliberately not a variant here: a controller declining to
//! start an invocation (cooldown, load shedding) is not an error, it is an
//! `Option::None` result from `run_task`.

use thiserror::Error;

/// Domain-specific errors for the pipeline core.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Missing or invalid configuration. Surfaced to the CLI with exit code 2.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A plugin violated a registration rule (§4.1). Exit code 3.
    #[error("plugin validation error: {0}")]
    PluginValidation(String),

    /// Attempting to register a name that is already registered.
    #[error("duplicate plugin registration: {0}")]
    DuplicatePlugin(String),

    /// A task, processor, or audio utility name was not found in the registry.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// A declared audio-utility dependency could not be instantiated.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Filesystem or network failure inside a task body.
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    /// Any persistence failure; the surrounding transaction is rolled back.
    #[error("database error: {0}")]
    Database(String),

    /// A malformed batch entry (e.g. a non-integer file id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation was cancelled cooperatively (shutdown, timeout).
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Anything that doesn't fit the categories above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn plugin_validation(msg: impl Into<String>) -> Self {
        Self::PluginValidation(msg.into())
    }

    pub fn dependency_unavailable(msg: impl Into<String>) -> Self {
        Self::DependencyUnavailable(msg.into())
    }

    pub fn transient_io(msg: impl Into<String>) -> Self {
        Self::TransientIo(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a caller may reasonably retry the operation that produced this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::TransientIo(_) | CoreError::Database(_))
    }

    /// Whether this error should halt startup rather than being recorded
    /// against a single task/file and continuing.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            CoreError::Configuration(_) | CoreError::PluginValidation(_) | CoreError::DuplicatePlugin(_)
        )
    }

    pub fn category(&self) -> &'static str {
        match self {
            CoreError::Configuration(_) => "configuration",
            CoreError::PluginValidation(_) => "plugin_validation",
            CoreError::DuplicatePlugin(_) => "plugin_validation",
            CoreError::PluginNotFound(_) => "plugin_validation",
            CoreError::DependencyUnavailable(_) => "dependency",
            CoreError::TransientIo(_) => "io",
            CoreError::Database(_) => "database",
            CoreError::InvalidInput(_) => "input",
            CoreError::Cancelled(_) => "cancellation",
            CoreError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::TransientIo(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::InvalidInput(err.to_string())
    }
}

// NOTE: TOML/YAML error conversions intentionally omitted here: the
// serialization format used to load configuration is an infrastructure
// concern, not something the domain needs to know about.
