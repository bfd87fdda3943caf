// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Process exit codes for the `musiclib` binary.
//!
//! ## Exit Code Conventions
//!
//! - **0**: Success
//! - **1**: General error (task/processor failure, I/O error, database error)
//! - **2**: Configuration error (missing/invalid config, bad CLI arguments)
//! - **3**: Plugin validation error (duplicate registration, unknown plugin
//!   name, dependency unavailable at startup)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use musiclib_bootstrap::exit_code::{result_to_exit_code, ExitCode};
//!
//! fn run_application() -> Result<(), std::io::Error> {
//!     Ok(())
//! }
//!
//! fn main() -> std::process::ExitCode {
//!     result_to_exit_code(run_application())
//! }
//! ```

use std::fmt;

/// Exit codes for the `musiclib` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error: task/processor failure, I/O error, database error (1)
    Error = 1,

    /// Configuration error: missing/invalid config file, bad CLI arguments (2)
    Configuration = 2,

    /// Plugin validation error: duplicate registration, unknown plugin name,
    /// dependency unavailable at startup (3)
    PluginValidation = 3,
}

impl ExitCode {
    /// Convert to i32 for use with `std::process::exit`.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Classify an error by message content.
    ///
    /// The bootstrap crate has no dependency on the domain crate's
    /// `CoreError`, so classification works against the rendered message
    /// rather than matching on error variants. Callers that do have a
    /// `CoreError` in hand should match on it directly and only fall back
    /// to this heuristic for opaque/boxed errors.
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let msg = error.to_string().to_lowercase();

        if msg.contains("duplicate") || msg.contains("plugin") || msg.contains("dependency unavailable") {
            ExitCode::PluginValidation
        } else if msg.contains("config") || msg.contains("invalid argument") || msg.contains("invalid value") {
            ExitCode::Configuration
        } else {
            ExitCode::Error
        }
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::Configuration => "Configuration error",
            ExitCode::PluginValidation => "Plugin validation error",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn is_error(self) -> bool {
        !self.is_success()
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

/// Map an error to its exit code, without consuming the `Result`.
pub fn map_error_to_exit_code(error: &dyn std::error::Error) -> ExitCode {
    ExitCode::from_error(error)
}

/// Convert a top-level application result into a process exit code.
pub fn result_to_exit_code<T, E: std::error::Error>(result: Result<T, E>) -> std::process::ExitCode {
    match result {
        Ok(_) => ExitCode::Success.into(),
        Err(e) => {
            let code = map_error_to_exit_code(&e);
            eprintln!("Error: {}", e);
            code.into()
        }
    }
}
