// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! parser::parse_cli()  -->  validate_cli()  -->  ValidatedCli
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: every argument has passed
/// [`SecureArgParser`] and range checks.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run { stage: Option<String>, all: bool },
    Serve,
    Plugins,
}

/// Parse and validate CLI arguments: clap parsing followed by security and
/// range validation.
///
/// # Errors
///
/// Returns [`ParseError`] if parsing or validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = match cli.config {
        Some(ref path) => {
            SecureArgParser::validate_argument(&path.to_string_lossy())?;
            Some(path.clone())
        }
        None => None,
    };

    let command = match cli.command {
        Commands::Run { stage, all } => {
            if stage.is_some() == all {
                return Err(ParseError::InvalidValue {
                    arg: "stage/all".to_string(),
                    reason: "exactly one of --stage or --all must be given".to_string(),
                });
            }
            if let Some(ref s) = stage {
                SecureArgParser::validate_argument(s)?;
            }
            ValidatedCommand::Run { stage, all }
        }
        Commands::Serve => ValidatedCommand::Serve,
        Commands::Plugins => ValidatedCommand::Plugins,
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
    })
}
