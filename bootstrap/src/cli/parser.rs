// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line structure for the three subcommands the core needs to
//! exercise it (§6): run the pipeline once for one stage or all stages,
//! start the long-lived loop, or print registry state.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "musiclib")]
#[command(about = concat!("Music library pipeline v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML/YAML/JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the pipeline once, for one stage or all stages
    Run {
        /// Run only the tasks registered for this stage
        #[arg(long)]
        stage: Option<String>,

        /// Run every stage in pipeline order
        #[arg(long)]
        all: bool,
    },

    /// Start the long-lived scanner/processor loop
    Serve,

    /// Print registry state (registered tasks, processors, audio utilities)
    Plugins,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
