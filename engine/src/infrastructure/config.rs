// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Configuration
//!
//! [`AppConfig`] is the single source of truth for every knob the scheduler
//! reads at startup: library paths, import behavior, scanner batch size, the
//! AcoustID API key, and the concurrency limits `ConcurrencyController` is
//! built from. It is loaded once, in `main`, via the layered `config` crate
//! builder: an optional file (TOML, YAML, or JSON, picked by extension) is
//! merged under `MUSICLIB__`-prefixed environment variable overrides.

use std::path::{Path, PathBuf};

use musiclib_domain::CoreError;
use serde::Deserialize;

use crate::concurrency::ConcurrencyConfig;

fn default_import_extensions() -> Vec<String> {
    ["flac", "mp3", "m4a", "ogg", "wav", "aiff"].iter().map(|s| s.to_string()).collect()
}

fn default_scanner_batch_size() -> usize {
    1000
}

fn default_system_load_limit() -> f64 {
    0.8
}

fn default_max_heavy_io() -> usize {
    2
}

fn default_max_normal() -> usize {
    8
}

fn default_idle_interval_seconds() -> u64 {
    300
}

fn default_database_url() -> String {
    "sqlite://musiclib.db".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub base: PathBuf,
    pub import: PathBuf,
    pub process: PathBuf,
    pub export: PathBuf,
    pub music: PathBuf,
    pub art: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionsConfig {
    #[serde(default = "default_import_extensions")]
    pub import: Vec<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self { import: default_import_extensions() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub clean: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_scanner_batch_size")]
    pub scanner_batch_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { scanner_batch_size: default_scanner_batch_size() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcoustidConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: default_metrics_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencySettings {
    #[serde(default = "default_system_load_limit")]
    pub system_load_limit: f64,
    #[serde(default = "default_max_heavy_io")]
    pub max_heavy_io: usize,
    #[serde(default = "default_max_normal")]
    pub max_normal: usize,
    #[serde(default = "default_idle_interval_seconds")]
    pub idle_interval_seconds: u64,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            system_load_limit: default_system_load_limit(),
            max_heavy_io: default_max_heavy_io(),
            max_normal: default_max_normal(),
            idle_interval_seconds: default_idle_interval_seconds(),
        }
    }
}

/// The fully-resolved configuration for a single scheduler run (§6 interface
/// 1). `paths` has no default: a config file (or environment override) must
/// supply it, since there's no sane guess for where someone's music lives.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub acoustid: AcoustidConfig,
    #[serde(default)]
    pub concurrency: ConcurrencySettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Loads configuration from an optional file layered under
    /// `MUSICLIB__`-prefixed environment variables (e.g.
    /// `MUSICLIB__PATHS__IMPORT=/mnt/music/import`). `path`, when given,
    /// must exist; when omitted, only environment variables are consulted.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MUSICLIB").separator("__").try_parsing(true),
        );

        let config = builder.build().map_err(|error| CoreError::Configuration(error.to_string()))?;
        config.try_deserialize().map_err(|error| CoreError::Configuration(error.to_string()))
    }

    pub fn extensions_import(&self) -> &[String] {
        &self.extensions.import
    }

    pub fn import_clean(&self) -> bool {
        self.import.clean
    }

    pub fn scanner_batch_size(&self) -> usize {
        self.scanner.scanner_batch_size
    }

    pub fn acoustid_api_key(&self) -> Option<&str> {
        self.acoustid.api_key.as_deref()
    }

    /// Builds the `ConcurrencyController`'s static config from this file's
    /// `[concurrency]` table.
    pub fn concurrency_config(&self) -> ConcurrencyConfig {
        ConcurrencyConfig {
            max_heavy_io: self.concurrency.max_heavy_io,
            max_normal: self.concurrency.max_normal,
            system_load_limit: self.concurrency.system_load_limit,
        }
    }

    pub fn idle_interval_seconds(&self) -> u64 {
        self.concurrency.idle_interval_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn metrics_port(&self) -> u16 {
        self.metrics.port
    }
}
