// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Music Library Domain
//!
//! The core scheduling model for a personal music-library pipeline: plugin
//! contracts, the stage lattice a file advances through, and the
//! entities/value objects the Registry, ConcurrencyController, StageTracker,
//! TaskManager, ProcessorLoop and Scanner operate on. This crate has no
//! knowledge of databases, the filesystem, or any concrete plugin — those
//! live in the engine crate that depends on it.
//!
//! ## Module Structure
//!
//! - [`value_objects`] — `Stage`, `TaskName`, `TaskType`, `PluginVersion`,
//!   `Batch`, `Codec`, `ArtType`, `MbQueryType`: immutable, self-validating
//!   types with no identity.
//! - [`entities`] — `FileRecord` (the one entity with identity the core
//!   tracks) plus the static descriptors (`PluginMeta`, `TaskDescriptor`,
//!   `ProcessorDescriptor`, `AudioUtilDescriptor`, `EmittedTask`) the
//!   registry catalogs.
//! - [`services`] — the three plugin interfaces (`Task`, `Processor`,
//!   `AudioUtility`) a concrete plugin implements directly, plus the
//!   `StageTracker` trait a task holds an `Arc<dyn StageTracker>` handle to.
//! - [`repositories`] — the persistence contracts (`FileRepository`,
//!   `ArtRepository`) the scheduler consumes; concrete implementations live
//!   in the engine crate.
//! - [`error`] — `CoreError`, the error taxonomy shared across every
//!   boundary (§7).
//!
//! ## Business Rules and Invariants
//!
//! - A file's `stage` is monotonically non-decreasing; `completed_tasks` is
//!   monotonically growing and idempotent under re-addition.
//! - A plugin's declared `depends` must themselves be registered audio
//!   utilities, never another task or processor, and dependency cycles are
//!   rejected at registration.
//! - Stage values form a fixed, ordered lattice (`Stage::ORDER`); advancing
//!   past an unused position is a normal, silent step, not an error.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{
    AudioUtilDescriptor, EmittedTask, FileRecord, PluginMeta, ProcessorDescriptor, TaskDescriptor,
};
pub use error::CoreError;
pub use repositories::{ArtRepository, FileFilter, FileRepository};
pub use services::{AudioUtility, Processor, StageTracker, Task};
pub use value_objects::{
    ArtType, Batch, Codec, MbQueryType, PluginVersion, Stage, TaskName, TaskType,
};
