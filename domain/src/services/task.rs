// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Task
//!
//! A unit of schedulable work bound to one batch (§3, §4.4). The registry
//! constructs a fresh instance per invocation via its task factory, handing
//! the batch and any keyword overrides to the constructor; `run` then does
//! the work and reports back through whatever `StageTracker`/repository
//! handles were closed over at construction time.
//!
//! A task with an empty batch is expected to return `Ok(())` immediately
//! without touching any dependency (§5, "Empty batch").

use async_trait::async_trait;

use crate::entities::TaskDescriptor;
use crate::error::CoreError;

#[async_trait]
pub trait Task: Send + Sync {
    fn descriptor(&self) -> &TaskDescriptor;

    async fn run(&mut self) -> Result<(), CoreError>;

    /// Percent complete, 0-100. Tasks that don't track partial progress can
    /// leave the default; `run` returning `Ok` always implies 100.
    fn progress(&self) -> u8 {
        100
    }
}
