// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processor
//!
//! A long-running worker driven by `ProcessorLoop` (§4.5): on each wakeup it
//! runs once, then `collect_emitted` drains whatever task requests it
//! produced during that run. Processors hold their own cursor/cooldown state
//! between invocations; the loop only owns scheduling.

use async_trait::async_trait;

use crate::entities::{EmittedTask, ProcessorDescriptor};
use crate::error::CoreError;

#[async_trait]
pub trait Processor: Send + Sync {
    fn descriptor(&self) -> &ProcessorDescriptor;

    async fn run(&mut self) -> Result<(), CoreError>;

    /// Drains the tasks emitted by the most recent `run`. Called exactly
    /// once per run, immediately after it returns `Ok`.
    fn collect_emitted(&mut self) -> Vec<EmittedTask>;
}
