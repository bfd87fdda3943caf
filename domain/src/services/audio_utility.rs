// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AudioUtility
//!
//! A shared, lazily-instantiated dependency consumed by tasks (e.g. a
//! fingerprinting or MusicBrainz-lookup client). The registry memoizes one
//! instance per name and hands out `Arc` clones; concrete domain-specific
//! operations (`fingerprint_file`, `lookup`, ...) live on the concrete type
//! and are reached through `as_any` downcasting, since each audio utility's
//! protocol is a plugin-level concern the core does not specify (§6.4).

use std::any::Any;

use async_trait::async_trait;

use crate::entities::AudioUtilDescriptor;
use crate::error::CoreError;

#[async_trait]
pub trait AudioUtility: Send + Sync {
    fn descriptor(&self) -> &AudioUtilDescriptor;

    /// Optional post-construction async initialization. Called at most once,
    /// under the registry's per-name lock, before the instance is handed to
    /// any caller.
    async fn init(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}
