// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Fingerprinter
//!
//! The example `FINGERPRINTER` task and its audio-utility dependency. The
//! real AcoustID lookup protocol (`original_source/src/Clients/mb_client.py`)
//! is out of this core's scope; [`FingerprintClient`] stands in for it with
//! a content hash, exercising the registry's audio-utility memoization and
//! dependency-injection path end to end.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use musiclib_domain::{
    AudioUtilDescriptor, AudioUtility, Batch, CoreError, FileRepository, PluginMeta, PluginVersion,
    Stage, StageTracker, Task, TaskDescriptor, TaskName, TaskType,
};

/// Stand-in for an AcoustID-style fingerprinting client. Computes a
/// content fingerprint locally rather than calling out to a network
/// service — no HTTP client crate is part of this workspace's stack.
pub struct FingerprintClient {
    descriptor: AudioUtilDescriptor,
}

impl FingerprintClient {
    pub fn new() -> Self {
        let descriptor = AudioUtilDescriptor {
            name: TaskName::parse("fingerprint_client").expect("\"fingerprint_client\" is a valid task name"),
            description: "Computes a content fingerprint for a file's raw bytes.".to_string(),
            version: PluginVersion::parse("1.0.0").expect("\"1.0.0\" is a valid version"),
            depends: vec![],
            exclusive: false,
            heavy_io: true,
        };
        Self { descriptor }
    }

    /// FNV-1a over the file's raw bytes, rendered as lowercase hex.
    pub fn fingerprint(&self, data: &[u8]) -> String {
        const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
        const PRIME: u64 = 0x100000001b3;
        let mut hash = OFFSET_BASIS;
        for &byte in data {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
        format!("{hash:016x}")
    }
}

impl Default for FingerprintClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioUtility for FingerprintClient {
    fn descriptor(&self) -> &AudioUtilDescriptor {
        &self.descriptor
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct Fingerprinter {
    batch: Batch,
    client: Arc<dyn AudioUtility>,
    files: Arc<dyn FileRepository>,
    stage_tracker: Arc<dyn StageTracker>,
    descriptor: TaskDescriptor,
}

impl Fingerprinter {
    pub fn new(
        batch: Batch,
        client: Arc<dyn AudioUtility>,
        files: Arc<dyn FileRepository>,
        stage_tracker: Arc<dyn StageTracker>,
    ) -> Self {
        let descriptor = TaskDescriptor {
            meta: PluginMeta {
                name: TaskName::parse("fingerprinter").expect("\"fingerprinter\" is a valid task name"),
                description: "Fingerprints each file in the batch and marks the ANALYSE stage complete.".to_string(),
                version: PluginVersion::parse("1.0.0").expect("\"1.0.0\" is a valid version"),
                depends: vec![TaskName::parse("fingerprint_client").expect("valid name")],
                exclusive: false,
                heavy_io: true,
                cooldown_seconds: 0.0,
            },
            task_type: TaskType::Fingerprinter,
            stage_type: Stage::Analyse,
        };
        Self { batch, client, files, stage_tracker, descriptor }
    }

    fn client(&self) -> Result<&FingerprintClient, CoreError> {
        self.client
            .as_any()
            .downcast_ref::<FingerprintClient>()
            .ok_or_else(|| CoreError::internal("fingerprint_client audio utility has an unexpected concrete type"))
    }
}

#[async_trait]
impl Task for Fingerprinter {
    fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    async fn run(&mut self) -> Result<(), CoreError> {
        let Batch::FileIds(ids) = &self.batch else {
            return Ok(());
        };
        let task_name = self.descriptor.meta.name.clone();
        for &id in ids {
            let Some(file) = self.files.find_by_id(id).await? else {
                tracing::warn!(file_id = id, "fingerprinter skipping unknown file id");
                continue;
            };
            let data = match tokio::fs::read(&file.path).await {
                Ok(data) => data,
                Err(error) => {
                    tracing::warn!(file_id = id, %error, "failed to read file for fingerprinting");
                    continue;
                }
            };
            let fingerprint = self.client()?.fingerprint(&data);
            tracing::debug!(file_id = id, %fingerprint, "computed fingerprint");
            self.stage_tracker.complete_stage_for_file(id, task_name.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic_and_content_sensitive() {
        let client = FingerprintClient::new();
        assert_eq!(client.fingerprint(b"abc"), client.fingerprint(b"abc"));
        assert_ne!(client.fingerprint(b"abc"), client.fingerprint(b"abd"));
    }
}
