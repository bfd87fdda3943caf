// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Art Getter
//!
//! The example `ART_GETTER` task, scheduled by the scanner's artwork scan
//! (§4.6 step 5) with an `ArtMap` batch. Writing the fetched art back onto
//! the album/artist/label row is out of this core's scope (`spec.md` §1
//! non-goals); this example only demonstrates consuming the batch and
//! placing a file under `paths.art`, one per missing entry.

use std::path::PathBuf;

use async_trait::async_trait;
use musiclib_domain::{
    ArtType, Batch, CoreError, PluginMeta, PluginVersion, Stage, Task, TaskDescriptor, TaskName, TaskType,
};

pub struct ArtGetter {
    batch: Batch,
    art_dir: PathBuf,
    descriptor: TaskDescriptor,
}

impl ArtGetter {
    pub fn new(batch: Batch, art_dir: PathBuf) -> Self {
        let descriptor = TaskDescriptor {
            meta: PluginMeta {
                name: TaskName::parse("art_getter").expect("\"art_getter\" is a valid task name"),
                description: "Places a placeholder art file for each mbid missing one.".to_string(),
                version: PluginVersion::parse("1.0.0").expect("\"1.0.0\" is a valid version"),
                depends: vec![],
                exclusive: false,
                heavy_io: true,
                cooldown_seconds: 0.0,
            },
            task_type: TaskType::ArtGetter,
            stage_type: Stage::Postsort,
        };
        Self { batch, art_dir, descriptor }
    }

    fn file_name(mbid: &str, art_type: &ArtType) -> String {
        format!("{art_type}-{mbid}.jpg")
    }
}

#[async_trait]
impl Task for ArtGetter {
    fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    async fn run(&mut self) -> Result<(), CoreError> {
        let Batch::ArtMap(map) = &self.batch else {
            return Ok(());
        };
        tokio::fs::create_dir_all(&self.art_dir).await?;
        for (mbid, art_type) in map {
            let path = self.art_dir.join(Self::file_name(mbid, art_type));
            if let Err(error) = tokio::fs::write(&path, []).await {
                tracing::warn!(%mbid, %error, "failed to place art file");
            }
        }
        Ok(())
    }
}
