// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batch
//!
//! The reference implementation passes an untyped dict as a task's work
//! payload and lets each task kind interpret its shape by convention. Here
//! `Batch` is a tagged union instead: the task type determines which variant
//! it accepts, and construction can't produce a payload the consuming task
//! doesn't understand.

use std::collections::HashMap;

use crate::value_objects::ArtType;
use crate::value_objects::Codec;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Batch {
    /// File ids, e.g. for the parser/fingerprinter/tagger/sorter tasks.
    FileIds(Vec<i64>),
    /// Track ids, for tasks that operate below the file granularity.
    TrackIds(Vec<i64>),
    /// MBID to entity kind, for the art-getter task.
    ArtMap(HashMap<String, ArtType>),
    /// File id to target codec, for the converter task.
    CodecMap(HashMap<i64, Codec>),
    /// The importer discovers its own inputs; it is scheduled with no batch.
    Empty,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        match self {
            Batch::FileIds(v) => v.is_empty(),
            Batch::TrackIds(v) => v.is_empty(),
            Batch::ArtMap(m) => m.is_empty(),
            Batch::CodecMap(m) => m.is_empty(),
            Batch::Empty => true,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::FileIds(v) => v.len(),
            Batch::TrackIds(v) => v.len(),
            Batch::ArtMap(m) => m.len(),
            Batch::CodecMap(m) => m.len(),
            Batch::Empty => 0,
        }
    }

    /// Splits a `FileIds` batch into chunks of at most `chunk_size`, per the
    /// scanner's emission rule (§4.6 step 4). Other variants are returned
    /// whole since the scanner only chunks file-id buckets.
    pub fn chunked(self, chunk_size: usize) -> Vec<Batch> {
        match self {
            Batch::FileIds(ids) if chunk_size > 0 => ids
                .chunks(chunk_size)
                .map(|chunk| Batch::FileIds(chunk.to_vec()))
                .collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_reports_empty() {
        assert!(Batch::Empty.is_empty());
        assert!(Batch::FileIds(vec![]).is_empty());
        assert!(!Batch::FileIds(vec![1]).is_empty());
    }

    #[test]
    fn chunking_splits_file_ids_by_size() {
        let batch = Batch::FileIds((1..=2500).collect());
        let chunks = batch.chunked(1000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[2].len(), 500);
    }

    #[test]
    fn chunking_leaves_non_file_id_variants_whole() {
        let mut map = HashMap::new();
        map.insert("mbid-1".to_string(), ArtType::Album);
        let batch = Batch::ArtMap(map);
        let chunks = batch.clone().chunked(1000);
        assert_eq!(chunks, vec![batch]);
    }
}
