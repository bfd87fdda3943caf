// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage
//!
//! `Stage` is the fixed, ordered bit-flag pipeline every file progresses
//! through. Ordering is by ascending bit value; a file's `stage` field holds
//! the highest bit it has completed, and `next_stage` steps to the following
//! bit regardless of whether any task is currently registered for it — the
//! pipeline must be able to grow tasks into the unused `PRE*`/`POST*`
//! positions without a data-model change.

use std::fmt;
use std::str::FromStr;

/// A single ordered position in the pipeline.
///
/// Identified both by name and by bit value; the two mappings are injective
/// (`as_bit`/`from_bit` and `Display`/`FromStr` never disagree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum Stage {
    Preimport = 1 << 0,
    Import = 1 << 1,
    Postimport = 1 << 2,
    Preanalyse = 1 << 3,
    Analyse = 1 << 4,
    Postanalyse = 1 << 5,
    Preprocess = 1 << 6,
    Process = 1 << 7,
    Postprocess = 1 << 8,
    Preconvert = 1 << 9,
    Convert = 1 << 10,
    Postconvert = 1 << 11,
    Premetadata = 1 << 12,
    Metadata = 1 << 13,
    Postmetadata = 1 << 14,
    Pretagwrite = 1 << 15,
    Tagwrite = 1 << 16,
    Posttagwrite = 1 << 17,
    Presort = 1 << 18,
    Sort = 1 << 19,
    Postsort = 1 << 20,
}

/// The pipeline in ascending order, used for `next_stage` lookups.
const ORDER: &[Stage] = &[
    Stage::Preimport,
    Stage::Import,
    Stage::Postimport,
    Stage::Preanalyse,
    Stage::Analyse,
    Stage::Postanalyse,
    Stage::Preprocess,
    Stage::Process,
    Stage::Postprocess,
    Stage::Preconvert,
    Stage::Convert,
    Stage::Postconvert,
    Stage::Premetadata,
    Stage::Metadata,
    Stage::Postmetadata,
    Stage::Pretagwrite,
    Stage::Tagwrite,
    Stage::Posttagwrite,
    Stage::Presort,
    Stage::Sort,
    Stage::Postsort,
];

impl Stage {
    /// The first stage in the pipeline.
    pub const FIRST: Stage = Stage::Preimport;

    /// The terminal stage; files here are ignored by the scanner.
    pub const TERMINAL: Stage = Stage::Postsort;

    pub fn as_bit(self) -> u32 {
        self as u32
    }

    pub fn from_bit(bit: u32) -> Option<Self> {
        ORDER.iter().copied().find(|s| s.as_bit() == bit)
    }

    /// The next stage in the fixed pipeline, or `None` if `self` is terminal.
    pub fn next_stage(self) -> Option<Stage> {
        let idx = ORDER.iter().position(|&s| s == self)?;
        ORDER.get(idx + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::TERMINAL
    }

    /// All stages in ascending order.
    pub fn all() -> impl Iterator<Item = Stage> {
        ORDER.iter().copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preimport => "PREIMPORT",
            Stage::Import => "IMPORT",
            Stage::Postimport => "POSTIMPORT",
            Stage::Preanalyse => "PREANALYSE",
            Stage::Analyse => "ANALYSE",
            Stage::Postanalyse => "POSTANALYSE",
            Stage::Preprocess => "PREPROCESS",
            Stage::Process => "PROCESS",
            Stage::Postprocess => "POSTPROCESS",
            Stage::Preconvert => "PRECONVERT",
            Stage::Convert => "CONVERT",
            Stage::Postconvert => "POSTCONVERT",
            Stage::Premetadata => "PREMETADATA",
            Stage::Metadata => "METADATA",
            Stage::Postmetadata => "POSTMETADATA",
            Stage::Pretagwrite => "PRETAGWRITE",
            Stage::Tagwrite => "TAGWRITE",
            Stage::Posttagwrite => "POSTTAGWRITE",
            Stage::Presort => "PRESORT",
            Stage::Sort => "SORT",
            Stage::Postsort => "POSTSORT",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized stage name: {0}")]
pub struct ParseStageError(String);

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ORDER
            .iter()
            .copied()
            .find(|stage| stage.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStageError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_ascending_by_bit() {
        let bits: Vec<u32> = ORDER.iter().map(|s| s.as_bit()).collect();
        let mut sorted = bits.clone();
        sorted.sort_unstable();
        assert_eq!(bits, sorted);
    }

    #[test]
    fn next_stage_steps_through_unused_positions() {
        assert_eq!(Stage::Import.next_stage(), Some(Stage::Postimport));
        assert_eq!(Stage::Postimport.next_stage(), Some(Stage::Preanalyse));
    }

    #[test]
    fn terminal_stage_has_no_next() {
        assert_eq!(Stage::Postsort.next_stage(), None);
        assert!(Stage::Postsort.is_terminal());
    }

    #[test]
    fn display_and_from_str_round_trip() {
        for stage in Stage::all() {
            let rendered = stage.to_string();
            assert_eq!(rendered.parse::<Stage>().unwrap(), stage);
        }
    }

    #[test]
    fn from_bit_is_injective_with_display() {
        for stage in Stage::all() {
            assert_eq!(Stage::from_bit(stage.as_bit()), Some(stage));
        }
        assert_eq!(Stage::from_bit(0), None);
    }
}
