// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The closed set of task kinds a batch can target. `Custom` escapes the
//! enum for plugin kinds that don't fit a built-in tag, carrying its own
//! display name.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TaskType {
    ArtGetter,
    Importer,
    Tagger,
    Fingerprinter,
    Exporter,
    LyricsGetter,
    Normalizer,
    Deduper,
    Trimmer,
    Converter,
    Parser,
    Sorter,
    DuplicateChecker,
    Custom(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::ArtGetter => "ART_GETTER",
            TaskType::Importer => "IMPORTER",
            TaskType::Tagger => "TAGGER",
            TaskType::Fingerprinter => "FINGERPRINTER",
            TaskType::Exporter => "EXPORTER",
            TaskType::LyricsGetter => "LYRICS_GETTER",
            TaskType::Normalizer => "NORMALIZER",
            TaskType::Deduper => "DEDUPER",
            TaskType::Trimmer => "TRIMMER",
            TaskType::Converter => "CONVERTER",
            TaskType::Parser => "PARSER",
            TaskType::Sorter => "SORTER",
            TaskType::DuplicateChecker => "DUPLICATE_CHECKER",
            TaskType::Custom(name) => name.as_str(),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_as_str() {
        assert_eq!(TaskType::Importer.to_string(), "IMPORTER");
        assert_eq!(TaskType::Custom("remixer".into()).to_string(), "remixer");
    }
}
