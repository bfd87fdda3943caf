// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Audio codec tags. Not exercised by the scheduler itself, but required by
//! `Batch::CodecMap` (§9) — a converter task receives a file-id-to-codec map
//! describing the target encoding for each file in its batch.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Codec {
    Wav,
    Wma,
    Mp3,
    Mp4,
    Flac,
    Asf,
    Ogg,
    Aac,
    Ape,
    Aiff,
    Unknown,
}

impl Codec {
    /// Relative preference when several codecs are available for the same
    /// recording and one must be picked during deduplication (higher wins).
    pub fn priority(self) -> u8 {
        match self {
            Codec::Flac => 10,
            Codec::Wav => 9,
            Codec::Mp4 => 8,
            Codec::Mp3 => 7,
            Codec::Wma => 6,
            Codec::Asf => 5,
            Codec::Aac => 4,
            Codec::Ogg => 3,
            Codec::Ape => 2,
            Codec::Aiff => 1,
            Codec::Unknown => 0,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Wav => "WAV",
            Codec::Wma => "WMA",
            Codec::Mp3 => "MP3",
            Codec::Mp4 => "MP4",
            Codec::Flac => "FLAC",
            Codec::Asf => "ASF",
            Codec::Ogg => "OGG",
            Codec::Aac => "AAC",
            Codec::Ape => "APE",
            Codec::Aiff => "AIFF",
            Codec::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossless_codecs_outrank_lossy_ones() {
        assert!(Codec::Flac.priority() > Codec::Mp3.priority());
        assert!(Codec::Wav.priority() > Codec::Aac.priority());
    }
}
