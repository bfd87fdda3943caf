// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The MusicBrainz entity kinds a lookup utility can be asked to query for.
//! Not consumed by the scheduler itself; declared here because it is part
//! of the audio-utility interface contract (§6.4) that concrete plugins
//! (e.g. a fingerprint-lookup utility) are expected to honor.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MbQueryType {
    Artist,
    Album,
    Release,
    Track,
    Recording,
    ReleaseGroup,
}

impl fmt::Display for MbQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MbQueryType::Artist => "ARTIST",
            MbQueryType::Album => "ALBUM",
            MbQueryType::Release => "RELEASE",
            MbQueryType::Track => "TRACK",
            MbQueryType::Recording => "RECORDING",
            MbQueryType::ReleaseGroup => "RELEASE_GROUP",
        };
        write!(f, "{name}")
    }
}
