// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Art Repository
//!
//! Persistence contract for the Scanner's artwork scan (§4.6 step 5):
//! albums/persons/labels with a null `picture` and a non-null `mbid` are the
//! scan's candidates, keyed by their MBID. `Track`, `Album`, `Person`,
//! `Label` rows themselves are out of the core's scope beyond this one
//! query; the core never mutates them directly.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::value_objects::ArtType;

#[async_trait]
pub trait ArtRepository: Send + Sync {
    /// Returns `{mbid -> art_type}` for every album/artist/label whose
    /// picture is null and whose mbid is set.
    async fn missing_art(&self) -> Result<Vec<(String, ArtType)>, CoreError>;
}
