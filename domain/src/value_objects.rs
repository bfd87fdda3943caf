// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: small, immutable, validated types with no identity of
//! their own. Everything here is `Clone + PartialEq` and cheap to pass by
//! value.

pub mod art_type;
pub mod batch;
pub mod codec;
pub mod mbquery_type;
pub mod stage;
pub mod task_name;
pub mod task_type;
pub mod version;

pub use art_type::ArtType;
pub use batch::Batch;
pub use codec::Codec;
pub use mbquery_type::MbQueryType;
pub use stage::{ParseStageError, Stage};
pub use task_name::{InvalidName, TaskName};
pub use task_type::TaskType;
pub use version::{InvalidVersion, PluginVersion};
