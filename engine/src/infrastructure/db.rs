// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Database
//!
//! §6 interface 2 implemented against `sqlite` via `sqlx`: a connection
//! pool, schema migrations, and the `FileRepository`/`ArtRepository`
//! implementations the scheduler depends on.

pub mod schema;
pub mod sqlite_art_repository;
pub mod sqlite_file_repository;

pub use sqlite_art_repository::SqliteArtRepository;
pub use sqlite_file_repository::SqliteFileRepository;
