// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Schema migrations for the sqlite-backed repositories.
//!
//! Applies pending migrations on start-up so a fresh database file and a
//! long-lived one converge on the same schema.

use sqlx::migrate::MigrateDatabase;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations (`engine/migrations/`) against `pool`.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("applying pending migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database schema is up to date");
    Ok(())
}

/// Creates the sqlite database file at `database_url` if it doesn't exist.
/// `SqlitePool::connect` otherwise fails outright against a missing file.
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if !sqlx::Sqlite::database_exists(database_url).await? {
        debug!(url = database_url, "creating sqlite database");
        sqlx::Sqlite::create_database(database_url).await?;
    }
    Ok(())
}

/// Connects to `database_url`, creating the file and applying migrations
/// first if needed. The one-stop entry point `main` uses at startup.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    create_database_if_missing(database_url).await?;
    let pool = SqlitePool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}
