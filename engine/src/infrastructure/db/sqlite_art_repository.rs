// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ArtRepository` against the `albums`/`persons`/`labels` tables (§4.6
//! step 5): a `UNION ALL` over the three kinds, each contributing its own
//! literal [`ArtType`] tag.

use async_trait::async_trait;
use musiclib_domain::{ArtRepository, ArtType, CoreError};
use sqlx::SqlitePool;

#[derive(sqlx::FromRow)]
struct MissingArtRow {
    mbid: String,
    kind: String,
}

pub struct SqliteArtRepository {
    pool: SqlitePool,
}

impl SqliteArtRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtRepository for SqliteArtRepository {
    async fn missing_art(&self) -> Result<Vec<(String, ArtType)>, CoreError> {
        let rows: Vec<MissingArtRow> = sqlx::query_as(
            "SELECT mbid, 'ALBUM' AS kind FROM albums WHERE mbid IS NOT NULL AND picture IS NULL
             UNION ALL
             SELECT mbid, 'ARTIST' AS kind FROM persons WHERE mbid IS NOT NULL AND picture IS NULL
             UNION ALL
             SELECT mbid, 'LABEL' AS kind FROM labels WHERE mbid IS NOT NULL AND picture IS NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| CoreError::internal(format!("missing_art failed: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let art_type = match row.kind.as_str() {
                    "ALBUM" => ArtType::Album,
                    "ARTIST" => ArtType::Artist,
                    "LABEL" => ArtType::Label,
                    other => return Err(CoreError::internal(format!("unrecognized art kind: {other}"))),
                };
                Ok((row.mbid, art_type))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::schema::ensure_schema;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn finds_albums_artists_and_labels_missing_art() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO albums (mbid, picture) VALUES ('album-1', NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO persons (mbid, picture) VALUES ('artist-1', NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO labels (mbid, picture) VALUES ('label-1', NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let repo = SqliteArtRepository::new(pool);
        let mut missing = repo.missing_art().await.unwrap();
        missing.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(
            missing,
            vec![
                ("album-1".to_string(), ArtType::Album),
                ("artist-1".to_string(), ArtType::Artist),
                ("label-1".to_string(), ArtType::Label),
            ]
        );
    }

    #[tokio::test]
    async fn excludes_rows_with_art_or_without_an_mbid() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO albums (mbid, picture) VALUES ('has-art', '/art/cover.jpg')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO albums (mbid, picture) VALUES (NULL, NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let repo = SqliteArtRepository::new(pool);
        assert!(repo.missing_art().await.unwrap().is_empty());
    }
}
