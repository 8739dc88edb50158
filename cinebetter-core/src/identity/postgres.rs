use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::repository::{Disposition, IdMapping, IdMappingRepository, RepositoryError};

#[derive(Debug, Clone)]
pub struct PostgresIdMappingRepository {
    pool: PgPool,
}

impl PostgresIdMappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(source_id: &str, kind: &str, tmdb_id: Option<i64>) -> Result<Disposition, RepositoryError> {
        let corrupt = |reason: String| RepositoryError::Corrupt {
            source_id: source_id.to_string(),
            reason,
        };
        let target = || {
            tmdb_id
                .and_then(|id| u64::try_from(id).ok())
                .ok_or_else(|| corrupt(format!("{kind} mapping without a valid tmdb id")))
        };

        match kind {
            "movie" => Ok(Disposition::Movie(target()?)),
            "series" => Ok(Disposition::Series(target()?)),
            "none" => Ok(Disposition::None),
            other => Err(corrupt(format!("unknown kind {other}"))),
        }
    }
}

#[async_trait]
impl IdMappingRepository for PostgresIdMappingRepository {
    async fn find(&self, source_id: &str) -> Result<Option<Disposition>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT kind, tmdb_id
            FROM imdb_tmdb
            WHERE imdb_id = $1
            "#,
        )
        .bind(source_id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let kind: String = row.try_get("kind")?;
        let tmdb_id: Option<i64> = row.try_get("tmdb_id")?;

        Self::map_row(source_id, &kind, tmdb_id).map(Some)
    }

    async fn insert_if_absent(&self, mapping: &IdMapping) -> Result<bool, RepositoryError> {
        let tmdb_id = mapping
            .disposition
            .target_id()
            .map(|id| {
                i64::try_from(id).map_err(|_| RepositoryError::Corrupt {
                    source_id: mapping.source_id.clone(),
                    reason: format!("tmdb id {id} out of range"),
                })
            })
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO imdb_tmdb (imdb_id, kind, tmdb_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (imdb_id) DO NOTHING
            "#,
        )
        .bind(&mapping.source_id)
        .bind(mapping.disposition.kind())
        .bind(tmdb_id)
        .execute(self.pool())
        .await?;

        let created = result.rows_affected() == 1;
        debug!(
            "Identifier mapping {} -> {} ({})",
            mapping.source_id,
            mapping.disposition.kind(),
            if created { "stored" } else { "already present" }
        );
        Ok(created)
    }
}
