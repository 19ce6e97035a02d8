use chrono::{DateTime, Utc};
use sqlx::Row;

use guildkeeper_core::domain::community::{CommunityId, UserId};
use guildkeeper_core::domain::moderation::{NewWarning, Warning};

use super::{decode_error, format_timestamp, parse_timestamp, RepositoryError, WarningRepository};
use crate::DbPool;

pub struct SqlWarningRepository {
    pool: DbPool,
}

impl SqlWarningRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_warning(row: &sqlx::sqlite::SqliteRow) -> Result<Warning, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let community_id: String = row.try_get("community_id").map_err(decode_error)?;
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    let moderator_id: String = row.try_get("moderator_id").map_err(decode_error)?;
    let reason: String = row.try_get("reason").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(Warning {
        id,
        community_id: CommunityId(community_id),
        user_id: UserId(user_id),
        moderator_id: UserId(moderator_id),
        reason,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl WarningRepository for SqlWarningRepository {
    async fn add(&self, warning: NewWarning, at: DateTime<Utc>) -> Result<Warning, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO warning (community_id, user_id, moderator_id, reason, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, community_id, user_id, moderator_id, reason, created_at",
        )
        .bind(&warning.community_id.0)
        .bind(&warning.user_id.0)
        .bind(&warning.moderator_id.0)
        .bind(&warning.reason)
        .bind(format_timestamp(at))
        .fetch_one(&self.pool)
        .await?;

        row_to_warning(&row)
    }

    async fn list(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Warning>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, community_id, user_id, moderator_id, reason, created_at
             FROM warning
             WHERE community_id = ? AND user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(&community_id.0)
        .bind(&user_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_warning).collect()
    }

    async fn count(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM warning WHERE community_id = ? AND user_id = ?")
                .bind(&community_id.0)
                .bind(&user_id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn clear(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM warning WHERE community_id = ? AND user_id = ?")
            .bind(&community_id.0)
            .bind(&user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
