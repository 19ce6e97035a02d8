use chrono::{DateTime, Utc};
use sqlx::Row;

use guildkeeper_core::domain::community::{CommunityId, UserId};
use guildkeeper_core::domain::xp::{LeaderboardEntry, XpRecord};
use guildkeeper_core::errors::DomainError;
use guildkeeper_core::leveling::{level_for_xp, validate_level, xp_threshold};

use super::{decode_error, format_timestamp, parse_timestamp, RepositoryError, XpLedger};
use crate::DbPool;

pub struct SqlXpLedger {
    pool: DbPool,
}

impl SqlXpLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<XpRecord, RepositoryError> {
    let community_id: String = row.try_get("community_id").map_err(decode_error)?;
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    let xp: i64 = row.try_get("xp").map_err(decode_error)?;
    let level: i64 = row.try_get("level").map_err(decode_error)?;
    let total_messages: i64 = row.try_get("total_messages").map_err(decode_error)?;
    let last_grant_at: Option<String> = row.try_get("last_grant_at").map_err(decode_error)?;

    Ok(XpRecord {
        community_id: CommunityId(community_id),
        user_id: UserId(user_id),
        xp,
        level,
        total_messages,
        last_grant_at: last_grant_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LeaderboardEntry, RepositoryError> {
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    Ok(LeaderboardEntry {
        user_id: UserId(user_id),
        xp: row.try_get("xp").map_err(decode_error)?,
        level: row.try_get("level").map_err(decode_error)?,
        total_messages: row.try_get("total_messages").map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl XpLedger for SqlXpLedger {
    async fn grant(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<i64>, RepositoryError> {
        if amount < 0 {
            return Err(DomainError::InvalidArgument(format!(
                "xp amount must be 0 or greater (got {amount})"
            ))
            .into());
        }

        let mut tx = self.pool.begin().await?;

        // The write lock is taken by the first statement, so the increment and the level
        // recomputation below see no interleaved grant.
        let row = sqlx::query(
            "INSERT INTO xp_record (community_id, user_id, xp, level, total_messages, last_grant_at)
             VALUES (?, ?, ?, 0, 1, ?)
             ON CONFLICT(community_id, user_id) DO UPDATE SET
                 xp = xp + excluded.xp,
                 total_messages = total_messages + 1,
                 last_grant_at = excluded.last_grant_at
             RETURNING xp, level",
        )
        .bind(&community_id.0)
        .bind(&user_id.0)
        .bind(amount)
        .bind(format_timestamp(at))
        .fetch_one(&mut *tx)
        .await?;

        let xp: i64 = row.try_get("xp").map_err(decode_error)?;
        let previous_level: i64 = row.try_get("level").map_err(decode_error)?;
        let level = level_for_xp(xp);

        if level != previous_level {
            sqlx::query("UPDATE xp_record SET level = ? WHERE community_id = ? AND user_id = ?")
                .bind(level)
                .bind(&community_id.0)
                .bind(&user_id.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok((level > previous_level).then_some(level))
    }

    async fn set_level(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        level: i64,
    ) -> Result<XpRecord, RepositoryError> {
        let level = validate_level(level)?;
        let xp = xp_threshold(level);

        let row = sqlx::query(
            "INSERT INTO xp_record (community_id, user_id, xp, level, total_messages, last_grant_at)
             VALUES (?, ?, ?, ?, 0, NULL)
             ON CONFLICT(community_id, user_id) DO UPDATE SET
                 xp = excluded.xp,
                 level = excluded.level
             RETURNING community_id, user_id, xp, level, total_messages, last_grant_at",
        )
        .bind(&community_id.0)
        .bind(&user_id.0)
        .bind(xp)
        .bind(level)
        .fetch_one(&self.pool)
        .await?;

        row_to_record(&row)
    }

    async fn record(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<XpRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT community_id, user_id, xp, level, total_messages, last_grant_at
             FROM xp_record WHERE community_id = ? AND user_id = ?",
        )
        .bind(&community_id.0)
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn leaderboard(
        &self,
        community_id: &CommunityId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id, xp, level, total_messages
             FROM xp_record
             WHERE community_id = ?
             ORDER BY xp DESC, rowid ASC
             LIMIT ? OFFSET ?",
        )
        .bind(&community_id.0)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn member_count(&self, community_id: &CommunityId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM xp_record WHERE community_id = ?")
            .bind(&community_id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn rank(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<i64>, RepositoryError> {
        let rank: Option<i64> = sqlx::query_scalar(
            "SELECT 1 + (
                 SELECT COUNT(*) FROM xp_record other
                 WHERE other.community_id = target.community_id AND other.xp > target.xp
             )
             FROM xp_record target
             WHERE target.community_id = ? AND target.user_id = ?",
        )
        .bind(&community_id.0)
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rank)
    }
}
