use chrono::{DateTime, Utc};
use sqlx::Row;

use guildkeeper_core::domain::community::{CommunityId, MessageId, RoleId};
use guildkeeper_core::domain::roles::ReactionRole;
use guildkeeper_core::errors::DomainError;

use super::{decode_error, format_timestamp, parse_timestamp, RepositoryError, RoleRepository};
use crate::DbPool;

pub struct SqlRoleRepository {
    pool: DbPool,
}

impl SqlRoleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_reaction_role(row: &sqlx::sqlite::SqliteRow) -> Result<ReactionRole, RepositoryError> {
    let community_id: String = row.try_get("community_id").map_err(decode_error)?;
    let message_id: String = row.try_get("message_id").map_err(decode_error)?;
    let emoji: String = row.try_get("emoji").map_err(decode_error)?;
    let role_id: String = row.try_get("role_id").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(ReactionRole {
        community_id: CommunityId(community_id),
        message_id: MessageId(message_id),
        emoji,
        role_id: RoleId(role_id),
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl RoleRepository for SqlRoleRepository {
    async fn set_auto_role(
        &self,
        community_id: &CommunityId,
        role_id: &RoleId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO auto_role (community_id, role_id, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(community_id) DO UPDATE SET
                 role_id = excluded.role_id,
                 updated_at = excluded.updated_at",
        )
        .bind(&community_id.0)
        .bind(&role_id.0)
        .bind(format_timestamp(at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn auto_role(&self, community_id: &CommunityId) -> Result<Option<RoleId>, RepositoryError> {
        let role_id: Option<String> =
            sqlx::query_scalar("SELECT role_id FROM auto_role WHERE community_id = ?")
                .bind(&community_id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(role_id.map(RoleId))
    }

    async fn clear_auto_role(&self, community_id: &CommunityId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM auto_role WHERE community_id = ?")
            .bind(&community_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_reaction_role(&self, mapping: ReactionRole) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO reaction_role (community_id, message_id, emoji, role_id, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(message_id, emoji) DO NOTHING",
        )
        .bind(&mapping.community_id.0)
        .bind(&mapping.message_id.0)
        .bind(&mapping.emoji)
        .bind(&mapping.role_id.0)
        .bind(format_timestamp(mapping.created_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Duplicate(format!(
                "{} is already mapped on message {}",
                mapping.emoji, mapping.message_id.0
            ))
            .into());
        }
        Ok(())
    }

    async fn reaction_role(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<Option<ReactionRole>, RepositoryError> {
        let row = sqlx::query(
            "SELECT community_id, message_id, emoji, role_id, created_at
             FROM reaction_role WHERE message_id = ? AND emoji = ?",
        )
        .bind(&message_id.0)
        .bind(emoji)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_reaction_role).transpose()
    }

    async fn remove_reaction_role(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reaction_role WHERE message_id = ? AND emoji = ?")
            .bind(&message_id.0)
            .bind(emoji)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reaction_roles(
        &self,
        community_id: &CommunityId,
    ) -> Result<Vec<ReactionRole>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT community_id, message_id, emoji, role_id, created_at
             FROM reaction_role WHERE community_id = ? ORDER BY id ASC",
        )
        .bind(&community_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reaction_role).collect()
    }
}
