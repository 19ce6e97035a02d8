use chrono::{DateTime, Utc};
use sqlx::Row;

use guildkeeper_core::domain::community::{ChannelId, CommunityId};
use guildkeeper_core::domain::welcome::WelcomeSettings;

use super::{decode_error, format_timestamp, RepositoryError, WelcomeRepository};
use crate::DbPool;

pub struct SqlWelcomeRepository {
    pool: DbPool,
}

impl SqlWelcomeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_settings(row: &sqlx::sqlite::SqliteRow) -> Result<WelcomeSettings, RepositoryError> {
    let community_id: String = row.try_get("community_id").map_err(decode_error)?;
    let enabled: bool = row.try_get("enabled").map_err(decode_error)?;
    let title: String = row.try_get("title").map_err(decode_error)?;
    let description: String = row.try_get("description").map_err(decode_error)?;
    let color: i64 = row.try_get("color").map_err(decode_error)?;
    let footer: String = row.try_get("footer").map_err(decode_error)?;
    let show_member_count: bool = row.try_get("show_member_count").map_err(decode_error)?;
    let show_avatar: bool = row.try_get("show_avatar").map_err(decode_error)?;
    let channel_id: Option<String> = row.try_get("channel_id").map_err(decode_error)?;

    let color = u32::try_from(color)
        .map_err(|_| RepositoryError::Decode(format!("welcome color {color} out of range")))?;

    Ok(WelcomeSettings {
        community_id: CommunityId(community_id),
        enabled,
        title,
        description,
        color,
        footer,
        show_member_count,
        show_avatar,
        channel_id: channel_id.map(ChannelId),
    })
}

#[async_trait::async_trait]
impl WelcomeRepository for SqlWelcomeRepository {
    async fn get(
        &self,
        community_id: &CommunityId,
    ) -> Result<Option<WelcomeSettings>, RepositoryError> {
        let row = sqlx::query(
            "SELECT community_id, enabled, title, description, color, footer,
                    show_member_count, show_avatar, channel_id
             FROM welcome_settings WHERE community_id = ?",
        )
        .bind(&community_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_settings).transpose()
    }

    async fn save(&self, settings: WelcomeSettings, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO welcome_settings
                 (community_id, enabled, title, description, color, footer,
                  show_member_count, show_avatar, channel_id, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(community_id) DO UPDATE SET
                 enabled = excluded.enabled,
                 title = excluded.title,
                 description = excluded.description,
                 color = excluded.color,
                 footer = excluded.footer,
                 show_member_count = excluded.show_member_count,
                 show_avatar = excluded.show_avatar,
                 channel_id = excluded.channel_id,
                 updated_at = excluded.updated_at",
        )
        .bind(&settings.community_id.0)
        .bind(settings.enabled)
        .bind(&settings.title)
        .bind(&settings.description)
        .bind(i64::from(settings.color))
        .bind(&settings.footer)
        .bind(settings.show_member_count)
        .bind(settings.show_avatar)
        .bind(settings.channel_id.as_ref().map(|channel| channel.0.as_str()))
        .bind(format_timestamp(at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
