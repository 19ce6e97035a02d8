use chrono::{DateTime, Utc};
use sqlx::Row;

use guildkeeper_core::domain::community::{ChannelId, CommunityId};
use guildkeeper_core::domain::schedule::{Feature, ScheduleConfig, SchedulePayload, TimeOfDay};

use super::{decode_error, format_timestamp, parse_timestamp, RepositoryError, ScheduleRepository};
use crate::DbPool;

pub struct SqlScheduleRepository {
    pool: DbPool,
}

impl SqlScheduleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_schedule(row: &sqlx::sqlite::SqliteRow) -> Result<ScheduleConfig, RepositoryError> {
    let community_id: String = row.try_get("community_id").map_err(decode_error)?;
    let feature: String = row.try_get("feature").map_err(decode_error)?;
    let enabled: bool = row.try_get("enabled").map_err(decode_error)?;
    let channel_id: String = row.try_get("channel_id").map_err(decode_error)?;
    let time_of_day: String = row.try_get("time_of_day").map_err(decode_error)?;
    let payload: String = row.try_get("payload").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    let feature: Feature =
        feature.parse().map_err(|error| RepositoryError::Decode(format!("{error}")))?;
    let time_of_day: TimeOfDay =
        time_of_day.parse().map_err(|error| RepositoryError::Decode(format!("{error}")))?;

    Ok(ScheduleConfig {
        community_id: CommunityId(community_id),
        enabled,
        channel_id: ChannelId(channel_id),
        time_of_day,
        payload: SchedulePayload::decode(feature, &payload),
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait::async_trait]
impl ScheduleRepository for SqlScheduleRepository {
    async fn upsert(&self, schedule: ScheduleConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO schedule_config
                 (community_id, feature, enabled, channel_id, time_of_day, payload, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(community_id, feature) DO UPDATE SET
                 enabled = excluded.enabled,
                 channel_id = excluded.channel_id,
                 time_of_day = excluded.time_of_day,
                 payload = excluded.payload,
                 updated_at = excluded.updated_at",
        )
        .bind(&schedule.community_id.0)
        .bind(schedule.feature().as_str())
        .bind(schedule.enabled)
        .bind(&schedule.channel_id.0)
        .bind(schedule.time_of_day.to_string())
        .bind(schedule.payload.encode())
        .bind(format_timestamp(schedule.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        community_id: &CommunityId,
        feature: Feature,
    ) -> Result<Option<ScheduleConfig>, RepositoryError> {
        let row = sqlx::query(
            "SELECT community_id, feature, enabled, channel_id, time_of_day, payload, updated_at
             FROM schedule_config WHERE community_id = ? AND feature = ?",
        )
        .bind(&community_id.0)
        .bind(feature.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_schedule).transpose()
    }

    async fn set_enabled(
        &self,
        community_id: &CommunityId,
        feature: Feature,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE schedule_config SET enabled = ?, updated_at = ?
             WHERE community_id = ? AND feature = ?",
        )
        .bind(enabled)
        .bind(format_timestamp(at))
        .bind(&community_id.0)
        .bind(feature.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_enabled(&self, feature: Feature) -> Result<Vec<ScheduleConfig>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT community_id, feature, enabled, channel_id, time_of_day, payload, updated_at
             FROM schedule_config
             WHERE feature = ? AND enabled = 1
             ORDER BY community_id ASC",
        )
        .bind(feature.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_schedule).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use guildkeeper_core::domain::community::{ChannelId, CommunityId};
    use guildkeeper_core::domain::schedule::{Feature, ScheduleConfig, SchedulePayload, TimeOfDay};

    use super::SqlScheduleRepository;
    use crate::repositories::test_support::migrated_pool;
    use crate::repositories::ScheduleRepository;

    fn stocks(community: &str, time: &str) -> ScheduleConfig {
        ScheduleConfig {
            community_id: CommunityId(community.to_owned()),
            enabled: true,
            channel_id: ChannelId("c-market".to_owned()),
            time_of_day: time.parse::<TimeOfDay>().expect("time"),
            payload: SchedulePayload::Stocks { indices: vec!["KOSPI".to_owned(), "BTC".to_owned()] },
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_the_previous_schedule() {
        let repo = SqlScheduleRepository::new(migrated_pool().await);
        let community = CommunityId("g-1".to_owned());

        repo.upsert(stocks("g-1", "09:00")).await.expect("first");
        repo.upsert(stocks("g-1", "7:30")).await.expect("second");

        let stored = repo.get(&community, Feature::Stocks).await.expect("get").expect("row");
        assert_eq!(stored.time_of_day.to_string(), "07:30");
        assert_eq!(
            stored.payload,
            SchedulePayload::Stocks { indices: vec!["KOSPI".to_owned(), "BTC".to_owned()] }
        );
        assert_eq!(repo.get(&community, Feature::News).await.expect("get"), None);
    }

    #[tokio::test]
    async fn disabled_schedules_are_not_listed() {
        let repo = SqlScheduleRepository::new(migrated_pool().await);
        repo.upsert(stocks("g-1", "09:00")).await.expect("upsert");
        repo.upsert(stocks("g-2", "10:00")).await.expect("upsert");

        let stopped = repo
            .set_enabled(&CommunityId("g-1".to_owned()), Feature::Stocks, false, Utc::now())
            .await
            .expect("disable");
        assert!(stopped);

        let enabled = repo.list_enabled(Feature::Stocks).await.expect("list");
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].community_id.0, "g-2");
        assert!(repo.list_enabled(Feature::News).await.expect("list").is_empty());

        let missing = repo
            .set_enabled(&CommunityId("g-9".to_owned()), Feature::News, false, Utc::now())
            .await
            .expect("disable");
        assert!(!missing);
    }
}
