use chrono::{DateTime, Utc};
use sqlx::Row;

use guildkeeper_core::domain::community::{ChannelId, CommunityId};
use guildkeeper_core::domain::watchlist::{AlertConfig, WatchlistEntry, WATCHLIST_CAPACITY};
use guildkeeper_core::errors::DomainError;

use super::{
    decode_error, format_timestamp, parse_timestamp, AlertConfigRepository, RepositoryError,
    WatchlistRepository,
};
use crate::DbPool;

pub struct SqlWatchlistRepository {
    pool: DbPool,
}

impl SqlWatchlistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub struct SqlAlertConfigRepository {
    pool: DbPool,
}

impl SqlAlertConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<WatchlistEntry, RepositoryError> {
    let community_id: String = row.try_get("community_id").map_err(decode_error)?;
    let ticker: String = row.try_get("ticker").map_err(decode_error)?;
    let display_name: String = row.try_get("display_name").map_err(decode_error)?;
    let last_price: Option<f64> = row.try_get("last_price").map_err(decode_error)?;
    let last_change_percent: f64 = row.try_get("last_change_percent").map_err(decode_error)?;
    let added_at: String = row.try_get("added_at").map_err(decode_error)?;

    Ok(WatchlistEntry {
        community_id: CommunityId(community_id),
        ticker,
        display_name,
        last_price,
        last_change_percent,
        added_at: parse_timestamp(&added_at)?,
    })
}

fn row_to_alert_config(row: &sqlx::sqlite::SqliteRow) -> Result<AlertConfig, RepositoryError> {
    let community_id: String = row.try_get("community_id").map_err(decode_error)?;
    let enabled: bool = row.try_get("enabled").map_err(decode_error)?;
    let channel_id: String = row.try_get("channel_id").map_err(decode_error)?;
    let threshold_percent: f64 = row.try_get("threshold_percent").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    Ok(AlertConfig {
        community_id: CommunityId(community_id),
        enabled,
        channel_id: ChannelId(channel_id),
        threshold_percent,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait::async_trait]
impl WatchlistRepository for SqlWatchlistRepository {
    async fn add(&self, entry: WatchlistEntry) -> Result<(), RepositoryError> {
        // Capacity check and insert are one statement so concurrent adds cannot overshoot.
        let result = sqlx::query(
            "INSERT INTO watchlist_entry
                 (community_id, ticker, display_name, last_price, last_change_percent, added_at)
             SELECT ?, ?, ?, ?, ?, ?
             WHERE (SELECT COUNT(*) FROM watchlist_entry WHERE community_id = ?) < ?
             ON CONFLICT(community_id, ticker) DO NOTHING",
        )
        .bind(&entry.community_id.0)
        .bind(&entry.ticker)
        .bind(&entry.display_name)
        .bind(entry.last_price)
        .bind(entry.last_change_percent)
        .bind(format_timestamp(entry.added_at))
        .bind(&entry.community_id.0)
        .bind(WATCHLIST_CAPACITY as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM watchlist_entry WHERE community_id = ? AND ticker = ?",
        )
        .bind(&entry.community_id.0)
        .bind(&entry.ticker)
        .fetch_one(&self.pool)
        .await?;

        if exists > 0 {
            Err(DomainError::Duplicate(format!("{} is already on the watchlist", entry.ticker)).into())
        } else {
            Err(DomainError::CapacityExceeded { what: "watchlist entries", limit: WATCHLIST_CAPACITY }
                .into())
        }
    }

    async fn remove(
        &self,
        community_id: &CommunityId,
        ticker: &str,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM watchlist_entry WHERE community_id = ? AND ticker = ?")
                .bind(&community_id.0)
                .bind(ticker)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, community_id: &CommunityId) -> Result<Vec<WatchlistEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT community_id, ticker, display_name, last_price, last_change_percent, added_at
             FROM watchlist_entry
             WHERE community_id = ?
             ORDER BY id ASC",
        )
        .bind(&community_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn update_snapshot(
        &self,
        community_id: &CommunityId,
        ticker: &str,
        price: f64,
        change_percent: f64,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE watchlist_entry SET last_price = ?, last_change_percent = ?
             WHERE community_id = ? AND ticker = ?",
        )
        .bind(price)
        .bind(change_percent)
        .bind(&community_id.0)
        .bind(ticker)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, community_id: &CommunityId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM watchlist_entry WHERE community_id = ?")
                .bind(&community_id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl AlertConfigRepository for SqlAlertConfigRepository {
    async fn upsert(&self, config: AlertConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO alert_config (community_id, enabled, channel_id, threshold_percent, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(community_id) DO UPDATE SET
                 enabled = excluded.enabled,
                 channel_id = excluded.channel_id,
                 threshold_percent = excluded.threshold_percent,
                 updated_at = excluded.updated_at",
        )
        .bind(&config.community_id.0)
        .bind(config.enabled)
        .bind(&config.channel_id.0)
        .bind(config.threshold_percent)
        .bind(format_timestamp(config.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, community_id: &CommunityId) -> Result<Option<AlertConfig>, RepositoryError> {
        let row = sqlx::query(
            "SELECT community_id, enabled, channel_id, threshold_percent, updated_at
             FROM alert_config WHERE community_id = ?",
        )
        .bind(&community_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_alert_config).transpose()
    }

    async fn set_enabled(
        &self,
        community_id: &CommunityId,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE alert_config SET enabled = ?, updated_at = ? WHERE community_id = ?",
        )
        .bind(enabled)
        .bind(format_timestamp(at))
        .bind(&community_id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_enabled(&self) -> Result<Vec<AlertConfig>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT community_id, enabled, channel_id, threshold_percent, updated_at
             FROM alert_config
             WHERE enabled = 1
             ORDER BY community_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_alert_config).collect()
    }
}
