use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use guildkeeper_core::domain::community::{CommunityId, MessageId, RoleId, UserId};
use guildkeeper_core::domain::moderation::{NewWarning, Warning};
use guildkeeper_core::domain::roles::ReactionRole;
use guildkeeper_core::domain::schedule::{Feature, ScheduleConfig};
use guildkeeper_core::domain::watchlist::{AlertConfig, WatchlistEntry, WATCHLIST_CAPACITY};
use guildkeeper_core::domain::welcome::WelcomeSettings;
use guildkeeper_core::domain::xp::{LeaderboardEntry, XpRecord};
use guildkeeper_core::errors::DomainError;
use guildkeeper_core::leveling::{level_for_xp, validate_level, xp_threshold};

use super::{
    AlertConfigRepository, RepositoryError, RoleRepository, ScheduleRepository, WarningRepository,
    WatchlistRepository, WelcomeRepository, XpLedger,
};

/// Records stay in first-insert order so leaderboard ties break the same way as `rowid`.
#[derive(Default)]
pub struct InMemoryXpLedger {
    records: RwLock<Vec<XpRecord>>,
}

impl InMemoryXpLedger {
    fn position(records: &[XpRecord], community_id: &CommunityId, user_id: &UserId) -> Option<usize> {
        records
            .iter()
            .position(|record| record.community_id == *community_id && record.user_id == *user_id)
    }

    fn sorted(records: &[XpRecord], community_id: &CommunityId) -> Vec<XpRecord> {
        let mut members: Vec<XpRecord> =
            records.iter().filter(|record| record.community_id == *community_id).cloned().collect();
        // Stable sort keeps insertion order among equal xp.
        members.sort_by(|left, right| right.xp.cmp(&left.xp));
        members
    }
}

#[async_trait::async_trait]
impl XpLedger for InMemoryXpLedger {
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

        let mut records = self.records.write().await;
        let index = match Self::position(&records, community_id, user_id) {
            Some(index) => index,
            None => {
                records.push(XpRecord {
                    community_id: community_id.clone(),
                    user_id: user_id.clone(),
                    xp: 0,
                    level: 0,
                    total_messages: 0,
                    last_grant_at: None,
                });
                records.len() - 1
            }
        };

        let record = &mut records[index];
        let previous_level = record.level;
        record.xp = record.xp.saturating_add(amount);
        record.total_messages += 1;
        record.last_grant_at = Some(at);
        record.level = level_for_xp(record.xp);

        Ok((record.level > previous_level).then_some(record.level))
    }

    async fn set_level(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        level: i64,
    ) -> Result<XpRecord, RepositoryError> {
        let level = validate_level(level)?;
        let mut records = self.records.write().await;
        match Self::position(&records, community_id, user_id) {
            Some(index) => {
                records[index].level = level;
                records[index].xp = xp_threshold(level);
                Ok(records[index].clone())
            }
            None => {
                let record = XpRecord {
                    community_id: community_id.clone(),
                    user_id: user_id.clone(),
                    xp: xp_threshold(level),
                    level,
                    total_messages: 0,
                    last_grant_at: None,
                };
                records.push(record.clone());
                Ok(record)
            }
        }
    }

    async fn record(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<XpRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(Self::position(&records, community_id, user_id).map(|index| records[index].clone()))
    }

    async fn leaderboard(
        &self,
        community_id: &CommunityId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, RepositoryError> {
        let records = self.records.read().await;
        Ok(Self::sorted(&records, community_id)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(LeaderboardEntry::from)
            .collect())
    }

    async fn member_count(&self, community_id: &CommunityId) -> Result<i64, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|record| record.community_id == *community_id).count() as i64)
    }

    async fn rank(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<i64>, RepositoryError> {
        let records = self.records.read().await;
        let Some(index) = Self::position(&records, community_id, user_id) else {
            return Ok(None);
        };
        let xp = records[index].xp;
        let ahead = records
            .iter()
            .filter(|record| record.community_id == *community_id && record.xp > xp)
            .count() as i64;
        Ok(Some(ahead + 1))
    }
}

#[derive(Default)]
pub struct InMemoryWarningRepository {
    warnings: RwLock<Vec<Warning>>,
}

#[async_trait::async_trait]
impl WarningRepository for InMemoryWarningRepository {
    async fn add(&self, warning: NewWarning, at: DateTime<Utc>) -> Result<Warning, RepositoryError> {
        let mut warnings = self.warnings.write().await;
        let id = warnings.iter().map(|existing| existing.id).max().unwrap_or(0) + 1;
        let stored = Warning {
            id,
            community_id: warning.community_id,
            user_id: warning.user_id,
            moderator_id: warning.moderator_id,
            reason: warning.reason,
            created_at: at,
        };
        warnings.push(stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Warning>, RepositoryError> {
        let warnings = self.warnings.read().await;
        let mut matching: Vec<Warning> = warnings
            .iter()
            .filter(|warning| warning.community_id == *community_id && warning.user_id == *user_id)
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then(right.id.cmp(&left.id))
        });
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn count(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<i64, RepositoryError> {
        let warnings = self.warnings.read().await;
        Ok(warnings
            .iter()
            .filter(|warning| warning.community_id == *community_id && warning.user_id == *user_id)
            .count() as i64)
    }

    async fn clear(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<u64, RepositoryError> {
        let mut warnings = self.warnings.write().await;
        let before = warnings.len();
        warnings.retain(|warning| {
            !(warning.community_id == *community_id && warning.user_id == *user_id)
        });
        Ok((before - warnings.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryScheduleRepository {
    schedules: RwLock<HashMap<(String, Feature), ScheduleConfig>>,
}

#[async_trait::async_trait]
impl ScheduleRepository for InMemoryScheduleRepository {
    async fn upsert(&self, schedule: ScheduleConfig) -> Result<(), RepositoryError> {
        let mut schedules = self.schedules.write().await;
        schedules.insert((schedule.community_id.0.clone(), schedule.feature()), schedule);
        Ok(())
    }

    async fn get(
        &self,
        community_id: &CommunityId,
        feature: Feature,
    ) -> Result<Option<ScheduleConfig>, RepositoryError> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&(community_id.0.clone(), feature)).cloned())
    }

    async fn set_enabled(
        &self,
        community_id: &CommunityId,
        feature: Feature,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut schedules = self.schedules.write().await;
        match schedules.get_mut(&(community_id.0.clone(), feature)) {
            Some(schedule) => {
                schedule.enabled = enabled;
                schedule.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_enabled(&self, feature: Feature) -> Result<Vec<ScheduleConfig>, RepositoryError> {
        let schedules = self.schedules.read().await;
        let mut enabled: Vec<ScheduleConfig> = schedules
            .values()
            .filter(|schedule| schedule.enabled && schedule.feature() == feature)
            .cloned()
            .collect();
        enabled.sort_by(|left, right| left.community_id.0.cmp(&right.community_id.0));
        Ok(enabled)
    }
}

#[derive(Default)]
pub struct InMemoryAlertConfigRepository {
    configs: RwLock<HashMap<String, AlertConfig>>,
}

#[async_trait::async_trait]
impl AlertConfigRepository for InMemoryAlertConfigRepository {
    async fn upsert(&self, config: AlertConfig) -> Result<(), RepositoryError> {
        let mut configs = self.configs.write().await;
        configs.insert(config.community_id.0.clone(), config);
        Ok(())
    }

    async fn get(&self, community_id: &CommunityId) -> Result<Option<AlertConfig>, RepositoryError> {
        let configs = self.configs.read().await;
        Ok(configs.get(&community_id.0).cloned())
    }

    async fn set_enabled(
        &self,
        community_id: &CommunityId,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut configs = self.configs.write().await;
        match configs.get_mut(&community_id.0) {
            Some(config) => {
                config.enabled = enabled;
                config.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_enabled(&self) -> Result<Vec<AlertConfig>, RepositoryError> {
        let configs = self.configs.read().await;
        let mut enabled: Vec<AlertConfig> =
            configs.values().filter(|config| config.enabled).cloned().collect();
        enabled.sort_by(|left, right| left.community_id.0.cmp(&right.community_id.0));
        Ok(enabled)
    }
}

#[derive(Default)]
pub struct InMemoryWatchlistRepository {
    entries: RwLock<Vec<WatchlistEntry>>,
}

#[async_trait::async_trait]
impl WatchlistRepository for InMemoryWatchlistRepository {
    async fn add(&self, entry: WatchlistEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        let mut held = 0;
        for existing in entries.iter().filter(|existing| existing.community_id == entry.community_id) {
            if existing.ticker == entry.ticker {
                return Err(DomainError::Duplicate(format!(
                    "{} is already on the watchlist",
                    entry.ticker
                ))
                .into());
            }
            held += 1;
        }
        if held >= WATCHLIST_CAPACITY {
            return Err(DomainError::CapacityExceeded {
                what: "watchlist entries",
                limit: WATCHLIST_CAPACITY,
            }
            .into());
        }
        entries.push(entry);
        Ok(())
    }

    async fn remove(
        &self,
        community_id: &CommunityId,
        ticker: &str,
    ) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| !(entry.community_id == *community_id && entry.ticker == ticker));
        Ok(entries.len() != before)
    }

    async fn list(&self, community_id: &CommunityId) -> Result<Vec<WatchlistEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|entry| entry.community_id == *community_id).cloned().collect())
    }

    async fn update_snapshot(
        &self,
        community_id: &CommunityId,
        ticker: &str,
        price: f64,
        change_percent: f64,
    ) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        match entries
            .iter_mut()
            .find(|entry| entry.community_id == *community_id && entry.ticker == ticker)
        {
            Some(entry) => {
                entry.last_price = Some(price);
                entry.last_change_percent = change_percent;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self, community_id: &CommunityId) -> Result<i64, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|entry| entry.community_id == *community_id).count() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryRoleRepository {
    auto_roles: RwLock<HashMap<String, RoleId>>,
    reaction_roles: RwLock<Vec<ReactionRole>>,
}

#[async_trait::async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn set_auto_role(
        &self,
        community_id: &CommunityId,
        role_id: &RoleId,
        _at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut auto_roles = self.auto_roles.write().await;
        auto_roles.insert(community_id.0.clone(), role_id.clone());
        Ok(())
    }

    async fn auto_role(&self, community_id: &CommunityId) -> Result<Option<RoleId>, RepositoryError> {
        let auto_roles = self.auto_roles.read().await;
        Ok(auto_roles.get(&community_id.0).cloned())
    }

    async fn clear_auto_role(&self, community_id: &CommunityId) -> Result<bool, RepositoryError> {
        let mut auto_roles = self.auto_roles.write().await;
        Ok(auto_roles.remove(&community_id.0).is_some())
    }

    async fn add_reaction_role(&self, mapping: ReactionRole) -> Result<(), RepositoryError> {
        let mut reaction_roles = self.reaction_roles.write().await;
        if reaction_roles
            .iter()
            .any(|existing| existing.message_id == mapping.message_id && existing.emoji == mapping.emoji)
        {
            return Err(DomainError::Duplicate(format!(
                "{} is already mapped on message {}",
                mapping.emoji, mapping.message_id.0
            ))
            .into());
        }
        reaction_roles.push(mapping);
        Ok(())
    }

    async fn reaction_role(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<Option<ReactionRole>, RepositoryError> {
        let reaction_roles = self.reaction_roles.read().await;
        Ok(reaction_roles
            .iter()
            .find(|mapping| mapping.message_id == *message_id && mapping.emoji == emoji)
            .cloned())
    }

    async fn remove_reaction_role(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<bool, RepositoryError> {
        let mut reaction_roles = self.reaction_roles.write().await;
        let before = reaction_roles.len();
        reaction_roles.retain(|mapping| !(mapping.message_id == *message_id && mapping.emoji == emoji));
        Ok(reaction_roles.len() != before)
    }

    async fn list_reaction_roles(
        &self,
        community_id: &CommunityId,
    ) -> Result<Vec<ReactionRole>, RepositoryError> {
        let reaction_roles = self.reaction_roles.read().await;
        Ok(reaction_roles
            .iter()
            .filter(|mapping| mapping.community_id == *community_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryWelcomeRepository {
    settings: RwLock<HashMap<String, WelcomeSettings>>,
}

#[async_trait::async_trait]
impl WelcomeRepository for InMemoryWelcomeRepository {
    async fn get(
        &self,
        community_id: &CommunityId,
    ) -> Result<Option<WelcomeSettings>, RepositoryError> {
        let settings = self.settings.read().await;
        Ok(settings.get(&community_id.0).cloned())
    }

    async fn save(&self, settings: WelcomeSettings, _at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut stored = self.settings.write().await;
        stored.insert(settings.community_id.0.clone(), settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use guildkeeper_core::domain::community::{CommunityId, UserId};
    use guildkeeper_core::domain::watchlist::WatchlistEntry;
    use guildkeeper_core::errors::DomainError;

    use crate::repositories::{
        InMemoryWatchlistRepository, InMemoryXpLedger, RepositoryError, WatchlistRepository,
        XpLedger,
    };

    #[tokio::test]
    async fn in_memory_ledger_matches_sql_ordering_and_rank() {
        let ledger = InMemoryXpLedger::default();
        let community = CommunityId("g-1".to_owned());
        let now = Utc::now();

        ledger.grant(&community, &UserId("early".to_owned()), 50, now).await.expect("grant");
        ledger.grant(&community, &UserId("late".to_owned()), 50, now).await.expect("grant");
        ledger.grant(&community, &UserId("top".to_owned()), 200, now).await.expect("grant");

        let order: Vec<_> = ledger
            .leaderboard(&community, 10, 0)
            .await
            .expect("leaderboard")
            .into_iter()
            .map(|entry| entry.user_id.0)
            .collect();
        assert_eq!(order, vec!["top", "early", "late"]);

        assert_eq!(ledger.rank(&community, &UserId("late".to_owned())).await.expect("rank"), Some(2));
        assert_eq!(ledger.rank(&community, &UserId("nobody".to_owned())).await.expect("rank"), None);
    }

    #[tokio::test]
    async fn in_memory_ledger_reports_level_up_once() {
        let ledger = InMemoryXpLedger::default();
        let community = CommunityId("g-1".to_owned());
        let user = UserId("u-1".to_owned());

        assert_eq!(ledger.grant(&community, &user, 150, Utc::now()).await.expect("grant"), None);
        assert_eq!(ledger.grant(&community, &user, 10, Utc::now()).await.expect("grant"), Some(1));
        assert_eq!(ledger.grant(&community, &user, 10, Utc::now()).await.expect("grant"), None);
    }

    #[tokio::test]
    async fn in_memory_watchlist_enforces_capacity_and_uniqueness() {
        let repo = InMemoryWatchlistRepository::default();
        let entry = |ticker: &str| WatchlistEntry {
            community_id: CommunityId("g-1".to_owned()),
            ticker: ticker.to_owned(),
            display_name: ticker.to_owned(),
            last_price: None,
            last_change_percent: 0.0,
            added_at: Utc::now(),
        };

        for index in 0..10 {
            repo.add(entry(&format!("T{index}"))).await.expect("add");
        }
        assert!(matches!(
            repo.add(entry("T0")).await,
            Err(RepositoryError::Domain(DomainError::Duplicate(_)))
        ));
        assert!(matches!(
            repo.add(entry("NEW")).await,
            Err(RepositoryError::Domain(DomainError::CapacityExceeded { .. }))
        ));
    }
}
