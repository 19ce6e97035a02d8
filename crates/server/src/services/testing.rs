//! Scripted collaborators for service, scheduler and monitor tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use guildkeeper_chat::commands::{CommandContext, Permission};
use guildkeeper_chat::messages::OutgoingMessage;
use guildkeeper_chat::platform::{ChannelInfo, ChatPlatform, PlatformError};
use guildkeeper_core::clock::ManualClock;
use guildkeeper_core::config::AppConfig;
use guildkeeper_core::domain::community::{
    ChannelId, Community, CommunityId, Member, MessageId, Role, RoleId, UserId,
};
use guildkeeper_core::domain::watchlist::QuoteSnapshot;
use guildkeeper_core::feeds::{FeedItem, FeedSource, FetchError, QuoteSource};
use guildkeeper_db::repositories::{
    InMemoryAlertConfigRepository, InMemoryRoleRepository, InMemoryScheduleRepository,
    InMemoryWarningRepository, InMemoryWatchlistRepository, InMemoryWelcomeRepository,
    InMemoryXpLedger,
};

use super::{BotServices, Repositories};

pub const COMMUNITY: &str = "g-1";
pub const CHANNEL: &str = "c-1";
pub const BOT_POSITION: i64 = 50;

pub fn community_id() -> CommunityId {
    CommunityId(COMMUNITY.to_owned())
}

pub fn member(id: &str, top_role_position: i64) -> Member {
    Member {
        user_id: UserId(id.to_owned()),
        display_name: id.to_owned(),
        is_bot: false,
        role_ids: Vec::new(),
        top_role_position,
        avatar_url: Some(format!("https://cdn.example/{id}.png")),
        joined_at: None,
    }
}

pub fn context(invoker: Member) -> CommandContext {
    CommandContext {
        community_id: community_id(),
        channel_id: ChannelId(CHANNEL.to_owned()),
        invoker,
        permissions: vec![Permission::Administrator],
        request_id: "req-test".to_owned(),
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 59, 30).single().expect("valid instant")
}

#[derive(Debug, Default)]
pub struct FakePlatform {
    members: Mutex<HashMap<UserId, Member>>,
    roles: Mutex<HashMap<RoleId, Role>>,
    broken_channels: Mutex<HashSet<ChannelId>>,
    delivered: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
    direct: Mutex<Vec<(UserId, OutgoingMessage)>>,
    actions: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn with_member(self, member: Member) -> Self {
        self.members.lock().expect("lock").insert(member.user_id.clone(), member);
        self
    }

    pub fn with_role(self, id: &str, position: i64) -> Self {
        let role =
            Role { id: RoleId(id.to_owned()), name: format!("role-{id}"), position, managed: false };
        self.roles.lock().expect("lock").insert(role.id.clone(), role);
        self
    }

    pub fn break_channel(&self, channel: &str) {
        self.broken_channels.lock().expect("lock").insert(ChannelId(channel.to_owned()));
    }

    pub fn delivered(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.delivered.lock().expect("lock").clone()
    }

    pub fn direct(&self) -> Vec<(UserId, OutgoingMessage)> {
        self.direct.lock().expect("lock").clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().expect("lock").clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().expect("lock").push(action);
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn deliver(
        &self,
        channel_id: &ChannelId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        if self.broken_channels.lock().expect("lock").contains(channel_id) {
            return Err(PlatformError::NotFound(format!("channel {channel_id}")));
        }
        let mut delivered = self.delivered.lock().expect("lock");
        delivered.push((channel_id.clone(), message.clone()));
        Ok(MessageId(format!("m-{}", delivered.len())))
    }

    async fn send_direct(
        &self,
        user_id: &UserId,
        message: &OutgoingMessage,
    ) -> Result<(), PlatformError> {
        self.direct.lock().expect("lock").push((user_id.clone(), message.clone()));
        Ok(())
    }

    async fn community(&self, community_id: &CommunityId) -> Result<Community, PlatformError> {
        Ok(Community {
            id: community_id.clone(),
            name: "Test Guild".to_owned(),
            member_count: 42,
            owner_id: UserId("owner".to_owned()),
            system_channel_id: Some(ChannelId("system".to_owned())),
        })
    }

    async fn member(
        &self,
        _community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Member, PlatformError> {
        self.members
            .lock()
            .expect("lock")
            .get(user_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("member {user_id}")))
    }

    async fn bot_member(&self, _community_id: &CommunityId) -> Result<Member, PlatformError> {
        let mut bot = member("bot", BOT_POSITION);
        bot.is_bot = true;
        Ok(bot)
    }

    async fn channel(&self, channel_id: &ChannelId) -> Result<ChannelInfo, PlatformError> {
        if self.broken_channels.lock().expect("lock").contains(channel_id) {
            return Err(PlatformError::NotFound(format!("channel {channel_id}")));
        }
        Ok(ChannelInfo {
            id: channel_id.clone(),
            name: format!("channel-{channel_id}"),
            community_id: Some(community_id()),
        })
    }

    async fn role(&self, _community_id: &CommunityId, role_id: &RoleId) -> Result<Role, PlatformError> {
        self.roles
            .lock()
            .expect("lock")
            .get(role_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("role {role_id}")))
    }

    async fn add_role(
        &self,
        _community_id: &CommunityId,
        user_id: &UserId,
        role_id: &RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(format!("add_role {user_id} {role_id}"));
        Ok(())
    }

    async fn remove_role(
        &self,
        _community_id: &CommunityId,
        user_id: &UserId,
        role_id: &RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(format!("remove_role {user_id} {role_id}"));
        Ok(())
    }

    async fn kick(
        &self,
        _community_id: &CommunityId,
        user_id: &UserId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(format!("kick {user_id}"));
        Ok(())
    }

    async fn ban(
        &self,
        _community_id: &CommunityId,
        user_id: &UserId,
        _reason: &str,
        delete_message_days: i64,
    ) -> Result<(), PlatformError> {
        self.record(format!("ban {user_id} {delete_message_days}"));
        Ok(())
    }

    async fn unban(&self, _community_id: &CommunityId, user_id: &UserId) -> Result<(), PlatformError> {
        self.record(format!("unban {user_id}"));
        Ok(())
    }

    async fn timeout(
        &self,
        _community_id: &CommunityId,
        user_id: &UserId,
        until: DateTime<Utc>,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(format!("timeout {user_id} {}", until.to_rfc3339()));
        Ok(())
    }

    async fn remove_timeout(
        &self,
        _community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<(), PlatformError> {
        self.record(format!("untimeout {user_id}"));
        Ok(())
    }

    async fn purge(&self, channel_id: &ChannelId, amount: u32) -> Result<u32, PlatformError> {
        self.record(format!("purge {channel_id} {amount}"));
        Ok(amount)
    }

    async fn add_reaction(
        &self,
        _channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.record(format!("react {message_id} {emoji}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticFeed {
    items: Mutex<Vec<FeedItem>>,
    requests: Mutex<Vec<(String, usize)>>,
}

impl StaticFeed {
    pub fn set_items(&self, titles: &[&str]) {
        *self.items.lock().expect("lock") = titles
            .iter()
            .enumerate()
            .map(|(index, title)| FeedItem {
                title: (*title).to_owned(),
                link: format!("https://news.example/{index}"),
                published_at: None,
                summary: String::new(),
            })
            .collect();
    }

    pub fn requests(&self) -> Vec<(String, usize)> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self, feed_url: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        self.requests.lock().expect("lock").push((feed_url.to_owned(), limit));
        let items = self.items.lock().expect("lock");
        if items.is_empty() {
            return Err(FetchError::Empty(feed_url.to_owned()));
        }
        Ok(items.iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub struct StaticQuotes {
    quotes: Mutex<HashMap<String, QuoteSnapshot>>,
    names: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl StaticQuotes {
    pub fn set(&self, ticker: &str, price: f64, change_percent: f64) {
        let change = price * change_percent / 100.0;
        self.quotes.lock().expect("lock").insert(
            ticker.to_owned(),
            QuoteSnapshot { ticker: ticker.to_owned(), price, change, change_percent },
        );
    }

    pub fn remove(&self, ticker: &str) {
        self.quotes.lock().expect("lock").remove(ticker);
    }

    pub fn name(&self, ticker: &str, name: &str) {
        self.names.lock().expect("lock").insert(ticker.to_owned(), name.to_owned());
    }

    /// Tickers asked for so far, snapshot and name lookups alike.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl QuoteSource for StaticQuotes {
    async fn snapshot(&self, ticker: &str) -> Result<QuoteSnapshot, FetchError> {
        self.requests.lock().expect("lock").push(ticker.to_owned());
        self.quotes
            .lock()
            .expect("lock")
            .get(ticker)
            .cloned()
            .ok_or_else(|| FetchError::Empty(ticker.to_owned()))
    }

    async fn lookup_name(&self, ticker: &str) -> Result<Option<String>, FetchError> {
        self.requests.lock().expect("lock").push(ticker.to_owned());
        Ok(self.names.lock().expect("lock").get(ticker).cloned())
    }
}

pub struct Harness {
    pub services: BotServices,
    pub platform: Arc<FakePlatform>,
    pub feed: Arc<StaticFeed>,
    pub quotes: Arc<StaticQuotes>,
    pub clock: Arc<ManualClock>,
    pub repositories: Repositories,
}

impl Harness {
    pub fn new(platform: FakePlatform) -> Self {
        Self::with_config(platform, AppConfig::default())
    }

    pub fn with_config(platform: FakePlatform, config: AppConfig) -> Self {
        let platform = Arc::new(platform);
        let feed = Arc::new(StaticFeed::default());
        let quotes = Arc::new(StaticQuotes::default());
        let clock = Arc::new(ManualClock::new(start_time()));
        let repositories = Repositories {
            xp: Arc::new(InMemoryXpLedger::default()),
            warnings: Arc::new(InMemoryWarningRepository::default()),
            schedules: Arc::new(InMemoryScheduleRepository::default()),
            alerts: Arc::new(InMemoryAlertConfigRepository::default()),
            watchlist: Arc::new(InMemoryWatchlistRepository::default()),
            roles: Arc::new(InMemoryRoleRepository::default()),
            welcome: Arc::new(InMemoryWelcomeRepository::default()),
        };

        let services = BotServices::new(
            Arc::new(config),
            platform.clone(),
            clock.clone(),
            repositories.clone(),
            feed.clone(),
            quotes.clone(),
        );

        Self { services, platform, feed, quotes, clock, repositories }
    }
}
