use tracing::{info, warn};

use guildkeeper_chat::commands::CommandContext;
use guildkeeper_chat::messages::{
    news_digest_message, notice_message, success_message, MessageBuilder, OutgoingMessage,
    COLOR_BLUE, COLOR_GREEN, COLOR_RED,
};
use guildkeeper_core::domain::community::ChannelId;
use guildkeeper_core::domain::schedule::{Feature, ScheduleConfig, SchedulePayload, TimeOfDay};
use guildkeeper_core::domain::watchlist::{
    normalize_ticker, validate_threshold, AlertConfig, WatchlistEntry, WATCHLIST_CAPACITY,
};
use guildkeeper_core::errors::{ApplicationError, DomainError};
use guildkeeper_core::feeds::{
    format_change, format_price, news_source, resolve_indices, validate_news_limit, FeedSource,
    NewsSource, QuoteSource, DEFAULT_STOCK_INDICES, MAX_STOCK_INDICES_PER_REQUEST,
};

use super::{best_effort, BotServices};

/// Fetches `source` and renders the headline digest. Fetch failures render the unavailable notice.
pub async fn news_digest(news: &dyn FeedSource, source: &NewsSource, limit: usize) -> OutgoingMessage {
    match news.fetch(source.url, limit).await {
        Ok(items) => news_digest_message(source.label, &items),
        Err(error) => {
            warn!(
                event_name = "feeds.news.fetch_failed",
                source = source.key,
                error = %error,
                "news fetch failed"
            );
            news_digest_message(source.label, &[])
        }
    }
}

/// Index summary embed. A quote that cannot be fetched renders as unavailable instead of failing.
pub async fn stocks_summary(
    quotes: &dyn QuoteSource,
    names: &[String],
) -> Result<OutgoingMessage, DomainError> {
    let indices = resolve_indices(names)?;

    let mut fields = Vec::with_capacity(indices.len());
    for index in indices {
        let value = match quotes.snapshot(index.ticker).await {
            Ok(snapshot) => format!(
                "{}\n{}",
                format_price(snapshot.price, index.ticker),
                format_change(snapshot.change, snapshot.change_percent)
            ),
            Err(error) => {
                warn!(
                    event_name = "feeds.quote.fetch_failed",
                    ticker = index.ticker,
                    error = %error,
                    "quote fetch failed"
                );
                "data unavailable".to_owned()
            }
        };
        fields.push((index.label, value));
    }

    Ok(MessageBuilder::new(String::new())
        .embed(|embed| {
            embed.title("📈 Market summary").color(COLOR_BLUE);
            for (label, value) in fields {
                embed.field(label, value, true);
            }
        })
        .build())
}

/// Index names for a stocks request: the defaults when none are given, at most four per request.
fn requested_indices(indices: Vec<String>) -> Result<Vec<String>, DomainError> {
    if indices.is_empty() {
        return Ok(DEFAULT_STOCK_INDICES.iter().map(|name| (*name).to_owned()).collect());
    }
    if indices.len() > MAX_STOCK_INDICES_PER_REQUEST {
        return Err(DomainError::InvalidArgument(format!(
            "at most {MAX_STOCK_INDICES_PER_REQUEST} indices per request"
        )));
    }
    Ok(resolve_indices(&indices)?.into_iter().map(|index| index.name.to_owned()).collect())
}

impl BotServices {
    async fn ensure_local_channel(
        &self,
        ctx: &CommandContext,
        channel: &ChannelId,
    ) -> Result<(), ApplicationError> {
        let info = self.platform.channel(channel).await?;
        if info.community_id.as_ref().is_some_and(|owner| *owner != ctx.community_id) {
            return Err(DomainError::InvalidArgument(format!(
                "{} belongs to another server",
                channel.mention()
            ))
            .into());
        }
        Ok(())
    }

    pub(super) async fn news(
        &self,
        source: Option<String>,
        count: Option<i64>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let limit = match count {
            Some(count) => validate_news_limit(count)?,
            None => self.config.feeds.news_limit,
        };
        let source = news_source(
            source.as_deref().unwrap_or(self.config.feeds.default_news_source.as_str()),
        )?;
        Ok(news_digest(self.news.as_ref(), source, limit).await)
    }

    pub(super) async fn stocks(&self, indices: Vec<String>) -> Result<OutgoingMessage, ApplicationError> {
        let names = requested_indices(indices)?;
        Ok(stocks_summary(self.quotes.as_ref(), &names).await?)
    }

    async fn save_schedule(
        &self,
        ctx: &CommandContext,
        channel: ChannelId,
        time: TimeOfDay,
        payload: SchedulePayload,
    ) -> Result<OutgoingMessage, ApplicationError> {
        self.ensure_local_channel(ctx, &channel).await?;

        let feature = payload.feature();
        let schedule = ScheduleConfig {
            community_id: ctx.community_id.clone(),
            enabled: true,
            channel_id: channel.clone(),
            time_of_day: time,
            payload,
            updated_at: self.clock.now_utc(),
        };
        let detail = schedule.payload.describe();
        self.repositories.schedules.upsert(schedule).await?;
        info!(
            event_name = "scheduler.schedule.saved",
            correlation_id = %ctx.request_id,
            community_id = %ctx.community_id,
            feature = feature.as_str(),
            time = %time,
            "schedule saved"
        );

        Ok(success_message(
            &format!("✅ {} schedule set", feature_title(feature)),
            &format!("Every day at {time} in {} ({detail}).", channel.mention()),
        ))
    }

    pub(super) async fn schedule_news(
        &self,
        ctx: &CommandContext,
        channel: ChannelId,
        time: TimeOfDay,
        source: Option<String>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let source = news_source(
            source.as_deref().unwrap_or(self.config.feeds.default_news_source.as_str()),
        )?;
        self.save_schedule(ctx, channel, time, SchedulePayload::News { source: source.key.to_owned() })
            .await
    }

    pub(super) async fn schedule_stocks(
        &self,
        ctx: &CommandContext,
        channel: ChannelId,
        time: TimeOfDay,
        indices: Vec<String>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let indices = requested_indices(indices)?;
        self.save_schedule(ctx, channel, time, SchedulePayload::Stocks { indices }).await
    }

    pub(super) async fn stop_schedule(
        &self,
        ctx: &CommandContext,
        feature: Feature,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let stopped = self
            .repositories
            .schedules
            .set_enabled(&ctx.community_id, feature, false, self.clock.now_utc())
            .await?;
        let title = feature_title(feature);
        if !stopped {
            return Ok(notice_message(title, "No schedule is configured.").ephemeral());
        }
        Ok(success_message(&format!("⏹️ {title} schedule stopped"), "Scheduled posts are paused."))
    }

    pub(super) async fn schedule_status(
        &self,
        ctx: &CommandContext,
        feature: Feature,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let title = feature_title(feature);
        let Some(schedule) = self.repositories.schedules.get(&ctx.community_id, feature).await? else {
            return Ok(notice_message(title, "No schedule is configured.").ephemeral());
        };

        let detail_label = match feature {
            Feature::News => "Source",
            Feature::Stocks => "Indices",
        };
        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("{title} schedule"))
                    .color(if schedule.enabled { COLOR_GREEN } else { COLOR_RED })
                    .field("Status", if schedule.enabled { "active" } else { "stopped" }, true)
                    .field("Channel", schedule.channel_id.mention(), true)
                    .field("Time", schedule.time_of_day.to_string(), true)
                    .field(detail_label, schedule.payload.describe(), false);
            })
            .ephemeral()
            .build())
    }

    pub(super) async fn add_stock(
        &self,
        ctx: &CommandContext,
        ticker: String,
        name: Option<String>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let ticker = normalize_ticker(&ticker)?;
        // Cheap rejections first; the repository insert still enforces both atomically.
        let existing = self.repositories.watchlist.list(&ctx.community_id).await?;
        if existing.iter().any(|entry| entry.ticker == ticker) {
            return Err(DomainError::Duplicate(format!("{ticker} is already on the watchlist")).into());
        }
        if existing.len() >= WATCHLIST_CAPACITY {
            return Err(DomainError::CapacityExceeded {
                what: "watchlist entries",
                limit: WATCHLIST_CAPACITY,
            }
            .into());
        }

        let display_name = match name.map(|name| name.trim().to_owned()).filter(|name| !name.is_empty())
        {
            Some(name) => name,
            None => best_effort("feeds.quote.lookup_failed", self.quotes.lookup_name(&ticker).await)
                .flatten()
                .unwrap_or_else(|| ticker.clone()),
        };
        let snapshot = best_effort("feeds.quote.fetch_failed", self.quotes.snapshot(&ticker).await);

        self.repositories
            .watchlist
            .add(WatchlistEntry {
                community_id: ctx.community_id.clone(),
                ticker: ticker.clone(),
                display_name: display_name.clone(),
                last_price: snapshot.as_ref().map(|snapshot| snapshot.price),
                last_change_percent: snapshot.as_ref().map_or(0.0, |snapshot| snapshot.change_percent),
                added_at: self.clock.now_utc(),
            })
            .await?;
        let count = self.repositories.watchlist.count(&ctx.community_id).await?;

        Ok(success_message(
            "✅ Added to watchlist",
            &format!("{display_name} ({ticker}) is now watched. {count}/{WATCHLIST_CAPACITY} slots used."),
        ))
    }

    pub(super) async fn remove_stock(
        &self,
        ctx: &CommandContext,
        ticker: String,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let ticker = normalize_ticker(&ticker)?;
        if !self.repositories.watchlist.remove(&ctx.community_id, &ticker).await? {
            return Err(ApplicationError::NotFound(format!("{ticker} is not on the watchlist")));
        }
        Ok(success_message("✅ Removed from watchlist", &format!("{ticker} is no longer watched.")))
    }

    pub(super) async fn watchlist(
        &self,
        ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let entries = self.repositories.watchlist.list(&ctx.community_id).await?;
        if entries.is_empty() {
            return Ok(notice_message("Watchlist", "The watchlist is empty. Use `addstock` to add a ticker.")
                .ephemeral());
        }
        let alert = self.repositories.alerts.get(&ctx.community_id).await?;

        let mut fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            let value = match self.quotes.snapshot(&entry.ticker).await {
                Ok(snapshot) => format!(
                    "{}\n{}",
                    format_price(snapshot.price, &entry.ticker),
                    format_change(snapshot.change, snapshot.change_percent)
                ),
                Err(_) => "data unavailable".to_owned(),
            };
            fields.push((format!("{} ({})", entry.display_name, entry.ticker), value));
        }
        let footer = match alert {
            Some(alert) if alert.enabled => format!(
                "Alerts on at ±{}% in {}",
                alert.threshold_percent,
                alert.channel_id.mention()
            ),
            _ => "Alerts off".to_owned(),
        };

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("👀 Watchlist ({}/{WATCHLIST_CAPACITY})", entries.len()))
                    .color(COLOR_BLUE)
                    .footer(footer);
                for (name, value) in fields {
                    embed.field(name, value, true);
                }
            })
            .build())
    }

    pub(super) async fn set_alert(
        &self,
        ctx: &CommandContext,
        channel: ChannelId,
        threshold: f64,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let threshold_percent = validate_threshold(threshold)?;
        self.ensure_local_channel(ctx, &channel).await?;

        self.repositories
            .alerts
            .upsert(AlertConfig {
                community_id: ctx.community_id.clone(),
                enabled: true,
                channel_id: channel.clone(),
                threshold_percent,
                updated_at: self.clock.now_utc(),
            })
            .await?;
        info!(
            event_name = "alerts.config.saved",
            correlation_id = %ctx.request_id,
            community_id = %ctx.community_id,
            threshold_percent,
            "price alerts enabled"
        );

        Ok(success_message(
            "🔔 Price alerts enabled",
            &format!(
                "Moves of ±{threshold_percent}% or more are posted in {}.",
                channel.mention()
            ),
        ))
    }

    pub(super) async fn stop_alert(
        &self,
        ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let stopped = self
            .repositories
            .alerts
            .set_enabled(&ctx.community_id, false, self.clock.now_utc())
            .await?;
        if !stopped {
            return Ok(notice_message("Price alerts", "Alerts were never configured.").ephemeral());
        }
        Ok(success_message("🔕 Price alerts disabled", "Watchlist alerts are paused."))
    }
}

fn feature_title(feature: Feature) -> &'static str {
    match feature {
        Feature::News => "News",
        Feature::Stocks => "Stocks",
    }
}

#[cfg(test)]
mod tests {
    use guildkeeper_chat::commands::{BotCommand, CommandService};
    use guildkeeper_core::domain::community::ChannelId;
    use guildkeeper_core::domain::schedule::{Feature, SchedulePayload, TimeOfDay};
    use guildkeeper_core::errors::{ApplicationError, DomainError};

    use crate::services::testing::{community_id, context, member, FakePlatform, Harness};

    fn nine() -> TimeOfDay {
        TimeOfDay::new(9, 0).expect("time")
    }

    #[tokio::test]
    async fn news_uses_configured_limit_and_source() {
        let harness = Harness::new(FakePlatform::default());
        harness.feed.set_items(&["One", "Two", "Three", "Four", "Five", "Six"]);

        let reply = harness
            .services
            .execute(BotCommand::News { source: None, count: None }, &context(member("ada", 1)))
            .await
            .expect("news");

        let requests = harness.feed.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].0.starts_with("https://news.google.com/rss?"));
        assert_eq!(requests[0].1, 5);
        let description = reply.embeds[0].description.clone().expect("description");
        assert!(description.starts_with("**1.** [One](https://news.example/0)"));
        assert!(!description.contains("Six"));
    }

    #[tokio::test]
    async fn news_failure_renders_unavailable_notice() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("ada", 1));

        let reply = harness
            .services
            .execute(BotCommand::News { source: Some("it".to_owned()), count: Some(3) }, &ctx)
            .await
            .expect("notice");
        assert_eq!(reply.embeds[0].title.as_deref(), Some("News unavailable"));

        let unknown = harness
            .services
            .execute(BotCommand::News { source: Some("tabloid".to_owned()), count: None }, &ctx)
            .await;
        assert!(matches!(unknown, Err(ApplicationError::Domain(DomainError::InvalidArgument(_)))));
        let too_many = harness
            .services
            .execute(BotCommand::News { source: None, count: Some(11) }, &ctx)
            .await;
        assert!(too_many.is_err());
    }

    #[tokio::test]
    async fn stocks_marks_missing_quotes_unavailable() {
        let harness = Harness::new(FakePlatform::default());
        harness.quotes.set("^KS11", 2_456.1, 1.25);
        harness.quotes.set("^IXIC", 17_000.0, -0.5);

        let reply = harness
            .services
            .execute(BotCommand::Stocks { indices: Vec::new() }, &context(member("ada", 1)))
            .await
            .expect("stocks");

        let fields = &reply.embeds[0].fields;
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "KOSPI");
        assert!(fields[0].value.starts_with("2,456.10\n+"));
        assert_eq!(fields[1].value, "data unavailable");
        assert_eq!(fields[2].name, "NASDAQ Composite");
    }

    #[tokio::test]
    async fn stocks_caps_indices_per_request() {
        let harness = Harness::new(FakePlatform::default());
        let indices = ["KOSPI", "KOSDAQ", "NASDAQ", "SP500", "DOW"].map(str::to_owned).to_vec();

        let result = harness
            .services
            .execute(BotCommand::Stocks { indices }, &context(member("ada", 1)))
            .await;
        assert!(matches!(result, Err(ApplicationError::Domain(_))));
    }

    #[tokio::test]
    async fn schedule_lifecycle_status_and_stop() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));

        harness
            .services
            .execute(
                BotCommand::ScheduleStocks {
                    channel: ChannelId("markets".to_owned()),
                    time: nine(),
                    indices: vec!["btc".to_owned(), "s&p500".to_owned()],
                },
                &ctx,
            )
            .await
            .expect("schedule");
        let stored = harness
            .repositories
            .schedules
            .get(&community_id(), Feature::Stocks)
            .await
            .expect("read")
            .expect("schedule");
        assert_eq!(
            stored.payload,
            SchedulePayload::Stocks { indices: vec!["BTC".to_owned(), "SP500".to_owned()] }
        );

        let status = harness.services.execute(BotCommand::StocksStatus, &ctx).await.expect("status");
        assert_eq!(status.embeds[0].fields[0].value, "active");
        assert_eq!(status.embeds[0].fields[2].value, "09:00");

        harness.services.execute(BotCommand::StopStocks, &ctx).await.expect("stop");
        let status = harness.services.execute(BotCommand::StocksStatus, &ctx).await.expect("status");
        assert_eq!(status.embeds[0].fields[0].value, "stopped");

        let nothing = harness.services.execute(BotCommand::StopNews, &ctx).await.expect("stop news");
        assert!(nothing.ephemeral);
    }

    #[tokio::test]
    async fn schedule_news_defaults_to_configured_source() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));

        harness
            .services
            .execute(
                BotCommand::ScheduleNews {
                    channel: ChannelId("daily".to_owned()),
                    time: nine(),
                    source: None,
                },
                &ctx,
            )
            .await
            .expect("schedule");

        let stored = harness
            .repositories
            .schedules
            .get(&community_id(), Feature::News)
            .await
            .expect("read")
            .expect("schedule");
        assert_eq!(stored.payload, SchedulePayload::News { source: "google_kr".to_owned() });
        assert!(stored.enabled);
    }

    #[tokio::test]
    async fn add_stock_resolves_names_and_enforces_capacity() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));
        harness.quotes.name("AAPL", "Apple Inc.");
        harness.quotes.set("AAPL", 190.0, 2.0);

        harness
            .services
            .execute(BotCommand::AddStock { ticker: " aapl ".to_owned(), name: None }, &ctx)
            .await
            .expect("add");
        let entries = harness.repositories.watchlist.list(&community_id()).await.expect("list");
        assert_eq!(entries[0].ticker, "AAPL");
        assert_eq!(entries[0].display_name, "Apple Inc.");
        assert_eq!(entries[0].last_price, Some(190.0));
        assert_eq!(entries[0].last_change_percent, 2.0);

        let duplicate = harness
            .services
            .execute(BotCommand::AddStock { ticker: "AAPL".to_owned(), name: None }, &ctx)
            .await;
        assert!(matches!(duplicate, Err(ApplicationError::Domain(DomainError::Duplicate(_)))));

        for index in 0..9 {
            harness
                .services
                .execute(BotCommand::AddStock { ticker: format!("T{index}"), name: None }, &ctx)
                .await
                .expect("fill");
        }
        let full = harness
            .services
            .execute(BotCommand::AddStock { ticker: "MSFT".to_owned(), name: None }, &ctx)
            .await;
        assert!(matches!(
            full,
            Err(ApplicationError::Domain(DomainError::CapacityExceeded { .. }))
        ));
        assert_eq!(harness.repositories.watchlist.count(&community_id()).await.expect("count"), 10);

        let entries = harness.repositories.watchlist.list(&community_id()).await.expect("list");
        assert_eq!(entries[1].display_name, "T0");
        assert_eq!(entries[1].last_price, None);
    }

    #[tokio::test]
    async fn add_stock_rejects_before_asking_the_quote_source() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));
        harness
            .services
            .execute(BotCommand::AddStock { ticker: "AAPL".to_owned(), name: Some("Apple".to_owned()) }, &ctx)
            .await
            .expect("add");
        let after_first = harness.quotes.requests().len();

        let duplicate = harness
            .services
            .execute(BotCommand::AddStock { ticker: "aapl".to_owned(), name: None }, &ctx)
            .await;
        assert!(matches!(duplicate, Err(ApplicationError::Domain(DomainError::Duplicate(_)))));
        assert_eq!(harness.quotes.requests().len(), after_first);

        for index in 0..9 {
            harness
                .services
                .execute(
                    BotCommand::AddStock { ticker: format!("T{index}"), name: Some(format!("T{index}")) },
                    &ctx,
                )
                .await
                .expect("fill");
        }
        let before_full = harness.quotes.requests().len();
        let full = harness
            .services
            .execute(BotCommand::AddStock { ticker: "MSFT".to_owned(), name: None }, &ctx)
            .await;
        assert!(matches!(
            full,
            Err(ApplicationError::Domain(DomainError::CapacityExceeded { .. }))
        ));
        assert_eq!(harness.quotes.requests().len(), before_full, "no lookup for a full list");
    }

    #[tokio::test]
    async fn alerts_validate_threshold_and_toggle() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));

        let invalid = harness
            .services
            .execute(BotCommand::SetAlert { channel: ChannelId("alerts".to_owned()), threshold: 0.5 }, &ctx)
            .await;
        assert!(matches!(invalid, Err(ApplicationError::Domain(_))));
        let never = harness.services.execute(BotCommand::StopAlert, &ctx).await.expect("stop");
        assert!(never.ephemeral);

        harness
            .services
            .execute(BotCommand::SetAlert { channel: ChannelId("alerts".to_owned()), threshold: 3.0 }, &ctx)
            .await
            .expect("set");
        let enabled = harness.repositories.alerts.list_enabled().await.expect("list");
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].threshold_percent, 3.0);

        harness.services.execute(BotCommand::StopAlert, &ctx).await.expect("stop");
        assert!(harness.repositories.alerts.list_enabled().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn watchlist_shows_live_quotes() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));

        let empty = harness.services.execute(BotCommand::Watchlist, &ctx).await.expect("empty");
        assert!(empty.ephemeral);

        harness
            .services
            .execute(BotCommand::AddStock { ticker: "NVDA".to_owned(), name: Some("Nvidia".to_owned()) }, &ctx)
            .await
            .expect("add");
        harness.quotes.set("NVDA", 1_200.0, 4.0);

        let list = harness.services.execute(BotCommand::Watchlist, &ctx).await.expect("list");
        let embed = &list.embeds[0];
        assert_eq!(embed.fields[0].name, "Nvidia (NVDA)");
        assert!(embed.fields[0].value.starts_with("1,200.00"));
        assert_eq!(embed.footer.as_deref(), Some("Alerts off"));
    }
}
