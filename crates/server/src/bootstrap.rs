use std::sync::Arc;

use guildkeeper_chat::events::{
    EventDispatcher, MemberJoinedHandler, MessageCreatedHandler, ReactionHandler,
    SlashCommandHandler,
};
use guildkeeper_chat::gateway::{GatewayRunner, GatewayTransport, NoopGatewayTransport, ReconnectPolicy};
use guildkeeper_chat::platform::{ChatPlatform, LoggingPlatform};
use guildkeeper_core::clock::{Clock, SystemClock};
use guildkeeper_core::config::{AppConfig, ConfigError};
use guildkeeper_db::repositories::{
    SqlAlertConfigRepository, SqlRoleRepository, SqlScheduleRepository, SqlWarningRepository,
    SqlWatchlistRepository, SqlWelcomeRepository, SqlXpLedger,
};
use guildkeeper_db::{connect_with_settings, migrations, DbPool};
use guildkeeper_feeds::{build_client, HttpClientError, RssFeedSource, YahooQuoteSource};
use thiserror::Error;
use tracing::info;

use crate::services::{BotServices, Repositories};

pub struct Application {
    pub config: Arc<AppConfig>,
    pub db_pool: DbPool,
    pub services: BotServices,
    pub gateway: Arc<GatewayRunner>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client setup failed: {0}")]
    HttpClient(#[from] HttpClientError),
}

/// Wires the application against the given platform and gateway transport.
///
/// Without a live platform connection the bot runs against [`LoggingPlatform`] and
/// [`NoopGatewayTransport`]; everything else is real.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    bootstrap_with_platform(
        config,
        Arc::new(LoggingPlatform::new()),
        Arc::new(NoopGatewayTransport),
        Arc::new(SystemClock),
    )
    .await
}

pub async fn bootstrap_with_platform(
    config: AppConfig,
    platform: Arc<dyn ChatPlatform>,
    transport: Arc<dyn GatewayTransport>,
    clock: Arc<dyn Clock>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let client = build_client(&config.feeds)?;
    let config = Arc::new(config);
    let services = BotServices::new(
        config.clone(),
        platform,
        clock,
        sql_repositories(&db_pool),
        Arc::new(RssFeedSource::new(client.clone())),
        Arc::new(YahooQuoteSource::new(client, config.feeds.quote_base_url.clone())),
    );
    let gateway = Arc::new(GatewayRunner::new(
        transport,
        dispatcher(&services),
        ReconnectPolicy::default(),
    ));

    Ok(Application { config, db_pool, services, gateway })
}

pub fn sql_repositories(pool: &DbPool) -> Repositories {
    Repositories {
        xp: Arc::new(SqlXpLedger::new(pool.clone())),
        warnings: Arc::new(SqlWarningRepository::new(pool.clone())),
        schedules: Arc::new(SqlScheduleRepository::new(pool.clone())),
        alerts: Arc::new(SqlAlertConfigRepository::new(pool.clone())),
        watchlist: Arc::new(SqlWatchlistRepository::new(pool.clone())),
        roles: Arc::new(SqlRoleRepository::new(pool.clone())),
        welcome: Arc::new(SqlWelcomeRepository::new(pool.clone())),
    }
}

/// Every event the bot reacts to routes into the same [`BotServices`].
pub fn dispatcher(services: &BotServices) -> EventDispatcher {
    let shared = Arc::new(services.clone());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(services.clone()));
    dispatcher.register(MessageCreatedHandler::new(services.clone()));
    dispatcher.register(MemberJoinedHandler::new(services.clone()));
    dispatcher.register(ReactionHandler::added(shared.clone()));
    dispatcher.register(ReactionHandler::removed(shared));
    dispatcher
}

#[cfg(test)]
mod tests {
    use guildkeeper_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use guildkeeper_core::domain::community::{CommunityId, UserId};

    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};
    use crate::scheduler::wait_until_ready;

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn overrides(bot_token: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                bot_token: Some(bot_token.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_bot_token() {
        let result = bootstrap(overrides("")).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("platform.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_sql_storage() {
        let app = bootstrap(overrides("bot-test-token")).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('xp_record', 'watchlist_entry', 'schedule_config')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables");
        assert_eq!(table_count, 3);

        let community = CommunityId("g-1".to_owned());
        let ledger = &app.services.repositories().xp;
        ledger
            .grant(&community, &UserId("ada".to_owned()), 15, chrono::Utc::now())
            .await
            .expect("grant");
        assert_eq!(ledger.member_count(&community).await.expect("count"), 1);
        assert!(!*app.gateway.readiness().borrow());

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn default_wiring_releases_the_background_loops() {
        let app = bootstrap(overrides("bot-test-token")).await.expect("bootstrap");
        let shutdown = CancellationToken::new();
        let gateway = app.gateway.clone();
        let gateway_task = tokio::spawn(async move { gateway.start().await });

        let released = tokio::time::timeout(
            Duration::from_secs(2),
            wait_until_ready(app.gateway.connected_once(), &shutdown),
        )
        .await;

        assert_eq!(released.ok(), Some(true), "schedule loop should start after connect");
        assert!(*app.gateway.readiness().borrow(), "health should see a live gateway");

        gateway_task.abort();
        app.db_pool.close().await;
    }
}
