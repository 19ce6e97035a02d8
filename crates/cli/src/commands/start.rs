//! Startup preflight: everything the server needs before it opens the gateway.

use crate::commands::{exit, load_config, runtime, CommandResult};
use guildkeeper_db::{connect_with_settings, migrations, ping};
use guildkeeper_feeds::build_client;

pub fn run() -> CommandResult {
    let config = match load_config("start") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    if let Err(error) = build_client(&config.feeds) {
        return CommandResult::failure("start", "feed_client", error.to_string(), exit::RUNTIME);
    }
    let runtime = match runtime("start") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), exit::DATABASE))?;
        ping(&pool).await.map_err(|error| ("db_connectivity", error.to_string(), exit::DATABASE))?;
        let applied = migrations::applied_count(&pool)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), exit::DATABASE))?;
        pool.close().await;
        Ok::<i64, (&'static str, String, u8)>(applied)
    });

    match result {
        Ok(applied) => {
            let known = migrations::known_count();
            let pending = (known as i64 - applied).max(0);
            CommandResult::success(
                "start",
                format!(
                    "preflight passed; {pending} pending migration(s) will be applied at startup; \
                     health endpoint on {}:{}",
                    config.server.bind_address, config.server.health_check_port
                ),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("start", error_class, message, exit_code)
        }
    }
}
