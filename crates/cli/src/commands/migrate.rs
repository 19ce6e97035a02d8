use crate::commands::{exit, load_config, runtime, CommandResult};
use guildkeeper_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("migrate") {
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
        let before = migrations::applied_count(&pool)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), exit::DATABASE))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), exit::MIGRATION))?;
        let after = migrations::applied_count(&pool)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), exit::DATABASE))?;
        pool.close().await;
        Ok::<(i64, i64), (&'static str, String, u8)>((before, after))
    });

    match result {
        Ok((before, after)) => CommandResult::success(
            "migrate",
            format!("applied {} pending migration(s); {after} total", after - before),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
