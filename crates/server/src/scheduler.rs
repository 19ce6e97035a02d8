//! Daily news and market posts.
//!
//! One tick per `scheduler.schedule_tick_secs`. Every enabled schedule whose local `HH:MM`
//! matches the tick fires once for that minute; [`FiredMinutes`] absorbs a second tick landing
//! inside the same minute.

use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use guildkeeper_chat::messages::OutgoingMessage;
use guildkeeper_core::domain::schedule::{Feature, ScheduleConfig, SchedulePayload};
use guildkeeper_core::feeds::news_source;
use guildkeeper_core::scheduling::FiredMinutes;

use crate::services::{news_digest, stocks_summary, BotServices};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct ScheduleRunner {
    services: BotServices,
    fired: FiredMinutes,
}

impl ScheduleRunner {
    pub fn new(services: BotServices) -> Self {
        Self { services, fired: FiredMinutes::new() }
    }

    pub async fn run(mut self, ready: watch::Receiver<bool>, shutdown: CancellationToken) {
        if !wait_until_ready(ready, &shutdown).await {
            return;
        }

        let period = Duration::from_secs(self.services.config().scheduler.schedule_tick_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            event_name = "scheduler.loop.started",
            tick_secs = period.as_secs(),
            "schedule loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let now_local = self.services.clock().now_local();
                    self.run_tick(now_local).await;
                }
            }
        }
        info!(event_name = "scheduler.loop.stopped", "schedule loop stopped");
    }

    /// Delivers every schedule due at `now_local`. Failures stay local to one schedule.
    pub async fn run_tick(&mut self, now_local: NaiveDateTime) -> TickReport {
        let mut report = TickReport::default();

        for feature in Feature::ALL {
            let schedules =
                match self.services.repositories().schedules.list_enabled(feature).await {
                    Ok(schedules) => schedules,
                    Err(error) => {
                        warn!(
                            event_name = "scheduler.load.failed",
                            feature = feature.as_str(),
                            error = %error,
                            "could not load schedules; retrying next tick"
                        );
                        continue;
                    }
                };

            for schedule in schedules {
                if !self.fired.claim(&schedule, now_local) {
                    continue;
                }
                if self.deliver(&schedule).await {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                }
            }
        }

        self.fired.prune(now_local);
        if report.delivered + report.failed > 0 {
            debug!(
                event_name = "scheduler.tick.completed",
                delivered = report.delivered,
                failed = report.failed,
                "schedule tick completed"
            );
        }
        report
    }

    async fn deliver(&self, schedule: &ScheduleConfig) -> bool {
        let Some(message) = self.render(schedule).await else {
            return false;
        };

        match self.services.platform().deliver(&schedule.channel_id, &message).await {
            Ok(_) => {
                info!(
                    event_name = "scheduler.delivery.sent",
                    feature = schedule.feature().as_str(),
                    community_id = %schedule.community_id,
                    channel_id = %schedule.channel_id,
                    "scheduled post delivered"
                );
                true
            }
            Err(error) => {
                warn!(
                    event_name = "scheduler.delivery.failed",
                    feature = schedule.feature().as_str(),
                    community_id = %schedule.community_id,
                    channel_id = %schedule.channel_id,
                    error = %error,
                    "scheduled post could not be delivered"
                );
                false
            }
        }
    }

    async fn render(&self, schedule: &ScheduleConfig) -> Option<OutgoingMessage> {
        let rendered = match &schedule.payload {
            SchedulePayload::News { source } => match news_source(source) {
                Ok(source) => Ok(news_digest(
                    self.services.news_source().as_ref(),
                    source,
                    self.services.config().feeds.news_limit,
                )
                .await),
                Err(error) => Err(error),
            },
            SchedulePayload::Stocks { indices } => {
                stocks_summary(self.services.quote_source().as_ref(), indices).await
            }
        };

        rendered
            .map_err(|error| {
                warn!(
                    event_name = "scheduler.render.failed",
                    feature = schedule.feature().as_str(),
                    community_id = %schedule.community_id,
                    error = %error,
                    "stored schedule payload is no longer valid"
                );
            })
            .ok()
    }
}

/// Blocks until the gateway reports ready. Returns `false` when shutdown came first.
pub async fn wait_until_ready(mut ready: watch::Receiver<bool>, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        result = ready.wait_for(|ready| *ready) => result.is_ok(),
    }
}
