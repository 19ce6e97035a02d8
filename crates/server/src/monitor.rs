//! Watchlist price alerts.
//!
//! Each cycle walks every community with alerts enabled, takes a fresh quote per ticker and
//! posts when the move crosses the threshold and differs from the last stored move. The fresh
//! quote is stored whether or not an alert went out.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use guildkeeper_chat::messages::{MessageBuilder, OutgoingMessage, COLOR_GREEN, COLOR_RED};
use guildkeeper_core::alerts::{evaluate_entry, AlertDecision, AlertDirection};
use guildkeeper_core::domain::watchlist::{AlertConfig, QuoteSnapshot, WatchlistEntry};
use guildkeeper_core::feeds::{format_change, format_price};

use crate::scheduler::wait_until_ready;
use crate::services::BotServices;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub alerted: usize,
    pub failed: usize,
}

pub struct WatchlistMonitor {
    services: BotServices,
}

impl WatchlistMonitor {
    pub fn new(services: BotServices) -> Self {
        Self { services }
    }

    pub async fn run(self, ready: watch::Receiver<bool>, shutdown: CancellationToken) {
        if !wait_until_ready(ready, &shutdown).await {
            return;
        }

        let period = Duration::from_secs(self.services.config().scheduler.alert_tick_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(event_name = "alerts.loop.started", tick_secs = period.as_secs(), "alert loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
        info!(event_name = "alerts.loop.stopped", "alert loop stopped");
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let configs = match self.services.repositories().alerts.list_enabled().await {
            Ok(configs) => configs,
            Err(error) => {
                warn!(
                    event_name = "alerts.load.failed",
                    error = %error,
                    "could not load alert configs; retrying next cycle"
                );
                return report;
            }
        };

        for config in &configs {
            self.check_community(config, &mut report).await;
        }

        debug!(
            event_name = "alerts.cycle.completed",
            communities = configs.len(),
            checked = report.checked,
            alerted = report.alerted,
            failed = report.failed,
            "alert cycle completed"
        );
        report
    }

    async fn check_community(&self, config: &AlertConfig, report: &mut CycleReport) {
        let repositories = self.services.repositories();
        let entries = match repositories.watchlist.list(&config.community_id).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    event_name = "alerts.watchlist.load_failed",
                    community_id = %config.community_id,
                    error = %error,
                    "could not load watchlist"
                );
                report.failed += 1;
                return;
            }
        };

        for entry in entries {
            let snapshot = match self.services.quote_source().snapshot(&entry.ticker).await {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    warn!(
                        event_name = "alerts.quote.fetch_failed",
                        community_id = %config.community_id,
                        ticker = %entry.ticker,
                        error = %error,
                        "quote unavailable; ticker skipped this cycle"
                    );
                    report.failed += 1;
                    continue;
                }
            };
            report.checked += 1;

            if let AlertDecision::Fire { direction } =
                evaluate_entry(config.threshold_percent, &entry, &snapshot)
            {
                let message = alert_message(&entry, &snapshot, direction, config.threshold_percent);
                match self.services.platform().deliver(&config.channel_id, &message).await {
                    Ok(_) => {
                        report.alerted += 1;
                        info!(
                            event_name = "alerts.alert.sent",
                            community_id = %config.community_id,
                            ticker = %entry.ticker,
                            change_percent = snapshot.change_percent,
                            direction = direction.label(),
                            "price alert delivered"
                        );
                    }
                    Err(error) => {
                        report.failed += 1;
                        warn!(
                            event_name = "alerts.alert.delivery_failed",
                            community_id = %config.community_id,
                            ticker = %entry.ticker,
                            error = %error,
                            "price alert could not be delivered"
                        );
                    }
                }
            }

            if let Err(error) = repositories
                .watchlist
                .update_snapshot(&config.community_id, &entry.ticker, snapshot.price, snapshot.change_percent)
                .await
            {
                warn!(
                    event_name = "alerts.snapshot.persist_failed",
                    community_id = %config.community_id,
                    ticker = %entry.ticker,
                    error = %error,
                    "could not store latest quote"
                );
            }
        }
    }
}

pub fn alert_message(
    entry: &WatchlistEntry,
    snapshot: &QuoteSnapshot,
    direction: AlertDirection,
    threshold_percent: f64,
) -> OutgoingMessage {
    let (icon, color) = match direction {
        AlertDirection::Surge => ("🚀", COLOR_GREEN),
        AlertDirection::Drop => ("📉", COLOR_RED),
    };

    MessageBuilder::new(String::new())
        .embed(|embed| {
            embed
                .title(format!(
                    "{icon} {} ({}) {}",
                    entry.display_name,
                    entry.ticker,
                    direction.label()
                ))
                .color(color)
                .field("Price", format_price(snapshot.price, &entry.ticker), true)
                .field("Change", format_change(snapshot.change, snapshot.change_percent), true)
                .field("Threshold", format!("±{threshold_percent}%"), true);
        })
        .build()
}

#[cfg(test)]
mod tests {
    use guildkeeper_core::domain::community::{ChannelId, CommunityId};
    use guildkeeper_core::domain::watchlist::{AlertConfig, WatchlistEntry};

    use super::{CycleReport, WatchlistMonitor};
    use crate::services::testing::{community_id, start_time, FakePlatform, Harness};

    async fn watch(harness: &Harness, ticker: &str, last_change_percent: f64) {
        harness
            .repositories
            .watchlist
            .add(WatchlistEntry {
                community_id: community_id(),
                ticker: ticker.to_owned(),
                display_name: ticker.to_owned(),
                last_price: Some(100.0),
                last_change_percent,
                added_at: start_time(),
            })
            .await
            .expect("watch");
    }

    async fn enable_alerts(harness: &Harness, community: CommunityId, threshold: f64) {
        harness
            .repositories
            .alerts
            .upsert(AlertConfig {
                community_id: community,
                enabled: true,
                channel_id: ChannelId("alerts".to_owned()),
                threshold_percent: threshold,
                updated_at: start_time(),
            })
            .await
            .expect("alerts");
    }

    #[tokio::test]
    async fn repeat_moves_are_suppressed_but_always_stored() {
        let harness = Harness::new(FakePlatform::default());
        enable_alerts(&harness, community_id(), 5.0).await;
        watch(&harness, "TSLA", 5.0).await;
        let monitor = WatchlistMonitor::new(harness.services.clone());

        harness.quotes.set("TSLA", 210.0, 5.05);
        let report = monitor.run_cycle().await;
        assert_eq!(report, CycleReport { checked: 1, alerted: 0, failed: 0 });
        let stored = harness.repositories.watchlist.list(&community_id()).await.expect("list");
        assert_eq!(stored[0].last_change_percent, 5.05);
        assert_eq!(stored[0].last_price, Some(210.0));

        harness.quotes.set("TSLA", 220.0, 6.0);
        assert_eq!(monitor.run_cycle().await.alerted, 1);

        let delivered = harness.platform.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, ChannelId("alerts".to_owned()));
        let embed = &delivered[0].1.embeds[0];
        assert_eq!(embed.title.as_deref(), Some("🚀 TSLA (TSLA) surge"));
        assert_eq!(embed.fields[2].value, "±5%");
    }

    #[tokio::test]
    async fn drops_alert_and_missing_quotes_are_skipped() {
        let harness = Harness::new(FakePlatform::default());
        enable_alerts(&harness, community_id(), 3.0).await;
        watch(&harness, "GONE", 0.0).await;
        watch(&harness, "NFLX", 0.0).await;
        harness.quotes.set("NFLX", 400.0, -4.0);
        let monitor = WatchlistMonitor::new(harness.services.clone());

        let report = monitor.run_cycle().await;

        assert_eq!(report, CycleReport { checked: 1, alerted: 1, failed: 1 });
        let embed = &harness.platform.delivered()[0].1.embeds[0];
        assert_eq!(embed.title.as_deref(), Some("📉 NFLX (NFLX) drop"));
        let stored = harness.repositories.watchlist.list(&community_id()).await.expect("list");
        assert_eq!(stored[0].last_change_percent, 0.0, "failed quote leaves the entry untouched");
    }

    #[tokio::test]
    async fn failed_delivery_still_stores_the_quote() {
        let harness = Harness::new(FakePlatform::default());
        enable_alerts(&harness, community_id(), 2.0).await;
        watch(&harness, "AMD", 0.0).await;
        harness.quotes.set("AMD", 150.0, 8.0);
        harness.platform.break_channel("alerts");
        let monitor = WatchlistMonitor::new(harness.services.clone());

        let report = monitor.run_cycle().await;

        assert_eq!(report.failed, 1);
        let stored = harness.repositories.watchlist.list(&community_id()).await.expect("list");
        assert_eq!(stored[0].last_change_percent, 8.0);
    }

    #[tokio::test]
    async fn communities_without_alerts_are_not_polled() {
        let harness = Harness::new(FakePlatform::default());
        watch(&harness, "AAPL", 0.0).await;
        harness.quotes.set("AAPL", 190.0, 9.0);
        enable_alerts(&harness, CommunityId("other".to_owned()), 5.0).await;
        let monitor = WatchlistMonitor::new(harness.services.clone());

        assert_eq!(monitor.run_cycle().await, CycleReport::default());
    }
}
