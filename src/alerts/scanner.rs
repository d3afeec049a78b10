//! Periodic alert scan.
//!
//! One scan: fetch every watched coin once, pull triggered alerts out of the
//! store under its lock, notify users without holding the lock, flush once.

use super::coins::Coin;
use super::fetcher::PriceSource;
use super::i18n::{render, Lang};
use super::model::{format_price, Alert};
use super::store::{AlertStore, StoreData};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delivers alert messages to users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Send `text` to the chat of `user_id`
    async fn notify(&self, user_id: &str, text: &str) -> Result<()>;
}

/// A triggered alert waiting to be announced
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub user_id: String,
    pub lang: Lang,
    pub alert: Alert,
    pub current: f64,
}

impl Notification {
    /// Message text in the user's language
    #[must_use]
    pub fn text(&self) -> String {
        render(
            self.lang.texts().alert_triggered,
            &[
                ("coin", self.alert.coin.display_name()),
                ("price", &format_price(self.alert.price)),
                ("current", &format_price(self.current)),
            ],
        )
    }
}

/// Outcome of one scan
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Coins with a usable price this scan
    pub priced: usize,
    pub triggered: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Remove every alert whose crossing condition holds at `prices`.
///
/// Alerts for coins without a price stay untouched. Lists keep their order.
pub fn take_triggered(data: &mut StoreData, prices: &HashMap<Coin, f64>) -> Vec<Notification> {
    let mut fired = Vec::new();
    let StoreData { users, alerts } = data;

    for (user_id, list) in alerts.iter_mut() {
        let lang = users.get(user_id).map(|u| u.lang).unwrap_or_default();
        list.retain(|alert| {
            let Some(&current) = prices.get(&alert.coin) else {
                return true;
            };
            if !alert.is_triggered_by(current) {
                return true;
            }
            fired.push(Notification {
                user_id: user_id.clone(),
                lang,
                alert: *alert,
                current,
            });
            false
        });
    }
    fired
}

/// Runs alert scans against a store
pub struct AlertScanner {
    store: Arc<AlertStore>,
    prices: Arc<dyn PriceSource>,
    notifier: Arc<dyn AlertNotifier>,
}

impl AlertScanner {
    #[must_use]
    pub fn new(
        store: Arc<AlertStore>,
        prices: Arc<dyn PriceSource>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            store,
            prices,
            notifier,
        }
    }

    /// Current price of every watched coin, one request per coin.
    ///
    /// Coins without a strictly positive price are left out.
    pub async fn fetch_prices(&self) -> HashMap<Coin, f64> {
        let mut prices = HashMap::with_capacity(Coin::ALL.len());
        for &coin in Coin::ALL {
            match self.prices.quote(coin.id()).await {
                Some(quote) if quote.price > 0.0 => {
                    prices.insert(coin, quote.price);
                }
                Some(quote) => warn!(coin = coin.id(), price = quote.price, "Ignoring non-positive price"),
                None => debug!(coin = coin.id(), "No price this scan"),
            }
        }
        prices
    }

    /// Run one full scan
    pub async fn scan_once(&self) -> ScanReport {
        let mut report = ScanReport::default();
        if !self.store.has_alerts().await {
            debug!("No alerts to check");
            return report;
        }

        let prices = self.fetch_prices().await;
        report.priced = prices.len();

        let fired = self
            .store
            .modify(|data| take_triggered(data, &prices))
            .await;
        report.triggered = fired.len();

        for notification in &fired {
            let text = notification.text();
            match self.notifier.notify(&notification.user_id, &text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        "Failed to notify user {} about {}: {e}",
                        notification.user_id,
                        notification.alert.coin.id()
                    );
                }
            }
        }

        if let Err(e) = self.store.flush().await {
            error!("Failed to persist store after scan: {e}");
        }

        info!(
            priced = report.priced,
            triggered = report.triggered,
            delivered = report.delivered,
            failed = report.failed,
            "Alert scan finished"
        );
        report
    }

    /// Scan every `period`, first scan one period after start, until
    /// `shutdown` fires.
    pub fn spawn(self, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Alert scanner started (every {}s).", period.as_secs());
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.scan_once().await;
                    }
                }
            }
            info!("Alert scanner stopped.");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::fetcher::{MockPriceSource, Quote};
    use crate::alerts::model::User;
    use std::sync::Mutex;

    fn temp_store() -> Arc<AlertStore> {
        let path = std::env::temp_dir()
            .join(format!("coin-media-bots-{}", uuid::Uuid::new_v4()))
            .join("data.json");
        Arc::new(AlertStore::new(path, StoreData::default()))
    }

    /// Price source quoting only the given coins
    fn prices(quotes: &[(Coin, f64)]) -> Arc<MockPriceSource> {
        let quotes: HashMap<String, f64> = quotes
            .iter()
            .map(|(coin, price)| (coin.id().to_string(), *price))
            .collect();
        let mut source = MockPriceSource::new();
        source.expect_quote().returning(move |id| {
            quotes.get(id).map(|&price| Quote {
                price,
                change_24h: 0.0,
            })
        });
        Arc::new(source)
    }

    /// Notifier recording every message
    fn recorder() -> (Arc<MockAlertNotifier>, Arc<Mutex<Vec<(String, String)>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let log = sent.clone();
        let mut notifier = MockAlertNotifier::new();
        notifier.expect_notify().returning(move |user, text| {
            if let Ok(mut log) = log.lock() {
                log.push((user.to_string(), text.to_string()));
            }
            Ok(())
        });
        (Arc::new(notifier), sent)
    }

    #[tokio::test]
    async fn test_bitcoin_example() {
        let store = temp_store();
        store.ensure_user("100").await;
        store
            .add_alert("100", Alert::new(Coin::Bitcoin, 55_000.0, 50_000.0))
            .await;
        let (notifier, sent) = recorder();

        let below = AlertScanner::new(
            store.clone(),
            prices(&[(Coin::Bitcoin, 54_000.0)]),
            notifier.clone(),
        );
        let report = below.scan_once().await;
        assert_eq!(report.triggered, 0);
        assert_eq!(store.alerts_of("100").await.len(), 1);

        let above = AlertScanner::new(
            store.clone(),
            prices(&[(Coin::Bitcoin, 55_500.0)]),
            notifier.clone(),
        );
        let report = above.scan_once().await;
        assert_eq!(report.triggered, 1);
        assert_eq!(report.delivered, 1);
        assert!(store.alerts_of("100").await.is_empty());

        let sent = sent.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "100");
        assert!(sent[0].1.contains("55500"));
        assert!(sent[0].1.contains("55000"));

        // Fired alerts are gone: another scan sends nothing
        let report = above.scan_once().await;
        assert_eq!(report, ScanReport::default());
    }

    #[tokio::test]
    async fn test_failed_notification_does_not_stop_others() {
        let store = temp_store();
        for user in ["1", "2", "3"] {
            store.ensure_user(user).await;
            store
                .add_alert(user, Alert::new(Coin::Ethereum, 2_000.0, 2_500.0))
                .await;
        }
        let mut notifier = MockAlertNotifier::new();
        notifier
            .expect_notify()
            .times(3)
            .returning(|user, _| {
                if user == "2" {
                    anyhow::bail!("Forbidden: bot was blocked by the user")
                }
                Ok(())
            });

        let scanner = AlertScanner::new(
            store.clone(),
            prices(&[(Coin::Ethereum, 1_900.0)]),
            Arc::new(notifier),
        );
        let report = scanner.scan_once().await;

        assert_eq!(report.triggered, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.snapshot().await.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_scan_persists_once() {
        let store = temp_store();
        store.ensure_user("5").await;
        store
            .add_alert("5", Alert::new(Coin::Dogecoin, 1.0, 0.1))
            .await;
        let (notifier, _) = recorder();

        AlertScanner::new(store.clone(), prices(&[(Coin::Dogecoin, 1.5)]), notifier)
            .scan_once()
            .await;

        assert!(!store.is_dirty());
        let reloaded = AlertStore::load(store.path()).await;
        assert!(matches!(reloaded, Ok(s) if !s.has_alerts().await));
    }

    #[tokio::test]
    async fn test_no_alerts_means_no_requests() {
        let store = temp_store();
        let mut source = MockPriceSource::new();
        source.expect_quote().never();
        let (notifier, _) = recorder();

        let report = AlertScanner::new(store, Arc::new(source), notifier)
            .scan_once()
            .await;
        assert_eq!(report, ScanReport::default());
    }

    #[tokio::test]
    async fn test_each_coin_fetched_once_per_scan() {
        let store = temp_store();
        for user in ["1", "2"] {
            store
                .add_alert(user, Alert::new(Coin::Bitcoin, 1.0, 2.0))
                .await;
        }
        let mut source = MockPriceSource::new();
        source
            .expect_quote()
            .times(Coin::ALL.len())
            .returning(|_| None);
        let (notifier, _) = recorder();

        let report = AlertScanner::new(store.clone(), Arc::new(source), notifier)
            .scan_once()
            .await;
        assert_eq!(report.priced, 0);
        assert_eq!(store.snapshot().await.alert_count(), 2);
    }

    #[test]
    fn test_take_triggered_uses_user_language() {
        let mut data = StoreData::default();
        data.users.insert("fa-user".into(), User { lang: Lang::Fa });
        data.alerts.insert(
            "fa-user".into(),
            vec![
                Alert::new(Coin::Solana, 200.0, 150.0),
                Alert::new(Coin::Solana, 100.0, 150.0),
                Alert::new(Coin::Cardano, 1.0, 0.5),
            ],
        );
        data.alerts
            .insert("ghost".into(), vec![Alert::new(Coin::Solana, 210.0, 150.0)]);
        let prices = HashMap::from([(Coin::Solana, 205.0)]);

        let fired = take_triggered(&mut data, &prices);

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].lang, Lang::Fa);
        assert!(fired[0].text().contains("205"));
        // Remaining alerts keep their order; users without a record default to en
        assert_eq!(
            data.alerts["fa-user"],
            vec![
                Alert::new(Coin::Solana, 100.0, 150.0),
                Alert::new(Coin::Cardano, 1.0, 0.5)
            ]
        );
        assert_eq!(data.alerts["ghost"].len(), 1);
    }

    #[test]
    fn test_flat_alert_survives_any_price() {
        let mut data = StoreData::default();
        data.alerts
            .insert("1".into(), vec![Alert::new(Coin::Tether, 1.0, 1.0)]);
        for price in [0.5, 1.0, 1.5] {
            let fired = take_triggered(&mut data, &HashMap::from([(Coin::Tether, price)]));
            assert!(fired.is_empty());
        }
        assert_eq!(data.alert_count(), 1);
    }
}
