//! End-to-end cycles over scripted venues and in-memory stores.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use funding_arb_core::{
    CooldownStore, Exchange, ExchangeAdapter, FetchError, FetchMode, HistoryPoint,
    NotificationSink, NotifyError, RateQuote, ScannerConfig, SettingsStore, Severity, Symbol,
    ThresholdField, WithdrawalAllowList,
};
use funding_arb_scanner::{Collaborators, Scanner, UniverseSource};
use funding_arb_store::{FileAllowList, MemoryCooldownStore, MemorySettingsStore};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves fixed (rate, price) pairs per symbol and counts requests.
struct FixedVenue {
    exchange: Exchange,
    mode: FetchMode,
    quotes: HashMap<&'static str, (Option<Decimal>, Option<Decimal>)>,
    /// How far behind wall-clock time quotes are stamped.
    lag: Duration,
    requests: AtomicUsize,
}

impl FixedVenue {
    fn new(exchange: Exchange, quotes: &[(&'static str, Option<Decimal>, Option<Decimal>)]) -> Self {
        Self {
            exchange,
            mode: FetchMode::PerSymbol,
            quotes: quotes.iter().map(|(s, r, p)| (*s, (*r, *p))).collect(),
            lag: Duration::zero(),
            requests: AtomicUsize::new(0),
        }
    }

    fn lagging(mut self, lag: Duration) -> Self {
        self.lag = lag;
        self
    }

    fn snapshot(mut self) -> Self {
        self.mode = FetchMode::Snapshot;
        self
    }

    fn quote(&self, symbol: &str) -> Option<RateQuote> {
        let (rate, price) = self.quotes.get(symbol)?;
        Some(RateQuote::new(
            self.exchange,
            Symbol::normalize(symbol)?,
            *rate,
            *price,
            Utc::now() - self.lag,
        ))
    }
}

#[async_trait]
impl ExchangeAdapter for FixedVenue {
    fn id(&self) -> Exchange {
        self.exchange
    }

    fn fetch_mode(&self) -> FetchMode {
        self.mode
    }

    async fn fetch_current(&self, symbol: &Symbol) -> Result<RateQuote, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.quote(symbol.as_str())
            .ok_or_else(|| FetchError::unsupported(format!("{symbol} not listed")))
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RateQuote>, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.quotes.keys().filter_map(|s| self.quote(s)).collect())
    }

    async fn fetch_history(
        &self,
        _symbol: &Symbol,
        count: usize,
    ) -> Result<Vec<HistoryPoint>, FetchError> {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        Ok((0..count as i64)
            .map(|i| HistoryPoint::new(dec!(0.01), base + Duration::hours(8 * i)))
            .collect())
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(Severity, String)>>,
    attempts: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl NotificationSink for Outbox {
    async fn send(&self, severity: Severity, html: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 400,
                message: "Bad Request: chat not found".into(),
            });
        }
        self.sent.lock().push((severity, html.to_string()));
        Ok(())
    }
}

struct Harness {
    scanner: Scanner,
    outbox: Arc<Outbox>,
    cooldowns: Arc<MemoryCooldownStore>,
    settings: Arc<MemorySettingsStore>,
}

fn harness(
    symbols: &[&str],
    venues: Vec<Arc<FixedVenue>>,
    outbox: Outbox,
    config: ScannerConfig,
    allow_list: Arc<dyn WithdrawalAllowList>,
) -> Harness {
    let outbox = Arc::new(outbox);
    let cooldowns = Arc::new(MemoryCooldownStore::new());
    let settings = Arc::new(MemorySettingsStore::default());
    let adapters: Vec<Arc<dyn ExchangeAdapter>> = venues
        .into_iter()
        .map(|v| v as Arc<dyn ExchangeAdapter>)
        .collect();

    let scanner = Scanner::new(
        &config,
        UniverseSource::Static(symbols.iter().filter_map(|s| Symbol::normalize(s)).collect()),
        Collaborators {
            adapters,
            settings: settings.clone(),
            cooldowns: cooldowns.clone(),
            allow_list,
            sink: outbox.clone(),
        },
    );

    Harness {
        scanner,
        outbox,
        cooldowns,
        settings,
    }
}

fn fast_config() -> ScannerConfig {
    ScannerConfig {
        inter_batch_delay_ms: 0,
        ..Default::default()
    }
}

fn no_allow_list() -> Arc<dyn WithdrawalAllowList> {
    Arc::new(FileAllowList::new("/nonexistent/withdrawals"))
}

#[tokio::test]
async fn test_cycle_alerts_widest_pair_once() {
    let bybit = Arc::new(FixedVenue::new(
        Exchange::Bybit,
        &[
            ("BTCUSDT", Some(dec!(0.30)), Some(dec!(100))),
            ("ETHUSDT", Some(dec!(0.01)), Some(dec!(50))),
        ],
    ));
    let okx = Arc::new(FixedVenue::new(
        Exchange::Okx,
        &[
            ("BTCUSDT", Some(dec!(-0.50)), Some(dec!(100))),
            ("ETHUSDT", Some(dec!(0.02)), Some(dec!(50))),
        ],
    ));
    let gate = Arc::new(FixedVenue::new(
        Exchange::Gate,
        &[("BTCUSDT", Some(dec!(-0.20)), Some(dec!(100.2)))],
    ));

    let h = harness(
        &["BTCUSDT", "ETHUSDT"],
        vec![bybit, okx, gate],
        Outbox::default(),
        fast_config(),
        no_allow_list(),
    );

    let summary = h.scanner.run_cycle(Utc::now()).await.unwrap();

    assert_eq!(summary.universe, 2);
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.eligible_rows, 2);
    // ETH spread 0.01 stays below spread_low
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.alerts_sent, 1);

    let sent = h.outbox.sent.lock();
    assert_eq!(sent.len(), 1);
    let (severity, html) = &sent[0];
    // 0.80 between Bybit and OKX, medium under default tiers
    assert_eq!(*severity, Severity::Medium);
    assert!(html.contains("💲BTC/USDT"));
    assert!(html.contains("<b>Spread</b>: 0.80000"));
    assert!(html.contains(">Bybit</a> ↔️ <a"));
    assert!(html.contains(">OKX</a>"));
}

#[tokio::test]
async fn test_cooldown_suppresses_until_expiry() {
    let bybit = Arc::new(FixedVenue::new(
        Exchange::Bybit,
        &[("SOLUSDT", Some(dec!(1.5)), Some(dec!(150)))],
    ));
    let mexc = Arc::new(FixedVenue::new(
        Exchange::Mexc,
        &[("SOLUSDT", Some(dec!(0.1)), Some(dec!(150.5)))],
    ));

    // the quote-age guard stays on: simulated cycle times must not age quotes
    let config = fast_config();
    assert_eq!(config.max_quote_age_secs, Some(120));
    let h = harness(
        &["SOLUSDT"],
        vec![bybit.clone(), mexc],
        Outbox::default(),
        config,
        no_allow_list(),
    );
    let t = Utc::now();

    let first = h.scanner.run_cycle(t).await.unwrap();
    assert_eq!(first.alerts_sent, 1);
    assert_eq!(bybit.requests.load(Ordering::SeqCst), 1);

    // T+39min: excluded from fetching entirely
    let second = h.scanner.run_cycle(t + Duration::minutes(39)).await.unwrap();
    assert_eq!(second.cooled_down, 1);
    assert_eq!(second.candidates, 0);
    assert_eq!(bybit.requests.load(Ordering::SeqCst), 1);

    // T+41min: eligible again
    let third = h.scanner.run_cycle(t + Duration::minutes(41)).await.unwrap();
    assert_eq!(third.cooled_down, 0);
    assert_eq!(third.eligible_rows, 1);
    assert_eq!(third.alerts_sent, 1);
    assert_eq!(bybit.requests.load(Ordering::SeqCst), 2);
    assert_eq!(h.outbox.sent.lock().len(), 2);
}

#[tokio::test]
async fn test_delivery_failure_still_starts_cooldown() {
    let a = Arc::new(FixedVenue::new(
        Exchange::Aevo,
        &[("DOGEUSDT", Some(dec!(0.9)), Some(dec!(0.1)))],
    ));
    let b = Arc::new(FixedVenue::new(
        Exchange::BingX,
        &[("DOGEUSDT", Some(dec!(-0.9)), Some(dec!(0.1)))],
    ));

    let h = harness(
        &["DOGEUSDT"],
        vec![a, b],
        Outbox {
            fail: true,
            ..Default::default()
        },
        fast_config(),
        no_allow_list(),
    );
    let t = Utc::now();

    let summary = h.scanner.run_cycle(t).await.unwrap();
    assert_eq!(summary.alerts_failed, 1);
    assert_eq!(h.outbox.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(h.cooldowns.list_active(t).await.unwrap().len(), 1);

    // no retry within the window
    let again = h.scanner.run_cycle(t + Duration::minutes(5)).await.unwrap();
    assert_eq!(again.candidates, 0);
    assert_eq!(h.outbox.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_absent_values_never_source_candidates() {
    let a = Arc::new(FixedVenue::new(
        Exchange::Bitget,
        &[("ARBUSDT", Some(dec!(0.30)), Some(dec!(1)))],
    ));
    let b = Arc::new(FixedVenue::new(
        Exchange::Gate,
        &[("ARBUSDT", None, Some(dec!(1)))],
    ));
    let c = Arc::new(FixedVenue::new(
        Exchange::Okx,
        &[("ARBUSDT", Some(dec!(-3)), None)],
    ));

    let h = harness(
        &["ARBUSDT"],
        vec![a, b, c],
        Outbox::default(),
        fast_config(),
        no_allow_list(),
    );

    let summary = h.scanner.run_cycle(Utc::now()).await.unwrap();

    assert_eq!(summary.rows, 1);
    assert_eq!(summary.eligible_rows, 0);
    assert_eq!(summary.candidates, 0);
    assert!(h.outbox.sent.lock().is_empty());
}

#[tokio::test]
async fn test_snapshot_venue_joins_rows() {
    let hyper = Arc::new(
        FixedVenue::new(
            Exchange::Hyperliquid,
            &[
                ("BTCUSDT", Some(dec!(0.0125)), Some(dec!(64000))),
                ("WIFUSDT", Some(dec!(2)), Some(dec!(2))),
            ],
        )
        .snapshot(),
    );
    let bybit = Arc::new(FixedVenue::new(
        Exchange::Bybit,
        &[("BTCUSDT", Some(dec!(-1.2)), Some(dec!(64010)))],
    ));

    let h = harness(
        &["BTCUSDT"],
        vec![hyper.clone(), bybit],
        Outbox::default(),
        fast_config(),
        no_allow_list(),
    );

    let summary = h.scanner.run_cycle(Utc::now()).await.unwrap();

    // WIF is not tracked and is dropped
    assert_eq!(summary.rows, 1);
    assert_eq!(summary.alerts_sent, 1);
    assert_eq!(hyper.requests.load(Ordering::SeqCst), 1);
    assert_eq!(h.outbox.sent.lock()[0].0, Severity::High);
}

#[tokio::test]
async fn test_threshold_update_applies_next_cycle() {
    let a = Arc::new(FixedVenue::new(
        Exchange::Kucoin,
        &[("TONUSDT", Some(dec!(0.4)), Some(dec!(5)))],
    ));
    let b = Arc::new(FixedVenue::new(
        Exchange::Kcex,
        &[("TONUSDT", Some(dec!(0)), Some(dec!(5)))],
    ));

    let h = harness(
        &["TONUSDT"],
        vec![a, b],
        Outbox::default(),
        fast_config(),
        no_allow_list(),
    );

    h.settings
        .update(ThresholdField::SpreadLow, dec!(0.5))
        .await
        .unwrap();
    assert_eq!(h.scanner.run_cycle(Utc::now()).await.unwrap().candidates, 0);

    h.settings
        .update(ThresholdField::SpreadLow, dec!(0.35))
        .await
        .unwrap();
    let summary = h.scanner.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(summary.alerts_sent, 1);
    assert_eq!(h.outbox.sent.lock()[0].0, Severity::Low);
}

#[tokio::test]
async fn test_withdrawal_files_annotate_alert() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("withdrawable_bybit.txt"), "BTC\nETH\n").unwrap();

    let bybit = Arc::new(FixedVenue::new(
        Exchange::Bybit,
        &[("LINKUSDT", Some(dec!(1)), Some(dec!(15)))],
    ));
    let okx = Arc::new(FixedVenue::new(
        Exchange::Okx,
        &[("LINKUSDT", Some(dec!(0)), Some(dec!(15)))],
    ));

    let h = harness(
        &["LINKUSDT"],
        vec![bybit, okx],
        Outbox::default(),
        fast_config(),
        Arc::new(FileAllowList::new(dir.path())),
    );

    h.scanner.run_cycle(Utc::now()).await.unwrap();

    let html = h.outbox.sent.lock()[0].1.clone();
    // Bybit lists only BTC and ETH; OKX has no file and fails open
    assert!(html.contains("Bybit ❌ | OKX ✅"));
    assert!(html.contains("🕰 <b>Funding history:</b>\n\nBybit:\n\n"));
}

#[tokio::test]
async fn test_required_exchange_restores_strict_join() {
    let bybit = Arc::new(FixedVenue::new(
        Exchange::Bybit,
        &[("BTCUSDT", Some(dec!(2)), Some(dec!(100)))],
    ));
    let okx = Arc::new(FixedVenue::new(
        Exchange::Okx,
        &[("BTCUSDT", Some(dec!(0)), Some(dec!(100)))],
    ));

    let h = harness(
        &["BTCUSDT"],
        vec![bybit, okx],
        Outbox::default(),
        ScannerConfig {
            inter_batch_delay_ms: 0,
            required_exchanges: vec![Exchange::Bitget],
            ..Default::default()
        },
        no_allow_list(),
    );

    let summary = h.scanner.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(summary.alerts_sent, 0);
}

#[tokio::test]
async fn test_stale_venue_is_left_out_of_the_pair() {
    // Bybit's quote is ten minutes old and would otherwise win with 3.0
    let bybit = Arc::new(
        FixedVenue::new(
            Exchange::Bybit,
            &[("NEARUSDT", Some(dec!(3.0)), Some(dec!(5)))],
        )
        .lagging(Duration::minutes(10)),
    );
    let okx = Arc::new(FixedVenue::new(
        Exchange::Okx,
        &[("NEARUSDT", Some(dec!(0)), Some(dec!(5)))],
    ));
    let gate = Arc::new(FixedVenue::new(
        Exchange::Gate,
        &[("NEARUSDT", Some(dec!(0.5)), Some(dec!(5)))],
    ));

    let h = harness(
        &["NEARUSDT"],
        vec![bybit, okx, gate],
        Outbox::default(),
        fast_config(),
        no_allow_list(),
    );

    let summary = h.scanner.run_cycle(Utc::now()).await.unwrap();

    assert_eq!(summary.eligible_rows, 1);
    assert_eq!(summary.alerts_sent, 1);
    let sent = h.outbox.sent.lock();
    assert_eq!(sent[0].0, Severity::Low);
    assert!(sent[0].1.contains("<b>Spread</b>: 0.50000"));
    assert!(!sent[0].1.contains(">Bybit</a>"));
}

#[tokio::test]
async fn test_stale_quotes_admitted_when_guard_disabled() {
    let bybit = Arc::new(
        FixedVenue::new(
            Exchange::Bybit,
            &[("NEARUSDT", Some(dec!(3.0)), Some(dec!(5)))],
        )
        .lagging(Duration::minutes(10)),
    );
    let okx = Arc::new(FixedVenue::new(
        Exchange::Okx,
        &[("NEARUSDT", Some(dec!(0)), Some(dec!(5)))],
    ));

    let h = harness(
        &["NEARUSDT"],
        vec![bybit, okx],
        Outbox::default(),
        ScannerConfig {
            inter_batch_delay_ms: 0,
            max_quote_age_secs: None,
            ..Default::default()
        },
        no_allow_list(),
    );

    let summary = h.scanner.run_cycle(Utc::now()).await.unwrap();

    assert_eq!(summary.alerts_sent, 1);
    assert_eq!(h.outbox.sent.lock()[0].0, Severity::High);
}
