//! Dispatch of winning candidates to the notification sink.

use crate::cooldown::CooldownGate;
use crate::detector::SpreadCandidate;
use crate::format::{render_alert, AlertView, VenueNote};
use chrono::{DateTime, Utc};
use funding_arb_core::{
    Exchange, ExchangeAdapter, HistoryPoint, NotificationSink, Severity, StoreError, Symbol,
    WithdrawalAllowList,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// How a dispatch ended once the cooldown was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    DeliveryFailed,
}

/// Renders and delivers alerts, committing cooldowns first.
pub struct AlertRouter {
    adapters: BTreeMap<Exchange, Arc<dyn ExchangeAdapter>>,
    sink: Arc<dyn NotificationSink>,
    allow_list: Arc<dyn WithdrawalAllowList>,
    gate: CooldownGate,
    risky: HashSet<Exchange>,
    history_depth: usize,
}

impl AlertRouter {
    #[must_use]
    pub fn new(
        adapters: &[Arc<dyn ExchangeAdapter>],
        sink: Arc<dyn NotificationSink>,
        allow_list: Arc<dyn WithdrawalAllowList>,
        gate: CooldownGate,
    ) -> Self {
        Self {
            adapters: adapters.iter().map(|a| (a.id(), Arc::clone(a))).collect(),
            sink,
            allow_list,
            gate,
            risky: HashSet::new(),
            history_depth: 4,
        }
    }

    #[must_use]
    pub fn with_risky(mut self, risky: impl IntoIterator<Item = Exchange>) -> Self {
        self.risky = risky.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    /// Commits the cooldown for the candidate's symbol, then sends the alert.
    ///
    /// Delivery failures are logged and reported as
    /// [`DispatchOutcome::DeliveryFailed`]; the cooldown stays committed.
    ///
    /// # Errors
    ///
    /// Returns error if the cooldown cannot be committed. Nothing is sent in
    /// that case.
    #[instrument(
        skip(self, candidate),
        fields(symbol = %candidate.symbol, severity = severity.as_str()),
        level = "debug"
    )]
    pub async fn dispatch(
        &self,
        candidate: &SpreadCandidate,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, StoreError> {
        let expires_at = self.gate.commit(&candidate.symbol, now).await?;

        let (history_a, history_b, venue_a, venue_b) = tokio::join!(
            self.history(candidate.exchange_a, &candidate.symbol),
            self.history(candidate.exchange_b, &candidate.symbol),
            self.note(candidate.exchange_a, &candidate.symbol),
            self.note(candidate.exchange_b, &candidate.symbol),
        );
        let histories = [history_a, history_b].into_iter().flatten().collect();

        let view = AlertView {
            candidate,
            venue_a,
            venue_b,
            histories,
        };
        let html = render_alert(&view);

        match self.sink.send(severity, &html).await {
            Ok(()) => {
                info!(
                    a = %candidate.exchange_a,
                    b = %candidate.exchange_b,
                    spread = %candidate.spread,
                    %expires_at,
                    "Alert sent"
                );
                Ok(DispatchOutcome::Sent)
            }
            Err(e) => {
                warn!(error = %e, "Alert delivery failed; cooldown kept");
                Ok(DispatchOutcome::DeliveryFailed)
            }
        }
    }

    async fn history(
        &self,
        exchange: Exchange,
        symbol: &Symbol,
    ) -> Option<(Exchange, Vec<HistoryPoint>)> {
        let adapter = self.adapters.get(&exchange)?;
        match adapter.fetch_history(symbol, self.history_depth).await {
            Ok(points) => Some((
                exchange,
                HistoryPoint::newest_first(points, self.history_depth),
            )),
            Err(e) => {
                warn!(%exchange, %symbol, error = %e, "History fetch failed");
                None
            }
        }
    }

    async fn note(&self, exchange: Exchange, symbol: &Symbol) -> VenueNote {
        // no data means withdrawals are assumed open
        let withdrawable = self
            .allow_list
            .withdrawable(exchange)
            .await
            .map_or(true, |set| set.contains(symbol.as_str()));

        VenueNote {
            exchange,
            risky: self.risky.contains(&exchange),
            withdrawable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use funding_arb_core::{CooldownStore, FetchError, NotifyError, RateQuote};
    use funding_arb_store::MemoryCooldownStore;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct HistoryAdapter {
        exchange: Exchange,
        fail: bool,
    }

    #[async_trait]
    impl ExchangeAdapter for HistoryAdapter {
        fn id(&self) -> Exchange {
            self.exchange
        }

        async fn fetch_current(&self, _symbol: &Symbol) -> Result<RateQuote, FetchError> {
            Err(FetchError::unsupported("history only"))
        }

        async fn fetch_history(
            &self,
            _symbol: &Symbol,
            _count: usize,
        ) -> Result<Vec<HistoryPoint>, FetchError> {
            if self.fail {
                return Err(FetchError::transient("HTTP 503"));
            }
            let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
            // oldest first, more than asked for
            Ok((0..6)
                .map(|h| HistoryPoint::new(dec!(0.01) * Decimal::from(h), base + Duration::hours(h)))
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(Severity, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, severity: Severity, html: &str) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Delivery("connection refused".into()));
            }
            self.sent.lock().push((severity, html.to_string()));
            Ok(())
        }
    }

    struct StaticAllowList(HashMap<Exchange, HashSet<String>>);

    #[async_trait]
    impl WithdrawalAllowList for StaticAllowList {
        async fn withdrawable(&self, exchange: Exchange) -> Option<HashSet<String>> {
            self.0.get(&exchange).cloned()
        }
    }

    fn candidate() -> SpreadCandidate {
        SpreadCandidate {
            symbol: Symbol::normalize("WIF").unwrap(),
            exchange_a: Exchange::Bybit,
            exchange_b: Exchange::Kcex,
            rate_a: dec!(0.5),
            rate_b: dec!(-0.25),
            price_a: dec!(2.01),
            price_b: dec!(2.02),
            spread: dec!(0.75),
            price_divergence_pct: dec!(0.4975),
        }
    }

    fn router(
        sink: Arc<RecordingSink>,
        store: Arc<MemoryCooldownStore>,
        allow: HashMap<Exchange, HashSet<String>>,
        kcex_history_fails: bool,
    ) -> AlertRouter {
        let adapters: Vec<Arc<dyn ExchangeAdapter>> = vec![
            Arc::new(HistoryAdapter {
                exchange: Exchange::Bybit,
                fail: false,
            }),
            Arc::new(HistoryAdapter {
                exchange: Exchange::Kcex,
                fail: kcex_history_fails,
            }),
        ];
        AlertRouter::new(
            &adapters,
            sink,
            Arc::new(StaticAllowList(allow)),
            CooldownGate::new(store, Duration::minutes(40)),
        )
    }

    // ==================== Dispatch Tests ====================

    #[tokio::test]
    async fn test_dispatch_commits_and_sends() {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(MemoryCooldownStore::new());
        let router = router(sink.clone(), store.clone(), HashMap::new(), false);
        let now = Utc::now();

        let outcome = router.dispatch(&candidate(), Severity::Medium, now).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent);
        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Severity::Medium);
        assert!(sent[0].1.contains("💲WIF/USDT"));
        assert!(sent[0].1.contains("\nBybit:\n\n0.0500% (2024-05-01 05:00:00)\n"));
        assert!(sent[0].1.contains("\nKCEX:\n"));

        let active = store.list_active(now).await.unwrap();
        assert_eq!(active[0].1, now + Duration::minutes(40));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let sink = Arc::new(RecordingSink::default());
        let router = router(
            sink.clone(),
            Arc::new(MemoryCooldownStore::new()),
            HashMap::new(),
            false,
        )
        .with_history_depth(2);

        router.dispatch(&candidate(), Severity::Low, Utc::now()).await.unwrap();

        let html = sink.sent.lock()[0].1.clone();
        let bybit_section = html.split("\nBybit:\n\n").nth(1).unwrap();
        let lines: Vec<_> = bybit_section.lines().take_while(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["0.0500% (2024-05-01 05:00:00)", "0.0400% (2024-05-01 04:00:00)"]);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_cooldown() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryCooldownStore::new());
        let router = router(sink, store.clone(), HashMap::new(), false);
        let now = Utc::now();

        let outcome = router.dispatch(&candidate(), Severity::High, now).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::DeliveryFailed);
        assert_eq!(store.list_active(now).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_failure_omits_section() {
        let sink = Arc::new(RecordingSink::default());
        let router = router(
            sink.clone(),
            Arc::new(MemoryCooldownStore::new()),
            HashMap::new(),
            true,
        );

        let outcome = router.dispatch(&candidate(), Severity::Low, Utc::now()).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent);
        let html = sink.sent.lock()[0].1.clone();
        assert!(html.contains("\nBybit:\n"));
        assert!(!html.contains("\nKCEX:\n"));
    }

    // ==================== Annotation Tests ====================

    #[tokio::test]
    async fn test_withdrawals_fail_open_and_risky_marker() {
        let sink = Arc::new(RecordingSink::default());
        let mut allow = HashMap::new();
        // Bybit has data without WIF; KCEX has none
        allow.insert(Exchange::Bybit, ["BTCUSDT".to_string()].into_iter().collect());
        let router = router(sink.clone(), Arc::new(MemoryCooldownStore::new()), allow, false)
            .with_risky([Exchange::Kcex]);

        router.dispatch(&candidate(), Severity::Low, Utc::now()).await.unwrap();

        let html = sink.sent.lock()[0].1.clone();
        assert!(html.contains("Bybit ❌ | KCEX ✅"));
        assert!(html.contains("KCEX</a> - 🚩 high risk"));
        assert!(!html.contains("Bybit</a> - 🚩"));
    }
}
