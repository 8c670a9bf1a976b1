use crate::domain::ticker::TickerSymbol;
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::types::{DailyBar, Fundamentals};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Canned responses keyed by symbol. Unknown symbols have no history.
#[derive(Default)]
pub(crate) struct FakeProvider {
    pub histories: HashMap<String, Vec<DailyBar>>,
    pub fundamentals: HashMap<String, Fundamentals>,
    pub failing: Vec<String>,
    pub failing_fundamentals: Vec<String>,
    pub history_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn with_bars(mut self, symbol: &str, bars: &[(f64, f64, f64)]) -> Self {
        let start = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let bars = bars
            .iter()
            .enumerate()
            .map(|(i, (low, high, close))| DailyBar {
                date: start + chrono::Duration::days(i as i64),
                high: *high,
                low: *low,
                close: *close,
            })
            .collect();
        self.histories.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_ratios(mut self, symbol: &str, trailing: Option<f64>, forward: Option<f64>) -> Self {
        self.fundamentals.insert(
            symbol.to_string(),
            Fundamentals {
                trailing_pe: trailing,
                forward_pe: forward,
            },
        );
        self
    }

    pub fn failing_on(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    /// History succeeds but the ratio lookup errors.
    pub fn failing_fundamentals_on(mut self, symbol: &str) -> Self {
        self.failing_fundamentals.push(symbol.to_string());
        self
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FakeProvider {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn daily_history(&self, symbol: &TickerSymbol) -> anyhow::Result<Vec<DailyBar>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|s| s == symbol.as_str()) {
            anyhow::bail!("simulated outage for {symbol}");
        }
        Ok(self
            .histories
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn fundamentals(&self, symbol: &TickerSymbol) -> anyhow::Result<Fundamentals> {
        if self.failing_fundamentals.iter().any(|s| s == symbol.as_str()) {
            anyhow::bail!("simulated quote outage for {symbol}");
        }
        Ok(self
            .fundamentals
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default())
    }
}
