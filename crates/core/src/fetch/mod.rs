pub mod progress;

use crate::domain::quote::{round2, FetchIssue, QuoteMetrics, QuoteOutcome, QuoteRecord, ResultTable};
use crate::domain::ticker::{TickerList, TickerSymbol};
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::types::DailyBar;
use progress::FetchProgress;
use std::sync::Arc;

/// Fetches one symbol at a time. A failing symbol becomes an annotated row; the batch
/// always completes.
#[derive(Clone)]
pub struct QuoteFetcher {
    provider: Arc<dyn MarketDataProvider>,
}

impl QuoteFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// One record per symbol, in list order.
    pub async fn fetch(&self, tickers: &TickerList, progress: &dyn FetchProgress) -> ResultTable {
        let total = tickers.len();
        let mut records = Vec::with_capacity(total);
        let mut failures: usize = 0;

        for (idx, symbol) in tickers.iter().enumerate() {
            progress.on_symbol(idx + 1, total, symbol);

            let outcome = match self.fetch_one(symbol).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    failures += 1;
                    tracing::warn!(
                        %symbol,
                        provider = self.provider.provider_name(),
                        error = %format!("{err:#}"),
                        "quote fetch failed"
                    );
                    QuoteOutcome::Failed(FetchIssue::FetchFailed)
                }
            };
            records.push(QuoteRecord {
                symbol: symbol.clone(),
                outcome,
            });
        }

        progress.finished();
        tracing::info!(total, failures, "quote fetch finished");
        ResultTable::new(records)
    }

    async fn fetch_one(&self, symbol: &TickerSymbol) -> anyhow::Result<QuoteOutcome> {
        let bars = self.provider.daily_history(symbol).await?;
        let Some((low, high, close)) = summarize_history(&bars) else {
            return Ok(QuoteOutcome::Failed(FetchIssue::NoHistory));
        };

        let fundamentals = self.provider.fundamentals(symbol).await?;

        Ok(QuoteOutcome::Priced(QuoteMetrics {
            low_365d: round2(low),
            high_365d: round2(high),
            last_close: round2(close),
            trailing_pe: ratio(fundamentals.trailing_pe),
            forward_pe: ratio(fundamentals.forward_pe),
        }))
    }
}

/// `(min low, max high, last close)`, or `None` for an empty history.
pub fn summarize_history(bars: &[DailyBar]) -> Option<(f64, f64, f64)> {
    let last = bars.last()?;
    let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    Some((low, high, last.close))
}

// A zero ratio carries no information and is reported like a missing one.
fn ratio(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x != 0.0).map(round2)
}
