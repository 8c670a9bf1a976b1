use crate::domain::ticker::TickerSymbol;
use crate::ingest::types::{DailyBar, Fundamentals};
use anyhow::Result;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Trailing year of daily bars, oldest first. An unknown symbol yields an empty vec.
    async fn daily_history(&self, symbol: &TickerSymbol) -> Result<Vec<DailyBar>>;

    async fn fundamentals(&self, symbol: &TickerSymbol) -> Result<Fundamentals>;
}
