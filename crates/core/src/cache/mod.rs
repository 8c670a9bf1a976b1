pub mod slot;

use crate::domain::quote::ResultTable;
use crate::domain::ticker::TickerList;
use crate::fetch::progress::FetchProgress;
use crate::fetch::QuoteFetcher;
use chrono::{DateTime, Duration, Utc};
use slot::{Memoized, TtlSlot};

/// Memoizes the latest fetch, keyed by the exact ticker list.
pub struct QuoteCache {
    fetcher: QuoteFetcher,
    slot: TtlSlot<TickerList, ResultTable>,
}

impl QuoteCache {
    pub fn new(fetcher: QuoteFetcher, ttl: Duration) -> Self {
        Self {
            fetcher,
            slot: TtlSlot::new(ttl),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.slot.ttl()
    }

    pub async fn get_or_fetch(
        &mut self,
        tickers: &TickerList,
        progress: &dyn FetchProgress,
    ) -> Memoized<ResultTable> {
        self.get_or_fetch_at(tickers, Utc::now(), progress).await
    }

    pub async fn get_or_fetch_at(
        &mut self,
        tickers: &TickerList,
        now: DateTime<Utc>,
        progress: &dyn FetchProgress,
    ) -> Memoized<ResultTable> {
        let fetcher = &self.fetcher;
        let out = self
            .slot
            .get_or_insert_with(tickers.clone(), now, || fetcher.fetch(tickers, progress))
            .await;

        if out.from_cache {
            tracing::debug!(tickers = tickers.len(), stored_at = %out.stored_at, "quote cache hit");
        }
        out
    }

    /// Manual refresh: the next lookup always fetches.
    pub fn invalidate(&mut self) {
        tracing::info!("quote cache invalidated");
        self.slot.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fake::FakeProvider;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap()
    }

    fn setup() -> (Arc<FakeProvider>, QuoteCache) {
        let provider = Arc::new(
            FakeProvider::default()
                .with_bars("AAPL", &[(180.0, 240.0, 230.0)])
                .with_bars("MSFT", &[(350.0, 470.0, 420.0)]),
        );
        let cache = QuoteCache::new(QuoteFetcher::new(provider.clone()), Duration::seconds(300));
        (provider, cache)
    }

    #[tokio::test]
    async fn same_list_within_ttl_fetches_once() {
        let (provider, mut cache) = setup();
        let list = TickerList::parse_comma_separated("AAPL, MSFT");

        let a = cache.get_or_fetch_at(&list, t0(), &()).await;
        let b = cache
            .get_or_fetch_at(&list, t0() + Duration::seconds(120), &())
            .await;

        assert_eq!(a.value, b.value);
        assert!(b.from_cache);
        assert_eq!(provider.history_calls(), 2);
    }

    #[tokio::test]
    async fn expiry_and_list_change_refetch() {
        let (provider, mut cache) = setup();
        let list = TickerList::parse_comma_separated("AAPL, MSFT");

        cache.get_or_fetch_at(&list, t0(), &()).await;
        cache
            .get_or_fetch_at(&list, t0() + Duration::seconds(300), &())
            .await;
        assert_eq!(provider.history_calls(), 4);

        let other = TickerList::parse_comma_separated("MSFT");
        let out = cache
            .get_or_fetch_at(&other, t0() + Duration::seconds(301), &())
            .await;
        assert!(!out.from_cache);
        assert_eq!(provider.history_calls(), 5);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (provider, mut cache) = setup();
        let list = TickerList::parse_comma_separated("AAPL");

        cache.get_or_fetch_at(&list, t0(), &()).await;
        cache.invalidate();
        let out = cache
            .get_or_fetch_at(&list, t0() + Duration::seconds(1), &())
            .await;

        assert!(!out.from_cache);
        assert_eq!(provider.history_calls(), 2);
    }
}
