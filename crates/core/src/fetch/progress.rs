use crate::domain::ticker::TickerSymbol;

const DEFAULT_LOG_EVERY: usize = 25;

/// Receives `position` (1-based) out of `total` before each symbol is fetched.
pub trait FetchProgress: Send + Sync {
    fn on_symbol(&self, position: usize, total: usize, symbol: &TickerSymbol);

    fn finished(&self) {}
}

impl FetchProgress for () {
    fn on_symbol(&self, _position: usize, _total: usize, _symbol: &TickerSymbol) {}
}

#[derive(Debug, Clone)]
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    pub fn every(n: usize) -> Self {
        Self { every: n }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::every(DEFAULT_LOG_EVERY)
    }
}

impl FetchProgress for LogProgress {
    fn on_symbol(&self, position: usize, total: usize, symbol: &TickerSymbol) {
        tracing::debug!(position, total, %symbol, "fetching");
        if self.every != 0 && (position == 1 || position == total || position % self.every == 0) {
            tracing::info!(processed = position, total, "quote fetch progress");
        }
    }
}
