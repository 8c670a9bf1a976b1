use crate::domain::ticker::TickerSymbol;

pub const NOTE_NO_HISTORY: &str = "no historical price data found";
pub const NOTE_FETCH_FAILED: &str = "fetch failed";

/// Why a symbol has no numbers in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchIssue {
    NoHistory,
    FetchFailed,
}

impl FetchIssue {
    pub fn note(self) -> &'static str {
        match self {
            FetchIssue::NoHistory => NOTE_NO_HISTORY,
            FetchIssue::FetchFailed => NOTE_FETCH_FAILED,
        }
    }
}

/// Numbers for one symbol, already rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteMetrics {
    pub low_365d: f64,
    pub high_365d: f64,
    pub last_close: f64,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Priced(QuoteMetrics),
    Failed(FetchIssue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    pub symbol: TickerSymbol,
    pub outcome: QuoteOutcome,
}

impl QuoteRecord {
    pub fn priced(symbol: TickerSymbol, metrics: QuoteMetrics) -> Self {
        Self {
            symbol,
            outcome: QuoteOutcome::Priced(metrics),
        }
    }

    pub fn failed(symbol: TickerSymbol, issue: FetchIssue) -> Self {
        Self {
            symbol,
            outcome: QuoteOutcome::Failed(issue),
        }
    }

    pub fn metrics(&self) -> Option<&QuoteMetrics> {
        match &self.outcome {
            QuoteOutcome::Priced(m) => Some(m),
            QuoteOutcome::Failed(_) => None,
        }
    }

    /// Empty on success.
    pub fn note(&self) -> &'static str {
        match &self.outcome {
            QuoteOutcome::Priced(_) => "",
            QuoteOutcome::Failed(issue) => issue.note(),
        }
    }
}

/// One fetch cycle's records, in fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    records: Vec<QuoteRecord>,
}

impl ResultTable {
    pub fn new(records: Vec<QuoteRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[QuoteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable sort by symbol, ascending.
    pub fn sorted_by_symbol(&self) -> Vec<&QuoteRecord> {
        let mut out: Vec<&QuoteRecord> = self.records.iter().collect();
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        out
    }
}

impl FromIterator<QuoteRecord> for ResultTable {
    fn from_iter<T: IntoIterator<Item = QuoteRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
