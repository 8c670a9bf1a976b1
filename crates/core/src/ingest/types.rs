use chrono::NaiveDate;

/// One trading day. Rows with missing prices are dropped by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Valuation ratios. `None` when the provider does not report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fundamentals {
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
}
