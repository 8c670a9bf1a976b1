use crate::domain::quote::{QuoteRecord, ResultTable};

pub const COLUMNS: [&str; 7] = [
    "Symbol",
    "Low (365d)",
    "High (365d)",
    "Last Close",
    "Trailing P/E",
    "Forward P/E",
    "Note",
];

/// Shown for a ratio the provider did not report.
pub const NOT_AVAILABLE: &str = "N/A";

/// Display-ready cells, one row per record, sorted by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub columns: [&'static str; 7],
    pub rows: Vec<[String; 7]>,
}

pub fn render(table: &ResultTable) -> TableView {
    TableView {
        columns: COLUMNS,
        rows: table
            .sorted_by_symbol()
            .into_iter()
            .map(|r| row_cells(r, format_price))
            .collect(),
    }
}

/// Cells for one record. Price formatting is left to the caller so the export can
/// write plain numbers.
pub(crate) fn row_cells(record: &QuoteRecord, price: fn(f64) -> String) -> [String; 7] {
    let symbol = record.symbol.to_string();
    let note = record.note().to_string();
    match record.metrics() {
        Some(m) => [
            symbol,
            price(m.low_365d),
            price(m.high_365d),
            price(m.last_close),
            format_ratio(m.trailing_pe),
            format_ratio(m.forward_pe),
            note,
        ],
        None => [
            symbol,
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            note,
        ],
    }
}

pub fn format_price(v: f64) -> String {
    format!("${v:.2}")
}

pub fn format_ratio(v: Option<f64>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

impl TableView {
    /// Column-aligned plain text for terminals.
    pub fn to_plain_text(&self) -> String {
        let mut widths = self.columns.map(|c| c.chars().count());
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, self.columns.iter().copied(), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, rule.iter().map(String::as_str), &widths);
        for row in &self.rows {
            push_line(&mut out, row.iter().map(String::as_str), &widths);
        }
        out
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize; 7]) {
    let line: Vec<String> = cells
        .zip(widths.iter())
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
