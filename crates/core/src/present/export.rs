use crate::domain::quote::ResultTable;
use crate::present::table::{row_cells, COLUMNS};
use crate::time::us_market;
use anyhow::Context;
use chrono::{DateTime, Utc};

/// Lets spreadsheet tools detect UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Same rows and columns as the rendered table, with prices as plain numbers.
pub fn export_csv(table: &ResultTable) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer
        .write_record(COLUMNS)
        .context("failed to write csv header")?;

    for record in table.sorted_by_symbol() {
        writer
            .write_record(row_cells(record, |v| v.to_string()))
            .with_context(|| format!("failed to write csv row for {}", record.symbol))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv export: {}", e.error()))
}

/// `us_stocks_YYYYMMDD.csv`, dated in US Eastern time.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!(
        "us_stocks_{}.csv",
        us_market::eastern_date(now).format("%Y%m%d")
    )
}
