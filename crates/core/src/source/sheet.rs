use reqwest::StatusCode;

// Longer cells in column 0 are notes or titles, not symbols.
const MAX_SYMBOL_LEN: usize = 9;
const HEADER_SENTINEL: &str = "TICKER";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("ticker sheet request failed")]
    Request(#[source] reqwest::Error),

    #[error("ticker sheet HTTP {0}")]
    Status(StatusCode),

    #[error("ticker sheet returned an HTML page instead of CSV")]
    NotCsv,

    #[error("ticker sheet is not valid CSV")]
    Malformed(#[from] csv::Error),
}

/// A published single-column CSV document listing symbols, no header row.
#[derive(Debug, Clone)]
pub struct SheetSource {
    http: reqwest::Client,
    url: String,
    edit_url: Option<String>,
}

impl SheetSource {
    pub fn new(http: reqwest::Client, url: impl Into<String>, edit_url: Option<String>) -> Self {
        Self {
            http,
            url: url.into(),
            edit_url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Human-facing link for editing the list. Never fetched.
    pub fn edit_url(&self) -> Option<&str> {
        self.edit_url.as_deref()
    }

    pub async fn load(&self) -> Result<Vec<String>, SourceError> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(SourceError::Request)?;

        let status = res.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let body = res.text().await.map_err(SourceError::Request)?;
        parse_sheet_rows(&body)
    }
}

/// Column 0 of every row, minus blanks, overlong cells and a `TICKER` header.
pub fn parse_sheet_rows(body: &str) -> Result<Vec<String>, SourceError> {
    let head = body.trim_start().get(..64).unwrap_or(body.trim_start());
    let head = head.to_ascii_lowercase();
    if head.starts_with("<!doctype") || head.starts_with("<html") {
        return Err(SourceError::NotCsv);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(cell) = record.get(0) else {
            continue;
        };
        let cell = cell.trim();
        if cell.is_empty()
            || cell.chars().count() > MAX_SYMBOL_LEN
            || cell.eq_ignore_ascii_case(HEADER_SENTINEL)
        {
            continue;
        }
        out.push(cell.to_string());
    }
    Ok(out)
}
