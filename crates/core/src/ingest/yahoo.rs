use crate::config::Settings;
use crate::domain::ticker::TickerSymbol;
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::types::{DailyBar, Fundamentals};
use anyhow::{Context, Result};
use chrono::DateTime;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

// Yahoo answers 429 to the default reqwest agent.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const HISTORY_RANGE: &str = "1y";
const HISTORY_INTERVAL: &str = "1d";

// A failed crumb negotiation is not retried until this has passed.
const SESSION_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct YahooProvider {
    http: reqwest::Client,
    base_url: String,
    cookie_url: String,

    // Crumb is negotiated once per process and dropped when Yahoo rejects it.
    session: tokio::sync::Mutex<SessionState>,
}

#[derive(Debug)]
enum SessionState {
    Unknown,
    Ready(YahooSession),
    Unavailable { since: Instant },
}

#[derive(Debug, Clone)]
struct YahooSession {
    cookie: Option<String>,
    crumb: String,
}

impl YahooProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let cookie_url = settings
            .market_data_cookie_url
            .clone()
            .unwrap_or_else(|| DEFAULT_COOKIE_URL.to_string());

        let mut builder = reqwest::Client::builder().user_agent(BROWSER_USER_AGENT);
        if let Some(secs) = settings.market_data_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("failed to build market data http client")?;

        Ok(Self::new(http, base_url, cookie_url))
    }

    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        cookie_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cookie_url: cookie_url.into(),
            session: tokio::sync::Mutex::new(SessionState::Unknown),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid market data base url: {}", self.base_url))?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                anyhow::anyhow!("market data base url cannot carry a path: {}", self.base_url)
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn session(&self) -> Option<YahooSession> {
        let mut guard = self.session.lock().await;
        match &*guard {
            SessionState::Ready(cached) => return Some(cached.clone()),
            SessionState::Unavailable { since } if since.elapsed() < SESSION_RETRY_AFTER => {
                return None;
            }
            _ => {}
        }

        match self.fetch_session().await {
            Ok(session) => {
                *guard = SessionState::Ready(session.clone());
                Some(session)
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "yahoo crumb unavailable; requesting fundamentals without it");
                *guard = SessionState::Unavailable {
                    since: Instant::now(),
                };
                None
            }
        }
    }

    async fn fetch_session(&self) -> Result<YahooSession> {
        // The cookie host answers 404 but still sets the session cookie.
        let res = self
            .http
            .get(&self.cookie_url)
            .send()
            .await
            .context("yahoo cookie request failed")?;
        let pairs: Vec<String> = res
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|s| s.split(';').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let cookie = (!pairs.is_empty()).then(|| pairs.join("; "));

        let mut req = self.http.get(self.endpoint(&["v1", "test", "getcrumb"])?);
        if let Some(cookie) = &cookie {
            req = req.header(COOKIE, cookie);
        }
        let res = req.send().await.context("yahoo crumb request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read yahoo crumb response")?;
        if !status.is_success() {
            anyhow::bail!("yahoo crumb HTTP {status}: {text}");
        }

        let crumb = text.trim();
        anyhow::ensure!(
            is_plausible_crumb(crumb),
            "yahoo crumb response does not look like a crumb: {crumb}"
        );

        Ok(YahooSession {
            cookie,
            crumb: crumb.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo"
    }

    async fn daily_history(&self, symbol: &TickerSymbol) -> Result<Vec<DailyBar>> {
        let url = self.endpoint(&["v8", "finance", "chart", symbol.as_str()])?;
        let res = self
            .http
            .get(url)
            .query(&[("range", HISTORY_RANGE), ("interval", HISTORY_INTERVAL)])
            .send()
            .await
            .context("yahoo chart request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read yahoo chart response")?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(%symbol, "yahoo chart has no data; symbol may be delisted");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            anyhow::bail!("yahoo chart HTTP {status}: {text}");
        }

        let envelope = serde_json::from_str::<ChartEnvelope>(&text)
            .with_context(|| format!("failed to parse yahoo chart response for {symbol}"))?;
        chart_bars(envelope)
    }

    async fn fundamentals(&self, symbol: &TickerSymbol) -> Result<Fundamentals> {
        let session = self.session().await;

        let mut query = vec![("symbols", symbol.as_str())];
        if let Some(s) = &session {
            query.push(("crumb", s.crumb.as_str()));
        }

        let mut req = self
            .http
            .get(self.endpoint(&["v7", "finance", "quote"])?)
            .query(&query);
        if let Some(cookie) = session.as_ref().and_then(|s| s.cookie.as_deref()) {
            req = req.header(COOKIE, cookie);
        }
        let res = req.send().await.context("yahoo quote request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read yahoo quote response")?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            *self.session.lock().await = SessionState::Unknown;
        }
        if !status.is_success() {
            anyhow::bail!("yahoo quote HTTP {status}: {text}");
        }

        let envelope = serde_json::from_str::<QuoteEnvelope>(&text)
            .with_context(|| format!("failed to parse yahoo quote response for {symbol}"))?;
        quote_fundamentals(envelope, symbol)
    }
}

fn is_plausible_crumb(s: &str) -> bool {
    !s.is_empty() && s.len() < 100 && !s.contains(char::is_whitespace) && !s.contains('<')
}

fn chart_bars(envelope: ChartEnvelope) -> Result<Vec<DailyBar>> {
    if let Some(err) = envelope.chart.error {
        if err.code == "Not Found" {
            return Ok(Vec::new());
        }
        anyhow::bail!("yahoo chart error {}: {}", err.code, err.description);
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let (Some(high), Some(low), Some(close)) = (
            cell(&quote.high, i),
            cell(&quote.low, i),
            cell(&quote.close, i),
        ) else {
            continue;
        };
        let Some(at) = DateTime::from_timestamp(*ts, 0) else {
            continue;
        };
        bars.push(DailyBar {
            date: at.date_naive(),
            high,
            low,
            close,
        });
    }
    Ok(bars)
}

fn cell(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten().filter(|v| v.is_finite())
}

fn quote_fundamentals(envelope: QuoteEnvelope, symbol: &TickerSymbol) -> Result<Fundamentals> {
    let body = envelope.quote_response;
    if let Some(err) = body.error {
        anyhow::bail!("yahoo quote error {}: {}", err.code, err.description);
    }

    let items = body.result.unwrap_or_default();
    let item = items
        .iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(symbol.as_str()));

    Ok(item
        .map(|q| Fundamentals {
            trailing_pe: q.trailing_pe,
            forward_pe: q.forward_pe,
        })
        .unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponseBody,
}

#[derive(Debug, Deserialize)]
struct QuoteResponseBody {
    result: Option<Vec<QuoteItem>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct QuoteItem {
    #[serde(default)]
    symbol: String,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sym(s: &str) -> TickerSymbol {
        TickerSymbol::parse(s).unwrap()
    }

    fn provider(server: &MockServer) -> YahooProvider {
        YahooProvider::new(reqwest::Client::new(), server.uri(), server.uri())
    }

    #[test]
    fn chart_rows_with_null_prices_are_dropped() {
        let v = json!({
            "chart": {
                "result": [{
                    "timestamp": [1759325400, 1759411800, 1759498200],
                    "indicators": {
                        "quote": [{
                            "high": [11.0, null, 13.0],
                            "low": [9.0, null, 10.5],
                            "close": [10.0, null, 12.5]
                        }]
                    }
                }],
                "error": null
            }
        });

        let bars = chart_bars(serde_json::from_value(v).unwrap()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(bars[1].close, 12.5);
    }

    #[test]
    fn chart_without_timestamps_is_empty() {
        let v = json!({
            "chart": {
                "result": [{"indicators": {"quote": [{}]}}],
                "error": null
            }
        });
        assert!(chart_bars(serde_json::from_value(v).unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn chart_error_other_than_not_found_is_an_error() {
        let v = json!({
            "chart": {
                "result": null,
                "error": {"code": "Bad Request", "description": "Invalid input"}
            }
        });
        assert!(chart_bars(serde_json::from_value(v).unwrap()).is_err());
    }

    #[tokio::test]
    async fn fetches_history_from_chart_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("range", "1y"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chart": {
                    "result": [{
                        "timestamp": [1759325400, 1759411800],
                        "indicators": {"quote": [{
                            "high": [230.1, 232.0],
                            "low": [225.5, 228.2],
                            "close": [229.0, 231.4]
                        }]}
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let bars = provider(&server).daily_history(&sym("aapl")).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].high, 232.0);
    }

    #[tokio::test]
    async fn unknown_symbol_has_empty_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NOPE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "chart": {
                    "result": null,
                    "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
                }
            })))
            .mount(&server)
            .await;

        let bars = provider(&server).daily_history(&sym("NOPE")).await.unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn server_error_on_history_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        assert!(provider(&server).daily_history(&sym("AAPL")).await.is_err());
    }

    #[tokio::test]
    async fn fundamentals_use_cookie_and_crumb() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("set-cookie", "A3=d=abc; Path=/; Domain=.yahoo.com"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .and(header("cookie", "A3=d=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("crumb42"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .and(query_param("crumb", "crumb42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quoteResponse": {
                    "result": [{"symbol": "AAPL", "trailingPE": 35.123, "forwardPE": 29.9}],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let f = provider.fundamentals(&sym("AAPL")).await.unwrap();
        assert_eq!(f.trailing_pe, Some(35.123));
        assert_eq!(f.forward_pe, Some(29.9));

        // Crumb is reused for the next symbol.
        provider.fundamentals(&sym("AAPL")).await.unwrap();
    }

    #[tokio::test]
    async fn fundamentals_without_crumb_when_negotiation_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .and(query_param("symbols", "MSFT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quoteResponse": {"result": [{"symbol": "MSFT"}], "error": null}
            })))
            .mount(&server)
            .await;

        let f = provider(&server).fundamentals(&sym("MSFT")).await.unwrap();
        assert_eq!(f, Fundamentals::default());
    }

    #[tokio::test]
    async fn failed_crumb_is_not_renegotiated_per_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quoteResponse": {"result": [], "error": null}
            })))
            .expect(3)
            .mount(&server)
            .await;

        let provider = provider(&server);
        for s in ["AAPL", "MSFT", "GOOG"] {
            provider.fundamentals(&sym(s)).await.unwrap();
        }
    }

    #[test]
    fn quote_for_another_symbol_is_ignored() {
        let v = json!({
            "quoteResponse": {
                "result": [{"symbol": "MSFT", "trailingPE": 33.0, "forwardPE": 30.0}],
                "error": null
            }
        });
        let f = quote_fundamentals(serde_json::from_value(v).unwrap(), &sym("AAPL")).unwrap();
        assert_eq!(f, Fundamentals::default());
    }
}
