pub mod cache;
pub mod domain;
pub mod fetch;
pub mod ingest;
pub mod present;
pub mod source;
pub mod time;

pub mod config {
    const DEFAULT_QUOTE_CACHE_TTL_SECS: u64 = 300;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub ticker_sheet_url: Option<String>,
        pub ticker_sheet_edit_url: Option<String>,
        pub default_tickers: Option<String>,
        pub quote_cache_ttl_secs: u64,
        pub market_data_base_url: Option<String>,
        pub market_data_cookie_url: Option<String>,
        pub market_data_timeout_secs: Option<u64>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                ticker_sheet_url: non_blank_var("TICKER_SHEET_URL"),
                ticker_sheet_edit_url: non_blank_var("TICKER_SHEET_EDIT_URL"),
                default_tickers: non_blank_var("DEFAULT_TICKERS"),
                quote_cache_ttl_secs: std::env::var("QUOTE_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_QUOTE_CACHE_TTL_SECS),
                market_data_base_url: non_blank_var("MARKET_DATA_BASE_URL"),
                market_data_cookie_url: non_blank_var("MARKET_DATA_COOKIE_URL"),
                market_data_timeout_secs: std::env::var("MARKET_DATA_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.trim().parse::<u64>().ok()),
                sentry_dsn: non_blank_var("SENTRY_DSN"),
            })
        }

        pub fn quote_cache_ttl(&self) -> chrono::Duration {
            chrono::Duration::seconds(self.quote_cache_ttl_secs.min(i64::MAX as u64 / 1000) as i64)
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                ticker_sheet_url: None,
                ticker_sheet_edit_url: None,
                default_tickers: None,
                quote_cache_ttl_secs: DEFAULT_QUOTE_CACHE_TTL_SECS,
                market_data_base_url: None,
                market_data_cookie_url: None,
                market_data_timeout_secs: None,
                sentry_dsn: None,
            }
        }
    }

    fn non_blank_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
