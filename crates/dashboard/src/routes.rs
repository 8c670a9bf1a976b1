use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use tickerboard_core::cache::slot::Memoized;
use tickerboard_core::cache::QuoteCache;
use tickerboard_core::config::Settings;
use tickerboard_core::domain::quote::ResultTable;
use tickerboard_core::fetch::progress::LogProgress;
use tickerboard_core::fetch::QuoteFetcher;
use tickerboard_core::ingest::yahoo::YahooProvider;
use tickerboard_core::present::export::{export_csv, export_file_name, CSV_CONTENT_TYPE};
use tickerboard_core::present::table::render;
use tickerboard_core::source::sheet::SheetSource;
use tickerboard_core::source::{Resolution, TickerResolver};

use crate::page::{self, PageContext};

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<TickerResolver>,
    // Held across a fetch, so fetch cycles never overlap.
    cache: Arc<Mutex<QuoteCache>>,
}

impl AppState {
    pub fn new(resolver: TickerResolver, cache: QuoteCache) -> Self {
        Self {
            resolver: Arc::new(resolver),
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let resolver = TickerResolver::from_settings(settings)?;
        let provider = YahooProvider::from_settings(settings)?;
        let cache = QuoteCache::new(
            QuoteFetcher::new(Arc::new(provider)),
            settings.quote_cache_ttl(),
        );
        Ok(Self::new(resolver, cache))
    }

    pub fn sheet_mode(&self) -> bool {
        self.resolver.is_sheet_mode()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/export.csv", get(export))
        .route("/refresh", post(refresh))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

/// `?tickers=` deep link. Only consulted in manual mode.
#[derive(Debug, Default, Deserialize)]
struct TickerQuery {
    tickers: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshForm {
    tickers: Option<String>,
}

struct Snapshot {
    resolution: Resolution,
    input_text: Option<String>,
    table: Option<Memoized<ResultTable>>,
}

async fn load(state: &AppState, query_tickers: Option<&str>) -> Snapshot {
    let input_text = (!state.resolver.is_sheet_mode())
        .then(|| state.resolver.seed_text(query_tickers));
    let resolution = state.resolver.resolve(input_text.as_deref()).await;

    let table = if resolution.tickers.is_empty() {
        tracing::info!("ticker list is empty; skipping fetch");
        None
    } else {
        let mut cache = state.cache.lock().await;
        Some(
            cache
                .get_or_fetch(&resolution.tickers, &LogProgress::default())
                .await,
        )
    };

    Snapshot {
        resolution,
        input_text,
        table,
    }
}

async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> Html<String> {
    let snapshot = load(&state, query.tickers.as_deref()).await;
    let view = snapshot.table.as_ref().map(|m| render(&m.value));

    Html(page::render_page(&PageContext {
        resolution: &snapshot.resolution,
        sheet_mode: state.resolver.is_sheet_mode(),
        edit_url: state.resolver.sheet().and_then(SheetSource::edit_url),
        input_text: snapshot.input_text.as_deref(),
        link_tickers: query.tickers.as_deref(),
        updated_at: Utc::now(),
        view: view.as_ref(),
    }))
}

async fn export(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let snapshot = load(&state, query.tickers.as_deref()).await;
    let Some(table) = snapshot.table else {
        return Err((StatusCode::NOT_FOUND, "ticker list is empty"));
    };

    let body = export_csv(&table.value).map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "csv export failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "csv export failed")
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(Utc::now())
    );
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn refresh(State(state): State<AppState>, Form(form): Form<RefreshForm>) -> Redirect {
    state.cache.lock().await.invalidate();
    Redirect::to(&page::href("/", form.tickers.as_deref()))
}
