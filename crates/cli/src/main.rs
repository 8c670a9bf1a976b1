use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tickerboard_core::config::Settings;
use tickerboard_core::domain::quote::ResultTable;
use tickerboard_core::fetch::progress::{FetchProgress, LogProgress};
use tickerboard_core::fetch::QuoteFetcher;
use tickerboard_core::ingest::yahoo::YahooProvider;
use tickerboard_core::present::export::{export_csv, export_file_name};
use tickerboard_core::present::table::render;
use tickerboard_core::source::TickerResolver;
use tickerboard_core::time::us_market::eastern_timestamp;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod progress;

#[derive(Debug, Parser)]
#[command(name = "tickerboard")]
struct Args {
    /// Comma-separated symbols. Ignored when TICKER_SHEET_URL is set.
    #[arg(long)]
    tickers: Option<String>,

    /// Write the CSV export to this file, or into this directory under the dated default name.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Log progress instead of drawing a progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let resolver = TickerResolver::from_settings(&settings)?;
    let manual_input =
        (!resolver.is_sheet_mode()).then(|| resolver.seed_text(args.tickers.as_deref()));
    let resolution = resolver.resolve(manual_input.as_deref()).await;

    if let Some(warning) = &resolution.warning {
        eprintln!("warning: {warning}");
    }
    if let Some(notice) = &resolution.notice {
        eprintln!("{notice}");
    }

    if resolution.tickers.is_empty() {
        eprintln!("warning: the ticker list is empty; nothing to fetch");
        return Ok(());
    }

    let provider = YahooProvider::from_settings(&settings)?;
    let fetcher = QuoteFetcher::new(Arc::new(provider));

    let progress: Box<dyn FetchProgress> = if args.no_progress {
        Box::new(LogProgress::default())
    } else {
        Box::new(progress::BarProgress::new(resolution.tickers.len()))
    };
    let table = fetcher.fetch(&resolution.tickers, progress.as_ref()).await;

    let now = chrono::Utc::now();
    println!("Last updated (US Eastern): {}", eastern_timestamp(now));
    print!("{}", render(&table).to_plain_text());

    if let Some(path) = args.csv {
        if let Err(err) = write_export(&table, csv_path(path, now)) {
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    }

    Ok(())
}

fn write_export(table: &ResultTable, path: PathBuf) -> anyhow::Result<()> {
    let bytes = export_csv(table)?;
    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to write csv export to {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = table.len(), "wrote csv export");
    Ok(())
}

fn csv_path(path: PathBuf, now: chrono::DateTime<chrono::Utc>) -> PathBuf {
    if path.is_dir() {
        path.join(export_file_name(now))
    } else {
        path
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "tickerboard",
            "--tickers",
            "aapl,msft",
            "--csv",
            "out.csv",
            "--no-progress",
        ])
        .unwrap();
        assert_eq!(args.tickers.as_deref(), Some("aapl,msft"));
        assert_eq!(args.csv, Some(PathBuf::from("out.csv")));
        assert!(args.no_progress);
    }

    #[test]
    fn directory_gets_dated_file_name() {
        use chrono::TimeZone;
        let now = chrono::Utc.with_ymd_and_hms(2026, 4, 1, 15, 0, 0).unwrap();
        let dir = std::env::temp_dir();
        assert_eq!(csv_path(dir.clone(), now), dir.join("us_stocks_20260401.csv"));
        assert_eq!(
            csv_path(PathBuf::from("report.csv"), now),
            PathBuf::from("report.csv")
        );
    }
}
