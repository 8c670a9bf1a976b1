pub mod sheet;

use crate::config::Settings;
use crate::domain::ticker::TickerList;
use anyhow::Context;
use sheet::SheetSource;

pub const DEFAULT_TICKERS: &str = "ORCL, MU, AVGO, TSM, NFLX, GOOG, META, NVDA, ASML, TSLA, MSFT, AMZN, AAPL, \
ON, CDNS, GFS, GEV, QCOM, KLAC, LRCX, SMCI, AMAT, INTC, AMD, ARM, GE, VRT, \
IBM, SAP, ADBE, NOW, CRM, FTNT, PANW, CRWD, APP, VRSK, MRVL, VRSN, DUOL, \
ZM, CSCO, SNPS, ANET, DELL, MNST, U, CRCL, CCJ, OXY, SNOW, HOOD, PLTR, \
RBLX, VST, SOFI, TEM, EBAY, SE, SHOP, PDD, PCAR, CAT, WMT, LULU, MS, BAC, \
CVX, ABBV, NEE, EXPE, BKNG, GEHC, MELI, ANF, GS, AXP, LLY, NVO, REGN, ISRG, \
ABNB, KO, UBER, UPST, PYPL, CRWV, MRK, UNH, SBUX, V, SNAP, IBM, AFRM, DECK";

pub const SHEET_LOADED_NOTICE: &str = "Loaded the latest list from the ticker sheet.";
pub const SHEET_FALLBACK_WARNING: &str =
    "Could not read the ticker sheet; showing the default list instead.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerSource {
    RemoteSheet,
    EmbeddedDefault,
    UserInput,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub tickers: TickerList,
    pub source: TickerSource,
    pub notice: Option<String>,
    pub warning: Option<String>,
}

/// Decides the active ticker list. A configured sheet always wins; manual input is only
/// consulted when there is none.
#[derive(Debug, Clone)]
pub struct TickerResolver {
    sheet: Option<SheetSource>,
    default_text: String,
}

impl TickerResolver {
    pub fn new(sheet: Option<SheetSource>, default_text: impl Into<String>) -> Self {
        Self {
            sheet,
            default_text: default_text.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let sheet = match settings.ticker_sheet_url.as_deref() {
            Some(url) => {
                let http = reqwest::Client::builder()
                    .build()
                    .context("failed to build ticker sheet http client")?;
                Some(SheetSource::new(
                    http,
                    url,
                    settings.ticker_sheet_edit_url.clone(),
                ))
            }
            None => None,
        };

        let default_text = settings
            .default_tickers
            .clone()
            .unwrap_or_else(|| DEFAULT_TICKERS.to_string());

        Ok(Self::new(sheet, default_text))
    }

    pub fn is_sheet_mode(&self) -> bool {
        self.sheet.is_some()
    }

    pub fn sheet(&self) -> Option<&SheetSource> {
        self.sheet.as_ref()
    }

    pub fn default_text(&self) -> &str {
        &self.default_text
    }

    pub fn default_list(&self) -> TickerList {
        TickerList::parse_comma_separated(&self.default_text)
    }

    /// Content of the editable ticker field. A submitted value wins even when blank; the
    /// default list only seeds a field that was never submitted.
    pub fn seed_text(&self, query_tickers: Option<&str>) -> String {
        query_tickers
            .map(str::to_string)
            .unwrap_or_else(|| self.default_text.clone())
    }

    /// Never fails. `manual_input` is the current content of the editable field and is
    /// ignored in sheet mode.
    pub async fn resolve(&self, manual_input: Option<&str>) -> Resolution {
        let Some(sheet) = &self.sheet else {
            return match manual_input {
                Some(text) => Resolution {
                    tickers: TickerList::parse_comma_separated(text),
                    source: TickerSource::UserInput,
                    notice: None,
                    warning: None,
                },
                None => Resolution {
                    tickers: self.default_list(),
                    source: TickerSource::EmbeddedDefault,
                    notice: None,
                    warning: None,
                },
            };
        };

        match sheet.load().await {
            Ok(rows) if !rows.is_empty() => {
                tracing::info!(rows = rows.len(), "loaded ticker sheet");
                Resolution {
                    tickers: TickerList::from_entries(rows),
                    source: TickerSource::RemoteSheet,
                    notice: Some(SHEET_LOADED_NOTICE.to_string()),
                    warning: None,
                }
            }
            Ok(_) => {
                tracing::warn!(url = %sheet.url(), "ticker sheet has no usable rows; using default list");
                self.fallback()
            }
            Err(err) => {
                let err = anyhow::Error::new(err);
                sentry_anyhow::capture_anyhow(&err);
                tracing::warn!(url = %sheet.url(), error = %format!("{err:#}"), "ticker sheet unavailable; using default list");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Resolution {
        Resolution {
            tickers: self.default_list(),
            source: TickerSource::EmbeddedDefault,
            notice: None,
            warning: Some(SHEET_FALLBACK_WARNING.to_string()),
        }
    }
}
