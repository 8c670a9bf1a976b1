use chrono::{DateTime, Utc};
use tickerboard_core::present::table::TableView;
use tickerboard_core::source::Resolution;
use tickerboard_core::time::us_market::eastern_timestamp;

pub const EMPTY_LIST_WARNING: &str =
    "The ticker list is empty. Check the ticker sheet or enter some symbols.";

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;display:flex}\
aside{width:18rem;padding:1rem;background:#f4f5f7;min-height:100vh}\
main{flex:1;padding:1rem 2rem}\
textarea{width:100%;font-family:monospace}\
table{border-collapse:collapse;width:100%}\
th,td{padding:.3rem .6rem;border-bottom:1px solid #ddd;text-align:left}\
td.num{text-align:right;font-variant-numeric:tabular-nums}\
.info{background:#e8f1fb;padding:.5rem}\
.warn{background:#fff4e0;padding:.5rem}\
.caption{color:#666;font-size:.85rem}";

pub struct PageContext<'a> {
    pub resolution: &'a Resolution,
    pub sheet_mode: bool,
    pub edit_url: Option<&'a str>,
    /// Current content of the editable list; `None` in sheet mode.
    pub input_text: Option<&'a str>,
    /// Deep-link value carried into refresh and download links.
    pub link_tickers: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
    pub view: Option<&'a TableView>,
}

pub fn render_page(ctx: &PageContext<'_>) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str("<title>US Stock Tracker</title>");
    html.push_str(&format!("<style>{STYLE}</style></head><body>"));

    push_sidebar(&mut html, ctx);

    html.push_str("<main><h1>US Stock Tracker</h1>");
    let source = if ctx.sheet_mode {
        "linked ticker sheet"
    } else {
        "manual list"
    };
    html.push_str(&format!(
        "<p>Source: <strong>{source}</strong> (delayed quotes)</p>"
    ));

    if let Some(warning) = &ctx.resolution.warning {
        html.push_str(&format!("<p class=\"warn\">{}</p>", escape(warning)));
    }
    if let Some(notice) = &ctx.resolution.notice {
        html.push_str(&format!("<p class=\"info\">{}</p>", escape(notice)));
    }

    match ctx.view {
        Some(view) => {
            html.push_str(&format!(
                "<p class=\"caption\">Last updated (US Eastern): {}</p>",
                eastern_timestamp(ctx.updated_at)
            ));
            push_table(&mut html, view);
            html.push_str(&format!(
                "<p><a href=\"{}\" download>Download CSV</a></p>",
                escape(&href("/export.csv", ctx.link_tickers))
            ));
        }
        None => {
            html.push_str(&format!("<p class=\"warn\">{EMPTY_LIST_WARNING}</p>"));
        }
    }

    html.push_str("</main></body></html>");
    html
}

fn push_sidebar(html: &mut String, ctx: &PageContext<'_>) {
    html.push_str("<aside><h2>Settings</h2>");

    if ctx.sheet_mode {
        html.push_str("<p class=\"info\">The ticker list is managed in the linked sheet.</p>");
        if let Some(url) = ctx.edit_url {
            html.push_str(&format!(
                "<p><a href=\"{}\" target=\"_blank\" rel=\"noopener\">Edit the ticker list</a></p>",
                escape(url)
            ));
            html.push_str(
                "<p class=\"caption\">Edits take about 5 minutes to publish; refresh afterwards.</p>",
            );
        }
    } else {
        html.push_str("<form method=\"get\" action=\"/\">");
        html.push_str("<label for=\"tickers\">Ticker symbols (comma separated)</label>");
        html.push_str(&format!(
            "<textarea id=\"tickers\" name=\"tickers\" rows=\"16\">{}</textarea>",
            escape(ctx.input_text.unwrap_or_default())
        ));
        html.push_str("<button type=\"submit\">Apply</button></form>");
    }

    html.push_str("<form method=\"post\" action=\"/refresh\">");
    if let Some(tickers) = ctx.link_tickers {
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"tickers\" value=\"{}\">",
            escape(tickers)
        ));
    }
    html.push_str("<button type=\"submit\">Refresh data</button></form>");
    html.push_str("</aside>");
}

fn push_table(html: &mut String, view: &TableView) {
    html.push_str("<table><thead><tr>");
    for col in view.columns {
        html.push_str(&format!("<th>{}</th>", escape(col)));
    }
    html.push_str("</tr></thead><tbody>");

    for row in &view.rows {
        html.push_str("<tr>");
        for (i, cell) in row.iter().enumerate() {
            // Price and ratio columns.
            if (1..=5).contains(&i) {
                html.push_str(&format!("<td class=\"num\">{}</td>", escape(cell)));
            } else {
                html.push_str(&format!("<td>{}</td>", escape(cell)));
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
}

/// `path`, plus an encoded `?tickers=` when a deep-link value is present.
pub fn href(path: &str, tickers: Option<&str>) -> String {
    match tickers {
        Some(t) => format!("{path}?tickers={}", urlencoding::encode(t)),
        None => path.to_string(),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
