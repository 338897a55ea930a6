//! Gainers and live-trading tables.

use crate::config::ScraperConfig;
use crate::error::ScrapeResult;
use crate::models::{ChangeType, Direction, LiveTradingRow, MarketMover};
use crate::scraper::cleaner::{to_int, to_number};
use crate::scraper::extract::{extract_rows, ParseReport, Row, SkipReason, TableStrategy};
use crate::scraper::indices::direction_from_markers;
use crate::scraper::{build_url, Extraction, SourceAdapter};
use std::time::Duration;

// ── Gainers ───────────────────────────────────────────────────────────────────

const GAINERS: TableStrategy<'static> = TableStrategy {
    selectors: &[r#"table[data-live="gainers"] tr"#, r#"[data-live="gainers"] tr"#],
    scan_anchor: Some(r#"data-live="gainers""#),
    required: 8,
};

/// MeroLagani gainers layout:
/// Symbol | LTP | % Change | High | Low | Open | Qty | Turnover
pub fn parse_gainers(html: &str) -> ScrapeResult<ParseReport<MarketMover>> {
    extract_rows(html, &GAINERS, |row, _| map_gainer(row))
}

fn map_gainer(row: &Row) -> Result<MarketMover, SkipReason> {
    let (symbol, full_name) = symbol_cell(row, 0)?;
    Ok(MarketMover {
        symbol,
        full_name,
        last_traded_price: to_number(row.text(1)),
        percent_change: to_number(row.text(2)),
        high: to_number(row.text(3)),
        low: to_number(row.text(4)),
        open: to_number(row.text(5)),
        quantity: to_int(row.text(6)),
        turnover: to_number(row.text(7)),
    })
}

/// Symbol from the cell's link text (falling back to the cell text) and the
/// full company name from the link's `title`.
fn symbol_cell(row: &Row, idx: usize) -> Result<(String, String), SkipReason> {
    let cell = row.cell(idx).ok_or(SkipReason::MissingSymbol)?;
    let symbol = cell
        .link_text
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&cell.text)
        .trim()
        .to_string();
    if symbol.is_empty() {
        return Err(SkipReason::MissingSymbol);
    }
    Ok((symbol, cell.link_title.clone().unwrap_or_default()))
}

// ── Live trading ──────────────────────────────────────────────────────────────

/// Column positions of one site's live-trading table.
#[derive(Debug, Clone, Copy)]
pub struct LiveColumns {
    pub symbol: usize,
    pub ltp: usize,
    pub percent: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub quantity: usize,
    pub turnover: Option<usize>,
    pub previous_close: usize,
    pub diff: usize,
}

/// Symbol | LTP | % Change | Open | High | Low | Qty | PClose | Diff
pub const MEROLAGANI_LIVE: LiveColumns = LiveColumns {
    symbol: 0,
    ltp: 1,
    percent: 2,
    open: 3,
    high: 4,
    low: 5,
    quantity: 6,
    turnover: None,
    previous_close: 7,
    diff: 8,
};

/// S.No | Symbol | LTP | Point Change | % Change | Open | High | Low | Volume | Turnover | Prev. Close
pub const SHARESANSAR_LIVE: LiveColumns = LiveColumns {
    symbol: 1,
    ltp: 2,
    percent: 4,
    open: 5,
    high: 6,
    low: 7,
    quantity: 8,
    turnover: Some(9),
    previous_close: 10,
    diff: 3,
};

const MEROLAGANI_LIVE_TABLE: TableStrategy<'static> = TableStrategy {
    selectors: &[
        "#ctl00_ContentPlaceHolder1_LiveTrading table tr",
        ".live-trading table tr",
    ],
    scan_anchor: Some(r#"id="ctl00_ContentPlaceHolder1_LiveTrading""#),
    required: 9,
};

const SHARESANSAR_LIVE_TABLE: TableStrategy<'static> = TableStrategy {
    selectors: &["table#headFixed tr", "#headFixed tr"],
    scan_anchor: Some(r#"id="headFixed""#),
    required: 11,
};

/// Row direction from its style markers (`decrease-row`, `text-danger`).
/// Rows without a down marker count as increases; `diff` is never consulted.
pub fn change_type_from_marker(classes: &str) -> ChangeType {
    if classes.to_ascii_lowercase().contains("decrease") || direction_from_markers(classes) == Direction::Down {
        ChangeType::Decrease
    } else {
        ChangeType::Increase
    }
}

fn map_live(row: &Row, cols: &LiveColumns) -> Result<LiveTradingRow, SkipReason> {
    let (symbol, full_name) = symbol_cell(row, cols.symbol)?;
    Ok(LiveTradingRow {
        quote: MarketMover {
            symbol,
            full_name,
            last_traded_price: to_number(row.text(cols.ltp)),
            percent_change: to_number(row.text(cols.percent)),
            high: to_number(row.text(cols.high)),
            low: to_number(row.text(cols.low)),
            open: to_number(row.text(cols.open)),
            quantity: to_int(row.text(cols.quantity)),
            turnover: cols.turnover.map(|i| to_number(row.text(i))).unwrap_or(0.0),
        },
        previous_close: to_number(row.text(cols.previous_close)),
        diff: to_number(row.text(cols.diff)),
        change_type: change_type_from_marker(&row.marker_classes()),
    })
}

pub fn parse_merolagani_live(html: &str) -> ScrapeResult<ParseReport<LiveTradingRow>> {
    extract_rows(html, &MEROLAGANI_LIVE_TABLE, |row, _| map_live(row, &MEROLAGANI_LIVE))
}

pub fn parse_sharesansar_live(html: &str) -> ScrapeResult<ParseReport<LiveTradingRow>> {
    extract_rows(html, &SHARESANSAR_LIVE_TABLE, |row, _| map_live(row, &SHARESANSAR_LIVE))
}

/// Caller-supplied markup: MeroLagani layout first, then ShareSansar.
pub fn parse_live_trading(html: &str) -> ScrapeResult<ParseReport<LiveTradingRow>> {
    match parse_merolagani_live(html) {
        Ok(report) if !report.is_empty() => Ok(report),
        first => match parse_sharesansar_live(html) {
            Ok(report) if !report.is_empty() => Ok(report),
            // report whichever attempt found a table at all
            second => first.or(second),
        },
    }
}

/// Live row for `symbol` on a MeroLagani market page, matched
/// case-insensitively against the symbol column.
pub fn find_live_row(html: &str, symbol: &str) -> ScrapeResult<Option<LiveTradingRow>> {
    let report = extract_rows(html, &MEROLAGANI_LIVE_TABLE, |row, _| {
        let (found, _) = symbol_cell(row, MEROLAGANI_LIVE.symbol)?;
        if !found.eq_ignore_ascii_case(symbol) {
            return Err(SkipReason::SymbolMismatch(found));
        }
        map_live(row, &MEROLAGANI_LIVE)
    })?;
    Ok(report.records.into_iter().next())
}

// ── Adapters ──────────────────────────────────────────────────────────────────

pub struct MeroLaganiGainers {
    base_url: String,
    timeout: Duration,
}

impl MeroLaganiGainers {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.merolagani_url.clone(),
            timeout: config.timeout(),
        }
    }
}

impl SourceAdapter for MeroLaganiGainers {
    type Record = MarketMover;

    fn source(&self) -> &'static str {
        "MeroLagani"
    }

    fn url(&self) -> ScrapeResult<String> {
        build_url(&self.base_url, "LatestMarket.aspx", &[])
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<MarketMover>> {
        parse_gainers(html).map(Extraction::Records)
    }
}

pub struct MeroLaganiLiveTrading {
    base_url: String,
    timeout: Duration,
}

impl MeroLaganiLiveTrading {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.merolagani_url.clone(),
            timeout: config.timeout(),
        }
    }
}

impl SourceAdapter for MeroLaganiLiveTrading {
    type Record = LiveTradingRow;

    fn source(&self) -> &'static str {
        "MeroLagani"
    }

    fn url(&self) -> ScrapeResult<String> {
        build_url(&self.base_url, "LatestMarket.aspx", &[])
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<LiveTradingRow>> {
        parse_merolagani_live(html).map(Extraction::Records)
    }
}

pub struct ShareSansarLiveTrading {
    base_url: String,
    timeout: Duration,
}

impl ShareSansarLiveTrading {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.sharesansar_url.clone(),
            timeout: config.timeout(),
        }
    }
}

impl SourceAdapter for ShareSansarLiveTrading {
    type Record = LiveTradingRow;

    fn source(&self) -> &'static str {
        "ShareSansar"
    }

    fn url(&self) -> ScrapeResult<String> {
        build_url(&self.base_url, "live-trading", &[])
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<LiveTradingRow>> {
        parse_sharesansar_live(html).map(Extraction::Records)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
