//! Floorsheet (contract-level transaction) tables.

use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::FloorsheetTransaction;
use crate::scraper::cleaner::{normalise_symbol, to_int, to_number};
use crate::scraper::extract::{extract_rows, first_text_in, Row, SkipReason, TableStrategy};
use crate::scraper::{build_url, Extraction, SourceAdapter};
use chrono::NaiveDate;
use scraper::Html;
use std::time::Duration;

/// Contract numbers shorter than this are treated as junk cells.
pub const MIN_CONTRACT_LEN: usize = 5;

/// Phrases sites print in place of an empty floorsheet table.
const NO_RECORD_MARKERS: &[&str] = &["no record found", "no records found", "no data available", "no floorsheet"];

// ── Layout ────────────────────────────────────────────────────────────────────

/// Whether a MeroLagani floorsheet row carries a stock symbol column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorsheetLayout {
    WithStockholderColumn,
    WithoutStockholderColumn,
}

/// Best-effort guess: a third cell that holds letters and no number is the
/// symbol column. Symbol-scoped pages drop that column; general pages keep it.
pub fn detect_layout(row: &Row) -> FloorsheetLayout {
    let candidate = row.text(2);
    let has_letters = candidate.chars().any(|c| c.is_ascii_alphabetic());
    if has_letters && to_number(candidate) == 0.0 {
        FloorsheetLayout::WithStockholderColumn
    } else {
        FloorsheetLayout::WithoutStockholderColumn
    }
}

/// Column positions of one floorsheet table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorsheetColumns {
    pub sn: Option<usize>,
    pub contract: usize,
    pub symbol: Option<usize>,
    pub buyer: usize,
    pub seller: usize,
    pub quantity: usize,
    pub rate: usize,
    pub amount: Option<usize>,
}

impl FloorsheetColumns {
    /// `# | Contract No | [Symbol] | Buyer | Seller | Qty | Rate | Amount`
    pub fn merolagani(layout: FloorsheetLayout) -> Self {
        match layout {
            FloorsheetLayout::WithStockholderColumn => Self {
                sn: Some(0),
                contract: 1,
                symbol: Some(2),
                buyer: 3,
                seller: 4,
                quantity: 5,
                rate: 6,
                amount: Some(7),
            },
            FloorsheetLayout::WithoutStockholderColumn => Self {
                sn: Some(0),
                contract: 1,
                symbol: None,
                buyer: 2,
                seller: 3,
                quantity: 4,
                rate: 5,
                amount: Some(6),
            },
        }
    }

    /// `S.N | Symbol | Contract No | Buyer | Seller | Qty | Rate | Amount`
    pub const SHARESANSAR: Self = Self {
        sn: Some(0),
        contract: 2,
        symbol: Some(1),
        buyer: 3,
        seller: 4,
        quantity: 5,
        rate: 6,
        amount: Some(7),
    };
}

// ── Row mapping ───────────────────────────────────────────────────────────────

/// How rows are matched against the requested symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFilter {
    /// Page is already scoped to the symbol.
    Off,
    /// Whole-market page: rows need a symbol column naming the symbol.
    Required,
    /// Caller markup: rows with a symbol column must name the symbol; rows
    /// without one are taken as belonging to it.
    WhenColumnPresent,
}

/// Map one row, rejecting rows for other symbols per `filter`. Symbols
/// compare case-insensitively.
pub fn map_transaction(
    row: &Row,
    cols: &FloorsheetColumns,
    symbol: &str,
    filter: SymbolFilter,
    accepted: usize,
) -> Result<FloorsheetTransaction, SkipReason> {
    let found = cols.symbol.map(|i| row.text(i).trim());
    let mismatch = match (filter, found) {
        (SymbolFilter::Off, _) | (SymbolFilter::WhenColumnPresent, None) => false,
        (_, found) => !found.unwrap_or_default().eq_ignore_ascii_case(symbol),
    };
    if mismatch {
        return Err(SkipReason::SymbolMismatch(found.unwrap_or_default().to_string()));
    }

    let contract_no = row.text(cols.contract).trim().to_string();
    if contract_no.chars().filter(char::is_ascii_alphanumeric).count() < MIN_CONTRACT_LEN {
        return Err(SkipReason::InvalidContract(contract_no));
    }

    let quantity = to_int(row.text(cols.quantity));
    if quantity <= 0 {
        return Err(SkipReason::ZeroQuantity);
    }
    let rate = to_number(row.text(cols.rate));
    if rate <= 0.0 {
        return Err(SkipReason::ZeroRate);
    }

    let amount = cols
        .amount
        .map(|i| to_number(row.text(i)))
        .filter(|a| *a > 0.0)
        .unwrap_or(quantity as f64 * rate);

    let sn = cols
        .sn
        .map(|i| to_int(row.text(i)))
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(accepted as u32 + 1);

    Ok(FloorsheetTransaction {
        sn,
        contract_no,
        stockholder: normalise_symbol(found.filter(|f| !f.is_empty()).unwrap_or(symbol)),
        buyer: to_int(row.text(cols.buyer)),
        seller: to_int(row.text(cols.seller)),
        quantity,
        rate,
        amount,
    })
}

// ── Page parsers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorsheetSite {
    MeroLagani,
    ShareSansar,
}

const MEROLAGANI_TABLE: TableStrategy<'static> = TableStrategy {
    selectors: &[
        "#ctl00_ContentPlaceHolder1_divData table tr",
        "table.table-bordered tr",
    ],
    scan_anchor: Some(r#"id="ctl00_ContentPlaceHolder1_divData""#),
    required: 6,
};

const SHARESANSAR_TABLE: TableStrategy<'static> = TableStrategy {
    selectors: &["table#myTable tr", ".floorsheet table tr"],
    scan_anchor: Some(r#"id="myTable""#),
    required: 6,
};

const COMPANY_HEADINGS: &[&str] = &[
    "#ctl00_ContentPlaceHolder1_CompanyDetail1_companyName",
    ".company-name",
    ".company-profile h1",
];

fn reports_no_records(html: &str) -> bool {
    let lower = html.to_lowercase();
    NO_RECORD_MARKERS.iter().any(|m| lower.contains(m))
}

/// Parse a floorsheet page for `symbol`.
///
/// An empty table next to a "no record" notice is an explicit empty answer;
/// a page with neither rows nor notice is a structural failure.
pub fn parse_floorsheet(
    html: &str,
    symbol: &str,
    site: FloorsheetSite,
    filter: SymbolFilter,
) -> ScrapeResult<Extraction<FloorsheetTransaction>> {
    let result = match site {
        FloorsheetSite::MeroLagani => extract_rows(html, &MEROLAGANI_TABLE, |row, accepted| {
            let cols = FloorsheetColumns::merolagani(detect_layout(row));
            map_transaction(row, &cols, symbol, filter, accepted.len())
        }),
        FloorsheetSite::ShareSansar => extract_rows(html, &SHARESANSAR_TABLE, |row, accepted| {
            map_transaction(row, &FloorsheetColumns::SHARESANSAR, symbol, filter, accepted.len())
        }),
    };

    let report = match result {
        Ok(report) => report,
        Err(ScrapeError::Structure(_)) if reports_no_records(html) => return Ok(Extraction::ExplicitlyEmpty),
        Err(e) => return Err(e),
    };

    if report.is_empty() && reports_no_records(html) {
        return Ok(Extraction::ExplicitlyEmpty);
    }

    let heading = match filter {
        SymbolFilter::Required => None,
        _ => Some(first_text_in(&Html::parse_document(html), COMPANY_HEADINGS)?),
    };
    Ok(Extraction::Records(report.with_heading(heading)))
}

/// Caller-supplied markup: MeroLagani layout first, then ShareSansar. With a
/// symbol given, rows naming another symbol are dropped.
pub fn parse_floorsheet_markup(html: &str, symbol: &str) -> ScrapeResult<Extraction<FloorsheetTransaction>> {
    let filter = if symbol.trim().is_empty() {
        SymbolFilter::Off
    } else {
        SymbolFilter::WhenColumnPresent
    };
    match parse_floorsheet(html, symbol, FloorsheetSite::MeroLagani, filter) {
        Ok(Extraction::Records(report)) if !report.is_empty() => Ok(Extraction::Records(report)),
        first => match parse_floorsheet(html, symbol, FloorsheetSite::ShareSansar, filter) {
            Ok(Extraction::Records(report)) if !report.is_empty() => Ok(Extraction::Records(report)),
            second => first.or(second),
        },
    }
}

// ── Adapters ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorsheetScope {
    /// Page dedicated to the requested symbol.
    Symbol,
    /// Whole-market page, filtered client-side.
    General,
}

pub struct FloorsheetAdapter {
    site: FloorsheetSite,
    scope: FloorsheetScope,
    symbol: String,
    date: NaiveDate,
    base_url: String,
    timeout: Duration,
}

impl FloorsheetAdapter {
    pub fn new(
        config: &ScraperConfig,
        site: FloorsheetSite,
        scope: FloorsheetScope,
        symbol: &str,
        date: NaiveDate,
    ) -> Self {
        let base_url = match site {
            FloorsheetSite::MeroLagani => config.merolagani_url.clone(),
            FloorsheetSite::ShareSansar => config.sharesansar_url.clone(),
        };
        Self {
            site,
            scope,
            symbol: normalise_symbol(symbol),
            date,
            base_url,
            timeout: config.timeout(),
        }
    }
}

impl SourceAdapter for FloorsheetAdapter {
    type Record = FloorsheetTransaction;

    fn source(&self) -> &'static str {
        match (self.site, self.scope) {
            (FloorsheetSite::MeroLagani, FloorsheetScope::Symbol) => "MeroLagani",
            (FloorsheetSite::MeroLagani, FloorsheetScope::General) => "MeroLagani (general floorsheet)",
            (FloorsheetSite::ShareSansar, FloorsheetScope::Symbol) => "ShareSansar",
            (FloorsheetSite::ShareSansar, FloorsheetScope::General) => "ShareSansar (general floorsheet)",
        }
    }

    fn url(&self) -> ScrapeResult<String> {
        let date = self.date.format("%Y-%m-%d").to_string();
        match (self.site, self.scope) {
            (FloorsheetSite::MeroLagani, FloorsheetScope::Symbol) => build_url(
                &self.base_url,
                "Floorsheet.aspx",
                &[("stock", self.symbol.clone()), ("date", date)],
            ),
            (FloorsheetSite::MeroLagani, FloorsheetScope::General) => {
                build_url(&self.base_url, "Floorsheet.aspx", &[("date", date)])
            }
            (FloorsheetSite::ShareSansar, FloorsheetScope::Symbol) => build_url(
                &self.base_url,
                &format!("company/{}/floorsheet", self.symbol.to_lowercase()),
                &[("date", date)],
            ),
            (FloorsheetSite::ShareSansar, FloorsheetScope::General) => {
                build_url(&self.base_url, "floorsheet", &[("date", date)])
            }
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<FloorsheetTransaction>> {
        let filter = match self.scope {
            FloorsheetScope::Symbol => SymbolFilter::Off,
            FloorsheetScope::General => SymbolFilter::Required,
        };
        parse_floorsheet(html, &self.symbol, self.site, filter)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
