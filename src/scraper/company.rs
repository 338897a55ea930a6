//! Company profile pages.

use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{
    CompanyMarketData, CompanyProfile, DistributionRecord, DividendInfo, KeyMetrics, TaggedValue,
};
use crate::scraper::cleaner::{
    clean_key, clean_value, extract_parenthesized, normalise_symbol, parse_percent_change, to_number,
};
use crate::scraper::extract::{element_text, first_text, first_text_in, selector, ParseReport};
use crate::scraper::movers::find_live_row;
use crate::scraper::{build_url, Extraction, SourceAdapter};
use scraper::Html;
use std::collections::BTreeMap;
use std::time::Duration;

const UNKNOWN_SECTOR: &str = "Unknown";

// ── Shared table helpers ──────────────────────────────────────────────────────

/// History table keyed by its header row. Rows before any header, and cells
/// past the header width, are ignored.
pub fn extract_table_data(doc: &Html, rows_css: &str) -> ScrapeResult<Vec<BTreeMap<String, String>>> {
    let row_sel = selector(rows_css)?;
    let cell_sel = selector("td, th")?;
    let th_sel = selector("th")?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    for tr in doc.select(&row_sel) {
        let cells: Vec<String> = tr.select(&cell_sel).map(element_text).collect();
        if tr.select(&th_sel).next().is_some() {
            headers = cells;
            continue;
        }
        let record: BTreeMap<String, String> = cells
            .into_iter()
            .zip(headers.iter())
            .enumerate()
            .map(|(j, (value, header))| {
                let key = match clean_key(header) {
                    k if k.is_empty() => format!("column_{}", j),
                    k => k,
                };
                (key, value)
            })
            .collect();
        if !record.is_empty() {
            rows.push(record);
        }
    }
    Ok(rows)
}

/// `label | value` rows, label colon stripped.
pub fn label_value_rows(doc: &Html, rows_css: &str) -> ScrapeResult<BTreeMap<String, String>> {
    let row_sel = selector(rows_css)?;
    let td_sel = selector("td")?;

    let mut pairs = BTreeMap::new();
    for tr in doc.select(&row_sel) {
        let cells: Vec<String> = tr.select(&td_sel).map(element_text).collect();
        if cells.len() < 2 {
            continue;
        }
        let label = cells[0].replace(':', "");
        let label = label.trim();
        if !label.is_empty() && !cells[1].is_empty() {
            pairs.insert(clean_key(label), cells[1].clone());
        }
    }
    Ok(pairs)
}

fn exists(doc: &Html, candidates: &[&str]) -> ScrapeResult<bool> {
    for css in candidates {
        if doc.select(&selector(css)?).next().is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Absolute change implied by a last price and its percent change.
fn implied_change(ltp: f64, percent: f64) -> f64 {
    if ltp == 0.0 || percent <= -100.0 {
        return 0.0;
    }
    let previous = ltp / (1.0 + percent / 100.0);
    ((ltp - previous) * 100.0).round() / 100.0
}

fn non_empty_map(map: BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() { None } else { Some(map) }
}

fn sector_or_unknown(sector: String) -> String {
    if sector.is_empty() { UNKNOWN_SECTOR.to_string() } else { sector }
}

// ── MeroLagani ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Metric {
    value: String,
    additional: Option<String>,
}

/// Accordion metrics: first row of every `tbody.panel`, `th` label, `td`
/// value, fiscal-year tag in `span.text-primary`.
fn accordion_metrics(doc: &Html) -> ScrapeResult<BTreeMap<String, Metric>> {
    let panel_sel = selector("#accordion tbody.panel")?;
    let tr_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;
    let tag_sel = selector("span.text-primary")?;

    let mut metrics = BTreeMap::new();
    for panel in doc.select(&panel_sel) {
        let Some(row) = panel.select(&tr_sel).next() else { continue };
        let label = first_text(row, &th_sel);
        let Some(cell) = row.select(&td_sel).next() else { continue };
        let raw = element_text(cell);
        if label.is_empty() || raw.is_empty() {
            continue;
        }
        let tag = first_text(cell, &tag_sel);
        let value = if tag.is_empty() { raw } else { clean_value(&raw.replace(&tag, "")) };
        metrics.insert(
            clean_key(&label),
            Metric {
                value,
                additional: Some(tag).filter(|t| !t.is_empty()),
            },
        );
    }
    Ok(metrics)
}

fn lookup<'a>(metrics: &'a BTreeMap<String, Metric>, keys: &[&str]) -> Option<&'a Metric> {
    keys.iter().find_map(|k| metrics.get(*k))
}

fn number_of(metrics: &BTreeMap<String, Metric>, keys: &[&str]) -> Option<f64> {
    lookup(metrics, keys).map(|m| to_number(&m.value))
}

fn distribution(metrics: &BTreeMap<String, Metric>, keys: &[&str], history: Vec<BTreeMap<String, String>>) -> DistributionRecord {
    let metric = lookup(metrics, keys);
    DistributionRecord {
        latest: metric.map(|m| parse_percent_change(&m.value)).unwrap_or(0.0),
        fiscal_year: metric.and_then(|m| m.additional.clone()),
        history,
    }
}

pub fn parse_merolagani_company(html: &str, symbol: &str) -> ScrapeResult<ParseReport<CompanyProfile>> {
    let doc = Html::parse_document(html);
    let symbol = normalise_symbol(symbol);

    let company_name = first_text_in(&doc, &["#ctl00_ContentPlaceHolder1_CompanyDetail1_companyName"])?;
    let metrics = accordion_metrics(&doc)?;

    if metrics.is_empty() {
        if company_name.is_empty() && !exists(&doc, &["#accordion"])? {
            return Err(ScrapeError::Structure("MeroLagani company accordion".to_string()));
        }
        return Ok(ParseReport::default());
    }

    let ltp = number_of(&metrics, &["market_price", "ltp"]).unwrap_or(0.0);
    let percent_change = lookup(&metrics, &["_change", "change", "percent_change"])
        .map(|m| parse_percent_change(&m.value))
        .unwrap_or(0.0);
    let range = lookup(&metrics, &["52_weeks_high_low", "52_week_high_low"]).map(|m| m.value.clone());
    let mut bounds = range.as_deref().unwrap_or_default().splitn(2, '-').map(str::trim);
    let high_52w = bounds.next().filter(|s| !s.is_empty()).map(to_number);
    let low_52w = bounds.next().filter(|s| !s.is_empty()).map(to_number);
    let eps = lookup(&metrics, &["eps"]);

    let profile = CompanyProfile {
        company_name: if company_name.is_empty() { symbol.clone() } else { company_name },
        sector: sector_or_unknown(lookup(&metrics, &["sector"]).map(|m| m.value.clone()).unwrap_or_default()),
        market_data: CompanyMarketData {
            ltp,
            change: implied_change(ltp, percent_change),
            percent_change,
            last_traded_on: lookup(&metrics, &["last_traded_on"]).map(|m| m.value.clone()),
            high_52w,
            low_52w,
            year_yield: lookup(&metrics, &["1_year_yield"]).map(|m| parse_percent_change(&m.value)),
            avg_volume_30d: number_of(&metrics, &["30_day_avg_volume", "30days_avg_volume"]),
        },
        key_metrics: KeyMetrics {
            shares_outstanding: number_of(&metrics, &["shares_outstanding"]).unwrap_or(0.0),
            market_cap: number_of(&metrics, &["market_capitalization", "market_cap"]).unwrap_or(0.0),
            eps: TaggedValue {
                value: eps.map(|m| to_number(&m.value)).unwrap_or(0.0),
                fiscal_year: eps.and_then(|m| m.additional.clone()),
            },
            pe: number_of(&metrics, &["pe_ratio", "p_e_ratio"]).unwrap_or(0.0),
            book_value: number_of(&metrics, &["book_value"]).unwrap_or(0.0),
            pbv: number_of(&metrics, &["pbv", "pb_ratio"]).unwrap_or(0.0),
            avg_120_day: number_of(&metrics, &["120_day_average"]),
            avg_180_day: number_of(&metrics, &["180_day_average"]),
        },
        dividend_info: DividendInfo {
            cash: distribution(&metrics, &["_dividend", "dividend", "cash_dividend"], extract_table_data(&doc, "#dividend-panel table tr")?),
            bonus: distribution(&metrics, &["_bonus", "bonus", "bonus_share"], extract_table_data(&doc, "#bonus-panel table tr")?),
            right_share: distribution(&metrics, &["right_share"], extract_table_data(&doc, "#right-panel table tr")?),
        },
        financial_highlights: non_empty_map(label_value_rows(&doc, "#accordion-2 tr")?),
        company_details: None,
        symbol,
        source: "MeroLagani".to_string(),
    };

    Ok(ParseReport::from_records(vec![profile]))
}

// ── ShareSansar / NepaliPaisa ─────────────────────────────────────────────────

pub fn parse_sharesansar_company(html: &str, symbol: &str) -> ScrapeResult<ParseReport<CompanyProfile>> {
    let doc = Html::parse_document(html);
    if !exists(&doc, &[".quote-box", ".company-table", ".company-profile"])? {
        return Err(ScrapeError::Structure("ShareSansar quote box".to_string()));
    }

    let symbol = normalise_symbol(symbol);
    let company_name = first_text_in(&doc, &[".company-profile h1", ".panel-title"])?;
    let ltp = to_number(&first_text_in(&doc, &[".quote-box .current-price"])?);
    if company_name.is_empty() && ltp == 0.0 {
        return Ok(ParseReport::default());
    }

    let profile = CompanyProfile {
        company_name: if company_name.is_empty() { symbol.clone() } else { company_name },
        sector: sector_or_unknown(first_text_in(&doc, &[".company-category a"])?),
        market_data: CompanyMarketData {
            ltp,
            change: to_number(&first_text_in(&doc, &[".quote-box .number-rate"])?),
            percent_change: to_number(&first_text_in(&doc, &[".quote-box .percent-rate"])?.replace('%', "")),
            ..Default::default()
        },
        company_details: non_empty_map(label_value_rows(&doc, ".company-table tr")?),
        symbol,
        source: "ShareSansar".to_string(),
        ..Default::default()
    };
    Ok(ParseReport::from_records(vec![profile]))
}

pub fn parse_nepalipaisa_company(html: &str, symbol: &str) -> ScrapeResult<ParseReport<CompanyProfile>> {
    let doc = Html::parse_document(html);
    if !exists(&doc, &[".company-title", ".company-name", ".company-info-table", ".current-price"])? {
        return Err(ScrapeError::Structure("NepaliPaisa company header".to_string()));
    }

    let symbol = normalise_symbol(symbol);
    let company_name = first_text_in(&doc, &[".company-title h1", ".company-name"])?;
    let ltp = to_number(&first_text_in(&doc, &[".current-price"])?);
    if company_name.is_empty() && ltp == 0.0 {
        return Ok(ParseReport::default());
    }

    // "5.00 (0.88%)"
    let change_text = first_text_in(&doc, &[".price-change"])?;
    let change = to_number(change_text.split('(').next().unwrap_or_default());
    let percent_change = extract_parenthesized(&change_text).unwrap_or(0.0);

    let profile = CompanyProfile {
        company_name: if company_name.is_empty() { symbol.clone() } else { company_name },
        sector: sector_or_unknown(first_text_in(&doc, &[".company-sector"])?),
        market_data: CompanyMarketData {
            ltp,
            change,
            percent_change,
            ..Default::default()
        },
        company_details: non_empty_map(label_value_rows(&doc, ".company-info-table tr")?),
        symbol,
        source: "NepaliPaisa".to_string(),
        ..Default::default()
    };
    Ok(ParseReport::from_records(vec![profile]))
}

/// Minimal profile built from the symbol's row on the live market page.
pub fn parse_live_market_company(html: &str, symbol: &str) -> ScrapeResult<ParseReport<CompanyProfile>> {
    let Some(row) = find_live_row(html, symbol)? else {
        return Ok(ParseReport::default());
    };
    let quote = row.quote;
    let profile = CompanyProfile {
        company_name: if quote.full_name.is_empty() { quote.symbol.clone() } else { quote.full_name },
        sector: UNKNOWN_SECTOR.to_string(),
        market_data: CompanyMarketData {
            ltp: quote.last_traded_price,
            change: row.diff,
            percent_change: quote.percent_change,
            ..Default::default()
        },
        symbol: normalise_symbol(&quote.symbol),
        source: "MeroLagani (live market)".to_string(),
        ..Default::default()
    };
    Ok(ParseReport::from_records(vec![profile]))
}

/// Caller-supplied markup: every company layout in source priority order.
pub fn parse_company(html: &str, symbol: &str) -> ScrapeResult<ParseReport<CompanyProfile>> {
    let parsers: [fn(&str, &str) -> ScrapeResult<ParseReport<CompanyProfile>>; 4] = [
        parse_merolagani_company,
        parse_sharesansar_company,
        parse_nepalipaisa_company,
        parse_live_market_company,
    ];
    let mut last = Err(ScrapeError::Structure("no company layout recognised".to_string()));
    for parse in parsers {
        match parse(html, symbol) {
            Ok(report) if !report.is_empty() => return Ok(report),
            Ok(report) => last = Ok(report),
            Err(e) if last.is_err() => last = Err(e),
            Err(_) => {}
        }
    }
    last
}

// ── Adapters ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanySite {
    MeroLagani,
    ShareSansar,
    NepaliPaisa,
    /// MeroLagani market page filtered down to the symbol.
    MeroLaganiLiveMarket,
}

pub struct CompanyAdapter {
    site: CompanySite,
    symbol: String,
    base_url: String,
    timeout: Duration,
}

impl CompanyAdapter {
    pub fn new(config: &ScraperConfig, site: CompanySite, symbol: &str) -> Self {
        let (base_url, timeout) = match site {
            CompanySite::MeroLagani => (config.merolagani_url.clone(), config.company_timeout()),
            CompanySite::ShareSansar => (config.sharesansar_url.clone(), config.timeout()),
            CompanySite::NepaliPaisa => (config.nepalipaisa_url.clone(), config.timeout()),
            CompanySite::MeroLaganiLiveMarket => (config.merolagani_url.clone(), config.timeout()),
        };
        Self {
            site,
            symbol: normalise_symbol(symbol),
            base_url,
            timeout,
        }
    }
}

impl SourceAdapter for CompanyAdapter {
    type Record = CompanyProfile;

    fn source(&self) -> &'static str {
        match self.site {
            CompanySite::MeroLagani => "MeroLagani",
            CompanySite::ShareSansar => "ShareSansar",
            CompanySite::NepaliPaisa => "NepaliPaisa",
            CompanySite::MeroLaganiLiveMarket => "MeroLagani (live market)",
        }
    }

    fn url(&self) -> ScrapeResult<String> {
        match self.site {
            CompanySite::MeroLagani => {
                build_url(&self.base_url, "CompanyDetail.aspx", &[("symbol", self.symbol.clone())])
            }
            CompanySite::ShareSansar | CompanySite::NepaliPaisa => {
                build_url(&self.base_url, &format!("company/{}", self.symbol.to_lowercase()), &[])
            }
            CompanySite::MeroLaganiLiveMarket => build_url(&self.base_url, "LatestMarket.aspx", &[]),
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<CompanyProfile>> {
        let report = match self.site {
            CompanySite::MeroLagani => parse_merolagani_company(html, &self.symbol),
            CompanySite::ShareSansar => parse_sharesansar_company(html, &self.symbol),
            CompanySite::NepaliPaisa => parse_nepalipaisa_company(html, &self.symbol),
            CompanySite::MeroLaganiLiveMarket => parse_live_market_company(html, &self.symbol),
        }?;
        Ok(Extraction::Records(report))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::fixtures;

    #[test]
    fn test_merolagani_profile() {
        let report = parse_merolagani_company(fixtures::MEROLAGANI_COMPANY, "nabil").unwrap();
        let p = &report.records[0];
        assert_eq!(p.symbol, "NABIL");
        assert_eq!(p.company_name, "Nabil Bank Limited");
        assert_eq!(p.sector, "Commercial Banks");
        assert_eq!(p.market_data.ltp, 512.0);
        assert_eq!(p.market_data.percent_change, 1.39);
        assert_eq!(p.market_data.high_52w, Some(620.0));
        assert_eq!(p.market_data.low_52w, Some(455.5));
        assert_eq!(p.key_metrics.eps.value, 25.1);
        assert_eq!(p.key_metrics.eps.fiscal_year.as_deref(), Some("(FY:081-082, Q:4)"));
        assert_eq!(p.key_metrics.pe, 20.4);
        assert_eq!(p.key_metrics.market_cap, 138_500_000_000.0);
        assert_eq!(p.dividend_info.cash.latest, 15.0);
        assert_eq!(p.dividend_info.cash.fiscal_year.as_deref(), Some("(FY:080-081)"));
        assert_eq!(p.dividend_info.cash.history.len(), 2);
        assert_eq!(p.dividend_info.cash.history[0]["fiscal_year"], "080/081");
        assert_eq!(p.dividend_info.right_share.latest, 0.0);
        let highlights = p.financial_highlights.as_ref().unwrap();
        assert_eq!(highlights["net_profit"], "12,345,678");
    }

    #[test]
    fn test_implied_change() {
        assert_eq!(implied_change(110.0, 10.0), 10.0);
        assert_eq!(implied_change(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_sharesansar_profile() {
        let report = parse_sharesansar_company(fixtures::SHARESANSAR_COMPANY, "NICA").unwrap();
        let p = &report.records[0];
        assert_eq!(p.company_name, "NIC Asia Bank Ltd.");
        assert_eq!(p.market_data.change, -4.0);
        assert_eq!(p.market_data.percent_change, -0.7);
        assert_eq!(p.company_details.as_ref().unwrap()["listed_shares"], "150,000,000");
    }

    #[test]
    fn test_nepalipaisa_profile() {
        let report = parse_nepalipaisa_company(fixtures::NEPALIPAISA_COMPANY, "NICA").unwrap();
        let p = &report.records[0];
        assert_eq!(p.market_data.ltp, 572.0);
        assert_eq!(p.market_data.change, 5.0);
        assert_eq!(p.market_data.percent_change, 0.88);
        assert_eq!(p.sector, "Unknown");
    }

    #[test]
    fn test_structural_failures() {
        assert!(parse_merolagani_company("<p>x</p>", "NABIL").is_err());
        assert!(parse_sharesansar_company("<p>x</p>", "NABIL").is_err());
        assert!(parse_nepalipaisa_company("<p>x</p>", "NABIL").is_err());
    }

    #[test]
    fn test_live_market_profile_filters_symbol() {
        let report = parse_live_market_company(fixtures::MEROLAGANI_MARKET, "hidcl").unwrap();
        let p = &report.records[0];
        assert_eq!(p.symbol, "HIDCL");
        assert_eq!(p.market_data.change, -3.2);
        assert_eq!(p.source, "MeroLagani (live market)");
        assert!(parse_live_market_company(fixtures::MEROLAGANI_MARKET, "NOPE").unwrap().is_empty());
    }

    #[test]
    fn test_parse_company_picks_matching_layout() {
        let report = parse_company(fixtures::SHARESANSAR_COMPANY, "NICA").unwrap();
        assert_eq!(report.records[0].source, "ShareSansar");
        assert!(parse_company("<p>x</p>", "NICA").is_err());
    }
}
