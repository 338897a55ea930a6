//! Market index tiles: ticker feeds, sliders and a raw markup scan.
//!
//! Percent text on these pages is always unsigned; the sign comes from the
//! direction marker on the tile.

use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{Direction, MarketIndex};
use crate::scraper::cleaner::{extract_parenthesized, to_number, to_signed_percent};
use crate::scraper::extract::{first_text, selector, subtree_classes, MarkupScanner, ParseReport, SkipReason};
use crate::scraper::{build_url, Extraction, SourceAdapter};
use regex::Regex;
use scraper::Html;
use std::time::Duration;
use tracing::debug;

/// Selectors for one tile layout.
#[derive(Debug, Clone, Copy)]
pub struct TileLayout {
    pub tile: &'static str,
    pub name: &'static str,
    pub value: &'static str,
    pub change: &'static str,
    pub volume: Option<&'static str>,
}

pub const NEPALIPAISA_TICKER: &[TileLayout] = &[
    TileLayout {
        tile: ".index-ticker .ticker-item",
        name: ".ticker-name",
        value: ".ticker-value",
        change: ".ticker-change",
        volume: Some(".ticker-volume"),
    },
    TileLayout {
        tile: ".ticker li",
        name: ".name",
        value: ".value",
        change: ".change",
        volume: None,
    },
];

pub const MEROLAGANI_SLIDER: &[TileLayout] = &[
    TileLayout {
        tile: ".index-slider .slider-item",
        name: ".index-name",
        value: ".index-value",
        change: ".index-change",
        volume: Some(".index-volume"),
    },
    TileLayout {
        tile: ".slider .item",
        name: "h4",
        value: ".value",
        change: ".change",
        volume: None,
    },
];

const DOWN_MARKERS: &[&str] = &["down", "decrease", "negative", "danger", "red", "loss", "fall"];
const UP_MARKERS: &[&str] = &["up", "increase", "positive", "success", "green", "gain", "rise"];

/// Direction from class names such as `increase`, `text-danger`,
/// `icon-arrow-down`. Down markers win when both kinds are present.
pub fn direction_from_markers(classes: &str) -> Direction {
    let parts: Vec<String> = classes
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|p| !p.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    if parts.iter().any(|p| DOWN_MARKERS.contains(&p.as_str())) {
        Direction::Down
    } else if parts.iter().any(|p| UP_MARKERS.contains(&p.as_str())) {
        Direction::Up
    } else {
        Direction::Neutral
    }
}

/// The fragment of a change cell that holds the percentage:
/// "32.10 (1.2%)" → "1.2%" | "1.2 %" → "1.2" | "1.2%" → "1.2%"
fn percent_fragment(text: &str) -> &str {
    if let (Some(open), Some(close)) = (text.find('('), text.rfind(')')) {
        if open < close {
            return &text[open + 1..close];
        }
    }
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.iter().position(|t| t.contains('%')) {
        Some(pos) if tokens[pos] == "%" && pos > 0 => tokens[pos - 1],
        Some(pos) => tokens[pos],
        None => tokens.last().copied().unwrap_or(""),
    }
}

/// Volume shown either bare or as "(1,234,567)"; absent means 0.
fn volume_value(text: &str) -> f64 {
    extract_parenthesized(text).unwrap_or_else(|| to_number(text))
}

fn build_index(name: String, value: &str, change: &str, volume: &str, classes: &str) -> MarketIndex {
    let direction = direction_from_markers(classes);
    MarketIndex {
        name,
        value: to_number(value),
        percent_change: to_signed_percent(percent_fragment(change), direction == Direction::Down),
        direction,
        volume: volume_value(volume),
    }
}

/// Keeps the first tile seen for every name; slider markup clones tiles.
fn accept(report: &mut ParseReport<MarketIndex>, position: usize, index: MarketIndex) {
    if report.records.iter().any(|seen| seen.name == index.name) {
        report.skip(position, SkipReason::DuplicateName(index.name));
    } else {
        report.records.push(index);
    }
}

/// Read tiles with the first layout whose tile selector yields an index.
pub fn parse_index_tiles(html: &str, layouts: &[TileLayout]) -> ScrapeResult<ParseReport<MarketIndex>> {
    let doc = Html::parse_document(html);
    let mut container_found = false;
    let mut best = ParseReport::default();

    for layout in layouts {
        let tile_sel = selector(layout.tile)?;
        let name_sel = selector(layout.name)?;
        let value_sel = selector(layout.value)?;
        let change_sel = selector(layout.change)?;
        let volume_sel = layout.volume.map(selector).transpose()?;

        let mut report = ParseReport::default();
        for (position, tile) in doc.select(&tile_sel).enumerate() {
            container_found = true;
            let name = first_text(tile, &name_sel);
            if name.is_empty() {
                report.skip(position, SkipReason::MissingName);
                continue;
            }
            let volume = volume_sel
                .as_ref()
                .map(|sel| first_text(tile, sel))
                .unwrap_or_default();
            let index = build_index(
                name,
                &first_text(tile, &value_sel),
                &first_text(tile, &change_sel),
                &volume,
                &subtree_classes(tile),
            );
            accept(&mut report, position, index);
        }

        if !report.is_empty() {
            debug!("Tile layout `{}`: {} indices", layout.tile, report.count());
            return Ok(report);
        }
        if best.skipped.is_empty() {
            best = report;
        }
    }

    if container_found {
        Ok(best)
    } else {
        Err(ScrapeError::Structure(format!("no index tiles for {:?}", layouts.iter().map(|l| l.tile).collect::<Vec<_>>())))
    }
}

/// Last-resort scan over raw markup for name/value/change class triples.
pub fn scan_index_markup(html: &str) -> ScrapeResult<ParseReport<MarketIndex>> {
    let close = r"</(?:span|div|td|p|li|h\d)\s*>";
    let pattern = format!(
        r#"(?is)class="[^"]*(?:index|ticker)-name[^"]*"[^>]*>(.*?){close}.*?class="[^"]*(?:index|ticker)-value[^"]*"[^>]*>(.*?){close}.*?class="([^"]*(?:index|ticker)-change[^"]*)"[^>]*>(.*?){close}(?:\s*<[^>]*class="[^"]*(?:index|ticker)-volume[^"]*"[^>]*>(.*?){close})?"#
    );
    let triple = Regex::new(&pattern)?;
    let scanner = MarkupScanner::new()?;

    let mut report = ParseReport::default();
    let mut matched = false;
    for (position, caps) in triple.captures_iter(html).enumerate() {
        matched = true;
        let text = |i: usize| caps.get(i).map(|m| scanner.strip(m.as_str())).unwrap_or_default();
        let name = text(1);
        if name.is_empty() {
            report.skip(position, SkipReason::MissingName);
            continue;
        }
        let change_markup = caps.get(4).map_or("", |m| m.as_str());
        let classes = format!(
            "{} {}",
            caps.get(3).map_or("", |m| m.as_str()),
            scanner.all_classes(change_markup)
        );
        let index = build_index(name, &text(2), &text(4), &text(5), &classes);
        accept(&mut report, position, index);
    }

    if matched {
        Ok(report)
    } else {
        Err(ScrapeError::Structure("no index markup found".to_string()))
    }
}

/// Caller-supplied markup: ticker layouts, slider layouts, then the scan.
pub fn parse_indices(html: &str) -> ScrapeResult<ParseReport<MarketIndex>> {
    let layouts: Vec<TileLayout> = NEPALIPAISA_TICKER
        .iter()
        .chain(MEROLAGANI_SLIDER)
        .copied()
        .collect();
    match parse_index_tiles(html, &layouts) {
        Ok(report) if !report.is_empty() => Ok(report),
        tiles => match scan_index_markup(html) {
            Ok(report) if !report.is_empty() => Ok(report),
            scan => tiles.or(scan),
        },
    }
}

// ── Adapters ──────────────────────────────────────────────────────────────────

/// NepaliPaisa home-page ticker feed.
pub struct NepaliPaisaTicker {
    base_url: String,
    timeout: Duration,
}

impl NepaliPaisaTicker {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.nepalipaisa_url.clone(),
            timeout: config.timeout(),
        }
    }
}

impl SourceAdapter for NepaliPaisaTicker {
    type Record = MarketIndex;

    fn source(&self) -> &'static str {
        "NepaliPaisa"
    }

    fn url(&self) -> ScrapeResult<String> {
        build_url(&self.base_url, "", &[])
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<MarketIndex>> {
        parse_index_tiles(html, NEPALIPAISA_TICKER).map(Extraction::Records)
    }
}

/// Index slider embedded in the MeroLagani market page.
pub struct MeroLaganiIndexSlider {
    base_url: String,
    timeout: Duration,
}

impl MeroLaganiIndexSlider {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.merolagani_url.clone(),
            timeout: config.timeout(),
        }
    }
}

impl SourceAdapter for MeroLaganiIndexSlider {
    type Record = MarketIndex;

    fn source(&self) -> &'static str {
        "MeroLagani"
    }

    fn url(&self) -> ScrapeResult<String> {
        build_url(&self.base_url, "LatestMarket.aspx", &[])
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<MarketIndex>> {
        parse_index_tiles(html, MEROLAGANI_SLIDER).map(Extraction::Records)
    }
}

/// Same MeroLagani page, read with the regex scan.
pub struct MeroLaganiIndexScan {
    base_url: String,
    timeout: Duration,
}

impl MeroLaganiIndexScan {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.merolagani_url.clone(),
            timeout: config.timeout(),
        }
    }
}

impl SourceAdapter for MeroLaganiIndexScan {
    type Record = MarketIndex;

    fn source(&self) -> &'static str {
        "MeroLagani (markup scan)"
    }

    fn url(&self) -> ScrapeResult<String> {
        build_url(&self.base_url, "LatestMarket.aspx", &[])
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<MarketIndex>> {
        scan_index_markup(html).map(Extraction::Records)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
