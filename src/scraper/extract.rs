//! Table extraction shared by every entity extractor.
//!
//! Rows are lifted out of the document into plain [`Row`] values first, so the
//! same row mapper runs whether the rows came from a CSS selector or from the
//! regex scan over raw markup.

use crate::error::{ScrapeError, ScrapeResult};
use crate::scraper::cleaner::{clean_value, looks_numeric};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

// ── Rows ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub text: String,
    pub link_text: Option<String>,
    pub link_title: Option<String>,
    pub is_header: bool,
    /// Class attributes of the cell and its descendants.
    pub class: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Position within the matched row set, header included.
    pub index: usize,
    pub class: String,
    pub cells: Vec<Cell>,
}

impl Row {
    fn from_element(index: usize, tr: ElementRef<'_>, cell_sel: &Selector, link_sel: &Selector) -> Self {
        let cells = tr
            .select(cell_sel)
            .map(|cell| {
                let link = cell.select(link_sel).next();
                Cell {
                    text: element_text(cell),
                    link_text: link.map(element_text),
                    link_title: link
                        .and_then(|a| a.value().attr("title"))
                        .map(|t| t.trim().to_string()),
                    is_header: cell.value().name() == "th",
                    class: subtree_classes(cell),
                }
            })
            .collect();

        Self {
            index,
            class: tr.value().attr("class").unwrap_or_default().to_string(),
            cells,
        }
    }

    pub fn text(&self, i: usize) -> &str {
        self.cells.get(i).map(|c| c.text.as_str()).unwrap_or("")
    }

    pub fn cell(&self, i: usize) -> Option<&Cell> {
        self.cells.get(i)
    }

    /// Cells carrying any text at all.
    pub fn populated(&self) -> usize {
        self.cells.iter().filter(|c| !c.text.is_empty()).count()
    }

    /// Style markers of the row: its own class, or its cells' classes when the
    /// `tr` carries none.
    pub fn marker_classes(&self) -> String {
        if !self.class.trim().is_empty() {
            return self.class.clone();
        }
        self.cells
            .iter()
            .map(|c| c.class.as_str())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Header rows are made of `th` cells, or sit at position 0 without any
    /// numeric value after the first column.
    ///
    /// Position 0 is deliberately not skipped unconditionally: a headerless
    /// table (or a single-row snippet) starts with a data row, and a row there
    /// with numeric cells is kept.
    pub fn is_header(&self) -> bool {
        let has_th = self.cells.iter().any(|c| c.is_header);
        let has_td = self.cells.iter().any(|c| !c.is_header);
        if has_th && !has_td {
            return true;
        }
        self.index == 0 && !self.cells.iter().skip(1).any(|c| looks_numeric(&c.text))
    }
}

// ── Parse report ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Header,
    TooFewColumns { found: usize, required: usize },
    MissingSymbol,
    MissingName,
    DuplicateName(String),
    InvalidContract(String),
    ZeroQuantity,
    ZeroRate,
    SymbolMismatch(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

/// Accepted records plus the reason every other row was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRow>,
    /// Page heading seen next to the rows (company name on symbol pages).
    pub heading: Option<String>,
}

impl<T> Default for ParseReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
            heading: None,
        }
    }
}

impl<T> ParseReport<T> {
    pub fn from_records(records: Vec<T>) -> Self {
        Self {
            records,
            skipped: Vec::new(),
            heading: None,
        }
    }

    pub fn with_heading(mut self, heading: Option<String>) -> Self {
        self.heading = heading.filter(|h| !h.is_empty());
        self
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skip(&mut self, row: usize, reason: SkipReason) {
        self.skipped.push(SkippedRow { row, reason });
    }

    pub fn push(&mut self, row: usize, result: Result<T, SkipReason>) {
        match result {
            Ok(record) => self.records.push(record),
            Err(reason) => self.skip(row, reason),
        }
    }

    /// Skip entries whose reason matches `pred`.
    #[cfg(test)]
    pub fn skipped_where(&self, pred: impl Fn(&SkipReason) -> bool) -> usize {
        self.skipped.iter().filter(|s| pred(&s.reason)).count()
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

/// Ordered row-extraction strategies for one page layout.
#[derive(Debug, Clone, Copy)]
pub struct TableStrategy<'a> {
    /// Row selectors, most specific first.
    pub selectors: &'a [&'a str],
    /// Marker preceding the table in raw markup; enables the regex scan.
    pub scan_anchor: Option<&'a str>,
    /// Populated cells a row needs before the mapper sees it.
    pub required: usize,
}

/// Run `strategy` against `html`, returning the first non-empty report.
///
/// Fails with [`ScrapeError::Structure`] only when no selector matched and the
/// scan anchor is absent too; an existing table with no usable rows yields an
/// empty report.
pub fn extract_rows<T, F>(html: &str, strategy: &TableStrategy<'_>, mut map_row: F) -> ScrapeResult<ParseReport<T>>
where
    F: FnMut(&Row, &[T]) -> Result<T, SkipReason>,
{
    let doc = Html::parse_document(html);
    let cell_sel = selector("td, th")?;
    let link_sel = selector("a")?;

    let mut container_found = false;
    let mut best = ParseReport::default();

    for css in strategy.selectors {
        let sel = selector(css)?;
        let rows: Vec<Row> = doc
            .select(&sel)
            .enumerate()
            .map(|(i, tr)| Row::from_element(i, tr, &cell_sel, &link_sel))
            .collect();

        if rows.is_empty() {
            debug!("Selector `{}` matched nothing", css);
            continue;
        }

        container_found = true;
        let report = map_rows(&rows, strategy.required, &mut map_row);
        if !report.is_empty() {
            debug!("Selector `{}`: {} rows accepted", css, report.count());
            return Ok(report);
        }
        debug!("Selector `{}`: {} rows, none accepted", css, rows.len());
        best = report;
    }

    if let Some(anchor) = strategy.scan_anchor {
        if let Some(region) = scan_region(html, anchor) {
            container_found = true;
            let rows = MarkupScanner::new()?.rows(region);
            let report = map_rows(&rows, strategy.required, &mut map_row);
            if !report.is_empty() {
                info!("Markup scan recovered {} rows after `{}`", report.count(), anchor);
                return Ok(report);
            }
            if best.skipped.is_empty() {
                best = report;
            }
        }
    }

    if container_found {
        Ok(best)
    } else {
        Err(ScrapeError::Structure(format!(
            "no rows for any of {:?}",
            strategy.selectors
        )))
    }
}

fn map_rows<T, F>(rows: &[Row], required: usize, map_row: &mut F) -> ParseReport<T>
where
    F: FnMut(&Row, &[T]) -> Result<T, SkipReason>,
{
    let mut report = ParseReport::default();
    for row in rows {
        if row.is_header() {
            report.skip(row.index, SkipReason::Header);
            continue;
        }
        let found = row.populated();
        if found < required {
            report.skip(row.index, SkipReason::TooFewColumns { found, required });
            continue;
        }
        let result = map_row(row, &report.records);
        report.push(row.index, result);
    }
    report
}

// ── Element helpers ───────────────────────────────────────────────────────────

pub fn selector(css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Element text with whitespace runs collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    clean_value(&el.text().collect::<String>())
}

/// Class attributes of `el` and every descendant, space-joined.
pub fn subtree_classes(el: ElementRef<'_>) -> String {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|e| e.value().attr("class"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match of `css` under `scope`, empty when absent.
pub fn first_text(scope: ElementRef<'_>, css: &Selector) -> String {
    scope.select(css).next().map(element_text).unwrap_or_default()
}

/// Text of the first match of the first selector in `candidates` that yields
/// a non-empty string.
pub fn first_text_in(doc: &Html, candidates: &[&str]) -> ScrapeResult<String> {
    for css in candidates {
        let sel = selector(css)?;
        if let Some(text) = doc.select(&sel).map(element_text).find(|t| !t.is_empty()) {
            return Ok(text);
        }
    }
    Ok(String::new())
}

// ── Raw markup scan ───────────────────────────────────────────────────────────

/// Slice of `html` from `anchor` up to the end of the enclosing table.
pub fn scan_region<'a>(html: &'a str, anchor: &str) -> Option<&'a str> {
    let start = html.find(anchor)?;
    let rest = &html[start..];
    let end = rest.find("</table").unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Regex-based reader for markup the HTML selectors could not make sense of.
pub struct MarkupScanner {
    row: Regex,
    cell: Regex,
    link: Regex,
    title: Regex,
    class: Regex,
    tag: Regex,
}

impl MarkupScanner {
    pub fn new() -> ScrapeResult<Self> {
        Ok(Self {
            row: Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr\s*>")?,
            cell: Regex::new(r"(?is)<(td|th)\b([^>]*)>(.*?)</t[dh]\s*>")?,
            link: Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>")?,
            title: Regex::new(r#"(?i)\btitle\s*=\s*"([^"]*)""#)?,
            class: Regex::new(r#"(?i)\bclass\s*=\s*"([^"]*)""#)?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
        })
    }

    pub fn rows(&self, markup: &str) -> Vec<Row> {
        self.row
            .captures_iter(markup)
            .enumerate()
            .map(|(index, caps)| {
                let attrs = caps.get(1).map_or("", |m| m.as_str());
                let body = caps.get(2).map_or("", |m| m.as_str());
                Row {
                    index,
                    class: self.class_attr(attrs),
                    cells: self.cells(body),
                }
            })
            .collect()
    }

    fn cells(&self, body: &str) -> Vec<Cell> {
        self.cell
            .captures_iter(body)
            .map(|caps| {
                let attrs = caps.get(2).map_or("", |m| m.as_str());
                let inner = caps.get(3).map_or("", |m| m.as_str());
                let link = self.link.captures(inner);
                Cell {
                    text: self.strip(inner),
                    link_text: link
                        .as_ref()
                        .and_then(|l| l.get(2))
                        .map(|m| self.strip(m.as_str())),
                    link_title: link
                        .as_ref()
                        .and_then(|l| l.get(1))
                        .and_then(|m| self.title.captures(m.as_str()))
                        .and_then(|t| t.get(1))
                        .map(|m| decode_entities(m.as_str()).trim().to_string()),
                    is_header: caps
                        .get(1)
                        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("th")),
                    class: format!("{} {}", self.class_attr(attrs), self.all_classes(inner))
                        .trim()
                        .to_string(),
                }
            })
            .collect()
    }

    pub fn class_attr(&self, attrs: &str) -> String {
        self.class
            .captures(attrs)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    /// All class attribute values found anywhere in `markup`.
    pub fn all_classes(&self, markup: &str) -> String {
        self.class
            .captures_iter(markup)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tags removed, entities decoded, whitespace collapsed.
    pub fn strip(&self, markup: &str) -> String {
        clean_value(&decode_entities(&self.tag.replace_all(markup, " ")))
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        <table id="prices">
          <tr><th>Symbol</th><th>LTP</th></tr>
          <tr class="up"><td><a title="Alpha Co">ALP</a></td><td>1,200.50</td></tr>
          <tr><td>BETA</td></tr>
          <tr><td>GAM</td><td>88</td></tr>
        </table>"#;

    fn symbol_and_price(row: &Row, _: &[(String, String)]) -> Result<(String, String), SkipReason> {
        Ok((row.text(0).to_string(), row.text(1).to_string()))
    }

    #[test]
    fn test_rows_skip_header_and_short_rows() {
        let strategy = TableStrategy {
            selectors: &["table#prices tr"],
            scan_anchor: None,
            required: 2,
        };
        let report = extract_rows(TABLE, &strategy, symbol_and_price).unwrap();
        assert_eq!(report.count(), 2);
        assert_eq!(report.records[0], ("ALP".to_string(), "1,200.50".to_string()));
        assert_eq!(report.skipped[0], SkippedRow { row: 0, reason: SkipReason::Header });
        assert_eq!(
            report.skipped[1].reason,
            SkipReason::TooFewColumns { found: 1, required: 2 }
        );
    }

    #[test]
    fn test_falls_through_to_looser_selector() {
        let strategy = TableStrategy {
            selectors: &["table#missing tr", "table tr"],
            scan_anchor: None,
            required: 2,
        };
        let report = extract_rows(TABLE, &strategy, symbol_and_price).unwrap();
        assert_eq!(report.count(), 2);
    }

    #[test]
    fn test_missing_container_is_structural() {
        let strategy = TableStrategy {
            selectors: &["table#missing tr"],
            scan_anchor: Some("id=\"missing\""),
            required: 2,
        };
        let err = extract_rows(TABLE, &strategy, symbol_and_price).unwrap_err();
        assert!(matches!(err, ScrapeError::Structure(_)));
    }

    #[test]
    fn test_markup_scan_reads_cells_and_links() {
        let scanner = MarkupScanner::new().unwrap();
        let rows = scanner.rows(
            r#"<tr class="decrease-row"><td><a href="/x" title="Alpha &amp; Co">ALP</a></td><td> 1,200 </td></tr>"#,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].class, "decrease-row");
        assert_eq!(rows[0].cells[0].link_text.as_deref(), Some("ALP"));
        assert_eq!(rows[0].cells[0].link_title.as_deref(), Some("Alpha & Co"));
        assert_eq!(rows[0].text(1), "1,200");
    }

    #[test]
    fn test_marker_classes_fall_back_to_cells() {
        let scanner = MarkupScanner::new().unwrap();
        let rows = scanner.rows(
            r#"<tr class="up"><td>A</td></tr><tr><td class="text-right">B</td><td><span class="text-danger">-2</span></td></tr>"#,
        );
        assert_eq!(rows[0].marker_classes(), "up");
        assert_eq!(rows[1].marker_classes(), "text-right text-danger");

        let doc_rows = extract_rows(
            r#"<table id="t"><tr><td>X</td><td class="decrease">1</td></tr></table>"#,
            &TableStrategy { selectors: &["table#t tr"], scan_anchor: None, required: 2 },
            |row, _: &[String]| Ok(row.marker_classes()),
        )
        .unwrap();
        assert_eq!(doc_rows.records, vec!["decrease".to_string()]);
    }

    #[test]
    fn test_anchor_scan_recovers_rows_outside_a_table() {
        // The parser drops `tr` outside a table, so only the raw scan sees them.
        let html = r#"<div data-x="1"><tr><td>ALP</td><td>12</td></tr><tr><td>BET</td><td>7</td></tr></div>"#;
        let strategy = TableStrategy {
            selectors: &["table[data-x] tr", "[data-x] tr"],
            scan_anchor: Some("data-x=\"1\""),
            required: 2,
        };
        let report = extract_rows(html, &strategy, symbol_and_price).unwrap();
        assert_eq!(report.count(), 2);
        assert_eq!(report.records[1], ("BET".to_string(), "7".to_string()));
    }

    #[test]
    fn test_scan_region_stops_at_table_end() {
        let html = r#"<p>x</p><table data-x="1"><tr><td>a</td></tr></table><table><tr><td>b</td></tr></table>"#;
        let region = scan_region(html, "data-x=\"1\"").unwrap();
        assert!(region.contains("<td>a</td>"));
        assert!(!region.contains("<td>b</td>"));
    }

    #[test]
    fn test_index_zero_data_row_is_kept() {
        let row = Row {
            index: 0,
            class: String::new(),
            cells: vec![
                Cell { text: "ALP".into(), ..Default::default() },
                Cell { text: "12".into(), ..Default::default() },
            ],
        };
        assert!(!row.is_header());
    }
}
