use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Market movers ─────────────────────────────────────────────────────────────

/// One row of a gainers/losers style table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketMover {
    pub symbol: String,
    pub full_name: String,
    pub last_traded_price: f64,
    pub percent_change: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub quantity: i64,
    pub turnover: f64,
}

// ── Live trading ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increase,
    Decrease,
}

/// Live-trading row. `change_type` comes from the row's style marker and is
/// not reconciled with the sign of `diff`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveTradingRow {
    #[serde(flatten)]
    pub quote: MarketMover,
    pub previous_close: f64,
    pub diff: f64,
    pub change_type: ChangeType,
}

// ── Indices ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndex {
    pub name: String,
    pub value: f64,
    pub percent_change: f64,
    pub direction: Direction,
    pub volume: f64,
}

// ── Floorsheet ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloorsheetTransaction {
    pub sn: u32,
    pub contract_no: String,
    pub stockholder: String,
    pub buyer: i64,
    pub seller: i64,
    pub quantity: i64,
    pub rate: f64,
    pub amount: f64,
}

/// Aggregates over an accepted transaction set. Always derived on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloorsheetSummary {
    pub total_transactions: usize,
    pub total_quantity: i64,
    pub total_amount: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub average_rate: f64,
}

impl FloorsheetSummary {
    pub fn from_transactions(transactions: &[FloorsheetTransaction]) -> Self {
        let mut summary = transactions.iter().fold(
            FloorsheetSummary {
                min_rate: f64::INFINITY,
                ..Default::default()
            },
            |mut acc, t| {
                acc.total_transactions += 1;
                acc.total_quantity += t.quantity;
                acc.total_amount += t.amount;
                acc.min_rate = acc.min_rate.min(t.rate);
                acc.max_rate = acc.max_rate.max(t.rate);
                acc
            },
        );

        if summary.total_transactions == 0 {
            summary.min_rate = 0.0;
        }
        summary.average_rate = if summary.total_quantity == 0 {
            0.0
        } else {
            summary.total_amount / summary.total_quantity as f64
        };
        summary
    }
}

/// Floorsheet lookup result for one symbol. The summary is computed from the
/// transaction list at serialization time, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorsheetReport {
    pub symbol: String,
    pub company_name: String,
    /// Session the transactions actually came from (YYYY-MM-DD).
    pub floorsheet_date: String,
    pub message: Option<String>,
    pub source: Option<String>,
    transactions: Vec<FloorsheetTransaction>,
}

impl FloorsheetReport {
    pub fn new(
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        floorsheet_date: impl Into<String>,
        transactions: Vec<FloorsheetTransaction>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            floorsheet_date: floorsheet_date.into(),
            message: None,
            source: None,
            transactions,
        }
    }

    pub fn total_records(&self) -> usize {
        self.transactions.len()
    }

    pub fn summary(&self) -> FloorsheetSummary {
        FloorsheetSummary::from_transactions(&self.transactions)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FloorsheetReportView<'a> {
    symbol: &'a str,
    company_name: &'a str,
    floorsheet_date: &'a str,
    total_records: usize,
    floorsheet: &'a [FloorsheetTransaction],
    summary: FloorsheetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    source: Option<&'a str>,
}

impl Serialize for FloorsheetReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FloorsheetReportView {
            symbol: &self.symbol,
            company_name: &self.company_name,
            floorsheet_date: &self.floorsheet_date,
            total_records: self.total_records(),
            floorsheet: &self.transactions,
            summary: self.summary(),
            message: self.message.as_deref(),
            source: self.source.as_deref(),
        }
        .serialize(serializer)
    }
}

// ── Company profile ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub company_name: String,
    pub sector: String,
    pub market_data: CompanyMarketData,
    pub key_metrics: KeyMetrics,
    pub dividend_info: DividendInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_highlights: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_details: Option<BTreeMap<String, String>>,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMarketData {
    pub ltp: f64,
    pub change: f64,
    pub percent_change: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_traded_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_52w: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_52w: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_yield: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_volume_30d: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    pub shares_outstanding: f64,
    pub market_cap: f64,
    pub eps: TaggedValue,
    pub pe: f64,
    pub book_value: f64,
    pub pbv: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_120_day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_180_day: Option<f64>,
}

/// A value reported together with its fiscal-year tag, e.g. EPS.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaggedValue {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DividendInfo {
    pub cash: DistributionRecord,
    pub bonus: DistributionRecord,
    pub right_share: DistributionRecord,
}

/// Cash dividend, bonus or right-share distribution with its history table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecord {
    pub latest: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<String>,
    pub history: Vec<BTreeMap<String, String>>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
