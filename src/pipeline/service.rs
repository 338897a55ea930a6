//! Per-entity chains and the request-level answers built from them.

use crate::config::AppConfig;
use crate::models::{
    CompanyProfile, FloorsheetReport, FloorsheetTransaction, LiveTradingRow, MarketIndex, MarketMover,
};
use crate::pipeline::snapshot::IndexSnapshot;
use crate::pipeline::{resolve, AdapterChain, Resolution};
use crate::scraper::cleaner::normalise_symbol;
use crate::scraper::company::{CompanyAdapter, CompanySite};
use crate::scraper::floorsheet::{FloorsheetAdapter, FloorsheetScope, FloorsheetSite};
use crate::scraper::indices::{MeroLaganiIndexScan, MeroLaganiIndexSlider, NepaliPaisaTicker};
use crate::scraper::movers::{MeroLaganiGainers, MeroLaganiLiveTrading, ShareSansarLiveTrading};
use crate::scraper::{PageFetcher, SourceAdapter};
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::info;

/// Floorsheet sources for one trading date, in priority order.
pub const FLOORSHEET_CHAIN: [(FloorsheetSite, FloorsheetScope); 4] = [
    (FloorsheetSite::MeroLagani, FloorsheetScope::Symbol),
    (FloorsheetSite::MeroLagani, FloorsheetScope::General),
    (FloorsheetSite::ShareSansar, FloorsheetScope::Symbol),
    (FloorsheetSite::ShareSansar, FloorsheetScope::General),
];

pub const COMPANY_CHAIN: [CompanySite; 4] = [
    CompanySite::MeroLagani,
    CompanySite::ShareSansar,
    CompanySite::NepaliPaisa,
    CompanySite::MeroLaganiLiveMarket,
];

/// A list-valued answer. An exhausted chain still produces one, with no
/// records and a `message`.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub source: Option<String>,
    pub fallback: bool,
    pub note: Option<String>,
    pub message: Option<String>,
}

impl<T> Listing<T> {
    fn found(source: &str, records: Vec<T>) -> Self {
        Self {
            records,
            source: Some(source.to_string()),
            fallback: false,
            note: None,
            message: None,
        }
    }

    fn empty(message: String) -> Self {
        Self {
            records: Vec::new(),
            source: None,
            fallback: false,
            note: None,
            message: Some(message),
        }
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// Entry point for every entity lookup. Cheap to clone; holds no
/// per-request state.
#[derive(Clone)]
pub struct MarketService {
    fetcher: Arc<dyn PageFetcher>,
    config: AppConfig,
    snapshot: IndexSnapshot,
}

impl MarketService {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: AppConfig, snapshot: IndexSnapshot) -> Self {
        Self {
            fetcher,
            config,
            snapshot,
        }
    }

    pub async fn gainers(&self) -> Listing<MarketMover> {
        let chain: AdapterChain<MarketMover> = vec![Box::new(MeroLaganiGainers::new(&self.config.scraper))];
        match resolve("gainers", &chain, self.fetcher.as_ref()).await.resolution {
            Resolution::Found { source, report } => Listing::found(source, report.records),
            _ => Listing::empty("No gainers data available from any source".to_string()),
        }
    }

    pub async fn live_trading(&self) -> Listing<LiveTradingRow> {
        let scraper = &self.config.scraper;
        let chain: AdapterChain<LiveTradingRow> = vec![
            Box::new(MeroLaganiLiveTrading::new(scraper)),
            Box::new(ShareSansarLiveTrading::new(scraper)),
        ];
        match resolve("live trading", &chain, self.fetcher.as_ref()).await.resolution {
            Resolution::Found { source, report } => Listing::found(source, report.records),
            _ => Listing::empty("No live trading data available from any source".to_string()),
        }
    }

    /// Live sources first; the static snapshot when all of them fail.
    pub async fn indices(&self) -> Listing<MarketIndex> {
        let scraper = &self.config.scraper;
        let chain: AdapterChain<MarketIndex> = vec![
            Box::new(NepaliPaisaTicker::new(scraper)),
            Box::new(MeroLaganiIndexSlider::new(scraper)),
            Box::new(MeroLaganiIndexScan::new(scraper)),
        ];
        match resolve("indices", &chain, self.fetcher.as_ref()).await.resolution {
            Resolution::Found { source, report } => Listing::found(source, report.records),
            _ => {
                info!("indices: serving snapshot {}", self.snapshot.version);
                Listing {
                    records: self.snapshot.indices(),
                    source: Some(format!("static snapshot {}", self.snapshot.version)),
                    fallback: true,
                    note: Some(self.snapshot.note()),
                    message: None,
                }
            }
        }
    }

    pub async fn company(&self, symbol: &str) -> Option<CompanyProfile> {
        let symbol = normalise_symbol(symbol);
        let chain: AdapterChain<CompanyProfile> = COMPANY_CHAIN
            .iter()
            .map(|site| -> Box<dyn SourceAdapter<Record = CompanyProfile>> {
                Box::new(CompanyAdapter::new(&self.config.scraper, *site, &symbol))
            })
            .collect();
        let label = format!("company {}", symbol);
        match resolve(&label, &chain, self.fetcher.as_ref()).await.resolution {
            Resolution::Found { report, .. } => report.records.into_iter().next(),
            _ => None,
        }
    }

    fn floorsheet_chain(
        &self,
        symbol: &str,
        date: NaiveDate,
        links: &[(FloorsheetSite, FloorsheetScope)],
    ) -> AdapterChain<FloorsheetTransaction> {
        links
            .iter()
            .map(|(site, scope)| -> Box<dyn SourceAdapter<Record = FloorsheetTransaction>> {
                Box::new(FloorsheetAdapter::new(&self.config.scraper, *site, *scope, symbol, date))
            })
            .collect()
    }

    /// Floorsheet for `symbol` on `today`, or on the most recent prior day
    /// with trades.
    ///
    /// The full source chain runs for `today`. When it yields nothing, the
    /// source that last gave a well-formed answer (the primary source if none
    /// did) is replayed one calendar day at a time, back to `lookback_days`.
    pub async fn floorsheet(&self, symbol: &str, today: NaiveDate) -> FloorsheetReport {
        let symbol = normalise_symbol(symbol);
        let chain = self.floorsheet_chain(&symbol, today, &FLOORSHEET_CHAIN);
        let outcome = resolve(&format!("floorsheet {} {}", symbol, today), &chain, self.fetcher.as_ref()).await;
        let replay_position = outcome.last_answered().unwrap_or(0);

        let replay_link = match outcome.resolution {
            Resolution::Found { source, report } => {
                return self.floorsheet_report(&symbol, today, source, report.heading, report.records);
            }
            _ => FLOORSHEET_CHAIN[replay_position],
        };

        let lookback = self.config.floorsheet.lookback_days;
        for back in 1..=lookback {
            let Some(date) = today.checked_sub_days(Days::new(u64::from(back))) else { break };
            let chain = self.floorsheet_chain(&symbol, date, &[replay_link]);
            let label = format!("floorsheet {} {} (replay)", symbol, date);
            if let Resolution::Found { source, report } = resolve(&label, &chain, self.fetcher.as_ref()).await.resolution {
                let mut found = self.floorsheet_report(&symbol, date, source, report.heading, report.records);
                found.message = Some(format!("No transactions on {}; showing {}", today, date));
                return found;
            }
        }

        let mut empty = FloorsheetReport::new(symbol.clone(), symbol.clone(), today.to_string(), Vec::new());
        empty.message = Some(format!(
            "No floorsheet data found for {} on {} or the {} days before",
            symbol, today, lookback
        ));
        empty
    }

    fn floorsheet_report(
        &self,
        symbol: &str,
        date: NaiveDate,
        source: &str,
        heading: Option<String>,
        transactions: Vec<FloorsheetTransaction>,
    ) -> FloorsheetReport {
        let company_name = heading.unwrap_or_else(|| symbol.to_string());
        let mut report = FloorsheetReport::new(symbol, company_name, date.to_string(), transactions);
        report.source = Some(source.to_string());
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
