//! In-memory page fetcher for tests.

use crate::error::{ScrapeError, ScrapeResult};
use crate::scraper::PageFetcher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Serves canned HTML by exact URL; anything unknown is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> ScrapeResult<String> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        self.pages.get(url).cloned().ok_or_else(|| ScrapeError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Trimmed copies of the pages each source serves.
pub mod fixtures {
    pub const MEROLAGANI_MARKET: &str = r##"<html><body>
<div class="index-slider">
  <div class="slider-item increase">
    <span class="index-name">NEPSE Index</span>
    <span class="index-value">2,712.45</span>
    <span class="index-change">32.10 (1.20%)</span>
    <span class="index-volume">(5,123,456,789)</span>
  </div>
  <div class="slider-item decrease">
    <span class="index-name">Sensitive Index</span>
    <span class="index-value">462.30</span>
    <span class="index-change">2.10 (0.45%)</span>
  </div>
  <div class="slider-item increase">
    <span class="index-name">Banking SubIndex</span>
    <span class="index-value">1,450.20</span>
    <span class="index-change">8.40 (0.58%)</span>
  </div>
  <div class="slider-item increase">
    <span class="index-name">NEPSE Index</span>
    <span class="index-value">2,700.00</span>
    <span class="index-change">20.00 (0.75%)</span>
  </div>
</div>
<table class="table" data-live="gainers">
  <tr><th>Symbol</th><th>LTP</th><th>% Change</th><th>High</th><th>Low</th><th>Open</th><th>Qty</th><th>Turnover</th></tr>
  <tr><td><a href="/CompanyDetail.aspx?symbol=NABIL" title="Nabil Bank Limited">NABIL</a></td><td>1,234.50</td><td>9.98</td><td>1,234.50</td><td>1,120.00</td><td>1,125.00</td><td>12,500</td><td>15,431,250.00</td></tr>
  <tr><td><a href="/CompanyDetail.aspx?symbol=UPPER" title="Upper Tamakoshi Hydropower Ltd">UPPER</a></td><td>301.50</td><td>0.50</td><td>303.00</td><td>299.00</td><td>300.00</td><td>8,000</td><td>2,412,000.00</td></tr>
</table>
<div id="ctl00_ContentPlaceHolder1_LiveTrading">
  <table class="table">
    <tr><th>Symbol</th><th>LTP</th><th>% Change</th><th>Open</th><th>High</th><th>Low</th><th>Qty</th><th>PClose</th><th>Diff</th></tr>
    <tr class="increase-row"><td><a title="Nabil Bank Limited">NABIL</a></td><td>1,234.50</td><td>9.98</td><td>1,125.00</td><td>1,234.50</td><td>1,120.00</td><td>12,500</td><td>1,122.50</td><td>112.00</td></tr>
    <tr class="decrease-row"><td><a title="Hydroelectricity Investment and Development Company Ltd">HIDCL</a></td><td>212.00</td><td>-1.49</td><td>215.00</td><td>216.00</td><td>211.00</td><td>40,210</td><td>215.20</td><td>-3.20</td></tr>
    <tr class="decrease-row"><td><a title="Upper Tamakoshi Hydropower Ltd">UPPER</a></td><td>301.50</td><td>0.50</td><td>300.00</td><td>303.00</td><td>299.00</td><td>8,000</td><td>300.00</td><td>1.50</td></tr>
  </table>
</div>
</body></html>"##;

    pub const SHARESANSAR_LIVE: &str = r##"<html><body>
<table id="headFixed" class="table table-bordered">
  <thead>
    <tr><th>S.No</th><th>Symbol</th><th>LTP</th><th>Point Change</th><th>% Change</th><th>Open</th><th>High</th><th>Low</th><th>Volume</th><th>Turnover</th><th>Prev. Close</th></tr>
  </thead>
  <tbody>
    <tr><td>1</td><td><a href="https://www.sharesansar.com/company/nica" title="NIC Asia Bank">NICA</a></td><td>572.00</td><td>5.00</td><td>0.88</td><td>567.00</td><td>575.00</td><td>566.00</td><td>5,000</td><td>2,860,000.00</td><td>567.00</td></tr>
  </tbody>
</table>
</body></html>"##;

    pub const NEPALIPAISA_HOME: &str = r##"<html><body>
<div class="index-ticker">
  <div class="ticker-item up">
    <span class="ticker-name">NEPSE</span>
    <span class="ticker-value">2,712.45</span>
    <span class="ticker-change">0.87%</span>
    <span class="ticker-volume">5,123,456,789</span>
  </div>
  <div class="ticker-item down">
    <span class="ticker-name">Banking</span>
    <span class="ticker-value">1,450.20</span>
    <span class="ticker-change">2.05 %</span>
  </div>
</div>
</body></html>"##;

    pub const MEROLAGANI_FLAT_INDICES: &str = r##"<html><body>
<div class="summary-strip">
  <span class="index-name">NEPSE Index</span><span class="index-value">2,712.45</span><span class="index-change up">1.1%</span><span class="index-volume">(4,000,000)</span>
  <span class="index-name">Float Index</span><span class="index-value">190.12</span><span class="index-change down">0.3%</span>
</div>
</body></html>"##;

    pub const MEROLAGANI_FLOORSHEET_NABIL: &str = r##"<html><body>
<h4><span id="ctl00_ContentPlaceHolder1_CompanyDetail1_companyName">Nabil Bank Limited</span></h4>
<div id="ctl00_ContentPlaceHolder1_divData">
  <table class="table table-bordered">
    <tr><th>#</th><th>Transact. No.</th><th>Buyer</th><th>Seller</th><th>Quantity</th><th>Rate</th><th>Amount</th></tr>
    <tr><td>1</td><td>2026101901000001</td><td>58</td><td>21</td><td>20</td><td>512.00</td><td>10,240.00</td></tr>
    <tr><td>2</td><td>2026101901000002</td><td>34</td><td>58</td><td>0</td><td>512.00</td><td>0</td></tr>
    <tr><td>3</td><td>2026101901000003</td><td>21</td><td>44</td><td>20</td><td>513.00</td><td>10,260.00</td></tr>
  </table>
</div>
</body></html>"##;

    pub const MEROLAGANI_FLOORSHEET_GENERAL: &str = r##"<html><body>
<div id="ctl00_ContentPlaceHolder1_divData">
  <table class="table table-bordered">
    <tr><th>#</th><th>Transact. No.</th><th>Symbol</th><th>Buyer</th><th>Seller</th><th>Quantity</th><th>Rate</th><th>Amount</th></tr>
    <tr><td>1</td><td>2026101901000010</td><td>NABIL</td><td>58</td><td>21</td><td>15</td><td>510.00</td><td>7,650.00</td></tr>
    <tr><td>2</td><td>2026101901000011</td><td>NICA</td><td>12</td><td>33</td><td>100</td><td>570.00</td><td>57,000.00</td></tr>
  </table>
</div>
</body></html>"##;

    pub const SHARESANSAR_FLOORSHEET: &str = r##"<html><body>
<table id="myTable" class="table">
  <thead>
    <tr><th>S.N</th><th>Symbol</th><th>Contract No.</th><th>Buyer</th><th>Seller</th><th>Quantity</th><th>Rate</th><th>Amount</th></tr>
  </thead>
  <tbody>
    <tr><td>1</td><td>NABIL</td><td>2026101605000123</td><td>58</td><td>44</td><td>10</td><td>515.00</td><td>5,150.00</td></tr>
    <tr><td>2</td><td>NICA</td><td>2026101605000124</td><td>12</td><td>33</td><td>50</td><td>570.00</td><td>28,500.00</td></tr>
  </tbody>
</table>
</body></html>"##;

    pub const MEROLAGANI_FLOORSHEET_EMPTY: &str = r##"<html><body>
<div id="ctl00_ContentPlaceHolder1_divData">
  <div class="alert alert-info">No Record Found.</div>
</div>
</body></html>"##;

    pub const MEROLAGANI_COMPANY: &str = r##"<html><body>
<h4><span id="ctl00_ContentPlaceHolder1_CompanyDetail1_companyName">Nabil Bank Limited</span></h4>
<table id="accordion" class="table table-striped">
  <tbody class="panel panel-default"><tr><th>Sector</th><td>Commercial Banks</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>Shares Outstanding</th><td>270,520,456.00</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>Market Price</th><td>512.00</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>% Change</th><td>1.39 %</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>Last Traded On</th><td>2026/10/19 15:00:00</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>52 Weeks High - Low</th><td>620.00-455.50</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>1 Year Yield</th><td>8.25%</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>EPS</th><td>25.10 <span class="text-primary">(FY:081-082, Q:4)</span></td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>P/E Ratio</th><td>20.40</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>Book Value</th><td>220.15</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>PBV</th><td>2.33</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>% Dividend</th><td>15.00% <span class="text-primary">(FY:080-081)</span></td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>% Bonus</th><td>5.00% <span class="text-primary">(FY:080-081)</span></td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>30-Day Avg Volume</th><td>45,210.00</td></tr></tbody>
  <tbody class="panel panel-default"><tr><th>Market Capitalization</th><td>138,500,000,000.00</td></tr></tbody>
</table>
<div id="dividend-panel">
  <table class="table">
    <tr><th>#</th><th>Fiscal Year</th><th>Value</th></tr>
    <tr><td>1</td><td>080/081</td><td>15.00%</td></tr>
    <tr><td>2</td><td>079/080</td><td>18.00%</td></tr>
  </table>
</div>
<div id="accordion-2">
  <table class="table">
    <tr><td>Net Profit</td><td>12,345,678</td></tr>
    <tr><td>Total Assets</td><td>987,654,321</td></tr>
  </table>
</div>
</body></html>"##;

    pub const SHARESANSAR_COMPANY: &str = r##"<html><body>
<div class="company-profile">
  <h1>NIC Asia Bank Ltd.</h1>
  <div class="company-category"><a href="#">Commercial Bank</a></div>
</div>
<div class="quote-box">
  <span class="current-price">568.00</span>
  <span class="number-rate">-4.00</span>
  <span class="percent-rate">(-0.70%)</span>
</div>
<table class="company-table">
  <tr><td>Listed Shares:</td><td>150,000,000</td></tr>
  <tr><td>Paid-up Value:</td><td>100.00</td></tr>
</table>
</body></html>"##;

    pub const NEPALIPAISA_COMPANY: &str = r##"<html><body>
<div class="company-title"><h1>NIC Asia Bank Limited</h1></div>
<div class="price-box">
  <span class="current-price">572.00</span>
  <span class="price-change">5.00 (0.88%)</span>
</div>
<table class="company-info-table">
  <tr><td>Listed Shares</td><td>150,000,000</td></tr>
</table>
</body></html>"##;
}
