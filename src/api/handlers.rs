//! Route handlers.
//!
//! Lookups never fail at the HTTP level because a source was down: an
//! exhausted chain still answers `200` with an empty list. Only a missing
//! company (404) and a missing `html` body field (400) are errors.

use crate::api::types::{Envelope, Health, ParseRequest};
use crate::api::AppState;
use crate::error::ScrapeResult;
use crate::models::FloorsheetReport;
use crate::scraper::cleaner::normalise_symbol;
use crate::scraper::extract::ParseReport;
use crate::scraper::{company, floorsheet, indices, movers, Extraction};
use crate::utils::timestamp;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

const MARKUP_SOURCE: &str = "request body";

/// Nepal Standard Time, UTC+05:45.
const NPT_OFFSET_SECS: i32 = 5 * 3600 + 45 * 60;

/// Current trading date in Kathmandu.
pub fn market_today() -> NaiveDate {
    FixedOffset::east_opt(NPT_OFFSET_SECS)
        .map(|npt| Utc::now().with_timezone(&npt).date_naive())
        .unwrap_or_else(|| Utc::now().date_naive())
}

fn reply<T: Serialize>(status: StatusCode, envelope: Envelope<T>) -> Response {
    (status, Json(envelope)).into_response()
}

// ── Service routes ────────────────────────────────────────────────────────────

pub async fn index() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html><head><title>NEPSE scraper</title></head>
<body>
<h1>NEPSE market data API</h1>
<ul>
  <li>GET <code>/health</code></li>
  <li>GET <code>/api/gainers</code></li>
  <li>GET <code>/api/live-trading</code></li>
  <li>GET <code>/api/indices</code></li>
  <li>GET <code>/api/company/:symbol</code></li>
  <li>GET <code>/api/floorsheet/:symbol</code></li>
  <li>POST <code>/api/parse</code>, <code>/api/parse/live-trading</code>, <code>/api/parse/indices</code>,
      <code>/api/parse/floorsheet</code>, <code>/api/parse/company</code> with <code>{"html": "..."}</code></li>
</ul>
</body></html>"#,
    )
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: timestamp(),
    })
}

pub async fn gainers(State(state): State<AppState>) -> Response {
    let listing = state.service.gainers().await;
    reply(StatusCode::OK, Envelope::from(listing))
}

pub async fn live_trading(State(state): State<AppState>) -> Response {
    let listing = state.service.live_trading().await;
    reply(StatusCode::OK, Envelope::from(listing))
}

pub async fn indices(State(state): State<AppState>) -> Response {
    let listing = state.service.indices().await;
    reply(StatusCode::OK, Envelope::from(listing))
}

pub async fn company(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    let symbol = normalise_symbol(&symbol);
    match state.service.company(&symbol).await {
        Some(profile) => {
            let source = Some(profile.source.clone());
            reply(StatusCode::OK, Envelope::success(profile).with_source(source))
        }
        None => {
            warn!("No company data for {}", symbol);
            reply(
                StatusCode::NOT_FOUND,
                Envelope::<()>::failure(format!("No company data found for {}", symbol)),
            )
        }
    }
}

pub async fn floorsheet(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    let report = state.service.floorsheet(&symbol, market_today()).await;
    floorsheet_reply(report)
}

fn floorsheet_reply(report: FloorsheetReport) -> Response {
    let count = report.total_records();
    let source = report.source.clone();
    let message = report.message.clone();
    reply(
        StatusCode::OK,
        Envelope::success(report)
            .with_count(count)
            .with_source(source)
            .with_message(message),
    )
}

// ── Caller-supplied markup ────────────────────────────────────────────────────

/// `html` (and optional `symbol`) from the body; a 400 reply when `html` is
/// missing or blank.
fn markup(body: Option<Json<ParseRequest>>) -> Result<(String, String), Response> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    match request.html.filter(|h| !h.trim().is_empty()) {
        Some(html) => Ok((html, request.symbol.map(|s| normalise_symbol(&s)).unwrap_or_default())),
        None => Err(reply(
            StatusCode::BAD_REQUEST,
            Envelope::<()>::failure("HTML content is required"),
        )),
    }
}

fn report_reply<T: Serialize>(result: ScrapeResult<ParseReport<T>>) -> Response {
    match result {
        Ok(report) => {
            info!("Parsed {} records from markup ({} rows skipped)", report.count(), report.skipped.len());
            let count = report.count();
            reply(
                StatusCode::OK,
                Envelope::success(report.records)
                    .with_count(count)
                    .with_source(Some(MARKUP_SOURCE.to_string())),
            )
        }
        Err(e) => {
            warn!("Markup parse failed: {}", e);
            reply(StatusCode::UNPROCESSABLE_ENTITY, Envelope::<()>::failure(e.to_string()))
        }
    }
}

pub async fn parse_gainers(body: Option<Json<ParseRequest>>) -> Response {
    match markup(body) {
        Ok((html, _)) => report_reply(movers::parse_gainers(&html)),
        Err(rejection) => rejection,
    }
}

pub async fn parse_live_trading(body: Option<Json<ParseRequest>>) -> Response {
    match markup(body) {
        Ok((html, _)) => report_reply(movers::parse_live_trading(&html)),
        Err(rejection) => rejection,
    }
}

pub async fn parse_indices(body: Option<Json<ParseRequest>>) -> Response {
    match markup(body) {
        Ok((html, _)) => report_reply(indices::parse_indices(&html)),
        Err(rejection) => rejection,
    }
}

pub async fn parse_company(body: Option<Json<ParseRequest>>) -> Response {
    let (html, symbol) = match markup(body) {
        Ok(parts) => parts,
        Err(rejection) => return rejection,
    };
    match company::parse_company(&html, &symbol) {
        Ok(report) => match report.records.into_iter().next() {
            Some(profile) => reply(
                StatusCode::OK,
                Envelope::success(profile).with_source(Some(MARKUP_SOURCE.to_string())),
            ),
            None => reply(
                StatusCode::NOT_FOUND,
                Envelope::<()>::failure("No company data found in markup"),
            ),
        },
        Err(e) => reply(StatusCode::UNPROCESSABLE_ENTITY, Envelope::<()>::failure(e.to_string())),
    }
}

pub async fn parse_floorsheet(body: Option<Json<ParseRequest>>) -> Response {
    let (html, symbol) = match markup(body) {
        Ok(parts) => parts,
        Err(rejection) => return rejection,
    };
    let date = market_today().to_string();
    match floorsheet::parse_floorsheet_markup(&html, &symbol) {
        Ok(Extraction::Records(report)) => {
            let company_name = report.heading.clone().unwrap_or_else(|| symbol.clone());
            let mut out = FloorsheetReport::new(symbol, company_name, date, report.records);
            out.source = Some(MARKUP_SOURCE.to_string());
            floorsheet_reply(out)
        }
        Ok(Extraction::ExplicitlyEmpty) => {
            let mut out = FloorsheetReport::new(symbol.clone(), symbol, date, Vec::new());
            out.message = Some("Markup reports no floorsheet records".to_string());
            out.source = Some(MARKUP_SOURCE.to_string());
            floorsheet_reply(out)
        }
        Err(e) => reply(StatusCode::UNPROCESSABLE_ENTITY, Envelope::<()>::failure(e.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::pipeline::service::MarketService;
    use crate::pipeline::snapshot::NEPSE_SNAPSHOT;
    use crate::scraper::testing::{fixtures, FakeFetcher};
    use serde_json::Value;
    use std::sync::Arc;

    fn state(fetcher: FakeFetcher) -> State<AppState> {
        State(AppState {
            service: MarketService::new(Arc::new(fetcher), AppConfig::default(), NEPSE_SNAPSHOT),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(html: Option<&str>, symbol: Option<&str>) -> Option<Json<ParseRequest>> {
        Some(Json(ParseRequest {
            html: html.map(str::to_string),
            symbol: symbol.map(str::to_string),
        }))
    }

    #[tokio::test]
    async fn test_parse_gainers_single_row() {
        let html = r#"<table data-live="gainers"><tr><th>Symbol</th><th>LTP</th><th>%</th><th>High</th><th>Low</th><th>Open</th><th>Qty</th><th>Turnover</th></tr><tr><td><a title="Full Co">ABC</a></td><td>123.45</td><td>2.1</td><td>125</td><td>120</td><td>121</td><td>1,000</td><td>123,450</td></tr></table>"#;
        let response = parse_gainers(request(Some(html), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["data"][0]["symbol"], "ABC");
        assert_eq!(json["data"][0]["fullName"], "Full Co");
        assert_eq!(json["data"][0]["lastTradedPrice"], 123.45);
    }

    #[tokio::test]
    async fn test_parse_without_html_is_bad_request() {
        let response = parse_gainers(request(None, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "HTML content is required");

        assert_eq!(parse_indices(None).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_floorsheet(request(Some("   "), Some("NABIL"))).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_floorsheet_summary() {
        let response = parse_floorsheet(request(Some(fixtures::MEROLAGANI_FLOORSHEET_NABIL), Some("nabil"))).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["symbol"], "NABIL");
        assert_eq!(json["data"]["companyName"], "Nabil Bank Limited");
        assert_eq!(json["data"]["totalRecords"], 2);
        assert_eq!(json["data"]["summary"]["totalQuantity"], 40);
        assert_eq!(json["data"]["summary"]["totalAmount"], 20_500.0);
    }

    #[tokio::test]
    async fn test_parse_floorsheet_general_page_keeps_only_symbol() {
        let response = parse_floorsheet(request(Some(fixtures::SHARESANSAR_FLOORSHEET), Some("NABIL"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["totalRecords"], 1);
        assert_eq!(json["data"]["summary"]["totalQuantity"], 10);
        assert_eq!(json["data"]["floorsheet"][0]["contractNo"], "2026101605000123");
        assert_eq!(json["data"]["floorsheet"][0]["stockholder"], "NABIL");
    }

    #[tokio::test]
    async fn test_unparseable_markup_is_unprocessable() {
        let response = parse_live_trading(request(Some("<p>nothing here</p>"), None)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_indices_exhaustion_serves_snapshot() {
        let json = body_json(indices(state(FakeFetcher::new())).await).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 7);
        assert_eq!(json["fallback"], true);
        assert!(json["note"].is_string());
    }

    #[tokio::test]
    async fn test_company_not_found_is_404() {
        let response = company(state(FakeFetcher::new()), Path("nope".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().is_some_and(|e| e.contains("NOPE")));
    }

    #[tokio::test]
    async fn test_floorsheet_exhaustion_is_success_with_message() {
        let response = floorsheet(state(FakeFetcher::new()), Path("NABIL".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["totalRecords"], 0);
        assert_eq!(json["data"]["floorsheet"].as_array().map(Vec::len), Some(0));
        assert!(json["data"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = health().await;
        assert_eq!(health.status, "ok");
    }
}
