pub mod cleaner;
pub mod company;
pub mod extract;
pub mod floorsheet;
pub mod http_client;
pub mod indices;
pub mod movers;

#[cfg(test)]
pub mod testing;

use crate::error::ScrapeResult;
use async_trait::async_trait;
use std::time::Duration;

use self::extract::ParseReport;

// ── Fetch capability ──────────────────────────────────────────────────────────

/// Page download capability. Adapters never touch the network directly.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> ScrapeResult<String>;
}

// ── Source adapters ───────────────────────────────────────────────────────────

/// What one adapter made of its page.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Records(ParseReport<T>),
    /// The source answered and explicitly reported no data ("No Record Found").
    ExplicitlyEmpty,
}

/// A (site, entity type) pair: where to fetch and how to read the page.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    type Record: Send;

    /// Name reported back to API callers as `source`.
    fn source(&self) -> &'static str;

    fn url(&self) -> ScrapeResult<String>;

    fn timeout(&self) -> Duration;

    fn extract(&self, html: &str) -> ScrapeResult<Extraction<Self::Record>>;

    async fn run(&self, fetcher: &dyn PageFetcher) -> ScrapeResult<Extraction<Self::Record>> {
        let url = self.url()?;
        let html = fetcher.fetch(&url, self.timeout()).await?;
        self.extract(&html)
    }
}

/// Join a base URL and a path, attaching query parameters.
pub fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> ScrapeResult<String> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let url = if params.is_empty() {
        url::Url::parse(&joined)?
    } else {
        url::Url::parse_with_params(&joined, params.iter().map(|(k, v)| (*k, v.as_str())))?
    };
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        assert_eq!(
            build_url("https://merolagani.com/", "/Floorsheet.aspx", &[("stock", "NABIL".into())]).unwrap(),
            "https://merolagani.com/Floorsheet.aspx?stock=NABIL"
        );
        assert_eq!(
            build_url("https://nepalipaisa.com", "", &[]).unwrap(),
            "https://nepalipaisa.com/"
        );
    }
}
