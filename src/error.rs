use thiserror::Error;

/// Failures at the source-adapter boundary.
///
/// None of these reach an API caller directly: the orchestrator logs them and
/// moves on to the next source.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid url {0}")]
    Url(#[from] url::ParseError),

    #[error("expected container missing: {0}")]
    Structure(String),

    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
