//! Request and response bodies.

use crate::pipeline::service::Listing;
use crate::utils::timestamp;
use serde::{Deserialize, Serialize};

/// JSON envelope shared by every `/api` route. Unset fields are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            timestamp: timestamp(),
            source: None,
            note: None,
            fallback: None,
            message: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            count: None,
            timestamp: timestamp(),
            source: None,
            note: None,
            fallback: None,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

impl<T: Serialize> From<Listing<T>> for Envelope<Vec<T>> {
    fn from(listing: Listing<T>) -> Self {
        let count = listing.count();
        let mut envelope = Envelope::success(listing.records)
            .with_count(count)
            .with_source(listing.source)
            .with_message(listing.message);
        envelope.note = listing.note;
        envelope.fallback = listing.fallback.then_some(true);
        envelope
    }
}

/// Body of the `/api/parse*` routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseRequest {
    pub html: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_omits_data() {
        let json = serde_json::to_value(Envelope::<()>::failure("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("data").is_none());
        assert!(json.get("count").is_none());
    }

    #[test]
    fn test_listing_envelope_carries_fallback_flag() {
        let listing = Listing {
            records: vec![1, 2],
            source: Some("static snapshot".to_string()),
            fallback: true,
            note: Some("stale".to_string()),
            message: None,
        };
        let json = serde_json::to_value(Envelope::from(listing)).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["fallback"], true);
        assert_eq!(json["note"], "stale");
        assert!(json.get("message").is_none());
    }
}
