//! Capability enrichment: attach request headers and learn range support
//! from response headers, updating the first matching ledger entry in place.

use super::record::{header_value, HttpHeader};
use super::RequestLedger;

/// What an enrichment event did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// No record for the URL (evicted or never observed).
    NoMatch,
    /// A record matched but nothing changed.
    Unchanged,
    /// A record was modified; the snapshot must be persisted.
    Updated,
}

impl EnrichOutcome {
    pub fn is_updated(self) -> bool {
        self == EnrichOutcome::Updated
    }
}

/// Range capability advertised by a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeCapability {
    /// `Content-Length`, if present and numeric.
    pub content_length: Option<u64>,
    /// True if `Accept-Ranges` carries the `bytes` token.
    pub accepts_byte_ranges: bool,
}

impl RangeCapability {
    pub fn from_headers(headers: &[HttpHeader]) -> Self {
        let content_length = header_value(headers, "content-length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        let accepts_byte_ranges = header_value(headers, "accept-ranges")
            .map(|v| v.to_ascii_lowercase().contains("bytes"))
            .unwrap_or(false);
        Self {
            content_length,
            accepts_byte_ranges,
        }
    }

    /// Resource can be fetched out of order: positive known length and byte ranges.
    pub fn is_segmentable(&self) -> bool {
        self.accepts_byte_ranges && self.content_length.is_some_and(|n| n > 0)
    }
}

impl RequestLedger {
    /// Attach the request headers of the headers-sent phase.
    pub fn attach_headers(&mut self, url: &str, headers: Vec<HttpHeader>) -> EnrichOutcome {
        match self.find_mut(url) {
            Some(record) => {
                record.request_headers = Some(headers);
                EnrichOutcome::Updated
            }
            None => EnrichOutcome::NoMatch,
        }
    }

    /// Apply the response-started phase. Only ever clears `sequential`.
    pub fn record_response(&mut self, url: &str, response_headers: &[HttpHeader]) -> EnrichOutcome {
        let Some(record) = self.find_mut(url) else {
            return EnrichOutcome::NoMatch;
        };
        if record.sequential && RangeCapability::from_headers(response_headers).is_segmentable() {
            record.sequential = false;
            EnrichOutcome::Updated
        } else {
            EnrichOutcome::Unchanged
        }
    }
}
