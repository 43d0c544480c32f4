//! Request ledger: a capacity-bounded, insertion-ordered window of recent
//! requests, the single source of truth for download correlation.
//!
//! Records are appended at the tail; when the ledger is full the oldest
//! record is evicted first. Lookups return the first record (oldest) whose
//! URL matches exactly.

mod enrich;
mod record;

pub use enrich::{EnrichOutcome, RangeCapability};
pub use record::{header_value, HttpHeader, RequestBody, RequestRecord, UploadData};

use std::collections::VecDeque;

/// Default number of records kept.
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct RequestLedger {
    records: VecDeque<RequestRecord>,
    capacity: usize,
}

impl Default for RequestLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RequestLedger {
    /// Empty ledger holding at most `capacity` records (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild from a persisted snapshot, keeping only the newest `capacity` records.
    pub fn from_snapshot(records: Vec<RequestRecord>, capacity: usize) -> Self {
        let mut ledger = Self::new(capacity);
        for record in records {
            ledger.record_request(record);
        }
        ledger
    }

    /// Append a record, evicting the oldest one first if the ledger is full.
    /// Returns the evicted record, if any.
    pub fn record_request(&mut self, record: RequestRecord) -> Option<RequestRecord> {
        let evicted = if self.records.len() >= self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    /// First record whose URL equals `url`.
    pub fn find(&self, url: &str) -> Option<&RequestRecord> {
        self.records.iter().find(|r| r.url == url)
    }

    fn find_mut(&mut self, url: &str) -> Option<&mut RequestRecord> {
        self.records.iter_mut().find(|r| r.url == url)
    }

    /// Copy of the records in ledger order, as mirrored to the durable store.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// First record in `records` whose URL equals `url`. Used on store snapshots.
pub fn find_first<'a>(records: &'a [RequestRecord], url: &str) -> Option<&'a RequestRecord> {
    records.iter().find(|r| r.url == url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> RequestRecord {
        RequestRecord::initiated(url, "GET", None)
    }

    #[test]
    fn new_record_is_sequential_without_headers() {
        let mut ledger = RequestLedger::default();
        ledger.record_request(get("https://ex.com/a"));
        let rec = ledger.find("https://ex.com/a").unwrap();
        assert!(rec.sequential);
        assert!(rec.request_headers.is_none());
        assert_eq!(ledger.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn keeps_the_most_recent_fifty_oldest_evicted_first() {
        let mut ledger = RequestLedger::new(50);
        for i in 0..50 {
            assert!(ledger.record_request(get(&format!("https://ex.com/{i}"))).is_none());
        }
        for i in 50..120 {
            let evicted = ledger
                .record_request(get(&format!("https://ex.com/{i}")))
                .expect("full ledger evicts");
            assert_eq!(evicted.url, format!("https://ex.com/{}", i - 50));
            assert_eq!(ledger.len(), 50);
        }
        let urls: Vec<String> = ledger.iter().map(|r| r.url.clone()).collect();
        let expected: Vec<String> = (70..120).map(|i| format!("https://ex.com/{i}")).collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn duplicate_urls_are_kept_and_first_wins() {
        let mut ledger = RequestLedger::new(50);
        ledger.record_request(RequestRecord::initiated("https://ex.com/x", "POST", None));
        ledger.record_request(get("https://ex.com/x"));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.find("https://ex.com/x").unwrap().method, "POST");
        let snapshot = ledger.snapshot();
        assert_eq!(find_first(&snapshot, "https://ex.com/x").unwrap().method, "POST");
        assert!(find_first(&snapshot, "https://ex.com/y").is_none());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut ledger = RequestLedger::new(0);
        ledger.record_request(get("https://ex.com/1"));
        ledger.record_request(get("https://ex.com/2"));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.iter().next().unwrap().url, "https://ex.com/2");
    }

    #[test]
    fn from_snapshot_keeps_newest_within_capacity() {
        let records: Vec<_> = (0..5).map(|i| get(&format!("https://ex.com/{i}"))).collect();
        let ledger = RequestLedger::from_snapshot(records, 3);
        let urls: Vec<_> = ledger.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://ex.com/2", "https://ex.com/3", "https://ex.com/4"]);
    }
}
