//! Download correlation: match a download to the request that produced it
//! (by URL) and assemble the transfer descriptor.
//!
//! A miss is not an error: the download is still handed off with a
//! best-effort descriptor (GET, no body, referrer only).

use std::collections::BTreeMap;

use crate::descriptor::{TransferDescriptor, REFERER};
use crate::events::DownloadItem;
use crate::ledger::{find_first, RequestRecord};
use crate::store::{load_ledger, DurableStore};

/// Filename used when neither the download nor its URL yields one.
const DEFAULT_FILENAME: &str = "download.bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// Blob-sourced download: no lookup, no hand-off.
    Skipped,
    /// A ledger record matched the download URL.
    Matched(TransferDescriptor),
    /// No ledger record matched; best-effort descriptor.
    Missed(TransferDescriptor),
}

impl Correlation {
    pub fn descriptor(&self) -> Option<&TransferDescriptor> {
        match self {
            Correlation::Skipped => None,
            Correlation::Matched(d) | Correlation::Missed(d) => Some(d),
        }
    }

    pub fn into_descriptor(self) -> Option<TransferDescriptor> {
        match self {
            Correlation::Skipped => None,
            Correlation::Matched(d) | Correlation::Missed(d) => Some(d),
        }
    }
}

/// Client-generated content (`blob:` URLs) is not a web request.
pub fn is_blob_source(url: &str) -> bool {
    url.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("blob:"))
}

/// Last path component of the host's target filename (either separator).
pub fn basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Filename for the descriptor: basename of the host's filename, else the
/// last URL path segment, else `download.bin`.
pub fn descriptor_file_name(item: &DownloadItem) -> String {
    let name = basename(&item.filename);
    if !name.is_empty() {
        return name.to_string();
    }
    filename_from_url_path(item.resolved_url()).unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Descriptor used when nothing is known about the request.
pub fn default_descriptor(item: &DownloadItem) -> TransferDescriptor {
    let mut headers = BTreeMap::new();
    headers.insert(
        REFERER.to_string(),
        item.referrer.clone().unwrap_or_default(),
    );
    TransferDescriptor {
        url: item.resolved_url().to_string(),
        size: u64::try_from(item.file_size).unwrap_or(0),
        file_name: descriptor_file_name(item),
        method: "GET".to_string(),
        headers,
        body: String::new(),
        sequential: true,
    }
}

/// Fold a matched record into the default descriptor.
fn apply_record(descriptor: &mut TransferDescriptor, record: &RequestRecord) {
    descriptor.sequential = record.sequential;
    if record.is_post() {
        descriptor.method = "POST".to_string();
        descriptor.body = record
            .body
            .as_ref()
            .map(|b| b.to_urlencoded())
            .unwrap_or_default();
    }
    for header in record.request_headers.iter().flatten() {
        let Some(value) = &header.value else {
            continue;
        };
        if header.name.eq_ignore_ascii_case(REFERER) {
            descriptor.headers.insert(REFERER.to_string(), value.clone());
        } else {
            descriptor.headers.insert(header.name.clone(), value.clone());
        }
    }
}

/// Correlate against an already-loaded ledger snapshot.
pub fn correlate(item: &DownloadItem, snapshot: &[RequestRecord]) -> Correlation {
    let url = item.resolved_url();
    if is_blob_source(url) {
        return Correlation::Skipped;
    }
    let mut descriptor = default_descriptor(item);
    match find_first(snapshot, url) {
        Some(record) => {
            apply_record(&mut descriptor, record);
            Correlation::Matched(descriptor)
        }
        None => Correlation::Missed(descriptor),
    }
}

/// Correlate against the durable snapshot. Blob sources return before the
/// store is touched; an unreadable snapshot degrades to a miss.
pub async fn correlate_from_store<S: DurableStore>(store: &S, item: &DownloadItem) -> Correlation {
    if is_blob_source(item.resolved_url()) {
        tracing::debug!(download_id = item.id, url = %item.resolved_url(), "blob source, skipping");
        return Correlation::Skipped;
    }
    let snapshot = match load_ledger(store).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(download_id = item.id, "ledger snapshot unreadable: {:#}", e);
            Vec::new()
        }
    };
    correlate(item, &snapshot)
}
