//! Transfer descriptor: what the external agent needs to fetch a download
//! itself, and its wire framing (JSON followed by an end marker).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Literal appended after the JSON document on the wire.
pub const END_MARKER: &str = "\n<END>\n";

/// Header key always present in a descriptor.
pub const REFERER: &str = "referer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDescriptor {
    pub url: String,
    /// Size in bytes, 0 when unknown.
    pub size: u64,
    /// Basename only.
    pub file_name: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Empty, or URL-encoded form data for POST.
    #[serde(default)]
    pub body: String,
    /// False when the resource supports byte ranges with a known length.
    #[serde(default = "default_sequential")]
    pub sequential: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_sequential() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame has no end marker")]
    MissingMarker,
    #[error("frame is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid descriptor JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransferDescriptor {
    /// JSON document followed by [`END_MARKER`].
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        let mut frame = serde_json::to_string(self)?;
        frame.push_str(END_MARKER);
        Ok(frame)
    }

    pub fn referer(&self) -> Option<&str> {
        self.headers.get(REFERER).map(String::as_str)
    }
}

/// True once `buf` holds a complete frame.
pub fn has_end_marker(buf: &[u8]) -> bool {
    find_marker(buf).is_some()
}

/// Parse one frame; anything after the marker is ignored.
pub fn parse_frame(buf: &[u8]) -> Result<TransferDescriptor, FrameError> {
    let end = find_marker(buf).ok_or(FrameError::MissingMarker)?;
    let text = std::str::from_utf8(&buf[..end])?;
    Ok(serde_json::from_str(text.trim())?)
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    let marker = END_MARKER.as_bytes();
    buf.windows(marker.len()).position(|w| w == marker)
}
