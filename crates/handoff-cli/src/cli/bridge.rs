//! Host bridge plumbing: event lines in, cancellation lines out.

use anyhow::{Context, Result};
use handoff_core::events::{DownloadId, HostEvent};
use handoff_core::handoff::DownloadSink;
use std::io::Write;

/// Parse one stdin line. Blank lines yield `None`.
pub fn parse_event_line(line: &str) -> Result<Option<HostEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let event = serde_json::from_str(line).context("malformed host event")?;
    Ok(Some(event))
}

/// JSON line asking the host to cancel its native download.
pub fn cancel_line(id: DownloadId) -> String {
    serde_json::json!({ "action": "cancel", "downloadId": id }).to_string()
}

/// Writes cancellation requests to stdout for the host to apply.
pub struct StdoutSink;

impl DownloadSink for StdoutSink {
    fn cancel(&self, id: DownloadId) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", cancel_line(id)).context("write cancel request")?;
        out.flush().context("flush cancel request")?;
        Ok(())
    }
}
