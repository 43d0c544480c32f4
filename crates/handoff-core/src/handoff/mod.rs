//! Hand-off client: deliver a descriptor to the external agent and, only on
//! a positive acknowledgment, cancel the browser's native download.
//!
//! Per download: `Named -> Correlated -> Delivered -> {Cancelled | LeftToBrowser}`.
//! There is one delivery attempt and no retry. Any failure leaves the native
//! download running (fail-open), so a download is never silently lost.

mod error;
mod transport;

pub use error::HandoffError;
pub use transport::{CurlTransport, Transport};

use std::sync::Arc;

use crate::descriptor::TransferDescriptor;
use crate::events::DownloadId;

/// Cancellation side of the host's download manager.
pub trait DownloadSink: Send + Sync + 'static {
    fn cancel(&self, id: DownloadId) -> anyhow::Result<()>;
}

/// Lifecycle of one download through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Named,
    Correlated,
    Delivered,
    /// Agent acknowledged and the native download was cancelled.
    Cancelled,
    /// Delivery (or cancellation) failed; the browser keeps the download.
    LeftToBrowser,
    /// Blob source; never handed off.
    Skipped,
}

impl DownloadState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadState::Cancelled | DownloadState::LeftToBrowser | DownloadState::Skipped
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DownloadState::Named => "named",
            DownloadState::Correlated => "correlated",
            DownloadState::Delivered => "delivered",
            DownloadState::Cancelled => "cancelled",
            DownloadState::LeftToBrowser => "left_to_browser",
            DownloadState::Skipped => "skipped",
        }
    }
}

/// Final result of one hand-off attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReport {
    pub download_id: DownloadId,
    pub url: String,
    pub state: DownloadState,
    /// Why the download was left to the browser, if it was.
    pub failure: Option<String>,
}

pub struct HandoffClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for HandoffClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> HandoffClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Frame and POST the descriptor; returns the acknowledgment body.
    pub async fn deliver(&self, descriptor: &TransferDescriptor) -> Result<String, HandoffError> {
        let frame = descriptor.to_frame()?;
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || transport.post(frame.as_bytes())).await?
    }

    /// Deliver, then act on the acknowledgment.
    pub async fn hand_off<K: DownloadSink + ?Sized>(
        &self,
        descriptor: &TransferDescriptor,
        download_id: DownloadId,
        sink: &K,
    ) -> HandoffReport {
        let url = descriptor.url.clone();
        let ack = match self.deliver(descriptor).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(download_id, url = %url, "hand-off failed, leaving download to browser: {}", e);
                return HandoffReport {
                    download_id,
                    url,
                    state: DownloadState::LeftToBrowser,
                    failure: Some(e.to_string()),
                };
            }
        };
        tracing::debug!(
            download_id,
            state = DownloadState::Delivered.as_str(),
            ack = %ack.trim(),
            "agent acknowledged hand-off"
        );

        match sink.cancel(download_id) {
            Ok(()) => {
                tracing::info!(download_id, url = %url, "download handed off, native transfer cancelled");
                HandoffReport {
                    download_id,
                    url,
                    state: DownloadState::Cancelled,
                    failure: None,
                }
            }
            Err(e) => {
                tracing::warn!(download_id, "cancel after acknowledgment failed: {:#}", e);
                HandoffReport {
                    download_id,
                    url,
                    state: DownloadState::LeftToBrowser,
                    failure: Some(format!("cancel failed: {:#}", e)),
                }
            }
        }
    }
}
