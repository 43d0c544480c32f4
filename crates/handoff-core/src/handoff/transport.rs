//! Blocking POST transport to the agent endpoint (curl).

use std::time::Duration;

use super::error::HandoffError;
use crate::config::HandoffConfig;

/// Sends one framed descriptor and returns the acknowledgment body.
///
/// Implementations block; the client runs them on the blocking pool.
pub trait Transport: Send + Sync + 'static {
    fn post(&self, body: &[u8]) -> Result<String, HandoffError>;
}

/// libcurl transport with connect and total timeouts.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    url: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl CurlTransport {
    pub fn new(url: impl Into<String>, connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            timeout,
        }
    }

    pub fn from_config(cfg: &HandoffConfig) -> Self {
        Self::new(cfg.endpoint_url(), cfg.connect_timeout(), cfg.handoff_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for CurlTransport {
    fn post(&self, body: &[u8]) -> Result<String, HandoffError> {
        let mut response = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&self.url)?;
        easy.post(true)?;
        easy.post_fields_copy(body)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;

        let mut list = curl::easy::List::new();
        list.append("Content-Type: text/plain;charset=UTF-8")?;
        list.append("Cache-Control: no-cache")?;
        // Send the body immediately instead of waiting for 100-continue.
        list.append("Expect:")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(HandoffError::Http(code));
        }
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}
