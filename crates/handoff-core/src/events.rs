//! Typed host events: the three request lifecycle phases and the two
//! download lifecycle events, as delivered by the host bridge.
//!
//! One JSON object per event, tagged by `"event"`; payload fields keep the
//! browser's camelCase names.

use serde::{Deserialize, Serialize};

use crate::ledger::{HttpHeader, RequestBody};

/// Host-assigned download identifier.
pub type DownloadId = i64;

/// Kind of resource a request loads. Only frame navigations are recorded by
/// default; generic async requests are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    MainFrame,
    SubFrame,
    Xmlhttprequest,
    #[serde(other)]
    Other,
}

impl ResourceType {
    pub fn is_captured(self, capture_async_requests: bool) -> bool {
        match self {
            ResourceType::MainFrame | ResourceType::SubFrame => true,
            ResourceType::Xmlhttprequest => capture_async_requests,
            ResourceType::Other => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInitiated {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    /// Accepted but not recorded: headers are captured at the headers-sent phase.
    #[serde(default)]
    pub request_headers: Option<Vec<HttpHeader>>,
    #[serde(default)]
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadersSent {
    pub url: String,
    #[serde(default)]
    pub request_headers: Vec<HttpHeader>,
    #[serde(default)]
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStarted {
    pub url: String,
    #[serde(default)]
    pub response_headers: Vec<HttpHeader>,
    #[serde(default)]
    pub resource_type: ResourceType,
}

/// The host's download item at naming (or creation) time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    pub id: DownloadId,
    pub url: String,
    #[serde(default)]
    pub final_url: Option<String>,
    /// Size in bytes; zero or negative when unknown.
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub referrer: Option<String>,
}

impl DownloadItem {
    /// `finalUrl` when the host supplied a non-empty one, else the original URL.
    pub fn resolved_url(&self) -> &str {
        self.final_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    RequestInitiated(RequestInitiated),
    HeadersSent(HeadersSent),
    ResponseStarted(ResponseStarted),
    DownloadNamed(DownloadItem),
    DownloadCreated(DownloadItem),
}

/// Which download lifecycle event drives correlation. Chosen once at startup:
/// the naming event when the host supports it, else the creation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadTrigger {
    #[default]
    Named,
    Created,
}

impl DownloadTrigger {
    pub fn probe(supports_naming_event: bool) -> Self {
        if supports_naming_event {
            DownloadTrigger::Named
        } else {
            DownloadTrigger::Created
        }
    }

    /// The download item carried by `event` if it is this trigger's event.
    pub fn select(self, event: &HostEvent) -> Option<&DownloadItem> {
        match (self, event) {
            (DownloadTrigger::Named, HostEvent::DownloadNamed(item))
            | (DownloadTrigger::Created, HostEvent::DownloadCreated(item)) => Some(item),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_request_initiated_with_form_body() {
        let line = r#"{"event":"request_initiated","url":"https://ex.com/dl","method":"POST",
            "requestBody":{"formData":{"id":["42"]}},"resourceType":"sub_frame"}"#;
        match serde_json::from_str::<HostEvent>(line).unwrap() {
            HostEvent::RequestInitiated(ev) => {
                assert_eq!(ev.method, "POST");
                assert_eq!(ev.resource_type, ResourceType::SubFrame);
                assert_eq!(ev.request_body.unwrap().to_urlencoded(), "id=42");
            }
            other => panic!("expected RequestInitiated, got {other:?}"),
        }
    }

    #[test]
    fn parse_download_named_defaults() {
        let line = r#"{"event":"download_named","id":7,"url":"https://ex.com/f.bin"}"#;
        match serde_json::from_str::<HostEvent>(line).unwrap() {
            HostEvent::DownloadNamed(item) => {
                assert_eq!(item.id, 7);
                assert_eq!(item.file_size, 0);
                assert!(item.filename.is_empty());
                assert!(item.referrer.is_none());
                assert_eq!(item.resolved_url(), "https://ex.com/f.bin");
            }
            other => panic!("expected DownloadNamed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_resource_type_is_not_captured() {
        let line = r#"{"event":"headers_sent","url":"u","resourceType":"image"}"#;
        let ev: HostEvent = serde_json::from_str(line).unwrap();
        let HostEvent::HeadersSent(ev) = ev else {
            panic!("expected HeadersSent");
        };
        assert_eq!(ev.resource_type, ResourceType::Other);
        assert!(!ev.resource_type.is_captured(true));
        assert!(ResourceType::Xmlhttprequest.is_captured(true));
        assert!(!ResourceType::Xmlhttprequest.is_captured(false));
        assert!(ResourceType::MainFrame.is_captured(false));
    }

    #[test]
    fn resolved_url_prefers_non_empty_final_url() {
        let mut item = DownloadItem {
            id: 1,
            url: "https://ex.com/start".to_string(),
            final_url: Some("https://cdn.ex.com/f.bin".to_string()),
            file_size: -1,
            filename: String::new(),
            referrer: None,
        };
        assert_eq!(item.resolved_url(), "https://cdn.ex.com/f.bin");
        item.final_url = Some(String::new());
        assert_eq!(item.resolved_url(), "https://ex.com/start");
    }

    #[test]
    fn trigger_selects_only_its_event() {
        let item = DownloadItem {
            id: 3,
            url: "https://ex.com/a".to_string(),
            final_url: None,
            file_size: 0,
            filename: String::new(),
            referrer: None,
        };
        let named = HostEvent::DownloadNamed(item.clone());
        let created = HostEvent::DownloadCreated(item);
        assert_eq!(DownloadTrigger::probe(true), DownloadTrigger::Named);
        assert_eq!(DownloadTrigger::probe(false), DownloadTrigger::Created);
        assert!(DownloadTrigger::Named.select(&named).is_some());
        assert!(DownloadTrigger::Named.select(&created).is_none());
        assert!(DownloadTrigger::Created.select(&created).is_some());
        assert!(DownloadTrigger::Created.select(&named).is_none());
    }
}
