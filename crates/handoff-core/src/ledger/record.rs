//! Request records as captured from the browser's request lifecycle events.
//!
//! Field names follow the browser's webRequest shape (`requestHeaders`,
//! `formData`, ...) so the persisted snapshot reads like the host's own data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One header as delivered by the host. `value` is absent when the host only
/// has a binary value for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_value: Option<Vec<u8>>,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            binary_value: None,
        }
    }
}

/// Raw upload element of a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Captured request body: parsed form fields, raw upload chunks, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<UploadData>>,
}

impl RequestBody {
    /// `application/x-www-form-urlencoded` serialization of the form fields.
    /// Every value of a multi-valued field becomes its own pair. Raw bodies
    /// have no form representation and serialize as an empty string.
    pub fn to_urlencoded(&self) -> String {
        let Some(form) = &self.form_data else {
            return String::new();
        };
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, values) in form {
            for value in values {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }
}

/// One observed outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<Vec<HttpHeader>>,
    /// True until a response advertises byte ranges with a known length.
    #[serde(default = "default_sequential")]
    pub sequential: bool,
}

fn default_sequential() -> bool {
    true
}

impl RequestRecord {
    /// Fresh record for a request that just started: no headers yet, sequential.
    pub fn initiated(url: impl Into<String>, method: impl Into<String>, body: Option<RequestBody>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            body,
            request_headers: None,
            sequential: true,
        }
    }

    pub fn is_post(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST")
    }
}

/// Case-insensitive lookup of a header's textual value.
pub fn header_value<'a>(headers: &'a [HttpHeader], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .and_then(|h| h.value.as_deref())
}
