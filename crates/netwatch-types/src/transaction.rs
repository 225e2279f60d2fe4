//! Transactions reconstructed by the protocol layer.
//!
//! A [`Transaction`] is one application-layer request/response pair observed
//! on the wire. The protocol-specific part is a tagged union,
//! [`ProtocolPayload`], so each variant carries its own typed payload and its
//! own status rule.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status reported for protocols (or outcomes) that carry no error text.
pub const STATUS_OK: &str = "OK";

/// One side of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
    /// Name of the local process bound to the socket, when known.
    #[serde(default)]
    pub proc: String,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            proc: String::new(),
        }
    }

    pub fn with_proc(mut self, proc: impl Into<String>) -> Self {
        self.proc = proc.into();
        self
    }
}

/// Application protocol of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Sql,
    KeyValue,
}

impl Protocol {
    /// Wire name, used as the event `type` and as the store category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Sql => "mysql",
            Protocol::KeyValue => "redis",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response line of an HTTP transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Status code; 0 when the protocol layer did not report one.
    #[serde(default)]
    pub code: u16,
    /// Reason phrase (e.g. "OK", "Not Found"). Always present for HTTP.
    pub phrase: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpPayload {
    pub response: HttpResponse,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlPayload {
    /// Server error text; empty when the statement succeeded.
    #[serde(default)]
    pub error_message: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValuePayload {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Protocol-specific part of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "protocol", content = "fields", rename_all = "snake_case")]
pub enum ProtocolPayload {
    Http(HttpPayload),
    Sql(SqlPayload),
    KeyValue(KeyValuePayload),
}

impl ProtocolPayload {
    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolPayload::Http(_) => Protocol::Http,
            ProtocolPayload::Sql(_) => Protocol::Sql,
            ProtocolPayload::KeyValue(_) => Protocol::KeyValue,
        }
    }

    /// Status string recorded on the event.
    ///
    /// - HTTP: the response reason phrase.
    /// - SQL: the server error message, or `"OK"` when empty.
    /// - Key-value: always `"OK"`.
    pub fn status(&self) -> String {
        match self {
            ProtocolPayload::Http(http) => http.response.phrase.clone(),
            ProtocolPayload::Sql(sql) if sql.error_message.is_empty() => STATUS_OK.to_string(),
            ProtocolPayload::Sql(sql) => sql.error_message.clone(),
            ProtocolPayload::KeyValue(_) => STATUS_OK.to_string(),
        }
    }
}

/// A completed request/response pair delivered by the protocol layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub src: Endpoint,
    pub dst: Endpoint,
    /// Response time in milliseconds.
    pub response_time: i32,
    #[serde(default)]
    pub request_raw: String,
    #[serde(default)]
    pub response_raw: String,
    pub payload: ProtocolPayload,
}

impl Transaction {
    pub fn protocol(&self) -> Protocol {
        self.payload.protocol()
    }
}
