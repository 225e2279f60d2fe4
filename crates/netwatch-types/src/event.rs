//! Canonical event records written to the event store.
//!
//! An [`Event`] is the flattened, protocol-agnostic form of a
//! [`Transaction`] plus topology and geo enrichment. Exactly one of the three
//! payload fields is populated; the other two serialize as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transaction::{
    HttpPayload, KeyValuePayload, ProtocolPayload, SqlPayload, Transaction,
};

/// Default prefix of the daily event partitions.
pub const DEFAULT_INDEX_PREFIX: &str = "packetbeat";

/// Enrichment computed by the publisher for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Agent owning the source address, empty when unknown.
    pub src_server: String,
    /// Agent owning the destination address, empty when unknown.
    pub dst_server: String,
    /// Country code of an external source address, empty when not looked up.
    pub src_country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub src_ip: String,
    pub src_port: u16,
    pub src_proc: String,
    pub src_country: String,
    pub src_server: String,
    pub dst_ip: String,
    pub dst_port: u16,
    pub dst_proc: String,
    pub dst_server: String,
    #[serde(rename = "responsetime")]
    pub response_time: i32,
    pub status: String,
    pub request_raw: String,
    pub response_raw: String,
    pub mysql_payload: Option<SqlPayload>,
    pub http_payload: Option<HttpPayload>,
    pub redis_payload: Option<KeyValuePayload>,
}

impl Event {
    /// Build the canonical event for `tx`.
    pub fn from_transaction(tx: &Transaction, enrichment: Enrichment) -> Self {
        let (mysql_payload, http_payload, redis_payload) = match &tx.payload {
            ProtocolPayload::Sql(p) => (Some(p.clone()), None, None),
            ProtocolPayload::Http(p) => (None, Some(p.clone()), None),
            ProtocolPayload::KeyValue(p) => (None, None, Some(p.clone())),
        };

        Self {
            timestamp: tx.timestamp,
            event_type: tx.protocol().as_str().to_string(),
            src_ip: tx.src.ip.clone(),
            src_port: tx.src.port,
            src_proc: tx.src.proc.clone(),
            src_country: enrichment.src_country,
            src_server: enrichment.src_server,
            dst_ip: tx.dst.ip.clone(),
            dst_port: tx.dst.port,
            dst_proc: tx.dst.proc.clone(),
            dst_server: enrichment.dst_server,
            response_time: tx.response_time,
            status: tx.payload.status(),
            request_raw: tx.request_raw.clone(),
            response_raw: tx.response_raw.clone(),
            mysql_payload,
            http_payload,
            redis_payload,
        }
    }
}

/// Name of the daily partition holding events observed at `timestamp`:
/// `<prefix>-YYYY.MM.DD`, using the UTC calendar date.
pub fn partition_name(prefix: &str, timestamp: &DateTime<Utc>) -> String {
    format!("{prefix}-{}", timestamp.format("%Y.%m.%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Endpoint, HttpResponse};
    use chrono::TimeZone;

    fn http_transaction() -> Transaction {
        Transaction {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 7, 8, 30, 0).unwrap(),
            src: Endpoint::new("203.0.113.7", 40122),
            dst: Endpoint::new("10.0.0.5", 80).with_proc("nginx"),
            response_time: 12,
            request_raw: "GET / HTTP/1.1".to_string(),
            response_raw: "HTTP/1.1 200 OK".to_string(),
            payload: ProtocolPayload::Http(HttpPayload {
                response: HttpResponse {
                    code: 200,
                    phrase: "OK".to_string(),
                    extra: serde_json::Map::new(),
                },
                extra: serde_json::Map::new(),
            }),
        }
    }

    #[test]
    fn test_partition_name_uses_zero_padded_utc_date() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        assert_eq!(partition_name("packetbeat", &ts), "packetbeat-2024.03.05");
    }

    #[test]
    fn test_partition_name_from_offset_timestamp_uses_utc_day() {
        let local = chrono::DateTime::parse_from_rfc3339("2024-03-06T01:00:00+02:00").unwrap();
        let ts = local.with_timezone(&Utc);
        assert_eq!(partition_name("packetbeat", &ts), "packetbeat-2024.03.05");
    }

    #[test]
    fn test_event_from_http_transaction_sets_only_http_payload() {
        let tx = http_transaction();
        let event = Event::from_transaction(
            &tx,
            Enrichment {
                src_server: String::new(),
                dst_server: "web1".to_string(),
                src_country: "DE".to_string(),
            },
        );

        assert_eq!(event.event_type, "http");
        assert_eq!(event.status, "OK");
        assert_eq!(event.dst_server, "web1");
        assert_eq!(event.src_country, "DE");
        assert_eq!(event.dst_proc, "nginx");
        assert!(event.http_payload.is_some());
        assert!(event.mysql_payload.is_none());
        assert!(event.redis_payload.is_none());
    }

    #[test]
    fn test_event_document_has_all_fields() {
        let event = Event::from_transaction(&http_transaction(), Enrichment::default());
        let doc = serde_json::to_value(&event).unwrap();
        let obj = doc.as_object().unwrap();

        for field in [
            "timestamp",
            "type",
            "src_ip",
            "src_port",
            "src_proc",
            "src_country",
            "src_server",
            "dst_ip",
            "dst_port",
            "dst_proc",
            "dst_server",
            "responsetime",
            "status",
            "request_raw",
            "response_raw",
            "mysql_payload",
            "http_payload",
            "redis_payload",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        assert!(obj["mysql_payload"].is_null());
        assert!(obj["redis_payload"].is_null());
        assert_eq!(obj["http_payload"]["response"]["phrase"], "OK");
    }
}
