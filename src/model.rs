//! Wire types for the upstream log-analysis API.
//!
//! Optional fields are normalised here, once, so the aggregation code can
//! rely on `Option` alone: empty strings become `None`, timestamps accept
//! naive ISO-8601 (read as UTC), and anomaly scores accept numbers or
//! numeric strings.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One ingested log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "non_empty")]
    pub src_ip: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub dest_ip: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default, deserialize_with = "non_empty")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub raw_line: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub upload_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub anomalies: Vec<Anomaly>,
}

/// A detector's flag on a specific event.
///
/// `event_id` is a lookup-only back reference; anomalies nested inside an
/// event payload omit it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: i64,
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default, deserialize_with = "non_empty")]
    pub detector: Option<String>,
    /// Severity in `[0, 1]`. `None` when upstream sent nothing parsable.
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "non_empty")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `GET /events` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// `GET /anomalies` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomaliesPage {
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// The authenticated operator, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: uuid::Uuid,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// `analyst`, `admin` or `viewer`; upstream defaults it when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub prompt: String,
}

/// `POST /query` response: generated SQL, result rows, and a prose summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub sql: String,
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub upload_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub upload_id: String,
    pub status: String,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_timestamp))
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite()))
}

/// Parse an upstream timestamp. Offsets are honoured; naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_normalises_optional_fields() {
        let json = r#"{
            "id": 7,
            "timestamp": "2024-01-01T00:10:00",
            "src_ip": "",
            "method": "GET",
            "status": 404,
            "anomalies": null
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(
            event.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap())
        );
        assert_eq!(event.src_ip, None);
        assert_eq!(event.method.as_deref(), Some("GET"));
        assert_eq!(event.status, Some(404));
        assert!(event.anomalies.is_empty());
        assert_eq!(event.dest_ip, None);
    }

    #[test]
    fn test_unparsable_timestamp_is_missing() {
        let event: Event = serde_json::from_str(r#"{"id": 1, "timestamp": "yesterday"}"#).unwrap();
        assert_eq!(event.timestamp, None);
    }

    #[test]
    fn test_timestamp_with_offset() {
        let ts = parse_timestamp("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_anomaly_score_variants() {
        let page: AnomaliesPage = serde_json::from_str(
            r#"{"anomalies": [
                {"id": 1, "event_id": 9, "score": 0.75, "reason": "rare ua"},
                {"id": 2, "event_id": 9, "score": "0.5"},
                {"id": 3, "event_id": 9, "score": "high"},
                {"id": 4, "event_id": 9, "score": null}
            ], "page": 1}"#,
        )
        .unwrap();
        let scores: Vec<_> = page.anomalies.iter().map(|a| a.score).collect();
        assert_eq!(scores, vec![Some(0.75), Some(0.5), None, None]);
        assert_eq!(page.page, Some(1));
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_query_result_rows() {
        let result: QueryResult = serde_json::from_str(
            r#"{"prompt": "top ips", "sql": "SELECT src_ip FROM events", "rows": [{"src_ip": "1.1.1.1"}], "response": "One IP."}"#,
        )
        .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["src_ip"], "1.1.1.1");
        assert_eq!(result.response.as_deref(), Some("One IP."));
    }
}
