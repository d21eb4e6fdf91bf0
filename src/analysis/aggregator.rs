use crate::model::Event;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Key used when an event has no value for the field being grouped.
pub const UNKNOWN: &str = "Unknown";

/// Default bucket width for timeline and trend series.
pub const DEFAULT_BUCKET_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub time: DateTime<Utc>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub key: String,
    pub count: usize,
}

/// HTTP status family, derived from the hundreds digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusCategory {
    #[serde(rename = "2xx")]
    Success,
    #[serde(rename = "3xx")]
    Redirect,
    #[serde(rename = "4xx")]
    ClientError,
    #[serde(rename = "5xx")]
    ServerError,
    Other,
}

impl StatusCategory {
    pub fn of(code: u16) -> Self {
        match code / 100 {
            2 => StatusCategory::Success,
            3 => StatusCategory::Redirect,
            4 => StatusCategory::ClientError,
            5 => StatusCategory::ServerError,
            _ => StatusCategory::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusCategory::Success => "2xx",
            StatusCategory::Redirect => "3xx",
            StatusCategory::ClientError => "4xx",
            StatusCategory::ServerError => "5xx",
            StatusCategory::Other => "Other",
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusGroup {
    pub status: u16,
    pub count: usize,
    pub category: StatusCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodShare {
    pub method: String,
    pub count: usize,
    pub percentage: f64,
}

/// Event field a top-N ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    SourceIp,
    DestinationIp,
    Username,
    Url,
    UserAgent,
    Method,
}

impl RankKey {
    fn value(self, event: &Event) -> Option<&str> {
        match self {
            RankKey::SourceIp => event.src_ip.as_deref(),
            RankKey::DestinationIp => event.dest_ip.as_deref(),
            RankKey::Username => event.username.as_deref(),
            RankKey::Url => event.url.as_deref(),
            RankKey::UserAgent => event.user_agent.as_deref(),
            RankKey::Method => event.method.as_deref(),
        }
    }
}

/// Floor `time` to the start of its `interval_minutes` bucket.
///
/// A zero interval is treated as one minute.
pub fn bucket_start(time: DateTime<Utc>, interval_minutes: u32) -> DateTime<Utc> {
    let width_ms = i64::from(interval_minutes.max(1)) * 60_000;
    let floored = time.timestamp_millis().div_euclid(width_ms) * width_ms;
    // Flooring an in-range instant downward by less than a day stays in range.
    Utc.timestamp_millis_opt(floored).single().unwrap_or(time)
}

/// Count events per time bucket, ascending by bucket start.
///
/// Events without a timestamp are skipped and empty buckets are not emitted.
pub fn bucket_by_time(events: &[Event], interval_minutes: u32) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    for ts in events.iter().filter_map(|e| e.timestamp) {
        *buckets.entry(bucket_start(ts, interval_minutes)).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .map(|(time, count)| TimeBucket { time, count })
        .collect()
}

/// Count occurrences of `key` values in first-seen order.
fn tally<'a, I>(keys: I) -> Vec<Ranked>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<Ranked> = Vec::new();
    for key in keys {
        match index.get(key) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(key, counts.len());
                counts.push(Ranked {
                    key: key.to_string(),
                    count: 1,
                });
            }
        }
    }
    counts
}

/// The `limit` most frequent values of `key`, most frequent first.
///
/// Missing values are ranked together under [`UNKNOWN`]. Ties keep the order
/// in which the keys were first seen.
pub fn top_n(events: &[Event], key: RankKey, limit: usize) -> Vec<Ranked> {
    let mut ranked = tally(events.iter().map(|e| key.value(e).unwrap_or(UNKNOWN)));
    // sort_by is stable
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

pub fn top_ips(events: &[Event], limit: usize) -> Vec<Ranked> {
    top_n(events, RankKey::SourceIp, limit)
}

/// Group events by exact status code, ascending by code.
pub fn group_by_status(events: &[Event]) -> Vec<StatusGroup> {
    let mut groups: BTreeMap<u16, usize> = BTreeMap::new();
    for status in events.iter().filter_map(|e| e.status) {
        *groups.entry(status).or_insert(0) += 1;
    }
    groups
        .into_iter()
        .map(|(status, count)| StatusGroup {
            status,
            count,
            category: StatusCategory::of(status),
        })
        .collect()
}

/// Share of each HTTP method in `events`, most common first.
pub fn method_distribution(events: &[Event]) -> Vec<MethodShare> {
    let total = events.len();
    let mut shares: Vec<MethodShare> = tally(
        events
            .iter()
            .map(|e| RankKey::Method.value(e).unwrap_or(UNKNOWN)),
    )
    .into_iter()
    .map(|r| MethodShare {
        percentage: percentage(r.count, total),
        method: r.key,
        count: r.count,
    })
    .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str) -> Event {
        Event {
            timestamp: crate::model::parse_timestamp(ts),
            ..Default::default()
        }
    }

    fn with_ip(ts: &str, ip: &str) -> Event {
        Event {
            src_ip: Some(ip.to_string()),
            ..at(ts)
        }
    }

    #[test]
    fn test_bucket_by_time_hourly() {
        let events = vec![
            with_ip("2024-01-01T00:10:00Z", "1.1.1.1"),
            with_ip("2024-01-01T00:50:00Z", "1.1.1.1"),
            with_ip("2024-01-01T01:05:00Z", "2.2.2.2"),
        ];
        let buckets = bucket_by_time(&events, 60);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].time.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].time.to_rfc3339(), "2024-01-01T01:00:00+00:00");
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn test_bucket_skips_missing_timestamps_and_sorts() {
        let events = vec![
            at("2024-01-01T03:00:00Z"),
            Event::default(),
            at("2024-01-01T01:59:59Z"),
            at("2024-01-01T01:15:00Z"),
        ];
        let buckets = bucket_by_time(&events, 15);
        let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1]);
        assert!(buckets.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_bucket_start_before_epoch_floors_down() {
        let ts = crate::model::parse_timestamp("1969-12-31T23:30:00Z").unwrap();
        assert_eq!(
            bucket_start(ts, 60).to_rfc3339(),
            "1969-12-31T23:00:00+00:00"
        );
    }

    #[test]
    fn test_zero_interval_is_one_minute() {
        let ts = crate::model::parse_timestamp("2024-01-01T00:10:42Z").unwrap();
        assert_eq!(bucket_start(ts, 0).to_rfc3339(), "2024-01-01T00:10:00+00:00");
    }

    #[test]
    fn test_top_ips_stable_ties_and_unknown() {
        let events = vec![
            with_ip("2024-01-01T00:00:00Z", "3.3.3.3"),
            Event::default(),
            with_ip("2024-01-01T00:00:00Z", "1.1.1.1"),
            with_ip("2024-01-01T00:00:00Z", "1.1.1.1"),
            Event::default(),
            with_ip("2024-01-01T00:00:00Z", "3.3.3.3"),
            with_ip("2024-01-01T00:00:00Z", "9.9.9.9"),
        ];
        let top = top_ips(&events, 10);
        let keys: Vec<&str> = top.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["3.3.3.3", UNKNOWN, "1.1.1.1", "9.9.9.9"]);
        assert_eq!(top_ips(&events, 1), vec![Ranked { key: "3.3.3.3".into(), count: 2 }]);
        assert!(top_ips(&events, 0).is_empty());
    }

    #[test]
    fn test_top_n_by_username() {
        let events = vec![
            Event { username: Some("alice".into()), ..Default::default() },
            Event { username: Some("bob".into()), ..Default::default() },
            Event { username: Some("bob".into()), ..Default::default() },
        ];
        let top = top_n(&events, RankKey::Username, 5);
        assert_eq!(top[0], Ranked { key: "bob".into(), count: 2 });
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_group_by_status() {
        let events: Vec<Event> = [200, 200, 404, 500]
            .into_iter()
            .map(|s| Event { status: Some(s), ..Default::default() })
            .chain(std::iter::once(Event::default()))
            .collect();
        let groups = group_by_status(&events);
        assert_eq!(
            groups,
            vec![
                StatusGroup { status: 200, count: 2, category: StatusCategory::Success },
                StatusGroup { status: 404, count: 1, category: StatusCategory::ClientError },
                StatusGroup { status: 500, count: 1, category: StatusCategory::ServerError },
            ]
        );
        assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_status_category_labels() {
        assert_eq!(StatusCategory::of(301).label(), "3xx");
        assert_eq!(StatusCategory::of(101).label(), "Other");
        assert_eq!(StatusCategory::of(600).label(), "Other");
        assert_eq!(StatusCategory::of(599).to_string(), "5xx");
    }

    #[test]
    fn test_method_distribution() {
        let methods = [Some("GET"), Some("POST"), Some("GET"), None];
        let events: Vec<Event> = methods
            .iter()
            .map(|m| Event { method: m.map(String::from), ..Default::default() })
            .collect();
        let shares = method_distribution(&events);
        assert_eq!(shares[0].method, "GET");
        assert_eq!(shares[0].percentage, 50.0);
        assert_eq!(shares[1].method, "POST");
        assert_eq!(shares[2].method, UNKNOWN);
        let sum: f64 = shares.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(bucket_by_time(&[], 60).is_empty());
        assert!(top_ips(&[], 10).is_empty());
        assert!(group_by_status(&[]).is_empty());
        assert!(method_distribution(&[]).is_empty());
    }
}
