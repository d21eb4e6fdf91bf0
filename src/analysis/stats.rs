use crate::model::Event;
use serde::Serialize;
use std::collections::HashSet;

/// Headline numbers shown on the dashboard's stat cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_events: usize,
    pub total_anomalies: usize,
    pub unique_ips: usize,
    pub events_per_minute: f64,
}

pub fn summarize(events: &[Event]) -> SummaryStats {
    let total_anomalies = events.iter().map(|e| e.anomalies.len()).sum();
    let unique_ips = events
        .iter()
        .filter_map(|e| e.src_ip.as_deref())
        .collect::<HashSet<_>>()
        .len();

    SummaryStats {
        total_events: events.len(),
        total_anomalies,
        unique_ips,
        events_per_minute: events_per_minute(events),
    }
}

/// Total events divided by the minutes between the earliest and latest
/// timestamp. Zero when fewer than two events are timestamped or the span
/// is not positive.
pub fn events_per_minute(events: &[Event]) -> f64 {
    let mut stamps = events.iter().filter_map(|e| e.timestamp);
    let Some(first) = stamps.next() else {
        return 0.0;
    };
    let (mut min, mut max, mut timed) = (first, first, 1usize);
    for ts in stamps {
        min = min.min(ts);
        max = max.max(ts);
        timed += 1;
    }
    if timed < 2 {
        return 0.0;
    }

    let span_minutes = (max - min).num_milliseconds() as f64 / 60_000.0;
    if span_minutes <= 0.0 {
        return 0.0;
    }
    events.len() as f64 / span_minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_timestamp, Anomaly};

    fn event(ts: Option<&str>, ip: Option<&str>, anomalies: usize) -> Event {
        Event {
            timestamp: ts.and_then(parse_timestamp),
            src_ip: ip.map(String::from),
            anomalies: vec![Anomaly::default(); anomalies],
            ..Default::default()
        }
    }

    #[test]
    fn test_summary() {
        let events = vec![
            event(Some("2024-01-01T00:00:00Z"), Some("1.1.1.1"), 2),
            event(Some("2024-01-01T00:10:00Z"), Some("1.1.1.1"), 0),
            event(None, Some("2.2.2.2"), 1),
            event(Some("2024-01-01T00:05:00Z"), None, 0),
        ];
        let stats = summarize(&events);
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.total_anomalies, 3);
        assert_eq!(stats.unique_ips, 2);
        assert!((stats.events_per_minute - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_rate_needs_two_timestamps() {
        let events = vec![
            event(Some("2024-01-01T00:00:00Z"), None, 0),
            event(None, None, 0),
        ];
        assert_eq!(events_per_minute(&events), 0.0);
    }

    #[test]
    fn test_rate_zero_span() {
        let events = vec![
            event(Some("2024-01-01T00:00:00Z"), None, 0),
            event(Some("2024-01-01T00:00:00Z"), None, 0),
        ];
        assert_eq!(events_per_minute(&events), 0.0);
    }

    #[test]
    fn test_empty_summary_is_zeroed() {
        assert_eq!(summarize(&[]), SummaryStats::default());
    }
}
