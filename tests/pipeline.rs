//! End-to-end pipeline tests: upstream JSON in, derived series and charts out.

use logdash::analysis::aggregator::{
    bucket_by_time, group_by_status, method_distribution, top_ips, top_n, RankKey,
    StatusCategory,
};
use logdash::analysis::correlation::anomaly_trend;
use logdash::analysis::stats::summarize;
use logdash::analysis::{DashboardData, DashboardParams};
use logdash::model::{Event, EventsPage};
use logdash::render::ChartKind;

fn page(json: &str) -> Vec<Event> {
    serde_json::from_str::<EventsPage>(json).unwrap().events
}

/// A realistic slice of an upstream `/events` response, including the
/// quirks it is known to produce: naive timestamps, string scores, nulls.
const SAMPLE: &str = r#"{
  "events": [
    {"id": 1, "timestamp": "2024-01-01T00:10:00", "src_ip": "1.1.1.1", "method": "GET",
     "url": "/", "status": 200, "bytes": 512, "anomalies": []},
    {"id": 2, "timestamp": "2024-01-01T00:50:00+00:00", "src_ip": "1.1.1.1", "method": "POST",
     "url": "/login", "status": 401, "bytes": 0,
     "anomalies": [{"id": 10, "detector": "burst", "score": "0.9", "reason": "login burst"}]},
    {"id": 3, "timestamp": "2024-01-01T01:05:00Z", "src_ip": "2.2.2.2", "method": "GET",
     "url": "/admin", "status": 500, "bytes": null,
     "anomalies": [
       {"id": 11, "detector": "rare_path", "score": 0.5, "reason": "rare path"},
       {"id": 12, "detector": "rare_path", "score": null, "reason": "no score"}
     ]},
    {"id": 4, "timestamp": null, "src_ip": "", "method": null, "status": null, "anomalies": null}
  ],
  "page": 1
}"#;

#[test]
fn test_sample_page_decodes_leniently() {
    let events = page(SAMPLE);
    assert_eq!(events.len(), 4);
    assert_eq!(events[1].anomalies[0].score, Some(0.9));
    assert_eq!(events[2].anomalies[1].score, None);
    assert!(events[3].timestamp.is_none());
    assert!(events[3].src_ip.is_none());
    assert!(events[3].anomalies.is_empty());
}

#[test]
fn test_bucket_and_top_ip_scenario() {
    let events = page(SAMPLE);
    let buckets = bucket_by_time(&events, 60);
    let rendered: Vec<(String, usize)> = buckets
        .iter()
        .map(|b| (b.time.to_rfc3339(), b.count))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("2024-01-01T00:00:00+00:00".to_string(), 2),
            ("2024-01-01T01:00:00+00:00".to_string(), 1),
        ]
    );

    let top = top_ips(&events, 1);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].key, "1.1.1.1");
    assert_eq!(top[0].count, 2);
}

#[test]
fn test_missing_values_rank_as_unknown() {
    let events = page(SAMPLE);
    let methods = top_n(&events, RankKey::Method, 10);
    assert!(methods.iter().any(|r| r.key == "Unknown" && r.count == 1));
    let ips = top_ips(&events, 10);
    assert_eq!(ips.last().map(|r| r.key.as_str()), Some("Unknown"));
}

#[test]
fn test_status_grouping_scenario() {
    let events: Vec<Event> = [200, 200, 404, 500]
        .into_iter()
        .enumerate()
        .map(|(i, status)| Event {
            id: i as i64,
            status: Some(status),
            ..Default::default()
        })
        .collect();
    let groups: Vec<(u16, usize, StatusCategory)> = group_by_status(&events)
        .into_iter()
        .map(|g| (g.status, g.count, g.category))
        .collect();
    assert_eq!(
        groups,
        vec![
            (200, 2, StatusCategory::Success),
            (404, 1, StatusCategory::ClientError),
            (500, 1, StatusCategory::ServerError),
        ]
    );
}

#[test]
fn test_group_counts_sum_to_defined_values() {
    let events = page(SAMPLE);
    let with_status = events.iter().filter(|e| e.status.is_some()).count();
    let grouped: usize = group_by_status(&events).iter().map(|g| g.count).sum();
    assert_eq!(grouped, with_status);
}

#[test]
fn test_method_percentages_sum_to_100() {
    let events = page(SAMPLE);
    let shares = method_distribution(&events);
    let total: f64 = shares.iter().map(|s| s.percentage).sum();
    assert!((total - 100.0).abs() < 1e-9);
    assert_eq!(shares[0].method, "GET");
    assert!(method_distribution(&[]).is_empty());
}

#[test]
fn test_trend_counts_match_timestamped_anomalies() {
    let events = page(SAMPLE);
    let trend = anomaly_trend(&events, 60);
    let counted: usize = trend.iter().map(|p| p.count).sum();
    let expected: usize = events
        .iter()
        .filter(|e| e.timestamp.is_some())
        .map(|e| e.anomalies.len())
        .sum();
    assert_eq!(counted, expected);

    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].mean_score, Some(0.9));
    // one scored, one unscored anomaly: the mean ignores the unscored one
    assert_eq!(trend[1].count, 2);
    assert_eq!(trend[1].mean_score, Some(0.5));
}

#[test]
fn test_empty_list_scenario() {
    assert!(bucket_by_time(&[], 60).is_empty());
    assert!(top_ips(&[], 10).is_empty());
    assert!(group_by_status(&[]).is_empty());
    assert!(method_distribution(&[]).is_empty());
    assert!(anomaly_trend(&[], 60).is_empty());
    let stats = summarize(&[]);
    assert_eq!(stats.total_events, 0);
    assert_eq!(stats.total_anomalies, 0);
    assert_eq!(stats.unique_ips, 0);
    assert_eq!(stats.events_per_minute, 0.0);
}

#[test]
fn test_snapshot_renders_every_chart() {
    let events = page(SAMPLE);
    let data = DashboardData::from_events(&events, DashboardParams::default());
    assert_eq!(data.stats.total_events, 4);
    assert_eq!(data.stats.total_anomalies, 3);
    assert_eq!(data.stats.unique_ips, 2);

    let now = chrono::Utc::now();
    for kind in ChartKind::ALL {
        assert!(kind.render(&data, now).is_rendered(), "{:?}", kind);
    }
}
