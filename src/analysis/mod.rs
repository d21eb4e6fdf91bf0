//! Event aggregation pipeline.
//!
//! Every function here is pure and synchronous: a snapshot of events goes in,
//! derived series come out. Nothing is cached, so re-running on each fetched
//! snapshot is always safe.

pub mod aggregator;
pub mod correlation;
pub mod stats;

use crate::model::Event;
use aggregator::{MethodShare, Ranked, StatusGroup, TimeBucket, DEFAULT_BUCKET_MINUTES};
use correlation::TrendPoint;
use serde::Serialize;
use stats::SummaryStats;

/// Knobs for deriving a dashboard from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DashboardParams {
    pub bucket_minutes: u32,
    pub top_n: usize,
}

impl Default for DashboardParams {
    fn default() -> Self {
        Self {
            bucket_minutes: DEFAULT_BUCKET_MINUTES,
            top_n: 10,
        }
    }
}

/// Every series the dashboard renders, derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardData {
    pub timeline: Vec<TimeBucket>,
    pub top_ips: Vec<Ranked>,
    pub status_codes: Vec<StatusGroup>,
    pub methods: Vec<MethodShare>,
    pub anomalies: Vec<TrendPoint>,
    pub stats: SummaryStats,
}

impl DashboardData {
    pub fn from_events(events: &[Event], params: DashboardParams) -> Self {
        Self {
            timeline: aggregator::bucket_by_time(events, params.bucket_minutes),
            top_ips: aggregator::top_ips(events, params.top_n),
            status_codes: aggregator::group_by_status(events),
            methods: aggregator::method_distribution(events),
            anomalies: correlation::anomaly_trend(events, params.bucket_minutes),
            stats: stats::summarize(events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let data = DashboardData::from_events(&[], DashboardParams::default());
        assert_eq!(data, DashboardData::default());
    }

    #[test]
    fn test_params_flow_through() {
        let events: Vec<Event> = (0..20)
            .map(|i| Event {
                id: i,
                src_ip: Some(format!("10.0.0.{}", i)),
                ..Default::default()
            })
            .collect();
        let data = DashboardData::from_events(
            &events,
            DashboardParams {
                bucket_minutes: 5,
                top_n: 3,
            },
        );
        assert_eq!(data.top_ips.len(), 3);
        assert_eq!(data.stats.unique_ips, 20);
        assert!(data.timeline.is_empty());
    }
}
