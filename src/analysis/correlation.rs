//! Correlates detector anomalies with time: per-bucket anomaly counts and
//! mean severity.

use crate::analysis::aggregator::bucket_start;
use crate::model::Event;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub time: DateTime<Utc>,
    pub count: usize,
    /// Mean of the parsable scores in this bucket. `None` when the bucket
    /// holds anomalies but none of them carried a usable score.
    pub mean_score: Option<f64>,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    score_sum: f64,
    scored: usize,
}

/// Bucket every anomaly by its owning event's timestamp.
///
/// Events without a timestamp or without anomalies do not contribute. Each
/// anomaly adds one to its bucket's count; only scored anomalies enter the
/// mean.
pub fn anomaly_trend(events: &[Event], interval_minutes: u32) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, Accumulator> = BTreeMap::new();

    for event in events.iter().filter(|e| !e.anomalies.is_empty()) {
        let Some(ts) = event.timestamp else {
            continue;
        };
        let acc = buckets.entry(bucket_start(ts, interval_minutes)).or_default();
        for anomaly in &event.anomalies {
            acc.count += 1;
            if let Some(score) = anomaly.score {
                acc.score_sum += score;
                acc.scored += 1;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(time, acc)| TrendPoint {
            time,
            count: acc.count,
            mean_score: (acc.scored > 0).then(|| acc.score_sum / acc.scored as f64),
        })
        .collect()
}
