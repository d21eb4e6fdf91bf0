//! Presentation layer: scales, shape generators and the SVG charts built
//! from them.

pub mod chart;
pub mod format;
pub mod palette;
pub mod scale;
pub mod shape;

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::analysis::DashboardData;
pub use chart::Chart;

/// The charts the dashboard shows, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Timeline,
    TopIps,
    StatusCodes,
    Methods,
    Anomalies,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Timeline,
        ChartKind::TopIps,
        ChartKind::StatusCodes,
        ChartKind::Methods,
        ChartKind::Anomalies,
    ];

    /// Path segment used by `/api/v1/charts/{name}`.
    pub fn slug(self) -> &'static str {
        match self {
            ChartKind::Timeline => "timeline",
            ChartKind::TopIps => "top-ips",
            ChartKind::StatusCodes => "status-codes",
            ChartKind::Methods => "methods",
            ChartKind::Anomalies => "anomalies",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::Timeline => "Events Over Time",
            ChartKind::TopIps => "Top Source IPs",
            ChartKind::StatusCodes => "Status Codes",
            ChartKind::Methods => "HTTP Methods",
            ChartKind::Anomalies => "Anomaly Trend",
        }
    }

    pub fn render(self, data: &DashboardData, now: DateTime<Utc>) -> Chart {
        match self {
            ChartKind::Timeline => chart::timeline_chart(&data.timeline, now),
            ChartKind::TopIps => chart::top_ips_chart(&data.top_ips),
            ChartKind::StatusCodes => chart::status_code_chart(&data.status_codes),
            ChartKind::Methods => chart::method_chart(&data.methods),
            ChartKind::Anomalies => chart::anomaly_trend_chart(&data.anomalies, now),
        }
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| format!("unknown chart: {}", s))
    }
}
