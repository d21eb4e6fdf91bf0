//! Text formatting for chart labels and terminal output.

use chrono::{DateTime, Utc};

use crate::analysis::stats::SummaryStats;

/// Axis label for `date`, relative to `now`: clock time within the last day,
/// weekday and hour within the last week, month and day beyond that.
pub fn format_chart_date(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - date).num_minutes() as f64 / 60.0;
    if hours < 24.0 {
        date.format("%H:%M").to_string()
    } else if hours < 168.0 {
        date.format("%a %-I %p").to_string()
    } else {
        date.format("%b %-d").to_string()
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Tick label for a linear axis: integers without a fraction, everything
/// else to two decimals.
pub fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

pub fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// One-line summary of a snapshot for the terminal.
pub fn format_summary(stats: &SummaryStats) -> String {
    format!(
        "{} events, {} anomalies, {} unique IPs, {:.1} events/min",
        format_count(stats.total_events),
        format_count(stats.total_anomalies),
        format_count(stats.unique_ips),
        stats.events_per_minute,
    )
}
