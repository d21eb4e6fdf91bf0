//! The five dashboard charts.
//!
//! Each function is a pure mapping from a derived series to SVG markup.
//! Empty input yields [`Chart::NoData`] with the placeholder text the page
//! shows instead of a chart.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::format::{format_chart_date, format_count, format_tick, xml_escape};
use super::palette::{self, ACCENT, ANOMALY, AXIS, GRID, PRIMARY, SCORE};
use super::scale::{BandScale, LinearScale, TimeScale};
use super::shape::{area_path, line_path, pie, Arc};
use crate::analysis::aggregator::{MethodShare, Ranked, StatusCategory, StatusGroup, TimeBucket};
use crate::analysis::correlation::TrendPoint;

pub const WIDTH: f64 = 800.0;

pub const NO_TIMELINE: &str = "No timeline data available";
pub const NO_IPS: &str = "No IP data available";
pub const NO_STATUS: &str = "No status data available";
pub const NO_METHODS: &str = "No method data available";
pub const NO_ANOMALIES: &str = "No anomaly data available";

/// A rendered chart, or the reason there is nothing to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Svg(String),
    NoData(&'static str),
}

impl Chart {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Chart::Svg(_))
    }

    /// Markup for embedding in a page.
    pub fn to_html(&self) -> String {
        match self {
            Chart::Svg(svg) => svg.clone(),
            Chart::NoData(message) => format!("<div class=\"no-data\">{}</div>", message),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Margin {
    top: f64,
    right: f64,
    bottom: f64,
    left: f64,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    width: f64,
    height: f64,
    margin: Margin,
}

impl Frame {
    fn new(height: f64, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            width: WIDTH,
            height,
            margin: Margin {
                top,
                right,
                bottom,
                left,
            },
        }
    }

    fn inner_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    fn inner_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }

    /// Opens the `<svg>` element, the local stylesheet and the plot group.
    fn open(&self, class: &str, hover: &str) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"chart {class}\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            class = class,
            w = self.width,
            h = self.height,
        );
        let _ = write!(
            svg,
            "<style>.{class} text{{font-family:sans-serif;font-size:12px;fill:{axis}}}{hover}</style>",
            class = class,
            axis = AXIS,
            hover = hover,
        );
        let _ = write!(
            svg,
            "<g transform=\"translate({},{})\">",
            self.margin.left, self.margin.top
        );
        svg
    }

    fn close(mut svg: String) -> String {
        svg.push_str("</g></svg>");
        svg
    }
}

fn horizontal_grid(svg: &mut String, y: &LinearScale, ticks: &[f64], width: f64) {
    for &tick in ticks {
        let _ = write!(
            svg,
            "<line class=\"grid\" x1=\"0\" x2=\"{:.2}\" y1=\"{y:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-dasharray=\"3,3\"/>",
            width,
            GRID,
            y = y.scale(tick),
        );
    }
}

/// Tick labels down one side of the plot. `x` is the axis position and
/// `anchor` the SVG text-anchor for the labels.
fn y_axis(svg: &mut String, y: &LinearScale, ticks: &[f64], x: f64, anchor: &str, color: &str) {
    let offset = if anchor == "end" { -8.0 } else { 8.0 };
    let (r0, r1) = y.range();
    let _ = write!(
        svg,
        "<line class=\"axis\" x1=\"{x:.2}\" x2=\"{x:.2}\" y1=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\"/>",
        r0,
        r1,
        color,
        x = x,
    );
    for &tick in ticks {
        let _ = write!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" dy=\"0.32em\" text-anchor=\"{}\" style=\"fill:{}\">{}</text>",
            x + offset,
            y.scale(tick),
            anchor,
            color,
            format_tick(tick),
        );
    }
}

fn time_axis(svg: &mut String, x: &TimeScale, height: f64, width: f64, now: DateTime<Utc>) {
    let _ = write!(
        svg,
        "<line class=\"axis\" x1=\"0\" x2=\"{:.2}\" y1=\"{h:.2}\" y2=\"{h:.2}\" stroke=\"{}\"/>",
        width,
        AXIS,
        h = height,
    );
    for tick in x.ticks(6) {
        let _ = write!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>",
            x.scale(tick),
            height + 20.0,
            format_chart_date(tick, now),
        );
    }
}

fn axis_label(svg: &mut String, x: f64, y: f64, rotate: bool, text: &str) {
    let transform = if rotate {
        format!(" transform=\"rotate(-90,{:.2},{:.2})\"", x, y)
    } else {
        String::new()
    };
    let _ = write!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\"{}>{}</text>",
        x, y, transform, text
    );
}

fn legend_entry(svg: &mut String, x: f64, y: f64, color: &str, dashed: bool, label: &str) {
    let dash = if dashed { " stroke-dasharray=\"5,5\"" } else { "" };
    let _ = write!(
        svg,
        "<line x1=\"{:.2}\" x2=\"{:.2}\" y1=\"{y:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"2\"{}/>\
         <text x=\"{:.2}\" y=\"{y:.2}\" dy=\"0.32em\">{}</text>",
        x,
        x + 20.0,
        color,
        dash,
        x + 26.0,
        xml_escape(label),
        y = y,
    );
}

/// Event count per time bucket: area under a line, with a dot per bucket.
pub fn timeline_chart(buckets: &[TimeBucket], now: DateTime<Utc>) -> Chart {
    if buckets.is_empty() {
        return Chart::NoData(NO_TIMELINE);
    }
    let frame = Frame::new(300.0, 20.0, 30.0, 50.0, 60.0);
    let (iw, ih) = (frame.inner_width(), frame.inner_height());

    let Some(x) = TimeScale::from_extent(buckets.iter().map(|b| b.time), (0.0, iw)) else {
        return Chart::NoData(NO_TIMELINE);
    };
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    let y = LinearScale::new((0.0, max), (ih, 0.0)).nice(5);
    let y_ticks = y.ticks(5);

    let points: Vec<(f64, f64)> = buckets
        .iter()
        .map(|b| (x.scale(b.time), y.scale(b.count as f64)))
        .collect();

    let mut svg = frame.open("timeline", ".timeline circle:hover{r:6}");
    let _ = write!(
        svg,
        "<defs><linearGradient id=\"timeline-gradient\" x1=\"0\" x2=\"0\" y1=\"0\" y2=\"1\">\
         <stop offset=\"0%\" stop-color=\"{c}\" stop-opacity=\"0.3\"/>\
         <stop offset=\"100%\" stop-color=\"{c}\" stop-opacity=\"0\"/></linearGradient></defs>",
        c = PRIMARY,
    );
    horizontal_grid(&mut svg, &y, &y_ticks, iw);
    let _ = write!(
        svg,
        "<path class=\"area\" d=\"{}\" fill=\"url(#timeline-gradient)\"/>",
        area_path(&points, ih)
    );
    let line: Vec<Option<(f64, f64)>> = points.iter().copied().map(Some).collect();
    let _ = write!(
        svg,
        "<path class=\"line\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
        line_path(&line),
        PRIMARY
    );
    for (bucket, (cx, cy)) in buckets.iter().zip(&points) {
        let _ = write!(
            svg,
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"{}\"><title>{}: {} events</title></circle>",
            cx,
            cy,
            PRIMARY,
            bucket.time.format("%Y-%m-%d %H:%M"),
            format_count(bucket.count),
        );
    }
    time_axis(&mut svg, &x, ih, iw, now);
    y_axis(&mut svg, &y, &y_ticks, 0.0, "end", AXIS);
    axis_label(&mut svg, -45.0, ih / 2.0, true, "Events");
    Chart::Svg(Frame::close(svg))
}

/// Horizontal bars for the most frequent source IPs, shaded along a
/// blue-to-violet ramp by rank.
pub fn top_ips_chart(ranked: &[Ranked]) -> Chart {
    if ranked.is_empty() {
        return Chart::NoData(NO_IPS);
    }
    let frame = Frame::new(400.0, 20.0, 30.0, 40.0, 120.0);
    let (iw, ih) = (frame.inner_width(), frame.inner_height());

    let y = BandScale::new(ranked.iter().map(|r| r.key.clone()).collect(), (0.0, ih), 0.2);
    let max = ranked.iter().map(|r| r.count).max().unwrap_or(0) as f64;
    let x = LinearScale::new((0.0, max), (0.0, iw)).nice(5);
    let x_ticks = x.ticks(5);
    let last = (ranked.len() - 1).max(1) as f64;

    let mut svg = frame.open("top-ips", ".top-ips rect:hover{opacity:0.8}");
    for &tick in &x_ticks {
        let tx = x.scale(tick);
        let _ = write!(
            svg,
            "<line class=\"grid\" x1=\"{tx:.2}\" x2=\"{tx:.2}\" y1=\"0\" y2=\"{:.2}\" stroke=\"{}\" stroke-dasharray=\"3,3\"/>\
             <text x=\"{tx:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>",
            ih,
            GRID,
            ih + 20.0,
            format_tick(tick),
            tx = tx,
        );
    }
    let bw = y.bandwidth();
    for (i, entry) in ranked.iter().enumerate() {
        let Some(top) = y.position(&entry.key) else {
            continue;
        };
        let key = xml_escape(&entry.key);
        let bar = x.scale(entry.count as f64);
        let _ = write!(
            svg,
            "<rect x=\"0\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" fill=\"{}\"><title>{}: {} requests</title></rect>",
            top,
            bar,
            bw,
            palette::interpolate(PRIMARY, ACCENT, i as f64 / last),
            key,
            format_count(entry.count),
        );
        let mid = top + bw / 2.0;
        let _ = write!(
            svg,
            "<text x=\"-8\" y=\"{mid:.2}\" dy=\"0.32em\" text-anchor=\"end\">{}</text>\
             <text x=\"{:.2}\" y=\"{mid:.2}\" dy=\"0.32em\">{}</text>",
            key,
            bar + 5.0,
            format_count(entry.count),
            mid = mid,
        );
    }
    Chart::Svg(Frame::close(svg))
}

fn category_legend_label(category: StatusCategory) -> &'static str {
    match category {
        StatusCategory::Success => "2xx Success",
        StatusCategory::Redirect => "3xx Redirect",
        StatusCategory::ClientError => "4xx Client Error",
        StatusCategory::ServerError => "5xx Server Error",
        StatusCategory::Other => "Other",
    }
}

/// Vertical bars per status code, coloured by category, with a legend of
/// the categories present.
pub fn status_code_chart(groups: &[StatusGroup]) -> Chart {
    if groups.is_empty() {
        return Chart::NoData(NO_STATUS);
    }
    let frame = Frame::new(400.0, 20.0, 30.0, 50.0, 60.0);
    let (iw, ih) = (frame.inner_width(), frame.inner_height());

    let x = BandScale::new(groups.iter().map(|g| g.status.to_string()).collect(), (0.0, iw), 0.3);
    let max = groups.iter().map(|g| g.count).max().unwrap_or(0) as f64;
    let y = LinearScale::new((0.0, max), (ih, 0.0)).nice(5);
    let y_ticks = y.ticks(5);

    let mut svg = frame.open("status-codes", ".status-codes rect:hover{opacity:0.8}");
    horizontal_grid(&mut svg, &y, &y_ticks, iw);
    let bw = x.bandwidth();
    for group in groups {
        let label = group.status.to_string();
        let Some(left) = x.position(&label) else {
            continue;
        };
        let top = y.scale(group.count as f64);
        let center = left + bw / 2.0;
        let _ = write!(
            svg,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" fill=\"{}\"><title>HTTP {}: {} responses</title></rect>\
             <text x=\"{c:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>\
             <text x=\"{c:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>",
            left,
            top,
            bw,
            ih - top,
            palette::category_color(group.category),
            label,
            format_count(group.count),
            top - 5.0,
            format_count(group.count),
            ih + 20.0,
            label,
            c = center,
        );
    }
    y_axis(&mut svg, &y, &y_ticks, 0.0, "end", AXIS);
    axis_label(&mut svg, -45.0, ih / 2.0, true, "Count");

    let mut categories: Vec<StatusCategory> = Vec::new();
    for group in groups {
        if !categories.contains(&group.category) {
            categories.push(group.category);
        }
    }
    let mut lx = 0.0;
    for category in categories {
        let label = category_legend_label(category);
        let _ = write!(
            svg,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"12\" height=\"12\" fill=\"{}\"/>\
             <text x=\"{:.2}\" y=\"{:.2}\" dy=\"0.32em\">{}</text>",
            lx,
            ih + 32.0,
            palette::category_color(category),
            lx + 16.0,
            ih + 38.0,
            label,
        );
        lx += 30.0 + label.len() as f64 * 7.0;
    }
    Chart::Svg(Frame::close(svg))
}

/// Donut of method shares with the total in the middle. Slices under 5 % go
/// unlabelled to avoid clutter; the legend lists every method.
pub fn method_chart(shares: &[MethodShare]) -> Chart {
    if shares.is_empty() {
        return Chart::NoData(NO_METHODS);
    }
    let frame = Frame::new(400.0, 0.0, 0.0, 0.0, 0.0);
    let radius = frame.width.min(frame.height) / 2.0 - 40.0;
    let arc = Arc::new(radius * 0.5, radius);
    let total: usize = shares.iter().map(|s| s.count).sum();
    let slices = pie(&shares.iter().map(|s| s.count as f64).collect::<Vec<_>>());

    let mut svg = frame.open("methods", ".methods path:hover{opacity:0.8}");
    let _ = write!(
        svg,
        "<g transform=\"translate({:.2},{:.2})\">",
        frame.width / 2.0,
        frame.height / 2.0
    );
    for (share, slice) in shares.iter().zip(&slices) {
        let method = xml_escape(&share.method);
        let _ = write!(
            svg,
            "<path d=\"{}\" fill=\"{}\" stroke=\"#ffffff\" stroke-width=\"2\"><title>{}: {} ({:.1}%)</title></path>",
            arc.path(slice),
            palette::method_color(&share.method),
            method,
            format_count(share.count),
            share.percentage,
        );
    }
    for (share, slice) in shares.iter().zip(&slices) {
        if share.percentage <= 5.0 {
            continue;
        }
        let (lx, ly) = arc.centroid(slice);
        let _ = write!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" dy=\"0.32em\" text-anchor=\"middle\" style=\"fill:#ffffff;font-weight:bold\">{:.1}%</text>",
            lx, ly, share.percentage,
        );
    }
    let _ = write!(
        svg,
        "<text y=\"-5\" text-anchor=\"middle\" style=\"font-size:24px;font-weight:bold;fill:#111827\">{}</text>\
         <text y=\"18\" text-anchor=\"middle\">Total Requests</text></g>",
        format_count(total),
    );

    let lx = frame.width - 150.0;
    for (i, share) in shares.iter().enumerate() {
        let ly = 20.0 + i as f64 * 22.0;
        let _ = write!(
            svg,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"14\" height=\"14\" rx=\"2\" fill=\"{}\"/>\
             <text x=\"{:.2}\" y=\"{:.2}\" dy=\"0.32em\">{} ({:.1}%)</text>",
            lx,
            ly,
            palette::method_color(&share.method),
            lx + 20.0,
            ly + 7.0,
            xml_escape(&share.method),
            share.percentage,
        );
    }
    Chart::Svg(Frame::close(svg))
}

/// Anomaly count (left axis) and mean score (right axis, fixed to [0, 1])
/// per bucket. Buckets without a mean score leave a gap in the score line.
pub fn anomaly_trend_chart(points: &[TrendPoint], now: DateTime<Utc>) -> Chart {
    if points.is_empty() {
        return Chart::NoData(NO_ANOMALIES);
    }
    let frame = Frame::new(300.0, 20.0, 60.0, 50.0, 60.0);
    let (iw, ih) = (frame.inner_width(), frame.inner_height());

    let Some(x) = TimeScale::from_extent(points.iter().map(|p| p.time), (0.0, iw)) else {
        return Chart::NoData(NO_ANOMALIES);
    };
    let max = points.iter().map(|p| p.count).max().unwrap_or(0) as f64;
    let y_count = LinearScale::new((0.0, max), (ih, 0.0)).nice(5);
    let y_score = LinearScale::new((0.0, 1.0), (ih, 0.0));
    let count_ticks = y_count.ticks(5);

    let mut svg = frame.open("anomalies", ".anomalies circle:hover{r:6}");
    horizontal_grid(&mut svg, &y_count, &count_ticks, iw);

    let count_points: Vec<Option<(f64, f64)>> = points
        .iter()
        .map(|p| Some((x.scale(p.time), y_count.scale(p.count as f64))))
        .collect();
    let score_points: Vec<Option<(f64, f64)>> = points
        .iter()
        .map(|p| p.mean_score.map(|s| (x.scale(p.time), y_score.scale(s.clamp(0.0, 1.0)))))
        .collect();

    let _ = write!(
        svg,
        "<path class=\"count\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>\
         <path class=\"score\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\" stroke-dasharray=\"5,5\"/>",
        line_path(&count_points),
        ANOMALY,
        line_path(&score_points),
        SCORE,
    );
    for (point, xy) in points.iter().zip(&count_points) {
        let Some((cx, cy)) = xy else { continue };
        let score = point
            .mean_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "n/a".to_string());
        let _ = write!(
            svg,
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"{}\"><title>{}: {} anomalies, avg score {}</title></circle>",
            cx,
            cy,
            ANOMALY,
            point.time.format("%Y-%m-%d %H:%M"),
            format_count(point.count),
            score,
        );
    }

    time_axis(&mut svg, &x, ih, iw, now);
    y_axis(&mut svg, &y_count, &count_ticks, 0.0, "end", ANOMALY);
    y_axis(&mut svg, &y_score, &y_score.ticks(5), iw, "start", SCORE);
    axis_label(&mut svg, -45.0, ih / 2.0, true, "Anomaly Count");
    axis_label(&mut svg, iw + 50.0, ih / 2.0, true, "Avg Score");

    legend_entry(&mut svg, 10.0, 0.0, ANOMALY, false, "Anomaly Count");
    legend_entry(&mut svg, 130.0, 0.0, SCORE, true, "Avg Score");
    Chart::Svg(Frame::close(svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn svg(chart: Chart) -> String {
        match chart {
            Chart::Svg(svg) => svg,
            Chart::NoData(msg) => panic!("expected a chart, got placeholder {:?}", msg),
        }
    }

    #[test]
    fn test_empty_inputs_give_placeholders() {
        let now = t(12);
        assert_eq!(timeline_chart(&[], now), Chart::NoData(NO_TIMELINE));
        assert_eq!(top_ips_chart(&[]), Chart::NoData(NO_IPS));
        assert_eq!(status_code_chart(&[]), Chart::NoData(NO_STATUS));
        assert_eq!(method_chart(&[]), Chart::NoData(NO_METHODS));
        assert_eq!(anomaly_trend_chart(&[], now), Chart::NoData(NO_ANOMALIES));
        assert!(Chart::NoData(NO_IPS).to_html().contains("No IP data available"));
    }

    #[test]
    fn test_timeline_single_bucket() {
        let out = svg(timeline_chart(
            &[TimeBucket {
                time: t(10),
                count: 3,
            }],
            t(12),
        ));
        assert!(out.starts_with("<svg"));
        assert!(out.ends_with("</svg>"));
        assert_eq!(out.matches("<circle").count(), 1);
        assert!(out.contains("3 events"));
        assert!(out.contains("timeline-gradient"));
    }

    #[test]
    fn test_top_ips_escapes_keys_and_shades_by_rank() {
        let ranked = vec![
            Ranked {
                key: "10.0.0.1".into(),
                count: 5,
            },
            Ranked {
                key: "<script>".into(),
                count: 2,
            },
        ];
        let out = svg(top_ips_chart(&ranked));
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains(PRIMARY));
        assert!(out.contains(ACCENT));
        assert_eq!(out.matches("<rect").count(), 2);
    }

    #[test]
    fn test_status_chart_colours_and_legend() {
        let groups = vec![
            StatusGroup {
                status: 200,
                count: 10,
                category: StatusCategory::Success,
            },
            StatusGroup {
                status: 404,
                count: 2,
                category: StatusCategory::ClientError,
            },
        ];
        let out = svg(status_code_chart(&groups));
        assert!(out.contains("#10b981"));
        assert!(out.contains("#f59e0b"));
        assert!(out.contains("2xx Success"));
        assert!(out.contains("4xx Client Error"));
        assert!(!out.contains("5xx Server Error"));
    }

    #[test]
    fn test_method_donut_labels_and_total() {
        let shares = vec![
            MethodShare {
                method: "GET".into(),
                count: 97,
                percentage: 97.0,
            },
            MethodShare {
                method: "POST".into(),
                count: 3,
                percentage: 3.0,
            },
        ];
        let out = svg(method_chart(&shares));
        assert!(out.contains("Total Requests"));
        assert!(out.contains(">100<"));
        assert!(out.contains("GET (97.0%)"));
        assert!(out.contains("POST (3.0%)"));
        // only the GET slice is large enough for an inline label
        assert!(out.contains(">97.0%<"));
        assert!(!out.contains(">3.0%<"));
    }

    #[test]
    fn test_anomaly_trend_has_dual_series_and_gaps() {
        let points = vec![
            TrendPoint {
                time: t(0),
                count: 2,
                mean_score: Some(0.8),
            },
            TrendPoint {
                time: t(1),
                count: 1,
                mean_score: None,
            },
            TrendPoint {
                time: t(2),
                count: 4,
                mean_score: Some(0.4),
            },
        ];
        let out = svg(anomaly_trend_chart(&points, t(2) + Duration::hours(1)));
        assert!(out.contains("Anomaly Count"));
        assert!(out.contains("Avg Score"));
        assert!(out.contains("stroke-dasharray=\"5,5\""));
        assert!(out.contains("avg score n/a"));
        assert_eq!(out.matches("<circle").count(), 3);
    }
}
