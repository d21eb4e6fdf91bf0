//! Chart colours.

use crate::analysis::aggregator::StatusCategory;

pub const PRIMARY: &str = "#3b82f6";
pub const ACCENT: &str = "#8b5cf6";
pub const ANOMALY: &str = "#ef4444";
pub const SCORE: &str = "#f59e0b";
pub const GRID: &str = "#e5e7eb";
pub const AXIS: &str = "#6b7280";
pub const FALLBACK: &str = "#6b7280";

pub fn category_color(category: StatusCategory) -> &'static str {
    match category {
        StatusCategory::Success => "#10b981",
        StatusCategory::Redirect => "#3b82f6",
        StatusCategory::ClientError => "#f59e0b",
        StatusCategory::ServerError => "#ef4444",
        StatusCategory::Other => FALLBACK,
    }
}

/// Colour for an HTTP method. Matching is case-insensitive; anything not in
/// the table is grey.
pub fn method_color(method: &str) -> &'static str {
    match method.to_ascii_uppercase().as_str() {
        "GET" => "#3b82f6",
        "POST" => "#10b981",
        "PUT" => "#f59e0b",
        "DELETE" => "#ef4444",
        "PATCH" => "#8b5cf6",
        "HEAD" => "#06b6d4",
        "OPTIONS" => "#ec4899",
        _ => FALLBACK,
    }
}

/// Linear RGB interpolation between two `#rrggbb` colours, `t` in [0, 1].
pub fn interpolate(from: &str, to: &str, t: f64) -> String {
    let (Some(a), Some(b)) = (parse_hex(from), parse_hex(to)) else {
        return from.to_string();
    };
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(a[0], b[0]),
        mix(a[1], b[1]),
        mix(a[2], b[2])
    )
}

fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors_by_category() {
        assert_eq!(category_color(StatusCategory::of(200)), "#10b981");
        assert_eq!(category_color(StatusCategory::of(301)), "#3b82f6");
        assert_eq!(category_color(StatusCategory::of(404)), "#f59e0b");
        assert_eq!(category_color(StatusCategory::of(503)), "#ef4444");
        assert_eq!(category_color(StatusCategory::of(0)), FALLBACK);
        assert_eq!(category_color(StatusCategory::of(99)), FALLBACK);
    }

    #[test]
    fn test_method_colors() {
        assert_eq!(method_color("GET"), "#3b82f6");
        assert_eq!(method_color("delete"), "#ef4444");
        assert_eq!(method_color("Unknown"), FALLBACK);
        assert_eq!(method_color("PROPFIND"), FALLBACK);
    }

    #[test]
    fn test_interpolate() {
        assert_eq!(interpolate(PRIMARY, ACCENT, 0.0), PRIMARY);
        assert_eq!(interpolate(PRIMARY, ACCENT, 1.0), ACCENT);
        assert_eq!(interpolate("#000000", "#ffffff", 0.5), "#808080");
        assert_eq!(interpolate("bogus", ACCENT, 0.5), "bogus");
    }
}
