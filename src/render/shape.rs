//! Shape generators producing SVG path data.
//!
//! Angles follow the usual chart convention: zero at twelve o'clock,
//! increasing clockwise, in radians.

use std::f64::consts::{PI, TAU};
use std::fmt::Write;

/// Polyline through `points`. A `None` point breaks the line, so gaps in a
/// series show as gaps rather than being bridged.
pub fn line_path(points: &[Option<(f64, f64)>]) -> String {
    let mut d = String::new();
    let mut pen_down = false;
    for point in points {
        match point {
            Some((x, y)) => {
                let cmd = if pen_down { 'L' } else { 'M' };
                let _ = write!(d, "{}{:.2},{:.2}", cmd, x, y);
                pen_down = true;
            }
            None => pen_down = false,
        }
    }
    d
}

/// Closed area between `points` and the horizontal baseline `y0`.
pub fn area_path(points: &[(f64, f64)], y0: f64) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return String::new();
    };
    let mut d = format!("M{:.2},{:.2}", first.0, y0);
    for (x, y) in points {
        let _ = write!(d, "L{:.2},{:.2}", x, y);
    }
    let _ = write!(d, "L{:.2},{:.2}Z", last.0, y0);
    d
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieSlice {
    pub index: usize,
    pub value: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl PieSlice {
    pub fn span(&self) -> f64 {
        self.end_angle - self.start_angle
    }
}

/// Lay `values` out around a full circle in input order. Negative values
/// are treated as zero; an all-zero input gives zero-width slices.
pub fn pie(values: &[f64]) -> Vec<PieSlice> {
    let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
    let mut angle = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let value = value.max(0.0);
            let span = if total > 0.0 { value / total * TAU } else { 0.0 };
            let slice = PieSlice {
                index,
                value,
                start_angle: angle,
                end_angle: angle + span,
            };
            angle += span;
            slice
        })
        .collect()
}

/// Annular sector generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub inner_radius: f64,
    pub outer_radius: f64,
}

fn polar(radius: f64, angle: f64) -> (f64, f64) {
    (radius * angle.sin(), -radius * angle.cos())
}

impl Arc {
    pub fn new(inner_radius: f64, outer_radius: f64) -> Self {
        Self {
            inner_radius,
            outer_radius,
        }
    }

    /// Path data for `slice`, centred on the origin.
    pub fn path(&self, slice: &PieSlice) -> String {
        let span = slice.span();
        if span <= 0.0 {
            return String::new();
        }
        if span >= TAU - 1e-9 {
            return self.ring();
        }

        let large = if span > PI { 1 } else { 0 };
        let (r0, r1) = (self.inner_radius, self.outer_radius);
        let (ox0, oy0) = polar(r1, slice.start_angle);
        let (ox1, oy1) = polar(r1, slice.end_angle);
        let mut d = format!(
            "M{:.2},{:.2}A{:.2},{:.2} 0 {} 1 {:.2},{:.2}",
            ox0, oy0, r1, r1, large, ox1, oy1
        );
        if r0 > 0.0 {
            let (ix1, iy1) = polar(r0, slice.end_angle);
            let (ix0, iy0) = polar(r0, slice.start_angle);
            let _ = write!(
                d,
                "L{:.2},{:.2}A{:.2},{:.2} 0 {} 0 {:.2},{:.2}Z",
                ix1, iy1, r0, r0, large, ix0, iy0
            );
        } else {
            d.push_str("L0,0Z");
        }
        d
    }

    /// A single full-circle slice: SVG arcs can't start and end on the same
    /// point, so each circle is drawn as two half arcs.
    fn ring(&self) -> String {
        let (r0, r1) = (self.inner_radius, self.outer_radius);
        let mut d = format!(
            "M0,{:.2}A{:.2},{:.2} 0 1 1 0,{:.2}A{:.2},{:.2} 0 1 1 0,{:.2}Z",
            -r1, r1, r1, r1, r1, r1, -r1
        );
        if r0 > 0.0 {
            let _ = write!(
                d,
                "M0,{:.2}A{:.2},{:.2} 0 1 0 0,{:.2}A{:.2},{:.2} 0 1 0 0,{:.2}Z",
                -r0, r0, r0, r0, r0, r0, -r0
            );
        }
        d
    }

    /// Midpoint of the slice, halfway between the radii.
    pub fn centroid(&self, slice: &PieSlice) -> (f64, f64) {
        let angle = (slice.start_angle + slice.end_angle) / 2.0;
        polar((self.inner_radius + self.outer_radius) / 2.0, angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_path_breaks_on_gaps() {
        let d = line_path(&[Some((0.0, 1.0)), Some((2.0, 3.0)), None, Some((4.0, 5.0))]);
        assert_eq!(d, "M0.00,1.00L2.00,3.00M4.00,5.00");
        assert_eq!(line_path(&[]), "");
    }

    #[test]
    fn test_area_path() {
        let d = area_path(&[(0.0, 10.0), (5.0, 2.0)], 20.0);
        assert_eq!(d, "M0.00,20.00L0.00,10.00L5.00,2.00L5.00,20.00Z");
        assert_eq!(area_path(&[], 0.0), "");
    }

    #[test]
    fn test_pie_angles_cover_circle_in_order() {
        let slices = pie(&[1.0, 3.0]);
        assert_eq!(slices[0].start_angle, 0.0);
        assert!((slices[0].end_angle - TAU / 4.0).abs() < 1e-12);
        assert_eq!(slices[1].start_angle, slices[0].end_angle);
        assert!((slices[1].end_angle - TAU).abs() < 1e-12);
    }

    #[test]
    fn test_pie_all_zero() {
        let slices = pie(&[0.0, 0.0]);
        assert!(slices.iter().all(|s| s.span() == 0.0));
        assert_eq!(Arc::new(5.0, 10.0).path(&slices[0]), "");
    }

    #[test]
    fn test_arc_path_and_centroid() {
        let arc = Arc::new(50.0, 100.0);
        let quarter = PieSlice {
            index: 0,
            value: 1.0,
            start_angle: 0.0,
            end_angle: PI / 2.0,
        };
        let d = arc.path(&quarter);
        assert!(d.starts_with("M0.00,-100.00A100.00,100.00 0 0 1 100.00,"));
        assert!(d.ends_with("Z"));

        let (cx, cy) = arc.centroid(&quarter);
        let expected = 75.0 * (PI / 4.0).sin();
        assert!((cx - expected).abs() < 1e-9);
        assert!((cy + expected).abs() < 1e-9);
    }

    #[test]
    fn test_full_circle_is_drawn_as_ring() {
        let arc = Arc::new(50.0, 100.0);
        let slices = pie(&[7.0]);
        let d = arc.path(&slices[0]);
        assert_eq!(d.matches('A').count(), 4);
    }
}
