//! Scales: mappings from data space to pixel space.

use chrono::{DateTime, TimeZone, Utc};

/// Tick step for `count` ticks across `[start, stop]`, rounded to 1, 2, 5 or
/// 10 times a power of ten.
pub fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let span = (stop - start).abs();
    if span == 0.0 || count == 0 || !span.is_finite() {
        return 0.0;
    }
    let raw = span / count as f64;
    let power = raw.log10().floor();
    let base = 10f64.powf(power);
    let error = raw / base;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * base
}

/// Continuous linear mapping from `domain` to `range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Map `value` to the range. A collapsed domain maps everything to the
    /// middle of the range.
    pub fn scale(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Extend the domain outward to round tick values.
    pub fn nice(mut self, count: usize) -> Self {
        let (mut start, mut stop) = self.domain;
        let mut previous = 0.0;
        for _ in 0..10 {
            let step = tick_step(start, stop, count);
            if step == 0.0 || step == previous {
                break;
            }
            start = (start / step).floor() * step;
            stop = (stop / step).ceil() * step;
            previous = step;
        }
        self.domain = (start, stop);
        self
    }

    /// Roughly `count` round values inside the domain, ascending.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = if self.domain.0 <= self.domain.1 {
            self.domain
        } else {
            (self.domain.1, self.domain.0)
        };
        let step = tick_step(lo, hi, count);
        if step == 0.0 {
            return vec![lo];
        }
        let first = (lo / step).ceil() as i64;
        let last = (hi / step).floor() as i64;
        (first..=last).map(|i| i as f64 * step).collect()
    }
}

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

const TIME_TICK_INTERVALS: &[i64] = &[
    MINUTE_MS,
    5 * MINUTE_MS,
    15 * MINUTE_MS,
    30 * MINUTE_MS,
    HOUR_MS,
    3 * HOUR_MS,
    6 * HOUR_MS,
    12 * HOUR_MS,
    DAY_MS,
    2 * DAY_MS,
    7 * DAY_MS,
    30 * DAY_MS,
];

/// Linear mapping over UTC instants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    inner: LinearScale,
}

impl TimeScale {
    pub fn new(domain: (DateTime<Utc>, DateTime<Utc>), range: (f64, f64)) -> Self {
        let domain = (
            domain.0.timestamp_millis() as f64,
            domain.1.timestamp_millis() as f64,
        );
        Self {
            inner: LinearScale::new(domain, range),
        }
    }

    /// Scale spanning the earliest to latest of `times`. `None` when empty.
    pub fn from_extent<I>(times: I, range: (f64, f64)) -> Option<Self>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut iter = times.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Some(Self::new((min, max), range))
    }

    pub fn scale(&self, time: DateTime<Utc>) -> f64 {
        self.inner.scale(time.timestamp_millis() as f64)
    }

    /// Tick instants on a calendar-friendly interval, at most about `count`.
    pub fn ticks(&self, count: usize) -> Vec<DateTime<Utc>> {
        let (d0, d1) = self.inner.domain();
        let (lo, hi) = (d0.min(d1) as i64, d0.max(d1) as i64);
        let span = hi - lo;
        if span == 0 || count == 0 {
            return Utc.timestamp_millis_opt(lo).single().into_iter().collect();
        }
        let interval = TIME_TICK_INTERVALS
            .iter()
            .copied()
            .find(|&iv| span / iv <= count as i64)
            .unwrap_or_else(|| {
                let last = TIME_TICK_INTERVALS[TIME_TICK_INTERVALS.len() - 1];
                last * (span / (last * count as i64) + 1)
            });
        let first = lo.div_euclid(interval) * interval;
        let first = if first < lo { first + interval } else { first };
        (0..)
            .map(|i| first + i * interval)
            .take_while(|&ms| ms <= hi)
            .filter_map(|ms| Utc.timestamp_millis_opt(ms).single())
            .collect()
    }
}

/// Categorical scale dividing the range into equal bands.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    start: f64,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    /// `padding` is the fraction of each step left empty, both between bands
    /// and at the outer edges.
    pub fn new(domain: Vec<String>, range: (f64, f64), padding: f64) -> Self {
        let padding = padding.clamp(0.0, 1.0);
        let n = domain.len() as f64;
        let (r0, r1) = range;
        let step = (r1 - r0) / (n - padding + 2.0 * padding).max(1.0);
        let start = r0 + ((r1 - r0) - step * (n - padding)) / 2.0;
        Self {
            domain,
            start,
            step,
            bandwidth: step * (1.0 - padding),
        }
    }

    pub fn position(&self, key: &str) -> Option<f64> {
        self.domain
            .iter()
            .position(|k| k == key)
            .map(|i| self.start + self.step * i as f64)
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_scale_maps_and_inverts_range() {
        let y = LinearScale::new((0.0, 10.0), (200.0, 0.0));
        assert_eq!(y.scale(0.0), 200.0);
        assert_eq!(y.scale(10.0), 0.0);
        assert_eq!(y.scale(5.0), 100.0);
    }

    #[test]
    fn test_collapsed_domain_maps_to_middle() {
        let x = LinearScale::new((3.0, 3.0), (0.0, 100.0));
        assert_eq!(x.scale(3.0), 50.0);
    }

    #[test]
    fn test_nice_extends_domain() {
        let y = LinearScale::new((0.0, 97.0), (0.0, 1.0)).nice(5);
        assert_eq!(y.domain(), (0.0, 100.0));
        let y = LinearScale::new((0.0, 13.0), (0.0, 1.0)).nice(5);
        assert_eq!(y.domain(), (0.0, 14.0));
    }

    #[test]
    fn test_ticks() {
        let y = LinearScale::new((0.0, 100.0), (0.0, 1.0));
        assert_eq!(y.ticks(5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        let collapsed = LinearScale::new((4.0, 4.0), (0.0, 1.0));
        assert_eq!(collapsed.ticks(5), vec![4.0]);
    }

    #[test]
    fn test_time_scale_and_ticks() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap();
        let x = TimeScale::new((t0, t1), (0.0, 600.0));
        assert_eq!(x.scale(Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap()), 300.0);

        let ticks = x.ticks(6);
        assert_eq!(ticks.first(), Some(&t0));
        assert_eq!(ticks.last(), Some(&t1));
        assert_eq!(ticks.len(), 7);
    }

    #[test]
    fn test_time_scale_from_extent() {
        assert!(TimeScale::from_extent(Vec::new(), (0.0, 1.0)).is_none());
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let x = TimeScale::from_extent(vec![t], (0.0, 100.0)).unwrap();
        assert_eq!(x.scale(t), 50.0);
        assert_eq!(x.ticks(5), vec![t]);
    }

    #[test]
    fn test_band_scale() {
        let x = BandScale::new(vec!["200".into(), "404".into()], (0.0, 100.0), 0.0);
        assert_eq!(x.position("200"), Some(0.0));
        assert_eq!(x.position("404"), Some(50.0));
        assert_eq!(x.bandwidth(), 50.0);
        assert_eq!(x.position("500"), None);

        let padded = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0), 0.2);
        let a = padded.position("a").unwrap();
        let b = padded.position("b").unwrap();
        assert!(a > 0.0);
        assert!(b + padded.bandwidth() < 100.0);
        assert!((a - (100.0 - b - padded.bandwidth())).abs() < 1e-9);
    }
}
