use hifitime::Unit;

use crate::{constants::SPAN_SLACK_S as SLACK_S, precise::samples::Series, prelude::Epoch};

/// Window placement strategy
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Window centered on the query
    Centered,
    /// Queries move forward: window leans to the future
    Forward,
    /// Queries move backward: window leans to the past
    Backward,
}

/// Why a window could not be formed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Shortfall {
    /// Not enough samples
    Insufficient { needed: usize, available: usize },
    /// Query outside of the sampled span
    OutOfSpan,
}

/// Sample window: `len` successive samples starting at `start`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Window {
    pub start: usize,
    pub len: usize,
    /// Window touches the first sample of the series
    pub head: bool,
    /// Window touches the last sample of the series
    pub tail: bool,
}

impl Window {
    /// Plans a window of (up to) `size` samples to evaluate the series at `t`.
    /// `minimum` is the minimal number of samples the series must hold.
    pub fn plan<T>(
        series: &Series<T>,
        t: Epoch,
        size: usize,
        minimum: usize,
        direction: Direction,
    ) -> Result<Self, Shortfall> {
        let available = series.len();
        let needed = minimum.max(2);

        if available < needed {
            return Err(Shortfall::Insufficient { needed, available });
        }

        let (first, last) = match (series.first_epoch(), series.last_epoch()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Shortfall::Insufficient { needed, available }),
        };

        if t < first - SLACK_S * Unit::Second || t > last + SLACK_S * Unit::Second {
            return Err(Shortfall::OutOfSpan);
        }

        let len = size.min(available).max(2);
        let j = series.last_before(t).unwrap_or(0) as isize;
        let (w, q) = (len as isize, (len / 4) as isize);

        let start = match direction {
            Direction::Centered => j - (w - 1) / 2,
            Direction::Forward => j - q,
            Direction::Backward => j + 1 - (w - 1 - q),
        };

        let start = start.clamp(0, (available - len) as isize) as usize;

        Ok(Self {
            start,
            len,
            head: start == 0,
            tail: start + len == available,
        })
    }

    /// Index of the last sample
    pub fn end(&self) -> usize {
        self.start + self.len - 1
    }

    /// Validity zone of a fit formed over this window: the central half,
    /// extended to the series boundary on a clamped side, with slack.
    pub fn zone<T>(&self, series: &Series<T>) -> (Epoch, Epoch) {
        let q = self.len / 4;

        let lower = if self.head {
            series.epoch(self.start)
        } else {
            series.epoch(self.start + q)
        };

        let upper = if self.tail {
            series.epoch(self.end())
        } else {
            series.epoch(self.end() - q)
        };

        (
            lower - SLACK_S * Unit::Second,
            upper + SLACK_S * Unit::Second,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::TimeScale;
    use rstest::*;

    fn series(n: usize) -> (Epoch, Series<f64>) {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2022, 6, 1).to_time_scale(TimeScale::GPST);
        let mut series = Series::default();
        for i in 0..n {
            series.insert(t0 + (i as f64 * 900.0) * Unit::Second, i as f64, false);
        }
        (t0, series)
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(450.0, 0)]
    #[case(4.0 * 900.0 + 100.0, 0)]
    #[case(10.0 * 900.0 + 100.0, 6)]
    #[case(20.0 * 900.0 + 100.0, 16)]
    #[case(29.0 * 900.0, 20)]
    fn centered_windows(#[case] offset_s: f64, #[case] start: usize) {
        let (t0, series) = series(30);
        let t = t0 + offset_s * Unit::Second;
        let window = Window::plan(&series, t, 10, 9, Direction::Centered).unwrap();

        assert_eq!(window.start, start, "t0+{}s", offset_s);
        assert_eq!(window.len, 10);

        let (lower, upper) = window.zone(&series);
        assert!(t >= lower && t <= upper, "t0+{}s not covered", offset_s);
    }

    #[test]
    fn short_series() {
        let (t0, series) = series(9);
        let window = Window::plan(&series, t0 + 1800.0 * Unit::Second, 10, 9, Direction::Centered)
            .unwrap();
        assert_eq!(window.start, 0);
        assert_eq!(window.len, 9);
        assert!(window.head && window.tail);

        // whole series is valid
        let (lower, upper) = window.zone(&series);
        assert_eq!(lower, t0 - SLACK_S * Unit::Second);
        assert_eq!(upper, t0 + (8.0 * 900.0 + SLACK_S) * Unit::Second);

        let (_, series) = self::series(8);
        assert_eq!(
            Window::plan(&series, t0, 10, 9, Direction::Centered),
            Err(Shortfall::Insufficient {
                needed: 9,
                available: 8
            })
        );
    }

    #[test]
    fn outside_span() {
        let (t0, series) = series(12);
        for offset_s in [-0.3, -900.0, 11.0 * 900.0 + 0.3, 86400.0] {
            assert_eq!(
                Window::plan(&series, t0 + offset_s * Unit::Second, 10, 9, Direction::Centered),
                Err(Shortfall::OutOfSpan),
                "t0{:+}s",
                offset_s
            );
        }
        for offset_s in [-0.2, 11.0 * 900.0 + 0.2] {
            assert!(
                Window::plan(&series, t0 + offset_s * Unit::Second, 10, 9, Direction::Centered)
                    .is_ok()
            );
        }
    }

    #[test]
    fn sliding_windows() {
        let (t0, series) = series(100);
        let t = t0 + (40.0 * 900.0 + 10.0) * Unit::Second;

        let forward = Window::plan(&series, t, 24, 12, Direction::Forward).unwrap();
        assert_eq!(forward.start, 34);
        let (lower, upper) = forward.zone(&series);
        assert_eq!(lower, series.epoch(40) - SLACK_S * Unit::Second);
        assert_eq!(upper, series.epoch(51) + SLACK_S * Unit::Second);

        let backward = Window::plan(&series, t, 24, 12, Direction::Backward).unwrap();
        assert_eq!(backward.end(), 47);
        let (lower, upper) = backward.zone(&series);
        assert!(t >= lower && t <= upper);
        assert_eq!(upper, series.epoch(41) + SLACK_S * Unit::Second);
    }
}
