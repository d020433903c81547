//! Time-window predicate over a recording's time axis.
//!
//! [`TimeWindow::accept`] must be driven over a non-decreasing time sequence.
//! With an `interval`, it keeps the first sample at or after each sampling
//! tick `start, start + interval, start + 2*interval, ...`, rejecting samples
//! strictly between ticks; `start`/`end` bound the window inclusively.

/// Stateful acceptance test for time values.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    start: Option<f64>,
    end: Option<f64>,
    interval: Option<f64>,
    /// Next sampling tick; set on the first in-range time.
    marker: Option<f64>,
    /// Time accepted for the current tick, cleared once a later time shows up.
    last: Option<f64>,
}

impl TimeWindow {
    pub fn new(start: Option<f64>, end: Option<f64>, interval: Option<f64>) -> Self {
        Self { start, end, interval, marker: None, last: None }
    }

    /// Does this window filter anything at all?
    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some() || self.interval.is_some()
    }

    /// Accept or reject the next time value.
    pub fn accept(&mut self, t: f64) -> bool {
        let in_range =
            self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t <= e);
        if in_range && self.marker.is_none() {
            self.marker = Some(t);
        }
        let (Some(interval), Some(marker)) = (self.interval, self.marker) else {
            return in_range;
        };
        match self.last {
            None => {
                let res = in_range && t >= marker;
                if res {
                    self.last = Some(t);
                    self.marker = Some(marker + interval);
                }
                res
            }
            Some(last) if t > last => {
                self.last = None;
                false
            }
            Some(_) => in_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(mut w: TimeWindow, times: &[f64]) -> Vec<f64> {
        times.iter().copied().filter(|&t| w.accept(t)).collect()
    }

    #[test]
    fn test_no_bounds_accepts_everything() {
        let w = TimeWindow::new(None, None, None);
        let times = [0.0, 0.5, 1.0, 2.0];
        assert_eq!(accepted(w, &times), times);
    }

    #[test]
    fn test_inclusive_start_end_window() {
        let w = TimeWindow::new(Some(2.0), Some(4.0), None);
        let times = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(accepted(w, &times), [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_interval_keeps_one_sample_per_tick() {
        // dense quarter steps, one survivor per half-unit tick
        let times: Vec<f64> = (0..=8).map(|i| i as f64 * 0.25).collect();
        let w = TimeWindow::new(None, None, Some(0.5));
        assert_eq!(accepted(w, &times), [0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_interval_window_one_per_subwindow() {
        let times: Vec<f64> = (0..=100).map(|i| i as f64 * 0.25).collect();
        let w = TimeWindow::new(Some(10.0), Some(20.0), Some(1.0));
        let got = accepted(w, &times);
        assert_eq!(got, (10..=20).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_sparse_times_skip_one_sample_after_gap() {
        // After a gap the first later sample only clears the tick state; the
        // sample after it is the one accepted.
        let times = [0.0, 0.9, 1.0, 2.5, 2.6];
        let w = TimeWindow::new(None, None, Some(1.0));
        assert_eq!(accepted(w, &times), [0.0, 1.0, 2.6]);
    }

    #[test]
    fn test_repeated_times_stay_accepted_within_tick() {
        // one row per object per step: equal times repeat
        let times = [0.0, 0.0, 1.0, 1.0];
        let w = TimeWindow::new(None, None, Some(1.0));
        assert_eq!(accepted(w, &times), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_inverted_window_yields_nothing() {
        let w = TimeWindow::new(Some(4.0), Some(2.0), None);
        assert_eq!(accepted(w, &[1.0, 2.0, 3.0, 4.0, 5.0]), Vec::<f64>::new());
    }

    #[test]
    fn test_marker_anchors_at_first_in_range_time() {
        // ticks anchor at start of the in-range data, not at zero
        let times = [3.0, 3.5, 4.0, 4.5, 5.0];
        let w = TimeWindow::new(Some(3.25), None, Some(1.0));
        assert_eq!(accepted(w, &times), [3.5, 4.5]);
    }
}
