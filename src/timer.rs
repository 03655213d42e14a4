//! Stopwatch with accumulator and optional extended statistics.
//!
//! Mirrors the original `timing` class: a cycle is `start()` -> `stop()`,
//! `average()` drains the accumulator, and `extended_info()` drains the
//! retained sample vector. These are two independent reductions over the
//! same stream of intervals and must not be chained expecting one to see
//! data already consumed by the other.

use std::time::{Duration, Instant};

/// Percentile / min / max / sample standard deviation over retained
/// intervals. All fields are `None` when fewer than two samples were
/// available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedInfo {
    pub percentile: f64,
    pub percentile_val: Option<Duration>,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
    pub std_dev: Option<Duration>,
}

impl ExtendedInfo {
    fn none(percentile: f64) -> Self {
        ExtendedInfo {
            percentile,
            percentile_val: None,
            min: None,
            max: None,
            std_dev: None,
        }
    }
}

pub struct Timer {
    start: Option<Instant>,
    acc: Duration,
    count: u64,
    samples: Vec<Duration>,
    extended: bool,
}

impl Timer {
    pub fn new(extended: bool) -> Self {
        Timer {
            start: None,
            acc: Duration::ZERO,
            count: 0,
            samples: Vec::new(),
            extended,
        }
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Stop the current cycle, accumulate it, and return the elapsed
    /// interval. Panics if `start` was never called — matching the
    /// original's unconditional read of `m_tstart`.
    pub fn stop(&mut self) -> Duration {
        let tstart = self.start.take().expect("stop() called without start()");
        let interval = tstart.elapsed();

        self.acc += interval;
        self.count += 1;

        if self.extended {
            self.samples.push(interval);
        }

        interval
    }

    /// Average interval since the last `average()` call, draining the
    /// accumulator. Returns `None` when no cycle has completed.
    pub fn average(&mut self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let average = self.acc / self.count as u32;
        self.acc = Duration::ZERO;
        self.count = 0;
        Some(average)
    }

    /// Percentile/min/max/std-dev over retained samples, draining them.
    /// `percentile` must be in `[0, 1]`. Requires `extended` mode and at
    /// least two samples; otherwise returns an all-`None` sentinel.
    pub fn extended_info(&mut self, percentile: f64) -> ExtendedInfo {
        if !self.extended || self.samples.len() <= 1 || !(0.0..=1.0).contains(&percentile) {
            return ExtendedInfo::none(percentile);
        }

        let n = self.samples.len();
        let pos = (n as f64 * percentile).ceil() as usize;
        let pos = pos.max(1).min(n);

        self.samples.select_nth_unstable(pos - 1);
        let percentile_val = self.samples[pos - 1];

        let min = *self.samples.iter().min().unwrap();
        let max = *self.samples.iter().max().unwrap();

        let mean_nanos: f64 = self.samples.iter().map(|d| d.as_nanos() as f64).sum::<f64>() / n as f64;
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|d| {
                let diff = d.as_nanos() as f64 - mean_nanos;
                diff * diff
            })
            .sum();
        let std_dev_nanos = (sum_sq / (n as f64 - 1.0)).sqrt();

        self.samples.clear();

        ExtendedInfo {
            percentile,
            percentile_val: Some(percentile_val),
            min: Some(min),
            max: Some(max),
            std_dev: Some(Duration::from_nanos(std_dev_nanos as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn average_is_none_with_no_cycles() {
        let mut timer = Timer::new(false);
        assert_eq!(timer.average(), None);
    }

    #[test]
    fn average_drains_accumulator() {
        let mut timer = Timer::new(false);
        timer.start();
        timer.stop();
        timer.start();
        timer.stop();
        assert!(timer.average().is_some());
        // draining means a second call with no new cycles returns None.
        assert_eq!(timer.average(), None);
    }

    #[test]
    fn extended_info_requires_extended_mode() {
        let mut timer = Timer::new(false);
        timer.start();
        timer.stop();
        timer.start();
        timer.stop();
        let info = timer.extended_info(0.9);
        assert_eq!(info.percentile_val, None);
    }

    #[test]
    fn extended_info_requires_two_samples() {
        let mut timer = Timer::new(true);
        timer.start();
        timer.stop();
        let info = timer.extended_info(0.9);
        assert_eq!(info.min, None);
    }

    #[test]
    fn extended_info_computes_and_drains() {
        let mut timer = Timer::new(true);
        for _ in 0..5 {
            timer.start();
            sleep(Duration::from_micros(50));
            timer.stop();
        }
        let info = timer.extended_info(0.5);
        assert!(info.percentile_val.is_some());
        assert!(info.min.unwrap() <= info.max.unwrap());
        assert!(info.std_dev.is_some());

        // samples were drained; a second call sees nothing.
        let drained = timer.extended_info(0.5);
        assert_eq!(drained.min, None);
    }

    #[test]
    fn average_and_extended_track_independent_streams() {
        let mut timer = Timer::new(true);
        timer.start();
        timer.stop();
        timer.start();
        timer.stop();

        // draining average must not clear the retained samples.
        assert!(timer.average().is_some());
        let info = timer.extended_info(1.0);
        assert!(info.min.is_some());
    }
}
