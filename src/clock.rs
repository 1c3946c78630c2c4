//! Fixed-rate frame pacing.

use std::time::{Duration, Instant};

/// Longest frame step fed to animation time, so a stalled window does not
/// produce one giant jump.
const MAX_DT: f32 = 0.25;

/// Timing for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Seconds since the previous tick, clamped to 0.25 s.
    pub dt: f32,
    /// Wall-clock milliseconds since the clock started.
    pub elapsed_ms: f32,
    /// Cumulative animation time in seconds (sum of `dt`).
    pub time: f32,
    /// Frame index, starting at 1 for the first tick.
    pub frame: u64,
}

/// Drives the loop at a target frame rate and hands out frame timing.
#[derive(Clone, Debug)]
pub struct FrameClock {
    interval: Duration,
    start: Instant,
    last: Instant,
    time: f32,
    frame: u64,
}

impl FrameClock {
    pub fn new(target_fps: u32, start: Instant) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
            start,
            last: start,
            time: 0.0,
            frame: 0,
        }
    }

    /// Advance to `now`. Instants earlier than the previous tick count as zero.
    pub fn tick(&mut self, now: Instant) -> FrameTick {
        let dt = now
            .saturating_duration_since(self.last)
            .as_secs_f32()
            .min(MAX_DT);
        self.last = self.last.max(now);
        self.time += dt;
        self.frame += 1;

        FrameTick {
            dt,
            elapsed_ms: self.elapsed_ms(),
            time: self.time,
            frame: self.frame,
        }
    }

    /// Milliseconds between the start and the most recent tick.
    pub fn elapsed_ms(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32() * 1000.0
    }

    /// When the next frame is due.
    pub fn next_deadline(&self) -> Instant {
        self.last + self.interval
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_reports_dt_and_elapsed() {
        let start = Instant::now();
        let mut clock = FrameClock::new(60, start);

        let first = clock.tick(start + Duration::from_millis(16));
        assert!((first.dt - 0.016).abs() < 1e-4);
        assert!((first.elapsed_ms - 16.0).abs() < 1e-2);
        assert_eq!(first.frame, 1);

        let second = clock.tick(start + Duration::from_millis(50));
        assert!((second.dt - 0.034).abs() < 1e-4);
        assert!((second.elapsed_ms - 50.0).abs() < 1e-2);
        assert!((second.time - 0.050).abs() < 1e-4);
    }

    #[test]
    fn stalls_are_clamped_but_elapsed_is_not() {
        let start = Instant::now();
        let mut clock = FrameClock::new(60, start);
        let tick = clock.tick(start + Duration::from_secs(3));
        assert_eq!(tick.dt, MAX_DT);
        assert!((tick.elapsed_ms - 3000.0).abs() < 1e-1);
    }

    #[test]
    fn time_never_goes_backwards() {
        let start = Instant::now();
        let mut clock = FrameClock::new(60, start);
        clock.tick(start + Duration::from_millis(100));
        let tick = clock.tick(start + Duration::from_millis(40));
        assert_eq!(tick.dt, 0.0);
        assert!((tick.elapsed_ms - 100.0).abs() < 1e-2);
    }

    #[test]
    fn deadline_follows_target_rate() {
        let start = Instant::now();
        let mut clock = FrameClock::new(50, start);
        assert_eq!(clock.interval(), Duration::from_millis(20));
        clock.tick(start + Duration::from_millis(7));
        assert_eq!(
            clock.next_deadline(),
            start + Duration::from_millis(27)
        );
    }
}
