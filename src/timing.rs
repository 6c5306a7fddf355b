use std::time::{Duration, Instant};

/// Holds the loop to a fixed tick rate by sleeping until the next tick is due.
pub struct FrameLimiter {
    period: Duration,
    next_tick: Instant,
    enabled: bool,
}

impl FrameLimiter {
    pub fn new(tick_rate: u32, enabled: bool) -> Self {
        let period = Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64);
        FrameLimiter {
            period,
            next_tick: Instant::now() + period,
            enabled,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleeps until the next tick. A loop that fell behind starts a fresh schedule
    /// instead of bursting to catch up.
    pub fn wait(&mut self) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        if now < self.next_tick {
            std::thread::sleep(self.next_tick - now);
            self.next_tick += self.period;
        } else {
            self.next_tick = now + self.period;
        }
    }
}

/// Smoothed frames-per-second from successive frame timestamps.
pub struct FpsCounter {
    last: Option<Instant>,
    fps: f32,
}

const FPS_SMOOTHING: f32 = 0.1;

impl FpsCounter {
    pub fn new() -> Self {
        FpsCounter { last: None, fps: 0.0 }
    }

    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last {
            let dt = now.saturating_duration_since(last).as_secs_f32();
            if dt > 0.0 {
                let instant_fps = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    instant_fps
                } else {
                    self.fps + FPS_SMOOTHING * (instant_fps - self.fps)
                };
            }
        }
        self.last = Some(now);
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_from_even_frame_spacing() {
        let mut counter = FpsCounter::new();
        let start = Instant::now();
        for i in 0..10 {
            counter.record(start + Duration::from_millis(20 * i));
        }
        assert!((counter.fps() - 50.0).abs() < 0.5);
    }

    #[test]
    fn first_frame_reports_zero() {
        let mut counter = FpsCounter::new();
        counter.record(Instant::now());
        assert_eq!(counter.fps(), 0.0);
    }

    #[test]
    fn limiter_sleeps_about_one_period() {
        let mut limiter = FrameLimiter::new(100, true);
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn disabled_limiter_does_not_sleep() {
        let mut limiter = FrameLimiter::new(1, false);
        let start = Instant::now();
        limiter.wait();
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
