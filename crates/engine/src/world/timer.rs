use std::time::Duration;

/// Tick-driven stopwatch. Time only passes through [`Timer::advance`], which keeps
/// scripted waits deterministic under the fixed-step loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    running: bool,
    rate: f32,
    elapsed: Duration,
    target: Duration,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            running: false,
            rate: 1.0,
            elapsed: Duration::ZERO,
            target: Duration::ZERO,
        }
    }
}

impl Timer {
    pub fn new(target: Duration) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn started(target: Duration) -> Self {
        Self {
            running: true,
            ..Self::new(target)
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Zeroes the elapsed time and keeps the running state.
    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    pub fn set_target(&mut self, target: Duration) {
        self.target = target;
    }

    pub fn advance(&mut self, dt: Duration) {
        if !self.running || self.rate == 0.0 {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(scale_duration(dt, self.rate));
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.target
    }

    pub fn percent(&self) -> f32 {
        if self.target.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.target.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// `dt * factor`, saturating at `Duration::MAX` where `Duration::mul_f32` would panic.
pub(crate) fn scale_duration(dt: Duration, factor: f32) -> Duration {
    Duration::try_from_secs_f64(dt.as_secs_f64() * factor as f64).unwrap_or(if factor > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_timer_does_not_advance() {
        let mut timer = Timer::new(Duration::from_millis(100));
        timer.advance(Duration::from_millis(500));
        assert_eq!(timer.elapsed(), Duration::ZERO);
        assert!(!timer.finished());
    }

    #[test]
    fn rate_scales_elapsed_time() {
        let mut timer = Timer::started(Duration::from_millis(100));
        timer.set_rate(2.0);
        timer.advance(Duration::from_millis(30));
        assert_eq!(timer.elapsed(), Duration::from_millis(60));
        timer.advance(Duration::from_millis(20));
        assert!(timer.finished());
    }

    #[test]
    fn pause_and_resume_keep_elapsed() {
        let mut timer = Timer::started(Duration::from_secs(1));
        timer.advance(Duration::from_millis(250));
        timer.stop();
        timer.advance(Duration::from_millis(250));
        timer.start();
        timer.advance(Duration::from_millis(250));
        assert_eq!(timer.elapsed(), Duration::from_millis(500));
        assert!((timer.percent() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn restart_zeroes_without_stopping() {
        let mut timer = Timer::started(Duration::from_millis(10));
        timer.advance(Duration::from_millis(20));
        timer.restart();
        assert!(timer.is_running());
        assert!(!timer.finished());
    }

    #[test]
    fn negative_rate_is_clamped() {
        let mut timer = Timer::started(Duration::from_millis(10));
        timer.set_rate(-3.0);
        timer.advance(Duration::from_millis(20));
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn huge_rate_saturates_instead_of_overflowing() {
        let mut timer = Timer::started(Duration::from_secs(1));
        timer.set_rate(f32::MAX);
        timer.advance(Duration::from_secs(60));
        timer.advance(Duration::from_secs(60));
        assert_eq!(timer.elapsed(), Duration::MAX);
        assert!(timer.finished());
    }

    #[test]
    fn scale_duration_matches_plain_multiplication_in_range() {
        assert_eq!(
            scale_duration(Duration::from_millis(250), 2.0),
            Duration::from_millis(500)
        );
        assert_eq!(scale_duration(Duration::from_secs(1), 0.0), Duration::ZERO);
        assert_eq!(scale_duration(Duration::from_secs(1), 1.0e30), Duration::MAX);
    }
}
