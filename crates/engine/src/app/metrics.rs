use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn recover_poisoned<G>(operation: &'static str, poisoned: PoisonError<G>) -> G {
    if !POISON_WARNED.swap(true, Ordering::Relaxed) {
        warn!(operation, "loop_metrics_lock_poisoned");
    }
    poisoned.into_inner()
}

/// Rolling loop statistics over one reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub worst_frame_ms: f32,
    pub dropped_backlog_ms: u64,
}

/// Shared read side of the loop statistics, cloneable into the scene or tests.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self
            .latest
            .read()
            .unwrap_or_else(|poisoned| recover_poisoned("read", poisoned))
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        let mut guard = self
            .latest
            .write()
            .unwrap_or_else(|poisoned| recover_poisoned("write", poisoned));
        *guard = snapshot;
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    window_start: Instant,
    window: Duration,
    frames: u32,
    ticks: u32,
    frame_total: Duration,
    worst_frame: Duration,
    dropped: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(window: Duration) -> Self {
        Self::starting_at(Instant::now(), window)
    }

    fn starting_at(window_start: Instant, window: Duration) -> Self {
        Self {
            window_start,
            window,
            frames: 0,
            ticks: 0,
            frame_total: Duration::ZERO,
            worst_frame: Duration::ZERO,
            dropped: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_total = self.frame_total.saturating_add(frame_dt);
        self.worst_frame = self.worst_frame.max(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn record_dropped(&mut self, backlog: Duration) {
        self.dropped = self.dropped.saturating_add(backlog);
    }

    /// Closes the window and returns its statistics once `window` has elapsed.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            worst_frame_ms: self.worst_frame.as_secs_f32() * 1000.0,
            dropped_backlog_ms: self.dropped.as_millis() as u64,
        };
        *self = Self::starting_at(now, self.window);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison(handle: &MetricsHandle) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = handle.latest.write().expect("write guard");
                    panic!("poison loop metrics");
                })
                .join();
        });
    }

    #[test]
    fn window_reports_rates_and_worst_frame() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(2));
        for frame_ms in [10, 30, 20] {
            accumulator.record_frame(Duration::from_millis(frame_ms));
        }
        for _ in 0..120 {
            accumulator.record_tick();
        }
        accumulator.record_dropped(Duration::from_millis(40));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(1500))
            .is_none());
        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("window elapsed");

        assert!((snapshot.fps - 1.5).abs() < 0.01);
        assert!((snapshot.tps - 60.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.001);
        assert!((snapshot.worst_frame_ms - 30.0).abs() < 0.001);
        assert_eq!(snapshot.dropped_backlog_ms, 40);
    }

    #[test]
    fn counters_reset_after_each_window() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(50));
        accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("first window");

        let next = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second window");
        assert_eq!(next.fps, 0.0);
        assert_eq!(next.frame_time_ms, 0.0);
        assert_eq!(next.worst_frame_ms, 0.0);
    }

    #[test]
    fn poisoned_handle_still_reads_and_publishes() {
        let handle = MetricsHandle::default();
        poison(&handle);
        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());

        let published = LoopMetricsSnapshot {
            fps: 58.0,
            tps: 60.0,
            frame_time_ms: 17.2,
            worst_frame_ms: 21.0,
            dropped_backlog_ms: 0,
        };
        handle.publish(published);
        assert_eq!(handle.snapshot(), published);
    }
}
