//! Performance measurement tools.

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    time::{Duration, Instant},
};

/// Smoothed frames-per-second accounting for emitted payloads.
///
/// Every tick converts the time since the previous tick into an instantaneous
/// 1/Δt sample and pushes it into a bounded window; the reported value is the
/// window mean. The first tick has no preceding interval and reports 0.
pub struct SmoothedFps {
    window: usize,
    samples: VecDeque<f32>,
    last: Option<Instant>,
}

impl SmoothedFps {
    pub fn new(window: usize) -> Self {
        assert!(window > 0);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            last: None,
        }
    }

    /// Records a tick at `now` and returns the smoothed FPS.
    pub fn tick(&mut self, now: Instant) -> f32 {
        if let Some(last) = self.last.replace(now) {
            let dt = now.saturating_duration_since(last).as_secs_f32();
            let instantaneous = if dt > 0.0 { 1.0 / dt } else { 0.0 };
            self.samples.push_back(instantaneous);
            if self.samples.len() > self.window {
                self.samples.pop_front();
            }
        }
        self.current()
    }

    /// The current window mean without recording a tick.
    pub fn current(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }
}

/// A timer that can measure and average the time an operation takes.
///
/// Collected timings are averaged and reset when the timer is displayed using
/// `{}` ([`std::fmt::Display`]). Retention is capped; once full, the oldest
/// recording is dropped, so a timer that is never displayed stays at constant
/// memory.
pub struct Timer {
    name: &'static str,
    durations: RefCell<VecDeque<Duration>>,
}

/// Recordings a [`Timer`] retains between displays.
const TIMER_CAPACITY: usize = 256;

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            durations: RefCell::new(VecDeque::new()),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&self, start: Instant) {
        let mut durations = self.durations.borrow_mut();
        if durations.len() == TIMER_CAPACITY {
            durations.pop_front();
        }
        durations.push_back(start.elapsed());
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut durations = self.durations.borrow_mut();
        let len = durations.len();
        let total: Duration = durations.drain(..).sum();
        let avg_ms = if len == 0 {
            0.0
        } else {
            total.as_secs_f32() * 1000.0 / len as f32
        };
        write!(f, "{}: {len}x{avg_ms:.01}ms", self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}
