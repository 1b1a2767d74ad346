use std::time::{Duration, Instant};

const DEFAULT_MAX_FRAME_DELTA_MS: u64 = 250;

/// Timestamps handed to every per-frame operation, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Time since the clock started.
    pub now_ms: f64,
    /// Clamped time since the previous frame.
    pub delta_ms: f64,
}

impl FrameTime {
    pub fn new(now_ms: f64, delta_ms: f64) -> Self {
        Self { now_ms, delta_ms }
    }
}

/// Turns monotonic instants into `FrameTime`. A long stall (debugger, window
/// drag) shows up as one `max_frame_delta` step rather than a huge jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    max_frame_delta: Duration,
}

impl FrameClock {
    pub fn new(max_frame_delta: Duration) -> Self {
        Self::starting_at(Instant::now(), max_frame_delta)
    }

    pub fn starting_at(start: Instant, max_frame_delta: Duration) -> Self {
        Self {
            start,
            last: start,
            max_frame_delta: normalize_non_zero_duration(
                max_frame_delta,
                Duration::from_millis(DEFAULT_MAX_FRAME_DELTA_MS),
            ),
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let raw_frame_dt = now.saturating_duration_since(self.last);
        self.last = now;
        let frame_dt = clamp_frame_delta(raw_frame_dt, self.max_frame_delta);
        FrameTime {
            now_ms: duration_ms(now.saturating_duration_since(self.start)),
            delta_ms: duration_ms(frame_dt),
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
