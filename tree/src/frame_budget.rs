//! Wall-clock budget for cooperative rendering.
//!
//! A [`FrameBudget`] answers one question at every node boundary of a
//! [`RenderTask`](crate::RenderTask): has enough real time passed since the
//! last suspension that the host loop should get control back? The interval
//! is the reciprocal of the minimum acceptable frame rate.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct FrameBudget {
    interval: Option<Duration>,
    last_yield: Instant,
}

impl FrameBudget {
    /// A budget that never asks to suspend.
    pub fn unbounded() -> Self {
        Self {
            interval: None,
            last_yield: Instant::now(),
        }
    }

    /// Suspend whenever at least `interval` has elapsed since the last
    /// suspension. `Duration::ZERO` suspends at every check.
    pub fn from_interval(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            last_yield: Instant::now(),
        }
    }

    /// Budget derived from the lowest frame rate the host tolerates.
    ///
    /// A non-positive or non-finite rate disables suspension.
    pub fn from_min_frame_rate(frames_per_second: f32) -> Self {
        if frames_per_second.is_finite() && frames_per_second > 0.0 {
            Self::from_interval(Duration::from_secs_f64(1.0 / frames_per_second as f64))
        } else {
            Self::unbounded()
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Restart the clock, e.g. when a new operation begins.
    pub fn reset(&mut self) {
        self.last_yield = Instant::now();
    }

    /// Returns `true` (and restarts the clock) when the interval has elapsed.
    pub fn should_yield(&mut self) -> bool {
        let Some(interval) = self.interval else {
            return false;
        };
        let now = Instant::now();
        if now.duration_since(self.last_yield) >= interval {
            self.last_yield = now;
            true
        } else {
            false
        }
    }
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Hands control back to the executor exactly once.
///
/// The budget decision is made by the caller; this future only performs
/// the suspension.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`].
///
/// The first poll wakes itself and returns `Pending`; the second returns
/// `Ready`.
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
