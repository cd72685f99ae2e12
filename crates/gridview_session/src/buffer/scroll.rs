//! Delayed scroll dispatch.
//!
//! Scroll events arrive far more often than fetches should be planned. A slow
//! scroll fires immediately; a fast scroll, or one arriving while a fetch is
//! still being processed, is debounced until the fire interval passes without
//! another event.

use gridview_core::GridConfig;
use std::time::{Duration, Instant};

/// What the caller should do with a scroll event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollDecision {
    /// Plan a fetch for this scroll offset now.
    Fire(f64),
    /// Wait until `at`; a newer event replaces this one.
    Deferred { scroll_top: f64, at: Instant },
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    scroll_top: f64,
    received: Instant,
    at: Instant,
}

/// Velocity-aware throttle for scroll events.
#[derive(Debug)]
pub struct ScrollThrottle {
    fire_interval: Duration,
    velocity_limit: f64,
    anchor_top: f64,
    anchor_at: Instant,
    processing: bool,
    pending: Option<Pending>,
}

impl ScrollThrottle {
    pub fn new(config: &GridConfig, now: Instant) -> Self {
        Self {
            fire_interval: config.scroll_fire_interval,
            velocity_limit: config.scroll_velocity_limit,
            anchor_top: 0.0,
            anchor_at: now,
            processing: false,
            pending: None,
        }
    }

    /// Forget all history, as when a new table is opened.
    pub fn reset(&mut self, now: Instant) {
        self.anchor_top = 0.0;
        self.anchor_at = now;
        self.processing = false;
        self.pending = None;
    }

    /// Mark whether a scroll-triggered fetch is in flight.
    pub fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Register a scroll event at `now`.
    pub fn on_scroll(&mut self, scroll_top: f64, now: Instant) -> ScrollDecision {
        let elapsed = now.saturating_duration_since(self.anchor_at);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let velocity = (scroll_top - self.anchor_top).abs() / elapsed_ms;

        if !self.processing && elapsed > self.fire_interval && velocity < self.velocity_limit {
            self.pending = None;
            self.fire(scroll_top, now);
            return ScrollDecision::Fire(scroll_top);
        }
        // Keep measuring velocity over roughly the last interval only.
        if elapsed > self.fire_interval {
            self.anchor_top = scroll_top;
            self.anchor_at = now;
        }
        let at = now + self.fire_interval;
        self.pending = Some(Pending {
            scroll_top,
            received: now,
            at,
        });
        ScrollDecision::Deferred { scroll_top, at }
    }

    /// When the deferred event is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.at)
    }

    /// Take the deferred scroll offset once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<f64> {
        let pending = self.pending.filter(|pending| pending.at <= now)?;
        self.pending = None;
        self.fire(pending.scroll_top, pending.received);
        Some(pending.scroll_top)
    }

    fn fire(&mut self, scroll_top: f64, at: Instant) {
        self.anchor_top = scroll_top;
        self.anchor_at = at;
    }
}
