//! Physics tick timer and render throttle
//!
//! Two independent clocks: a fixed-interval auto-update timer that steps the
//! layout, and a frame-rate cap that coalesces redraw requests. Time is passed
//! in by the caller so the scheduler never blocks and stays deterministic.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Interval between layout ticks
    pub tick_interval_ms: u64,
    /// Maximum redraws per second
    pub frame_rate: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            frame_rate: 30,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

/// Handle of a running auto-update timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AutoUpdateTimer {
    next_tick: Instant,
}

/// What is due at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Due {
    /// Step the layout once
    pub tick: bool,
    /// Build a snapshot and render it
    pub redraw: bool,
}

#[derive(Debug, Clone)]
pub struct SimulationScheduler {
    tick_interval: Duration,
    frame_interval: Duration,
    /// `Some` exactly while the simulation is running
    timer: Option<AutoUpdateTimer>,
    /// Whether timer ticks should step the layout (false once settled)
    awake: bool,
    pending_redraw: Option<Instant>,
    last_draw: Option<Instant>,
}

impl SimulationScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            frame_interval: config.frame_interval(),
            timer: None,
            awake: true,
            pending_redraw: None,
            last_draw: None,
        }
    }

    /// Start the auto-update timer. No-op if already running.
    pub fn start_auto_update(&mut self, now: Instant) {
        if self.timer.is_none() {
            self.timer = Some(AutoUpdateTimer {
                next_tick: now + self.tick_interval,
            });
        }
    }

    /// Stop the auto-update timer. Idempotent.
    pub fn stop_auto_update(&mut self) {
        self.timer = None;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Resume stepping the layout on timer ticks
    pub fn wake(&mut self) {
        self.awake = true;
    }

    /// Stop stepping the layout until woken
    pub fn sleep(&mut self) {
        self.awake = false;
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Ask for a redraw.
    ///
    /// Requests are coalesced: at most one redraw is pending, due once a full
    /// frame interval has passed since the previous one.
    pub fn request_redraw(&mut self, now: Instant) {
        if self.pending_redraw.is_some() {
            return;
        }
        let due = match self.last_draw {
            Some(last) => (last + self.frame_interval).max(now),
            None => now,
        };
        self.pending_redraw = Some(due);
    }

    pub fn has_pending_redraw(&self) -> bool {
        self.pending_redraw.is_some()
    }

    /// Advance to `now` and report what is due.
    ///
    /// At most one tick fires per call; ticks missed while the caller was
    /// late are dropped rather than replayed.
    pub fn poll(&mut self, now: Instant) -> Due {
        let mut due = Due::default();

        if let Some(timer) = &mut self.timer {
            if now >= timer.next_tick {
                timer.next_tick += self.tick_interval;
                if timer.next_tick <= now {
                    timer.next_tick = now + self.tick_interval;
                }
                due.tick = self.awake;
            }
        }

        if let Some(at) = self.pending_redraw {
            if now >= at {
                self.pending_redraw = None;
                self.last_draw = Some(now);
                due.redraw = true;
            }
        }

        due
    }

    /// Earliest instant at which [`SimulationScheduler::poll`] has work
    pub fn next_deadline(&self) -> Option<Instant> {
        let tick = self.timer.map(|t| t.next_tick);
        match (tick, self.pending_redraw) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
