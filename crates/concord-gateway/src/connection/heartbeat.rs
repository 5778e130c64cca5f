//! Heartbeat scheduler
//!
//! Pure bookkeeping: the driver sleeps until [`Heartbeat::deadline`] and
//! reports ticks and acks back.

use std::time::Duration;
use tokio::time::Instant;

/// Result of a heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Send a heartbeat now
    Beat,
    /// The previous heartbeat was never acknowledged
    Zombied,
}

/// Heartbeat state of one connection
#[derive(Debug, Default)]
pub struct Heartbeat {
    interval: Option<Duration>,
    ack_pending: bool,
    last_sent_at: Option<Instant>,
    last_ack_at: Option<Instant>,
    next_beat: Option<Instant>,
    latency: Option<Duration>,
}

impl Heartbeat {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start beating every `interval`, the first beat after
    /// `interval * jitter` (`jitter` in `[0, 1)`)
    pub fn start(&mut self, interval: Duration, jitter: f64, now: Instant) {
        let jitter = jitter.clamp(0.0, 1.0);
        self.interval = Some(interval);
        self.ack_pending = false;
        self.last_sent_at = None;
        self.last_ack_at = None;
        self.next_beat = Some(now + interval.mul_f64(jitter));
    }

    pub fn stop(&mut self) {
        self.interval = None;
        self.next_beat = None;
        self.ack_pending = false;
    }

    pub fn is_running(&self) -> bool {
        self.next_beat.is_some()
    }

    /// When the next tick is due
    pub fn deadline(&self) -> Option<Instant> {
        self.next_beat
    }

    pub fn on_tick(&mut self, now: Instant) -> HeartbeatTick {
        if self.ack_pending {
            self.stop();
            return HeartbeatTick::Zombied;
        }

        self.ack_pending = true;
        self.last_sent_at = Some(now);
        self.next_beat = self.interval.map(|interval| now + interval);
        HeartbeatTick::Beat
    }

    /// Record an ack; returns the round trip of the last heartbeat
    pub fn on_ack(&mut self, now: Instant) -> Option<Duration> {
        self.ack_pending = false;
        self.last_ack_at = Some(now);
        self.latency = self.last_sent_at.map(|sent| now.saturating_duration_since(sent));
        self.latency
    }

    pub fn ack_pending(&self) -> bool {
        self.ack_pending
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Latest measured round trip
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    pub fn last_ack_at(&self) -> Option<Instant> {
        self.last_ack_at
    }
}
