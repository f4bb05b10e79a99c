//! Ping/pong keepalive supervisor (§4.6). Invoked once per second by the
//! driving loop; owns no I/O itself; reports what the caller should do next.

use std::time::{Duration, Instant};

const PONG_GRACE: Duration = Duration::from_secs(5);
const MAX_CONSECUTIVE_TIMEOUTS: u32 = 2;

pub struct Keepalive {
    interval: Duration,
    last_ping: Instant,
    pong_pending: bool,
    consecutive_timeouts: u32,
}

pub enum Tick {
    Noop,
    SendPing,
    TimedOut,
}

impl Keepalive {
    /// `interval` of zero disables keepalive entirely (matches §4.6's
    /// `ping_interval <= 0` early return).
    pub fn new(interval: Duration, now: Instant) -> Keepalive {
        Keepalive {
            interval,
            last_ping: now,
            pong_pending: false,
            consecutive_timeouts: 0,
        }
    }

    pub fn on_pong(&mut self) {
        self.pong_pending = false;
        self.consecutive_timeouts = 0;
    }

    pub fn tick(&mut self, now: Instant) -> Tick {
        if self.interval.is_zero() {
            return Tick::Noop;
        }

        if self.pong_pending {
            if now.duration_since(self.last_ping) < PONG_GRACE {
                return Tick::Noop;
            }

            self.pong_pending = false;
            self.consecutive_timeouts += 1;

            if self.consecutive_timeouts > MAX_CONSECUTIVE_TIMEOUTS {
                return Tick::TimedOut;
            }
            return Tick::Noop;
        }

        if now.duration_since(self.last_ping) >= self.interval {
            self.last_ping = now;
            self.pong_pending = true;
            return Tick::SendPing;
        }

        Tick::Noop
    }

    pub fn consecutive_timeouts(&self) -> u32 {
        self.consecutive_timeouts
    }
}
