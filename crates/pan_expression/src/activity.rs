use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

const NEVER: i64 = -1;

/// Proof that no foreground activity happened since it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityTicket {
    epoch: u64,
}

/// Shared record of when the user was last active.
///
/// Times are milliseconds since the clock was created, measured on tokio's
/// clock so paused-time tests can drive it.
pub struct ActivityClock {
    origin: Instant,
    epoch: AtomicU64,
    last_activity_ms: AtomicI64,
    last_unprompted_ms: AtomicI64,
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            epoch: AtomicU64::new(0),
            last_activity_ms: AtomicI64::new(0),
            last_unprompted_ms: AtomicI64::new(NEVER),
        }
    }

    fn now_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }

    /// Record foreground activity. Invalidates every outstanding ticket.
    pub fn touch(&self) -> u64 {
        self.last_activity_ms.store(self.now_ms(), Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn ticket(&self) -> ActivityTicket {
        ActivityTicket {
            epoch: self.epoch(),
        }
    }

    pub fn is_current(&self, ticket: &ActivityTicket) -> bool {
        self.epoch() == ticket.epoch
    }

    pub fn idle_for(&self) -> Duration {
        let since = self.now_ms() - self.last_activity_ms.load(Ordering::SeqCst);
        Duration::from_millis(since.max(0) as u64)
    }

    /// Time since the last unprompted reply, `None` if there never was one.
    pub fn since_unprompted(&self) -> Option<Duration> {
        match self.last_unprompted_ms.load(Ordering::SeqCst) {
            NEVER => None,
            at => Some(Duration::from_millis((self.now_ms() - at).max(0) as u64)),
        }
    }

    /// Record an idle firing. Restarts the idle baseline but leaves the
    /// epoch alone, so outstanding tickets stay valid.
    pub fn mark_unprompted(&self) {
        let now = self.now_ms();
        self.last_unprompted_ms.store(now, Ordering::SeqCst);
        self.last_activity_ms.store(now, Ordering::SeqCst);
    }

    /// Idle long enough and quiet long enough since the last unprompted reply.
    pub fn should_fire(&self, idle_threshold: Duration, min_interval: Duration) -> bool {
        self.idle_for() >= idle_threshold
            && self.since_unprompted().map_or(true, |d| d >= min_interval)
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}
