use std::time::{Duration, Instant};

/// A 64-bit monotonic timer handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TimerId(u64);

struct TimerEntry {
    id: TimerId,
    fire_at: Instant,
    period: Option<Duration>,
}

/// An ordered list of pending timers, keyed by next-fire time. Insertion
/// is O(n), but n (the number of pending timers) is expected to stay
/// small, so this stays a plain `Vec` rather than a hierarchical timing
/// wheel.
#[derive(Default)]
pub struct TimerWheel {
    next_id: u64,
    rolled_over: bool,
    timers: Vec<TimerEntry>,
}

impl TimerWheel {
    pub fn new() -> Self {
        TimerWheel {
            next_id: 0,
            rolled_over: false,
            timers: Vec::new(),
        }
    }

    fn alloc_id(&mut self) -> TimerId {
        let mut id = self.next_id;
        if self.rolled_over {
            while self.timers.iter().any(|t| t.id.0 == id) {
                id = id.wrapping_add(1);
            }
        }
        self.next_id = match id.checked_add(1) {
            Some(next) => next,
            None => {
                self.rolled_over = true;
                0
            }
        };
        TimerId(id)
    }

    fn insert_sorted(&mut self, entry: TimerEntry) {
        let pos = self.timers.partition_point(|t| t.fire_at <= entry.fire_at);
        self.timers.insert(pos, entry);
    }

    /// Registers a one-shot timer firing `after` from `now`.
    pub fn set(&mut self, now: Instant, after: Duration) -> TimerId {
        let id = self.alloc_id();
        self.insert_sorted(TimerEntry {
            id,
            fire_at: now + after,
            period: None,
        });
        id
    }

    /// Registers a repeating timer, re-queued with the same period each
    /// time it fires.
    pub fn set_repeating(&mut self, now: Instant, every: Duration) -> TimerId {
        let id = self.alloc_id();
        self.insert_sorted(TimerEntry {
            id,
            fire_at: now + every,
            period: Some(every),
        });
        id
    }

    /// Cancels a pending timer. Safe to call from within a handler that is
    /// itself reacting to a different timer firing.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Adjusts a timer's next fire time, preserving its id and period.
    pub fn adjust(&mut self, now: Instant, id: TimerId, after: Duration) -> bool {
        let Some(pos) = self.timers.iter().position(|t| t.id == id) else {
            return false;
        };
        let entry = self.timers.remove(pos);
        self.insert_sorted(TimerEntry {
            id,
            fire_at: now + after,
            period: entry.period,
        });
        true
    }

    /// The delay until the next timer fires, for use as the poll timeout.
    pub fn next_delay(&self, now: Instant) -> Option<Duration> {
        self.timers.first().map(|t| t.fire_at.saturating_duration_since(now))
    }

    /// Pops every timer due at or before `now`, re-queuing repeating ones.
    pub fn drain_due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due = Vec::new();
        while let Some(front) = self.timers.first() {
            if front.fire_at > now {
                break;
            }
            let entry = self.timers.remove(0);
            due.push(entry.id);
            if let Some(period) = entry.period {
                self.insert_sorted(TimerEntry {
                    id: entry.id,
                    fire_at: now + period,
                    period: Some(period),
                });
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
