//! Virtual clock and event queue.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

/// A scheduled process resumption.
///
/// Ordered by `(time, seq)`: earlier times dispatch first, and events
/// scheduled for the same instant dispatch in insertion order.
#[derive(Debug)]
struct EventEntry<P> {
    time: Duration,
    seq: u64,
    process: P,
}

impl<P> PartialEq for EventEntry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl<P> Eq for EventEntry<P> {}

impl<P> PartialOrd for EventEntry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for EventEntry<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// Virtual clock plus the pending-event queue.
///
/// The clock only moves when an event is popped or the scheduler is
/// explicitly advanced to a horizon; it never moves backwards.
#[derive(Debug)]
pub struct Scheduler<P> {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Reverse<EventEntry<P>>>,
}

impl<P> Scheduler<P> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Queue a resumption of `process` at `now + delay`. Non-blocking;
    /// a zero delay resumes at the current instant, after everything
    /// already queued for that instant.
    pub fn schedule(&mut self, delay: Duration, process: P) {
        let entry = EventEntry {
            time: self.now + delay,
            seq: self.next_seq,
            process,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Time of the earliest pending event, if any.
    pub fn peek_time(&self) -> Option<Duration> {
        self.queue.peek().map(|Reverse(e)| e.time)
    }

    /// Pop the earliest pending event and advance the clock to it.
    pub fn pop(&mut self) -> Option<P> {
        let Reverse(entry) = self.queue.pop()?;
        debug_assert!(entry.time >= self.now, "event queue went backwards");
        self.now = entry.time;
        Some(entry.process)
    }

    /// Advance the clock to `horizon` without dispatching anything.
    ///
    /// Panics if an event earlier than the horizon is still pending,
    /// since skipping it would lose a dispatch.
    pub fn advance_to(&mut self, horizon: Duration) {
        if let Some(t) = self.peek_time() {
            assert!(
                t >= horizon,
                "advance_to would skip a pending event at {t:?}"
            );
        }
        if horizon > self.now {
            self.now = horizon;
        }
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<P> Default for Scheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_advances_clock_in_time_order() {
        let mut sched = Scheduler::new();
        sched.schedule(Duration::from_secs(30), "late");
        sched.schedule(Duration::from_secs(10), "early");

        assert_eq!(sched.pop(), Some("early"));
        assert_eq!(sched.now(), Duration::from_secs(10));
        assert_eq!(sched.pop(), Some("late"));
        assert_eq!(sched.now(), Duration::from_secs(30));
        assert!(sched.is_idle());
    }

    #[test]
    fn test_same_instant_dispatches_in_insertion_order() {
        let mut sched = Scheduler::new();
        sched.schedule(Duration::from_secs(5), 1);
        sched.schedule(Duration::from_secs(5), 2);
        sched.schedule(Duration::from_secs(5), 3);

        assert_eq!(sched.pop(), Some(1));
        assert_eq!(sched.pop(), Some(2));
        assert_eq!(sched.pop(), Some(3));
    }

    #[test]
    fn test_zero_delay_lands_at_current_instant() {
        let mut sched = Scheduler::new();
        sched.schedule(Duration::from_secs(7), "a");
        sched.pop();
        sched.schedule(Duration::ZERO, "b");
        assert_eq!(sched.peek_time(), Some(Duration::from_secs(7)));
        assert_eq!(sched.pop(), Some("b"));
        assert_eq!(sched.now(), Duration::from_secs(7));
    }

    #[test]
    fn test_advance_to_pins_clock() {
        let mut sched: Scheduler<()> = Scheduler::new();
        sched.advance_to(Duration::from_secs(600));
        assert_eq!(sched.now(), Duration::from_secs(600));
        // Never backwards.
        sched.advance_to(Duration::from_secs(100));
        assert_eq!(sched.now(), Duration::from_secs(600));
    }

    #[test]
    #[should_panic(expected = "skip a pending event")]
    fn test_advance_past_pending_event_panics() {
        let mut sched = Scheduler::new();
        sched.schedule(Duration::from_secs(5), ());
        sched.advance_to(Duration::from_secs(10));
    }
}
