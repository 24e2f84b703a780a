use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Deferred payloads ordered by due time. Payloads due at the same instant
/// come out in the order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: BTreeMap<(Instant, u64), T>,
    due_times: HashMap<u64, Instant>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
            due_times: HashMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Instant, payload: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((at, id), payload);
        self.due_times.insert(id, at);
        TimerId(id)
    }

    /// Returns the payload if the timer was still pending. Cancelling a timer
    /// that already fired or was already cancelled does nothing.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let at = self.due_times.remove(&id.0)?;
        self.entries.remove(&(at, id.0))
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_times.contains_key(&id.0)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    /// Removes and returns the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, T)> {
        let (&(at, id), _) = self.entries.first_key_value()?;
        if at > now {
            return None;
        }
        self.due_times.remove(&id);
        self.entries
            .remove(&(at, id))
            .map(|payload| (TimerId(id), payload))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pops_in_due_order() {
        let t0 = Instant::now();
        let mut timers = TimerQueue::new();
        timers.schedule(t0 + Duration::from_millis(30), "c");
        timers.schedule(t0 + Duration::from_millis(10), "a");
        timers.schedule(t0 + Duration::from_millis(20), "b");

        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(10)));
        assert!(timers.pop_due(t0).is_none());

        let later = t0 + Duration::from_millis(25);
        let fired: Vec<&str> = std::iter::from_fn(|| timers.pop_due(later))
            .map(|(_, p)| p)
            .collect();
        assert_eq!(fired, vec!["a", "b"]);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn same_instant_keeps_schedule_order() {
        let t0 = Instant::now();
        let mut timers = TimerQueue::new();
        for n in 0..5 {
            timers.schedule(t0, n);
        }
        let fired: Vec<i32> = std::iter::from_fn(|| timers.pop_due(t0))
            .map(|(_, p)| p)
            .collect();
        assert_eq!(fired, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let t0 = Instant::now();
        let mut timers = TimerQueue::new();
        let first = timers.schedule(t0, 1);
        let second = timers.schedule(t0 + Duration::from_millis(5), 2);

        assert_eq!(timers.cancel(second), Some(2));
        assert_eq!(timers.cancel(second), None);
        assert!(!timers.is_pending(second));

        let (id, payload) = timers.pop_due(t0).unwrap();
        assert_eq!((id, payload), (first, 1));
        assert_eq!(timers.cancel(first), None);
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
