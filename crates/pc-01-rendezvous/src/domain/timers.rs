//! Timer bookkeeping.
//!
//! The scheduler only knows timer ids; what a timer means lives here. A
//! cancelled timer is simply forgotten, so when it fires later `take`
//! returns `None` and the firing is ignored: whichever of the timer and the
//! event it guards happens first wins.

use shared_types::NodeId;
use std::collections::HashMap;
use std::fmt;

/// Opaque timer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// What to do once an election backoff elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextStep {
    /// Claim failed: dial the coordinator.
    Join,
    /// Partner lost: try to claim the rendezvous identity again.
    Claim,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKind {
    ElectionBackoff(NextStep),
    LivenessSweep,
    ReconnectDeadline(NodeId),
    JoinTimeout,
    PairAckTimeout,
}

/// Timers that are armed and not yet fired or cancelled.
#[derive(Debug, Default)]
pub struct PendingTimers {
    next_id: u64,
    armed: HashMap<TimerId, TimerKind>,
}

impl PendingTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new timer and return the id to schedule it under.
    pub fn arm(&mut self, kind: TimerKind) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.armed.insert(id, kind);
        id
    }

    /// Claim a fired timer. `None` if it was cancelled.
    pub fn take(&mut self, id: TimerId) -> Option<TimerKind> {
        self.armed.remove(&id)
    }

    /// Cancel every timer of `kind`. Returns how many were armed.
    pub fn cancel(&mut self, kind: &TimerKind) -> usize {
        self.cancel_where(|k| k == kind)
    }

    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&TimerKind) -> bool) -> usize {
        let before = self.armed.len();
        self.armed.retain(|_, kind| !predicate(kind));
        before - self.armed.len()
    }

    pub fn is_armed(&self, kind: &TimerKind) -> bool {
        self.armed.values().any(|k| k == kind)
    }

    /// Oldest armed timer of `kind`.
    pub fn id_of(&self, kind: &TimerKind) -> Option<TimerId> {
        self.armed
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(id, _)| *id)
            .min()
    }

    /// How many armed timers match `predicate`.
    pub fn count_where(&self, predicate: impl Fn(&TimerKind) -> bool) -> usize {
        self.armed.values().filter(|k| predicate(k)).count()
    }

    /// Any election backoff pending, whatever its next step.
    pub fn backoff_pending(&self) -> bool {
        self.count_where(|k| matches!(k, TimerKind::ElectionBackoff(_))) > 0
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_timer_is_ignored_on_fire() {
        let mut timers = PendingTimers::new();
        let id = timers.arm(TimerKind::JoinTimeout);

        assert_eq!(timers.cancel(&TimerKind::JoinTimeout), 1);
        assert_eq!(timers.take(id), None);
    }

    #[test]
    fn test_fired_timer_taken_once() {
        let mut timers = PendingTimers::new();
        let id = timers.arm(TimerKind::LivenessSweep);

        assert_eq!(timers.take(id), Some(TimerKind::LivenessSweep));
        assert_eq!(timers.take(id), None);
    }

    #[test]
    fn test_cancel_where_targets_one_partner() {
        let mut timers = PendingTimers::new();
        timers.arm(TimerKind::ReconnectDeadline(NodeId::from("a")));
        timers.arm(TimerKind::ReconnectDeadline(NodeId::from("b")));

        let removed =
            timers.cancel_where(|k| *k == TimerKind::ReconnectDeadline(NodeId::from("a")));
        assert_eq!(removed, 1);
        assert!(timers.is_armed(&TimerKind::ReconnectDeadline(NodeId::from("b"))));
    }

    #[test]
    fn test_backoff_pending() {
        let mut timers = PendingTimers::new();
        assert!(!timers.backoff_pending());
        timers.arm(TimerKind::ElectionBackoff(NextStep::Claim));
        assert!(timers.backoff_pending());
    }
}
