//! Deferred controller transitions keyed by wall-clock due time.

use chrono::{DateTime, Duration, Utc};

/// A transition the controller has scheduled for later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Synchronizing becomes Connected.
    CompleteSync,
    /// Shedding drops one level, if the latest reading still allows it.
    RestoreStep,
}

/// At most one pending entry per [`Transition`].
#[derive(Debug, Clone, Default)]
pub struct Timers {
    entries: Vec<(Transition, DateTime<Utc>)>,
}

impl Timers {
    /// Schedules `transition` at `due`, replacing any pending one of the same kind.
    pub fn schedule(&mut self, transition: Transition, due: DateTime<Utc>) {
        self.cancel(transition);
        self.entries.push((transition, due));
    }

    /// Drops a pending `transition`; returns whether one was pending.
    pub fn cancel(&mut self, transition: Transition) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(t, _)| *t != transition);
        self.entries.len() != before
    }

    pub fn is_pending(&self, transition: Transition) -> bool {
        self.entries.iter().any(|(t, _)| *t == transition)
    }

    /// Removes and returns the earliest transition due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (_, due))| *due <= now)
            .min_by_key(|(_, (_, due))| *due)
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(idx).0)
    }

    /// Earliest pending due time.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|(_, due)| *due).min()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// `now + delay_ms`, saturating at the latest representable instant.
pub(crate) fn after(now: DateTime<Utc>, delay_ms: u64) -> DateTime<Utc> {
    let delay = Duration::milliseconds(i64::try_from(delay_ms).unwrap_or(i64::MAX));
    now.checked_add_signed(delay)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
