//! Retention policy for snapshots.
//!
//! Each snapshot is judged on its own creation date against "now":
//! - the 1st of January is always kept
//! - the 1st of every month is always kept
//! - every day of the current calendar month is kept
//! - anything else is deleted
//!
//! Dates are compared in UTC, both the snapshot's and "now". The host's local
//! time zone plays no part, so around midnight at a month boundary the
//! current month is the UTC one: at 00:30 on March 1st in UTC+2 it is still
//! February, and February snapshots are kept.
//!
//! The January rule is already covered by the month rule; it stays as its own
//! branch so the yearly anchor is explicit.

use chrono::{DateTime, Datelike, Utc};

/// Source of the current time used for retention decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant, for tests and reproducible dry runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Why a snapshot survives a purge pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    NewYear,
    MonthStart,
    CurrentMonth,
}

/// Evaluate the policy, returning the first matching keep rule.
pub fn keep_reason(created: DateTime<Utc>, now: DateTime<Utc>) -> Option<KeepReason> {
    if created.month() == 1 && created.day() == 1 {
        return Some(KeepReason::NewYear);
    }
    if created.day() == 1 {
        return Some(KeepReason::MonthStart);
    }
    if created.year() == now.year() && created.month() == now.month() {
        return Some(KeepReason::CurrentMonth);
    }
    None
}

/// True when a snapshot created at `created` must be kept.
pub fn should_keep(created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    keep_reason(created, now).is_some()
}
