//! Summary figures over the task collection, shown by `stats` and the dashboard.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::db::Database;
use crate::fields::{Priority, Status, SubSystem};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    /// Tasks not yet done.
    pub open: usize,
    pub off_track: usize,
    pub by_status: BTreeMap<Status, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_sub_system: BTreeMap<SubSystem, usize>,
    /// Submissions per (year, month), split by current status.
    pub by_month: BTreeMap<(i32, u32), BTreeMap<Status, usize>>,
}

impl Stats {
    pub fn of(db: &Database) -> Self {
        let mut stats = Stats { total: db.len(), ..Stats::default() };
        for t in &db.tasks {
            if t.status != Status::Done {
                stats.open += 1;
            }
            if !t.is_on_track {
                stats.off_track += 1;
            }
            *stats.by_status.entry(t.status).or_default() += 1;
            *stats.by_priority.entry(t.priority).or_default() += 1;
            *stats.by_sub_system.entry(t.sub_system).or_default() += 1;
            let month = (t.submission_date.year(), t.submission_date.month());
            *stats.by_month.entry(month).or_default().entry(t.status).or_default() += 1;
        }
        stats
    }

    pub fn count_status(&self, status: Status) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn count_priority(&self, priority: Priority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::{date, sample_task};

    #[test]
    fn test_counts() {
        let mut db = Database::default();
        let mut a = sample_task(1, Status::Done, date(27, 2, 2025), 1);
        a.priority = Priority::High;
        let mut b = sample_task(2, Status::InProgress, date(3, 3, 2025), 1);
        b.is_on_track = false;
        let c = sample_task(3, Status::InProgress, date(4, 3, 2025), 1);
        for t in [a, b, c] {
            db.append(t).unwrap();
        }

        let stats = Stats::of(&db);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.off_track, 1);
        assert_eq!(stats.count_status(Status::InProgress), 2);
        assert_eq!(stats.count_status(Status::NotStarted), 0);
        assert_eq!(stats.count_priority(Priority::High), 1);
        assert_eq!(stats.by_month[&(2025, 3)][&Status::InProgress], 2);
        assert_eq!(stats.by_month[&(2025, 2)][&Status::Done], 1);
    }
}
