//! Derived-field calculation.
//!
//! `expected_end_date` follows from the starting date and the duration;
//! `is_on_track` compares it against "now" at day granularity. Both are cached on
//! the task and must be refreshed through this module whenever an input changes.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::fields::Status;
use crate::task::Task;

/// End date implied by a start and a duration in days.
pub fn expected_end_date(starting_date: NaiveDate, duration: u32) -> NaiveDate {
    starting_date + Duration::days(i64::from(duration))
}

/// A task is late only when it is unfinished and `today` is strictly past its
/// expected end. Without an expected end there is nothing to be late for.
pub fn is_on_track(status: Status, expected_end: Option<NaiveDate>, today: NaiveDate) -> bool {
    match expected_end {
        Some(end) => !(today > end && status != Status::Done),
        None => true,
    }
}

/// Return a copy of `task` with its derived fields brought up to date.
pub fn recompute(task: &Task, now: NaiveDateTime) -> Task {
    let mut out = task.clone();
    refresh(&mut out, now);
    out
}

/// In-place variant of [`recompute`].
pub fn refresh(task: &mut Task, now: NaiveDateTime) {
    task.expected_end_date = task
        .starting_date
        .map(|start| expected_end_date(start, task.duration));
    task.is_on_track = is_on_track(task.status, task.expected_end_date, now.date());
}

/// Refresh every task, e.g. right after a load.
pub fn refresh_all(tasks: &mut [Task], now: NaiveDateTime) {
    for task in tasks.iter_mut() {
        refresh(task, now);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fields::{Priority, SubSystem};

    pub(crate) fn date(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn at_noon(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(12, 0, 0).unwrap()
    }

    pub(crate) fn sample_task(id: u64, status: Status, start: NaiveDate, duration: u32) -> Task {
        Task {
            id,
            description: format!("task {id}"),
            sub_system: SubSystem::Hv,
            status,
            priority: Priority::Medium,
            contact_person: "Marion".into(),
            duration,
            starting_date: Some(start),
            submission_date: start,
            expected_end_date: None,
            actual_end_date: None,
            is_on_track: true,
            last_edited: at_noon(start),
        }
    }

    #[test]
    fn test_late_task_in_progress() {
        let task = sample_task(1, Status::InProgress, date(13, 3, 2025), 1);
        let out = recompute(&task, at_noon(date(20, 3, 2025)));
        assert_eq!(out.expected_end_date, Some(date(14, 3, 2025)));
        assert!(!out.is_on_track);
    }

    #[test]
    fn test_done_is_always_on_track() {
        let task = sample_task(1, Status::Done, date(13, 3, 2025), 1);
        for now in [date(1, 1, 2020), date(14, 3, 2025), date(31, 12, 2030)] {
            assert!(recompute(&task, at_noon(now)).is_on_track);
        }
    }

    #[test]
    fn test_due_today_is_on_track() {
        let task = sample_task(1, Status::NotStarted, date(13, 3, 2025), 1);
        let end_of_day = date(14, 3, 2025).and_hms_opt(23, 59, 59).unwrap();
        assert!(recompute(&task, end_of_day).is_on_track);
        assert!(!recompute(&task, at_noon(date(15, 3, 2025))).is_on_track);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let task = sample_task(3, Status::InProgress, date(1, 2, 2025), 40);
        let now = at_noon(date(20, 3, 2025));
        let once = recompute(&task, now);
        assert_eq!(recompute(&once, now), once);
    }

    #[test]
    fn test_no_start_date_has_no_expected_end() {
        let mut task = sample_task(1, Status::InProgress, date(13, 3, 2025), 1);
        task.starting_date = None;
        task.expected_end_date = Some(date(1, 1, 2000));
        let out = recompute(&task, at_noon(date(20, 3, 2025)));
        assert_eq!(out.expected_end_date, None);
        assert!(out.is_on_track);
    }

    #[test]
    fn test_end_date_crosses_month() {
        assert_eq!(expected_end_date(date(27, 2, 2025), 10), date(9, 3, 2025));
        assert_eq!(expected_end_date(date(27, 2, 2025), 0), date(27, 2, 2025));
    }
}
