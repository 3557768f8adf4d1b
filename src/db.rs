//! In-memory task collection and utility functions.
//!
//! This module provides the `Database` struct that owns the live task table for
//! a session, along with helpers for date parsing and table formatting used by
//! the command-line surface.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::derive;
use crate::error::TaskError;
use crate::task::{FieldEdit, Task};

/// Display format for calendar dates, as used by the dashboard and the store.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Ordered in-memory task table, most recent submission first.
///
/// Rows only reach the backing store when the session commits.
#[derive(Debug, Default, Clone)]
pub struct Database {
    pub tasks: Vec<Task>,
    /// Ids up to this value belong to stored rows that could not be loaded.
    reserved_up_to: u64,
}

impl Database {
    /// Wrap tasks loaded from the store, keeping their order.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Database { tasks, reserved_up_to: 0 }
    }

    /// Keep new ids clear of `max_id`, the highest id held by unloaded rows.
    pub fn reserve_ids(mut self, max_id: Option<u64>) -> Self {
        self.reserved_up_to = max_id.unwrap_or(0);
        self
    }

    /// Highest id a new task must exceed, if any id is taken.
    fn taken_up_to(&self) -> Option<u64> {
        match (self.max_id(), self.reserved_up_to) {
            (None, 0) => None,
            (max, reserved) => Some(max.unwrap_or(0).max(reserved)),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Highest id in the table, if any.
    pub fn max_id(&self) -> Option<u64> {
        self.tasks.iter().map(|t| t.id).max()
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.taken_up_to().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Insert a freshly created task at the head of the table.
    ///
    /// The id must be greater than every id already present.
    pub fn append(&mut self, task: Task) -> Result<(), TaskError> {
        if let Some(max) = self.taken_up_to() {
            if task.id <= max {
                return Err(TaskError::IdNotIncreasing { id: task.id, max });
            }
        }
        debug!(id = task.id, "task appended");
        self.tasks.insert(0, task);
        Ok(())
    }

    /// Apply one field edit. Trigger fields refresh the derived values of the row.
    pub fn edit(&mut self, id: u64, edit: FieldEdit, now: NaiveDateTime) -> Result<&Task, TaskError> {
        let task = self.get_mut(id).ok_or(TaskError::NotFound(id))?;
        let recompute = edit.triggers_recompute();
        debug!(id, field = edit.field_name(), recompute, "task edited");
        edit.apply_to(task);
        task.last_edited = now;
        if recompute {
            derive::refresh(task, now);
        }
        Ok(task)
    }

    /// Remove a task from the table and hand it back.
    pub fn delete(&mut self, id: u64) -> Result<Task, TaskError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))?;
        debug!(id, "task deleted");
        Ok(self.tasks.remove(idx))
    }

    /// Distinct contact persons, sorted.
    pub fn contact_persons(&self) -> BTreeSet<String> {
        self.tasks.iter().map(|t| t.contact_person.clone()).collect()
    }

    /// Smallest and largest duration present.
    pub fn duration_bounds(&self) -> Option<(u32, u32)> {
        let min = self.tasks.iter().map(|t| t.duration).min()?;
        let max = self.tasks.iter().map(|t| t.duration).max()?;
        Some((min, max))
    }
}

/// Parse a date typed by a user.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "in 3d", "in 2w"
/// - "DD-MM-YYYY" and "YYYY-MM-DD"
pub fn parse_date_input(s: &str, today: NaiveDate) -> Result<NaiveDate, TaskError> {
    let input = s.trim().to_lowercase();
    match input.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = input.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Ok(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Ok(today + Duration::weeks(weeks));
            }
        }
    }

    NaiveDate::parse_from_str(&input, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(&input, "%Y-%m-%d"))
        .map_err(|_| TaskError::Date(s.to_string()))
}

pub fn format_date(d: Option<NaiveDate>) -> String {
    match d {
        Some(d) => d.format(DATE_FORMAT).to_string(),
        None => "-".into(),
    }
}

/// Format an expected end relative to today ("today", "in 3d", "2d late").
pub fn format_end_relative(end: Option<NaiveDate>, today: NaiveDate) -> String {
    match end {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {delta}d")
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

pub fn format_on_track(on_track: bool) -> &'static str {
    if on_track {
        "yes"
    } else {
        "NO"
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task], today: NaiveDate) {
    println!(
        "{:<5} {:<19} {:<12} {:<7} {:<12} {:>4} {:<11} {:<10} {:<5} {}",
        "ID", "Sub-system", "Status", "Pri", "Contact", "Days", "Start", "End", "Track", "Description"
    );
    for t in tasks {
        println!(
            "{:<5} {:<19} {:<12} {:<7} {:<12} {:>4} {:<11} {:<10} {:<5} {}",
            t.id,
            t.sub_system.label(),
            t.status.label(),
            t.priority.label(),
            truncate(&t.contact_person, 12),
            t.duration,
            format_date(t.starting_date),
            format_end_relative(t.expected_end_date, today),
            format_on_track(t.is_on_track),
            truncate(&t.description, 48),
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::{at_noon, date, sample_task};
    use crate::fields::{Priority, Status};

    fn table() -> Database {
        let mut db = Database::default();
        for id in 1..=3 {
            let mut t = sample_task(id, Status::NotStarted, date(1, 3, 2025), 5);
            derive::refresh(&mut t, at_noon(date(1, 3, 2025)));
            db.append(t).unwrap();
        }
        db
    }

    #[test]
    fn test_append_puts_newest_first() {
        let db = table();
        let ids: Vec<u64> = db.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(db.next_id(), 4);
    }

    #[test]
    fn test_append_rejects_stale_id() {
        let mut db = table();
        let dup = sample_task(2, Status::Done, date(1, 3, 2025), 1);
        assert!(matches!(db.append(dup), Err(TaskError::IdNotIncreasing { id: 2, max: 3 })));
        assert_eq!(db.len(), 3);
    }

    #[test]
    fn test_reserved_ids_are_skipped() {
        let mut db = table().reserve_ids(Some(8));
        assert_eq!(db.next_id(), 9);
        let stale = sample_task(5, Status::Done, date(1, 3, 2025), 1);
        assert!(matches!(db.append(stale), Err(TaskError::IdNotIncreasing { id: 5, max: 8 })));
        assert_eq!(Database::default().reserve_ids(None).next_id(), 1);
    }

    #[test]
    fn test_edit_duration_moves_expected_end() {
        let mut db = table();
        let now = at_noon(date(4, 3, 2025));
        let task = db.edit(2, FieldEdit::Duration(12), now).unwrap();
        assert_eq!(task.expected_end_date, Some(date(13, 3, 2025)));
        assert_eq!(task.last_edited, now);
    }

    #[test]
    fn test_edit_status_refreshes_on_track() {
        let mut db = table();
        let late = at_noon(date(20, 3, 2025));
        assert!(!db.edit(1, FieldEdit::StartingDate(date(1, 3, 2025)), late).unwrap().is_on_track);
        assert!(db.edit(1, FieldEdit::Status(Status::Done), late).unwrap().is_on_track);
    }

    #[test]
    fn test_non_trigger_edit_keeps_cached_flag() {
        let mut db = table();
        let late = at_noon(date(20, 3, 2025));
        let task = db.edit(1, FieldEdit::Priority(Priority::High), late).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert!(task.is_on_track);
        assert_eq!(task.last_edited, late);
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let mut db = table();
        let now = at_noon(date(1, 3, 2025));
        assert!(matches!(db.edit(9, FieldEdit::Duration(1), now), Err(TaskError::NotFound(9))));
        assert!(matches!(db.delete(9), Err(TaskError::NotFound(9))));
        assert_eq!(db.delete(2).unwrap().id, 2);
        assert!(db.get(2).is_none());
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn test_parse_date_input() {
        let today = date(13, 3, 2025);
        assert_eq!(parse_date_input("13-03-2025", today).unwrap(), today);
        assert_eq!(parse_date_input("2025-03-14", today).unwrap(), date(14, 3, 2025));
        assert_eq!(parse_date_input("tomorrow", today).unwrap(), date(14, 3, 2025));
        assert_eq!(parse_date_input("in 2w", today).unwrap(), date(27, 3, 2025));
        assert!(parse_date_input("soon", today).is_err());
    }

    #[test]
    fn test_format_end_relative() {
        let today = date(13, 3, 2025);
        assert_eq!(format_end_relative(Some(date(10, 3, 2025)), today), "3d late");
        assert_eq!(format_end_relative(Some(today), today), "today");
        assert_eq!(format_end_relative(None, today), "-");
    }
}
