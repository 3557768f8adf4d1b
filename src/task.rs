//! Task data structure.
//!
//! This module defines the `Task` record tracked during test-beam preparation,
//! together with the `FieldEdit` mutations the collection accepts after creation.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// One unit of trackable preparation work.
///
/// `expected_end_date` and `is_on_track` are cached derived values: they are
/// only refreshed through [`crate::derive::recompute`]. Under the flat schema the
/// date fields stay `None` and the task counts as on track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub sub_system: SubSystem,
    pub status: Status,
    pub priority: Priority,
    pub contact_person: String,
    /// Planned length of the task in days.
    pub duration: u32,
    pub starting_date: Option<NaiveDate>,
    pub submission_date: NaiveDate,
    pub expected_end_date: Option<NaiveDate>,
    /// `None` until somebody records the real end.
    pub actual_end_date: Option<NaiveDate>,
    pub is_on_track: bool,
    pub last_edited: NaiveDateTime,
}

/// A single field mutation on an existing task.
///
/// Description, sub-system, id and submission date are fixed at creation and
/// have no variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Status(Status),
    Priority(Priority),
    Duration(u32),
    StartingDate(NaiveDate),
    ContactPerson(String),
    ActualEndDate(Option<NaiveDate>),
}

impl FieldEdit {
    /// Whether this edit changes an input of the derived fields.
    pub fn triggers_recompute(&self) -> bool {
        matches!(
            self,
            FieldEdit::Status(_) | FieldEdit::Duration(_) | FieldEdit::StartingDate(_)
        )
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            FieldEdit::Status(_) => "status",
            FieldEdit::Priority(_) => "priority",
            FieldEdit::Duration(_) => "duration",
            FieldEdit::StartingDate(_) => "starting_date",
            FieldEdit::ContactPerson(_) => "contact_person",
            FieldEdit::ActualEndDate(_) => "actual_end_date",
        }
    }

    /// Write the new value into `task`. Derived fields are left to the caller.
    pub fn apply_to(self, task: &mut Task) {
        match self {
            FieldEdit::Status(s) => task.status = s,
            FieldEdit::Priority(p) => task.priority = p,
            FieldEdit::Duration(d) => task.duration = d,
            FieldEdit::StartingDate(d) => task.starting_date = Some(d),
            FieldEdit::ContactPerson(c) => task.contact_person = c.trim().to_string(),
            FieldEdit::ActualEndDate(d) => task.actual_end_date = d,
        }
    }
}
