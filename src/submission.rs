//! Submission workflow for new tasks.
//!
//! A `SubmissionWorkflow` holds the draft being typed in and walks through
//! `Editing -> Locked -> Committed -> Editing`. A rejected draft returns to
//! `Editing` with the error message kept for display; a committed one is turned
//! into a `Task`, appended to the collection, and the workflow starts a new
//! attempt with an empty draft.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::config::Schema;
use crate::db::Database;
use crate::derive;
use crate::error::TaskError;
use crate::fields::{Priority, Status, SubSystem};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Editing,
    Locked,
    Committed,
}

/// Field values of a submission in progress. Unset selections are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub description: String,
    pub sub_system: Option<SubSystem>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub contact_person: String,
    pub duration: Option<u32>,
    pub starting_date: Option<NaiveDate>,
}

impl SubmissionDraft {
    /// True when every field the schema requires has a value.
    pub fn is_complete(&self, schema: Schema) -> bool {
        let base = !self.description.trim().is_empty()
            && self.sub_system.is_some()
            && self.status.is_some()
            && self.priority.is_some()
            && !self.contact_person.trim().is_empty()
            && self.duration.is_some();
        match schema {
            Schema::Flat => base,
            Schema::Extended => base && self.starting_date.is_some(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionWorkflow {
    schema: Schema,
    state: SubmissionState,
    attempt: u64,
    error: Option<String>,
    pub draft: SubmissionDraft,
}

impl SubmissionWorkflow {
    pub fn new(schema: Schema) -> Self {
        SubmissionWorkflow {
            schema,
            state: SubmissionState::Editing,
            attempt: 0,
            error: None,
            draft: SubmissionDraft::default(),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Counter of successful submissions; gives each fresh form its identity.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Message of the last rejected submission, kept until the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Freeze the draft for validation. Only one submission may be in flight.
    pub fn lock(&mut self) -> Result<(), TaskError> {
        if self.state == SubmissionState::Locked {
            return Err(TaskError::SubmissionLocked);
        }
        self.state = SubmissionState::Locked;
        Ok(())
    }

    /// Validate the locked draft and, if complete, append the new task to `db`.
    ///
    /// Returns the id of the created task.
    pub fn finish(&mut self, db: &mut Database, now: NaiveDateTime) -> Result<u64, TaskError> {
        if self.state != SubmissionState::Locked {
            return Err(TaskError::SubmissionNotLocked);
        }
        if !self.draft.is_complete(self.schema) {
            let err = TaskError::missing_fields();
            self.error = Some(err.to_string());
            self.state = SubmissionState::Editing;
            debug!(attempt = self.attempt, "submission rejected: missing fields");
            return Err(err);
        }

        let task = match self.materialize(db.next_id(), now) {
            Some(task) => task,
            None => {
                self.state = SubmissionState::Editing;
                return Err(TaskError::missing_fields());
            }
        };
        let id = task.id;
        if let Err(e) = db.append(task) {
            self.state = SubmissionState::Editing;
            return Err(e);
        }

        self.state = SubmissionState::Committed;
        info!(id, attempt = self.attempt, "task submitted");
        self.reset();
        Ok(id)
    }

    /// Lock, validate and commit in one step.
    pub fn submit(&mut self, db: &mut Database, now: NaiveDateTime) -> Result<u64, TaskError> {
        self.lock()?;
        self.finish(db, now)
    }

    /// Start a new attempt with an empty draft.
    fn reset(&mut self) {
        self.attempt += 1;
        self.error = None;
        self.draft = SubmissionDraft::default();
        self.state = SubmissionState::Editing;
    }

    fn materialize(&self, id: u64, now: NaiveDateTime) -> Option<Task> {
        let d = &self.draft;
        let starting_date = match self.schema {
            Schema::Flat => None,
            Schema::Extended => Some(d.starting_date?),
        };
        let task = Task {
            id,
            description: d.description.trim().to_string(),
            sub_system: d.sub_system?,
            status: d.status?,
            priority: d.priority?,
            contact_person: d.contact_person.trim().to_string(),
            duration: d.duration?,
            starting_date,
            submission_date: now.date(),
            expected_end_date: None,
            actual_end_date: None,
            is_on_track: true,
            last_edited: now,
        };
        Some(derive::recompute(&task, now))
    }
}
