//! Error type shared by the collection, the submission workflow and the store.

use thiserror::Error;

use crate::config::Schema;

/// Message shown when a submission is missing a required field.
pub const FILL_ALL_FIELDS: &str = "Please fill in all fields.";

#[derive(Debug, Error)]
pub enum TaskError {
    /// A required submission field is empty. Carries the user-facing message.
    #[error("{0}")]
    Validation(String),

    #[error("task {0} not found")]
    NotFound(u64),

    #[error("a submission is already being validated")]
    SubmissionLocked,

    #[error("no submission is being validated")]
    SubmissionNotLocked,

    #[error("task id {id} is not greater than existing id {max}")]
    IdNotIncreasing { id: u64, max: u64 },

    #[error("field '{field}' is not stored by the {schema} schema")]
    FieldUnavailable { field: &'static str, schema: Schema },

    #[error("invalid date '{0}' (expected DD-MM-YYYY, YYYY-MM-DD, today, tomorrow, yesterday or 'in Nd')")]
    Date(String),

    #[error("{rows} stored row(s) could not be read; refusing to overwrite them")]
    UnreadableStore { rows: usize },

    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    pub fn missing_fields() -> Self {
        TaskError::Validation(FILL_ALL_FIELDS.to_string())
    }
}
