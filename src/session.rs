//! Session context: everything one user interaction cycle works on.
//!
//! A `Session` owns the store handle, the live task collection, the submission
//! workflow and the configuration. Every handler receives it explicitly; nothing
//! lives in process-wide state.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::config::{Config, OnTrackMode, Schema};
use crate::db::Database;
use crate::derive;
use crate::error::TaskError;
use crate::filter::{Projection, TaskFilter};
use crate::store::Store;
use crate::submission::SubmissionWorkflow;
use crate::task::{FieldEdit, Task};

pub struct Session {
    store: Store,
    db: Database,
    pub workflow: SubmissionWorkflow,
    on_track: OnTrackMode,
    dirty: bool,
    created: bool,
}

impl Session {
    /// Open the configured store (seeding it if it was just created), load every
    /// task and refresh derived fields against `now`.
    pub fn open(config: &Config, now: NaiveDateTime) -> Result<Self, TaskError> {
        let (store, created) = Store::open_or_create(&config.db_path, config.schema)?;
        if created {
            store.seed(now)?;
        }
        Ok(Self::from_store(store, created, config.on_track, now))
    }

    fn from_store(mut store: Store, created: bool, on_track: OnTrackMode, now: NaiveDateTime) -> Self {
        let mut tasks = store.load_all();
        derive::refresh_all(&mut tasks, now);
        info!(tasks = tasks.len(), created, "session opened");
        Session {
            workflow: SubmissionWorkflow::new(store.schema()),
            db: Database::from_tasks(tasks).reserve_ids(store.max_unreadable_id()),
            store,
            on_track,
            dirty: false,
            created,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn schema(&self) -> Schema {
        self.store.schema()
    }

    /// Whether the store file was created (and seeded) by this session.
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// Whether the collection has changes not yet committed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Submit the workflow's current draft.
    pub fn submit(&mut self, now: NaiveDateTime) -> Result<u64, TaskError> {
        let id = self.workflow.submit(&mut self.db, now)?;
        self.dirty = true;
        Ok(id)
    }

    pub fn edit(&mut self, id: u64, edit: FieldEdit, now: NaiveDateTime) -> Result<&Task, TaskError> {
        if self.schema() == Schema::Flat {
            if let FieldEdit::StartingDate(_) | FieldEdit::ActualEndDate(_) = edit {
                return Err(TaskError::FieldUnavailable { field: edit.field_name(), schema: Schema::Flat });
            }
        }
        let task = self.db.edit(id, edit, now)?;
        self.dirty = true;
        Ok(task)
    }

    pub fn delete(&mut self, id: u64) -> Result<Task, TaskError> {
        let task = self.db.delete(id)?;
        self.dirty = true;
        Ok(task)
    }

    /// Refresh derived fields of every task against `now` (live on-track mode).
    pub fn refresh(&mut self, now: NaiveDateTime) {
        if self.on_track == OnTrackMode::Live {
            debug!("refreshing on-track flags");
            derive::refresh_all(&mut self.db.tasks, now);
        }
    }

    /// Filtered view of the collection, refreshed first in live mode.
    pub fn view(&mut self, filter: &TaskFilter, now: NaiveDateTime) -> Projection<'_> {
        self.refresh(now);
        filter.apply(&self.db)
    }

    /// Write the whole collection back to the store.
    pub fn commit(&mut self) -> Result<(), TaskError> {
        self.store.commit(&self.db.tasks)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::{at_noon, date};
    use crate::fields::{Priority, Status, SubSystem};
    use crate::submission::SubmissionDraft;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path, schema: Schema, on_track: OnTrackMode) -> Config {
        Config::new(Some(dir.join("tasks_demo.db")), schema, on_track, false)
    }

    fn draft() -> SubmissionDraft {
        SubmissionDraft {
            description: "Book beam time".into(),
            sub_system: Some(SubSystem::Beamline),
            status: Some(Status::InProgress),
            priority: Some(Priority::High),
            contact_person: "Tom".into(),
            duration: Some(1),
            starting_date: Some(date(13, 3, 2025)),
        }
    }

    #[test]
    fn test_first_open_seeds_then_reopen_does_not() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), Schema::Extended, OnTrackMode::Cached);
        let now = at_noon(date(1, 3, 2025));
        let first = Session::open(&cfg, now).unwrap();
        assert!(first.was_created());
        assert_eq!(first.db().len(), 4);
        drop(first);
        let again = Session::open(&cfg, now).unwrap();
        assert!(!again.was_created());
        assert_eq!(again.db().len(), 4);
    }

    #[test]
    fn test_changes_reach_store_only_on_commit() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), Schema::Extended, OnTrackMode::Cached);
        let now = at_noon(date(13, 3, 2025));

        let mut session = Session::open(&cfg, now).unwrap();
        session.workflow.draft = draft();
        assert_eq!(session.submit(now).unwrap(), 5);
        session.delete(1).unwrap();
        assert!(session.is_dirty());
        drop(session);

        let mut session = Session::open(&cfg, now).unwrap();
        assert_eq!(session.db().len(), 4);
        assert!(session.db().get(5).is_none());

        session.workflow.draft = draft();
        session.submit(now).unwrap();
        session.delete(1).unwrap();
        session.commit().unwrap();
        assert!(!session.is_dirty());
        let committed: Vec<Task> = session.db().tasks.clone();
        drop(session);

        let reopened = Session::open(&cfg, now).unwrap();
        assert_eq!(reopened.db().len(), 4);
        for task in &committed {
            assert_eq!(reopened.db().get(task.id), Some(task));
        }
    }

    #[test]
    fn test_scenario_late_then_done() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), Schema::Extended, OnTrackMode::Cached);
        let mut session = Session::open(&cfg, at_noon(date(13, 3, 2025))).unwrap();
        session.workflow.draft = draft();
        let id = session.submit(at_noon(date(13, 3, 2025))).unwrap();

        let later = at_noon(date(20, 3, 2025));
        let task = session.edit(id, FieldEdit::Duration(1), later).unwrap();
        assert_eq!(task.expected_end_date, Some(date(14, 3, 2025)));
        assert!(!task.is_on_track);
        assert!(session.edit(id, FieldEdit::Status(Status::Done), later).unwrap().is_on_track);
    }

    #[test]
    fn test_cached_and_live_modes() {
        let dir = tempdir().unwrap();
        let created = at_noon(date(13, 3, 2025));
        let later = at_noon(date(20, 3, 2025));
        for (mode, expect_on_track) in [(OnTrackMode::Cached, true), (OnTrackMode::Live, false)] {
            let cfg = Config::new(Some(dir.path().join(format!("{mode:?}.db"))), Schema::Extended, mode, false);
            let mut session = Session::open(&cfg, created).unwrap();
            session.workflow.draft = draft();
            let id = session.submit(created).unwrap();
            let filter = TaskFilter::full_catalog(session.db());
            let view = session.view(&filter, later);
            let task = view.tasks.iter().find(|t| t.id == id).unwrap();
            assert_eq!(task.is_on_track, expect_on_track);
        }
    }

    #[test]
    fn test_flat_schema_refuses_date_edits() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), Schema::Flat, OnTrackMode::Cached);
        let now = at_noon(date(1, 3, 2025));
        let mut session = Session::open(&cfg, now).unwrap();
        let err = session.edit(1, FieldEdit::StartingDate(date(2, 3, 2025)), now).unwrap_err();
        assert!(matches!(err, TaskError::FieldUnavailable { field: "starting_date", .. }));
        assert!(!session.is_dirty());
        assert!(session.edit(1, FieldEdit::Duration(3), now).is_ok());
    }

    fn stored_rows(path: &std::path::Path) -> i64 {
        rusqlite::Connection::open(path)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_bad_row_survives_submit_and_commit() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), Schema::Extended, OnTrackMode::Cached);
        let now = at_noon(date(13, 3, 2025));
        drop(Session::open(&cfg, now).unwrap());
        rusqlite::Connection::open(&cfg.db_path)
            .unwrap()
            .execute("UPDATE tasks SET submission_date = '03-20-2025' WHERE id = 4", [])
            .unwrap();

        let mut session = Session::open(&cfg, now).unwrap();
        assert_eq!(session.db().len(), 3);
        session.workflow.draft = draft();
        assert_eq!(session.submit(now).unwrap(), 5);
        session.commit().unwrap();
        assert_eq!(stored_rows(&cfg.db_path), 5);
    }

    #[test]
    fn test_flat_store_opened_as_extended_keeps_rows() {
        let dir = tempdir().unwrap();
        let now = at_noon(date(1, 3, 2025));
        drop(Session::open(&config(dir.path(), Schema::Flat, OnTrackMode::Cached), now).unwrap());

        let cfg = config(dir.path(), Schema::Extended, OnTrackMode::Cached);
        let mut session = Session::open(&cfg, now).unwrap();
        assert_eq!(session.schema(), Schema::Flat);
        assert_eq!(session.db().len(), 4);
        session.commit().unwrap();
        assert_eq!(stored_rows(&cfg.db_path), 4);
    }
}
