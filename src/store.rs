//! SQLite persistence for the `tasks` table.
//!
//! The store is a snapshot: it is read once when a session opens and rewritten
//! wholesale on commit. Dates are kept as `DD-MM-YYYY` text, timestamps as ISO
//! text with fractional seconds and the on-track flag as an integer.
//!
//! Rows that cannot be decoded are skipped on load but carried over verbatim on
//! commit, and their ids stay reserved. If the table itself could not be read
//! while it still holds rows, commit is refused.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::{debug, info, warn};

use crate::config::Schema;
use crate::db::DATE_FORMAT;
use crate::derive;
use crate::error::TaskError;
use crate::fields::{Priority, Status, SubSystem};
use crate::task::Task;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const FLAT_COLUMNS: &str =
    "id, description, sub_system, status, priority, submission_date, duration, contact_person";

const EXTENDED_COLUMNS: &str = "id, description, sub_system, status, priority, submission_date, duration, contact_person, \
     starting_date, expected_end_date, actual_end_date, is_on_track, last_edited";

const CREATE_FLAT: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT,
        sub_system TEXT,
        status TEXT,
        priority TEXT,
        submission_date DATETIME,
        duration INTEGER,
        contact_person TEXT
    )";

const CREATE_EXTENDED: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT,
        sub_system TEXT,
        status TEXT,
        priority TEXT,
        submission_date DATETIME,
        duration INTEGER,
        contact_person TEXT,
        starting_date DATE,
        expected_end_date DATE,
        actual_end_date DATE,
        is_on_track BOOLEAN,
        last_edited DATETIME
    )";

/// Sample rows written into a freshly created store:
/// (description, sub-system, status, priority, submission date, duration, contact).
const SEED_ROWS: [(&str, SubSystem, Status, Priority, &str, u32, &str); 4] = [
    ("This is a test task.", SubSystem::Hv, Status::NotStarted, Priority::Low, "27-02-2025", 10, "Marion"),
    ("This is an important test task.", SubSystem::Hv, Status::NotStarted, Priority::High, "27-02-2025", 20, "Marion"),
    ("This is a another test task.", SubSystem::Lv, Status::NotStarted, Priority::Medium, "27-02-2025", 10, "Michal"),
    ("Have organisation meeting", SubSystem::Planning, Status::InProgress, Priority::Low, "28-02-2025", 2, "Marion"),
];

/// Handle on the backing store.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    schema: Schema,
    /// Ids of rows the last load could not decode.
    unreadable: Vec<i64>,
    /// The last load could not query the table at all.
    load_failed: bool,
}

impl Store {
    /// Open the store at `path`, creating the file and table if absent.
    /// The flag reports whether the file had to be created.
    ///
    /// An existing `tasks` table keeps its layout: when it does not match
    /// `schema`, the store follows the table on disk.
    pub fn open_or_create(path: &Path, schema: Schema) -> Result<(Self, bool), TaskError> {
        let existed = path.exists();
        if !existed {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let mut store = Store::new(conn, schema);
        match store.table_schema()? {
            Some(found) if found != schema => {
                warn!(requested = %schema, %found, "tasks table has another layout, using the stored one");
                store.schema = found;
            }
            Some(_) => {}
            None => store.create_table()?,
        }
        info!(path = %path.display(), schema = %store.schema, created = !existed, "store opened");
        Ok((store, !existed))
    }

    fn new(conn: Connection, schema: Schema) -> Self {
        Store { conn, schema, unreadable: Vec::new(), load_failed: false }
    }

    /// In-memory store, used by tests.
    #[cfg(test)]
    pub fn in_memory(schema: Schema) -> Result<Self, TaskError> {
        let store = Store::new(Connection::open_in_memory()?, schema);
        store.create_table()?;
        Ok(store)
    }

    /// Layout of the existing `tasks` table, `None` when there is no table.
    fn table_schema(&self) -> Result<Option<Schema>, TaskError> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(tasks)")?;
        let columns = stmt
            .query_map([], |r| r.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        if columns.is_empty() {
            return Ok(None);
        }
        let extended = columns.iter().any(|c| c == "starting_date");
        Ok(Some(if extended { Schema::Extended } else { Schema::Flat }))
    }

    /// Highest id among the rows the last load skipped.
    pub fn max_unreadable_id(&self) -> Option<u64> {
        self.unreadable.iter().filter_map(|&id| u64::try_from(id).ok()).max()
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    fn create_table(&self) -> Result<(), TaskError> {
        let sql = match self.schema {
            Schema::Flat => CREATE_FLAT,
            Schema::Extended => CREATE_EXTENDED,
        };
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Insert the sample rows, stamped with `now`. Only meant for a store that
    /// was just created.
    pub fn seed(&self, now: NaiveDateTime) -> Result<(), TaskError> {
        let tasks = SEED_ROWS
            .iter()
            .enumerate()
            .map(|(i, &(description, sub_system, status, priority, submitted, duration, contact))| {
                let submission_date = NaiveDate::parse_from_str(submitted, DATE_FORMAT)
                    .map_err(|_| TaskError::Date(submitted.to_string()))?;
                let starting_date = match self.schema {
                    Schema::Flat => None,
                    Schema::Extended => Some(submission_date),
                };
                let mut task = Task {
                    id: i as u64 + 1,
                    description: description.to_string(),
                    sub_system,
                    status,
                    priority,
                    contact_person: contact.to_string(),
                    duration,
                    starting_date,
                    submission_date,
                    expected_end_date: None,
                    actual_end_date: None,
                    is_on_track: true,
                    last_edited: now,
                };
                derive::refresh(&mut task, now);
                Ok(task)
            })
            .collect::<Result<Vec<_>, TaskError>>()?;

        let tx = self.conn.unchecked_transaction()?;
        for task in &tasks {
            insert_row(&tx, self.schema, task)?;
        }
        tx.commit()?;
        info!(rows = tasks.len(), "store seeded");
        Ok(())
    }

    fn columns(&self) -> &'static str {
        match self.schema {
            Schema::Flat => FLAT_COLUMNS,
            Schema::Extended => EXTENDED_COLUMNS,
        }
    }

    /// Read every row in storage order. If the table cannot be queried the
    /// result is empty; rows that fail to decode are skipped and remembered.
    pub fn load_all(&mut self) -> Vec<Task> {
        self.unreadable.clear();
        match self.try_load_all() {
            Ok(tasks) => {
                self.load_failed = false;
                debug!(rows = tasks.len(), skipped = self.unreadable.len(), "tasks loaded");
                tasks
            }
            Err(e) => {
                self.load_failed = true;
                warn!(error = %e, "could not load tasks, continuing with an empty table");
                Vec::new()
            }
        }
    }

    fn try_load_all(&mut self) -> Result<Vec<Task>, TaskError> {
        let schema = self.schema;
        let sql = format!("SELECT {} FROM tasks", self.columns());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(r) = rows.next()? {
            match read_row(r, schema) {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    let id: i64 = r.get(0)?;
                    warn!(id, error = %e, "skipping unreadable task row");
                    self.unreadable.push(id);
                }
            }
        }
        Ok(tasks)
    }

    fn stored_rows(&self) -> usize {
        self.conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get::<_, i64>(0))
            .map_or(0, |n| usize::try_from(n).unwrap_or(0))
    }

    /// Replace the whole table with `tasks` in one transaction. Rows the last
    /// load skipped are written back unchanged.
    pub fn commit(&mut self, tasks: &[Task]) -> Result<(), TaskError> {
        if self.load_failed {
            let rows = self.stored_rows();
            if rows > 0 {
                return Err(TaskError::UnreadableStore { rows });
            }
        }
        let create = match self.schema {
            Schema::Flat => CREATE_FLAT,
            Schema::Extended => CREATE_EXTENDED,
        };
        let columns = self.columns();
        let keep = !self.unreadable.is_empty();
        let tx = self.conn.transaction()?;
        if keep {
            tx.execute_batch(&format!(
                "DROP TABLE IF EXISTS temp.kept_tasks;
                 CREATE TEMP TABLE kept_tasks AS SELECT {columns} FROM tasks WHERE 0;"
            ))?;
            for id in &self.unreadable {
                tx.execute(
                    &format!("INSERT INTO temp.kept_tasks SELECT {columns} FROM tasks WHERE id = ?1"),
                    [id],
                )?;
            }
        }
        tx.execute_batch("DROP TABLE IF EXISTS tasks;")?;
        tx.execute_batch(create)?;
        for task in tasks {
            insert_row(&tx, self.schema, task)?;
        }
        if keep {
            tx.execute_batch(&format!(
                "INSERT INTO tasks ({columns}) SELECT {columns} FROM temp.kept_tasks;
                 DROP TABLE temp.kept_tasks;"
            ))?;
        }
        tx.commit()?;
        self.load_failed = false;
        info!(rows = tasks.len(), kept = self.unreadable.len(), "tasks committed");
        Ok(())
    }
}

fn insert_row(conn: &Connection, schema: Schema, task: &Task) -> Result<(), TaskError> {
    let submitted = task.submission_date.format(DATE_FORMAT).to_string();
    match schema {
        Schema::Flat => {
            conn.execute(
                "INSERT INTO tasks (id, description, sub_system, status, priority, submission_date, duration, contact_person)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    task.id as i64,
                    task.description,
                    task.sub_system.label(),
                    task.status.label(),
                    task.priority.label(),
                    submitted,
                    task.duration,
                    task.contact_person,
                ],
            )?;
        }
        Schema::Extended => {
            let fmt_date = |d: Option<NaiveDate>| d.map(|d| d.format(DATE_FORMAT).to_string());
            conn.execute(
                "INSERT INTO tasks (id, description, sub_system, status, priority, submission_date, duration, contact_person,
                                    starting_date, expected_end_date, actual_end_date, is_on_track, last_edited)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    task.id as i64,
                    task.description,
                    task.sub_system.label(),
                    task.status.label(),
                    task.priority.label(),
                    submitted,
                    task.duration,
                    task.contact_person,
                    fmt_date(task.starting_date),
                    fmt_date(task.expected_end_date),
                    fmt_date(task.actual_end_date),
                    task.is_on_track,
                    task.last_edited.format(TIMESTAMP_FORMAT).to_string(),
                ],
            )?;
        }
    }
    Ok(())
}

fn read_row(r: &Row<'_>, schema: Schema) -> rusqlite::Result<Task> {
    let submission_date = parse_date_column(r, 5)?;
    let mut task = Task {
        id: parse_id_column(r, 0)?,
        description: r.get(1)?,
        sub_system: parse_label_column(r, 2)?,
        status: parse_label_column(r, 3)?,
        priority: parse_label_column(r, 4)?,
        submission_date,
        duration: r.get(6)?,
        contact_person: r.get(7)?,
        starting_date: None,
        expected_end_date: None,
        actual_end_date: None,
        is_on_track: true,
        last_edited: submission_date.and_time(chrono::NaiveTime::MIN),
    };
    if schema == Schema::Extended {
        task.starting_date = parse_optional_date_column(r, 8)?;
        task.expected_end_date = parse_optional_date_column(r, 9)?;
        task.actual_end_date = parse_optional_date_column(r, 10)?;
        task.is_on_track = r.get::<_, Option<bool>>(11)?.unwrap_or(true);
        if let Some(text) = r.get::<_, Option<String>>(12)? {
            task.last_edited = NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e)))?;
        }
    }
    Ok(task)
}

fn parse_id_column(r: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let id: i64 = r.get(idx)?;
    u64::try_from(id).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn parse_label_column<T>(r: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = r.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date_column(r: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = r.get(idx)?;
    parse_stored_date(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_date_column(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match r.get::<_, Option<String>>(idx)? {
        Some(text) => parse_stored_date(&text)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

/// Stored dates are `DD-MM-YYYY`; ISO dates written by other tools are accepted too.
fn parse_stored_date(text: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::{at_noon, date, sample_task};
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_then_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks_demo.db");
        let (_, created) = Store::open_or_create(&path, Schema::Extended).unwrap();
        assert!(created);
        let (_, created) = Store::open_or_create(&path, Schema::Extended).unwrap();
        assert!(!created);
    }

    #[test]
    fn test_seed_rows_load_in_storage_order() {
        let now = at_noon(date(1, 3, 2025));
        for schema in [Schema::Flat, Schema::Extended] {
            let mut store = Store::in_memory(schema).unwrap();
            store.seed(now).unwrap();
            let tasks = store.load_all();
            let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![1, 2, 3, 4]);
            assert_eq!(tasks[3].sub_system, SubSystem::Planning);
            assert_eq!(tasks[3].submission_date, date(28, 2, 2025));
            assert_eq!(tasks[1].duration, 20);
            match schema {
                Schema::Flat => assert_eq!(tasks[0].starting_date, None),
                Schema::Extended => {
                    assert_eq!(tasks[0].starting_date, Some(date(27, 2, 2025)));
                    assert_eq!(tasks[0].expected_end_date, Some(date(9, 3, 2025)));
                    assert_eq!(tasks[0].last_edited, now);
                }
            }
        }
    }

    #[test]
    fn test_commit_round_trips_every_field() {
        let mut store = Store::in_memory(Schema::Extended).unwrap();
        let mut late = sample_task(7, Status::InProgress, date(13, 3, 2025), 1);
        late.last_edited = date(20, 3, 2025).and_hms_nano_opt(9, 15, 30, 123_456_789).unwrap();
        let edited = late.last_edited;
        derive::refresh(&mut late, edited);
        let mut done = sample_task(9, Status::Done, date(1, 3, 2025), 3);
        done.actual_end_date = Some(date(5, 3, 2025));
        done.description = "Align the MCP, check \"timing\"".into();
        derive::refresh(&mut done, at_noon(date(20, 3, 2025)));

        store.commit(&[done.clone(), late.clone()]).unwrap();
        let loaded = store.load_all();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.iter().find(|t| t.id == 7), Some(&late));
        assert_eq!(loaded.iter().find(|t| t.id == 9), Some(&done));
        assert!(!late.is_on_track);
    }

    #[test]
    fn test_commit_replaces_previous_rows() {
        let mut store = Store::in_memory(Schema::Flat).unwrap();
        store.seed(at_noon(date(1, 3, 2025))).unwrap();
        let mut kept = store.load_all();
        kept.retain(|t| t.id != 2);
        store.commit(&kept).unwrap();
        let ids: Vec<u64> = store.load_all().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_missing_table_loads_empty() {
        let mut store = Store::in_memory(Schema::Extended).unwrap();
        store.conn.execute_batch("DROP TABLE tasks;").unwrap();
        assert!(store.load_all().is_empty());
        store.commit(&[sample_task(1, Status::Done, date(1, 3, 2025), 1)]).unwrap();
        assert_eq!(store.load_all().len(), 1);
    }

    #[test]
    fn test_undecodable_row_is_skipped_and_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks_demo.db");
        let (store, _) = Store::open_or_create(&path, Schema::Extended).unwrap();
        store.seed(at_noon(date(1, 3, 2025))).unwrap();
        store
            .conn
            .execute("UPDATE tasks SET submission_date = '03-20-2025' WHERE id = 2", [])
            .unwrap();
        drop(store);

        let (mut store, created) = Store::open_or_create(&path, Schema::Extended).unwrap();
        assert!(!created);
        let mut tasks = store.load_all();
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(store.max_unreadable_id(), Some(2));

        tasks.push(sample_task(5, Status::InProgress, date(13, 3, 2025), 1));
        store.commit(&tasks).unwrap();
        assert_eq!(store.stored_rows(), 5);
        let raw: String = store
            .conn
            .query_row("SELECT submission_date FROM tasks WHERE id = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(raw, "03-20-2025");
        assert_eq!(store.load_all().len(), 4);
    }

    #[test]
    fn test_negative_id_is_not_wrapped() {
        let mut store = Store::in_memory(Schema::Extended).unwrap();
        store.seed(at_noon(date(1, 3, 2025))).unwrap();
        store.conn.execute("UPDATE tasks SET id = -3 WHERE id = 1", []).unwrap();
        let tasks = store.load_all();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.id != u64::MAX - 2));
        assert_eq!(store.max_unreadable_id(), None);
        store.commit(&tasks).unwrap();
        assert_eq!(store.stored_rows(), 4);
    }

    #[test]
    fn test_existing_table_layout_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks_demo.db");
        let (store, _) = Store::open_or_create(&path, Schema::Flat).unwrap();
        store.seed(at_noon(date(1, 3, 2025))).unwrap();
        drop(store);

        let (mut store, _) = Store::open_or_create(&path, Schema::Extended).unwrap();
        assert_eq!(store.schema(), Schema::Flat);
        let tasks = store.load_all();
        assert_eq!(tasks.len(), 4);
        store.commit(&tasks).unwrap();
        assert_eq!(store.stored_rows(), 4);
    }

    #[test]
    fn test_unqueryable_table_refuses_commit() {
        let store = Store::in_memory(Schema::Flat).unwrap();
        store.seed(at_noon(date(1, 3, 2025))).unwrap();
        let Store { conn, .. } = store;
        let mut as_extended = Store::new(conn, Schema::Extended);
        assert!(as_extended.load_all().is_empty());

        let err = as_extended.commit(&[]).unwrap_err();
        assert!(matches!(err, TaskError::UnreadableStore { rows: 4 }));
        assert_eq!(as_extended.stored_rows(), 4);
    }
}
