//! Command implementations for the CLI interface.
//!
//! Each handler works on an open `Session`. Mutating commands are one user
//! action each, so they commit at the end unless `--dry-run` is given.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::config::Config;
use crate::db::*;
use crate::error::TaskError;
use crate::fields::*;
use crate::filter::TaskFilter;
use crate::session::Session;
use crate::stats::Stats;
use crate::task::{FieldEdit, Task};
use crate::tui::run::run_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive dashboard.
    Ui,

    /// Submit a new task. Every field is required.
    Add {
        /// What needs to be done.
        #[arg(long)]
        desc: Option<String>,
        /// Sub-system the task belongs to.
        #[arg(long, value_enum)]
        sub_system: Option<SubSystem>,
        /// Status: not-started | in-progress | done.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Person to contact about the task.
        #[arg(long)]
        contact: Option<String>,
        /// Planned duration in days.
        #[arg(long)]
        duration: Option<u32>,
        /// Starting date: DD-MM-YYYY, YYYY-MM-DD, "today", "tomorrow" or "in Nd".
        #[arg(long)]
        start: Option<String>,
    },

    /// List tasks. Dimensions left unset select everything.
    List {
        /// Filter by contact person. May be repeated.
        #[arg(long)]
        contact: Vec<String>,
        /// Filter by sub-system. May be repeated.
        #[arg(long, value_enum)]
        sub_system: Vec<SubSystem>,
        /// Filter by priority. May be repeated.
        #[arg(long, value_enum)]
        priority: Vec<Priority>,
        /// Filter by status. May be repeated.
        #[arg(long, value_enum)]
        status: Vec<Status>,
        /// Shortest duration to include, in days.
        #[arg(long)]
        min_duration: Option<u32>,
        /// Longest duration to include, in days.
        #[arg(long)]
        max_duration: Option<u32>,
        /// Only tasks that are behind schedule.
        #[arg(long)]
        off_track: bool,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// View a single task.
    View {
        id: u64,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Edit fields of a task.
    Edit {
        id: u64,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        duration: Option<u32>,
        /// New starting date.
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        /// Record the date the task actually ended.
        #[arg(long)]
        actual_end: Option<String>,
        /// Clear the recorded end date.
        #[arg(long, conflicts_with = "actual_end")]
        clear_actual_end: bool,
    },

    /// Delete a task.
    Delete { id: u64 },

    /// Show task statistics.
    Stats,

    /// Export tasks to CSV.
    Export {
        /// Output file (default: tasks-YYYYMMDD-HHMM.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn fail(e: TaskError) -> ! {
    eprintln!("{e}");
    std::process::exit(1);
}

/// Commit the session unless this is a dry run.
fn commit_or_report(session: &mut Session, config: &Config) {
    if config.dry_run {
        println!("Dry run: changes not committed");
        return;
    }
    if let Err(e) = session.commit() {
        eprintln!("Failed to commit tasks: {e}");
        std::process::exit(1);
    }
}

/// Launch the terminal dashboard.
pub fn cmd_ui(session: Session) {
    if let Err(e) = run_tui(session) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Submit a new task from command-line fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    session: &mut Session,
    config: &Config,
    desc: Option<String>,
    sub_system: Option<SubSystem>,
    status: Option<Status>,
    priority: Option<Priority>,
    contact: Option<String>,
    duration: Option<u32>,
    start: Option<String>,
) {
    let now = now();
    let starting_date = match start.as_deref().map(|s| parse_date_input(s, now.date())) {
        Some(Ok(d)) => Some(d),
        Some(Err(e)) => fail(e),
        None => None,
    };

    let draft = &mut session.workflow.draft;
    draft.description = desc.unwrap_or_default();
    draft.sub_system = sub_system;
    draft.status = status;
    draft.priority = priority;
    draft.contact_person = contact.unwrap_or_default();
    draft.duration = duration;
    draft.starting_date = starting_date;

    let id = match session.submit(now) {
        Ok(id) => id,
        Err(e) => fail(e),
    };
    commit_or_report(session, config);
    println!("Task submitted! Here are the task details:");
    if let Some(task) = session.db().get(id) {
        print_table(&[task], now.date());
    }
}

/// List tasks with optional filtering.
#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    session: &mut Session,
    contact: Vec<String>,
    sub_system: Vec<SubSystem>,
    priority: Vec<Priority>,
    status: Vec<Status>,
    min_duration: Option<u32>,
    max_duration: Option<u32>,
    off_track: bool,
    json: bool,
) {
    let now = now();
    let mut filter = TaskFilter::full_catalog(session.db());
    if !contact.is_empty() {
        filter.contact_persons = contact.into_iter().collect();
    }
    if !sub_system.is_empty() {
        filter.sub_systems = sub_system.into_iter().collect();
    }
    if !priority.is_empty() {
        filter.priorities = priority.into_iter().collect();
    }
    if !status.is_empty() {
        filter.statuses = status.into_iter().collect::<BTreeSet<_>>();
    }
    let lo = min_duration.unwrap_or(*filter.duration.start());
    let hi = max_duration.unwrap_or(*filter.duration.end());
    filter.duration = lo..=hi;

    let view = session.view(&filter, now);
    for warning in &view.warnings {
        eprintln!("warning: {warning}");
    }
    let tasks: Vec<&Task> = view
        .tasks
        .into_iter()
        .filter(|t| !off_track || !t.is_on_track)
        .collect();

    if json {
        match serde_json::to_string_pretty(&tasks) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Failed to serialise tasks: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("Number of tasks: {}", tasks.len());
        print_table(&tasks, now.date());
    }
}

/// View detailed information about a specific task.
pub fn cmd_view(session: &mut Session, id: u64, json: bool) {
    let now = now();
    session.refresh(now);
    let Some(task) = session.db().get(id) else {
        fail(TaskError::NotFound(id));
    };
    if json {
        match serde_json::to_string_pretty(task) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Failed to serialise task: {e}");
                std::process::exit(1);
            }
        }
        return;
    }
    let today = now.date();
    println!("ID:            {}", task.id);
    println!("Sub-system:    {}", task.sub_system);
    println!("Status:        {}", task.status);
    println!("Priority:      {}", task.priority);
    println!("Contact:       {}", task.contact_person);
    println!("Duration:      {} day(s)", task.duration);
    println!("Submitted:     {}", format_date(Some(task.submission_date)));
    println!("Start:         {}", format_date(task.starting_date));
    println!(
        "Expected end:  {}",
        match task.expected_end_date {
            Some(d) => format!("{} ({})", format_date(Some(d)), format_end_relative(Some(d), today)),
            None => "-".into(),
        }
    );
    println!("Actual end:    {}", format_date(task.actual_end_date));
    println!("On track:      {}", format_on_track(task.is_on_track));
    println!("Last edited:   {}", task.last_edited.format("%d-%m-%Y %H:%M"));
    println!("Description:\n{}\n", task.description);
}

/// Edit an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    session: &mut Session,
    config: &Config,
    id: u64,
    status: Option<Status>,
    priority: Option<Priority>,
    duration: Option<u32>,
    start: Option<String>,
    contact: Option<String>,
    actual_end: Option<String>,
    clear_actual_end: bool,
) {
    let now = now();
    let today = now.date();
    let parse = |s: &str| parse_date_input(s, today).unwrap_or_else(|e| fail(e));

    let mut edits = Vec::new();
    edits.extend(status.map(FieldEdit::Status));
    edits.extend(priority.map(FieldEdit::Priority));
    edits.extend(duration.map(FieldEdit::Duration));
    edits.extend(start.as_deref().map(|s| FieldEdit::StartingDate(parse(s))));
    if let Some(c) = contact {
        if c.trim().is_empty() {
            fail(TaskError::missing_fields());
        }
        edits.push(FieldEdit::ContactPerson(c));
    }
    if let Some(s) = actual_end.as_deref() {
        edits.push(FieldEdit::ActualEndDate(Some(parse(s))));
    }
    if clear_actual_end {
        edits.push(FieldEdit::ActualEndDate(None));
    }

    if edits.is_empty() {
        println!("Nothing to change for task {id}");
        return;
    }
    for edit in edits {
        if let Err(e) = session.edit(id, edit, now) {
            fail(e);
        }
    }
    commit_or_report(session, config);
    println!("Updated task {id}");
}

/// Delete a task.
pub fn cmd_delete(session: &mut Session, config: &Config, id: u64) {
    match session.delete(id) {
        Ok(task) => {
            commit_or_report(session, config);
            println!("Deleted task {}: {}", task.id, truncate(&task.description, 60));
        }
        Err(e) => fail(e),
    }
}

/// Print task statistics.
pub fn cmd_stats(session: &mut Session) {
    session.refresh(now());
    let stats = Stats::of(session.db());
    println!("Number of tasks:           {}", stats.total);
    println!("Number of open tasks:      {}", stats.open);
    println!("Tasks behind schedule:     {}", stats.off_track);
    println!();
    println!("By status:");
    for status in Status::ALL {
        println!("  {:<14} {}", status.label(), stats.count_status(status));
    }
    println!("By priority:");
    for priority in Priority::ALL {
        println!("  {:<14} {}", priority.label(), stats.count_priority(priority));
    }
    println!("By sub-system:");
    for (sub, n) in &stats.by_sub_system {
        println!("  {:<20} {}", sub.label(), n);
    }
    println!("Submitted per month:");
    for ((year, month), per_status) in &stats.by_month {
        let parts: Vec<String> = per_status
            .iter()
            .map(|(status, n)| format!("{}: {}", status.label(), n))
            .collect();
        println!("  {year}-{month:02}  {}", parts.join(", "));
    }
}

/// Render tasks as CSV, one row per task.
pub fn tasks_to_csv(tasks: &[Task]) -> String {
    let escape_csv = |s: &str| {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    };

    let mut csv = String::from(
        "ID,Description,Sub-system,Status,Priority,Contact person,Duration,Date Submitted,Starting date,Expected end date,Actual end date,On track,Last edited\n",
    );
    for t in tasks {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            t.id,
            escape_csv(&t.description),
            escape_csv(t.sub_system.label()),
            t.status.label(),
            t.priority.label(),
            escape_csv(&t.contact_person),
            t.duration,
            format_date(Some(t.submission_date)),
            format_date(t.starting_date),
            format_date(t.expected_end_date),
            format_date(t.actual_end_date),
            t.is_on_track,
            t.last_edited.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    csv
}

/// Export the collection to a CSV snapshot.
pub fn cmd_export(session: &Session, output: Option<PathBuf>) {
    let output_path = output.unwrap_or_else(|| {
        PathBuf::from(format!("tasks-{}.csv", Local::now().format("%Y%m%d-%H%M")))
    });
    let csv = tasks_to_csv(&session.db().tasks);
    if let Err(e) = std::fs::write(&output_path, csv) {
        fail(TaskError::from(e));
    }
    println!("Exported {} task(s) to {}", session.db().len(), output_path.display());
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "tbprep", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::{date, sample_task};

    #[test]
    fn test_csv_escapes_and_formats() {
        let mut t = sample_task(3, Status::InProgress, date(13, 3, 2025), 1);
        t.description = "Cable \"A\", then B".into();
        t.sub_system = SubSystem::DaqMonitoring;
        let edited = t.last_edited;
        crate::derive::refresh(&mut t, edited);
        let csv = tasks_to_csv(&[t]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("ID,Description,Sub-system"));
        assert_eq!(
            lines.next().unwrap(),
            "3,\"Cable \"\"A\"\", then B\",DAQ/monitoring,In Progress,Medium,Marion,1,13-03-2025,13-03-2025,14-03-2025,-,true,2025-03-13 12:00:00"
        );
        assert!(lines.next().is_none());
    }
}
