//! # tbprep - Test-beam preparation task tracker
//!
//! Keeps the list of things that have to happen before a test-beam campaign:
//! what the task is, which sub-system it concerns, who to ask about it, how long
//! it should take and whether it is still on schedule.
//!
//! ## Key Features
//!
//! - **Single SQLite table**: one `tasks` table next to the executable, seeded
//!   with sample rows on first run
//! - **Derived schedule**: expected end date and an on-track flag computed from
//!   the starting date, duration and status
//! - **Explicit commits**: edits live in memory until committed
//! - **Two interfaces**: scriptable CLI plus a terminal dashboard (`tbprep ui`)
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the dashboard
//! tbprep ui
//!
//! # Submit a task
//! tbprep add --desc "Check HV cabling" --sub-system hv --status in-progress \
//!     --priority high --contact Marion --duration 3 --start today
//!
//! # Tasks behind schedule
//! tbprep list --off-track
//!
//! # Mark one done
//! tbprep edit 5 --status done
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `warn`).

use clap::Parser;
use chrono::Local;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod derive;
pub mod error;
pub mod fields;
pub mod filter;
pub mod session;
pub mod stats;
pub mod store;
pub mod submission;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod filter_form;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use session::Session;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    // Completions don't need the store
    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let mut session = match Session::open(&config, Local::now().naive_local()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to open {}: {e}", config.db_path.display());
            std::process::exit(1);
        }
    };
    if session.was_created() {
        println!("Created {} with sample tasks", config.db_path.display());
    }

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Ui => cmd_ui(session),

        Commands::Add { desc, sub_system, status, priority, contact, duration, start } =>
            cmd_add(&mut session, &config, desc, sub_system, status, priority, contact, duration, start),

        Commands::List { contact, sub_system, priority, status, min_duration, max_duration, off_track, json } =>
            cmd_list(&mut session, contact, sub_system, priority, status, min_duration, max_duration, off_track, json),

        Commands::View { id, json } => cmd_view(&mut session, id, json),

        Commands::Edit { id, status, priority, duration, start, contact, actual_end, clear_actual_end } =>
            cmd_edit(&mut session, &config, id, status, priority, duration, start, contact, actual_end, clear_actual_end),

        Commands::Delete { id } => cmd_delete(&mut session, &config, id),

        Commands::Stats => cmd_stats(&mut session),

        Commands::Export { output } => cmd_export(&session, output),
    }
}
