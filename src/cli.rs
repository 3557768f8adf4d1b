use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::{Config, OnTrackMode, Schema};

/// Task tracker for test-beam campaign preparation.
/// Storage defaults to tasks_demo.db beside the executable, or a path passed via --db.
#[derive(Parser)]
#[command(name = "tbprep", version, about = "Test-beam preparation task tracker")]
pub struct Cli {
    /// Path to the SQLite store.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Table layout of the store.
    #[arg(long, global = true, value_enum, default_value_t = Schema::Extended)]
    pub schema: Schema,

    /// When the on-track flag is recomputed.
    #[arg(long = "on-track", global = true, value_enum, default_value_t = OnTrackMode::Cached)]
    pub on_track: OnTrackMode,

    /// Apply changes in memory only, without committing them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config(&self) -> Config {
        Config::new(self.db.clone(), self.schema, self.on_track, self.dry_run)
    }
}
