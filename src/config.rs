//! Runtime configuration resolved from the command line.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Default store file name, created beside the executable.
pub const DEFAULT_DB_FILE: &str = "tasks_demo.db";

/// Which generation of the `tasks` table the store uses.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum Schema {
    /// Plain columns only: no starting date, no derived dates.
    Flat,
    /// Adds starting/expected/actual end dates, the on-track flag and last edit.
    #[default]
    Extended,
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Flat => f.write_str("flat"),
            Schema::Extended => f.write_str("extended"),
        }
    }
}

/// When the cached `is_on_track` flag is refreshed.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OnTrackMode {
    /// On load and on edits of status, starting date or duration.
    #[default]
    Cached,
    /// Additionally before every view, against the current time.
    Live,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub schema: Schema,
    pub on_track: OnTrackMode,
    /// Apply CLI mutations in memory only.
    pub dry_run: bool,
}

impl Config {
    pub fn new(db_path: Option<PathBuf>, schema: Schema, on_track: OnTrackMode, dry_run: bool) -> Self {
        Config {
            db_path: db_path.unwrap_or_else(default_db_path),
            schema,
            on_track,
            dry_run,
        }
    }
}

/// `tasks_demo.db` in the directory of the running executable, or the current
/// directory when that cannot be determined.
pub fn default_db_path() -> PathBuf {
    let install_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    install_dir.join(DEFAULT_DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_db_path_wins() {
        let cfg = Config::new(Some(PathBuf::from("/tmp/x.db")), Schema::Flat, OnTrackMode::Live, false);
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.schema, Schema::Flat);
    }

    #[test]
    fn test_default_db_path_file_name() {
        let path = default_db_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(DEFAULT_DB_FILE));
    }
}
