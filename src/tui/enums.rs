//! Enumerations for dashboard state management.

/// Screen currently shown by the dashboard.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AppState {
    TaskList,
    AddTask,
    Filter,
    Stats,
    Help,
    Confirm,
}

/// Action waiting for a yes/no answer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConfirmAction {
    Delete(u64),
    /// Quit with uncommitted changes.
    Quit,
}

/// Grid column targeted by inline edits.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EditColumn {
    Status,
    Priority,
    Duration,
    StartingDate,
}

impl EditColumn {
    pub const ALL: [EditColumn; 4] = [
        EditColumn::Status,
        EditColumn::Priority,
        EditColumn::Duration,
        EditColumn::StartingDate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EditColumn::Status => "Status",
            EditColumn::Priority => "Priority",
            EditColumn::Duration => "Duration",
            EditColumn::StartingDate => "Start",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}
