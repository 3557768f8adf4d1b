//! Color constants for the dashboard.

use ratatui::style::Color;

use crate::fields::{Priority, Status};

/// Header and status bar background
pub const BEAM_BLUE: Color = Color::Rgb(0, 51, 102);
/// Tasks behind schedule
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
pub const GOLD: Color = Color::Rgb(255, 215, 0);
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);

pub fn status_color(status: Status) -> Color {
    match status {
        Status::NotStarted => Color::White,
        Status::InProgress => GOLD,
        Status::Done => Color::DarkGray,
    }
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Gray,
        Priority::Medium => Color::Cyan,
        Priority::High => Color::LightRed,
    }
}
