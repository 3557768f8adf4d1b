//! Add-task form for the dashboard.
//!
//! The form only collects raw widget values. `to_draft` turns them into a
//! `SubmissionDraft`; the submission workflow decides whether they are complete.

use chrono::NaiveDate;

use crate::db::parse_date_input;
use crate::fields::{Priority, Status, SubSystem};
use crate::submission::SubmissionDraft;
use crate::tui::input::InputField;

/// Field order on screen.
pub const DESCRIPTION_ORDER: usize = 0;
pub const SUB_SYSTEM_ORDER: usize = 1;
pub const STATUS_ORDER: usize = 2;
pub const PRIORITY_ORDER: usize = 3;
pub const CONTACT_ORDER: usize = 4;
pub const DURATION_ORDER: usize = 5;
pub const START_ORDER: usize = 6;
pub const FIELD_COUNT: usize = 7;

/// Cycle an optional selection through `None` and every catalog entry.
fn cycle<T: Copy + PartialEq>(current: Option<T>, all: &[T], forward: bool) -> Option<T> {
    let n = all.len() + 1;
    let idx = current.and_then(|c| all.iter().position(|&v| v == c)).map_or(0, |i| i + 1);
    let next = if forward { (idx + 1) % n } else { (idx + n - 1) % n };
    if next == 0 {
        None
    } else {
        Some(all[next - 1])
    }
}

pub struct SubmissionForm {
    pub description: InputField,
    pub sub_system: Option<SubSystem>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub contact_person: InputField,
    pub duration: InputField,
    pub starting_date: InputField,
    pub current_field: usize,
    /// Workflow attempt this form was built for.
    pub attempt: u64,
    /// Whether the starting date is part of the form (extended schema).
    pub with_start: bool,
}

impl SubmissionForm {
    pub fn new(attempt: u64, with_start: bool) -> Self {
        let mut form = Self {
            description: InputField::new(),
            sub_system: None,
            status: None,
            priority: None,
            contact_person: InputField::new(),
            duration: InputField::numeric(),
            starting_date: InputField::new(),
            current_field: DESCRIPTION_ORDER,
            attempt,
            with_start,
        };
        form.update_active_field();
        form
    }

    fn field_count(&self) -> usize {
        if self.with_start {
            FIELD_COUNT
        } else {
            FIELD_COUNT - 1
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % self.field_count();
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        let n = self.field_count();
        self.current_field = (self.current_field + n - 1) % n;
        self.update_active_field();
    }

    fn text_field_mut(&mut self, order: usize) -> Option<&mut InputField> {
        match order {
            DESCRIPTION_ORDER => Some(&mut self.description),
            CONTACT_ORDER => Some(&mut self.contact_person),
            DURATION_ORDER => Some(&mut self.duration),
            START_ORDER => Some(&mut self.starting_date),
            _ => None,
        }
    }

    pub fn update_active_field(&mut self) {
        for order in [DESCRIPTION_ORDER, CONTACT_ORDER, DURATION_ORDER, START_ORDER] {
            if let Some(field) = self.text_field_mut(order) {
                field.active = false;
            }
        }
        let current = self.current_field;
        if let Some(field) = self.text_field_mut(current) {
            field.active = true;
        }
    }

    pub fn handle_char(&mut self, c: char) {
        let current = self.current_field;
        match self.text_field_mut(current) {
            Some(field) => field.handle_char(c),
            // Space cycles selectors too
            None if c == ' ' => self.handle_left_right(true),
            None => {}
        }
    }

    pub fn handle_backspace(&mut self) {
        let current = self.current_field;
        if let Some(field) = self.text_field_mut(current) {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        let current = self.current_field;
        if let Some(field) = self.text_field_mut(current) {
            field.handle_delete();
        }
    }

    /// Move the cursor of a text field, or cycle a selector.
    pub fn handle_left_right(&mut self, right: bool) {
        match self.current_field {
            SUB_SYSTEM_ORDER => self.sub_system = cycle(self.sub_system, &SubSystem::ALL, right),
            STATUS_ORDER => self.status = cycle(self.status, &Status::ALL, right),
            PRIORITY_ORDER => self.priority = cycle(self.priority, &Priority::ALL, right),
            order => {
                if let Some(field) = self.text_field_mut(order) {
                    if right {
                        field.move_cursor_right();
                    } else {
                        field.move_cursor_left();
                    }
                }
            }
        }
    }

    /// Raw values as a draft. Unparseable numbers or dates count as unset.
    pub fn to_draft(&self, today: NaiveDate) -> SubmissionDraft {
        SubmissionDraft {
            description: self.description.value.clone(),
            sub_system: self.sub_system,
            status: self.status,
            priority: self.priority,
            contact_person: self.contact_person.value.clone(),
            duration: self.duration.trimmed().and_then(|d| d.parse().ok()),
            starting_date: if self.with_start {
                self.starting_date
                    .trimmed()
                    .and_then(|d| parse_date_input(d, today).ok())
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::date;

    #[test]
    fn test_selector_cycles_through_unset() {
        let mut form = SubmissionForm::new(0, true);
        form.current_field = PRIORITY_ORDER;
        form.handle_left_right(true);
        assert_eq!(form.priority, Some(Priority::Low));
        form.handle_left_right(false);
        assert_eq!(form.priority, None);
        form.handle_left_right(false);
        assert_eq!(form.priority, Some(Priority::High));
    }

    #[test]
    fn test_to_draft_parses_values() {
        let mut form = SubmissionForm::new(0, true);
        for c in "Align MCP".chars() {
            form.handle_char(c);
        }
        form.current_field = DURATION_ORDER;
        form.update_active_field();
        for c in "3d".chars() {
            form.handle_char(c);
        }
        form.current_field = START_ORDER;
        form.update_active_field();
        for c in "tomorrow".chars() {
            form.handle_char(c);
        }
        let draft = form.to_draft(date(13, 3, 2025));
        assert_eq!(draft.description, "Align MCP");
        assert_eq!(draft.duration, Some(3));
        assert_eq!(draft.starting_date, Some(date(14, 3, 2025)));
        assert_eq!(draft.sub_system, None);
    }

    #[test]
    fn test_flat_form_skips_start_field() {
        let mut form = SubmissionForm::new(2, false);
        form.current_field = DURATION_ORDER;
        form.next_field();
        assert_eq!(form.current_field, DESCRIPTION_ORDER);
    }
}
