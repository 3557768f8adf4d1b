//! Main application logic for the dashboard.
//!
//! This module contains the `App` struct, which owns the `Session`, handles
//! key input, renders each screen (task grid, add form, filters, statistics)
//! and routes every change through the session so derived fields stay
//! consistent.

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::config::Schema;
use crate::db::{format_date, format_end_relative, format_on_track};
use crate::fields::{Priority, Status};
use crate::filter::FilterWarning;
use crate::session::Session;
use crate::stats::Stats;
use crate::task::FieldEdit;
use crate::tui::{
    colors::{priority_color, status_color, BEAM_BLUE, DARK_GREEN, DARK_RED, GOLD},
    enums::{AppState, ConfirmAction, EditColumn},
    filter_form::{FilterForm, FilterRow},
    task_form::{
        SubmissionForm, CONTACT_ORDER, DESCRIPTION_ORDER, DURATION_ORDER, PRIORITY_ORDER,
        START_ORDER, STATUS_ORDER, SUB_SYSTEM_ORDER,
    },
    utils::centered_rect,
};

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Next or previous entry of a catalog, wrapping around.
fn step<T: Copy + PartialEq>(current: T, all: &[T], forward: bool) -> T {
    let i = all.iter().position(|&v| v == current).unwrap_or(0);
    let n = all.len();
    if forward {
        all[(i + 1) % n]
    } else {
        all[(i + n - 1) % n]
    }
}

/// Dashboard state.
pub struct App {
    state: AppState,
    session: Session,
    task_list_state: TableState,
    /// Ids of the rows currently shown, in grid order.
    visible: Vec<u64>,
    warnings: Vec<FilterWarning>,
    form: SubmissionForm,
    filter_form: FilterForm,
    column: EditColumn,
    confirm: Option<ConfirmAction>,
    status_message: String,
}

impl App {
    pub fn new(session: Session) -> Self {
        let with_start = session.schema() == Schema::Extended;
        let form = SubmissionForm::new(session.workflow.attempt(), with_start);
        let filter_form = FilterForm::new(session.db());
        let mut app = App {
            state: AppState::TaskList,
            session,
            task_list_state: TableState::default(),
            visible: Vec::new(),
            warnings: Vec::new(),
            form,
            filter_form,
            column: EditColumn::Status,
            confirm: None,
            status_message: String::new(),
        };
        app.update_visible();
        app
    }

    /// Recompute the visible rows from the filter, keeping the selection on the
    /// same task when it is still shown.
    fn update_visible(&mut self) {
        let old_selected = self.selected_id();
        self.filter_form.sync(self.session.db());
        let view = self.session.view(&self.filter_form.filter, now());
        self.visible = view.tasks.iter().map(|t| t.id).collect();
        self.warnings = view.warnings;

        let idx = old_selected
            .and_then(|id| self.visible.iter().position(|&v| v == id))
            .or(if self.visible.is_empty() { None } else { Some(0) });
        self.task_list_state.select(idx);
    }

    fn selected_id(&self) -> Option<u64> {
        self.task_list_state
            .selected()
            .and_then(|i| self.visible.get(i))
            .copied()
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Apply the inline edit for the selected row and column.
    fn edit_selected(&mut self, forward: bool) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let Some(task) = self.session.db().get(id) else {
            return;
        };
        let edit = match self.column {
            EditColumn::Status => FieldEdit::Status(step(task.status, &Status::ALL, forward)),
            EditColumn::Priority => FieldEdit::Priority(step(task.priority, &Priority::ALL, forward)),
            EditColumn::Duration => FieldEdit::Duration(if forward {
                task.duration.saturating_add(1)
            } else {
                task.duration.saturating_sub(1)
            }),
            EditColumn::StartingDate => {
                let start = task.starting_date.unwrap_or(task.submission_date);
                let moved = if forward { start.succ_opt() } else { start.pred_opt() };
                match moved {
                    Some(d) => FieldEdit::StartingDate(d),
                    None => return,
                }
            }
        };
        match self.session.edit(id, edit, now()) {
            Ok(task) => {
                let msg = format!(
                    "Task {} edited (end {}, on track: {})",
                    task.id,
                    format_date(task.expected_end_date),
                    format_on_track(task.is_on_track)
                );
                self.set_status_message(msg);
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
        self.update_visible();
    }

    fn commit(&mut self) {
        match self.session.commit() {
            Ok(()) => self.set_status_message(format!("Committed {} task(s)", self.session.db().len())),
            Err(e) => self.set_status_message(format!("Commit failed: {e}")),
        }
    }

    fn handle_task_list_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> io::Result<bool> {
        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.session.is_dirty() {
                    self.confirm = Some(ConfirmAction::Quit);
                    self.state = AppState::Confirm;
                } else {
                    return Ok(true);
                }
            }
            KeyCode::Up => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected > 0 {
                        self.task_list_state.select(Some(selected - 1));
                    }
                } else if !self.visible.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected + 1 < self.visible.len() {
                        self.task_list_state.select(Some(selected + 1));
                    }
                } else if !self.visible.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Left => self.column = self.column.prev(),
            KeyCode::Right | KeyCode::Tab => self.column = self.column.next(),
            KeyCode::Char(' ') | KeyCode::Char('+') | KeyCode::Char('=') => self.edit_selected(true),
            KeyCode::Char('-') => self.edit_selected(false),
            KeyCode::Char('a') => {
                if self.form.attempt != self.session.workflow.attempt() {
                    self.form = SubmissionForm::new(self.session.workflow.attempt(), self.form.with_start);
                }
                self.state = AppState::AddTask;
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    self.confirm = Some(ConfirmAction::Delete(id));
                    self.state = AppState::Confirm;
                }
            }
            KeyCode::Char('f') => self.state = AppState::Filter,
            KeyCode::Char('s') => self.state = AppState::Stats,
            KeyCode::Char('h') | KeyCode::Char('?') => self.state = AppState::Help,
            KeyCode::Char('w') => self.commit(),
            KeyCode::Char('r') => {
                self.update_visible();
                self.set_status_message("View refreshed");
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_input(&mut self, key: KeyCode) -> io::Result<bool> {
        match key {
            KeyCode::Esc => self.state = AppState::TaskList,
            KeyCode::Tab | KeyCode::Down => self.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.form.prev_field(),
            KeyCode::Left => self.form.handle_left_right(false),
            KeyCode::Right => self.form.handle_left_right(true),
            KeyCode::Backspace => self.form.handle_backspace(),
            KeyCode::Delete => self.form.handle_delete(),
            KeyCode::Enter => self.submit_form(),
            KeyCode::Char(c) => self.form.handle_char(c),
            _ => {}
        }
        Ok(false)
    }

    /// Hand the form values to the submission workflow.
    fn submit_form(&mut self) {
        let now = now();
        self.session.workflow.draft = self.form.to_draft(now.date());
        // On failure the workflow keeps the message and the form renders it.
        if let Ok(id) = self.session.submit(now) {
            self.form = SubmissionForm::new(self.session.workflow.attempt(), self.form.with_start);
            self.state = AppState::TaskList;
            self.update_visible();
            if let Some(idx) = self.visible.iter().position(|&v| v == id) {
                self.task_list_state.select(Some(idx));
            }
            self.set_status_message(format!("Task submitted! (#{id}) Press 'w' to commit"));
        }
    }

    fn handle_filter_input(&mut self, key: KeyCode) -> io::Result<bool> {
        match key {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('f') => {
                self.state = AppState::TaskList;
                let msg = if self.filter_form.is_narrowed() {
                    format!("Filter applied ({} tasks)", self.visible.len())
                } else {
                    "Showing all tasks".to_string()
                };
                self.set_status_message(msg);
            }
            KeyCode::Up => self.filter_form.up(),
            KeyCode::Down => self.filter_form.down(),
            KeyCode::Char(' ') => self.filter_form.toggle(),
            KeyCode::Left | KeyCode::Char('-') => self.filter_form.adjust(false),
            KeyCode::Right | KeyCode::Char('+') => self.filter_form.adjust(true),
            KeyCode::Char('r') => self.filter_form.reset(),
            _ => {}
        }
        self.update_visible();
        Ok(false)
    }

    fn handle_confirm_input(&mut self, key: KeyCode) -> io::Result<bool> {
        let action = self.confirm.take();
        self.state = AppState::TaskList;
        match (key, action) {
            (KeyCode::Char('y') | KeyCode::Char('Y'), Some(ConfirmAction::Delete(id))) => {
                match self.session.delete(id) {
                    Ok(task) => self.set_status_message(format!("Deleted task {} (press 'w' to commit)", task.id)),
                    Err(e) => self.set_status_message(format!("Error: {e}")),
                }
                self.update_visible();
            }
            (KeyCode::Char('y') | KeyCode::Char('Y'), Some(ConfirmAction::Quit)) => return Ok(true),
            (KeyCode::Char('w'), Some(ConfirmAction::Quit)) => {
                self.commit();
                return Ok(!self.session.is_dirty());
            }
            _ => self.set_status_message("Cancelled"),
        }
        Ok(false)
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(false);
                }
                self.status_message.clear();
                return match self.state {
                    AppState::TaskList => self.handle_task_list_input(key.code, key.modifiers),
                    AppState::AddTask => self.handle_form_input(key.code),
                    AppState::Filter => self.handle_filter_input(key.code),
                    AppState::Confirm => self.handle_confirm_input(key.code),
                    AppState::Stats | AppState::Help => {
                        self.state = AppState::TaskList;
                        Ok(false)
                    }
                };
            }
        }
        Ok(false)
    }

    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let today = now().date();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let stats = Stats::of(self.session.db());
        let mut header_spans = vec![
            Span::styled("TEST-BEAM PREPARATION", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{} open, {} behind schedule", stats.open, stats.off_track),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ];
        if self.session.is_dirty() {
            header_spans.push(Span::styled("  [uncommitted]", Style::default().fg(GOLD)));
        }
        let header_block = Paragraph::new(Line::from(header_spans))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, chunks[0]);

        let header_cells = [
            "ID", "Sub-system", "Status", "Priority", "Contact", "Duration", "Start", "End", "Track", "Description",
        ]
        .iter()
        .map(|h| {
            let editable = EditColumn::ALL
                .iter()
                .any(|c| c.label() == *h && *c == self.column);
            let style = if editable {
                Style::default().fg(Color::Black).bg(GOLD).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Cell::from(*h).style(style)
        });
        let header = Row::new(header_cells)
            .style(Style::default().bg(BEAM_BLUE).fg(Color::White))
            .height(1);

        let db = self.session.db();
        let rows: Vec<Row> = self
            .visible
            .iter()
            .filter_map(|&id| db.get(id))
            .map(|task| {
                let track_style = if task.is_on_track {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::White).bg(DARK_RED)
                };
                Row::new(vec![
                    Cell::from(task.id.to_string()),
                    Cell::from(task.sub_system.label()),
                    Cell::from(task.status.label()).style(Style::default().fg(status_color(task.status))),
                    Cell::from(task.priority.label()).style(Style::default().fg(priority_color(task.priority))),
                    Cell::from(task.contact_person.clone()),
                    Cell::from(format!("{}d", task.duration)),
                    Cell::from(format_date(task.starting_date)),
                    Cell::from(format_end_relative(task.expected_end_date, today)),
                    Cell::from(format_on_track(task.is_on_track)).style(track_style),
                    Cell::from(task.description.clone()),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(4),
            Constraint::Length(19),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(11),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Min(20),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                self.visible.len(),
                db.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[1], &mut self.task_list_state);
    }

    fn render_task_form(&mut self, f: &mut Frame, area: Rect) {
        let popup = centered_rect(70, 80, area);
        f.render_widget(Clear, popup);

        let label_style = |order: usize| {
            if self.form.current_field == order {
                Style::default().fg(GOLD).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            }
        };
        let selector = |v: Option<String>| match v {
            Some(v) => format!("< {v} >"),
            None => "< choose >".to_string(),
        };

        let mut fields = vec![
            (DESCRIPTION_ORDER, "Describe the task", self.form.description.display()),
            (SUB_SYSTEM_ORDER, "Sub-system", selector(self.form.sub_system.map(|s| s.to_string()))),
            (STATUS_ORDER, "Status", selector(self.form.status.map(|s| s.to_string()))),
            (PRIORITY_ORDER, "Priority", selector(self.form.priority.map(|p| p.to_string()))),
            (CONTACT_ORDER, "Contact person", self.form.contact_person.display()),
            (DURATION_ORDER, "Duration (days)", self.form.duration.display()),
        ];
        if self.form.with_start {
            fields.push((START_ORDER, "Starting date", self.form.starting_date.display()));
        }

        let mut lines: Vec<Line> = Vec::new();
        for (order, label, value) in fields {
            lines.push(Line::from(vec![
                Span::styled(format!("{label:<18}"), label_style(order)),
                Span::raw(value),
            ]));
            lines.push(Line::from(""));
        }
        if let Some(err) = self.session.workflow.error() {
            lines.push(Line::from(Span::styled(
                err.to_string(),
                Style::default().fg(Color::White).bg(DARK_RED).add_modifier(Modifier::BOLD),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Tab/Up/Down: move  Left/Right/Space: choose  Enter: submit  Esc: back",
            Style::default().fg(Color::DarkGray),
        )));

        let form = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Add a task (submission #{}, {:?})",
                self.form.attempt + 1,
                self.session.workflow.state()
            )))
            .wrap(Wrap { trim: false });
        f.render_widget(form, popup);
    }

    fn render_filter(&mut self, f: &mut Frame, area: Rect) {
        let popup = centered_rect(60, 85, area);
        f.render_widget(Clear, popup);

        let mut lines: Vec<Line> = Vec::new();
        let mut last_dimension = None;
        for (i, row) in self.filter_form.rows.iter().enumerate() {
            let dimension = row.dimension();
            if last_dimension != Some(dimension) {
                lines.push(Line::from(Span::styled(
                    format!("{}", dimension).to_uppercase(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                last_dimension = Some(dimension);
            }
            let text = match row {
                FilterRow::Contact(c) => c.clone(),
                FilterRow::SubSystem(s) => s.to_string(),
                FilterRow::Priority(p) => p.to_string(),
                FilterRow::Status(s) => s.to_string(),
                FilterRow::MinDuration => format!("min {} day(s)", self.filter_form.filter.duration.start()),
                FilterRow::MaxDuration => format!("max {} day(s)", self.filter_form.filter.duration.end()),
            };
            let mark = match row {
                FilterRow::MinDuration | FilterRow::MaxDuration => "   ",
                _ if self.filter_form.is_selected(row) => "[x]",
                _ => "[ ]",
            };
            let style = if i == self.filter_form.cursor {
                Style::default().bg(Color::Gray).fg(Color::Black)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!("  {mark} {text}"), style)));
        }
        for warning in &self.warnings {
            lines.push(Line::from(Span::styled(
                format!("warning: {warning}"),
                Style::default().fg(GOLD),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Space: toggle  Left/Right: bounds  r: reset  Enter: done  ({} shown)",
                self.visible.len()
            ),
            Style::default().fg(Color::DarkGray),
        )));

        let scroll = (self.filter_form.cursor as u16).saturating_sub(popup.height.saturating_sub(8));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Filters"))
            .scroll((scroll, 0));
        f.render_widget(paragraph, popup);
    }

    fn render_stats(&mut self, f: &mut Frame, area: Rect) {
        let stats = Stats::of(self.session.db());
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(8), Constraint::Min(8)])
            .split(area);

        let summary = Paragraph::new(vec![
            Line::from(format!("Number of tasks: {}", stats.total)),
            Line::from(format!("Number of open tasks: {}", stats.open)),
            Line::from(Span::styled(
                format!("Tasks behind schedule: {}", stats.off_track),
                Style::default().fg(if stats.off_track > 0 { Color::LightRed } else { Color::Green }),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Statistics"));
        f.render_widget(summary, chunks[0]);

        let by_status: Vec<(&str, u64)> = Status::ALL
            .iter()
            .map(|s| (s.label(), stats.count_status(*s) as u64))
            .collect();
        let status_chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL).title("Task status"))
            .data(by_status.as_slice())
            .bar_width(13)
            .bar_gap(2)
            .bar_style(Style::default().fg(GOLD))
            .value_style(Style::default().fg(Color::Black).bg(GOLD));
        f.render_widget(status_chart, chunks[1]);

        let by_priority: Vec<(&str, u64)> = Priority::ALL
            .iter()
            .map(|p| (p.label(), stats.count_priority(*p) as u64))
            .collect();
        let priority_chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL).title("Current task priorities"))
            .data(by_priority.as_slice())
            .bar_width(13)
            .bar_gap(2)
            .bar_style(Style::default().fg(DARK_GREEN))
            .value_style(Style::default().fg(Color::White).bg(DARK_GREEN));
        f.render_widget(priority_chart, chunks[2]);
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let popup = centered_rect(60, 70, area);
        f.render_widget(Clear, popup);
        let help = [
            ("Up/Down", "select task"),
            ("Left/Right", "choose column to edit"),
            ("Space/+", "next value / one more day"),
            ("-", "previous value / one day less"),
            ("a", "add a task"),
            ("d", "delete selected task"),
            ("f", "filters"),
            ("s", "statistics"),
            ("w", "commit changes to the store"),
            ("r", "refresh view"),
            ("q/Esc", "quit"),
        ];
        let mut lines: Vec<Line> = help
            .iter()
            .map(|(key, what)| {
                Line::from(vec![
                    Span::styled(format!("{key:<12}"), Style::default().fg(GOLD)),
                    Span::raw(*what),
                ])
            })
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "Schema: {}  Edits stay in memory until committed.",
            self.session.schema()
        )));
        let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
        f.render_widget(paragraph, popup);
    }

    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let popup = centered_rect(50, 20, area);
        f.render_widget(Clear, popup);
        let text = match self.confirm {
            Some(ConfirmAction::Delete(id)) => format!("Delete task {id}? (y/n)"),
            Some(ConfirmAction::Quit) => "Quit without committing? (y: quit, w: commit and quit, n: stay)".to_string(),
            None => String::new(),
        };
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Confirm"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, popup);
    }

    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                AppState::TaskList => format!(
                    "Tasks: {} | Editing column: {} | Press 'h' for help",
                    self.visible.len(),
                    self.column.label()
                ),
                AppState::AddTask => "Add Task".to_string(),
                AppState::Filter => "Filters".to_string(),
                AppState::Stats => "Statistics (any key to return)".to_string(),
                AppState::Help => "Help (any key to return)".to_string(),
                AppState::Confirm => "Confirm Action".to_string(),
            }
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(BEAM_BLUE).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::TaskList => self.render_task_list(f, chunks[0]),
            AppState::AddTask => {
                self.render_task_list(f, chunks[0]);
                self.render_task_form(f, chunks[0]);
            }
            AppState::Filter => {
                self.render_task_list(f, chunks[0]);
                self.render_filter(f, chunks[0]);
            }
            AppState::Stats => self.render_stats(f, chunks[0]),
            AppState::Help => {
                self.render_task_list(f, chunks[0]);
                self.render_help(f, chunks[0]);
            }
            AppState::Confirm => {
                self.render_task_list(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }

        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop. Returns when the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
