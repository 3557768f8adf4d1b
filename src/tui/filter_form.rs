//! Filter screen state: one toggle per catalog value, plus duration bounds.

use crate::db::Database;
use crate::fields::{Priority, Status, SubSystem};
use crate::filter::{Catalog, Dimension, TaskFilter};

/// One selectable line of the filter screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRow {
    Contact(String),
    SubSystem(SubSystem),
    Priority(Priority),
    Status(Status),
    MinDuration,
    MaxDuration,
}

impl FilterRow {
    pub fn dimension(&self) -> Dimension {
        match self {
            FilterRow::Contact(_) => Dimension::ContactPerson,
            FilterRow::SubSystem(_) => Dimension::SubSystem,
            FilterRow::Priority(_) => Dimension::Priority,
            FilterRow::Status(_) => Dimension::Status,
            FilterRow::MinDuration | FilterRow::MaxDuration => Dimension::Duration,
        }
    }
}

pub struct FilterForm {
    pub catalog: Catalog,
    pub filter: TaskFilter,
    pub rows: Vec<FilterRow>,
    pub cursor: usize,
}

impl FilterForm {
    /// Everything selected.
    pub fn new(db: &Database) -> Self {
        let catalog = Catalog::of(db);
        let filter = TaskFilter::from_catalog(&catalog);
        let mut form = FilterForm { catalog, filter, rows: Vec::new(), cursor: 0 };
        form.rebuild_rows();
        form
    }

    /// Pick up catalog changes (new contacts, durations) after edits, keeping the
    /// current choices and selecting values that did not exist before.
    pub fn sync(&mut self, db: &Database) {
        let fresh = Catalog::of(db);
        for c in fresh.contact_persons.difference(&self.catalog.contact_persons) {
            self.filter.contact_persons.insert(c.clone());
        }
        for s in fresh.sub_systems.difference(&self.catalog.sub_systems) {
            self.filter.sub_systems.insert(*s);
        }
        for p in fresh.priorities.difference(&self.catalog.priorities) {
            self.filter.priorities.insert(*p);
        }
        for s in fresh.statuses.difference(&self.catalog.statuses) {
            self.filter.statuses.insert(*s);
        }
        if let (Some((old_lo, old_hi)), Some((lo, hi))) = (self.catalog.duration, fresh.duration) {
            let (cur_lo, cur_hi) = (*self.filter.duration.start(), *self.filter.duration.end());
            let new_lo = if cur_lo == old_lo { lo } else { cur_lo };
            let new_hi = if cur_hi == old_hi { hi } else { cur_hi };
            self.filter.duration = new_lo..=new_hi;
        } else if let Some((lo, hi)) = fresh.duration {
            self.filter.duration = lo..=hi;
        }
        self.catalog = fresh;
        self.rebuild_rows();
    }

    fn rebuild_rows(&mut self) {
        let mut rows: Vec<FilterRow> = Vec::new();
        rows.extend(self.catalog.contact_persons.iter().cloned().map(FilterRow::Contact));
        rows.extend(self.catalog.sub_systems.iter().copied().map(FilterRow::SubSystem));
        rows.extend(self.catalog.priorities.iter().copied().map(FilterRow::Priority));
        rows.extend(self.catalog.statuses.iter().copied().map(FilterRow::Status));
        if self.catalog.duration.is_some() {
            rows.push(FilterRow::MinDuration);
            rows.push(FilterRow::MaxDuration);
        }
        self.rows = rows;
        if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len().saturating_sub(1);
        }
    }

    pub fn is_selected(&self, row: &FilterRow) -> bool {
        match row {
            FilterRow::Contact(c) => self.filter.contact_persons.contains(c),
            FilterRow::SubSystem(s) => self.filter.sub_systems.contains(s),
            FilterRow::Priority(p) => self.filter.priorities.contains(p),
            FilterRow::Status(s) => self.filter.statuses.contains(s),
            FilterRow::MinDuration | FilterRow::MaxDuration => true,
        }
    }

    pub fn up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.cursor + 1 < self.rows.len() {
            self.cursor += 1;
        }
    }

    /// Flip the value under the cursor in or out of the selection.
    pub fn toggle(&mut self) {
        let Some(row) = self.rows.get(self.cursor).cloned() else {
            return;
        };
        fn flip<T: Ord>(set: &mut std::collections::BTreeSet<T>, v: T) {
            if !set.remove(&v) {
                set.insert(v);
            }
        }
        match row {
            FilterRow::Contact(c) => flip(&mut self.filter.contact_persons, c),
            FilterRow::SubSystem(s) => flip(&mut self.filter.sub_systems, s),
            FilterRow::Priority(p) => flip(&mut self.filter.priorities, p),
            FilterRow::Status(s) => flip(&mut self.filter.statuses, s),
            FilterRow::MinDuration | FilterRow::MaxDuration => {}
        }
    }

    /// Move a duration bound by one day, within the catalog range and never
    /// past the other bound.
    pub fn adjust(&mut self, up: bool) {
        let Some((min, max)) = self.catalog.duration else {
            return;
        };
        let (mut lo, mut hi) = (*self.filter.duration.start(), *self.filter.duration.end());
        match self.rows.get(self.cursor) {
            Some(FilterRow::MinDuration) => {
                lo = if up { (lo + 1).min(hi) } else { lo.saturating_sub(1).max(min) };
            }
            Some(FilterRow::MaxDuration) => {
                hi = if up { (hi + 1).min(max) } else { hi.saturating_sub(1).max(lo) };
            }
            _ => return,
        }
        self.filter.duration = lo..=hi;
    }

    /// Select the whole catalog again.
    pub fn reset(&mut self) {
        self.filter = TaskFilter::from_catalog(&self.catalog);
    }

    /// Whether anything is narrowed down.
    pub fn is_narrowed(&self) -> bool {
        self.filter != TaskFilter::from_catalog(&self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::{date, sample_task};

    fn db() -> Database {
        let mut db = Database::default();
        let mut a = sample_task(1, Status::NotStarted, date(1, 3, 2025), 2);
        a.contact_person = "Michal".into();
        let b = sample_task(2, Status::Done, date(1, 3, 2025), 9);
        db.append(a).unwrap();
        db.append(b).unwrap();
        db
    }

    #[test]
    fn test_toggle_and_reset() {
        let db = db();
        let mut form = FilterForm::new(&db);
        assert!(!form.is_narrowed());
        assert_eq!(form.rows[0], FilterRow::Contact("Marion".into()));
        form.toggle();
        assert!(form.is_narrowed());
        assert_eq!(form.filter.apply(&db).tasks.len(), 1);
        form.reset();
        assert_eq!(form.filter.apply(&db).tasks.len(), 2);
    }

    #[test]
    fn test_duration_bounds_stay_ordered() {
        let db = db();
        let mut form = FilterForm::new(&db);
        form.cursor = form.rows.iter().position(|r| *r == FilterRow::MaxDuration).unwrap();
        for _ in 0..20 {
            form.adjust(false);
        }
        assert_eq!(form.filter.duration, 2..=2);
        form.adjust(true);
        assert_eq!(form.filter.duration, 2..=3);
        form.cursor -= 1;
        for _ in 0..5 {
            form.adjust(true);
        }
        assert_eq!(form.filter.duration, 3..=3);
    }

    #[test]
    fn test_sync_selects_new_contacts() {
        let mut db = db();
        let mut form = FilterForm::new(&db);
        form.toggle();
        let mut c = sample_task(3, Status::InProgress, date(2, 3, 2025), 30);
        c.contact_person = "Tom".into();
        db.append(c).unwrap();
        form.sync(&db);
        assert!(form.filter.contact_persons.contains("Tom"));
        assert!(!form.filter.contact_persons.contains("Marion"));
        assert_eq!(form.filter.duration, 2..=30);
    }
}
