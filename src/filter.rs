//! Filter/view projection over the task collection.
//!
//! A `TaskFilter` selects values per dimension; a task is shown when it matches
//! every dimension (any selected value within one dimension will do). Applying a
//! filter borrows the collection and never changes it.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use crate::db::Database;
use crate::fields::{Priority, Status, SubSystem};
use crate::task::Task;

/// A filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    ContactPerson,
    SubSystem,
    Priority,
    Status,
    Duration,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::ContactPerson => "contact person",
            Dimension::SubSystem => "sub-system",
            Dimension::Priority => "priority",
            Dimension::Status => "status",
            Dimension::Duration => "duration",
        };
        f.write_str(name)
    }
}

/// Raised for a dimension with nothing to choose from in the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterWarning {
    pub dimension: Dimension,
}

impl fmt::Display for FilterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no {} values available to filter on", self.dimension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub contact_persons: BTreeSet<String>,
    pub sub_systems: BTreeSet<SubSystem>,
    pub priorities: BTreeSet<Priority>,
    pub statuses: BTreeSet<Status>,
    /// Inclusive day range.
    pub duration: RangeInclusive<u32>,
}

/// The tasks a filter let through, plus any catalog warnings.
#[derive(Debug)]
pub struct Projection<'a> {
    pub tasks: Vec<&'a Task>,
    pub warnings: Vec<FilterWarning>,
}

/// Values present in the collection for each dimension.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub contact_persons: BTreeSet<String>,
    pub sub_systems: BTreeSet<SubSystem>,
    pub priorities: BTreeSet<Priority>,
    pub statuses: BTreeSet<Status>,
    pub duration: Option<(u32, u32)>,
}

impl Catalog {
    pub fn of(db: &Database) -> Self {
        Catalog {
            contact_persons: db.contact_persons(),
            sub_systems: db.tasks.iter().map(|t| t.sub_system).collect(),
            priorities: db.tasks.iter().map(|t| t.priority).collect(),
            statuses: db.tasks.iter().map(|t| t.status).collect(),
            duration: db.duration_bounds(),
        }
    }

    /// Dimensions whose catalog is empty.
    pub fn warnings(&self) -> Vec<FilterWarning> {
        let empty = [
            (Dimension::ContactPerson, self.contact_persons.is_empty()),
            (Dimension::SubSystem, self.sub_systems.is_empty()),
            (Dimension::Priority, self.priorities.is_empty()),
            (Dimension::Status, self.statuses.is_empty()),
            (Dimension::Duration, self.duration.is_none()),
        ];
        empty
            .into_iter()
            .filter(|&(_, is_empty)| is_empty)
            .map(|(dimension, _)| FilterWarning { dimension })
            .collect()
    }
}

impl TaskFilter {
    /// Select everything the collection offers.
    pub fn full_catalog(db: &Database) -> Self {
        Self::from_catalog(&Catalog::of(db))
    }

    pub fn from_catalog(catalog: &Catalog) -> Self {
        let (lo, hi) = catalog.duration.unwrap_or((0, u32::MAX));
        TaskFilter {
            contact_persons: catalog.contact_persons.clone(),
            sub_systems: catalog.sub_systems.clone(),
            priorities: catalog.priorities.clone(),
            statuses: catalog.statuses.clone(),
            duration: lo..=hi,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.contact_persons.contains(&task.contact_person)
            && self.sub_systems.contains(&task.sub_system)
            && self.priorities.contains(&task.priority)
            && self.statuses.contains(&task.status)
            && self.duration.contains(&task.duration)
    }

    /// Project the collection through this filter.
    pub fn apply<'a>(&self, db: &'a Database) -> Projection<'a> {
        Projection {
            tasks: db.tasks.iter().filter(|t| self.matches(t)).collect(),
            warnings: Catalog::of(db).warnings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::tests::{date, sample_task};

    fn db() -> Database {
        let mut db = Database::default();
        let rows = [
            (1, "Marion", SubSystem::Hv, Priority::Low, Status::NotStarted, 10),
            (2, "Marion", SubSystem::Hv, Priority::High, Status::NotStarted, 20),
            (3, "Michal", SubSystem::Lv, Priority::Medium, Status::NotStarted, 10),
            (4, "Marion", SubSystem::Planning, Priority::Low, Status::InProgress, 2),
        ];
        for (id, contact, sub, pri, status, days) in rows {
            let mut t = sample_task(id, status, date(27, 2, 2025), days);
            t.contact_person = contact.into();
            t.sub_system = sub;
            t.priority = pri;
            db.append(t).unwrap();
        }
        db
    }

    #[test]
    fn test_full_catalog_returns_everything() {
        let db = db();
        let view = TaskFilter::full_catalog(&db).apply(&db);
        assert_eq!(view.tasks.len(), db.len());
        assert!(view.tasks.iter().zip(&db.tasks).all(|(a, b)| *a == b));
        assert!(view.warnings.is_empty());
    }

    #[test]
    fn test_and_across_or_within() {
        let db = db();
        let mut filter = TaskFilter::full_catalog(&db);
        filter.priorities = [Priority::Low, Priority::High].into_iter().collect();
        filter.contact_persons = ["Marion".to_string()].into_iter().collect();
        filter.duration = 5..=20;
        let ids: Vec<u64> = filter.apply(&db).tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_empty_selection_matches_nothing() {
        let db = db();
        let mut filter = TaskFilter::full_catalog(&db);
        filter.statuses.clear();
        let view = filter.apply(&db);
        assert!(view.tasks.is_empty());
        assert!(view.warnings.is_empty());
    }

    #[test]
    fn test_empty_collection_warns_every_dimension() {
        let db = Database::default();
        let view = TaskFilter::full_catalog(&db).apply(&db);
        assert!(view.tasks.is_empty());
        assert_eq!(view.warnings.len(), 5);
        assert_eq!(view.warnings[0].dimension, Dimension::ContactPerson);
    }
}
