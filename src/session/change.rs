use std::fmt::Display;

use crate::tree::{snapshot::Snapshot, CategoryPath};

/// First structural difference found between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    Added(CategoryPath),
    Removed(CategoryPath),
    /// A leaf on one side is a nested mapping on the other.
    KindChanged(CategoryPath),
}

impl Display for SchemaChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaChange::Added(path) => write!(f, "added {path}"),
            SchemaChange::Removed(path) => write!(f, "removed {path}"),
            SchemaChange::KindChanged(path) => write!(f, "changed kind of {path}"),
        }
    }
}

/// Dirty check for the schema. Holds the snapshot taken when a round started and tells whether
/// the tree has to be persisted once the round is over.
pub struct ChangeDetector {
    baseline: Snapshot,
}

impl ChangeDetector {
    pub fn new(baseline: Snapshot) -> Self {
        Self { baseline }
    }

    pub fn detect(&self, current: &Snapshot) -> Option<SchemaChange> {
        first_difference(&self.baseline, current, &CategoryPath::root())
    }
}

fn first_difference(
    before: &Snapshot,
    after: &Snapshot,
    path: &CategoryPath,
) -> Option<SchemaChange> {
    if let Some((name, _)) = before.entries().find(|(name, _)| after.get(name).is_none()) {
        return Some(SchemaChange::Removed(path.child(name)));
    }
    if let Some((name, _)) = after.entries().find(|(name, _)| before.get(name).is_none()) {
        return Some(SchemaChange::Added(path.child(name)));
    }

    before.entries().find_map(|(name, value)| {
        let other = after.get(name)?;
        match (value, other) {
            (None, None) => None,
            (Some(value), Some(other)) => first_difference(value, other, &path.child(name)),
            _ => Some(SchemaChange::KindChanged(path.child(name))),
        }
    })
}
