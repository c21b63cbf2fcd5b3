// MIT License - Copyright (c) 2026 Peter Wright
// Snapshot diffing

use std::collections::BTreeMap;
use std::collections::btree_map;

use chrono::{DateTime, Utc};

use crate::point::PointStatus;

/// Every known point status at one poll, keyed by point id.
///
/// Replaced wholesale after each poll, never mutated in place. Ordered by
/// point id so that diffing is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    points: BTreeMap<String, PointStatus>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from status records. A later record for the same
    /// point id replaces an earlier one.
    pub fn from_points(points: impl IntoIterator<Item = PointStatus>) -> Self {
        Self {
            points: points
                .into_iter()
                .map(|p| (p.point_id.clone(), p))
                .collect(),
        }
    }

    pub fn get(&self, point_id: &str) -> Option<&PointStatus> {
        self.points.get(point_id)
    }

    pub fn contains(&self, point_id: &str) -> bool {
        self.points.contains_key(point_id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Statuses in point id order.
    pub fn iter(&self) -> btree_map::Values<'_, String, PointStatus> {
        self.points.values()
    }
}

impl FromIterator<PointStatus> for Snapshot {
    fn from_iter<I: IntoIterator<Item = PointStatus>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a PointStatus;
    type IntoIter = btree_map::Values<'a, String, PointStatus>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    New,
    Changed,
    Cleared,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Changed => "CHANGED",
            Self::Cleared => "CLEARED",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected change for one point between two snapshots.
///
/// `New` carries only `current`, `Cleared` only `previous`, and `Changed`
/// both (with differing status codes). Use the constructors to keep that
/// shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub previous: Option<PointStatus>,
    pub current: Option<PointStatus>,
    pub timestamp: DateTime<Utc>,
}

impl Transition {
    pub fn new_point(current: PointStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: TransitionKind::New,
            previous: None,
            current: Some(current),
            timestamp,
        }
    }

    pub fn changed(previous: PointStatus, current: PointStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: TransitionKind::Changed,
            previous: Some(previous),
            current: Some(current),
            timestamp,
        }
    }

    pub fn cleared(previous: PointStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: TransitionKind::Cleared,
            previous: Some(previous),
            current: None,
            timestamp,
        }
    }

    /// Id of the point this transition is about.
    pub fn point_id(&self) -> &str {
        self.current
            .as_ref()
            .or(self.previous.as_ref())
            .map(|p| p.point_id.as_str())
            .unwrap_or_default()
    }
}

/// Compare two snapshots and list what changed.
///
/// New and changed points come first, then cleared ones, each group in
/// point id order. Points whose status code is unchanged produce nothing.
/// Transitions are stamped with `timestamp`.
pub fn detect(previous: &Snapshot, current: &Snapshot, timestamp: DateTime<Utc>) -> Vec<Transition> {
    let mut transitions = Vec::new();

    for status in current {
        match previous.get(&status.point_id) {
            None => transitions.push(Transition::new_point(status.clone(), timestamp)),
            Some(old) if old.status_code != status.status_code => {
                transitions.push(Transition::changed(old.clone(), status.clone(), timestamp));
            }
            Some(_) => {}
        }
    }

    transitions.extend(
        previous
            .iter()
            .filter(|old| !current.contains(&old.point_id))
            .map(|old| Transition::cleared(old.clone(), timestamp)),
    );

    transitions
}
