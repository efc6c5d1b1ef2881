//! Shared Unit Queue
//!
//! The only mutable structure shared by the workers of one pool run.
//!
//! ## Responsibilities
//! - **Claiming**: hands out each unit to exactly one worker, first-available order.
//! - **Status tracking**: records the lifecycle of every unit for the final report.
//! - **Cut-off**: marks every unclaimed unit `Skipped` once the deadline passes.

use super::types::*;

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct UnitQueue {
    units: Vec<WorkUnit>,
    /// Index of the next unclaimed unit. Past the end once the queue is drained or closed.
    cursor: AtomicUsize,
    statuses: DashMap<UnitId, UnitStatus>,
}

impl UnitQueue {
    /// Queue over `units`, claimed in index order.
    pub fn new(mut units: Vec<WorkUnit>) -> Self {
        units.sort_by_key(|unit| unit.index);
        let statuses = units
            .iter()
            .map(|unit| (unit.id.clone(), UnitStatus::Pending))
            .collect();

        Self {
            units,
            cursor: AtomicUsize::new(0),
            statuses,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units not yet claimed.
    pub fn remaining(&self) -> usize {
        self.units
            .len()
            .saturating_sub(self.cursor.load(Ordering::SeqCst))
    }

    /// Claims the next unit and marks it running.
    ///
    /// `fetch_add` hands every index to exactly one caller, so no unit is ever assigned
    /// twice.
    pub fn try_claim(&self) -> Option<WorkUnit> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let unit = self.units.get(index)?.clone();
        self.statuses
            .insert(unit.id.clone(), UnitStatus::Running { attempt: 1 });
        Some(unit)
    }

    pub fn set_status(&self, id: &UnitId, status: UnitStatus) {
        self.statuses.insert(id.clone(), status);
    }

    pub fn status(&self, id: &UnitId) -> Option<UnitStatus> {
        self.statuses.get(id).map(|entry| entry.value().clone())
    }

    /// Closes the queue and marks every unit nobody claimed as skipped.
    pub fn skip_remaining(&self) -> Vec<UnitId> {
        let first_unclaimed = self.cursor.swap(self.units.len(), Ordering::SeqCst);

        let skipped: Vec<UnitId> = self
            .units
            .iter()
            .skip(first_unclaimed)
            .map(|unit| unit.id.clone())
            .collect();

        for id in &skipped {
            self.statuses.insert(id.clone(), UnitStatus::Skipped);
        }
        skipped
    }

    /// Every unit with its current status, in index order.
    pub fn snapshot(&self) -> Vec<(WorkUnit, UnitStatus)> {
        self.units
            .iter()
            .map(|unit| {
                let status = self.status(&unit.id).unwrap_or(UnitStatus::Pending);
                (unit.clone(), status)
            })
            .collect()
    }
}
