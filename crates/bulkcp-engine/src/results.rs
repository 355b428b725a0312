//! Submission-ordered collection of job results
//!
//! Jobs finish in whatever order the scheduler's concurrency allows, but
//! callers read results back in the order the jobs were submitted. The
//! collector pre-allocates one slot per job and lets each worker deposit
//! into its own slot without coordinating with the others.

use bulkcp_types::PropertyBag;
use std::sync::{Arc, Mutex};

/// Holds one result slot per submitted job
#[derive(Debug, Clone, Default)]
pub struct ResultCollector {
    slots: Arc<Mutex<Vec<Option<PropertyBag>>>>,
}

impl ResultCollector {
    /// Create a collector with `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(vec![None; capacity])),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.lock().expect("result slots poisoned").len()
    }

    /// Deposit the result for the job submitted at `index`
    ///
    /// Depositing twice into one slot keeps the first result; a job has
    /// exactly one outcome.
    pub fn deposit(&self, index: usize, result: PropertyBag) {
        let mut slots = self.slots.lock().expect("result slots poisoned");
        if let Some(slot) = slots.get_mut(index) {
            if slot.is_none() {
                *slot = Some(result);
            }
        }
    }

    /// Check whether the slot at `index` is still empty
    pub fn is_empty_slot(&self, index: usize) -> bool {
        let slots = self.slots.lock().expect("result slots poisoned");
        slots.get(index).is_some_and(Option::is_none)
    }

    /// Take all results in submission order
    ///
    /// Unfilled slots come back as empty bags; the scheduler fills every
    /// slot before handing the collector to the caller, so an empty bag
    /// here means the collector was drained early.
    pub fn into_results(self) -> Vec<PropertyBag> {
        let mut slots = self.slots.lock().expect("result slots poisoned");
        slots
            .drain(..)
            .map(Option::unwrap_or_default)
            .collect()
    }
}
