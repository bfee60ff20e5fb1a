use std::fmt;
use std::sync::{Arc, Mutex};

use crate::core::Result;

use super::QueryResult;

type Slot = Arc<Mutex<Option<QueryResult>>>;

/// Target a driver writes a statement's result into.
///
/// Cloning shares the underlying slots, so the caller keeps a handle while the
/// driver (and every retry of the statement) writes through its copy. The
/// last write wins, which keeps a replayed statement from leaking the outcome
/// of an aborted attempt.
#[derive(Clone, Default)]
pub struct Results {
    slots: Vec<Slot>,
}

impl Results {
    /// A target that discards whatever is written to it.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new() -> Self {
        Self {
            slots: vec![Arc::new(Mutex::new(None))],
        }
    }

    /// Collects several targets into one; a write reaches all of them.
    pub fn merge(targets: impl IntoIterator<Item = Results>) -> Self {
        Self {
            slots: targets.into_iter().flat_map(|r| r.slots).collect(),
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn set(&self, result: QueryResult) -> Result<()> {
        for slot in &self.slots {
            *slot.lock()? = Some(result.clone());
        }
        Ok(())
    }

    /// Current value of the first slot.
    pub fn get(&self) -> Result<Option<QueryResult>> {
        match self.slots.first() {
            Some(slot) => Ok(slot.lock()?.clone()),
            None => Ok(None),
        }
    }

    pub fn take(&self) -> Result<Option<QueryResult>> {
        match self.slots.first() {
            Some(slot) => Ok(slot.lock()?.take()),
            None => Ok(None),
        }
    }

    /// True when both handles point at exactly the same slots.
    pub fn same_target(&self, other: &Results) -> bool {
        self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl fmt::Debug for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("slots", &self.slots.len())
            .finish()
    }
}
