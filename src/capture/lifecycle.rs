//! Per-entity table of sub-part activation intervals.

use std::collections::HashMap;

use log::warn;

use crate::error::{ReplayError, Result};
use crate::pose::{ActivityInterval, SubPartMeta};

/// Records when each sub-part of one entity was attached and detached.
#[derive(Debug, Clone, Default)]
pub struct LifecycleTracker {
    intervals: Vec<ActivityInterval>,
    /// Name -> index into `intervals` for intervals that are still open.
    open: HashMap<String, usize>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new interval at `at_frame`.
    ///
    /// Fails without side effects if the sub-part already has an open interval.
    pub fn open(&mut self, meta: SubPartMeta, at_frame: i32) -> Result<()> {
        if self.open.contains_key(&meta.name) {
            warn!("Sub-part '{}' is already active, ignoring attach", meta.name);
            return Err(ReplayError::InvalidInterval(format!(
                "duplicate open for '{}'",
                meta.name
            )));
        }
        self.open.insert(meta.name.clone(), self.intervals.len());
        self.intervals.push(ActivityInterval::open(meta, at_frame));
        Ok(())
    }

    /// Close the open interval for `name`; the sub-part is inactive from `at_frame` on.
    pub fn close(&mut self, name: &str, at_frame: i32) -> Result<()> {
        let Some(index) = self.open.remove(name) else {
            warn!("Sub-part '{name}' has no open interval, ignoring detach");
            return Err(ReplayError::InvalidInterval(format!(
                "close without open for '{name}'"
            )));
        };
        self.intervals[index].end_frame = at_frame;
        Ok(())
    }

    #[inline]
    pub fn is_open(&self, name: &str) -> bool {
        self.open.contains_key(name)
    }

    pub fn intervals(&self) -> &[ActivityInterval] {
        &self.intervals
    }

    /// Name of the first sub-part ever attached.
    pub fn first_part(&self) -> Option<&str> {
        self.intervals.first().map(|i| i.name())
    }

    /// Drop intervals that ended at or before `frame`.
    pub fn prune_before(&mut self, frame: i32) {
        let before = self.intervals.len();
        self.intervals.retain(|i| i.end_frame > frame);
        if self.intervals.len() != before {
            self.open = self
                .intervals
                .iter()
                .enumerate()
                .filter(|(_, i)| i.is_open())
                .map(|(idx, i)| (i.meta.name.clone(), idx))
                .collect();
        }
    }

    pub fn into_intervals(self) -> Vec<ActivityInterval> {
        self.intervals
    }
}
