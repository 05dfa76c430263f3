//! Resume triggers
//!
//! A trigger is a request to re-invoke an entry point once a delay has
//! elapsed. The `ResumeController` keeps at most one pending trigger for the
//! sweep entry point and removes them all on completion.

pub mod memory;
pub mod store;

pub use memory::MemoryTriggers;
pub use store::SledTriggerStore;

use crate::error::SweepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerHandle(String);

impl TriggerHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        TriggerHandle(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub handle: TriggerHandle,
    pub entry_point: String,
    pub created_at_ms: u64,
    pub due_at_ms: u64,
}

/// Due time for a trigger scheduled at `now_ms`, saturating at `u64::MAX`.
pub fn due_at_ms(now_ms: u64, delay: Duration) -> u64 {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    now_ms.saturating_add(delay_ms)
}

/// Host scheduling substrate for delayed re-invocation
pub trait TriggerApi: Send + Sync {
    fn schedule_delayed(&self, entry_point: &str, delay: Duration) -> Result<Trigger, SweepError>;
    fn list_triggers(&self) -> Result<Vec<Trigger>, SweepError>;
    fn delete_trigger(&self, handle: &TriggerHandle) -> Result<(), SweepError>;
}

/// Keeps the trigger set for one entry point hygienic
pub struct ResumeController {
    triggers: Arc<dyn TriggerApi>,
    entry_point: String,
    delay: Duration,
}

impl ResumeController {
    pub fn new(triggers: Arc<dyn TriggerApi>, entry_point: impl Into<String>, delay: Duration) -> Self {
        Self {
            triggers,
            entry_point: entry_point.into(),
            delay,
        }
    }

    /// Replace any pending trigger with exactly one new one.
    pub fn schedule_resume(&self) -> Result<Trigger, SweepError> {
        let removed = self.clear()?;
        let trigger = self.triggers.schedule_delayed(&self.entry_point, self.delay)?;
        info!(
            handle = %trigger.handle,
            entry_point = %trigger.entry_point,
            due_at_ms = trigger.due_at_ms,
            replaced = removed,
            "Resume trigger scheduled"
        );
        Ok(trigger)
    }

    /// Delete every trigger for the entry point. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, SweepError> {
        let mut removed = 0;
        for trigger in self.pending()? {
            self.triggers.delete_trigger(&trigger.handle)?;
            debug!(handle = %trigger.handle, "Resume trigger deleted");
            removed += 1;
        }
        Ok(removed)
    }

    /// Triggers for the entry point, soonest first
    pub fn pending(&self) -> Result<Vec<Trigger>, SweepError> {
        let mut pending: Vec<Trigger> = self
            .triggers
            .list_triggers()?
            .into_iter()
            .filter(|t| t.entry_point == self.entry_point)
            .collect();
        pending.sort_by_key(|t| t.due_at_ms);
        Ok(pending)
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}
