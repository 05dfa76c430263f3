//! In-memory trigger registry

use crate::clock::{Clock, SystemClock};
use crate::error::SweepError;
use crate::trigger::{due_at_ms, Trigger, TriggerApi, TriggerHandle};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub struct MemoryTriggers {
    clock: Arc<dyn Clock>,
    state: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    triggers: BTreeMap<TriggerHandle, Trigger>,
    /// Highest number of triggers ever pending at once
    high_water: usize,
}

impl MemoryTriggers {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(Registry::default()),
        }
    }

    pub fn high_water(&self) -> usize {
        self.state.lock().high_water
    }
}

impl Default for MemoryTriggers {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerApi for MemoryTriggers {
    fn schedule_delayed(&self, entry_point: &str, delay: Duration) -> Result<Trigger, SweepError> {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        state.next_id += 1;
        let trigger = Trigger {
            handle: TriggerHandle::new(format!("mem-{}", state.next_id)),
            entry_point: entry_point.to_string(),
            created_at_ms: now,
            due_at_ms: due_at_ms(now, delay),
        };
        state.triggers.insert(trigger.handle.clone(), trigger.clone());
        state.high_water = state.high_water.max(state.triggers.len());
        Ok(trigger)
    }

    fn list_triggers(&self) -> Result<Vec<Trigger>, SweepError> {
        Ok(self.state.lock().triggers.values().cloned().collect())
    }

    fn delete_trigger(&self, handle: &TriggerHandle) -> Result<(), SweepError> {
        self.state.lock().triggers.remove(handle);
        Ok(())
    }
}
