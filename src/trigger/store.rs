//! Durable sled-backed trigger store.

use std::sync::Arc;

use sled::{Db, Tree};

use crate::checkpoint::persistence::to_storage_io;
use crate::clock::{Clock, SystemClock};
use crate::error::{StorageError, SweepError};
use crate::trigger::{due_at_ms, Trigger, TriggerApi, TriggerHandle};
use std::io;
use std::time::Duration;

const TREE_TRIGGERS: &str = "triggers";
const HANDLE_PAD: usize = 20;

/// Triggers persisted next to the checkpoint, read by the `run` host loop
#[derive(Clone)]
pub struct SledTriggerStore {
    db: Db,
    triggers: Tree,
    clock: Arc<dyn Clock>,
}

impl SledTriggerStore {
    pub fn new(db: Db) -> Result<Self, StorageError> {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Db, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        let triggers = db.open_tree(TREE_TRIGGERS).map_err(to_storage_io)?;
        Ok(Self {
            db,
            triggers,
            clock,
        })
    }

    fn put(&self, trigger: &Trigger) -> Result<(), StorageError> {
        let value = serde_json::to_vec(trigger).map_err(to_storage_data)?;
        self.triggers
            .insert(trigger.handle.as_str().as_bytes(), value)
            .map_err(to_storage_io)?;
        self.triggers.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

impl TriggerApi for SledTriggerStore {
    fn schedule_delayed(&self, entry_point: &str, delay: Duration) -> Result<Trigger, SweepError> {
        let id = self.db.generate_id().map_err(to_storage_io)?;
        let now = self.clock.now_millis();
        let trigger = Trigger {
            handle: TriggerHandle::new(format!("{:0width$}", id, width = HANDLE_PAD)),
            entry_point: entry_point.to_string(),
            created_at_ms: now,
            due_at_ms: due_at_ms(now, delay),
        };
        self.put(&trigger)?;
        Ok(trigger)
    }

    fn list_triggers(&self) -> Result<Vec<Trigger>, SweepError> {
        let mut out = Vec::new();
        for result in self.triggers.iter() {
            let (_, value) = result.map_err(to_storage_io)?;
            let trigger: Trigger = serde_json::from_slice(&value).map_err(to_storage_data)?;
            out.push(trigger);
        }
        Ok(out)
    }

    fn delete_trigger(&self, handle: &TriggerHandle) -> Result<(), SweepError> {
        self.triggers
            .remove(handle.as_str().as_bytes())
            .map_err(to_storage_io)?;
        self.triggers.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
