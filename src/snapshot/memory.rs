use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{ArenaError, Result};

use super::{ArenaSnapshot, SnapshotSink};

/// Keeps every snapshot in memory
#[derive(Default)]
pub struct InMemorySink {
    snapshots: Mutex<Vec<ArenaSnapshot>>,
    fail_writes: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose every write fails
    pub fn failing() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn snapshots(&self) -> Vec<ArenaSnapshot> {
        self.snapshots
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn latest(&self) -> Option<ArenaSnapshot> {
        self.snapshots.lock().ok().and_then(|s| s.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotSink for InMemorySink {
    async fn write(&self, snapshot: &ArenaSnapshot) -> Result<()> {
        if self.fail_writes {
            return Err(ArenaError::Snapshot("sink configured to fail".to_string()));
        }
        self.snapshots
            .lock()
            .map_err(|_| ArenaError::Snapshot("sink lock poisoned".to_string()))?
            .push(snapshot.clone());
        Ok(())
    }
}
