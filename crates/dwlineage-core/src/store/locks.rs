//! Per-script exclusive scopes shared by everything writing to one catalog.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, MutexGuard};

use super::StoreResult;
use crate::error::StoreError;

/// Script ids currently being reprocessed against a store.
#[derive(Debug, Default)]
pub struct ScriptLocks {
    held: Mutex<BTreeSet<String>>,
    released: Condvar,
}

/// Holds one script's scope until dropped.
#[derive(Debug)]
pub struct ScriptLock<'a> {
    locks: &'a ScriptLocks,
    script_id: String,
}

impl ScriptLocks {
    fn held(&self) -> StoreResult<MutexGuard<'_, BTreeSet<String>>> {
        self.held
            .lock()
            .map_err(|_| StoreError::Backend("script lock poisoned".to_string()))
    }

    /// Blocks until no one else holds `script_id`.
    pub fn acquire(&self, script_id: &str) -> StoreResult<ScriptLock<'_>> {
        let mut held = self.held()?;
        while held.contains(script_id) {
            held = self
                .released
                .wait(held)
                .map_err(|_| StoreError::Backend("script lock poisoned".to_string()))?;
        }
        held.insert(script_id.to_string());
        Ok(ScriptLock {
            locks: self,
            script_id: script_id.to_string(),
        })
    }

    pub fn is_held(&self, script_id: &str) -> bool {
        self.held().is_ok_and(|held| held.contains(script_id))
    }
}

impl Drop for ScriptLock<'_> {
    fn drop(&mut self) {
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.script_id);
        self.locks.released.notify_all();
    }
}
