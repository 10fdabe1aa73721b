//! View-state store
//!
//! Owns the current [`PersistedViewState`] snapshot for one grid, hydrates it
//! from a [`ViewStatePort`] and writes it back after every effective change.
//!
//! Persistence never fails loudly: a read problem falls back to defaults, a
//! write problem is dropped. Both are logged at warn.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::column::ColumnSet;
use crate::error::StoreError;
use crate::view_state::{PersistedViewState, ViewAction};

/// Durable key/value storage for serialized view state
pub trait ViewStatePort {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, json: &str) -> Result<(), StoreError>;
}

/// In-memory port. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPort {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw entry (useful for legacy snapshots)
    pub fn with_entry(self, key: impl Into<String>, json: impl Into<String>) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), json.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl ViewStatePort for MemoryPort {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory port poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, json: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory port poisoned".into()))?;
        entries.insert(key.to_string(), json.to_string());
        Ok(())
    }
}

impl<P: ViewStatePort + ?Sized> ViewStatePort for Box<P> {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, json: &str) -> Result<(), StoreError> {
        (**self).save(key, json)
    }
}

// =============================================================================
// Snapshot I/O
// =============================================================================

/// Read and reconcile the snapshot stored under `key`.
///
/// Returns `None` when nothing usable is stored; the reason is logged.
pub fn load_snapshot(
    port: &dyn ViewStatePort,
    key: &str,
    columns: &ColumnSet,
) -> Option<PersistedViewState> {
    let json = match port.load(key) {
        Ok(Some(json)) => json,
        Ok(None) => {
            log::debug!("no stored view state for '{}'", key);
            return None;
        }
        Err(e) => {
            log::warn!("failed to read view state '{}': {}", key, e);
            return None;
        }
    };

    match PersistedViewState::from_json(&json) {
        Ok(state) => Some(state.reconcile(columns)),
        Err(e) => {
            log::warn!("discarding corrupt view state '{}': {}", key, e);
            None
        }
    }
}

/// Serialize and save. Errors are logged and dropped.
pub fn persist_snapshot(port: &dyn ViewStatePort, key: &str, state: &PersistedViewState) {
    let result = state
        .to_json()
        .map_err(StoreError::from)
        .and_then(|json| port.save(key, &json));
    if let Err(e) = result {
        log::warn!("failed to save view state '{}': {}", key, e);
    }
}

// =============================================================================
// Store
// =============================================================================

pub struct ViewStateStore {
    columns: ColumnSet,
    port: Box<dyn ViewStatePort>,
    storage_key: Option<String>,
    state: Arc<PersistedViewState>,
    hydrated: bool,
    revision: u64,
}

impl ViewStateStore {
    /// Starts from defaults, unhydrated. Without a storage key nothing is
    /// ever read or written.
    pub fn new(
        columns: ColumnSet,
        port: Box<dyn ViewStatePort>,
        storage_key: Option<String>,
    ) -> Self {
        let state = Arc::new(PersistedViewState::defaults(&columns));
        Self {
            columns,
            port,
            storage_key,
            state,
            hydrated: false,
            revision: 0,
        }
    }

    /// Load the stored snapshot (or keep defaults). A second call is a no-op.
    ///
    /// Returns true when a stored snapshot was restored.
    pub fn hydrate(&mut self) -> bool {
        if self.hydrated {
            return false;
        }
        self.hydrated = true;

        let restored = self
            .storage_key
            .as_deref()
            .and_then(|key| load_snapshot(self.port.as_ref(), key, &self.columns));

        match restored {
            Some(state) => {
                log::debug!(
                    "hydrated view state '{}'",
                    self.storage_key.as_deref().unwrap_or_default()
                );
                if *self.state != state {
                    self.state = Arc::new(state);
                    self.revision += 1;
                }
                true
            }
            None => false,
        }
    }

    /// Write the current snapshot. Ignored before hydration so a default
    /// state can never overwrite what the user saved.
    pub fn persist(&self) {
        if !self.hydrated {
            log::debug!("skipping persist before hydration");
            return;
        }
        if let Some(key) = &self.storage_key {
            persist_snapshot(self.port.as_ref(), key, &self.state);
        }
    }

    /// Apply an action; returns true when the state changed.
    pub fn dispatch(&mut self, action: ViewAction) -> bool {
        log::trace!("view action {:?}", action);
        let next = self.state.reduce(action, &self.columns);
        if next == *self.state {
            return false;
        }
        self.state = Arc::new(next);
        self.revision += 1;
        self.persist();
        true
    }

    pub fn snapshot(&self) -> Arc<PersistedViewState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &PersistedViewState {
        &self.state
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Bumped on every effective change
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl std::fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("storage_key", &self.storage_key)
            .field("hydrated", &self.hydrated)
            .field("revision", &self.revision)
            .field("state", &self.state)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnType};
    use crate::layout::FREEZE_OFF;
    use crate::sort::SortRule;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDef::new("name", "Name", ColumnType::Text),
            ColumnDef::new("active", "Active", ColumnType::Toggle),
        ])
        .unwrap()
    }

    struct FailingPort;

    impl ViewStatePort for FailingPort {
        fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }

        fn save(&self, _key: &str, _json: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("offline".into()))
        }
    }

    fn store(port: MemoryPort) -> ViewStateStore {
        ViewStateStore::new(columns(), Box::new(port), Some("people".into()))
    }

    #[test]
    fn test_dispatch_before_hydrate_does_not_persist() {
        let port = MemoryPort::new();
        let mut s = store(port.clone());
        assert!(s.dispatch(ViewAction::SetSorts(vec![SortRule::asc("name")])));
        assert!(port.get("people").is_none());

        s.hydrate();
        assert!(s.dispatch(ViewAction::SetFreezeCount(1)));
        assert!(port.get("people").unwrap().contains("\"freezeCount\":1"));
    }

    #[test]
    fn test_hydrate_restores_and_is_idempotent() {
        let port = MemoryPort::new();
        let mut first = store(port.clone());
        first.hydrate();
        first.dispatch(ViewAction::SetSorts(vec![SortRule::desc("name")]));

        let mut second = store(port.clone());
        assert!(second.hydrate());
        assert_eq!(second.state().sorts, vec![SortRule::desc("name")]);
        let rev = second.revision();
        assert!(!second.hydrate());
        assert_eq!(second.revision(), rev);
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_defaults() {
        let port = MemoryPort::new().with_entry("people", "{not json");
        let mut s = store(port);
        assert!(!s.hydrate());
        assert!(s.is_hydrated());
        assert_eq!(*s.snapshot(), PersistedViewState::defaults(&columns()));
    }

    #[test]
    fn test_failing_port_is_swallowed() {
        let mut s = ViewStateStore::new(columns(), Box::new(FailingPort), Some("k".into()));
        assert!(!s.hydrate());
        assert!(s.dispatch(ViewAction::SetFreezeCount(0)));
        assert_eq!(s.state().freeze_count, 0);
    }

    #[test]
    fn test_no_storage_key_never_touches_port() {
        let port = MemoryPort::new().with_entry("people", r#"{"freezeCount":1,"freezeVersion":2}"#);
        let mut s = ViewStateStore::new(columns(), Box::new(port), None);
        assert!(!s.hydrate());
        assert_eq!(s.state().freeze_count, FREEZE_OFF);
    }

    #[test]
    fn test_noop_action_keeps_revision() {
        let mut s = store(MemoryPort::new());
        s.hydrate();
        let rev = s.revision();
        assert!(!s.dispatch(ViewAction::ClearFilters));
        assert_eq!(s.revision(), rev);
    }
}
