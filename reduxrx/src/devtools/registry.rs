use super::DevToolsAction;
use crate::StoreError;
use futures_signals::signal::{Mutable, MutableSignalCloned};
use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

/// One staged action as shown by an inspector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub action_id: usize,
    pub kind: String,
    pub timestamp: i64,
    pub skipped: bool,
    pub current: bool,
}

/// The view an inspector has of an instrumented store, whatever its state type.
pub trait InspectableStore: Send + Sync {
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Dispatches a DevTools command to the store.
    fn perform(&self, command: DevToolsAction) -> Result<(), StoreError>;

    fn history(&self) -> Vec<HistoryEntry>;

    /// The pretty `Debug` rendering of the current state.
    fn current_state_debug(&self) -> Option<String>;
}

/// A store known to a [`DevToolsRegistry`].
#[derive(Clone)]
pub struct ConnectedStore {
    id: String,
    display_name: String,
    target: Weak<dyn InspectableStore>,
}

impl ConnectedStore {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The store, unless it has been dropped.
    pub fn upgrade(&self) -> Option<Arc<dyn InspectableStore>> {
        self.target.upgrade()
    }
}

impl PartialEq for ConnectedStore {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Debug for ConnectedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedStore")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// The instrumented stores an in-process inspector can see.
///
/// Stores created through
/// [`Instrument::enhancer_with_registry`](super::Instrument::enhancer_with_registry)
/// connect on creation and disconnect when disposed. The registry only holds
/// weak references. Clones share the same list.
#[derive(Clone, Default)]
pub struct DevToolsRegistry {
    stores: Mutable<Vec<ConnectedStore>>,
}

impl DevToolsRegistry {
    pub fn new() -> Self {
        DevToolsRegistry::default()
    }

    /// Adds a store. Connecting the same id twice is a no-op.
    pub fn connect(&self, store: Arc<dyn InspectableStore>) {
        let mut stores = self.stores.lock_mut();
        if stores.iter().any(|connected| connected.id == store.id()) {
            return;
        }
        tracing::debug!(id = store.id(), name = store.display_name(), "store connected");
        stores.push(ConnectedStore {
            id: store.id().to_string(),
            display_name: store.display_name().to_string(),
            target: Arc::downgrade(&store),
        });
    }

    /// Removes a store. Returns whether it was connected.
    pub fn disconnect(&self, id: &str) -> bool {
        let mut stores = self.stores.lock_mut();
        let Some(position) = stores.iter().position(|connected| connected.id == id) else {
            return false;
        };
        stores.remove(position);
        tracing::debug!(id, "store disconnected");
        true
    }

    /// The connected stores that are still alive.
    pub fn connected_stores(&self) -> Vec<ConnectedStore> {
        self.stores
            .lock_ref()
            .iter()
            .filter(|connected| connected.target.strong_count() > 0)
            .cloned()
            .collect()
    }

    pub fn get_store_by_id(&self, id: &str) -> Option<Arc<dyn InspectableStore>> {
        self.stores
            .lock_ref()
            .iter()
            .find(|connected| connected.id == id)
            .and_then(ConnectedStore::upgrade)
    }

    /// Emits the list of connected stores every time it changes.
    pub fn stores_signal(&self) -> MutableSignalCloned<Vec<ConnectedStore>> {
        self.stores.signal_cloned()
    }
}

impl Debug for DevToolsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stores.lock_ref().iter()).finish()
    }
}
