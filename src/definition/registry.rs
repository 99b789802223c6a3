/// Hot-reload definition registry using ArcSwap
///
/// Lock-free, atomic snapshot semantics for the in-memory definition store.
/// Reads never block: every lookup works on the current immutable map while
/// mutations build a replacement and swap the pointer through an RCU cycle,
/// so concurrent register/unregister calls serialize without a read-side
/// lock. The registry is the single source of truth for accepted
/// definitions; it holds no persistent storage and is rebuilt by discovery
/// on restart.

use crate::definition::types::Definition;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Change notification delivered to registry subscribers.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A definition was inserted or replaced.
    Registered(Arc<Definition>),
    /// A definition was removed, by id.
    Removed(String),
}

/// Subscriber callback. A listener returning an error is logged and
/// isolated; it never blocks delivery to other listeners and never
/// propagates to the registry caller.
pub type Listener = Arc<dyn Fn(&RegistryEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle for removing a previously added listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// In-memory, concurrency-safe store of definitions keyed by id
///
/// The most recent successfully validated load always wins; the registry
/// never holds two entries with the same id.
pub struct DefinitionRegistry {
    /// Atomic pointer to the current definition map
    definitions: ArcSwap<HashMap<String, Arc<Definition>>>,
    /// Registered change subscribers; locked only to snapshot the list,
    /// never while invoking listener code
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self {
            definitions: ArcSwap::new(Arc::new(HashMap::new())),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Insert or replace a definition by id. Always succeeds; subscribers
    /// are notified after the swap completes.
    pub fn register(&self, definition: Definition) -> Arc<Definition> {
        let definition = Arc::new(definition);
        self.definitions.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(definition.id.clone(), Arc::clone(&definition));
            next
        });

        tracing::info!(
            "📥 Registered definition: {} ({})",
            definition.name,
            definition.id
        );
        self.notify(&RegistryEvent::Registered(Arc::clone(&definition)));
        definition
    }

    /// Replace-or-insert alias of [`register`](Self::register), used by the
    /// hot-reload path.
    pub fn update(&self, definition: Definition) -> Arc<Definition> {
        self.register(definition)
    }

    /// Remove a definition by id. Returns whether an entry was present.
    pub fn unregister(&self, id: &str) -> bool {
        let mut removed = false;
        self.definitions.rcu(|current| {
            let mut next = (**current).clone();
            removed = next.remove(id).is_some();
            next
        });

        if removed {
            tracing::info!("🗑️ Unregistered definition: {id}");
            self.notify(&RegistryEvent::Removed(id.to_string()));
        }
        removed
    }

    /// Get a definition by id (lock-free read).
    pub fn get(&self, id: &str) -> Option<Arc<Definition>> {
        self.definitions.load().get(id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.definitions.load().contains_key(id)
    }

    pub fn size(&self) -> usize {
        self.definitions.load().len()
    }

    /// All currently registered definitions, in no particular order.
    pub fn get_all(&self) -> Vec<Arc<Definition>> {
        self.definitions.load().values().cloned().collect()
    }

    /// Definitions carrying the given tag.
    pub fn find_by_tag(&self, tag: &str) -> Vec<Arc<Definition>> {
        self.definitions
            .load()
            .values()
            .filter(|definition| definition.tags.iter().any(|t| t == tag))
            .cloned()
            .collect()
    }

    /// First definition whose name contains the given substring,
    /// case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<Definition>> {
        let needle = name.to_lowercase();
        self.definitions
            .load()
            .values()
            .find(|definition| definition.name.to_lowercase().contains(&needle))
            .cloned()
    }

    /// Definitions flagged active.
    pub fn get_active(&self) -> Vec<Arc<Definition>> {
        self.definitions
            .load()
            .values()
            .filter(|definition| definition.active)
            .cloned()
            .collect()
    }

    /// Drop every entry. Subscribers are not notified per entry.
    pub fn clear(&self) {
        self.definitions.store(Arc::new(HashMap::new()));
        tracing::debug!("🧹 Cleared definition registry");
    }

    /// Subscribe to registry changes. The returned id can be passed to
    /// [`remove_listener`](Self::remove_listener).
    pub fn add_listener(&self, listener: Listener) -> ListenerId {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        ListenerId(id)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id.0);
        listeners.len() != before
    }

    /// Fan an event out to all subscribers. The listener list is snapshotted
    /// under the lock and invoked after releasing it, so a listener that
    /// re-enters the registry cannot deadlock.
    fn notify(&self, event: &RegistryEvent) {
        let listeners: Vec<(u64, Listener)> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, listener) in listeners {
            if let Err(err) = listener(event) {
                tracing::warn!("⚠️ Registry listener {id} failed: {err:#}");
            }
        }
    }
}

impl std::fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionRegistry")
            .field("size", &self.size())
            .finish()
    }
}
