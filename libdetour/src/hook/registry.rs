use std::sync::{
    Arc, LazyLock, Weak,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;

use super::{DetourError, traits::ErasedDetour};

/// Identity of one handle inside a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetourId(u64);

impl DetourId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        DetourId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct RegistryEntry {
    id: DetourId,
    name: String,
    detour: Weak<dyn ErasedDetour>,
}

/// Ordered set of every prepared detour.
///
/// Entries are non-owning: a handle frees itself and leaves the registry
/// through its own teardown path. The registry only exists so that one call
/// can tear down everything on plugin unload.
#[derive(Default)]
pub struct DetourRegistry {
    entries: Mutex<Vec<RegistryEntry>>,
}

static GLOBAL_REGISTRY: LazyLock<Arc<DetourRegistry>> =
    LazyLock::new(|| Arc::new(DetourRegistry::new()));

/// Process-wide registry used by [`Detour::new`](super::Detour::new) and
/// [`declare_detour!`](crate::declare_detour)
pub fn global() -> &'static Arc<DetourRegistry> {
    &GLOBAL_REGISTRY
}

/// Frees every detour in the process-wide registry. Call on plugin unload.
pub fn flush_all_detours() {
    let freed = global().free_all();
    log::info!("Flushed {} detours", freed);
}

impl DetourRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, id: DetourId, name: &str, detour: Weak<dyn ErasedDetour>) {
        debug_assert!(
            detour
                .upgrade()
                .is_none_or(|handle| handle.state().is_registered()),
            "detour '{name}' registered before it was prepared"
        );

        let mut entries = self.entries.lock();

        if entries.iter().any(|entry| entry.name == name) {
            log::warn!("Detour '{}' registered more than once", name);
        }

        entries.push(RegistryEntry {
            id,
            name: name.to_owned(),
            detour,
        });
    }

    /// Removes the entry for `id`. Returns false when it was not registered.
    pub(crate) fn unregister(&self, id: DetourId) -> bool {
        let mut entries = self.entries.lock();

        match entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Registered names in creation order
    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().iter().any(|entry| entry.name == name)
    }

    /// Live handles in creation order. The lock is released before return,
    /// so callers may run lifecycle operations on the result.
    fn snapshot(&self) -> Vec<Arc<dyn ErasedDetour>> {
        self.entries
            .lock()
            .iter()
            .filter_map(|entry| entry.detour.upgrade())
            .collect()
    }

    /// Frees every registered detour and empties the registry.
    ///
    /// Returns how many handles were freed. Handles already freed elsewhere
    /// have left the list on their own and are not counted.
    pub fn free_all(&self) -> usize {
        let detached = std::mem::take(&mut *self.entries.lock());
        let mut freed = 0;

        for entry in detached {
            match entry.detour.upgrade() {
                Some(detour) => {
                    detour.free();
                    freed += 1;
                }
                None => {
                    log::debug!("Detour '{}' was dropped before flush", entry.name);
                }
            }
        }

        freed
    }

    /// Installs every registered detour, collecting failures
    pub fn enable_all(&self) -> Vec<DetourError> {
        self.snapshot()
            .into_iter()
            .filter_map(|detour| detour.enable().err())
            .collect()
    }

    /// Uninstalls every registered detour, collecting failures
    pub fn disable_all(&self) -> Vec<DetourError> {
        self.snapshot()
            .into_iter()
            .filter_map(|detour| detour.disable().err())
            .collect()
    }
}

impl std::fmt::Debug for DetourRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetourRegistry")
            .field("detours", &self.names())
            .finish()
    }
}
