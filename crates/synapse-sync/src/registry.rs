use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use uuid::Uuid;

use synapse_store::ListenerRegistration;
use synapse_types::events::ListenerScope;

/// One installed store listener. Releasing it removes the remote listener;
/// only the first release does anything.
pub struct ListenerSlot {
    slot_id: Uuid,
    scope: ListenerScope,
    registration: Mutex<Option<Box<dyn ListenerRegistration>>>,
}

impl ListenerSlot {
    pub fn scope(&self) -> &ListenerScope {
        &self.scope
    }

    pub fn is_released(&self) -> bool {
        lock(&self.registration).is_none()
    }

    fn release(&self) -> bool {
        let registration = lock(&self.registration).take();
        match registration {
            Some(registration) => {
                registration.remove();
                debug!("released listener for {:?}", self.scope);
                true
            }
            None => false,
        }
    }
}

/// Live store listeners keyed by scope. At most one listener per scope:
/// installing a second one for the same scope releases the first.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    slots: Arc<Mutex<HashMap<ListenerScope, Arc<ListenerSlot>>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(
        &self,
        scope: ListenerScope,
        registration: Box<dyn ListenerRegistration>,
    ) -> Arc<ListenerSlot> {
        let slot = Arc::new(ListenerSlot {
            slot_id: Uuid::new_v4(),
            scope: scope.clone(),
            registration: Mutex::new(Some(registration)),
        });

        let previous = lock(&self.slots).insert(scope, slot.clone());
        if let Some(previous) = previous {
            debug!("superseding listener for {:?}", previous.scope);
            previous.release();
        }

        slot
    }

    /// Release `slot`, forgetting it only if it is still the installed one.
    /// Returns false when it had already been released.
    pub fn release(&self, slot: &ListenerSlot) -> bool {
        {
            let mut slots = lock(&self.slots);
            if slots.get(&slot.scope).is_some_and(|s| s.slot_id == slot.slot_id) {
                slots.remove(&slot.scope);
            }
        }
        slot.release()
    }

    pub fn is_active(&self, scope: &ListenerScope) -> bool {
        lock(&self.slots).contains_key(scope)
    }

    pub fn active_count(&self) -> usize {
        lock(&self.slots).len()
    }
}

/// The guarded data stays consistent across a panic, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
