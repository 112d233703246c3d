use super::ComponentState;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle state of each running component, shared with spawned tasks
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    states: Arc<Mutex<BTreeMap<&'static str, ComponentState>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, component: &'static str, state: ComponentState) {
        self.states.lock().insert(component, state);
        debug!("Component '{}' state changed to: {:?}", component, state);
    }

    pub fn get(&self, component: &str) -> Option<ComponentState> {
        self.states.lock().get(component).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, ComponentState> {
        self.states.lock().clone()
    }

    pub fn any_failed(&self) -> bool {
        self.states
            .lock()
            .values()
            .any(|state| *state == ComponentState::Failed)
    }
}
