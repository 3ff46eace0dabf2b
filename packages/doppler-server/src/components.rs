//! Init-once slots for the signal components.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

enum ComponentState<T> {
    Loaded(T),
    LoadFailed(String),
}

/// Reported state of a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ComponentStatus {
    NotLoaded,
    Loaded,
    LoadFailed { error: String },
}

/// A component built at most once. A failed build is remembered and
/// reported; it is not retried.
pub struct ComponentSlot<T> {
    name: &'static str,
    cell: OnceLock<ComponentState<T>>,
}

impl<T> ComponentSlot<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get_or_load<F>(&self, load: F) -> Result<&T, String>
    where
        F: FnOnce() -> Result<T, String>,
    {
        let state = self.cell.get_or_init(|| match load() {
            Ok(component) => {
                tracing::info!("Component '{}' loaded", self.name);
                ComponentState::Loaded(component)
            }
            Err(e) => {
                tracing::error!("Component '{}' failed to load: {}", self.name, e);
                ComponentState::LoadFailed(e)
            }
        });

        match state {
            ComponentState::Loaded(component) => Ok(component),
            ComponentState::LoadFailed(e) => Err(format!("{} unavailable: {}", self.name, e)),
        }
    }

    pub fn status(&self) -> ComponentStatus {
        match self.cell.get() {
            None => ComponentStatus::NotLoaded,
            Some(ComponentState::Loaded(_)) => ComponentStatus::Loaded,
            Some(ComponentState::LoadFailed(e)) => ComponentStatus::LoadFailed { error: e.clone() },
        }
    }
}
