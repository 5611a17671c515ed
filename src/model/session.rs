use std::sync::{Arc, PoisonError, RwLock};

use crate::model::scenario::ScenarioParams;

/// Session-wide holder for the scenario parameters.
///
/// Cloning hands out another handle to the same slot, so the window and the
/// engine thread observe the same values. Readers before `initialize` see
/// empty strings.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<ScenarioParams>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all four fields under one write lock.
    pub fn initialize(&self, params: ScenarioParams) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = params;
    }

    pub fn snapshot(&self) -> ScenarioParams {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_started(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_started()
    }
}
