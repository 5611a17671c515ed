use serde::{Deserialize, Serialize};

/// Outcome of a structured request that may degrade to a static value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Generated<T> {
    /// The backend answered with usable data.
    Live { value: T },
    /// The backend failed or answered with something unusable.
    Fallback { value: T, reason: String },
}

impl<T> Generated<T> {
    pub fn live(value: T) -> Self {
        Generated::Live { value }
    }

    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Generated::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Generated::Live { value } | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Generated::Live { value } | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Generated::Fallback { .. })
    }
}
