use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named counters a backend may attach to a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistics {
    counters: BTreeMap<String, u64>,
}

impl Statistics {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Statistics holding a single counter
    pub fn of(name: impl Into<String>, value: u64) -> Self {
        Self::empty().with(name, value)
    }

    pub fn with(mut self, name: impl Into<String>, value: u64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
