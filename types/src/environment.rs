//! Environment overlay shared by every spawned tool.
//!
//! The resolver writes into it; the tool runner and the completion wrapper
//! apply it to each subprocess. Cloning shares the same overlay.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Library source path consumed by the completion engine.
pub const RUST_SRC_PATH: &str = "RUST_SRC_PATH";

#[derive(Debug, Clone, Default)]
pub struct ToolEnvironment {
    vars: Arc<RwLock<BTreeMap<String, String>>>,
}

impl ToolEnvironment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the overlay with the given variables.
    #[must_use]
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            vars: Arc::new(RwLock::new(map)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Set `key` if its value differs. Returns whether anything changed.
    pub fn sync(&self, key: &str, value: &str) -> bool {
        let mut vars = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        if vars.get(key).is_some_and(|current| current == value) {
            return false;
        }
        vars.insert(key.to_string(), value.to_string());
        true
    }

    /// Copy of every variable, for applying to a subprocess.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
