//! Scalar binding store.
//!
//! Holds the `name → value` pairs substituted for `{{$name}}` directives.
//! Values are always strings; callers format numbers before binding them.

use std::collections::HashMap;

/// Scalar key/value binding store.
#[derive(Debug, Default, Clone)]
pub struct BindingStore {
    vars: HashMap<String, String>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a binding.  The empty name is ignored.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() {
            self.vars.insert(name, value.into());
        }
    }

    /// Get the value of a binding.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Remove a binding.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    /// Returns `true` if the binding is set.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Iterate over all bindings (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl IntoIterator for BindingStore {
    type Item = (String, String);
    type IntoIter = std::collections::hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
