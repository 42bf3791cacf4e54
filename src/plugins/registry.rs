//! Plugin registration table and registry.
//!
//! [`PluginSet`] is the explicit, host-populated table of available plugin
//! implementations, the compiled-in replacement for importing plugin code at
//! runtime. The loader consumes a set and produces a [`PluginRegistry`]: the
//! subset of implementations whose names survived the allowlist and whose
//! backing files survived the containment check. The registry is frozen after
//! loading and is safe to share by reference across sessions.

use std::collections::{BTreeSet, HashMap};

use super::traits::{ClassPlugin, FunctionPlugin, PluginError, PluginHandle, PluginMetadata};

/// Table of plugin implementations available for registration.
#[derive(Debug, Default)]
pub struct PluginSet {
    handles: HashMap<String, PluginHandle>,
}

impl PluginSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function-style plugin under `name`.
    pub fn register_function<P>(&mut self, name: impl Into<String>, plugin: P) -> &mut Self
    where
        P: FunctionPlugin + 'static,
    {
        self.handles
            .insert(name.into(), PluginHandle::Function(Box::new(plugin)));
        self
    }

    /// Register a function-style plugin from a plain closure.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<String, PluginError> + Send + Sync + 'static,
    {
        struct Closure<F>(F);

        impl<F> FunctionPlugin for Closure<F>
        where
            F: Fn(&str) -> Result<String, PluginError> + Send + Sync,
        {
            fn run(&self, args: &str) -> Result<String, PluginError> {
                (self.0)(args)
            }
        }

        self.register_function(name, Closure(f))
    }

    /// Register a class-style plugin under `name`.
    pub fn register_class<P>(&mut self, name: impl Into<String>, plugin: P) -> &mut Self
    where
        P: ClassPlugin + 'static,
    {
        self.handles
            .insert(name.into(), PluginHandle::Class(Box::new(plugin)));
        self
    }

    /// Remove and return the implementation registered under `name`.
    pub(crate) fn take(&mut self, name: &str) -> Option<PluginHandle> {
        self.handles.remove(name)
    }

    /// Whether an implementation exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Number of registered implementations.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Registry of validated plugins, keyed by name.
///
/// Built once by the loader; read-only afterward for the life of the engine,
/// so concurrent readers need no synchronization.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginHandle>,
    /// Names whose files passed validation but had no implementation shape.
    invalid_entry_points: BTreeSet<String>,
}

impl PluginRegistry {
    pub(crate) fn insert(&mut self, name: String, handle: PluginHandle) {
        self.plugins.insert(name, handle);
    }

    pub(crate) fn mark_invalid_entry_point(&mut self, name: String) {
        self.invalid_entry_points.insert(name);
    }

    /// Borrow the plugin registered under `name`.
    pub fn get(&self, name: &str) -> Option<&PluginHandle> {
        self.plugins.get(name)
    }

    /// Whether `name` refers to a file that loaded without a usable entry point.
    pub fn is_invalid_entry_point(&self, name: &str) -> bool {
        self.invalid_entry_points.contains(name)
    }

    /// Names of all registered plugins, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Metadata for `name`, when the plugin exposes it.
    pub fn metadata(&self, name: &str) -> Option<PluginMetadata> {
        self.plugins.get(name).and_then(PluginHandle::metadata)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the registry holds no plugins.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use crate::plugins::traits::Context;

    struct Probe;

    impl ClassPlugin for Probe {
        fn run(&self, _args: &str, _context: &Context) -> Result<Value, PluginError> {
            Ok(json!({ "result": "ok" }))
        }

        fn metadata(&self) -> PluginMetadata {
            PluginMetadata {
                name: "probe".into(),
                version: "1.0".into(),
                description: None,
            }
        }
    }

    #[test]
    fn set_registers_and_takes_handles() {
        let mut set = PluginSet::new();
        set.register_fn("echo", |args| Ok(args.to_string()));
        set.register_class("probe", Probe);
        assert_eq!(set.len(), 2);
        assert!(set.contains("echo"));

        let handle = set.take("echo").unwrap();
        assert!(matches!(handle, PluginHandle::Function(_)));
        assert!(!set.contains("echo"));
        assert!(set.take("echo").is_none());
    }

    #[test]
    fn registry_lists_sorted_names_and_metadata() {
        let mut set = PluginSet::new();
        set.register_fn("zulu", |args| Ok(args.to_string()));
        set.register_class("probe", Probe);

        let mut registry = PluginRegistry::default();
        registry.insert("zulu".into(), set.take("zulu").unwrap());
        registry.insert("probe".into(), set.take("probe").unwrap());

        assert_eq!(registry.names(), vec!["probe", "zulu"]);
        assert_eq!(registry.metadata("probe").unwrap().name, "probe");
        assert!(registry.metadata("zulu").is_none());
    }

    #[test]
    fn registry_tracks_invalid_entry_points() {
        let mut registry = PluginRegistry::default();
        registry.mark_invalid_entry_point("stub".into());
        assert!(registry.is_invalid_entry_point("stub"));
        assert!(!registry.is_invalid_entry_point("echo"));
        assert!(registry.get("stub").is_none());
    }
}
