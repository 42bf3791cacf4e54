//! Plugin loader.
//!
//! Discovers plugin files in one trusted directory and builds the registry
//! from them. A plugin is registered only when all of the following hold:
//!
//! 1. its file stem is on the allowlist (checked first, so files off the
//!    list are never probed, parsed, or resolved),
//! 2. its fully resolved path lies inside the trusted directory's resolved
//!    path (symlinks pointing elsewhere are rejected),
//! 3. an implementation for the stem exists in the [`PluginSet`].
//!
//! A candidate that fails containment is indistinguishable from a missing
//! plugin at dispatch time. The distinction is logged here for operators but
//! must never leak into user-facing output.

use std::path::{Path, PathBuf};

use crate::config::Allowlist;

use super::registry::{PluginRegistry, PluginSet};

/// Loader for the trusted plugin directory.
///
/// Discovery runs once, at construction; the resulting registry is read-only
/// for the loader's lifetime. Construction never fails: bad candidates are
/// skipped per-file and an unreadable directory yields an empty registry.
pub struct PluginLoader {
    plugins_dir: PathBuf,
    allowlist: Allowlist,
    registry: PluginRegistry,
}

impl PluginLoader {
    /// Discover plugins in `plugins_dir`, registering implementations from
    /// `set` for every validated candidate file.
    pub fn new(plugins_dir: impl Into<PathBuf>, set: PluginSet, allowlist: Allowlist) -> Self {
        let plugins_dir = plugins_dir.into();
        let registry = discover(&plugins_dir, set, &allowlist);
        Self {
            plugins_dir,
            allowlist,
            registry,
        }
    }

    /// The trusted plugin directory.
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// The resolved allowlist.
    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// The validated plugin registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Consume the loader, yielding the allowlist and registry for dispatch.
    pub fn into_parts(self) -> (Allowlist, PluginRegistry) {
        (self.allowlist, self.registry)
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("plugins_dir", &self.plugins_dir)
            .field("allowed", &self.allowlist.len())
            .field("registered", &self.registry.len())
            .finish_non_exhaustive()
    }
}

fn discover(plugins_dir: &Path, mut set: PluginSet, allowlist: &Allowlist) -> PluginRegistry {
    let mut registry = PluginRegistry::default();

    // Containment is checked against the canonical directory path; comparing
    // unresolved strings would itself be exploitable.
    let trusted_root = match std::fs::canonicalize(plugins_dir) {
        Ok(root) => root,
        Err(error) => {
            tracing::warn!(
                dir = %plugins_dir.display(),
                error = %error,
                "plugin directory unavailable, no plugins loaded"
            );
            return registry;
        }
    };

    let entries = match std::fs::read_dir(plugins_dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(
                dir = %plugins_dir.display(),
                error = %error,
                "failed to enumerate plugin directory, no plugins loaded"
            );
            return registry;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(error = %error, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::debug!(path = %path.display(), "skipping non-UTF-8 file name");
            continue;
        };
        if file_name.starts_with('.') {
            tracing::debug!(file = file_name, "skipping hidden entry");
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        // Allowlist short-circuit: names off the list are never probed any
        // further, so no unlisted file is ever resolved or loaded.
        if !allowlist.contains(stem) {
            tracing::debug!(plugin = stem, "skipping file not on allowlist");
            continue;
        }

        if registry.get(stem).is_some() || registry.is_invalid_entry_point(stem) {
            tracing::debug!(plugin = stem, file = file_name, "skipping duplicate candidate");
            continue;
        }

        // Symlink-dereferenced absolute path; a broken link or I/O failure
        // skips this candidate only.
        let resolved = match std::fs::canonicalize(&path) {
            Ok(resolved) => resolved,
            Err(error) => {
                tracing::warn!(
                    plugin = stem,
                    path = %path.display(),
                    error = %error,
                    "failed to resolve plugin candidate, skipping"
                );
                continue;
            }
        };

        if resolved.is_dir() {
            tracing::debug!(plugin = stem, "skipping directory entry");
            continue;
        }

        if !resolved.starts_with(&trusted_root) {
            // Operator-facing diagnostic only. At dispatch time this name
            // answers "not found", identical to an absent file.
            tracing::warn!(
                plugin = stem,
                path = %path.display(),
                resolved = %resolved.display(),
                "plugin file resolves outside the trusted directory, rejected"
            );
            continue;
        }

        match set.take(stem) {
            Some(handle) => {
                tracing::info!(plugin = stem, path = %resolved.display(), "registered plugin");
                registry.insert(stem.to_string(), handle);
            }
            None => {
                tracing::warn!(
                    plugin = stem,
                    path = %path.display(),
                    "plugin file has no implementation, marking invalid entry point"
                );
                registry.mark_invalid_entry_point(stem.to_string());
            }
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::builtin;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"plugin marker").unwrap();
    }

    fn allow(names: &[&str]) -> Allowlist {
        Allowlist::from_names(names.iter().copied())
    }

    #[test]
    fn loads_allowlisted_files_with_implementations() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("echo.py"));
        touch(&dir.path().join("math.py"));

        let loader = PluginLoader::new(dir.path(), builtin::default_set(), allow(&["echo", "math"]));
        assert_eq!(loader.registry().names(), vec!["echo", "math"]);
    }

    #[test]
    fn unlisted_files_are_never_registered() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("echo.py"));
        touch(&dir.path().join("evil.py"));

        let loader = PluginLoader::new(dir.path(), builtin::default_set(), allow(&["echo"]));
        assert!(loader.registry().get("evil").is_none());
        assert_eq!(loader.registry().len(), 1);
    }

    #[test]
    fn hidden_files_and_subdirectories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".echo.py"));
        fs::create_dir(dir.path().join("math")).unwrap();

        let loader = PluginLoader::new(dir.path(), builtin::default_set(), allow(&["echo", "math"]));
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn allowed_file_without_implementation_is_invalid_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("stub.py"));

        let loader = PluginLoader::new(dir.path(), PluginSet::new(), allow(&["stub"]));
        assert!(loader.registry().get("stub").is_none());
        assert!(loader.registry().is_invalid_entry_point("stub"));
    }

    #[test]
    fn missing_directory_yields_empty_registry_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PluginLoader::new(
            dir.path().join("nope"),
            builtin::default_set(),
            allow(&["echo"]),
        );
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn duplicate_stems_register_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("echo.py"));
        touch(&dir.path().join("echo.lua"));

        let loader = PluginLoader::new(dir.path(), builtin::default_set(), allow(&["echo"]));
        assert_eq!(loader.registry().len(), 1);
        assert!(!loader.registry().is_invalid_entry_point("echo"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escaping_the_directory_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("echo.py");
        touch(&target);

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("echo.py")).unwrap();

        let loader = PluginLoader::new(dir.path(), builtin::default_set(), allow(&["echo"]));
        assert!(loader.registry().get("echo").is_none());
        assert!(!loader.registry().is_invalid_entry_point("echo"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_within_the_directory_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real_echo.py");
        touch(&target);
        std::os::unix::fs::symlink(&target, dir.path().join("echo.py")).unwrap();

        let loader = PluginLoader::new(dir.path(), builtin::default_set(), allow(&["echo"]));
        assert!(loader.registry().get("echo").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn broken_symlink_is_skipped_without_aborting_discovery() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.py"), dir.path().join("echo.py")).unwrap();
        touch(&dir.path().join("math.py"));

        let loader = PluginLoader::new(dir.path(), builtin::default_set(), allow(&["echo", "math"]));
        assert!(loader.registry().get("echo").is_none());
        assert!(loader.registry().get("math").is_some());
    }
}
