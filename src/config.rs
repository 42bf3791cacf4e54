//! Allowlist configuration.
//!
//! The allowlist is the closed set of plugin names permitted to load and
//! execute. It is resolved once, at engine construction, from the first
//! available source:
//!
//! 1. the `ZONA_ALLOWED_PLUGINS` environment variable (comma-separated),
//! 2. a `plugins_allowlist.txt` file next to the plugin directory
//!    (newline-separated),
//! 3. the built-in default set.
//!
//! Blank entries and surrounding whitespace are ignored in both external
//! sources. The resolved set is immutable for the process lifetime.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context as _, Result};

/// Environment variable overriding the allowlist (comma-separated names).
pub const ALLOWLIST_ENV: &str = "ZONA_ALLOWED_PLUGINS";

/// Allowlist file looked up next to the plugin directory (newline-separated).
pub const ALLOWLIST_FILE: &str = "plugins_allowlist.txt";

/// Plugin names allowed when no override is configured.
pub const DEFAULT_ALLOWED_PLUGINS: &[&str] = &[
    "echo",
    "hello",
    "invoice_summary",
    "math",
    "time",
    "web_scraper",
];

/// Immutable set of plugin names permitted to load and execute.
#[derive(Debug, Clone)]
pub struct Allowlist {
    names: BTreeSet<String>,
}

impl Allowlist {
    /// Resolve the allowlist for the given plugin directory.
    ///
    /// Checks the environment override first, then the sibling allowlist
    /// file, then falls back to [`DEFAULT_ALLOWED_PLUGINS`].
    pub fn resolve(plugins_dir: &Path) -> Self {
        let env_value = std::env::var(ALLOWLIST_ENV).ok();
        Self::resolve_with(env_value.as_deref(), plugins_dir)
    }

    /// Resolution body with the environment value injected, so tests never
    /// touch process globals.
    fn resolve_with(env_value: Option<&str>, plugins_dir: &Path) -> Self {
        if let Some(value) = env_value {
            let names = split_names(value, ',');
            if !names.is_empty() {
                tracing::debug!(source = ALLOWLIST_ENV, count = names.len(), "allowlist resolved");
                return Self { names };
            }
        }

        let sibling = plugins_dir
            .parent()
            .map(|parent| parent.join(ALLOWLIST_FILE));
        if let Some(path) = sibling.filter(|p| p.exists()) {
            match read_allowlist_file(&path) {
                Ok(names) if !names.is_empty() => {
                    tracing::debug!(
                        source = %path.display(),
                        count = names.len(),
                        "allowlist resolved"
                    );
                    return Self { names };
                }
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "allowlist file is empty, using defaults");
                }
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %error,
                        "failed to read allowlist file, using defaults"
                    );
                }
            }
        }

        Self::default()
    }

    /// Build an allowlist from explicit names (mainly for tests and hosts
    /// that manage policy themselves).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is permitted.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Iterate the allowed names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of allowed names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the allowlist permits nothing.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::from_names(DEFAULT_ALLOWED_PLUGINS.iter().copied())
    }
}

fn split_names(value: &str, separator: char) -> BTreeSet<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_allowlist_file(path: &Path) -> Result<BTreeSet<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read allowlist file {}", path.display()))?;
    Ok(split_names(&contents, '\n'))
}
