//! Plugin interface types.
//!
//! A plugin is one of two statically declared shapes: a bare function that
//! maps argument text to a reply, or a class-style object that also receives
//! a context mapping and answers with a structured value. The duality mirrors
//! the two authoring styles site operators use; dispatch treats them through
//! the single [`PluginHandle`] variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Context mapping handed to class-style plugins.
///
/// Currently always empty; reserved for request metadata (caller identity,
/// channel, locale) so the plugin ABI does not have to change later.
pub type Context = serde_json::Map<String, Value>;

/// Plugin metadata for introspection. Never consulted for execution semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin name (matches its registry key)
    pub name: String,
    /// Plugin version (semver recommended)
    pub version: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Function-style plugin: argument text in, display string out.
pub trait FunctionPlugin: Send + Sync {
    /// Run the plugin against the raw argument substring.
    fn run(&self, args: &str) -> Result<String, PluginError>;
}

/// Class-style plugin: receives a context mapping and returns a structured
/// result. When the result is an object, dispatch extracts its `"result"`
/// member; otherwise the whole value is stringified.
pub trait ClassPlugin: Send + Sync {
    /// Run the plugin with argument text and the per-request context.
    fn run(&self, args: &str, context: &Context) -> Result<Value, PluginError>;

    /// Introspection metadata (name/version/description).
    fn metadata(&self) -> PluginMetadata;
}

/// A registered plugin implementation, tagged by shape.
pub enum PluginHandle {
    /// Function-style plugin
    Function(Box<dyn FunctionPlugin>),
    /// Class-style plugin
    Class(Box<dyn ClassPlugin>),
}

impl PluginHandle {
    /// Metadata when the plugin exposes it (class-style only).
    pub fn metadata(&self) -> Option<PluginMetadata> {
        match self {
            Self::Function(_) => None,
            Self::Class(plugin) => Some(plugin.metadata()),
        }
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function(_) => f.write_str("PluginHandle::Function"),
            Self::Class(plugin) => f
                .debug_tuple("PluginHandle::Class")
                .field(&plugin.metadata().name)
                .finish(),
        }
    }
}

/// Everything that can go wrong on the command path.
///
/// The `Display` output of each variant is the exact user-facing string; the
/// dispatcher surfaces these as plain text and never lets them propagate.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Command name absent from the allowlist.
    #[error("Plugin `{name}` is not allowed.")]
    NotAllowed { name: String },

    /// Name allowed but no validated plugin registered under it. Covers both
    /// "file missing" and "file rejected for containment"; the distinction
    /// is logged, never surfaced.
    #[error("Plugin `{name}` not found.")]
    NotFound { name: String },

    /// A plugin file passed validation but no implementation shape exists
    /// under its stem.
    #[error("Plugin `{name}` does not define a valid entry point.")]
    InvalidEntryPoint { name: String },

    /// The plugin's own logic failed during invocation.
    #[error("Plugin `{name}` crashed: {message}")]
    ExecutionFailure { name: String, message: String },

    /// Failure raised inside a plugin body, before the dispatcher has
    /// attributed it to a name. Rewrapped into `ExecutionFailure` at the
    /// invocation boundary.
    #[error("{0}")]
    Failed(String),
}

impl PluginError {
    /// Attribute a raw plugin failure to the named plugin.
    pub(crate) fn into_execution_failure(self, name: &str) -> PluginError {
        match self {
            Self::Failed(message) => Self::ExecutionFailure {
                name: name.to_string(),
                message,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_strings_match_user_facing_contract() {
        let not_allowed = PluginError::NotAllowed { name: "evil".into() };
        assert_eq!(not_allowed.to_string(), "Plugin `evil` is not allowed.");

        let not_found = PluginError::NotFound { name: "math".into() };
        assert_eq!(not_found.to_string(), "Plugin `math` not found.");

        let invalid = PluginError::InvalidEntryPoint { name: "stub".into() };
        assert_eq!(
            invalid.to_string(),
            "Plugin `stub` does not define a valid entry point."
        );

        let crashed = PluginError::ExecutionFailure {
            name: "math".into(),
            message: "division by zero".into(),
        };
        assert_eq!(
            crashed.to_string(),
            "Plugin `math` crashed: division by zero"
        );
    }

    #[test]
    fn raw_failure_is_attributed_on_rewrap() {
        let err = PluginError::Failed("boom".into()).into_execution_failure("echo");
        assert_eq!(err.to_string(), "Plugin `echo` crashed: boom");
    }

    #[test]
    fn attributed_errors_survive_rewrap_unchanged() {
        let err = PluginError::NotFound { name: "math".into() }.into_execution_failure("math");
        assert_eq!(err.to_string(), "Plugin `math` not found.");
    }

    #[test]
    fn metadata_serializes_without_empty_description() {
        let meta = PluginMetadata {
            name: "echo".into(),
            version: "1.0".into(),
            description: None,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("description"));
    }
}
