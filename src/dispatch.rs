//! Command parsing and dispatch.
//!
//! The dispatcher is the lower-level primitive under the confirmation gate:
//! it resolves a parsed command against the allowlist and registry, invokes
//! the plugin, and normalizes every outcome, success or failure, into the
//! exact string shown to the user. Plugin failures never propagate past it.

use serde_json::Value;

use crate::config::Allowlist;
use crate::plugins::{Context, PluginError, PluginHandle, PluginLoader, PluginRegistry};

/// An ephemeral parsed command: the token after `!` and the remaining
/// argument text. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    name: &'a str,
    args: &'a str,
}

impl<'a> Command<'a> {
    /// Parse command text into name and argument text.
    ///
    /// The caller is expected to have identified the input as a command
    /// already; a leading `!` is stripped when present. The name is the
    /// first whitespace-delimited token, the argument text is everything
    /// after the first whitespace run (empty when absent).
    pub fn parse(text: &'a str) -> Self {
        let rest = text.strip_prefix('!').unwrap_or(text).trim_start();
        match rest.split_once(char::is_whitespace) {
            Some((name, args)) => Self {
                name,
                args: args.trim_start(),
            },
            None => Self { name: rest, args: "" },
        }
    }

    /// The plugin name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The raw argument substring (empty when none was given).
    pub fn args(&self) -> &'a str {
        self.args
    }
}

/// Resolves commands against the allowlist and registry and invokes plugins.
pub struct Dispatcher {
    allowlist: Allowlist,
    registry: PluginRegistry,
}

impl Dispatcher {
    /// Build a dispatcher from a finished loader.
    pub fn new(loader: PluginLoader) -> Self {
        let (allowlist, registry) = loader.into_parts();
        Self::from_parts(allowlist, registry)
    }

    /// Build a dispatcher from explicit parts (hosts that loaded elsewhere).
    pub fn from_parts(allowlist: Allowlist, registry: PluginRegistry) -> Self {
        Self { allowlist, registry }
    }

    /// The validated plugin registry (introspection only).
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Dispatch a command and return the user-facing reply.
    ///
    /// Every error in the taxonomy is converted to its display string here;
    /// this operation never fails.
    pub fn dispatch(&self, command_text: &str, context: &Context) -> String {
        match self.run(command_text, context) {
            Ok(reply) => reply,
            Err(error) => error.to_string(),
        }
    }

    /// Typed dispatch body. Keeping this as a `Result` makes the containment
    /// of plugin failures a property of the signature rather than of a
    /// catch-all block.
    fn run(&self, command_text: &str, context: &Context) -> Result<String, PluginError> {
        let command = Command::parse(command_text);
        let name = command.name();

        if !self.allowlist.contains(name) {
            return Err(PluginError::NotAllowed { name: name.to_string() });
        }

        let Some(handle) = self.registry.get(name) else {
            // Also covers files rejected for containment; the loader logged
            // the difference, the user-facing string must not.
            if self.registry.is_invalid_entry_point(name) {
                return Err(PluginError::InvalidEntryPoint { name: name.to_string() });
            }
            return Err(PluginError::NotFound { name: name.to_string() });
        };

        let reply = match handle {
            PluginHandle::Function(plugin) => plugin
                .run(command.args())
                .map_err(|e| e.into_execution_failure(name))?,
            PluginHandle::Class(plugin) => {
                let value = plugin
                    .run(command.args(), context)
                    .map_err(|e| e.into_execution_failure(name))?;
                extract_result(value)
            }
        };
        Ok(reply)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("allowed", &self.allowlist.len())
            .field("registered", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Stringify a class-style plugin's structured result: objects yield their
/// `"result"` member, everything else is rendered whole. String values come
/// through verbatim, without JSON quoting.
fn extract_result(value: Value) -> String {
    let inner = match value {
        Value::Object(mut map) => map.remove("result").unwrap_or(Value::Null),
        other => other,
    };
    match inner {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
