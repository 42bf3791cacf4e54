//! Plugin system for Zona.
//!
//! Plugins extend the chat front-end with privileged `!` commands. The
//! implementations are compiled in and declared explicitly in a
//! [`PluginSet`]; the loader decides which of them actually become
//! dispatchable by checking the trusted plugin directory.
//!
//! # Security Model
//!
//! - **Allowlist first**: files whose stem is not allowlisted are never
//!   probed, resolved, or loaded.
//! - **Path containment**: a candidate's symlink-dereferenced path must lie
//!   inside the trusted directory; anything escaping it behaves exactly like
//!   a missing plugin toward the user, with the real reason logged for
//!   operators.
//! - **No fault propagation**: plugin failures are converted to display
//!   strings at the dispatch boundary; the engine never crashes on plugin
//!   input.
//! - **Confirmation gate**: execution additionally sits behind the per-session
//!   yes/no round-trip in [`crate::engine`].

pub mod builtin;
pub mod loader;
pub mod registry;
pub mod traits;

pub use loader::PluginLoader;
pub use registry::{PluginRegistry, PluginSet};
pub use traits::{ClassPlugin, Context, FunctionPlugin, PluginError, PluginHandle, PluginMetadata};
