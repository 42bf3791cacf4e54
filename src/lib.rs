//! Zona: confirmation-gated bang-command engine.
//!
//! Users of a conversational front-end issue privileged commands such as
//! `!math 2+2`. Execution runs through a two-stage trust mechanism:
//!
//! 1. a per-session confirmation state machine ([`Engine`]) that gates every
//!    privileged command behind an explicit yes/no round-trip, and
//! 2. a plugin loader ([`plugins::PluginLoader`]) that only registers
//!    plugins that are both allowlisted and physically contained in one
//!    trusted directory, defeating symlink escapes.
//!
//! Chat itself (model providers, history persistence, web routes) is the
//! host's concern; the engine hands non-command input back untouched.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod plugins;

pub use config::Allowlist;
pub use dispatch::{Command, Dispatcher};
pub use engine::{Engine, InMemoryStore, SessionMemory};
