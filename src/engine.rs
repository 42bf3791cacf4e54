//! Session confirmation state machine.
//!
//! Privileged `!` commands can reach out to external systems, so a single
//! mistyped or injected message must never trigger execution on its own. The
//! engine holds at most one pending command per session and only forwards it
//! to the dispatcher after an explicit "yes". Administrative memory-clear
//! commands bypass the gate: they are idempotent and session-scoped (or
//! global) by design.
//!
//! Within one session, turns are assumed to arrive sequentially; across
//! sessions the pending map is guarded by a single mutex so concurrent turns
//! for different sessions never observe each other's state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::{Command, Dispatcher};
use crate::plugins::Context;

/// Session-memory collaborator. Conversation history itself lives with the
/// host; the engine only needs the clearing entry points.
pub trait SessionMemory: Send + Sync {
    /// Forget one session's history.
    fn clear_session(&self, session: &str);

    /// Forget every session's history.
    fn clear_all(&self);
}

/// In-process session memory used by the demo binary and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line to a session's history.
    pub fn record(&self, session: &str, line: &str) {
        self.sessions
            .lock()
            .entry(session.to_string())
            .or_default()
            .push(line.to_string());
    }

    /// Number of recorded lines for a session.
    pub fn len(&self, session: &str) -> usize {
        self.sessions.lock().get(session).map_or(0, Vec::len)
    }

    /// Whether no session has any history.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().values().all(Vec::is_empty)
    }
}

impl SessionMemory for InMemoryStore {
    fn clear_session(&self, session: &str) {
        self.sessions.lock().remove(session);
    }

    fn clear_all(&self) {
        self.sessions.lock().clear();
    }
}

/// The command & plugin execution engine.
///
/// Owns the dispatcher, the per-session pending-action map, and a handle to
/// the session-memory collaborator. One instance serves all sessions.
pub struct Engine {
    dispatcher: Dispatcher,
    pending: Mutex<HashMap<String, String>>,
    memory: Arc<dyn SessionMemory>,
}

impl Engine {
    /// Build an engine over a finished dispatcher.
    pub fn new(dispatcher: Dispatcher, memory: Arc<dyn SessionMemory>) -> Self {
        Self {
            dispatcher,
            pending: Mutex::new(HashMap::new()),
            memory,
        }
    }

    /// Handle one raw input turn for `session`.
    ///
    /// Returns `Some(reply)` when the engine handled the turn (confirmation
    /// round-trip, administrative command, or a new privileged command) and
    /// `None` when the input is ordinary chat the host should route to its
    /// model.
    pub fn handle_raw_input(&self, session: &str, text: &str) -> Option<String> {
        let trimmed = text.trim();

        {
            let mut pending = self.pending.lock();
            if let Some(command) = pending.get(session).cloned() {
                return Some(match trimmed.to_ascii_lowercase().as_str() {
                    "yes" | "y" => {
                        pending.remove(session);
                        drop(pending);
                        tracing::info!(session, command = %command, "command confirmed");
                        self.dispatcher.dispatch(&command, &Context::new())
                    }
                    "no" | "n" => {
                        pending.remove(session);
                        tracing::info!(session, command = %command, "command cancelled");
                        "Cancelled.".to_string()
                    }
                    _ => "Please reply 'yes' or 'no'.".to_string(),
                });
            }
        }

        if trimmed == "!clear" {
            self.memory.clear_session(session);
            tracing::info!(session, "session memory cleared");
            return Some("Memory cleared.".to_string());
        }
        if trimmed == "!clear_all" {
            self.memory.clear_all();
            tracing::info!(session, "all session memory cleared");
            return Some("All memory cleared.".to_string());
        }

        if trimmed.starts_with('!') {
            let command = Command::parse(trimmed);
            let prompt = format!(
                "Run plugin `{}` with args `{}`? (yes/no)",
                command.name(),
                command.args()
            );
            self.pending
                .lock()
                .insert(session.to_string(), trimmed.to_string());
            return Some(prompt);
        }

        // Ordinary chat; the host takes over from here.
        None
    }

    /// Dispatch an already-confirmed command directly.
    pub fn dispatch(&self, command_text: &str, context: &Context) -> String {
        self.dispatcher.dispatch(command_text, context)
    }

    /// The command pending confirmation for `session`, if any.
    pub fn pending_command(&self, session: &str) -> Option<String> {
        self.pending.lock().get(session).cloned()
    }

    /// The underlying dispatcher (introspection).
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dispatcher", &self.dispatcher)
            .field("pending_sessions", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}
