//! Typed lifecycle notifications.
//!
//! Every node carries a [`Hooks`] list. Instead of stringly-named events,
//! transitions are identified by a [`Phase`]; any number of hooks can watch
//! a phase and they fire in the order they were registered.

use std::fmt;
use std::sync::Arc;

/// Lifecycle phases a node passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Construction of the node and all of its children finished.
    Load,
    /// One-time preparation when a session starts.
    Setup,
    Start,
    Stop,
    Enter,
    Exit,
    /// The model was restored from its initial copy.
    Reset,
    /// The active stage changed; hooks receive the new stage's name.
    StageChange,
    /// The active state changed; hooks receive the new state's name.
    StateChange,
    /// A device asked for its current view to be delivered again.
    Refresh,
}

/// Callback attached to a phase. The second argument names the affected
/// child for change phases and is `None` otherwise.
pub type Hook = Arc<dyn Fn(Phase, Option<&str>) + Send + Sync>;

/// Registration-ordered phase callbacks.
#[derive(Clone, Default)]
pub struct Hooks {
    entries: Vec<(Phase, Hook)>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, phase: Phase, hook: F)
    where
        F: Fn(Phase, Option<&str>) + Send + Sync + 'static,
    {
        self.entries.push((phase, Arc::new(hook)));
    }

    pub fn emit(&self, phase: Phase) {
        self.emit_with(phase, None);
    }

    pub fn emit_with(&self, phase: Phase, subject: Option<&str>) {
        for (at, hook) in &self.entries {
            if *at == phase {
                hook(phase, subject);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("registered", &self.entries.len())
            .finish()
    }
}
