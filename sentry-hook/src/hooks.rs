use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::entry::{Entry, Level};

/// Errors returned by hooks.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// A hook was configured without any level to fire for.
    #[error("a hook needs at least one level")]
    NoLevels,
    /// A hook could not process an entry.
    #[error("hook failed: {0}")]
    Failed(String),
}

/// A hook that a logger fires for entries of certain levels.
///
/// The logger consults [`levels`](Hook::levels) to decide whether to call
/// [`fire`](Hook::fire) at all; hooks do not filter again.
pub trait Hook: Send + Sync {
    /// The levels this hook wants to be fired for.
    fn levels(&self) -> &[Level];

    /// Processes a single entry.
    fn fire(&self, entry: &Entry) -> Result<(), HookError>;
}

/// The hooks of a logger, indexed by level.
#[derive(Clone, Default)]
pub struct LevelHooks {
    hooks: BTreeMap<Level, Vec<Arc<dyn Hook>>>,
}

impl LevelHooks {
    /// Creates an empty set of hooks.
    pub fn new() -> LevelHooks {
        LevelHooks::default()
    }

    /// Registers a hook for all of its levels.
    pub fn add<H: Hook + 'static>(&mut self, hook: H) {
        self.add_shared(Arc::new(hook));
    }

    /// Registers a shared hook for all of its levels.
    pub fn add_shared(&mut self, hook: Arc<dyn Hook>) {
        for level in hook.levels() {
            self.hooks.entry(*level).or_default().push(hook.clone());
        }
    }

    /// Returns `true` if any hook is registered for `level`.
    pub fn is_enabled(&self, level: Level) -> bool {
        self.hooks.get(&level).is_some_and(|hooks| !hooks.is_empty())
    }

    /// Fires the hooks registered for the entry's level, in registration
    /// order.
    ///
    /// Stops at, and returns, the first error.
    pub fn fire(&self, entry: &Entry) -> Result<(), HookError> {
        for hook in self.hooks.get(&entry.level).into_iter().flatten() {
            hook.fire(entry)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LevelHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.hooks.iter().map(|(level, hooks)| (level, hooks.len())))
            .finish()
    }
}
