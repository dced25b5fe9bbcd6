//! Compensating actions for in-memory state.
//!
//! The unspent pool and the head-sequence cache live in memory next to
//! sled, and sled's transactions cannot reach them. Each in-memory change
//! made while applying a block pushes its inverse here; if the durable
//! commit then fails, [`Rollbacks::run`] undoes them newest first.

use tracing::warn;

type Undo = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct Rollbacks {
    actions: Vec<Undo>,
}

impl Rollbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, undo: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.actions.push(Box::new(undo));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Undo everything, newest first.
    pub fn run(mut self) {
        if !self.actions.is_empty() {
            warn!(steps = self.actions.len(), "rolling back in-memory changes");
        }
        while let Some(undo) = self.actions.pop() {
            undo();
        }
    }

    /// The changes are durable; forget how to undo them.
    pub fn commit(self) {}
}

impl std::fmt::Debug for Rollbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rollbacks")
            .field("pending", &self.actions.len())
            .finish()
    }
}
