//! Cycle and depth detection for one resolution.

use std::collections::HashSet;

use crate::error::{DependError, DependResult};
use crate::key::CallableId;

/// Callables currently being resolved, in call order.
///
/// `in_progress` mirrors `stack` as a set so re-entry checks stay O(1) on
/// deep graphs; `stack` keeps the order needed to report the cycle.
pub(crate) struct ResolutionStack {
    stack: Vec<CallableId>,
    in_progress: HashSet<CallableId>,
    max_depth: usize,
}

impl ResolutionStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            in_progress: HashSet::new(),
            max_depth,
        }
    }

    /// Pushes `id`, failing if it is already being resolved or the stack is
    /// at its maximum depth.
    pub(crate) fn enter(&mut self, id: CallableId) -> DependResult<()> {
        // Circular detection BEFORE pushing the new id
        if self.in_progress.contains(&id) {
            return Err(DependError::Circular(self.cycle_path(id)));
        }

        if self.stack.len() >= self.max_depth {
            return Err(DependError::DepthExceeded(self.max_depth));
        }

        self.stack.push(id);
        self.in_progress.insert(id);
        Ok(())
    }

    pub(crate) fn leave(&mut self, id: CallableId) {
        if let Some(last) = self.stack.pop() {
            debug_assert_eq!(last, id);
            self.in_progress.remove(&last);
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &CallableId) -> bool {
        self.in_progress.contains(id)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// The chain that closes a cycle on `id`: from its first occurrence on the
    /// stack to the top, followed by `id` again.
    fn cycle_path(&self, id: CallableId) -> Vec<&'static str> {
        let start = self.stack.iter().position(|entry| *entry == id).unwrap_or(0);
        let mut path: Vec<&'static str> = self.stack[start..].iter().map(|entry| entry.name()).collect();
        path.push(id.name());
        path
    }
}
