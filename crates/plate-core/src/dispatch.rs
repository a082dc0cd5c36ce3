use crate::core::{Editor, PathError};
use crate::ops::Op;

impl Editor {
    /// Drains the operation log if it holds a selection change and runs each
    /// selection hook once against the final selection.
    ///
    /// Returns `false` and leaves the log untouched when the batch had no
    /// selection change. Selections committed by hooks are not logged, so a
    /// hook never re-triggers the dispatcher.
    pub fn dispatch_changes(&mut self) -> Result<bool, PathError> {
        let trigger = self.operations().iter().position(Op::is_selection_change);
        tracing::trace!(ops = self.operations().len(), ?trigger, "scanned change batch");

        if trigger.is_none() {
            return Ok(false);
        }
        self.take_operations();

        for ix in 0..self.registry().selection_hooks().len() {
            let Some(current) = self.selection().cloned() else {
                break;
            };
            let hook = &self.registry().selection_hooks()[ix];
            let id = hook.id();
            if let Some(next) = hook.normalize_selection(self, &current)? {
                tracing::debug!(hook = id, from = ?current, to = ?next, "selection normalized");
                self.commit_selection(next);
            }
        }

        Ok(true)
    }
}
