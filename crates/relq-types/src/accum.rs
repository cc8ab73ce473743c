//! Accumulator bookkeeping for folds and windowed operators

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccumError {
    #[error("aggregate '{name}' outside of a grouping context")]
    AggregateOutsideGrouping { name: String },

    #[error("window operator '{name}' outside of a transform")]
    WindowOutsideTransform { name: String },

    #[error("accumulator stack underflow")]
    Underflow,
}

/// Fold state of one fold scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccumCounter {
    pub enabled: bool,
    /// Slots allocated in this fold scope; never decreases until `reset`
    pub total: usize,
    /// Slots allocated since the last field boundary
    pub segments: usize,
    pub has_window: bool,
}

impl AccumCounter {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Allocate `n` slots and return the index of the first one
    pub fn allocate(&mut self, n: usize) -> usize {
        let base = self.total;
        self.total += n;
        self.segments += n;
        base
    }

    /// Start the next field of a transform; the total keeps growing
    pub fn reset_field(&mut self) {
        self.segments = 0;
        self.has_window = false;
    }

    /// Start over for a new heading
    pub fn reset(&mut self) {
        self.total = 0;
        self.reset_field();
    }
}

/// How a pushed scope relates to folding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldMode {
    /// Folds are allowed and counted here
    Enabled,
    /// Folds are rejected here
    Disabled,
    /// Folds count against the nearest enclosing counter
    Inherit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Counter(AccumCounter),
    Inherit,
}

/// Counter stack kept at the same depth as the scope stack
#[derive(Debug, Clone)]
pub struct AccumStack {
    /// Statement-level counter; rejects folds
    root: AccumCounter,
    entries: Vec<Entry>,
}

impl AccumStack {
    pub fn new() -> Self {
        Self {
            root: AccumCounter::disabled(),
            entries: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&mut self, mode: FoldMode) {
        self.entries.push(match mode {
            FoldMode::Enabled => Entry::Counter(AccumCounter::enabled()),
            FoldMode::Disabled => Entry::Counter(AccumCounter::disabled()),
            FoldMode::Inherit => Entry::Inherit,
        });
    }

    /// Pop the innermost entry; an inherited entry yields `None`
    pub fn pop(&mut self) -> Result<Option<AccumCounter>, AccumError> {
        match self.entries.pop() {
            Some(Entry::Counter(c)) => Ok(Some(c)),
            Some(Entry::Inherit) => Ok(None),
            None => Err(AccumError::Underflow),
        }
    }

    fn nearest(&mut self) -> &mut AccumCounter {
        let found = self.entries.iter_mut().rev().find_map(|e| match e {
            Entry::Counter(c) => Some(c),
            Entry::Inherit => None,
        });
        match found {
            Some(c) => c,
            None => &mut self.root,
        }
    }

    /// The counter that allocations currently go to
    pub fn counter(&mut self) -> AccumCounter {
        *self.nearest()
    }

    /// Allocate `n` slots for the fold `name`, returning the base index
    pub fn allocate(&mut self, name: &str, n: usize) -> Result<usize, AccumError> {
        let counter = self.nearest();
        if !counter.enabled {
            return Err(AccumError::AggregateOutsideGrouping {
                name: name.to_string(),
            });
        }
        let base = counter.allocate(n);
        log::trace!("allocate {n} accumulator(s) for '{name}' at {base}");
        Ok(base)
    }

    /// Flag a windowed operator in the current fold scope
    pub fn mark_window(&mut self, name: &str) -> Result<(), AccumError> {
        let counter = self.nearest();
        if !counter.enabled {
            return Err(AccumError::WindowOutsideTransform {
                name: name.to_string(),
            });
        }
        counter.has_window = true;
        Ok(())
    }

    /// Put back a counter taken with [`AccumStack::counter`], undoing what
    /// was allocated in between
    pub fn restore(&mut self, saved: AccumCounter) {
        *self.nearest() = saved;
    }

    pub fn reset_field(&mut self) {
        self.nearest().reset_field();
    }

    pub fn reset(&mut self) {
        self.nearest().reset();
    }

    /// Back to a single statement-level counter
    pub fn clear(&mut self) {
        self.entries.clear();
        self.root = AccumCounter::disabled();
    }
}

impl Default for AccumStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_statement_level_rejects_folds() {
        let mut stack = AccumStack::new();
        assert_eq!(
            stack.allocate("count", 1),
            Err(AccumError::AggregateOutsideGrouping { name: "count".into() })
        );
        assert!(stack.mark_window("ord").is_err());
    }

    #[test]
    fn test_indices_increase_across_fields() {
        let mut stack = AccumStack::new();
        stack.push(FoldMode::Enabled);

        assert_eq!(stack.allocate("count", 1), Ok(0));
        assert_eq!(stack.allocate("avg", 2), Ok(1));
        assert_eq!(stack.counter().segments, 3);

        stack.reset_field();
        assert_eq!(stack.counter().segments, 0);
        assert_eq!(stack.allocate("sum", 1), Ok(3));

        let counter = stack.pop().unwrap().unwrap();
        assert_eq!(counter.total, 4);
    }

    #[test]
    fn test_inherit_delegates_to_parent() {
        let mut stack = AccumStack::new();
        stack.push(FoldMode::Enabled);
        stack.push(FoldMode::Inherit);
        assert_eq!(stack.allocate("count", 1), Ok(0));
        stack.mark_window("ord").unwrap();
        assert_eq!(stack.pop(), Ok(None));

        let counter = stack.counter();
        assert_eq!(counter.total, 1);
        assert!(counter.has_window);
    }

    #[test]
    fn test_disabled_inside_enabled() {
        let mut stack = AccumStack::new();
        stack.push(FoldMode::Enabled);
        stack.push(FoldMode::Disabled);
        assert!(stack.allocate("sum", 1).is_err());
        stack.pop().unwrap();
        assert_eq!(stack.allocate("sum", 1), Ok(0));
    }

    #[test]
    fn test_restore_undoes_allocations() {
        let mut stack = AccumStack::new();
        stack.push(FoldMode::Enabled);
        stack.allocate("count", 1).unwrap();
        let saved = stack.counter();
        stack.allocate("sum", 1).unwrap();
        stack.mark_window("ord").unwrap();
        stack.restore(saved);
        assert_eq!(stack.counter(), saved);
        assert_eq!(stack.allocate("avg", 2), Ok(1));
    }

    #[test]
    fn test_reset_restarts_total() {
        let mut stack = AccumStack::new();
        stack.push(FoldMode::Enabled);
        stack.allocate("count", 1).unwrap();
        stack.reset();
        assert_eq!(stack.allocate("count", 1), Ok(0));
    }
}
