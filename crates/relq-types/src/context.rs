//! Compilation context
//!
//! Bundles the scope stack and the accumulator stack so that they are always
//! pushed and popped together.

use crate::{AccumCounter, AccumError, AccumStack, DataType, FoldMode, Heading, Scope, ScopeError, ScopeStack};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Accum(#[from] AccumError),
}

/// What a popped context level captured
#[derive(Debug, Clone)]
pub struct Captured {
    pub scope: Scope,
    /// The level's own counter, `None` when it inherited its parent's
    pub counter: Option<AccumCounter>,
}

impl Captured {
    pub fn lookup(&self) -> &Heading {
        self.scope.lookup()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    pub scopes: ScopeStack,
    pub accums: AccumStack,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope seeded from `data_type` with the given fold behaviour
    pub fn push(&mut self, data_type: Option<&DataType>, fold: FoldMode) {
        self.scopes.push(data_type);
        self.accums.push(fold);
    }

    /// Open a parameter scope for a function body
    pub fn push_parameters(&mut self, params: &Heading) {
        self.scopes.push_parameters(params);
        self.accums.push(FoldMode::Enabled);
    }

    pub fn pop(&mut self) -> Result<Captured, ContextError> {
        let scope = self.scopes.pop()?;
        let counter = self.accums.pop()?;
        Ok(Captured { scope, counter })
    }

    /// Pop and push again for a new heading, or the current one
    ///
    /// The counter is reset rather than popped, so the fold scope survives.
    pub fn reenter(&mut self, data_type: Option<&DataType>) -> Result<Scope, ContextError> {
        let current = self.scopes.current().heading().cloned();
        let scope = self.scopes.pop()?;
        match data_type {
            Some(ty) => self.scopes.push(Some(ty)),
            None => match current {
                Some(h) => self.scopes.push(Some(&DataType::Tuple(h))),
                None => self.scopes.push(None),
            },
        }
        self.accums.reset();
        Ok(scope)
    }

    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Both stacks are at the same depth
    pub fn in_sync(&self) -> bool {
        self.scopes.depth() == self.accums.depth()
    }

    /// Drop everything a failed statement left open
    pub fn reset(&mut self) {
        self.scopes.reset();
        self.accums.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Column;

    fn rel() -> DataType {
        DataType::relation(Heading::from_columns([Column::new("a", DataType::Number)]).unwrap())
    }

    #[test]
    fn test_lockstep() {
        let mut ctx = CompileContext::new();
        ctx.push(Some(&rel()), FoldMode::Enabled);
        ctx.push(None, FoldMode::Inherit);
        assert_eq!(ctx.depth(), 2);
        assert!(ctx.in_sync());

        ctx.accums.allocate("count", 1).unwrap();
        assert!(ctx.pop().unwrap().counter.is_none());
        let captured = ctx.pop().unwrap();
        assert_eq!(captured.counter.map(|c| c.total), Some(1));
        assert!(ctx.in_sync());
    }

    #[test]
    fn test_reenter_resets_counter() {
        let mut ctx = CompileContext::new();
        ctx.push(Some(&rel()), FoldMode::Enabled);
        ctx.accums.allocate("count", 1).unwrap();

        ctx.reenter(None).unwrap();
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.scopes.find_any("a").is_some());
        assert_eq!(ctx.accums.allocate("count", 1), Ok(0));
    }

    #[test]
    fn test_reset_after_failure() {
        let mut ctx = CompileContext::new();
        ctx.push(Some(&rel()), FoldMode::Enabled);
        ctx.push(None, FoldMode::Disabled);
        ctx.reset();
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.in_sync());
        assert!(ctx.pop().is_err());
    }
}
