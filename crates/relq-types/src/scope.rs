//! Scope management
//!
//! Scopes nest innermost-last on a stack. A scope pushed for a heading is
//! seeded with one symbol per column, so field names resolve like any other
//! name. Resolving a lookup symbol records the column in every heading scope
//! from its declaring scope inward; a scope's recorded columns are what its
//! code segment reads from the enclosing row.

use indexmap::IndexMap;
use thiserror::Error;

use crate::{Column, DataType, Heading, Symbol, SymbolKind};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    #[error("duplicate definition of '{name}'")]
    Duplicate { name: String },

    #[error("scope stack underflow")]
    Underflow,
}

/// What a scope was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Statement level
    Statement,
    /// Columns of a tuple or relation
    Fields,
    /// Components of a user type
    Components,
    /// Parameters of a function definition
    Parameters,
    /// Block bindings, no heading
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    symbols: IndexMap<String, Symbol>,
    heading: Option<Heading>,
    lookup: Heading,
    level: usize,
}

impl Scope {
    fn new(kind: ScopeKind, level: usize) -> Self {
        Self {
            kind,
            symbols: IndexMap::new(),
            heading: None,
            lookup: Heading::new(),
            level,
        }
    }

    fn seeded(kind: ScopeKind, level: usize, heading: &Heading, symbol_kind: SymbolKind) -> Self {
        let mut scope = Self::new(kind, level);
        for column in heading.iter() {
            scope.symbols.insert(
                column.name.clone(),
                Symbol::new(column.name.clone(), symbol_kind, column.data_type.clone()).at_level(level),
            );
        }
        scope.heading = Some(heading.clone());
        scope
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn heading(&self) -> Option<&Heading> {
        self.heading.as_ref()
    }

    /// Columns of the enclosing row read by code compiled in this scope
    pub fn lookup(&self) -> &Heading {
        &self.lookup
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// The stack of open scopes
#[derive(Debug, Clone)]
pub struct ScopeStack {
    current: Scope,
    stack: Vec<Scope>,
    /// Open read trackers, innermost last; see [`ScopeStack::track_reads`]
    trackers: Vec<Vec<(Column, usize)>>,
}

impl ScopeStack {
    /// Builtins and catalog entries live below level one
    pub const STATEMENT_LEVEL: usize = 1;

    pub fn new() -> Self {
        Self {
            current: Scope::new(ScopeKind::Statement, Self::STATEMENT_LEVEL),
            stack: Vec::new(),
            trackers: Vec::new(),
        }
    }

    pub fn current(&self) -> &Scope {
        &self.current
    }

    pub fn level(&self) -> usize {
        self.current.level
    }

    /// Number of scopes pushed above the statement scope
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn enter(&mut self, scope: Scope) {
        let parent = std::mem::replace(&mut self.current, scope);
        self.stack.push(parent);
        log::trace!("push scope {:?} at level {}", self.current.kind, self.current.level);
    }

    /// Push a scope seeded from a tuple, relation or user type
    ///
    /// Any other type, or `None`, pushes a plain block scope.
    pub fn push(&mut self, data_type: Option<&DataType>) {
        let level = self.level() + 1;
        let scope = match data_type {
            Some(DataType::Tuple(h)) | Some(DataType::Relation(h)) => {
                Scope::seeded(ScopeKind::Fields, level, h, SymbolKind::Field)
            }
            Some(DataType::User(u)) => {
                Scope::seeded(ScopeKind::Components, level, &u.heading, SymbolKind::Component)
            }
            _ => Scope::new(ScopeKind::Block, level),
        };
        self.enter(scope);
    }

    /// Push a scope holding the parameters of a function being defined
    pub fn push_parameters(&mut self, params: &Heading) {
        let level = self.level() + 1;
        self.enter(Scope::seeded(ScopeKind::Parameters, level, params, SymbolKind::Parameter));
    }

    /// Pop the innermost scope, returning what it captured
    pub fn pop(&mut self) -> Result<Scope, ScopeError> {
        let parent = self.stack.pop().ok_or(ScopeError::Underflow)?;
        let scope = std::mem::replace(&mut self.current, parent);
        log::trace!(
            "pop scope {:?} at level {} (lookup {})",
            scope.kind,
            scope.level,
            scope.lookup
        );
        Ok(scope)
    }

    /// Define a symbol in the innermost scope
    pub fn add(&mut self, symbol: Symbol) -> Result<(), ScopeError> {
        if self.current.symbols.contains_key(&symbol.name) {
            return Err(ScopeError::Duplicate { name: symbol.name });
        }
        let level = self.current.level;
        self.current
            .symbols
            .insert(symbol.name.clone(), symbol.at_level(level));
        Ok(())
    }

    /// Find a name, innermost scope first
    pub fn find_any(&self, name: &str) -> Option<&Symbol> {
        std::iter::once(&self.current)
            .chain(self.stack.iter().rev())
            .find_map(|scope| scope.symbols.get(name))
    }

    /// Find a name and record lookup symbols as read by every heading
    /// scope from the declaring one inward
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        let symbol = self.find_any(name)?.clone();
        if symbol.kind.is_lookup() {
            let column = Column::new(symbol.name.clone(), symbol.data_type.clone());
            self.record(&column, symbol.level);
        }
        Some(symbol)
    }

    /// Record `column`, declared at `level`, as read by every heading scope
    /// from that level inward
    pub fn record(&mut self, column: &Column, level: usize) {
        for scope in self
            .stack
            .iter_mut()
            .chain(std::iter::once(&mut self.current))
            .filter(|s| s.level >= level && s.heading.is_some())
        {
            scope.lookup.insert_if_absent(column.clone());
        }
        for reads in &mut self.trackers {
            if !reads.iter().any(|(c, at)| c.name == column.name && *at == level) {
                reads.push((column.clone(), level));
            }
        }
    }

    /// Start collecting every lookup read until the matching `take_reads`
    ///
    /// Trackers nest; a read is seen by all open trackers.
    pub fn track_reads(&mut self) {
        self.trackers.push(Vec::new());
    }

    /// Columns read since the innermost `track_reads`, with their declaring level
    pub fn take_reads(&mut self) -> Vec<(Column, usize)> {
        self.trackers.pop().unwrap_or_default()
    }

    /// Heading of the nearest scope that set one
    pub fn current_heading(&self) -> Option<&Heading> {
        std::iter::once(&self.current)
            .chain(self.stack.iter().rev())
            .find_map(|scope| scope.heading.as_ref())
    }

    /// Drop every scope above the statement scope and clear it
    pub fn reset(&mut self) {
        self.stack.clear();
        self.trackers.clear();
        self.current = Scope::new(ScopeKind::Statement, Self::STATEMENT_LEVEL);
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
