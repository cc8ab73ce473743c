//! Catalog collaborator
//!
//! The catalog owns everything that outlives a statement: variables,
//! deferred function definitions and user types. The compiler only reads
//! and registers entries through this trait.

use indexmap::IndexMap;
use relq_ast::Statement;
use relq_diagnostics::{ErrorCode, RQ0100, RQ0102, RQ0107, RQ0108, RQ0401, RQ0402};
use relq_types::{CallInfo, DataType, OverloadChain, OverloadError, Symbol, SymbolKind, UserType};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Overload(#[from] OverloadError),

    #[error("'{name}' is not in the catalog")]
    NotFound { name: String },

    #[error("'{name}' is already defined as a {kind}")]
    KindConflict { name: String, kind: SymbolKind },

    #[error("catalog load failed: {reason}")]
    Load { reason: String },

    #[error("catalog save failed: {reason}")]
    Save { reason: String },
}

impl CatalogError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Overload(OverloadError::ArityConflict { .. }) => RQ0107,
            Self::Overload(OverloadError::ReturnTypeConflict { .. }) => RQ0108,
            Self::NotFound { .. } => RQ0100,
            Self::KindConflict { .. } => RQ0102,
            Self::Load { .. } => RQ0401,
            Self::Save { .. } => RQ0402,
        }
    }

    /// Raised by `load`/`save`, as opposed to a rejected definition
    pub fn is_system(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Save { .. })
    }
}

pub type CatalogResult<T = ()> = Result<T, CatalogError>;

pub trait Catalog {
    /// Find a catalog entry by name
    fn find_ident(&self, name: &str) -> Option<Symbol>;

    /// Insert or replace an entry
    fn add_catalog_entry(&mut self, symbol: Symbol) -> CatalogResult;

    /// Bind or rebind a variable
    fn add_variable(&mut self, name: &str, data_type: DataType) -> CatalogResult {
        if let Some(existing) = self.find_ident(name).filter(|s| s.kind != SymbolKind::Catalog) {
            return Err(CatalogError::KindConflict {
                name: name.to_string(),
                kind: existing.kind,
            });
        }
        self.add_catalog_entry(Symbol::new(name, SymbolKind::Catalog, data_type).mutable())
    }

    /// Register the first definition of a function
    fn add_deferred(&mut self, call: CallInfo) -> CatalogResult {
        let name = call.name.clone();
        self.add_catalog_entry(Symbol::callable(name, SymbolKind::Deferred, OverloadChain::single(call)))
    }

    /// Add a definition to an existing function, or create it
    fn add_overload(&mut self, call: CallInfo) -> CatalogResult {
        match self.find_ident(&call.name) {
            None => self.add_deferred(call),
            Some(mut symbol) if symbol.kind == SymbolKind::Deferred => {
                let chain = symbol.calls.get_or_insert_with(OverloadChain::new);
                chain.add_overload(call)?;
                self.add_catalog_entry(symbol)
            }
            Some(symbol) => Err(CatalogError::KindConflict {
                name: symbol.name,
                kind: symbol.kind,
            }),
        }
    }

    fn add_user_type(&mut self, user: UserType) -> CatalogResult {
        if let Some(existing) = self.find_ident(&user.name) {
            return Err(CatalogError::KindConflict {
                name: existing.name,
                kind: existing.kind,
            });
        }
        let name = user.name.clone();
        self.add_catalog_entry(Symbol::new(name, SymbolKind::UserType, DataType::user(user)))
    }

    /// Record what a compiled statement defines
    fn register(&mut self, statement: &Statement) -> CatalogResult {
        match statement {
            Statement::Expression(_) => Ok(()),
            Statement::Assign(assign) => self.add_variable(&assign.name, assign.value.data_type()),
            Statement::Define(def) => self.add_overload(def.call.clone()),
            Statement::TypeDef(user) => self.add_user_type(user.clone()),
        }
    }

    /// Restore persisted entries, returning how many were loaded
    fn load(&mut self) -> CatalogResult<usize>;

    /// Persist all entries, returning how many were saved
    fn save(&mut self) -> CatalogResult<usize>;
}

/// In-process catalog; `save` and `load` snapshot it in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: IndexMap<String, Symbol>,
    snapshot: Option<IndexMap<String, Symbol>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.values()
    }
}

impl Catalog for MemoryCatalog {
    fn find_ident(&self, name: &str) -> Option<Symbol> {
        self.entries.get(name).cloned()
    }

    fn add_catalog_entry(&mut self, symbol: Symbol) -> CatalogResult {
        log::debug!("catalog entry '{}' ({})", symbol.name, symbol.kind);
        self.entries.insert(symbol.name.clone(), symbol.at_level(0));
        Ok(())
    }

    fn load(&mut self) -> CatalogResult<usize> {
        let snapshot = self.snapshot.clone().ok_or_else(|| CatalogError::Load {
            reason: "no saved catalog".to_string(),
        })?;
        self.entries = snapshot;
        Ok(self.entries.len())
    }

    fn save(&mut self) -> CatalogResult<usize> {
        self.snapshot = Some(self.entries.clone());
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_types::CallKind;

    fn def(arg: DataType, ret: DataType) -> CallInfo {
        CallInfo::new("f", ret, CallKind::Deferred).arg("x", arg)
    }

    #[test]
    fn overloads_accumulate() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_overload(def(DataType::Number, DataType::Number)).unwrap();
        catalog.add_overload(def(DataType::Text, DataType::Number)).unwrap();
        assert_eq!(catalog.get("f").unwrap().links().len(), 2);
    }

    #[test]
    fn conflicting_return_type_is_rejected() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_overload(def(DataType::Number, DataType::Number)).unwrap();
        let err = catalog.add_overload(def(DataType::Text, DataType::Text)).unwrap_err();
        assert_eq!(err.code(), RQ0108);
        assert_eq!(catalog.get("f").unwrap().links().len(), 1);
    }

    #[test]
    fn variables_do_not_shadow_functions() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_overload(def(DataType::Number, DataType::Number)).unwrap();
        let err = catalog.add_variable("f", DataType::Number).unwrap_err();
        assert!(matches!(err, CatalogError::KindConflict { .. }));
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut catalog = MemoryCatalog::new();
        assert!(catalog.load().unwrap_err().is_system());
        catalog.add_variable("x", DataType::Number).unwrap();
        assert_eq!(catalog.save().unwrap(), 1);
        catalog.add_variable("y", DataType::Text).unwrap();
        assert_eq!(catalog.load().unwrap(), 1);
        assert!(catalog.get("y").is_none());
    }
}
