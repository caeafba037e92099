//! Component C2: a lexically scoped name→symbol map with push/pop scopes.

use bugc_types::Type;
use indexmap::IndexMap;

/// Where a symbol's value actually lives at runtime. The IR generator (C5)
/// dispatches on this to decide which load/store instruction family to
/// emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// A function parameter or `let`-bound local, addressable in memory.
    Local,
    /// A top-level storage declaration at a fixed slot.
    Storage { slot: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
}

/// A stack of scopes, innermost last. Lookup walks from the innermost scope
/// outward, so inner `let`s shadow outer ones and function parameters, the
/// way block-scoped languages expect.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<IndexMap<String, Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        // The outermost scope holds top-level storage declarations and is
        // never popped.
        SymbolTable {
            scopes: vec![IndexMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        debug_assert!(!self.scopes.is_empty(), "popped the root scope");
    }

    /// Binds `symbol` in the innermost scope. Returns `false` (and does not
    /// insert) if the name is already bound in that same scope — shadowing
    /// an outer scope's binding is allowed, redeclaring within one scope is
    /// not.
    pub fn define(&mut self, symbol: Symbol) -> bool {
        let scope = self.scopes.last_mut().expect("at least one scope");
        if scope.contains_key(&symbol.name) {
            return false;
        }
        scope.insert(symbol.name.clone(), symbol);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// The outermost scope. Once checking finishes, every function/body
    /// scope has been popped, so this holds exactly the storage symbols —
    /// the IR generator uses it to enumerate storage declarations by name.
    pub fn root_scope(&self) -> &IndexMap<String, Symbol> {
        &self.scopes[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str, ty: Type) -> Symbol {
        Symbol {
            name: name.to_string(),
            ty,
            kind: SymbolKind::Local,
        }
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut table = SymbolTable::new();
        table.define(local("x", Type::Uint(256)));
        table.push_scope();
        table.define(local("x", Type::Bool));
        assert_eq!(table.lookup("x").unwrap().ty, Type::Bool);
        table.pop_scope();
        assert_eq!(table.lookup("x").unwrap().ty, Type::Uint(256));
    }

    #[test]
    fn redefining_in_same_scope_fails() {
        let mut table = SymbolTable::new();
        assert!(table.define(local("x", Type::Uint(256))));
        assert!(!table.define(local("x", Type::Bool)));
    }
}
