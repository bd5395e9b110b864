//! The node arena and the scoped symbol tables it owns.
//!
//! All symbols and scopes of one translation unit live here. References
//! are [`SymbolId`]/[`ScopeId`] handles, so self-referential symbol/type
//! graphs (recursive procedures, derived types mentioning themselves) are
//! ordinary data. Nodes are never freed individually; the arena drops with
//! its unit.

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use crate::error::AsrError;
use crate::index::{newtype_index, IndexVec};
use crate::name::Name;
use crate::nodes::Symbol;

newtype_index!(
    /// Stable handle of a symbol within its unit's arena.
    pub struct SymbolId
);

newtype_index!(
    /// Stable handle of a scope within its unit's arena.
    pub struct ScopeId
);

type NameMap = IndexMap<Name, SymbolId, BuildHasherDefault<FxHasher>>;

/// A symbol table: name-to-symbol map with an optional parent link.
/// Iteration order is insertion order, which reference-output tests
/// observe.
#[derive(Debug, Clone)]
pub struct Scope {
    parent: Option<ScopeId>,
    owner: Option<SymbolId>,
    names: NameMap,
}

impl Scope {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            owner: None,
            names: NameMap::default(),
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// The scope-owning symbol whose `symtab` this is, if any. Global
    /// scopes have no owner.
    pub fn owner(&self) -> Option<SymbolId> {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// Symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, SymbolId)> {
        self.names.iter().map(|(name, id)| (name, *id))
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.names.values().copied()
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Vacant,
    Filled(Symbol),
}

/// Owner of all symbols and scopes of one translation unit.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    symbols: IndexVec<SymbolId, Slot>,
    scopes: IndexVec<ScopeId, Scope>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            symbols: IndexVec::new(),
            scopes: IndexVec::new(),
        }
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn num_scopes(&self) -> usize {
        self.scopes.len()
    }

    pub fn alloc_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(Slot::Filled(symbol))
    }

    /// Reserves a symbol slot to be filled later with [`Arena::fill_symbol`].
    /// The decoder uses this to linearize cycles: the id is referenceable
    /// before the symbol's own fields have been read.
    pub fn reserve_symbol(&mut self) -> SymbolId {
        self.symbols.push(Slot::Vacant)
    }

    pub fn fill_symbol(&mut self, id: SymbolId, symbol: Symbol) {
        debug_assert!(
            matches!(self.symbols[id], Slot::Vacant),
            "symbol slot filled twice"
        );
        self.symbols[id] = Slot::Filled(symbol);
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        match &self.symbols[id] {
            Slot::Filled(symbol) => symbol,
            Slot::Vacant => panic!("reserved symbol slot {id:?} was never filled"),
        }
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        match &mut self.symbols[id] {
            Slot::Filled(symbol) => symbol,
            Slot::Vacant => panic!("reserved symbol slot {id:?} was never filled"),
        }
    }

    /// Swaps in a replacement node, returning the old one. This is the
    /// in-place rewrite facility transformer passes use.
    pub fn replace_symbol(&mut self, id: SymbolId, symbol: Symbol) -> Symbol {
        match std::mem::replace(&mut self.symbols[id], Slot::Filled(symbol)) {
            Slot::Filled(old) => old,
            Slot::Vacant => panic!("reserved symbol slot {id:?} was never filled"),
        }
    }

    pub fn symbol_ids(&self) -> impl DoubleEndedIterator<Item = SymbolId> + '_ {
        self.symbols.indices()
    }

    pub fn scope_ids(&self) -> impl DoubleEndedIterator<Item = ScopeId> + '_ {
        self.scopes.indices()
    }

    pub fn alloc_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope::new(parent))
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    /// Inserts `sym` into `scope` under the symbol's own name and fixes up
    /// the navigation links: scope-owning symbols get their owned scope's
    /// back link set, scope-resident symbols get `parent_symtab` set.
    pub fn insert(&mut self, scope: ScopeId, sym: SymbolId) -> Result<(), AsrError> {
        let name = self.symbol(sym).name().clone();
        if self.scopes[scope].names.contains_key(&name) {
            return Err(AsrError::DuplicateName { scope, name });
        }
        self.scopes[scope].names.insert(name, sym);
        if let Some(owned) = self.symbol(sym).symtab() {
            self.scopes[owned].owner = Some(sym);
        } else {
            self.symbol_mut(sym).set_parent_symtab(scope);
        }
        Ok(())
    }

    /// Looks `name` up in `scope` only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope].get(name)
    }

    /// Looks `name` up in `scope`, then in its ancestors; first hit wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.ancestors(scope)
            .find_map(|scope| self.lookup_local(scope, name))
    }

    /// `scope` followed by its parents up to a root.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |scope| self.scopes[*scope].parent)
    }

    /// The scope a symbol resides in: `parent_symtab` for scope-resident
    /// symbols, the owned scope's parent for scope-owning ones.
    pub fn enclosing_scope(&self, sym: SymbolId) -> Option<ScopeId> {
        let symbol = self.symbol(sym);
        match symbol.parent_symtab() {
            Some(scope) => Some(scope),
            None => symbol
                .symtab()
                .and_then(|owned| self.scopes[owned].parent),
        }
    }

    /// Resolves an `ExternalSymbol` by its declared path: open
    /// `module_name` in the global scope, descend `scope_names`, then look
    /// up `original_name` locally in the leaf scope.
    pub fn resolve_external(
        &self,
        global_scope: ScopeId,
        ext: SymbolId,
    ) -> Result<SymbolId, AsrError> {
        let Symbol::ExternalSymbol(ext) = self.symbol(ext) else {
            return Err(AsrError::NotExternal { sym: ext });
        };
        let unresolved = || AsrError::UnresolvedExternal {
            module: ext.module_name.clone(),
            name: ext.original_name.clone(),
        };

        let module = self
            .lookup_local(global_scope, &ext.module_name)
            .ok_or_else(unresolved)?;
        let mut scope = self.symbol(module).symtab().ok_or_else(unresolved)?;
        for scope_name in &ext.scope_names {
            let inner = self
                .lookup_local(scope, scope_name)
                .ok_or_else(unresolved)?;
            scope = self.symbol(inner).symtab().ok_or_else(unresolved)?;
        }
        self.lookup_local(scope, &ext.original_name)
            .ok_or_else(unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Access, Intent, Presence, StorageType, SymbolVariable, Ttype};

    fn variable(name: &str) -> Symbol {
        Symbol::Variable(SymbolVariable {
            parent_symtab: ScopeId::from_u32(0),
            name: Name::new(name),
            intent: Intent::Local,
            symbolic_value: None,
            storage: StorageType::Default,
            ttype: Ttype::integer(4),
            abi: crate::nodes::Abi::Source,
            access: Access::Public,
            presence: Presence::Required,
        })
    }

    #[test]
    fn insert_rejects_duplicate_names() {
        let mut arena = Arena::new();
        let root = arena.alloc_scope(None);
        let a = arena.alloc_symbol(variable("x"));
        let b = arena.alloc_symbol(variable("x"));

        arena.insert(root, a).unwrap();
        let err = arena.insert(root, b).unwrap_err();
        assert!(matches!(err, AsrError::DuplicateName { ref name, .. } if *name == "x"));
    }

    #[test]
    fn shadowing_needs_a_child_scope() {
        let mut arena = Arena::new();
        let root = arena.alloc_scope(None);
        let inner = arena.alloc_scope(Some(root));
        let outer_x = arena.alloc_symbol(variable("x"));
        let inner_x = arena.alloc_symbol(variable("x"));

        arena.insert(root, outer_x).unwrap();
        arena.insert(inner, inner_x).unwrap();

        assert_eq!(arena.lookup(inner, "x"), Some(inner_x));
        assert_eq!(arena.lookup(root, "x"), Some(outer_x));
    }

    #[test]
    fn lookup_walks_parent_scopes() {
        let mut arena = Arena::new();
        let root = arena.alloc_scope(None);
        let mid = arena.alloc_scope(Some(root));
        let leaf = arena.alloc_scope(Some(mid));
        let x = arena.alloc_symbol(variable("x"));

        arena.insert(root, x).unwrap();

        assert_eq!(arena.lookup(leaf, "x"), Some(x));
        assert_eq!(arena.lookup_local(leaf, "x"), None);
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut arena = Arena::new();
        let root = arena.alloc_scope(None);
        for name in ["qux", "foo", "bar", "baz"] {
            let sym = arena.alloc_symbol(variable(name));
            arena.insert(root, sym).unwrap();
        }

        let names: Vec<_> = arena
            .scope(root)
            .iter()
            .map(|(name, _)| name.as_str().to_owned())
            .collect();
        assert_eq!(names, ["qux", "foo", "bar", "baz"]);
    }

    #[test]
    fn insert_sets_parent_symtab() {
        let mut arena = Arena::new();
        let root = arena.alloc_scope(None);
        let inner = arena.alloc_scope(Some(root));
        let x = arena.alloc_symbol(variable("x"));

        arena.insert(inner, x).unwrap();

        assert_eq!(arena.symbol(x).parent_symtab(), Some(inner));
        assert_eq!(arena.enclosing_scope(x), Some(inner));
    }

    #[test]
    fn reserved_slots_fill_later() {
        let mut arena = Arena::new();
        let id = arena.reserve_symbol();
        arena.fill_symbol(id, variable("x"));

        assert_eq!(arena.symbol(id).name(), "x");
    }
}
