//! Errors raised at the offending call by the builder and the symbol
//! table. They are returned to the elaboration collaborator, never
//! rendered or recovered here. Whole-tree invariant checking collects
//! [`crate::validate::Violation`]s instead.

use crate::arena::{ScopeId, SymbolId};
use crate::name::Name;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsrError {
    #[error("duplicate name `{name}` in scope {scope:?}")]
    DuplicateName { scope: ScopeId, name: Name },

    #[error("unresolved name `{name}`")]
    UnresolvedName { name: Name },

    #[error("`{name}` does not resolve along its declared path through module `{module}`")]
    UnresolvedExternal { module: Name, name: Name },

    #[error("symbol {sym:?} is not an ExternalSymbol")]
    NotExternal { sym: SymbolId },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },
}
