//! The Abstract Semantic Representation (ASR) of the ferrite compiler.
//!
//! ASR is the typed, fully resolved form a program takes between semantic
//! analysis and the backends: scoping, symbol resolution, overload
//! resolution results, storage, intent, visibility, ABI, and array shapes
//! are all explicit, so a backend consumes a unit in a single pass with no
//! further lookups, and a pretty printer can reconstruct an equivalent
//! source program.
//!
//! The crate owns the node algebra ([`nodes`]), the scoped symbol tables
//! and node arena ([`arena`]), the typed constructors the elaboration pass
//! builds through ([`build`]), the traversal and rewrite frameworks
//! ([`visitor`], [`fold`]), whole-tree validation ([`validate`]), the
//! canonical pickle and structural equality ([`pickle`], [`compare`]), and
//! the interface projection for module files ([`interface`]). The binary
//! module-file encoding lives in the `ferrite_modfile` crate.

pub mod arena;
pub mod build;
pub mod compare;
pub mod error;
pub mod fold;
pub mod index;
pub mod interface;
pub mod name;
pub mod nodes;
pub mod pickle;
pub mod validate;
pub mod visitor;

pub use arena::{Arena, Scope, ScopeId, SymbolId};
pub use error::AsrError;
pub use name::Name;
pub use nodes::{Expr, Stmt, Symbol, TranslationUnit, Ttype, UnitItem};
pub use validate::{validate, Violation, ViolationKind};
