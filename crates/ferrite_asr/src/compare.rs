//! Structural equality and hashing.
//!
//! Two units are structurally equal when their node graphs are isomorphic:
//! same variants, same fields in order, same symbol-table structure —
//! regardless of how arena ids happen to be numbered. The canonical pickle
//! already renders symbol identity as first-encounter ordinals, so
//! structural equality is pickle equality, and the structural hash (used
//! for incremental reuse of unchanged modules) hashes the pickle.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::nodes::TranslationUnit;
use crate::pickle::pickle;

pub fn structurally_equal(a: &TranslationUnit, b: &TranslationUnit) -> bool {
    pickle(a) == pickle(b)
}

pub fn structural_hash(unit: &TranslationUnit) -> u64 {
    let mut hasher = FxHasher::default();
    pickle(unit).hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ScopeId;
    use crate::build::UnitBuilder;
    use crate::name::Name;
    use crate::nodes::{
        Access, Intent, Presence, StorageType, Symbol, SymbolVariable, Ttype,
    };

    fn unit_with(names: &[&str]) -> TranslationUnit {
        let mut builder = UnitBuilder::new();
        let global = builder.global_scope();
        for name in names {
            builder
                .add_symbol(
                    global,
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
                    }),
                )
                .unwrap();
        }
        builder.finish()
    }

    #[test]
    fn independently_built_units_compare_equal() {
        let a = unit_with(&["x", "y"]);
        let b = unit_with(&["x", "y"]);

        assert!(structurally_equal(&a, &b));
        assert_eq!(structural_hash(&a), structural_hash(&b));
    }

    #[test]
    fn insertion_order_is_structure() {
        let a = unit_with(&["x", "y"]);
        let b = unit_with(&["y", "x"]);

        assert!(!structurally_equal(&a, &b));
    }
}
