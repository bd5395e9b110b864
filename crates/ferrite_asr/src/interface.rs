//! Interface projection.
//!
//! Turns a fully elaborated module into the interface form stored in
//! module files: procedure bodies emptied, `deftype` forced to
//! `Interface`, the source ABI mapped to the module interface ABI, private
//! procedures and variables dropped, generic and custom-operator sets
//! filtered to their surviving procedures. Derived and class types are
//! retained regardless of visibility so that public signatures stay
//! resolvable. `ExternalSymbol`s are not projected; importers re-resolve
//! cross-module references when the interface is grafted into a unit.
//!
//! The projection is idempotent and copies into a fresh unit; the source
//! unit is never touched.

use rustc_hash::FxHashMap;

use crate::arena::{Arena, ScopeId, SymbolId};
use crate::error::AsrError;
use crate::name::Name;
use crate::nodes::{
    Abi, Access, ArrayIndex, Deftype, Dimension, Expr, Intent, Symbol, SymbolClassProcedure,
    SymbolClassType, SymbolDerivedType, SymbolFunction, SymbolGenericProcedure, SymbolModule,
    SymbolCustomOperator, SymbolSubroutine, SymbolVariable, Ttype, TranslationUnit, UnitItem,
};

/// The ABI a symbol advertises once it lives in an interface module.
fn interface_abi(abi: Abi) -> Abi {
    match abi {
        Abi::Source | Abi::Interactive => Abi::LFortranModule,
        other => other,
    }
}

#[derive(Clone, Copy)]
enum ScopeRole {
    Module,
    Procedure,
    Type,
}

/// Projects `module` to its interface form in a fresh translation unit
/// whose single item is the projected module.
pub fn module_interface(
    unit: &TranslationUnit,
    module: SymbolId,
) -> Result<TranslationUnit, AsrError> {
    let Symbol::Module(source) = unit.arena.symbol(module) else {
        return Err(AsrError::TypeMismatch {
            context: "interface projection",
            expected: "a Module".to_owned(),
            found: unit.arena.symbol(module).name().to_string(),
        });
    };

    let mut out = TranslationUnit::new();
    let mut projector = Projector {
        src: &unit.arena,
        symbol_map: FxHashMap::default(),
        scope_map: FxHashMap::default(),
    };

    let module_scope = out.arena.alloc_scope(Some(out.global_scope));
    projector.scope_map.insert(source.symtab, module_scope);
    projector.plan_scope(&mut out.arena, source.symtab, module_scope, ScopeRole::Module);

    let planned: Vec<(SymbolId, SymbolId)> = projector
        .symbol_map
        .iter()
        .map(|(old, new)| (*old, *new))
        .collect();
    for (old, new) in planned {
        let projected = projector.project_symbol(old)?;
        out.arena.fill_symbol(new, projected);
    }

    tracing::debug!(
        module = %source.name,
        symbols = projector.symbol_map.len(),
        "projected module interface"
    );
    let new_module = out.arena.alloc_symbol(Symbol::Module(SymbolModule {
        name: source.name.clone(),
        symtab: module_scope,
        dependencies: source.dependencies.clone(),
        loaded_from_mod: source.loaded_from_mod,
    }));
    out.arena.insert(out.global_scope, new_module)?;
    projector.link_scope(&mut out.arena, source.symtab)?;
    out.items.push(UnitItem::Symbol(new_module));
    Ok(out)
}

struct Projector<'a> {
    src: &'a Arena,
    symbol_map: FxHashMap<SymbolId, SymbolId>,
    scope_map: FxHashMap<ScopeId, ScopeId>,
}

impl Projector<'_> {
    /// Does `sym` survive into the interface?
    fn keep(&self, sym: SymbolId, role: ScopeRole) -> bool {
        let symbol = self.src.symbol(sym);
        match role {
            ScopeRole::Module => match symbol {
                // types stay resolvable even when private
                Symbol::DerivedType(_) | Symbol::ClassType(_) => true,
                // importers re-resolve cross-module references themselves
                Symbol::ExternalSymbol(_) => false,
                other => other.access() != Access::Private,
            },
            // of a procedure only the signature survives: dummy arguments
            // and the return variable
            ScopeRole::Procedure => {
                matches!(symbol, Symbol::Variable(v) if v.intent != Intent::Local)
            }
            ScopeRole::Type => !matches!(symbol, Symbol::ExternalSymbol(_)),
        }
    }

    fn child_role(symbol: &Symbol) -> ScopeRole {
        match symbol {
            Symbol::DerivedType(_) | Symbol::ClassType(_) => ScopeRole::Type,
            _ => ScopeRole::Procedure,
        }
    }

    /// First pass: reserve an id for every kept symbol and a scope for
    /// every kept scope-owning symbol, so cyclic references remap freely
    /// in the second pass.
    fn plan_scope(&mut self, out: &mut Arena, src_scope: ScopeId, new_scope: ScopeId, role: ScopeRole) {
        let entries: Vec<SymbolId> = self.src.scope(src_scope).symbol_ids().collect();
        for sym in entries {
            if !self.keep(sym, role) {
                continue;
            }
            let new_id = out.reserve_symbol();
            self.symbol_map.insert(sym, new_id);
            if let Some(owned) = self.src.symbol(sym).symtab() {
                let new_owned = out.alloc_scope(Some(new_scope));
                self.scope_map.insert(owned, new_owned);
                let role = Self::child_role(self.src.symbol(sym));
                self.plan_scope(out, owned, new_owned, role);
            }
        }
    }

    /// Third pass: populate the projected scopes in source insertion
    /// order, which also fixes up parent and owner links.
    fn link_scope(&self, out: &mut Arena, src_scope: ScopeId) -> Result<(), AsrError> {
        let new_scope = self.scope_map[&src_scope];
        let entries: Vec<SymbolId> = self.src.scope(src_scope).symbol_ids().collect();
        for sym in entries {
            let Some(&new_sym) = self.symbol_map.get(&sym) else {
                continue;
            };
            out.insert(new_scope, new_sym)?;
            if let Some(owned) = self.src.symbol(sym).symtab() {
                self.link_scope(out, owned)?;
            }
        }
        Ok(())
    }

    fn map_symbol(&self, sym: SymbolId) -> Result<SymbolId, AsrError> {
        self.symbol_map
            .get(&sym)
            .copied()
            .ok_or_else(|| AsrError::UnresolvedName {
                name: self.src.symbol(sym).name().clone(),
            })
    }

    fn map_scope(&self, scope: ScopeId) -> Result<ScopeId, AsrError> {
        self.scope_map
            .get(&scope)
            .copied()
            .ok_or_else(|| AsrError::UnresolvedName {
                name: self
                    .src
                    .scope(scope)
                    .owner()
                    .map_or_else(|| Name::new_static("<scope>"), |owner| {
                        self.src.symbol(owner).name().clone()
                    }),
            })
    }

    fn project_symbol(&self, sym: SymbolId) -> Result<Symbol, AsrError> {
        match self.src.symbol(sym) {
            Symbol::Subroutine(s) => Ok(Symbol::Subroutine(SymbolSubroutine {
                name: s.name.clone(),
                symtab: self.map_scope(s.symtab)?,
                args: s
                    .args
                    .iter()
                    .map(|arg| self.map_symbol(*arg))
                    .collect::<Result<_, _>>()?,
                body: Vec::new(),
                abi: interface_abi(s.abi),
                access: s.access,
                deftype: Deftype::Interface,
                bindc_name: s.bindc_name.clone(),
            })),
            Symbol::Function(f) => Ok(Symbol::Function(SymbolFunction {
                name: f.name.clone(),
                symtab: self.map_scope(f.symtab)?,
                args: f
                    .args
                    .iter()
                    .map(|arg| self.map_symbol(*arg))
                    .collect::<Result<_, _>>()?,
                body: Vec::new(),
                return_var: self.map_symbol(f.return_var)?,
                abi: interface_abi(f.abi),
                access: f.access,
                deftype: Deftype::Interface,
                bindc_name: f.bindc_name.clone(),
            })),
            Symbol::GenericProcedure(g) => Ok(Symbol::GenericProcedure(SymbolGenericProcedure {
                parent_symtab: self.map_scope(g.parent_symtab)?,
                name: g.name.clone(),
                // retained with their surviving procedures only
                procs: g
                    .procs
                    .iter()
                    .filter_map(|proc| self.symbol_map.get(proc).copied())
                    .collect(),
                access: g.access,
            })),
            Symbol::CustomOperator(c) => Ok(Symbol::CustomOperator(SymbolCustomOperator {
                parent_symtab: self.map_scope(c.parent_symtab)?,
                name: c.name.clone(),
                procs: c
                    .procs
                    .iter()
                    .filter_map(|proc| self.symbol_map.get(proc).copied())
                    .collect(),
                access: c.access,
            })),
            Symbol::DerivedType(d) => Ok(Symbol::DerivedType(SymbolDerivedType {
                name: d.name.clone(),
                symtab: self.map_scope(d.symtab)?,
                members: d.members.clone(),
                abi: interface_abi(d.abi),
                access: d.access,
                parent: d.parent.map(|parent| self.map_symbol(parent)).transpose()?,
            })),
            Symbol::ClassType(c) => Ok(Symbol::ClassType(SymbolClassType {
                name: c.name.clone(),
                symtab: self.map_scope(c.symtab)?,
                abi: interface_abi(c.abi),
                access: c.access,
            })),
            Symbol::Variable(v) => Ok(Symbol::Variable(SymbolVariable {
                parent_symtab: self.map_scope(v.parent_symtab)?,
                name: v.name.clone(),
                intent: v.intent,
                symbolic_value: v
                    .symbolic_value
                    .as_ref()
                    .map(|value| self.project_expr(value))
                    .transpose()?,
                storage: v.storage,
                ttype: self.project_ttype(&v.ttype)?,
                abi: interface_abi(v.abi),
                access: v.access,
                presence: v.presence,
            })),
            Symbol::ClassProcedure(p) => Ok(Symbol::ClassProcedure(SymbolClassProcedure {
                parent_symtab: self.map_scope(p.parent_symtab)?,
                name: p.name.clone(),
                proc_name: p.proc_name.clone(),
                proc: self.map_symbol(p.proc)?,
                abi: interface_abi(p.abi),
            })),
            other => Err(AsrError::TypeMismatch {
                context: "interface projection",
                expected: "a module-resident symbol".to_owned(),
                found: other.name().to_string(),
            }),
        }
    }

    fn project_dims(&self, dims: &[Dimension]) -> Result<Vec<Dimension>, AsrError> {
        dims.iter()
            .map(|dim| {
                Ok(Dimension {
                    start: dim
                        .start
                        .as_ref()
                        .map(|expr| self.project_expr(expr))
                        .transpose()?,
                    end: dim
                        .end
                        .as_ref()
                        .map(|expr| self.project_expr(expr))
                        .transpose()?,
                })
            })
            .collect()
    }

    fn project_ttype(&self, ttype: &Ttype) -> Result<Ttype, AsrError> {
        use crate::nodes::{
            TtypeCharacter, TtypeClass, TtypeComplex, TtypeDerived, TtypeDict, TtypeInteger,
            TtypeList, TtypeLogical, TtypePointer, TtypeReal, TtypeSet, TtypeTuple,
        };
        Ok(match ttype {
            Ttype::Integer(t) => Ttype::Integer(TtypeInteger {
                kind: t.kind,
                dims: self.project_dims(&t.dims)?,
            }),
            Ttype::Real(t) => Ttype::Real(TtypeReal {
                kind: t.kind,
                dims: self.project_dims(&t.dims)?,
            }),
            Ttype::Complex(t) => Ttype::Complex(TtypeComplex {
                kind: t.kind,
                dims: self.project_dims(&t.dims)?,
            }),
            Ttype::Character(t) => Ttype::Character(TtypeCharacter {
                kind: t.kind,
                len: t.len,
                len_expr: t
                    .len_expr
                    .as_ref()
                    .map(|expr| self.project_expr(expr).map(Box::new))
                    .transpose()?,
                dims: self.project_dims(&t.dims)?,
            }),
            Ttype::Logical(t) => Ttype::Logical(TtypeLogical {
                kind: t.kind,
                dims: self.project_dims(&t.dims)?,
            }),
            Ttype::List(t) => Ttype::List(TtypeList {
                elem: Box::new(self.project_ttype(&t.elem)?),
            }),
            Ttype::Set(t) => Ttype::Set(TtypeSet {
                elem: Box::new(self.project_ttype(&t.elem)?),
            }),
            Ttype::Tuple(t) => Ttype::Tuple(TtypeTuple {
                elems: t
                    .elems
                    .iter()
                    .map(|elem| self.project_ttype(elem))
                    .collect::<Result<_, _>>()?,
            }),
            Ttype::Dict(t) => Ttype::Dict(TtypeDict {
                key: Box::new(self.project_ttype(&t.key)?),
                value: Box::new(self.project_ttype(&t.value)?),
            }),
            Ttype::Derived(t) => Ttype::Derived(TtypeDerived {
                symbol: self.map_symbol(t.symbol)?,
                dims: self.project_dims(&t.dims)?,
            }),
            Ttype::Class(t) => Ttype::Class(TtypeClass {
                symbol: self.map_symbol(t.symbol)?,
                dims: self.project_dims(&t.dims)?,
            }),
            Ttype::Pointer(t) => Ttype::Pointer(TtypePointer {
                target: Box::new(self.project_ttype(&t.target)?),
            }),
        })
    }

    fn project_opt_expr(&self, expr: &Option<Box<Expr>>) -> Result<Option<Box<Expr>>, AsrError> {
        expr.as_ref()
            .map(|expr| self.project_expr(expr).map(Box::new))
            .transpose()
    }

    fn project_expr(&self, expr: &Expr) -> Result<Expr, AsrError> {
        use crate::nodes::{
            ExprArrayRef, ExprBinOp, ExprBoolOp, ExprBozConstant, ExprCast, ExprCompare,
            ExprConstantComplex, ExprConstantInteger, ExprConstantLogical, ExprConstantReal,
            ExprConstantString, ExprDerivedRef, ExprFunctionCall, ExprStrOp, ExprUnaryOp, ExprVar,
        };
        Ok(match expr {
            Expr::BoolOp(e) => Expr::BoolOp(ExprBoolOp {
                left: Box::new(self.project_expr(&e.left)?),
                op: e.op,
                right: Box::new(self.project_expr(&e.right)?),
                ttype: self.project_ttype(&e.ttype)?,
                value: self.project_opt_expr(&e.value)?,
            }),
            Expr::BinOp(e) => Expr::BinOp(ExprBinOp {
                left: Box::new(self.project_expr(&e.left)?),
                op: e.op,
                right: Box::new(self.project_expr(&e.right)?),
                ttype: self.project_ttype(&e.ttype)?,
                value: self.project_opt_expr(&e.value)?,
                overloaded: self.project_opt_expr(&e.overloaded)?,
            }),
            Expr::UnaryOp(e) => Expr::UnaryOp(ExprUnaryOp {
                op: e.op,
                operand: Box::new(self.project_expr(&e.operand)?),
                ttype: self.project_ttype(&e.ttype)?,
                value: self.project_opt_expr(&e.value)?,
            }),
            Expr::StrOp(e) => Expr::StrOp(ExprStrOp {
                left: Box::new(self.project_expr(&e.left)?),
                op: e.op,
                right: Box::new(self.project_expr(&e.right)?),
                ttype: self.project_ttype(&e.ttype)?,
                value: self.project_opt_expr(&e.value)?,
                overloaded: self.project_opt_expr(&e.overloaded)?,
            }),
            Expr::Compare(e) => Expr::Compare(ExprCompare {
                left: Box::new(self.project_expr(&e.left)?),
                op: e.op,
                right: Box::new(self.project_expr(&e.right)?),
                ttype: self.project_ttype(&e.ttype)?,
                value: self.project_opt_expr(&e.value)?,
                overloaded: self.project_opt_expr(&e.overloaded)?,
            }),
            Expr::FunctionCall(e) => Expr::FunctionCall(ExprFunctionCall {
                name: self.map_symbol(e.name)?,
                // provenance only; dropped when the original did not survive
                original_name: e
                    .original_name
                    .and_then(|original| self.symbol_map.get(&original).copied()),
                args: e
                    .args
                    .iter()
                    .map(|arg| self.project_expr(arg))
                    .collect::<Result<_, _>>()?,
                ttype: self.project_ttype(&e.ttype)?,
                value: self.project_opt_expr(&e.value)?,
            }),
            Expr::Var(e) => Expr::Var(ExprVar {
                sym: self.map_symbol(e.sym)?,
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::ArrayRef(e) => Expr::ArrayRef(ExprArrayRef {
                sym: self.map_symbol(e.sym)?,
                indices: e
                    .indices
                    .iter()
                    .map(|index| {
                        Ok(ArrayIndex {
                            left: index
                                .left
                                .as_ref()
                                .map(|expr| self.project_expr(expr))
                                .transpose()?,
                            right: index
                                .right
                                .as_ref()
                                .map(|expr| self.project_expr(expr))
                                .transpose()?,
                            step: index
                                .step
                                .as_ref()
                                .map(|expr| self.project_expr(expr))
                                .transpose()?,
                        })
                    })
                    .collect::<Result<_, AsrError>>()?,
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::DerivedRef(e) => Expr::DerivedRef(ExprDerivedRef {
                target: Box::new(self.project_expr(&e.target)?),
                member: self.map_symbol(e.member)?,
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::Cast(e) => Expr::Cast(ExprCast {
                arg: Box::new(self.project_expr(&e.arg)?),
                kind: e.kind,
                ttype: self.project_ttype(&e.ttype)?,
                value: self.project_opt_expr(&e.value)?,
            }),
            Expr::ConstantInteger(e) => Expr::ConstantInteger(ExprConstantInteger {
                n: e.n,
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::ConstantReal(e) => Expr::ConstantReal(ExprConstantReal {
                r: e.r,
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::ConstantComplex(e) => Expr::ConstantComplex(ExprConstantComplex {
                re: e.re,
                im: e.im,
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::ConstantLogical(e) => Expr::ConstantLogical(ExprConstantLogical {
                b: e.b,
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::ConstantString(e) => Expr::ConstantString(ExprConstantString {
                s: e.s.clone(),
                ttype: self.project_ttype(&e.ttype)?,
            }),
            Expr::BozConstant(e) => Expr::BozConstant(ExprBozConstant {
                n: e.n,
                repr: e.repr,
                ttype: self.project_ttype(&e.ttype)?,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::UnitBuilder;
    use crate::compare::structurally_equal;
    use crate::nodes::{Presence, Stmt, StorageType};
    use crate::validate::validate;

    fn sample_module() -> (TranslationUnit, SymbolId) {
        let mut builder = UnitBuilder::new();
        let global = builder.global_scope();
        let mod_scope = builder.new_scope(global);

        let mut add_function = |builder: &mut UnitBuilder, name: &str, access: Access| {
            let fn_scope = builder.new_scope(mod_scope);
            let ret = builder
                .add_symbol(
                    fn_scope,
                    Symbol::Variable(SymbolVariable {
                        parent_symtab: fn_scope,
                        name: Name::new("r"),
                        intent: Intent::ReturnVar,
                        symbolic_value: None,
                        storage: StorageType::Default,
                        ttype: Ttype::integer(4),
                        abi: Abi::Source,
                        access: Access::Public,
                        presence: Presence::Required,
                    }),
                )
                .unwrap();
            builder
                .add_symbol(
                    mod_scope,
                    Symbol::Function(SymbolFunction {
                        name: Name::new(name),
                        symtab: fn_scope,
                        args: vec![],
                        body: vec![Stmt::Return],
                        return_var: ret,
                        abi: Abi::Source,
                        access,
                        deftype: Deftype::Implementation,
                        bindc_name: None,
                    }),
                )
                .unwrap()
        };

        add_function(&mut builder, "pub_fn", Access::Public);
        add_function(&mut builder, "priv_fn", Access::Private);

        let module = builder
            .add_symbol(
                global,
                Symbol::Module(SymbolModule {
                    name: Name::new("m"),
                    symtab: mod_scope,
                    dependencies: vec![],
                    loaded_from_mod: false,
                }),
            )
            .unwrap();
        let mut unit = builder.finish();
        unit.items.push(UnitItem::Symbol(module));
        (unit, module)
    }

    #[test]
    fn projection_drops_private_and_empties_bodies() {
        let (unit, module) = sample_module();
        let projected = module_interface(&unit, module).unwrap();
        assert_eq!(validate(&projected), vec![]);

        let new_module = projected
            .arena
            .lookup_local(projected.global_scope, "m")
            .unwrap();
        let Symbol::Module(m) = projected.arena.symbol(new_module) else {
            panic!("projection did not produce a module");
        };
        let scope = projected.arena.scope(m.symtab);
        assert_eq!(scope.len(), 1);

        let f = scope.get("pub_fn").unwrap();
        let Symbol::Function(f) = projected.arena.symbol(f) else {
            panic!("public function did not survive");
        };
        assert!(f.body.is_empty());
        assert_eq!(f.abi, Abi::LFortranModule);
        assert_eq!(f.deftype, Deftype::Interface);
    }

    #[test]
    fn projection_is_idempotent() {
        let (unit, module) = sample_module();
        let once = module_interface(&unit, module).unwrap();
        let module_again = once
            .arena
            .lookup_local(once.global_scope, "m")
            .unwrap();
        let twice = module_interface(&once, module_again).unwrap();

        assert!(structurally_equal(&once, &twice));
    }

    #[test]
    fn projection_rejects_non_modules() {
        let (unit, module) = sample_module();
        let Symbol::Module(m) = unit.arena.symbol(module) else {
            unreachable!();
        };
        let pub_fn = unit.arena.scope(m.symtab).get("pub_fn").unwrap();

        assert!(module_interface(&unit, pub_fn).is_err());
    }
}
