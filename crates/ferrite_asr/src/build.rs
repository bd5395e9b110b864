//! Typed constructors and the unit builder.
//!
//! The elaboration pass builds ASR through this module. Constructors check
//! the invariants that are cheap to check at the call site and return
//! [`AsrError`] at the offending call; everything else is deferred to
//! [`crate::validate`].

use crate::arena::{Arena, ScopeId, SymbolId};
use crate::error::AsrError;
use crate::nodes::{
    BinOp, BoolOp, CastKind, CmpOp, Expr, ExprBinOp, ExprBoolOp, ExprCast, ExprCompare,
    ExprConstantComplex, ExprConstantInteger, ExprConstantLogical, ExprConstantReal,
    ExprConstantString, ExprFunctionCall, ExprStrOp, ExprUnaryOp, ExprVar, StrOp, Stmt,
    StmtSubroutineCall, Symbol, Ttype, TranslationUnit, UnaryOp, UnitItem,
};
use crate::validate::{check_procedure, Violation};

fn type_name(ttype: &Ttype) -> String {
    format!("{ttype:?}")
}

fn mismatch(context: &'static str, expected: &Ttype, found: &Ttype) -> AsrError {
    AsrError::TypeMismatch {
        context,
        expected: type_name(expected),
        found: type_name(found),
    }
}

/// Checks that a folded `value` is a `Constant*` node of exactly the outer
/// type.
fn check_value(ttype: &Ttype, value: Option<&Expr>, context: &'static str) -> Result<(), AsrError> {
    let Some(value) = value else { return Ok(()) };
    if !value.is_constant() {
        return Err(AsrError::TypeMismatch {
            context,
            expected: "a Constant* node in the value slot".to_owned(),
            found: format!("{value:?}"),
        });
    }
    if value.ttype() != ttype {
        return Err(mismatch(context, ttype, value.ttype()));
    }
    Ok(())
}

pub fn constant_integer(n: i64, kind: u8) -> Expr {
    Expr::ConstantInteger(ExprConstantInteger {
        n,
        ttype: Ttype::integer(kind),
    })
}

pub fn constant_real(r: f64, kind: u8) -> Expr {
    Expr::ConstantReal(ExprConstantReal {
        r,
        ttype: Ttype::real(kind),
    })
}

pub fn constant_complex(re: f64, im: f64, kind: u8) -> Expr {
    Expr::ConstantComplex(ExprConstantComplex {
        re,
        im,
        ttype: Ttype::complex(kind),
    })
}

pub fn constant_logical(b: bool) -> Expr {
    Expr::ConstantLogical(ExprConstantLogical {
        b,
        ttype: Ttype::logical(),
    })
}

pub fn constant_string(s: impl Into<String>, kind: u8) -> Expr {
    let s = s.into();
    let len = s.len() as i64;
    Expr::ConstantString(ExprConstantString {
        s,
        ttype: Ttype::character(kind, len),
    })
}

/// A binary arithmetic operation. Operands and result must share a base
/// type; elaboration inserts casts before building the node.
pub fn binop(
    left: Expr,
    op: BinOp,
    right: Expr,
    ttype: Ttype,
    value: Option<Expr>,
) -> Result<Expr, AsrError> {
    for operand in [&left, &right] {
        if !operand.ttype().same_base(&ttype) {
            return Err(mismatch("binary operation operand", &ttype, operand.ttype()));
        }
    }
    check_value(&ttype, value.as_ref(), "binary operation value")?;
    Ok(Expr::BinOp(ExprBinOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
        ttype,
        value: value.map(Box::new),
        overloaded: None,
    }))
}

/// A logical connective; operands and result are `Logical`.
pub fn boolop(
    left: Expr,
    op: BoolOp,
    right: Expr,
    ttype: Ttype,
    value: Option<Expr>,
) -> Result<Expr, AsrError> {
    if !ttype.is_logical() {
        return Err(mismatch("logical operation result", &Ttype::logical(), &ttype));
    }
    for operand in [&left, &right] {
        if !operand.ttype().is_logical() {
            return Err(mismatch("logical operation operand", &ttype, operand.ttype()));
        }
    }
    check_value(&ttype, value.as_ref(), "logical operation value")?;
    Ok(Expr::BoolOp(ExprBoolOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
        ttype,
        value: value.map(Box::new),
    }))
}

pub fn unaryop(
    op: UnaryOp,
    operand: Expr,
    ttype: Ttype,
    value: Option<Expr>,
) -> Result<Expr, AsrError> {
    match op {
        UnaryOp::Not => {
            if !ttype.is_logical() || !operand.ttype().is_logical() {
                return Err(mismatch("logical negation", &Ttype::logical(), operand.ttype()));
            }
        }
        UnaryOp::USub | UnaryOp::UAdd | UnaryOp::Invert => {
            if !operand.ttype().same_base(&ttype) {
                return Err(mismatch("unary operation operand", &ttype, operand.ttype()));
            }
        }
    }
    check_value(&ttype, value.as_ref(), "unary operation value")?;
    Ok(Expr::UnaryOp(ExprUnaryOp {
        op,
        operand: Box::new(operand),
        ttype,
        value: value.map(Box::new),
    }))
}

/// A character operation; operands and result are `Character`.
pub fn strop(
    left: Expr,
    op: StrOp,
    right: Expr,
    ttype: Ttype,
    value: Option<Expr>,
) -> Result<Expr, AsrError> {
    if !ttype.is_character() {
        return Err(mismatch("character operation result", &Ttype::character(1, 0), &ttype));
    }
    if !left.ttype().is_character() {
        return Err(mismatch("character operation operand", &ttype, left.ttype()));
    }
    match op {
        StrOp::Concat => {
            if !right.ttype().is_character() {
                return Err(mismatch("character operation operand", &ttype, right.ttype()));
            }
        }
        // the repeat count is an integer
        StrOp::Repeat => {
            if !matches!(right.ttype(), Ttype::Integer(_)) {
                return Err(mismatch("repeat count", &Ttype::integer(4), right.ttype()));
            }
        }
    }
    check_value(&ttype, value.as_ref(), "character operation value")?;
    Ok(Expr::StrOp(ExprStrOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
        ttype,
        value: value.map(Box::new),
        overloaded: None,
    }))
}

/// A comparison; the result type must be `Logical` and the operands must
/// agree with each other.
pub fn compare(
    left: Expr,
    op: CmpOp,
    right: Expr,
    ttype: Ttype,
    value: Option<Expr>,
) -> Result<Expr, AsrError> {
    if !ttype.is_logical() {
        return Err(mismatch("comparison result", &Ttype::logical(), &ttype));
    }
    if !left.ttype().same_base(right.ttype()) {
        return Err(mismatch("comparison operand", left.ttype(), right.ttype()));
    }
    check_value(&ttype, value.as_ref(), "comparison value")?;
    Ok(Expr::Compare(ExprCompare {
        left: Box::new(left),
        op,
        right: Box::new(right),
        ttype,
        value: value.map(Box::new),
        overloaded: None,
    }))
}

fn cast_families(kind: CastKind) -> (&'static str, &'static str) {
    match kind {
        CastKind::RealToInteger => ("Real", "Integer"),
        CastKind::IntegerToReal => ("Integer", "Real"),
        CastKind::RealToReal => ("Real", "Real"),
        CastKind::IntegerToInteger => ("Integer", "Integer"),
        CastKind::RealToComplex => ("Real", "Complex"),
        CastKind::IntegerToComplex => ("Integer", "Complex"),
        CastKind::IntegerToLogical => ("Integer", "Logical"),
        CastKind::LogicalToReal => ("Logical", "Real"),
        CastKind::ComplexToComplex => ("Complex", "Complex"),
        CastKind::ComplexToReal => ("Complex", "Real"),
    }
}

fn family(ttype: &Ttype) -> &'static str {
    match ttype {
        Ttype::Integer(_) => "Integer",
        Ttype::Real(_) => "Real",
        Ttype::Complex(_) => "Complex",
        Ttype::Character(_) => "Character",
        Ttype::Logical(_) => "Logical",
        Ttype::List(_) => "List",
        Ttype::Set(_) => "Set",
        Ttype::Tuple(_) => "Tuple",
        Ttype::Dict(_) => "Dict",
        Ttype::Derived(_) => "Derived",
        Ttype::Class(_) => "Class",
        Ttype::Pointer(_) => "Pointer",
    }
}

/// A representation change; the cast kind must agree with both the operand
/// family and the result family.
pub fn cast(arg: Expr, kind: CastKind, ttype: Ttype, value: Option<Expr>) -> Result<Expr, AsrError> {
    let (from, to) = cast_families(kind);
    if family(arg.ttype()) != from {
        return Err(AsrError::TypeMismatch {
            context: "cast operand",
            expected: from.to_owned(),
            found: type_name(arg.ttype()),
        });
    }
    if family(&ttype) != to {
        return Err(AsrError::TypeMismatch {
            context: "cast result",
            expected: to.to_owned(),
            found: type_name(&ttype),
        });
    }
    check_value(&ttype, value.as_ref(), "cast value")?;
    Ok(Expr::Cast(ExprCast {
        arg: Box::new(arg),
        kind,
        ttype,
        value: value.map(Box::new),
    }))
}

fn callable(arena: &Arena, sym: SymbolId, context: &'static str) -> Result<(), AsrError> {
    match arena.symbol(sym) {
        Symbol::Function(_) | Symbol::Subroutine(_) | Symbol::ExternalSymbol(_) => Ok(()),
        other => Err(AsrError::TypeMismatch {
            context,
            expected: "a Function, Subroutine, or ExternalSymbol".to_owned(),
            found: other.name().to_string(),
        }),
    }
}

/// A resolved call in expression position. `name` must already point at a
/// concrete callable (overload resolution happened before this node is
/// built); `original_name` preserves the pre-resolution symbol.
pub fn function_call(
    arena: &Arena,
    name: SymbolId,
    original_name: Option<SymbolId>,
    args: Vec<Expr>,
    ttype: Ttype,
    value: Option<Expr>,
) -> Result<Expr, AsrError> {
    callable(arena, name, "function call target")?;
    check_value(&ttype, value.as_ref(), "function call value")?;
    Ok(Expr::FunctionCall(ExprFunctionCall {
        name,
        original_name,
        args,
        ttype,
        value: value.map(Box::new),
    }))
}

pub fn subroutine_call(
    arena: &Arena,
    name: SymbolId,
    original_name: Option<SymbolId>,
    args: Vec<Expr>,
) -> Result<Stmt, AsrError> {
    callable(arena, name, "subroutine call target")?;
    Ok(Stmt::SubroutineCall(StmtSubroutineCall {
        name,
        original_name,
        args,
    }))
}

/// A reference to a variable; the node's type is the variable's declared
/// type, read through an `ExternalSymbol` if need be.
pub fn var(arena: &Arena, sym: SymbolId) -> Result<Expr, AsrError> {
    let target = match arena.symbol(sym) {
        Symbol::ExternalSymbol(ext) => ext.external,
        _ => sym,
    };
    match arena.symbol(target) {
        Symbol::Variable(v) => Ok(Expr::Var(ExprVar {
            sym,
            ttype: v.ttype.clone(),
        })),
        other => Err(AsrError::TypeMismatch {
            context: "variable reference",
            expected: "a Variable".to_owned(),
            found: other.name().to_string(),
        }),
    }
}

/// Builds one translation unit for the elaboration pass: scope creation,
/// symbol insertion, and per-procedure finalization.
#[derive(Debug, Default)]
pub struct UnitBuilder {
    unit: TranslationUnit,
}

impl UnitBuilder {
    pub fn new() -> Self {
        Self {
            unit: TranslationUnit::new(),
        }
    }

    pub fn global_scope(&self) -> ScopeId {
        self.unit.global_scope
    }

    pub fn arena(&self) -> &Arena {
        &self.unit.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.unit.arena
    }

    /// Opens a child scope of `parent`, for a symbol about to be built.
    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.unit.arena.alloc_scope(Some(parent))
    }

    /// Allocates `symbol` and inserts it into `scope` under its own name.
    /// Fails without allocating if the name is already taken; shadowing
    /// requires a distinct child scope.
    pub fn add_symbol(&mut self, scope: ScopeId, symbol: Symbol) -> Result<SymbolId, AsrError> {
        if self.unit.arena.lookup_local(scope, symbol.name()).is_some() {
            return Err(AsrError::DuplicateName {
                scope,
                name: symbol.name().clone(),
            });
        }
        let id = self.unit.arena.alloc_symbol(symbol);
        self.unit.arena.insert(scope, id)?;
        Ok(id)
    }

    pub fn add_item(&mut self, item: UnitItem) {
        self.unit.items.push(item);
    }

    /// Finalizes a procedure-like symbol: checks GoTo/GoToTarget pairing
    /// and, for functions, the single-`ReturnVar` contract. All violations
    /// are reported, not just the first.
    pub fn finish_procedure(&self, sym: SymbolId) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        check_procedure(&self.unit.arena, sym, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn finish(self) -> TranslationUnit {
        self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Access, Intent, Presence, StorageType, SymbolVariable};
    use crate::name::Name;

    #[test]
    fn binop_rejects_mismatched_operand() {
        let err = binop(
            constant_integer(1, 4),
            BinOp::Add,
            constant_real(2.0, 8),
            Ttype::integer(4),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AsrError::TypeMismatch { .. }));
    }

    #[test]
    fn compare_requires_logical_result() {
        let err = compare(
            constant_integer(1, 4),
            CmpOp::Lt,
            constant_integer(2, 4),
            Ttype::integer(4),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AsrError::TypeMismatch { .. }));
    }

    #[test]
    fn value_must_be_constant_of_outer_type() {
        let bad = binop(
            constant_integer(2, 4),
            BinOp::Add,
            constant_integer(3, 4),
            Ttype::integer(4),
            Some(constant_integer(5, 8)),
        );
        assert!(bad.is_err());

        let good = binop(
            constant_integer(2, 4),
            BinOp::Add,
            constant_integer(3, 4),
            Ttype::integer(4),
            Some(constant_integer(5, 4)),
        );
        assert!(good.is_ok());
    }

    #[test]
    fn cast_kind_must_match_families() {
        let err = cast(
            constant_integer(1, 4),
            CastKind::RealToInteger,
            Ttype::integer(8),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AsrError::TypeMismatch { .. }));

        assert!(cast(
            constant_integer(1, 4),
            CastKind::IntegerToReal,
            Ttype::real(8),
            None,
        )
        .is_ok());
    }

    #[test]
    fn add_symbol_rejects_duplicates() {
        let mut builder = UnitBuilder::new();
        let global = builder.global_scope();
        let variable = |name: &str| {
            Symbol::Variable(SymbolVariable {
                parent_symtab: global,
                name: Name::new(name),
                intent: Intent::Local,
                symbolic_value: None,
                storage: StorageType::Default,
                ttype: Ttype::integer(4),
                abi: crate::nodes::Abi::Source,
                access: Access::Public,
                presence: Presence::Required,
            })
        };

        builder.add_symbol(global, variable("x")).unwrap();
        let err = builder.add_symbol(global, variable("x")).unwrap_err();
        assert!(matches!(err, AsrError::DuplicateName { .. }));
    }
}
