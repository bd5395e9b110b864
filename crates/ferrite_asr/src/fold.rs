//! The rewrite framework.
//!
//! A [`Fold`] consumes nodes and returns their replacements; the default
//! for every hook rebuilds the node around folded children, so an
//! identity-returning pass allocates no new arena slots. `fold_unit` is
//! the only way nodes held by the arena are rewritten: each symbol is
//! taken out, run through [`Fold::fold_symbol`], and swapped back with
//! [`crate::arena::Arena::replace_symbol`], which keeps mutation
//! single-writer.
//!
//! Replacements preserve field cardinality and type by construction: a
//! hook receives an `Expr` and must return an `Expr`.

use crate::nodes::{
    AllocArg, ArrayIndex, BinOp, BoolOp, CaseStmt, CmpOp, Dimension, DoLoopHead, Expr, ExprBinOp,
    ExprBoolOp, ExprCompare, ExprConstantInteger, ExprConstantLogical, ExprConstantReal, Stmt,
    StmtAssignment, StmtIf, StmtSelect, Symbol, SymbolFunction, SymbolProgram, SymbolSubroutine,
    SymbolVariable, Ttype, TranslationUnit, UnaryOp, UnitItem,
};

pub trait Fold {
    fn fold_expr(&mut self, expr: Expr) -> Expr
    where
        Self: Sized,
    {
        fold_expr(self, expr)
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Stmt
    where
        Self: Sized,
    {
        fold_stmt(self, stmt)
    }

    fn fold_ttype(&mut self, ttype: Ttype) -> Ttype
    where
        Self: Sized,
    {
        fold_ttype(self, ttype)
    }

    fn fold_symbol(&mut self, symbol: Symbol) -> Symbol
    where
        Self: Sized,
    {
        fold_symbol(self, symbol)
    }
}

fn fold_boxed<F: Fold>(folder: &mut F, expr: Box<Expr>) -> Box<Expr> {
    Box::new(folder.fold_expr(*expr))
}

fn fold_opt<F: Fold>(folder: &mut F, expr: Option<Expr>) -> Option<Expr> {
    expr.map(|expr| folder.fold_expr(expr))
}

fn fold_opt_boxed<F: Fold>(folder: &mut F, expr: Option<Box<Expr>>) -> Option<Box<Expr>> {
    expr.map(|expr| fold_boxed(folder, expr))
}

fn fold_exprs<F: Fold>(folder: &mut F, exprs: Vec<Expr>) -> Vec<Expr> {
    exprs.into_iter().map(|expr| folder.fold_expr(expr)).collect()
}

fn fold_stmts<F: Fold>(folder: &mut F, stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts.into_iter().map(|stmt| folder.fold_stmt(stmt)).collect()
}

fn fold_dims<F: Fold>(folder: &mut F, dims: Vec<Dimension>) -> Vec<Dimension> {
    dims.into_iter()
        .map(|dim| Dimension {
            start: fold_opt(folder, dim.start),
            end: fold_opt(folder, dim.end),
        })
        .collect()
}

/// Rebuilds `expr` around folded children; the default behavior of
/// [`Fold::fold_expr`].
pub fn fold_expr<F: Fold>(folder: &mut F, expr: Expr) -> Expr {
    match expr {
        Expr::BoolOp(e) => Expr::BoolOp(ExprBoolOp {
            left: fold_boxed(folder, e.left),
            op: e.op,
            right: fold_boxed(folder, e.right),
            ttype: folder.fold_ttype(e.ttype),
            value: fold_opt_boxed(folder, e.value),
        }),
        Expr::BinOp(e) => Expr::BinOp(ExprBinOp {
            left: fold_boxed(folder, e.left),
            op: e.op,
            right: fold_boxed(folder, e.right),
            ttype: folder.fold_ttype(e.ttype),
            value: fold_opt_boxed(folder, e.value),
            overloaded: fold_opt_boxed(folder, e.overloaded),
        }),
        Expr::UnaryOp(e) => Expr::UnaryOp(crate::nodes::ExprUnaryOp {
            op: e.op,
            operand: fold_boxed(folder, e.operand),
            ttype: folder.fold_ttype(e.ttype),
            value: fold_opt_boxed(folder, e.value),
        }),
        Expr::StrOp(e) => Expr::StrOp(crate::nodes::ExprStrOp {
            left: fold_boxed(folder, e.left),
            op: e.op,
            right: fold_boxed(folder, e.right),
            ttype: folder.fold_ttype(e.ttype),
            value: fold_opt_boxed(folder, e.value),
            overloaded: fold_opt_boxed(folder, e.overloaded),
        }),
        Expr::Compare(e) => Expr::Compare(ExprCompare {
            left: fold_boxed(folder, e.left),
            op: e.op,
            right: fold_boxed(folder, e.right),
            ttype: folder.fold_ttype(e.ttype),
            value: fold_opt_boxed(folder, e.value),
            overloaded: fold_opt_boxed(folder, e.overloaded),
        }),
        Expr::FunctionCall(e) => Expr::FunctionCall(crate::nodes::ExprFunctionCall {
            name: e.name,
            original_name: e.original_name,
            args: fold_exprs(folder, e.args),
            ttype: folder.fold_ttype(e.ttype),
            value: fold_opt_boxed(folder, e.value),
        }),
        Expr::Var(e) => Expr::Var(crate::nodes::ExprVar {
            sym: e.sym,
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::ArrayRef(e) => Expr::ArrayRef(crate::nodes::ExprArrayRef {
            sym: e.sym,
            indices: e
                .indices
                .into_iter()
                .map(|index| ArrayIndex {
                    left: fold_opt(folder, index.left),
                    right: fold_opt(folder, index.right),
                    step: fold_opt(folder, index.step),
                })
                .collect(),
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::DerivedRef(e) => Expr::DerivedRef(crate::nodes::ExprDerivedRef {
            target: fold_boxed(folder, e.target),
            member: e.member,
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::Cast(e) => Expr::Cast(crate::nodes::ExprCast {
            arg: fold_boxed(folder, e.arg),
            kind: e.kind,
            ttype: folder.fold_ttype(e.ttype),
            value: fold_opt_boxed(folder, e.value),
        }),
        Expr::ConstantInteger(e) => Expr::ConstantInteger(ExprConstantInteger {
            n: e.n,
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::ConstantReal(e) => Expr::ConstantReal(ExprConstantReal {
            r: e.r,
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::ConstantComplex(e) => Expr::ConstantComplex(crate::nodes::ExprConstantComplex {
            re: e.re,
            im: e.im,
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::ConstantLogical(e) => Expr::ConstantLogical(ExprConstantLogical {
            b: e.b,
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::ConstantString(e) => Expr::ConstantString(crate::nodes::ExprConstantString {
            s: e.s,
            ttype: folder.fold_ttype(e.ttype),
        }),
        Expr::BozConstant(e) => Expr::BozConstant(crate::nodes::ExprBozConstant {
            n: e.n,
            repr: e.repr,
            ttype: folder.fold_ttype(e.ttype),
        }),
    }
}

/// Rebuilds `stmt` around folded children; the default behavior of
/// [`Fold::fold_stmt`].
pub fn fold_stmt<F: Fold>(folder: &mut F, stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::Assignment(s) => Stmt::Assignment(StmtAssignment {
            target: folder.fold_expr(s.target),
            value: folder.fold_expr(s.value),
        }),
        Stmt::SubroutineCall(s) => Stmt::SubroutineCall(crate::nodes::StmtSubroutineCall {
            name: s.name,
            original_name: s.original_name,
            args: fold_exprs(folder, s.args),
        }),
        Stmt::If(s) => Stmt::If(StmtIf {
            test: folder.fold_expr(s.test),
            body: fold_stmts(folder, s.body),
            orelse: fold_stmts(folder, s.orelse),
        }),
        Stmt::WhileLoop(s) => Stmt::WhileLoop(crate::nodes::StmtWhileLoop {
            test: folder.fold_expr(s.test),
            body: fold_stmts(folder, s.body),
        }),
        Stmt::DoLoop(s) => Stmt::DoLoop(crate::nodes::StmtDoLoop {
            head: DoLoopHead {
                var: fold_opt(folder, s.head.var),
                start: fold_opt(folder, s.head.start),
                end: fold_opt(folder, s.head.end),
                increment: fold_opt(folder, s.head.increment),
            },
            body: fold_stmts(folder, s.body),
        }),
        Stmt::Select(s) => Stmt::Select(StmtSelect {
            test: folder.fold_expr(s.test),
            cases: s
                .cases
                .into_iter()
                .map(|case| CaseStmt {
                    conditions: fold_exprs(folder, case.conditions),
                    body: fold_stmts(folder, case.body),
                })
                .collect(),
            default: fold_stmts(folder, s.default),
        }),
        Stmt::Cycle => Stmt::Cycle,
        Stmt::Exit => Stmt::Exit,
        Stmt::Return => Stmt::Return,
        Stmt::Stop(s) => Stmt::Stop(crate::nodes::StmtStop {
            code: fold_opt(folder, s.code),
        }),
        Stmt::ErrorStop(s) => Stmt::ErrorStop(crate::nodes::StmtErrorStop {
            code: fold_opt(folder, s.code),
        }),
        Stmt::GoTo(s) => Stmt::GoTo(s),
        Stmt::GoToTarget(s) => Stmt::GoToTarget(s),
        Stmt::Print(s) => Stmt::Print(crate::nodes::StmtPrint {
            values: fold_exprs(folder, s.values),
        }),
        Stmt::FileOpen(s) => Stmt::FileOpen(crate::nodes::StmtFileOpen {
            unit: fold_opt(folder, s.unit),
            file: fold_opt(folder, s.file),
            status: fold_opt(folder, s.status),
        }),
        Stmt::FileClose(s) => Stmt::FileClose(crate::nodes::StmtFileClose {
            unit: fold_opt(folder, s.unit),
        }),
        Stmt::FileRead(s) => Stmt::FileRead(crate::nodes::StmtFileRead {
            unit: fold_opt(folder, s.unit),
            values: fold_exprs(folder, s.values),
        }),
        Stmt::FileWrite(s) => Stmt::FileWrite(crate::nodes::StmtFileWrite {
            unit: fold_opt(folder, s.unit),
            values: fold_exprs(folder, s.values),
        }),
        Stmt::FileInquire(s) => Stmt::FileInquire(crate::nodes::StmtFileInquire {
            unit: fold_opt(folder, s.unit),
            file: fold_opt(folder, s.file),
            exists: fold_opt(folder, s.exists),
        }),
        Stmt::FileRewind(s) => Stmt::FileRewind(crate::nodes::StmtFileRewind {
            unit: fold_opt(folder, s.unit),
        }),
        Stmt::FileFlush(s) => Stmt::FileFlush(crate::nodes::StmtFileFlush {
            unit: fold_opt(folder, s.unit),
        }),
        Stmt::Allocate(s) => Stmt::Allocate(crate::nodes::StmtAllocate {
            args: s
                .args
                .into_iter()
                .map(|arg| AllocArg {
                    sym: arg.sym,
                    dims: fold_dims(folder, arg.dims),
                })
                .collect(),
        }),
        Stmt::ExplicitDeallocate(s) => Stmt::ExplicitDeallocate(s),
        Stmt::ImplicitDeallocate(s) => Stmt::ImplicitDeallocate(s),
        Stmt::Nullify(s) => Stmt::Nullify(s),
        Stmt::Assert(s) => Stmt::Assert(crate::nodes::StmtAssert {
            test: folder.fold_expr(s.test),
            msg: fold_opt(folder, s.msg),
        }),
    }
}

/// Rebuilds `ttype` around folded children; the default behavior of
/// [`Fold::fold_ttype`].
pub fn fold_ttype<F: Fold>(folder: &mut F, ttype: Ttype) -> Ttype {
    match ttype {
        Ttype::Integer(t) => Ttype::Integer(crate::nodes::TtypeInteger {
            kind: t.kind,
            dims: fold_dims(folder, t.dims),
        }),
        Ttype::Real(t) => Ttype::Real(crate::nodes::TtypeReal {
            kind: t.kind,
            dims: fold_dims(folder, t.dims),
        }),
        Ttype::Complex(t) => Ttype::Complex(crate::nodes::TtypeComplex {
            kind: t.kind,
            dims: fold_dims(folder, t.dims),
        }),
        Ttype::Character(t) => Ttype::Character(crate::nodes::TtypeCharacter {
            kind: t.kind,
            len: t.len,
            len_expr: fold_opt_boxed(folder, t.len_expr),
            dims: fold_dims(folder, t.dims),
        }),
        Ttype::Logical(t) => Ttype::Logical(crate::nodes::TtypeLogical {
            kind: t.kind,
            dims: fold_dims(folder, t.dims),
        }),
        Ttype::List(t) => Ttype::List(crate::nodes::TtypeList {
            elem: Box::new(folder.fold_ttype(*t.elem)),
        }),
        Ttype::Set(t) => Ttype::Set(crate::nodes::TtypeSet {
            elem: Box::new(folder.fold_ttype(*t.elem)),
        }),
        Ttype::Tuple(t) => Ttype::Tuple(crate::nodes::TtypeTuple {
            elems: t
                .elems
                .into_iter()
                .map(|elem| folder.fold_ttype(elem))
                .collect(),
        }),
        Ttype::Dict(t) => Ttype::Dict(crate::nodes::TtypeDict {
            key: Box::new(folder.fold_ttype(*t.key)),
            value: Box::new(folder.fold_ttype(*t.value)),
        }),
        Ttype::Derived(t) => Ttype::Derived(crate::nodes::TtypeDerived {
            symbol: t.symbol,
            dims: fold_dims(folder, t.dims),
        }),
        Ttype::Class(t) => Ttype::Class(crate::nodes::TtypeClass {
            symbol: t.symbol,
            dims: fold_dims(folder, t.dims),
        }),
        Ttype::Pointer(t) => Ttype::Pointer(crate::nodes::TtypePointer {
            target: Box::new(folder.fold_ttype(*t.target)),
        }),
    }
}

/// Rebuilds a symbol around its folded owned subtrees: procedure bodies,
/// variable types and initializers. Scope and symbol handles pass through
/// untouched; the default behavior of [`Fold::fold_symbol`].
pub fn fold_symbol<F: Fold>(folder: &mut F, symbol: Symbol) -> Symbol {
    match symbol {
        Symbol::Program(p) => Symbol::Program(SymbolProgram {
            name: p.name,
            symtab: p.symtab,
            dependencies: p.dependencies,
            body: fold_stmts(folder, p.body),
        }),
        Symbol::Subroutine(s) => Symbol::Subroutine(SymbolSubroutine {
            name: s.name,
            symtab: s.symtab,
            args: s.args,
            body: fold_stmts(folder, s.body),
            abi: s.abi,
            access: s.access,
            deftype: s.deftype,
            bindc_name: s.bindc_name,
        }),
        Symbol::Function(f) => Symbol::Function(SymbolFunction {
            name: f.name,
            symtab: f.symtab,
            args: f.args,
            body: fold_stmts(folder, f.body),
            return_var: f.return_var,
            abi: f.abi,
            access: f.access,
            deftype: f.deftype,
            bindc_name: f.bindc_name,
        }),
        Symbol::Variable(v) => Symbol::Variable(SymbolVariable {
            parent_symtab: v.parent_symtab,
            name: v.name,
            intent: v.intent,
            symbolic_value: fold_opt(folder, v.symbolic_value),
            storage: v.storage,
            ttype: folder.fold_ttype(v.ttype),
            abi: v.abi,
            access: v.access,
            presence: v.presence,
        }),
        other => other,
    }
}

/// Runs `folder` over every owned subtree of the unit: top-level items and
/// every arena symbol. Each symbol's rewritten node is swapped back with
/// [`crate::arena::Arena::replace_symbol`], so the pass is the only writer
/// of what it rewrites.
pub fn fold_unit<F: Fold>(folder: &mut F, unit: &mut TranslationUnit) {
    let items = std::mem::take(&mut unit.items);
    unit.items = items
        .into_iter()
        .map(|item| match item {
            UnitItem::Symbol(sym) => UnitItem::Symbol(sym),
            UnitItem::Stmt(stmt) => UnitItem::Stmt(folder.fold_stmt(stmt)),
            UnitItem::Expr(expr) => UnitItem::Expr(folder.fold_expr(expr)),
        })
        .collect();

    let ids: Vec<_> = unit.arena.symbol_ids().collect();
    for id in ids {
        let symbol = unit.arena.symbol(id).clone();
        let folded = folder.fold_symbol(symbol);
        unit.arena.replace_symbol(id, folded);
    }
}

/// Attaches folded `value`s to operations over compile-time constants. The
/// in-tree exemplar pass: nodes that already carry a value, or whose
/// operands have none, come back unchanged.
#[derive(Debug, Default)]
pub struct ConstantFolder;

impl ConstantFolder {
    pub fn new() -> Self {
        Self
    }
}

impl Fold for ConstantFolder {
    fn fold_expr(&mut self, expr: Expr) -> Expr {
        // children first, so nested operations fold bottom-up
        let expr = fold_expr(self, expr);
        match expr {
            Expr::BinOp(mut e) => {
                if e.value.is_none() {
                    if let (Some(left), Some(right)) =
                        (e.left.compile_time_value(), e.right.compile_time_value())
                    {
                        if let Some(value) = eval_binop(e.op, left, right, &e.ttype) {
                            e.value = Some(Box::new(value));
                        }
                    }
                }
                Expr::BinOp(e)
            }
            Expr::Compare(mut e) => {
                if e.value.is_none() {
                    if let (Some(left), Some(right)) =
                        (e.left.compile_time_value(), e.right.compile_time_value())
                    {
                        if let Some(value) = eval_compare(e.op, left, right, &e.ttype) {
                            e.value = Some(Box::new(value));
                        }
                    }
                }
                Expr::Compare(e)
            }
            Expr::BoolOp(mut e) => {
                if e.value.is_none() {
                    if let (Some(left), Some(right)) =
                        (e.left.compile_time_value(), e.right.compile_time_value())
                    {
                        if let Some(value) = eval_boolop(e.op, left, right, &e.ttype) {
                            e.value = Some(Box::new(value));
                        }
                    }
                }
                Expr::BoolOp(e)
            }
            Expr::UnaryOp(mut e) => {
                if e.value.is_none() {
                    if let Some(operand) = e.operand.compile_time_value() {
                        if let Some(value) = eval_unaryop(e.op, operand, &e.ttype) {
                            e.value = Some(Box::new(value));
                        }
                    }
                }
                Expr::UnaryOp(e)
            }
            other => other,
        }
    }
}

fn eval_binop(op: BinOp, left: &Expr, right: &Expr, ttype: &Ttype) -> Option<Expr> {
    match (left, right) {
        (Expr::ConstantInteger(a), Expr::ConstantInteger(b)) => {
            let n = match op {
                BinOp::Add => a.n.checked_add(b.n)?,
                BinOp::Sub => a.n.checked_sub(b.n)?,
                BinOp::Mul => a.n.checked_mul(b.n)?,
                BinOp::Div => a.n.checked_div(b.n)?,
                BinOp::Pow => a.n.checked_pow(u32::try_from(b.n).ok()?)?,
            };
            Some(Expr::ConstantInteger(ExprConstantInteger {
                n,
                ttype: ttype.clone(),
            }))
        }
        (Expr::ConstantReal(a), Expr::ConstantReal(b)) => {
            let r = match op {
                BinOp::Add => a.r + b.r,
                BinOp::Sub => a.r - b.r,
                BinOp::Mul => a.r * b.r,
                BinOp::Div => a.r / b.r,
                BinOp::Pow => a.r.powf(b.r),
            };
            Some(Expr::ConstantReal(ExprConstantReal {
                r,
                ttype: ttype.clone(),
            }))
        }
        _ => None,
    }
}

fn eval_compare(op: CmpOp, left: &Expr, right: &Expr, ttype: &Ttype) -> Option<Expr> {
    let b = match (left, right) {
        (Expr::ConstantInteger(a), Expr::ConstantInteger(b)) => compare_with(op, &a.n, &b.n),
        (Expr::ConstantReal(a), Expr::ConstantReal(b)) => compare_with(op, &a.r, &b.r),
        (Expr::ConstantString(a), Expr::ConstantString(b)) => compare_with(op, &a.s, &b.s),
        (Expr::ConstantLogical(a), Expr::ConstantLogical(b)) => match op {
            CmpOp::Eq => a.b == b.b,
            CmpOp::NotEq => a.b != b.b,
            _ => return None,
        },
        _ => return None,
    };
    Some(Expr::ConstantLogical(ExprConstantLogical {
        b,
        ttype: ttype.clone(),
    }))
}

fn compare_with<T: PartialOrd>(op: CmpOp, left: &T, right: &T) -> bool {
    match op {
        CmpOp::Eq => left == right,
        CmpOp::NotEq => left != right,
        CmpOp::Lt => left < right,
        CmpOp::LtE => left <= right,
        CmpOp::Gt => left > right,
        CmpOp::GtE => left >= right,
    }
}

fn eval_boolop(op: BoolOp, left: &Expr, right: &Expr, ttype: &Ttype) -> Option<Expr> {
    let (Expr::ConstantLogical(a), Expr::ConstantLogical(b)) = (left, right) else {
        return None;
    };
    let b = match op {
        BoolOp::And => a.b && b.b,
        BoolOp::Or => a.b || b.b,
        BoolOp::Xor | BoolOp::NEqv => a.b != b.b,
        BoolOp::Eqv => a.b == b.b,
    };
    Some(Expr::ConstantLogical(ExprConstantLogical {
        b,
        ttype: ttype.clone(),
    }))
}

fn eval_unaryop(op: UnaryOp, operand: &Expr, ttype: &Ttype) -> Option<Expr> {
    match (op, operand) {
        (UnaryOp::Not, Expr::ConstantLogical(a)) => {
            Some(Expr::ConstantLogical(ExprConstantLogical {
                b: !a.b,
                ttype: ttype.clone(),
            }))
        }
        (UnaryOp::USub, Expr::ConstantInteger(a)) => {
            Some(Expr::ConstantInteger(ExprConstantInteger {
                n: a.n.checked_neg()?,
                ttype: ttype.clone(),
            }))
        }
        (UnaryOp::USub, Expr::ConstantReal(a)) => Some(Expr::ConstantReal(ExprConstantReal {
            r: -a.r,
            ttype: ttype.clone(),
        })),
        (UnaryOp::UAdd, Expr::ConstantInteger(a)) => {
            Some(Expr::ConstantInteger(ExprConstantInteger {
                n: a.n,
                ttype: ttype.clone(),
            }))
        }
        (UnaryOp::UAdd, Expr::ConstantReal(a)) => Some(Expr::ConstantReal(ExprConstantReal {
            r: a.r,
            ttype: ttype.clone(),
        })),
        (UnaryOp::Invert, Expr::ConstantInteger(a)) => {
            Some(Expr::ConstantInteger(ExprConstantInteger {
                n: !a.n,
                ttype: ttype.clone(),
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{binop, compare, constant_integer, constant_logical, constant_real};
    use crate::validate::validate;

    #[test]
    fn folds_integer_addition() {
        let expr = binop(
            constant_integer(2, 4),
            BinOp::Add,
            constant_integer(3, 4),
            Ttype::integer(4),
            None,
        )
        .unwrap();

        let folded = ConstantFolder::new().fold_expr(expr);
        assert_eq!(folded.value(), Some(&constant_integer(5, 4)));
    }

    #[test]
    fn folds_nested_operations_bottom_up() {
        let inner = binop(
            constant_integer(2, 4),
            BinOp::Mul,
            constant_integer(3, 4),
            Ttype::integer(4),
            None,
        )
        .unwrap();
        let outer = binop(
            inner,
            BinOp::Add,
            constant_integer(4, 4),
            Ttype::integer(4),
            None,
        )
        .unwrap();

        let folded = ConstantFolder::new().fold_expr(outer);
        assert_eq!(folded.value(), Some(&constant_integer(10, 4)));
    }

    #[test]
    fn folded_nodes_are_stable() {
        let expr = binop(
            constant_integer(2, 4),
            BinOp::Add,
            constant_integer(3, 4),
            Ttype::integer(4),
            None,
        )
        .unwrap();

        let mut folder = ConstantFolder::new();
        let once = folder.fold_expr(expr);
        let twice = folder.fold_expr(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn folds_comparisons_and_connectives() {
        let lt = compare(
            constant_integer(1, 4),
            CmpOp::Lt,
            constant_integer(2, 4),
            Ttype::logical(),
            None,
        )
        .unwrap();
        let folded = ConstantFolder::new().fold_expr(lt);
        assert_eq!(folded.value(), Some(&constant_logical(true)));

        let conj = crate::build::boolop(
            constant_logical(true),
            BoolOp::And,
            constant_logical(false),
            Ttype::logical(),
            None,
        )
        .unwrap();
        let folded = ConstantFolder::new().fold_expr(conj);
        assert_eq!(folded.value(), Some(&constant_logical(false)));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let expr = binop(
            constant_integer(1, 4),
            BinOp::Div,
            constant_integer(0, 4),
            Ttype::integer(4),
            None,
        )
        .unwrap();
        let folded = ConstantFolder::new().fold_expr(expr);
        assert_eq!(folded.value(), None);
    }

    #[test]
    fn folds_variable_initializers_in_place() {
        use crate::build::UnitBuilder;
        use crate::name::Name;
        use crate::nodes::{Abi, Access, Intent, Presence, StorageType};

        let mut builder = UnitBuilder::new();
        let global = builder.global_scope();
        let init = binop(
            constant_integer(2, 4),
            BinOp::Add,
            constant_integer(3, 4),
            Ttype::integer(4),
            None,
        )
        .unwrap();
        let x = builder
            .add_symbol(
                global,
                Symbol::Variable(SymbolVariable {
                    parent_symtab: global,
                    name: Name::new("x"),
                    intent: Intent::Local,
                    symbolic_value: Some(init),
                    storage: StorageType::Parameter,
                    ttype: Ttype::integer(4),
                    abi: Abi::Source,
                    access: Access::Public,
                    presence: Presence::Required,
                }),
            )
            .unwrap();
        let mut unit = builder.finish();

        fold_unit(&mut ConstantFolder::new(), &mut unit);
        assert_eq!(validate(&unit), vec![]);

        let Symbol::Variable(v) = unit.arena.symbol(x) else {
            panic!("variable changed kind");
        };
        assert_eq!(
            v.symbolic_value.as_ref().and_then(|value| value.value()),
            Some(&constant_integer(5, 4))
        );
    }

    #[test]
    fn folded_unit_stays_valid() {
        let mut unit = TranslationUnit::new();
        let expr = binop(
            constant_real(1.5, 8),
            BinOp::Mul,
            constant_real(2.0, 8),
            Ttype::real(8),
            None,
        )
        .unwrap();
        unit.items.push(UnitItem::Expr(expr));

        fold_unit(&mut ConstantFolder::new(), &mut unit);
        assert_eq!(validate(&unit), vec![]);

        let UnitItem::Expr(folded) = &unit.items[0] else {
            panic!("item changed kind");
        };
        assert_eq!(folded.value(), Some(&constant_real(3.0, 8)));
    }
}
