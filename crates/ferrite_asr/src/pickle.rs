//! The canonical textual form.
//!
//! Any subtree renders as parenthesized S-expressions: variant names in
//! PascalCase, fields in declared order, optionals elided when absent,
//! sequences in brackets, strings quoted, names bare. Symbol and scope
//! references render as ordinals assigned on first encounter, so two units
//! pickle identically exactly when they are structurally equal — the
//! pickle is both the diffable reference-test output and the basis of
//! [`crate::compare`].

use std::fmt::Write;

use rustc_hash::FxHashMap;

use crate::arena::{Arena, ScopeId, SymbolId};
use crate::nodes::{
    AllocArg, ArrayIndex, CaseStmt, Dimension, Expr, Stmt, Symbol, Ttype, TranslationUnit,
    UnitItem,
};

/// Renders a whole unit.
pub fn pickle(unit: &TranslationUnit) -> String {
    let mut pickler = Pickler::new(&unit.arena);
    pickler.unit(unit);
    pickler.buf
}

/// Renders one expression subtree.
pub fn pickle_expr(arena: &Arena, expr: &Expr) -> String {
    let mut pickler = Pickler::new(arena);
    pickler.expr(expr);
    pickler.buf
}

/// Renders one statement subtree.
pub fn pickle_stmt(arena: &Arena, stmt: &Stmt) -> String {
    let mut pickler = Pickler::new(arena);
    pickler.stmt(stmt);
    pickler.buf
}

/// Renders one type subtree.
pub fn pickle_ttype(arena: &Arena, ttype: &Ttype) -> String {
    let mut pickler = Pickler::new(arena);
    pickler.ttype(ttype);
    pickler.buf
}

/// Renders one symbol definition, including its owned scope.
pub fn pickle_symbol(arena: &Arena, sym: SymbolId) -> String {
    let mut pickler = Pickler::new(arena);
    pickler.symbol_def(sym);
    pickler.buf
}

struct Pickler<'a> {
    arena: &'a Arena,
    buf: String,
    symbol_ords: FxHashMap<SymbolId, u32>,
    scope_ords: FxHashMap<ScopeId, u32>,
}

impl<'a> Pickler<'a> {
    fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            buf: String::new(),
            symbol_ords: FxHashMap::default(),
            scope_ords: FxHashMap::default(),
        }
    }

    fn p(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn symbol_ord(&mut self, sym: SymbolId) -> u32 {
        let next = self.symbol_ords.len() as u32;
        *self.symbol_ords.entry(sym).or_insert(next)
    }

    fn scope_ord(&mut self, scope: ScopeId) -> u32 {
        let next = self.scope_ords.len() as u32;
        *self.scope_ords.entry(scope).or_insert(next)
    }

    fn symbol_ref(&mut self, sym: SymbolId) {
        let ord = self.symbol_ord(sym);
        let _ = write!(self.buf, "{ord}");
    }

    fn scope_ref(&mut self, scope: ScopeId) {
        let ord = self.scope_ord(scope);
        let _ = write!(self.buf, "{ord}");
    }

    fn unit(&mut self, unit: &TranslationUnit) {
        self.p("(TranslationUnit ");
        self.scope_def(unit.global_scope);
        self.p(" [");
        for (i, item) in unit.items.iter().enumerate() {
            if i > 0 {
                self.p(" ");
            }
            match item {
                UnitItem::Symbol(sym) => self.symbol_ref(*sym),
                UnitItem::Stmt(stmt) => self.stmt(stmt),
                UnitItem::Expr(expr) => self.expr(expr),
            }
        }
        self.p("])");
    }

    fn scope_def(&mut self, scope: ScopeId) {
        self.p("(SymbolTable ");
        self.scope_ref(scope);
        self.p(" {");
        let entries: Vec<(String, SymbolId)> = self
            .arena
            .scope(scope)
            .iter()
            .map(|(name, sym)| (name.as_str().to_owned(), sym))
            .collect();
        for (i, (name, sym)) in entries.iter().enumerate() {
            if i > 0 {
                self.p(", ");
            }
            let _ = write!(self.buf, "{name}: ");
            self.symbol_def(*sym);
        }
        self.p("})");
    }

    fn symbol_def(&mut self, sym: SymbolId) {
        // the ordinal exists before the contents render, so self-references
        // inside the definition resolve
        self.symbol_ord(sym);
        let symbol = self.arena.symbol(sym);
        match symbol {
            Symbol::Program(s) => {
                self.p("(Program ");
                self.p(&s.name);
                self.p(" ");
                self.scope_def(s.symtab);
                self.p(" [");
                for (i, dep) in s.dependencies.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.p(dep);
                }
                self.p("] ");
                self.stmt_list(&s.body);
                self.p(")");
            }
            Symbol::Module(s) => {
                self.p("(Module ");
                self.p(&s.name);
                self.p(" ");
                self.scope_def(s.symtab);
                self.p(" [");
                for (i, dep) in s.dependencies.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.p(dep);
                }
                self.p("] ");
                let _ = write!(self.buf, "{}", s.loaded_from_mod);
                self.p(")");
            }
            Symbol::Subroutine(s) => {
                self.p("(Subroutine ");
                self.p(&s.name);
                self.p(" ");
                self.scope_def(s.symtab);
                self.p(" ");
                self.symbol_ref_list(&s.args);
                self.p(" ");
                self.stmt_list(&s.body);
                let _ = write!(
                    self.buf,
                    " {} {} {}",
                    s.abi.as_str(),
                    s.access.as_str(),
                    s.deftype.as_str()
                );
                if let Some(bindc_name) = &s.bindc_name {
                    let _ = write!(self.buf, " {bindc_name:?}");
                }
                self.p(")");
            }
            Symbol::Function(s) => {
                self.p("(Function ");
                self.p(&s.name);
                self.p(" ");
                self.scope_def(s.symtab);
                self.p(" ");
                self.symbol_ref_list(&s.args);
                self.p(" ");
                self.stmt_list(&s.body);
                self.p(" ");
                self.symbol_ref(s.return_var);
                let _ = write!(
                    self.buf,
                    " {} {} {}",
                    s.abi.as_str(),
                    s.access.as_str(),
                    s.deftype.as_str()
                );
                if let Some(bindc_name) = &s.bindc_name {
                    let _ = write!(self.buf, " {bindc_name:?}");
                }
                self.p(")");
            }
            Symbol::GenericProcedure(s) => {
                self.p("(GenericProcedure ");
                self.scope_ref(s.parent_symtab);
                self.p(" ");
                self.p(&s.name);
                self.p(" ");
                self.symbol_ref_list(&s.procs);
                self.p(" ");
                self.p(s.access.as_str());
                self.p(")");
            }
            Symbol::CustomOperator(s) => {
                self.p("(CustomOperator ");
                self.scope_ref(s.parent_symtab);
                self.p(" ");
                self.p(&s.name);
                self.p(" ");
                self.symbol_ref_list(&s.procs);
                self.p(" ");
                self.p(s.access.as_str());
                self.p(")");
            }
            Symbol::ExternalSymbol(s) => {
                self.p("(ExternalSymbol ");
                self.scope_ref(s.parent_symtab);
                self.p(" ");
                self.p(&s.name);
                self.p(" ");
                self.symbol_ref(s.external);
                self.p(" ");
                self.p(&s.module_name);
                self.p(" [");
                for (i, scope_name) in s.scope_names.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.p(scope_name);
                }
                self.p("] ");
                self.p(&s.original_name);
                self.p(" ");
                self.p(s.access.as_str());
                self.p(")");
            }
            Symbol::DerivedType(s) => {
                self.p("(DerivedType ");
                self.p(&s.name);
                self.p(" ");
                self.scope_def(s.symtab);
                self.p(" [");
                for (i, member) in s.members.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.p(member);
                }
                self.p("] ");
                self.p(s.abi.as_str());
                self.p(" ");
                self.p(s.access.as_str());
                if let Some(parent) = s.parent {
                    self.p(" ");
                    self.symbol_ref(parent);
                }
                self.p(")");
            }
            Symbol::Variable(s) => {
                self.p("(Variable ");
                self.scope_ref(s.parent_symtab);
                self.p(" ");
                self.p(&s.name);
                self.p(" ");
                self.p(s.intent.as_str());
                if let Some(value) = &s.symbolic_value {
                    self.p(" ");
                    self.expr(value);
                }
                self.p(" ");
                self.p(s.storage.as_str());
                self.p(" ");
                self.ttype(&s.ttype);
                let _ = write!(
                    self.buf,
                    " {} {} {}",
                    s.abi.as_str(),
                    s.access.as_str(),
                    s.presence.as_str()
                );
                self.p(")");
            }
            Symbol::ClassType(s) => {
                self.p("(ClassType ");
                self.p(&s.name);
                self.p(" ");
                self.scope_def(s.symtab);
                self.p(" ");
                self.p(s.abi.as_str());
                self.p(" ");
                self.p(s.access.as_str());
                self.p(")");
            }
            Symbol::ClassProcedure(s) => {
                self.p("(ClassProcedure ");
                self.scope_ref(s.parent_symtab);
                self.p(" ");
                self.p(&s.name);
                self.p(" ");
                self.p(&s.proc_name);
                self.p(" ");
                self.symbol_ref(s.proc);
                self.p(" ");
                self.p(s.abi.as_str());
                self.p(")");
            }
        }
    }

    fn symbol_ref_list(&mut self, syms: &[SymbolId]) {
        self.p("[");
        for (i, sym) in syms.iter().enumerate() {
            if i > 0 {
                self.p(" ");
            }
            self.symbol_ref(*sym);
        }
        self.p("]");
    }

    fn stmt_list(&mut self, stmts: &[Stmt]) {
        self.p("[");
        for (i, stmt) in stmts.iter().enumerate() {
            if i > 0 {
                self.p(" ");
            }
            self.stmt(stmt);
        }
        self.p("]");
    }

    fn expr_list(&mut self, exprs: &[Expr]) {
        self.p("[");
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.p(" ");
            }
            self.expr(expr);
        }
        self.p("]");
    }

    fn opt_expr(&mut self, expr: Option<&Expr>) {
        if let Some(expr) = expr {
            self.p(" ");
            self.expr(expr);
        }
    }

    fn dims(&mut self, dims: &[Dimension]) {
        self.p("[");
        for (i, dim) in dims.iter().enumerate() {
            if i > 0 {
                self.p(" ");
            }
            self.p("(Dimension");
            self.opt_expr(dim.start.as_ref());
            self.opt_expr(dim.end.as_ref());
            self.p(")");
        }
        self.p("]");
    }

    fn ttype(&mut self, ttype: &Ttype) {
        match ttype {
            Ttype::Integer(t) => {
                let _ = write!(self.buf, "(Integer {} ", t.kind);
                self.dims(&t.dims);
                self.p(")");
            }
            Ttype::Real(t) => {
                let _ = write!(self.buf, "(Real {} ", t.kind);
                self.dims(&t.dims);
                self.p(")");
            }
            Ttype::Complex(t) => {
                let _ = write!(self.buf, "(Complex {} ", t.kind);
                self.dims(&t.dims);
                self.p(")");
            }
            Ttype::Character(t) => {
                let _ = write!(self.buf, "(Character {} {}", t.kind, t.len);
                self.opt_expr(t.len_expr.as_deref());
                self.p(" ");
                self.dims(&t.dims);
                self.p(")");
            }
            Ttype::Logical(t) => {
                let _ = write!(self.buf, "(Logical {} ", t.kind);
                self.dims(&t.dims);
                self.p(")");
            }
            Ttype::List(t) => {
                self.p("(List ");
                self.ttype(&t.elem);
                self.p(")");
            }
            Ttype::Set(t) => {
                self.p("(Set ");
                self.ttype(&t.elem);
                self.p(")");
            }
            Ttype::Tuple(t) => {
                self.p("(Tuple [");
                for (i, elem) in t.elems.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.ttype(elem);
                }
                self.p("])");
            }
            Ttype::Dict(t) => {
                self.p("(Dict ");
                self.ttype(&t.key);
                self.p(" ");
                self.ttype(&t.value);
                self.p(")");
            }
            Ttype::Derived(t) => {
                self.p("(Derived ");
                self.symbol_ref(t.symbol);
                self.p(" ");
                self.dims(&t.dims);
                self.p(")");
            }
            Ttype::Class(t) => {
                self.p("(Class ");
                self.symbol_ref(t.symbol);
                self.p(" ");
                self.dims(&t.dims);
                self.p(")");
            }
            Ttype::Pointer(t) => {
                self.p("(Pointer ");
                self.ttype(&t.target);
                self.p(")");
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::BoolOp(e) => {
                self.p("(BoolOp ");
                self.expr(&e.left);
                self.p(" ");
                self.p(e.op.as_str());
                self.p(" ");
                self.expr(&e.right);
                self.p(" ");
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.p(")");
            }
            Expr::BinOp(e) => {
                self.p("(BinOp ");
                self.expr(&e.left);
                self.p(" ");
                self.p(e.op.as_str());
                self.p(" ");
                self.expr(&e.right);
                self.p(" ");
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.opt_expr(e.overloaded.as_deref());
                self.p(")");
            }
            Expr::UnaryOp(e) => {
                self.p("(UnaryOp ");
                self.p(e.op.as_str());
                self.p(" ");
                self.expr(&e.operand);
                self.p(" ");
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.p(")");
            }
            Expr::StrOp(e) => {
                self.p("(StrOp ");
                self.expr(&e.left);
                self.p(" ");
                self.p(e.op.as_str());
                self.p(" ");
                self.expr(&e.right);
                self.p(" ");
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.opt_expr(e.overloaded.as_deref());
                self.p(")");
            }
            Expr::Compare(e) => {
                self.p("(Compare ");
                self.expr(&e.left);
                self.p(" ");
                self.p(e.op.as_str());
                self.p(" ");
                self.expr(&e.right);
                self.p(" ");
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.opt_expr(e.overloaded.as_deref());
                self.p(")");
            }
            Expr::FunctionCall(e) => {
                self.p("(FunctionCall ");
                self.symbol_ref(e.name);
                if let Some(original) = e.original_name {
                    self.p(" ");
                    self.symbol_ref(original);
                }
                self.p(" ");
                self.expr_list(&e.args);
                self.p(" ");
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.p(")");
            }
            Expr::Var(e) => {
                self.p("(Var ");
                self.symbol_ref(e.sym);
                self.p(" ");
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::ArrayRef(e) => {
                self.p("(ArrayRef ");
                self.symbol_ref(e.sym);
                self.p(" [");
                for (i, index) in e.indices.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.array_index(index);
                }
                self.p("] ");
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::DerivedRef(e) => {
                self.p("(DerivedRef ");
                self.expr(&e.target);
                self.p(" ");
                self.symbol_ref(e.member);
                self.p(" ");
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::Cast(e) => {
                self.p("(Cast ");
                self.expr(&e.arg);
                self.p(" ");
                self.p(e.kind.as_str());
                self.p(" ");
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.p(")");
            }
            Expr::ConstantInteger(e) => {
                let _ = write!(self.buf, "(ConstantInteger {} ", e.n);
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::ConstantReal(e) => {
                let _ = write!(self.buf, "(ConstantReal {:?} ", e.r);
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::ConstantComplex(e) => {
                let _ = write!(self.buf, "(ConstantComplex {:?} {:?} ", e.re, e.im);
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::ConstantLogical(e) => {
                let _ = write!(self.buf, "(ConstantLogical {} ", e.b);
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::ConstantString(e) => {
                let _ = write!(self.buf, "(ConstantString {:?} ", e.s);
                self.ttype(&e.ttype);
                self.p(")");
            }
            Expr::BozConstant(e) => {
                let _ = write!(self.buf, "(BozConstant {} {} ", e.n, e.repr.as_str());
                self.ttype(&e.ttype);
                self.p(")");
            }
        }
    }

    fn array_index(&mut self, index: &ArrayIndex) {
        self.p("(ArrayIndex");
        self.opt_expr(index.left.as_ref());
        self.opt_expr(index.right.as_ref());
        self.opt_expr(index.step.as_ref());
        self.p(")");
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assignment(s) => {
                self.p("(Assignment ");
                self.expr(&s.target);
                self.p(" ");
                self.expr(&s.value);
                self.p(")");
            }
            Stmt::SubroutineCall(s) => {
                self.p("(SubroutineCall ");
                self.symbol_ref(s.name);
                if let Some(original) = s.original_name {
                    self.p(" ");
                    self.symbol_ref(original);
                }
                self.p(" ");
                self.expr_list(&s.args);
                self.p(")");
            }
            Stmt::If(s) => {
                self.p("(If ");
                self.expr(&s.test);
                self.p(" ");
                self.stmt_list(&s.body);
                self.p(" ");
                self.stmt_list(&s.orelse);
                self.p(")");
            }
            Stmt::WhileLoop(s) => {
                self.p("(WhileLoop ");
                self.expr(&s.test);
                self.p(" ");
                self.stmt_list(&s.body);
                self.p(")");
            }
            Stmt::DoLoop(s) => {
                self.p("(DoLoop (DoLoopHead");
                self.opt_expr(s.head.var.as_ref());
                self.opt_expr(s.head.start.as_ref());
                self.opt_expr(s.head.end.as_ref());
                self.opt_expr(s.head.increment.as_ref());
                self.p(") ");
                self.stmt_list(&s.body);
                self.p(")");
            }
            Stmt::Select(s) => {
                self.p("(Select ");
                self.expr(&s.test);
                self.p(" [");
                for (i, case) in s.cases.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.case(case);
                }
                self.p("] ");
                self.stmt_list(&s.default);
                self.p(")");
            }
            Stmt::Cycle => self.p("(Cycle)"),
            Stmt::Exit => self.p("(Exit)"),
            Stmt::Return => self.p("(Return)"),
            Stmt::Stop(s) => {
                self.p("(Stop");
                self.opt_expr(s.code.as_ref());
                self.p(")");
            }
            Stmt::ErrorStop(s) => {
                self.p("(ErrorStop");
                self.opt_expr(s.code.as_ref());
                self.p(")");
            }
            Stmt::GoTo(s) => {
                let _ = write!(self.buf, "(GoTo {})", s.id);
            }
            Stmt::GoToTarget(s) => {
                let _ = write!(self.buf, "(GoToTarget {})", s.id);
            }
            Stmt::Print(s) => {
                self.p("(Print ");
                self.expr_list(&s.values);
                self.p(")");
            }
            Stmt::FileOpen(s) => {
                self.p("(FileOpen");
                self.opt_expr(s.unit.as_ref());
                self.opt_expr(s.file.as_ref());
                self.opt_expr(s.status.as_ref());
                self.p(")");
            }
            Stmt::FileClose(s) => {
                self.p("(FileClose");
                self.opt_expr(s.unit.as_ref());
                self.p(")");
            }
            Stmt::FileRead(s) => {
                self.p("(FileRead");
                self.opt_expr(s.unit.as_ref());
                self.p(" ");
                self.expr_list(&s.values);
                self.p(")");
            }
            Stmt::FileWrite(s) => {
                self.p("(FileWrite");
                self.opt_expr(s.unit.as_ref());
                self.p(" ");
                self.expr_list(&s.values);
                self.p(")");
            }
            Stmt::FileInquire(s) => {
                self.p("(FileInquire");
                self.opt_expr(s.unit.as_ref());
                self.opt_expr(s.file.as_ref());
                self.opt_expr(s.exists.as_ref());
                self.p(")");
            }
            Stmt::FileRewind(s) => {
                self.p("(FileRewind");
                self.opt_expr(s.unit.as_ref());
                self.p(")");
            }
            Stmt::FileFlush(s) => {
                self.p("(FileFlush");
                self.opt_expr(s.unit.as_ref());
                self.p(")");
            }
            Stmt::Allocate(s) => {
                self.p("(Allocate [");
                for (i, arg) in s.args.iter().enumerate() {
                    if i > 0 {
                        self.p(" ");
                    }
                    self.alloc_arg(arg);
                }
                self.p("])");
            }
            Stmt::ExplicitDeallocate(s) => {
                self.p("(ExplicitDeallocate ");
                self.symbol_ref_list(&s.syms);
                self.p(")");
            }
            Stmt::ImplicitDeallocate(s) => {
                self.p("(ImplicitDeallocate ");
                self.symbol_ref_list(&s.syms);
                self.p(")");
            }
            Stmt::Nullify(s) => {
                self.p("(Nullify ");
                self.symbol_ref_list(&s.syms);
                self.p(")");
            }
            Stmt::Assert(s) => {
                self.p("(Assert ");
                self.expr(&s.test);
                self.opt_expr(s.msg.as_ref());
                self.p(")");
            }
        }
    }

    fn case(&mut self, case: &CaseStmt) {
        self.p("(CaseStmt ");
        self.expr_list(&case.conditions);
        self.p(" ");
        self.stmt_list(&case.body);
        self.p(")");
    }

    fn alloc_arg(&mut self, arg: &AllocArg) {
        self.p("(AllocArg ");
        self.symbol_ref(arg.sym);
        self.p(" ");
        self.dims(&arg.dims);
        self.p(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{binop, constant_integer};
    use crate::nodes::BinOp;

    #[test]
    fn empty_unit_pickle() {
        let unit = TranslationUnit::new();
        insta::assert_snapshot!(pickle(&unit), @"(TranslationUnit (SymbolTable 0 {}) [])");
    }

    #[test]
    fn folded_binop_renders_fields_in_declared_order() {
        let arena = Arena::new();
        let expr = binop(
            constant_integer(2, 4),
            BinOp::Add,
            constant_integer(3, 4),
            crate::nodes::Ttype::integer(4),
            Some(constant_integer(5, 4)),
        )
        .unwrap();

        assert_eq!(
            pickle_expr(&arena, &expr),
            "(BinOp (ConstantInteger 2 (Integer 4 [])) Add (ConstantInteger 3 (Integer 4 [])) \
             (Integer 4 []) (ConstantInteger 5 (Integer 4 [])))"
        );
    }

    #[test]
    fn absent_optionals_are_elided() {
        let arena = Arena::new();
        let stmt = Stmt::Stop(crate::nodes::StmtStop { code: None });
        assert_eq!(pickle_stmt(&arena, &stmt), "(Stop)");

        let stmt = Stmt::Stop(crate::nodes::StmtStop {
            code: Some(constant_integer(1, 4)),
        });
        assert_eq!(
            pickle_stmt(&arena, &stmt),
            "(Stop (ConstantInteger 1 (Integer 4 [])))"
        );
    }
}
