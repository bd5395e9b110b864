//! Read-only traversal.
//!
//! Implementors override only the `visit_*` hooks they care about; the
//! default for every hook descends children in declared field order via
//! the matching `Traversal::walk_*` method. Overrides choose where to do
//! their work relative to the `walk_*` call, which gives both pre- and
//! post-order placement.
//!
//! Traversal descends through symbol tables and symbol references.
//! Symbols are shared (a `Var` mentions the same node its scope owns), so
//! the traversal keeps an identity set and visits every symbol exactly
//! once, in deterministic order.

use rustc_hash::FxHashSet;

use crate::arena::{Arena, ScopeId, SymbolId};
use crate::nodes::{Dimension, Expr, Stmt, Symbol, Ttype, TranslationUnit, UnitItem};

pub trait Visitor {
    fn visit_symbol(&mut self, traversal: &mut Traversal<'_>, id: SymbolId, symbol: &Symbol)
    where
        Self: Sized,
    {
        let _ = id;
        traversal.walk_symbol(self, symbol);
    }

    fn visit_stmt(&mut self, traversal: &mut Traversal<'_>, stmt: &Stmt)
    where
        Self: Sized,
    {
        traversal.walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, traversal: &mut Traversal<'_>, expr: &Expr)
    where
        Self: Sized,
    {
        traversal.walk_expr(self, expr);
    }

    fn visit_ttype(&mut self, traversal: &mut Traversal<'_>, ttype: &Ttype)
    where
        Self: Sized,
    {
        traversal.walk_ttype(self, ttype);
    }
}

/// Visits every node reachable from the unit exactly once.
pub fn visit_unit<V: Visitor>(visitor: &mut V, unit: &TranslationUnit) {
    Traversal::new(&unit.arena).walk_unit(visitor, unit);
}

/// Driver state of one traversal: the arena and the identity set guarding
/// shared symbols.
pub struct Traversal<'a> {
    arena: &'a Arena,
    seen: FxHashSet<SymbolId>,
}

impl<'a> Traversal<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            seen: FxHashSet::default(),
        }
    }

    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    pub fn walk_unit<V: Visitor>(&mut self, visitor: &mut V, unit: &TranslationUnit) {
        self.walk_scope(visitor, unit.global_scope);
        for item in &unit.items {
            match item {
                UnitItem::Symbol(id) => self.visit_symbol_id(visitor, *id),
                UnitItem::Stmt(stmt) => visitor.visit_stmt(self, stmt),
                UnitItem::Expr(expr) => visitor.visit_expr(self, expr),
            }
        }
    }

    /// Visits the symbols of `scope` in insertion order.
    pub fn walk_scope<V: Visitor>(&mut self, visitor: &mut V, scope: ScopeId) {
        let ids: Vec<SymbolId> = self.arena.scope(scope).symbol_ids().collect();
        for id in ids {
            self.visit_symbol_id(visitor, id);
        }
    }

    /// Visits a referenced symbol unless the identity set says it has been
    /// visited already.
    pub fn visit_symbol_id<V: Visitor>(&mut self, visitor: &mut V, id: SymbolId) {
        if self.seen.insert(id) {
            let symbol = self.arena.symbol(id);
            visitor.visit_symbol(self, id, symbol);
        }
    }

    pub fn walk_symbol<V: Visitor>(&mut self, visitor: &mut V, symbol: &Symbol) {
        match symbol {
            Symbol::Program(p) => {
                self.walk_scope(visitor, p.symtab);
                for stmt in &p.body {
                    visitor.visit_stmt(self, stmt);
                }
            }
            Symbol::Module(m) => self.walk_scope(visitor, m.symtab),
            Symbol::Subroutine(s) => {
                self.walk_scope(visitor, s.symtab);
                for stmt in &s.body {
                    visitor.visit_stmt(self, stmt);
                }
            }
            Symbol::Function(f) => {
                self.walk_scope(visitor, f.symtab);
                for stmt in &f.body {
                    visitor.visit_stmt(self, stmt);
                }
            }
            Symbol::GenericProcedure(g) => {
                for proc in &g.procs {
                    self.visit_symbol_id(visitor, *proc);
                }
            }
            Symbol::CustomOperator(c) => {
                for proc in &c.procs {
                    self.visit_symbol_id(visitor, *proc);
                }
            }
            Symbol::ExternalSymbol(ext) => self.visit_symbol_id(visitor, ext.external),
            Symbol::DerivedType(d) => {
                self.walk_scope(visitor, d.symtab);
                if let Some(parent) = d.parent {
                    self.visit_symbol_id(visitor, parent);
                }
            }
            Symbol::Variable(v) => {
                self.walk_ttype(visitor, &v.ttype);
                if let Some(value) = &v.symbolic_value {
                    visitor.visit_expr(self, value);
                }
            }
            Symbol::ClassType(c) => self.walk_scope(visitor, c.symtab),
            Symbol::ClassProcedure(p) => self.visit_symbol_id(visitor, p.proc),
        }
    }

    fn walk_dims<V: Visitor>(&mut self, visitor: &mut V, dims: &[Dimension]) {
        for dim in dims {
            if let Some(start) = &dim.start {
                visitor.visit_expr(self, start);
            }
            if let Some(end) = &dim.end {
                visitor.visit_expr(self, end);
            }
        }
    }

    pub fn walk_ttype<V: Visitor>(&mut self, visitor: &mut V, ttype: &Ttype) {
        match ttype {
            Ttype::Integer(t) => self.walk_dims(visitor, &t.dims),
            Ttype::Real(t) => self.walk_dims(visitor, &t.dims),
            Ttype::Complex(t) => self.walk_dims(visitor, &t.dims),
            Ttype::Logical(t) => self.walk_dims(visitor, &t.dims),
            Ttype::Character(t) => {
                if let Some(len_expr) = &t.len_expr {
                    visitor.visit_expr(self, len_expr);
                }
                self.walk_dims(visitor, &t.dims);
            }
            Ttype::List(t) => visitor.visit_ttype(self, &t.elem),
            Ttype::Set(t) => visitor.visit_ttype(self, &t.elem),
            Ttype::Tuple(t) => {
                for elem in &t.elems {
                    visitor.visit_ttype(self, elem);
                }
            }
            Ttype::Dict(t) => {
                visitor.visit_ttype(self, &t.key);
                visitor.visit_ttype(self, &t.value);
            }
            Ttype::Derived(t) => {
                self.visit_symbol_id(visitor, t.symbol);
                self.walk_dims(visitor, &t.dims);
            }
            Ttype::Class(t) => {
                self.visit_symbol_id(visitor, t.symbol);
                self.walk_dims(visitor, &t.dims);
            }
            Ttype::Pointer(t) => visitor.visit_ttype(self, &t.target),
        }
    }

    fn walk_opt_expr<V: Visitor>(&mut self, visitor: &mut V, expr: &Option<Expr>) {
        if let Some(expr) = expr {
            visitor.visit_expr(self, expr);
        }
    }

    pub fn walk_expr<V: Visitor>(&mut self, visitor: &mut V, expr: &Expr) {
        match expr {
            Expr::BoolOp(e) => {
                visitor.visit_expr(self, &e.left);
                visitor.visit_expr(self, &e.right);
                visitor.visit_ttype(self, &e.ttype);
                if let Some(value) = &e.value {
                    visitor.visit_expr(self, value);
                }
            }
            Expr::BinOp(e) => {
                visitor.visit_expr(self, &e.left);
                visitor.visit_expr(self, &e.right);
                visitor.visit_ttype(self, &e.ttype);
                if let Some(value) = &e.value {
                    visitor.visit_expr(self, value);
                }
                if let Some(overloaded) = &e.overloaded {
                    visitor.visit_expr(self, overloaded);
                }
            }
            Expr::UnaryOp(e) => {
                visitor.visit_expr(self, &e.operand);
                visitor.visit_ttype(self, &e.ttype);
                if let Some(value) = &e.value {
                    visitor.visit_expr(self, value);
                }
            }
            Expr::StrOp(e) => {
                visitor.visit_expr(self, &e.left);
                visitor.visit_expr(self, &e.right);
                visitor.visit_ttype(self, &e.ttype);
                if let Some(value) = &e.value {
                    visitor.visit_expr(self, value);
                }
                if let Some(overloaded) = &e.overloaded {
                    visitor.visit_expr(self, overloaded);
                }
            }
            Expr::Compare(e) => {
                visitor.visit_expr(self, &e.left);
                visitor.visit_expr(self, &e.right);
                visitor.visit_ttype(self, &e.ttype);
                if let Some(value) = &e.value {
                    visitor.visit_expr(self, value);
                }
                if let Some(overloaded) = &e.overloaded {
                    visitor.visit_expr(self, overloaded);
                }
            }
            Expr::FunctionCall(e) => {
                self.visit_symbol_id(visitor, e.name);
                if let Some(original) = e.original_name {
                    self.visit_symbol_id(visitor, original);
                }
                for arg in &e.args {
                    visitor.visit_expr(self, arg);
                }
                visitor.visit_ttype(self, &e.ttype);
                if let Some(value) = &e.value {
                    visitor.visit_expr(self, value);
                }
            }
            Expr::Var(e) => {
                self.visit_symbol_id(visitor, e.sym);
                visitor.visit_ttype(self, &e.ttype);
            }
            Expr::ArrayRef(e) => {
                self.visit_symbol_id(visitor, e.sym);
                for index in &e.indices {
                    self.walk_opt_expr(visitor, &index.left);
                    self.walk_opt_expr(visitor, &index.right);
                    self.walk_opt_expr(visitor, &index.step);
                }
                visitor.visit_ttype(self, &e.ttype);
            }
            Expr::DerivedRef(e) => {
                visitor.visit_expr(self, &e.target);
                self.visit_symbol_id(visitor, e.member);
                visitor.visit_ttype(self, &e.ttype);
            }
            Expr::Cast(e) => {
                visitor.visit_expr(self, &e.arg);
                visitor.visit_ttype(self, &e.ttype);
                if let Some(value) = &e.value {
                    visitor.visit_expr(self, value);
                }
            }
            Expr::ConstantInteger(e) => visitor.visit_ttype(self, &e.ttype),
            Expr::ConstantReal(e) => visitor.visit_ttype(self, &e.ttype),
            Expr::ConstantComplex(e) => visitor.visit_ttype(self, &e.ttype),
            Expr::ConstantLogical(e) => visitor.visit_ttype(self, &e.ttype),
            Expr::ConstantString(e) => visitor.visit_ttype(self, &e.ttype),
            Expr::BozConstant(e) => visitor.visit_ttype(self, &e.ttype),
        }
    }

    pub fn walk_stmt<V: Visitor>(&mut self, visitor: &mut V, stmt: &Stmt) {
        match stmt {
            Stmt::Assignment(s) => {
                visitor.visit_expr(self, &s.target);
                visitor.visit_expr(self, &s.value);
            }
            Stmt::SubroutineCall(s) => {
                self.visit_symbol_id(visitor, s.name);
                if let Some(original) = s.original_name {
                    self.visit_symbol_id(visitor, original);
                }
                for arg in &s.args {
                    visitor.visit_expr(self, arg);
                }
            }
            Stmt::If(s) => {
                visitor.visit_expr(self, &s.test);
                for stmt in s.body.iter().chain(&s.orelse) {
                    visitor.visit_stmt(self, stmt);
                }
            }
            Stmt::WhileLoop(s) => {
                visitor.visit_expr(self, &s.test);
                for stmt in &s.body {
                    visitor.visit_stmt(self, stmt);
                }
            }
            Stmt::DoLoop(s) => {
                self.walk_opt_expr(visitor, &s.head.var);
                self.walk_opt_expr(visitor, &s.head.start);
                self.walk_opt_expr(visitor, &s.head.end);
                self.walk_opt_expr(visitor, &s.head.increment);
                for stmt in &s.body {
                    visitor.visit_stmt(self, stmt);
                }
            }
            Stmt::Select(s) => {
                visitor.visit_expr(self, &s.test);
                for case in &s.cases {
                    for condition in &case.conditions {
                        visitor.visit_expr(self, condition);
                    }
                    for stmt in &case.body {
                        visitor.visit_stmt(self, stmt);
                    }
                }
                for stmt in &s.default {
                    visitor.visit_stmt(self, stmt);
                }
            }
            Stmt::Cycle | Stmt::Exit | Stmt::Return | Stmt::GoTo(_) | Stmt::GoToTarget(_) => {}
            Stmt::Stop(s) => self.walk_opt_expr(visitor, &s.code),
            Stmt::ErrorStop(s) => self.walk_opt_expr(visitor, &s.code),
            Stmt::Print(s) => {
                for value in &s.values {
                    visitor.visit_expr(self, value);
                }
            }
            Stmt::FileOpen(s) => {
                self.walk_opt_expr(visitor, &s.unit);
                self.walk_opt_expr(visitor, &s.file);
                self.walk_opt_expr(visitor, &s.status);
            }
            Stmt::FileClose(s) => self.walk_opt_expr(visitor, &s.unit),
            Stmt::FileRead(s) => {
                self.walk_opt_expr(visitor, &s.unit);
                for value in &s.values {
                    visitor.visit_expr(self, value);
                }
            }
            Stmt::FileWrite(s) => {
                self.walk_opt_expr(visitor, &s.unit);
                for value in &s.values {
                    visitor.visit_expr(self, value);
                }
            }
            Stmt::FileInquire(s) => {
                self.walk_opt_expr(visitor, &s.unit);
                self.walk_opt_expr(visitor, &s.file);
                self.walk_opt_expr(visitor, &s.exists);
            }
            Stmt::FileRewind(s) => self.walk_opt_expr(visitor, &s.unit),
            Stmt::FileFlush(s) => self.walk_opt_expr(visitor, &s.unit),
            Stmt::Allocate(s) => {
                for arg in &s.args {
                    self.visit_symbol_id(visitor, arg.sym);
                    self.walk_dims(visitor, &arg.dims);
                }
            }
            Stmt::ExplicitDeallocate(s) => {
                for sym in &s.syms {
                    self.visit_symbol_id(visitor, *sym);
                }
            }
            Stmt::ImplicitDeallocate(s) => {
                for sym in &s.syms {
                    self.visit_symbol_id(visitor, *sym);
                }
            }
            Stmt::Nullify(s) => {
                for sym in &s.syms {
                    self.visit_symbol_id(visitor, *sym);
                }
            }
            Stmt::Assert(s) => {
                visitor.visit_expr(self, &s.test);
                self.walk_opt_expr(visitor, &s.msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{constant_integer, var, UnitBuilder};
    use crate::name::Name;
    use crate::nodes::{
        Abi, Access, Deftype, Intent, Presence, StmtAssignment, StorageType, SymbolFunction,
        SymbolVariable,
    };

    #[derive(Default)]
    struct Counter {
        symbols: usize,
        exprs: usize,
        stmts: usize,
    }

    impl Visitor for Counter {
        fn visit_symbol(&mut self, traversal: &mut Traversal<'_>, _id: SymbolId, symbol: &Symbol) {
            self.symbols += 1;
            traversal.walk_symbol(self, symbol);
        }

        fn visit_expr(&mut self, traversal: &mut Traversal<'_>, expr: &Expr) {
            self.exprs += 1;
            traversal.walk_expr(self, expr);
        }

        fn visit_stmt(&mut self, traversal: &mut Traversal<'_>, stmt: &Stmt) {
            self.stmts += 1;
            traversal.walk_stmt(self, stmt);
        }
    }

    #[test]
    fn shared_symbols_are_visited_once() {
        let mut builder = UnitBuilder::new();
        let global = builder.global_scope();
        let fn_scope = builder.new_scope(global);
        let ret = builder
            .add_symbol(
                fn_scope,
                Symbol::Variable(SymbolVariable {
                    parent_symtab: fn_scope,
                    name: Name::new("r"),
                    intent: Intent::ReturnVar,
                    symbolic_value: None,
                    storage: StorageType::Default,
                    ttype: crate::nodes::Ttype::integer(4),
                    abi: Abi::Source,
                    access: Access::Public,
                    presence: Presence::Required,
                }),
            )
            .unwrap();
        // the body mentions `r` twice; the scope mentions it once more
        let target = var(builder.arena(), ret).unwrap();
        let value = var(builder.arena(), ret).unwrap();
        builder
            .add_symbol(
                global,
                Symbol::Function(SymbolFunction {
                    name: Name::new("f"),
                    symtab: fn_scope,
                    args: vec![],
                    body: vec![
                        Stmt::Assignment(StmtAssignment { target, value }),
                        Stmt::Return,
                    ],
                    return_var: ret,
                    abi: Abi::Source,
                    access: Access::Public,
                    deftype: Deftype::Implementation,
                    bindc_name: None,
                }),
            )
            .unwrap();
        let unit = builder.finish();

        let mut counter = Counter::default();
        visit_unit(&mut counter, &unit);

        // `f` and `r`, each exactly once despite the three mentions of `r`
        assert_eq!(counter.symbols, 2);
        assert_eq!(counter.stmts, 2);
        assert_eq!(counter.exprs, 2);
    }

    #[test]
    fn items_are_walked_in_order() {
        let mut unit = crate::nodes::TranslationUnit::new();
        unit.items
            .push(UnitItem::Expr(constant_integer(1, 4)));
        unit.items
            .push(UnitItem::Expr(constant_integer(2, 4)));

        let mut counter = Counter::default();
        visit_unit(&mut counter, &unit);
        assert_eq!(counter.exprs, 2);
    }
}
