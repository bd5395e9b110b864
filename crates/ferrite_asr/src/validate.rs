//! Whole-tree invariant checking.
//!
//! `validate` traverses a complete unit and reports *all* violations it
//! finds; it never aborts at the first. Builders call the cheap checks at
//! construction time, so a unit that went through `crate::build` normally
//! validates clean; this pass is the backstop transformer passes and
//! deserialized units are held to.

use rustc_hash::FxHashSet;

use crate::arena::{Arena, ScopeId, SymbolId};
use crate::nodes::{
    Dimension, Expr, Intent, Stmt, Symbol, SymbolFunction, Ttype, TranslationUnit, UnitItem,
    CHARACTER_LEN_RUNTIME,
};

/// The invariant family a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// A symbol reference that neither resolves by walking parent scopes
    /// nor goes through an `ExternalSymbol`.
    Reference,
    /// An expression type inconsistent with its node kind.
    ExprType,
    /// A folded `value` that is not a `Constant*` node of the outer type.
    Value,
    /// A function without exactly one `ReturnVar` matching `return_var`.
    ReturnVar,
    /// ABI/deftype/body disagreement.
    AbiBody,
    /// A `GoTo` without a matching `GoToTarget`, or a duplicated target.
    GoTo,
    /// A `DerivedType.parent` that is not a derived type.
    DerivedParent,
    /// A scope that is its own ancestor.
    ScopeForest,
    /// An `ExternalSymbol` whose declared path does not locate its target.
    ExternalPath,
    /// A malformed type: bad character length sentinel, pointer of pointer.
    TypeShape,
    /// Broken navigation links or an ill-kinded member set.
    SymbolLinks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Checks every invariant of the data model over the whole unit.
pub fn validate(unit: &TranslationUnit) -> Vec<Violation> {
    let mut checker = Checker {
        arena: &unit.arena,
        global_scope: unit.global_scope,
        out: Vec::new(),
    };
    checker.check_scope_forest();
    checker.check_scope_tree(unit.global_scope);
    for item in &unit.items {
        match item {
            UnitItem::Symbol(_) => {}
            UnitItem::Stmt(stmt) => checker.check_stmt(stmt, unit.global_scope),
            UnitItem::Expr(expr) => checker.check_expr(expr, unit.global_scope),
        }
    }
    if !checker.out.is_empty() {
        tracing::debug!(violations = checker.out.len(), "unit failed validation");
    }
    checker.out
}

/// Finalization checks for one procedure-like symbol: GoTo pairing plus,
/// for functions, the `ReturnVar` contract and ABI/body agreement.
pub(crate) fn check_procedure(arena: &Arena, sym: SymbolId, out: &mut Vec<Violation>) {
    match arena.symbol(sym) {
        Symbol::Function(f) => {
            check_return_var(arena, f, out);
            check_abi_body(arena, sym, out);
            check_gotos(arena, sym, out);
        }
        Symbol::Subroutine(_) | Symbol::Program(_) => {
            check_abi_body(arena, sym, out);
            check_gotos(arena, sym, out);
        }
        other => out.push(Violation::new(
            ViolationKind::SymbolLinks,
            format!("`{}` is not procedure-like and cannot be finalized", other.name()),
        )),
    }
}

fn procedure_body(symbol: &Symbol) -> &[Stmt] {
    match symbol {
        Symbol::Program(p) => &p.body,
        Symbol::Subroutine(s) => &s.body,
        Symbol::Function(f) => &f.body,
        _ => &[],
    }
}

fn check_return_var(arena: &Arena, f: &SymbolFunction, out: &mut Vec<Violation>) {
    let return_vars: Vec<SymbolId> = arena
        .scope(f.symtab)
        .symbol_ids()
        .filter(|id| {
            matches!(arena.symbol(*id), Symbol::Variable(v) if v.intent == Intent::ReturnVar)
        })
        .collect();
    match return_vars.as_slice() {
        [] => out.push(Violation::new(
            ViolationKind::ReturnVar,
            format!("function `{}` has no ReturnVar variable", f.name),
        )),
        [single] => {
            if *single != f.return_var {
                out.push(Violation::new(
                    ViolationKind::ReturnVar,
                    format!(
                        "function `{}` return_var does not name its ReturnVar variable",
                        f.name
                    ),
                ));
            }
        }
        _ => out.push(Violation::new(
            ViolationKind::ReturnVar,
            format!("function `{}` has multiple ReturnVar variables", f.name),
        )),
    }
}

fn check_abi_body(arena: &Arena, sym: SymbolId, out: &mut Vec<Violation>) {
    use crate::nodes::{Abi, Deftype};

    let symbol = arena.symbol(sym);
    let (abi, deftype) = match symbol {
        Symbol::Subroutine(s) => (s.abi, s.deftype),
        Symbol::Function(f) => (f.abi, f.deftype),
        _ => return,
    };
    let body = procedure_body(symbol);
    if abi == Abi::Source && (deftype != Deftype::Implementation || body.is_empty()) {
        out.push(Violation::new(
            ViolationKind::AbiBody,
            format!(
                "`{}` has abi Source but is not a non-empty Implementation",
                symbol.name()
            ),
        ));
    }
    if deftype == Deftype::Interface && !body.is_empty() {
        out.push(Violation::new(
            ViolationKind::AbiBody,
            format!("`{}` is an Interface but has a body", symbol.name()),
        ));
    }
}

fn collect_labels(body: &[Stmt], gotos: &mut Vec<u64>, targets: &mut Vec<u64>) {
    for stmt in body {
        match stmt {
            Stmt::GoTo(g) => gotos.push(g.id),
            Stmt::GoToTarget(t) => targets.push(t.id),
            Stmt::If(s) => {
                collect_labels(&s.body, gotos, targets);
                collect_labels(&s.orelse, gotos, targets);
            }
            Stmt::WhileLoop(s) => collect_labels(&s.body, gotos, targets),
            Stmt::DoLoop(s) => collect_labels(&s.body, gotos, targets),
            Stmt::Select(s) => {
                for case in &s.cases {
                    collect_labels(&case.body, gotos, targets);
                }
                collect_labels(&s.default, gotos, targets);
            }
            _ => {}
        }
    }
}

fn check_gotos(arena: &Arena, sym: SymbolId, out: &mut Vec<Violation>) {
    let symbol = arena.symbol(sym);
    let mut gotos = Vec::new();
    let mut targets = Vec::new();
    collect_labels(procedure_body(symbol), &mut gotos, &mut targets);

    for id in &gotos {
        if !targets.contains(id) {
            out.push(Violation::new(
                ViolationKind::GoTo,
                format!(
                    "GoTo({id}) in `{}` has no matching GoToTarget",
                    symbol.name()
                ),
            ));
        }
    }
    let mut seen = FxHashSet::default();
    for id in &targets {
        if !seen.insert(*id) {
            out.push(Violation::new(
                ViolationKind::GoTo,
                format!("duplicate GoToTarget({id}) in `{}`", symbol.name()),
            ));
        }
    }
}

struct Checker<'a> {
    arena: &'a Arena,
    global_scope: ScopeId,
    out: Vec<Violation>,
}

impl Checker<'_> {
    fn push(&mut self, kind: ViolationKind, message: impl Into<String>) {
        self.out.push(Violation::new(kind, message));
    }

    /// Parent walk bounded by the scope count, so a cyclic parent chain
    /// cannot hang the remaining checks.
    fn bounded_ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        self.arena.ancestors(scope).take(self.arena.num_scopes() + 1)
    }

    fn check_scope_forest(&mut self) {
        for scope in self.arena.scope_ids() {
            let mut seen = FxHashSet::default();
            let ancestors: Vec<ScopeId> = self.bounded_ancestors(scope).collect();
            for ancestor in ancestors {
                if !seen.insert(ancestor) {
                    self.push(
                        ViolationKind::ScopeForest,
                        format!("scope {scope:?} is its own ancestor"),
                    );
                    break;
                }
            }
        }
    }

    fn check_scope_tree(&mut self, scope: ScopeId) {
        let entries: Vec<(String, SymbolId)> = self
            .arena
            .scope(scope)
            .iter()
            .map(|(name, id)| (name.as_str().to_owned(), id))
            .collect();
        for (key, sym) in entries {
            if self.arena.symbol(sym).name() != key.as_str() {
                self.push(
                    ViolationKind::SymbolLinks,
                    format!(
                        "scope entry `{key}` names a symbol called `{}`",
                        self.arena.symbol(sym).name()
                    ),
                );
            }
            self.check_symbol(scope, sym);
        }
    }

    fn check_symbol(&mut self, scope: ScopeId, sym: SymbolId) {
        match self.arena.symbol(sym) {
            Symbol::Program(p) => {
                let (symtab, body) = (p.symtab, p.body.clone());
                check_gotos(self.arena, sym, &mut self.out);
                for stmt in &body {
                    self.check_stmt(stmt, symtab);
                }
                self.check_scope_tree(symtab);
            }
            Symbol::Module(m) => {
                let symtab = m.symtab;
                self.check_scope_tree(symtab);
            }
            Symbol::Subroutine(s) => {
                let (symtab, args, body) = (s.symtab, s.args.clone(), s.body.clone());
                check_procedure(self.arena, sym, &mut self.out);
                self.check_args(symtab, &args);
                for stmt in &body {
                    self.check_stmt(stmt, symtab);
                }
                self.check_scope_tree(symtab);
            }
            Symbol::Function(f) => {
                let (symtab, args, body) = (f.symtab, f.args.clone(), f.body.clone());
                check_procedure(self.arena, sym, &mut self.out);
                self.check_args(symtab, &args);
                for stmt in &body {
                    self.check_stmt(stmt, symtab);
                }
                self.check_scope_tree(symtab);
            }
            Symbol::GenericProcedure(g) => {
                let procs = g.procs.clone();
                let name = g.name.clone();
                self.check_proc_set(&name, &procs);
            }
            Symbol::CustomOperator(c) => {
                let procs = c.procs.clone();
                let name = c.name.clone();
                self.check_proc_set(&name, &procs);
            }
            Symbol::ExternalSymbol(ext) => {
                let (external, name) = (ext.external, ext.name.clone());
                match self.arena.resolve_external(self.global_scope, sym) {
                    Ok(found) if found == external => {}
                    Ok(_) => self.push(
                        ViolationKind::ExternalPath,
                        format!("`{name}` resolves to a different symbol than its target"),
                    ),
                    Err(err) => self.push(ViolationKind::ExternalPath, err.to_string()),
                }
            }
            Symbol::DerivedType(d) => {
                let (symtab, parent, name) = (d.symtab, d.parent, d.name.clone());
                if let Some(parent) = parent {
                    let target = match self.arena.symbol(parent) {
                        Symbol::ExternalSymbol(ext) => ext.external,
                        _ => parent,
                    };
                    if !matches!(self.arena.symbol(target), Symbol::DerivedType(_)) {
                        self.push(
                            ViolationKind::DerivedParent,
                            format!("parent of derived type `{name}` is not a DerivedType"),
                        );
                    }
                }
                self.check_scope_tree(symtab);
            }
            Symbol::Variable(v) => {
                let (parent_symtab, ttype, symbolic_value) =
                    (v.parent_symtab, v.ttype.clone(), v.symbolic_value.clone());
                if parent_symtab != scope {
                    self.push(
                        ViolationKind::SymbolLinks,
                        format!("variable `{}` records the wrong parent scope", v.name),
                    );
                }
                self.check_ttype(&ttype, scope);
                if let Some(value) = &symbolic_value {
                    self.check_expr(value, scope);
                }
            }
            Symbol::ClassType(c) => {
                let symtab = c.symtab;
                self.check_scope_tree(symtab);
            }
            Symbol::ClassProcedure(p) => {
                let (proc, name) = (p.proc, p.name.clone());
                if !matches!(
                    self.arena.symbol(proc),
                    Symbol::Function(_) | Symbol::Subroutine(_) | Symbol::ExternalSymbol(_)
                ) {
                    self.push(
                        ViolationKind::SymbolLinks,
                        format!("class procedure `{name}` does not name a procedure"),
                    );
                }
            }
        }
    }

    fn check_args(&mut self, symtab: ScopeId, args: &[SymbolId]) {
        for arg in args {
            let ok = matches!(
                self.arena.symbol(*arg),
                Symbol::Variable(v) if v.parent_symtab == symtab
            );
            if !ok {
                self.push(
                    ViolationKind::SymbolLinks,
                    format!(
                        "argument `{}` is not a Variable of the procedure's scope",
                        self.arena.symbol(*arg).name()
                    ),
                );
            }
        }
    }

    fn check_proc_set(&mut self, name: &crate::name::Name, procs: &[SymbolId]) {
        for proc in procs {
            if !matches!(
                self.arena.symbol(*proc),
                Symbol::Function(_)
                    | Symbol::Subroutine(_)
                    | Symbol::ExternalSymbol(_)
                    | Symbol::ClassProcedure(_)
            ) {
                self.push(
                    ViolationKind::SymbolLinks,
                    format!(
                        "`{name}` lists `{}`, which is not a procedure",
                        self.arena.symbol(*proc).name()
                    ),
                );
            }
        }
    }

    /// Invariant: every symbol reference inside a body resolves by walking
    /// parent scopes, or is an `ExternalSymbol`.
    fn check_symbol_ref(&mut self, scope: ScopeId, sym: SymbolId, what: &str) {
        let reachable = match self.arena.enclosing_scope(sym) {
            Some(enclosing) => self.bounded_ancestors(scope).any(|s| s == enclosing),
            None => false,
        };
        if !reachable && !matches!(self.arena.symbol(sym), Symbol::ExternalSymbol(_)) {
            self.push(
                ViolationKind::Reference,
                format!(
                    "{what} `{}` is not reachable from the referring scope",
                    self.arena.symbol(sym).name()
                ),
            );
        }
    }

    fn check_dims(&mut self, dims: &[Dimension], scope: ScopeId) {
        for dim in dims {
            if let Some(start) = &dim.start {
                self.check_expr(start, scope);
            }
            if let Some(end) = &dim.end {
                self.check_expr(end, scope);
            }
        }
    }

    fn check_ttype(&mut self, ttype: &Ttype, scope: ScopeId) {
        match ttype {
            Ttype::Integer(t) => self.check_dims(&t.dims, scope),
            Ttype::Real(t) => self.check_dims(&t.dims, scope),
            Ttype::Complex(t) => self.check_dims(&t.dims, scope),
            Ttype::Logical(t) => self.check_dims(&t.dims, scope),
            Ttype::Character(t) => {
                if t.len < CHARACTER_LEN_RUNTIME {
                    self.push(
                        ViolationKind::TypeShape,
                        format!("character length sentinel {} is out of range", t.len),
                    );
                }
                if (t.len == CHARACTER_LEN_RUNTIME) != t.len_expr.is_some() {
                    self.push(
                        ViolationKind::TypeShape,
                        "character length expression disagrees with its sentinel".to_owned(),
                    );
                }
                if let Some(len_expr) = &t.len_expr {
                    self.check_expr(len_expr, scope);
                }
                self.check_dims(&t.dims, scope);
            }
            Ttype::List(t) => self.check_ttype(&t.elem, scope),
            Ttype::Set(t) => self.check_ttype(&t.elem, scope),
            Ttype::Tuple(t) => {
                for elem in &t.elems {
                    self.check_ttype(elem, scope);
                }
            }
            Ttype::Dict(t) => {
                self.check_ttype(&t.key, scope);
                self.check_ttype(&t.value, scope);
            }
            Ttype::Derived(t) => {
                let target = match self.arena.symbol(t.symbol) {
                    Symbol::ExternalSymbol(ext) => ext.external,
                    _ => t.symbol,
                };
                if !matches!(self.arena.symbol(target), Symbol::DerivedType(_)) {
                    self.push(
                        ViolationKind::SymbolLinks,
                        "Derived type does not reference a DerivedType symbol".to_owned(),
                    );
                }
                self.check_symbol_ref(scope, t.symbol, "type symbol");
                self.check_dims(&t.dims, scope);
            }
            Ttype::Class(t) => {
                let target = match self.arena.symbol(t.symbol) {
                    Symbol::ExternalSymbol(ext) => ext.external,
                    _ => t.symbol,
                };
                if !matches!(
                    self.arena.symbol(target),
                    Symbol::ClassType(_) | Symbol::DerivedType(_)
                ) {
                    self.push(
                        ViolationKind::SymbolLinks,
                        "Class type does not reference a class or derived type".to_owned(),
                    );
                }
                self.check_symbol_ref(scope, t.symbol, "type symbol");
                self.check_dims(&t.dims, scope);
            }
            Ttype::Pointer(t) => {
                if matches!(*t.target, Ttype::Pointer(_)) {
                    self.push(
                        ViolationKind::TypeShape,
                        "pointer of pointer is not a valid type".to_owned(),
                    );
                }
                self.check_ttype(&t.target, scope);
            }
        }
    }

    fn check_value_slot(&mut self, ttype: &Ttype, value: Option<&Expr>, scope: ScopeId) {
        let Some(value) = value else { return };
        if !value.is_constant() {
            self.push(
                ViolationKind::Value,
                "folded value is not a Constant* node".to_owned(),
            );
        } else if value.ttype() != ttype {
            self.push(
                ViolationKind::Value,
                "folded value type differs from the expression type".to_owned(),
            );
        }
        self.check_expr(value, scope);
    }

    fn check_expr(&mut self, expr: &Expr, scope: ScopeId) {
        match expr {
            Expr::BoolOp(e) => {
                if !e.ttype.is_logical() {
                    self.push(
                        ViolationKind::ExprType,
                        "logical operation with a non-Logical type".to_owned(),
                    );
                }
                self.check_expr(&e.left, scope);
                self.check_expr(&e.right, scope);
                self.check_value_slot(&e.ttype, e.value.as_deref(), scope);
            }
            Expr::BinOp(e) => {
                self.check_expr(&e.left, scope);
                self.check_expr(&e.right, scope);
                self.check_value_slot(&e.ttype, e.value.as_deref(), scope);
                if let Some(overloaded) = &e.overloaded {
                    self.check_expr(overloaded, scope);
                }
            }
            Expr::UnaryOp(e) => {
                if e.op == crate::nodes::UnaryOp::Not && !e.ttype.is_logical() {
                    self.push(
                        ViolationKind::ExprType,
                        "logical negation with a non-Logical type".to_owned(),
                    );
                }
                self.check_expr(&e.operand, scope);
                self.check_value_slot(&e.ttype, e.value.as_deref(), scope);
            }
            Expr::StrOp(e) => {
                if !e.ttype.is_character() {
                    self.push(
                        ViolationKind::ExprType,
                        "character operation with a non-Character type".to_owned(),
                    );
                }
                self.check_expr(&e.left, scope);
                self.check_expr(&e.right, scope);
                self.check_value_slot(&e.ttype, e.value.as_deref(), scope);
                if let Some(overloaded) = &e.overloaded {
                    self.check_expr(overloaded, scope);
                }
            }
            Expr::Compare(e) => {
                if !e.ttype.is_logical() {
                    self.push(
                        ViolationKind::ExprType,
                        "comparison with a non-Logical type".to_owned(),
                    );
                }
                self.check_expr(&e.left, scope);
                self.check_expr(&e.right, scope);
                self.check_value_slot(&e.ttype, e.value.as_deref(), scope);
                if let Some(overloaded) = &e.overloaded {
                    self.check_expr(overloaded, scope);
                }
            }
            Expr::FunctionCall(e) => {
                self.check_symbol_ref(scope, e.name, "call target");
                for arg in &e.args {
                    self.check_expr(arg, scope);
                }
                self.check_value_slot(&e.ttype, e.value.as_deref(), scope);
            }
            Expr::Var(e) => {
                self.check_symbol_ref(scope, e.sym, "variable");
                let target = match self.arena.symbol(e.sym) {
                    Symbol::ExternalSymbol(ext) => ext.external,
                    _ => e.sym,
                };
                if let Symbol::Variable(v) = self.arena.symbol(target) {
                    if !v.ttype.same_base(&e.ttype) {
                        self.push(
                            ViolationKind::ExprType,
                            format!(
                                "reference to `{}` disagrees with its declared type",
                                v.name
                            ),
                        );
                    }
                }
            }
            Expr::ArrayRef(e) => {
                self.check_symbol_ref(scope, e.sym, "array");
                for index in &e.indices {
                    for bound in [&index.left, &index.right, &index.step] {
                        if let Some(bound) = bound {
                            self.check_expr(bound, scope);
                        }
                    }
                }
            }
            Expr::DerivedRef(e) => {
                self.check_expr(&e.target, scope);
            }
            Expr::Cast(e) => {
                self.check_expr(&e.arg, scope);
                self.check_value_slot(&e.ttype, e.value.as_deref(), scope);
            }
            Expr::ConstantInteger(e) => {
                if !matches!(e.ttype, Ttype::Integer(_)) {
                    self.push(
                        ViolationKind::ExprType,
                        "integer constant with a non-Integer type".to_owned(),
                    );
                }
            }
            Expr::ConstantReal(e) => {
                if !matches!(e.ttype, Ttype::Real(_)) {
                    self.push(
                        ViolationKind::ExprType,
                        "real constant with a non-Real type".to_owned(),
                    );
                }
            }
            Expr::ConstantComplex(e) => {
                if !matches!(e.ttype, Ttype::Complex(_)) {
                    self.push(
                        ViolationKind::ExprType,
                        "complex constant with a non-Complex type".to_owned(),
                    );
                }
            }
            Expr::ConstantLogical(e) => {
                if !e.ttype.is_logical() {
                    self.push(
                        ViolationKind::ExprType,
                        "logical constant with a non-Logical type".to_owned(),
                    );
                }
            }
            Expr::ConstantString(e) => {
                if !e.ttype.is_character() {
                    self.push(
                        ViolationKind::ExprType,
                        "string constant with a non-Character type".to_owned(),
                    );
                }
            }
            Expr::BozConstant(_) => {}
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: ScopeId) {
        match stmt {
            Stmt::Assignment(s) => {
                self.check_expr(&s.target, scope);
                self.check_expr(&s.value, scope);
            }
            Stmt::SubroutineCall(s) => {
                self.check_symbol_ref(scope, s.name, "call target");
                for arg in &s.args {
                    self.check_expr(arg, scope);
                }
            }
            Stmt::If(s) => {
                self.check_expr(&s.test, scope);
                for stmt in s.body.iter().chain(&s.orelse) {
                    self.check_stmt(stmt, scope);
                }
            }
            Stmt::WhileLoop(s) => {
                self.check_expr(&s.test, scope);
                for stmt in &s.body {
                    self.check_stmt(stmt, scope);
                }
            }
            Stmt::DoLoop(s) => {
                for part in [&s.head.var, &s.head.start, &s.head.end, &s.head.increment] {
                    if let Some(expr) = part {
                        self.check_expr(expr, scope);
                    }
                }
                for stmt in &s.body {
                    self.check_stmt(stmt, scope);
                }
            }
            Stmt::Select(s) => {
                self.check_expr(&s.test, scope);
                for case in &s.cases {
                    for condition in &case.conditions {
                        self.check_expr(condition, scope);
                    }
                    for stmt in &case.body {
                        self.check_stmt(stmt, scope);
                    }
                }
                for stmt in &s.default {
                    self.check_stmt(stmt, scope);
                }
            }
            Stmt::Cycle | Stmt::Exit | Stmt::Return | Stmt::GoTo(_) | Stmt::GoToTarget(_) => {}
            Stmt::Stop(s) => self.check_opt_expr(&s.code, scope),
            Stmt::ErrorStop(s) => self.check_opt_expr(&s.code, scope),
            Stmt::Print(s) => {
                for value in &s.values {
                    self.check_expr(value, scope);
                }
            }
            Stmt::FileOpen(s) => {
                self.check_opt_expr(&s.unit, scope);
                self.check_opt_expr(&s.file, scope);
                self.check_opt_expr(&s.status, scope);
            }
            Stmt::FileClose(s) => self.check_opt_expr(&s.unit, scope),
            Stmt::FileRead(s) => {
                self.check_opt_expr(&s.unit, scope);
                for value in &s.values {
                    self.check_expr(value, scope);
                }
            }
            Stmt::FileWrite(s) => {
                self.check_opt_expr(&s.unit, scope);
                for value in &s.values {
                    self.check_expr(value, scope);
                }
            }
            Stmt::FileInquire(s) => {
                self.check_opt_expr(&s.unit, scope);
                self.check_opt_expr(&s.file, scope);
                self.check_opt_expr(&s.exists, scope);
            }
            Stmt::FileRewind(s) => self.check_opt_expr(&s.unit, scope),
            Stmt::FileFlush(s) => self.check_opt_expr(&s.unit, scope),
            Stmt::Allocate(s) => {
                for arg in &s.args {
                    self.check_symbol_ref(scope, arg.sym, "allocate target");
                    self.check_dims(&arg.dims, scope);
                }
            }
            Stmt::ExplicitDeallocate(s) => {
                for sym in &s.syms {
                    self.check_symbol_ref(scope, *sym, "deallocate target");
                }
            }
            Stmt::ImplicitDeallocate(s) => {
                for sym in &s.syms {
                    self.check_symbol_ref(scope, *sym, "deallocate target");
                }
            }
            Stmt::Nullify(s) => {
                for sym in &s.syms {
                    self.check_symbol_ref(scope, *sym, "nullify target");
                }
            }
            Stmt::Assert(s) => {
                self.check_expr(&s.test, scope);
                self.check_opt_expr(&s.msg, scope);
            }
        }
    }

    fn check_opt_expr(&mut self, expr: &Option<Expr>, scope: ScopeId) {
        if let Some(expr) = expr {
            self.check_expr(expr, scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{constant_integer, UnitBuilder};
    use crate::name::Name;
    use crate::nodes::{
        Abi, Access, Deftype, Presence, StmtGoTo, StmtGoToTarget, StorageType, SymbolFunction,
        SymbolVariable,
    };

    #[test]
    fn empty_unit_is_clean() {
        let unit = UnitBuilder::new().finish();
        assert_eq!(validate(&unit), vec![]);
    }

    fn function_with_body(body: Vec<Stmt>) -> TranslationUnit {
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
                    ttype: Ttype::integer(4),
                    abi: Abi::Source,
                    access: Access::Public,
                    presence: Presence::Required,
                }),
            )
            .unwrap();
        let f = builder
            .add_symbol(
                global,
                Symbol::Function(SymbolFunction {
                    name: Name::new("f"),
                    symtab: fn_scope,
                    args: vec![],
                    body,
                    return_var: ret,
                    abi: Abi::Source,
                    access: Access::Public,
                    deftype: Deftype::Implementation,
                    bindc_name: None,
                }),
            )
            .unwrap();
        let mut unit = builder.finish();
        unit.items.push(UnitItem::Symbol(f));
        unit
    }

    #[test]
    fn matched_goto_pair_is_clean() {
        let unit = function_with_body(vec![
            Stmt::GoTo(StmtGoTo { id: 7 }),
            Stmt::GoToTarget(StmtGoToTarget { id: 7 }),
            Stmt::Return,
        ]);
        assert_eq!(validate(&unit), vec![]);
    }

    #[test]
    fn unmatched_goto_is_one_violation() {
        let unit = function_with_body(vec![Stmt::GoTo(StmtGoTo { id: 7 }), Stmt::Return]);
        let violations = validate(&unit);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::GoTo);
    }

    #[test]
    fn function_without_return_var_is_flagged() {
        let mut builder = UnitBuilder::new();
        let global = builder.global_scope();
        let fn_scope = builder.new_scope(global);
        // return_var names a local that does not exist: reserve a slot in
        // the scope with intent Local instead of ReturnVar.
        let local = builder
            .add_symbol(
                fn_scope,
                Symbol::Variable(SymbolVariable {
                    parent_symtab: fn_scope,
                    name: Name::new("x"),
                    intent: Intent::Local,
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
                global,
                Symbol::Function(SymbolFunction {
                    name: Name::new("f"),
                    symtab: fn_scope,
                    args: vec![],
                    body: vec![Stmt::Return],
                    return_var: local,
                    abi: Abi::Source,
                    access: Access::Public,
                    deftype: Deftype::Implementation,
                    bindc_name: None,
                }),
            )
            .unwrap();
        let unit = builder.finish();

        let violations = validate(&unit);
        assert!(violations
            .iter()
            .any(|violation| violation.kind == ViolationKind::ReturnVar));
    }

    #[test]
    fn bad_folded_value_is_flagged() {
        let mut unit = TranslationUnit::new();
        // hand-assembled node bypassing the typed constructors
        let expr = Expr::BinOp(crate::nodes::ExprBinOp {
            left: Box::new(constant_integer(2, 4)),
            op: crate::nodes::BinOp::Add,
            right: Box::new(constant_integer(3, 4)),
            ttype: Ttype::integer(4),
            value: Some(Box::new(constant_integer(5, 8))),
            overloaded: None,
        });
        unit.items.push(UnitItem::Expr(expr));

        let violations = validate(&unit);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Value);
    }
}
