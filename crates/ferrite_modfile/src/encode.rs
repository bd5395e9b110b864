//! The encoder.
//!
//! Framing is a 4-byte magic, a `u16` schema version, then the scope and
//! symbol counts followed by the root unit. Symbols and scopes are
//! assigned ordinals in deterministic pre-order over the scope forest;
//! every reference encodes the ordinal, so cyclic symbol graphs linearize
//! without loops and the decoder can pre-reserve arena slots.
//!
//! Two kinds of field are reconstructed rather than encoded: scope
//! back-links (`parent_symtab` and scope parents are implied by nesting)
//! and `ExternalSymbol.external` (re-resolved from the declared path when
//! the unit is decoded, which is what lets an interface file reference
//! modules it does not contain).

use rustc_hash::FxHashMap;

use ferrite_asr::arena::{Arena, ScopeId, SymbolId};
use ferrite_asr::nodes::{
    AllocArg, ArrayIndex, CaseStmt, Dimension, DoLoopHead, Expr, Stmt, Symbol, Ttype,
    TranslationUnit, UnitItem,
};

use crate::marshal::Write;
use crate::tags;

pub const ASR_MAGIC: &[u8; 4] = b"FASR";
pub const SCHEMA_VERSION: u16 = 1;

/// Encodes a unit to the versioned byte stream. Total for well-formed
/// units; panics if the unit references symbols unreachable from its
/// global scope (a malformed arena, not a malformed input).
pub fn encode(unit: &TranslationUnit) -> Vec<u8> {
    let ordinals = Ordinals::number(unit);
    tracing::trace!(
        symbols = ordinals.symbols.len(),
        scopes = ordinals.scopes.len(),
        "encoding unit"
    );
    let mut encoder = Encoder {
        arena: &unit.arena,
        ordinals,
        buf: Vec::new(),
    };
    encoder.buf.write_slice(ASR_MAGIC);
    encoder.buf.write_u16(SCHEMA_VERSION);
    encoder
        .buf
        .write_len(encoder.ordinals.scopes.len());
    encoder
        .buf
        .write_len(encoder.ordinals.symbols.len());
    encoder.scope(unit.global_scope);
    encoder.buf.write_len(unit.items.len());
    for item in &unit.items {
        match item {
            UnitItem::Symbol(sym) => {
                encoder.buf.write_u8(tags::item::SYMBOL);
                encoder.sym_ref(*sym);
            }
            UnitItem::Stmt(stmt) => {
                encoder.buf.write_u8(tags::item::STMT);
                encoder.stmt(stmt);
            }
            UnitItem::Expr(expr) => {
                encoder.buf.write_u8(tags::item::EXPR);
                encoder.expr(expr);
            }
        }
    }
    encoder.buf
}

/// Pre-order numbering of the scope forest: a scope gets its ordinal when
/// entered, a symbol when encountered in its scope, nested scopes
/// immediately after their owner.
struct Ordinals {
    symbols: FxHashMap<SymbolId, u32>,
    scopes: FxHashMap<ScopeId, u32>,
}

impl Ordinals {
    fn number(unit: &TranslationUnit) -> Self {
        let mut this = Self {
            symbols: FxHashMap::default(),
            scopes: FxHashMap::default(),
        };
        this.visit(&unit.arena, unit.global_scope);
        this
    }

    fn visit(&mut self, arena: &Arena, scope: ScopeId) {
        let scope_ord = self.scopes.len() as u32;
        self.scopes.insert(scope, scope_ord);
        for (_, sym) in arena.scope(scope).iter() {
            let sym_ord = self.symbols.len() as u32;
            self.symbols.insert(sym, sym_ord);
            if let Some(owned) = arena.symbol(sym).symtab() {
                self.visit(arena, owned);
            }
        }
    }
}

struct Encoder<'a> {
    arena: &'a Arena,
    ordinals: Ordinals,
    buf: Vec<u8>,
}

impl Encoder<'_> {
    fn sym_ref(&mut self, sym: SymbolId) {
        self.buf.write_u32(self.ordinals.symbols[&sym]);
    }

    fn opt_sym_ref(&mut self, sym: Option<SymbolId>) {
        match sym {
            Some(sym) => {
                self.buf.write_u8(1);
                self.sym_ref(sym);
            }
            None => self.buf.write_u8(0),
        }
    }

    fn names(&mut self, names: &[ferrite_asr::Name]) {
        self.buf.write_len(names.len());
        for name in names {
            self.buf.write_str(name);
        }
    }

    fn scope(&mut self, scope: ScopeId) {
        let entries: Vec<SymbolId> = self.arena.scope(scope).symbol_ids().collect();
        self.buf.write_len(entries.len());
        for sym in entries {
            self.symbol(sym);
        }
    }

    fn symbol(&mut self, sym: SymbolId) {
        match self.arena.symbol(sym) {
            Symbol::Program(s) => {
                self.buf.write_u8(tags::sym::PROGRAM);
                self.buf.write_str(&s.name);
                self.scope(s.symtab);
                self.names(&s.dependencies);
                self.stmts(&s.body);
            }
            Symbol::Module(s) => {
                self.buf.write_u8(tags::sym::MODULE);
                self.buf.write_str(&s.name);
                self.scope(s.symtab);
                self.names(&s.dependencies);
                self.buf.write_bool(s.loaded_from_mod);
            }
            Symbol::Subroutine(s) => {
                self.buf.write_u8(tags::sym::SUBROUTINE);
                self.buf.write_str(&s.name);
                self.scope(s.symtab);
                self.sym_refs(&s.args);
                self.stmts(&s.body);
                self.buf.write_u8(tags::abi_to_u8(s.abi));
                self.buf.write_u8(tags::access_to_u8(s.access));
                self.buf.write_u8(tags::deftype_to_u8(s.deftype));
                self.opt_str(s.bindc_name.as_deref());
            }
            Symbol::Function(s) => {
                self.buf.write_u8(tags::sym::FUNCTION);
                self.buf.write_str(&s.name);
                self.scope(s.symtab);
                self.sym_refs(&s.args);
                self.stmts(&s.body);
                self.sym_ref(s.return_var);
                self.buf.write_u8(tags::abi_to_u8(s.abi));
                self.buf.write_u8(tags::access_to_u8(s.access));
                self.buf.write_u8(tags::deftype_to_u8(s.deftype));
                self.opt_str(s.bindc_name.as_deref());
            }
            Symbol::GenericProcedure(s) => {
                self.buf.write_u8(tags::sym::GENERIC_PROCEDURE);
                self.buf.write_str(&s.name);
                self.sym_refs(&s.procs);
                self.buf.write_u8(tags::access_to_u8(s.access));
            }
            Symbol::CustomOperator(s) => {
                self.buf.write_u8(tags::sym::CUSTOM_OPERATOR);
                self.buf.write_str(&s.name);
                self.sym_refs(&s.procs);
                self.buf.write_u8(tags::access_to_u8(s.access));
            }
            Symbol::ExternalSymbol(s) => {
                self.buf.write_u8(tags::sym::EXTERNAL_SYMBOL);
                self.buf.write_str(&s.name);
                self.buf.write_str(&s.module_name);
                self.names(&s.scope_names);
                self.buf.write_str(&s.original_name);
                self.buf.write_u8(tags::access_to_u8(s.access));
            }
            Symbol::DerivedType(s) => {
                self.buf.write_u8(tags::sym::DERIVED_TYPE);
                self.buf.write_str(&s.name);
                self.scope(s.symtab);
                self.names(&s.members);
                self.buf.write_u8(tags::abi_to_u8(s.abi));
                self.buf.write_u8(tags::access_to_u8(s.access));
                self.opt_sym_ref(s.parent);
            }
            Symbol::Variable(s) => {
                self.buf.write_u8(tags::sym::VARIABLE);
                self.buf.write_str(&s.name);
                self.buf.write_u8(tags::intent_to_u8(s.intent));
                self.opt_expr(s.symbolic_value.as_ref());
                self.buf.write_u8(tags::storage_to_u8(s.storage));
                self.ttype(&s.ttype);
                self.buf.write_u8(tags::abi_to_u8(s.abi));
                self.buf.write_u8(tags::access_to_u8(s.access));
                self.buf.write_u8(tags::presence_to_u8(s.presence));
            }
            Symbol::ClassType(s) => {
                self.buf.write_u8(tags::sym::CLASS_TYPE);
                self.buf.write_str(&s.name);
                self.scope(s.symtab);
                self.buf.write_u8(tags::abi_to_u8(s.abi));
                self.buf.write_u8(tags::access_to_u8(s.access));
            }
            Symbol::ClassProcedure(s) => {
                self.buf.write_u8(tags::sym::CLASS_PROCEDURE);
                self.buf.write_str(&s.name);
                self.buf.write_str(&s.proc_name);
                self.sym_ref(s.proc);
                self.buf.write_u8(tags::abi_to_u8(s.abi));
            }
        }
    }

    fn sym_refs(&mut self, syms: &[SymbolId]) {
        self.buf.write_len(syms.len());
        for sym in syms {
            self.sym_ref(*sym);
        }
    }

    fn opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.buf.write_u8(1);
                self.buf.write_str(s);
            }
            None => self.buf.write_u8(0),
        }
    }

    fn opt_expr(&mut self, expr: Option<&Expr>) {
        match expr {
            Some(expr) => {
                self.buf.write_u8(1);
                self.expr(expr);
            }
            None => self.buf.write_u8(0),
        }
    }

    fn exprs(&mut self, exprs: &[Expr]) {
        self.buf.write_len(exprs.len());
        for expr in exprs {
            self.expr(expr);
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        self.buf.write_len(stmts.len());
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn dims(&mut self, dims: &[Dimension]) {
        self.buf.write_len(dims.len());
        for dim in dims {
            self.opt_expr(dim.start.as_ref());
            self.opt_expr(dim.end.as_ref());
        }
    }

    fn ttype(&mut self, ttype: &Ttype) {
        match ttype {
            Ttype::Integer(t) => {
                self.buf.write_u8(tags::ttype::INTEGER);
                self.buf.write_u8(t.kind);
                self.dims(&t.dims);
            }
            Ttype::Real(t) => {
                self.buf.write_u8(tags::ttype::REAL);
                self.buf.write_u8(t.kind);
                self.dims(&t.dims);
            }
            Ttype::Complex(t) => {
                self.buf.write_u8(tags::ttype::COMPLEX);
                self.buf.write_u8(t.kind);
                self.dims(&t.dims);
            }
            Ttype::Character(t) => {
                self.buf.write_u8(tags::ttype::CHARACTER);
                self.buf.write_u8(t.kind);
                self.buf.write_i64(t.len);
                self.opt_expr(t.len_expr.as_deref());
                self.dims(&t.dims);
            }
            Ttype::Logical(t) => {
                self.buf.write_u8(tags::ttype::LOGICAL);
                self.buf.write_u8(t.kind);
                self.dims(&t.dims);
            }
            Ttype::List(t) => {
                self.buf.write_u8(tags::ttype::LIST);
                self.ttype(&t.elem);
            }
            Ttype::Set(t) => {
                self.buf.write_u8(tags::ttype::SET);
                self.ttype(&t.elem);
            }
            Ttype::Tuple(t) => {
                self.buf.write_u8(tags::ttype::TUPLE);
                self.buf.write_len(t.elems.len());
                for elem in &t.elems {
                    self.ttype(elem);
                }
            }
            Ttype::Dict(t) => {
                self.buf.write_u8(tags::ttype::DICT);
                self.ttype(&t.key);
                self.ttype(&t.value);
            }
            Ttype::Derived(t) => {
                self.buf.write_u8(tags::ttype::DERIVED);
                self.sym_ref(t.symbol);
                self.dims(&t.dims);
            }
            Ttype::Class(t) => {
                self.buf.write_u8(tags::ttype::CLASS);
                self.sym_ref(t.symbol);
                self.dims(&t.dims);
            }
            Ttype::Pointer(t) => {
                self.buf.write_u8(tags::ttype::POINTER);
                self.ttype(&t.target);
            }
        }
    }

    fn array_index(&mut self, index: &ArrayIndex) {
        self.opt_expr(index.left.as_ref());
        self.opt_expr(index.right.as_ref());
        self.opt_expr(index.step.as_ref());
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::BoolOp(e) => {
                self.buf.write_u8(tags::expr::BOOL_OP);
                self.expr(&e.left);
                self.buf.write_u8(tags::boolop_to_u8(e.op));
                self.expr(&e.right);
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
            }
            Expr::BinOp(e) => {
                self.buf.write_u8(tags::expr::BIN_OP);
                self.expr(&e.left);
                self.buf.write_u8(tags::binop_to_u8(e.op));
                self.expr(&e.right);
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.opt_expr(e.overloaded.as_deref());
            }
            Expr::UnaryOp(e) => {
                self.buf.write_u8(tags::expr::UNARY_OP);
                self.buf.write_u8(tags::unaryop_to_u8(e.op));
                self.expr(&e.operand);
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
            }
            Expr::StrOp(e) => {
                self.buf.write_u8(tags::expr::STR_OP);
                self.expr(&e.left);
                self.buf.write_u8(tags::strop_to_u8(e.op));
                self.expr(&e.right);
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.opt_expr(e.overloaded.as_deref());
            }
            Expr::Compare(e) => {
                self.buf.write_u8(tags::expr::COMPARE);
                self.expr(&e.left);
                self.buf.write_u8(tags::cmpop_to_u8(e.op));
                self.expr(&e.right);
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
                self.opt_expr(e.overloaded.as_deref());
            }
            Expr::FunctionCall(e) => {
                self.buf.write_u8(tags::expr::FUNCTION_CALL);
                self.sym_ref(e.name);
                self.opt_sym_ref(e.original_name);
                self.exprs(&e.args);
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
            }
            Expr::Var(e) => {
                self.buf.write_u8(tags::expr::VAR);
                self.sym_ref(e.sym);
                self.ttype(&e.ttype);
            }
            Expr::ArrayRef(e) => {
                self.buf.write_u8(tags::expr::ARRAY_REF);
                self.sym_ref(e.sym);
                self.buf.write_len(e.indices.len());
                for index in &e.indices {
                    self.array_index(index);
                }
                self.ttype(&e.ttype);
            }
            Expr::DerivedRef(e) => {
                self.buf.write_u8(tags::expr::DERIVED_REF);
                self.expr(&e.target);
                self.sym_ref(e.member);
                self.ttype(&e.ttype);
            }
            Expr::Cast(e) => {
                self.buf.write_u8(tags::expr::CAST);
                self.expr(&e.arg);
                self.buf.write_u8(tags::cast_to_u8(e.kind));
                self.ttype(&e.ttype);
                self.opt_expr(e.value.as_deref());
            }
            Expr::ConstantInteger(e) => {
                self.buf.write_u8(tags::expr::CONSTANT_INTEGER);
                self.buf.write_i64(e.n);
                self.ttype(&e.ttype);
            }
            Expr::ConstantReal(e) => {
                self.buf.write_u8(tags::expr::CONSTANT_REAL);
                self.buf.write_f64(e.r);
                self.ttype(&e.ttype);
            }
            Expr::ConstantComplex(e) => {
                self.buf.write_u8(tags::expr::CONSTANT_COMPLEX);
                self.buf.write_f64(e.re);
                self.buf.write_f64(e.im);
                self.ttype(&e.ttype);
            }
            Expr::ConstantLogical(e) => {
                self.buf.write_u8(tags::expr::CONSTANT_LOGICAL);
                self.buf.write_bool(e.b);
                self.ttype(&e.ttype);
            }
            Expr::ConstantString(e) => {
                self.buf.write_u8(tags::expr::CONSTANT_STRING);
                self.buf.write_str(&e.s);
                self.ttype(&e.ttype);
            }
            Expr::BozConstant(e) => {
                self.buf.write_u8(tags::expr::BOZ_CONSTANT);
                self.buf.write_u64(e.n);
                self.buf.write_u8(tags::boz_to_u8(e.repr));
                self.ttype(&e.ttype);
            }
        }
    }

    fn do_loop_head(&mut self, head: &DoLoopHead) {
        self.opt_expr(head.var.as_ref());
        self.opt_expr(head.start.as_ref());
        self.opt_expr(head.end.as_ref());
        self.opt_expr(head.increment.as_ref());
    }

    fn case(&mut self, case: &CaseStmt) {
        self.exprs(&case.conditions);
        self.stmts(&case.body);
    }

    fn alloc_arg(&mut self, arg: &AllocArg) {
        self.sym_ref(arg.sym);
        self.dims(&arg.dims);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assignment(s) => {
                self.buf.write_u8(tags::stmt::ASSIGNMENT);
                self.expr(&s.target);
                self.expr(&s.value);
            }
            Stmt::SubroutineCall(s) => {
                self.buf.write_u8(tags::stmt::SUBROUTINE_CALL);
                self.sym_ref(s.name);
                self.opt_sym_ref(s.original_name);
                self.exprs(&s.args);
            }
            Stmt::If(s) => {
                self.buf.write_u8(tags::stmt::IF);
                self.expr(&s.test);
                self.stmts(&s.body);
                self.stmts(&s.orelse);
            }
            Stmt::WhileLoop(s) => {
                self.buf.write_u8(tags::stmt::WHILE_LOOP);
                self.expr(&s.test);
                self.stmts(&s.body);
            }
            Stmt::DoLoop(s) => {
                self.buf.write_u8(tags::stmt::DO_LOOP);
                self.do_loop_head(&s.head);
                self.stmts(&s.body);
            }
            Stmt::Select(s) => {
                self.buf.write_u8(tags::stmt::SELECT);
                self.expr(&s.test);
                self.buf.write_len(s.cases.len());
                for case in &s.cases {
                    self.case(case);
                }
                self.stmts(&s.default);
            }
            Stmt::Cycle => self.buf.write_u8(tags::stmt::CYCLE),
            Stmt::Exit => self.buf.write_u8(tags::stmt::EXIT),
            Stmt::Return => self.buf.write_u8(tags::stmt::RETURN),
            Stmt::Stop(s) => {
                self.buf.write_u8(tags::stmt::STOP);
                self.opt_expr(s.code.as_ref());
            }
            Stmt::ErrorStop(s) => {
                self.buf.write_u8(tags::stmt::ERROR_STOP);
                self.opt_expr(s.code.as_ref());
            }
            Stmt::GoTo(s) => {
                self.buf.write_u8(tags::stmt::GO_TO);
                self.buf.write_u64(s.id);
            }
            Stmt::GoToTarget(s) => {
                self.buf.write_u8(tags::stmt::GO_TO_TARGET);
                self.buf.write_u64(s.id);
            }
            Stmt::Print(s) => {
                self.buf.write_u8(tags::stmt::PRINT);
                self.exprs(&s.values);
            }
            Stmt::FileOpen(s) => {
                self.buf.write_u8(tags::stmt::FILE_OPEN);
                self.opt_expr(s.unit.as_ref());
                self.opt_expr(s.file.as_ref());
                self.opt_expr(s.status.as_ref());
            }
            Stmt::FileClose(s) => {
                self.buf.write_u8(tags::stmt::FILE_CLOSE);
                self.opt_expr(s.unit.as_ref());
            }
            Stmt::FileRead(s) => {
                self.buf.write_u8(tags::stmt::FILE_READ);
                self.opt_expr(s.unit.as_ref());
                self.exprs(&s.values);
            }
            Stmt::FileWrite(s) => {
                self.buf.write_u8(tags::stmt::FILE_WRITE);
                self.opt_expr(s.unit.as_ref());
                self.exprs(&s.values);
            }
            Stmt::FileInquire(s) => {
                self.buf.write_u8(tags::stmt::FILE_INQUIRE);
                self.opt_expr(s.unit.as_ref());
                self.opt_expr(s.file.as_ref());
                self.opt_expr(s.exists.as_ref());
            }
            Stmt::FileRewind(s) => {
                self.buf.write_u8(tags::stmt::FILE_REWIND);
                self.opt_expr(s.unit.as_ref());
            }
            Stmt::FileFlush(s) => {
                self.buf.write_u8(tags::stmt::FILE_FLUSH);
                self.opt_expr(s.unit.as_ref());
            }
            Stmt::Allocate(s) => {
                self.buf.write_u8(tags::stmt::ALLOCATE);
                self.buf.write_len(s.args.len());
                for arg in &s.args {
                    self.alloc_arg(arg);
                }
            }
            Stmt::ExplicitDeallocate(s) => {
                self.buf.write_u8(tags::stmt::EXPLICIT_DEALLOCATE);
                self.sym_refs(&s.syms);
            }
            Stmt::ImplicitDeallocate(s) => {
                self.buf.write_u8(tags::stmt::IMPLICIT_DEALLOCATE);
                self.sym_refs(&s.syms);
            }
            Stmt::Nullify(s) => {
                self.buf.write_u8(tags::stmt::NULLIFY);
                self.sym_refs(&s.syms);
            }
            Stmt::Assert(s) => {
                self.buf.write_u8(tags::stmt::ASSERT);
                self.expr(&s.test);
                self.opt_expr(s.msg.as_ref());
            }
        }
    }
}
