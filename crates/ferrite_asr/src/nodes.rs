//! The ASR node algebra.
//!
//! A closed universe of tagged variants: translation units, symbols,
//! statements, expressions, types, and the leaf enums they carry. The
//! algebra is shared by every front end, pass, and backend; adding a
//! variant is a schema change and bumps the serialization version.
//!
//! Field declaration order is normative: the serializer, the pickle, and
//! structural equality all follow it.

use crate::arena::{Arena, ScopeId, SymbolId};
use crate::name::Name;

/// Where a symbol's implementation lives and under what linkage convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Abi {
    /// Implemented in this translation unit, from source.
    Source,
    /// Loaded from a ferrite module interface file.
    LFortranModule,
    /// Loaded from a foreign `gfortran` module.
    GFortranModule,
    /// Declared against the C ABI.
    BindC,
    /// Defined interactively; possibly transitional, do not bake backend
    /// assumptions on it.
    Interactive,
    /// Provided by the runtime intrinsics library.
    Intrinsic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Local,
    In,
    Out,
    InOut,
    ReturnVar,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Default,
    Save,
    Parameter,
    Allocatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deftype {
    Implementation,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
    Xor,
    Eqv,
    NEqv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    USub,
    UAdd,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrOp {
    Concat,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    RealToInteger,
    IntegerToReal,
    RealToReal,
    IntegerToInteger,
    RealToComplex,
    IntegerToComplex,
    IntegerToLogical,
    LogicalToReal,
    ComplexToComplex,
    ComplexToReal,
}

/// Radix of a BOZ literal constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boz {
    Binary,
    Hex,
    Octal,
}

impl Abi {
    pub fn as_str(self) -> &'static str {
        match self {
            Abi::Source => "Source",
            Abi::LFortranModule => "LFortranModule",
            Abi::GFortranModule => "GFortranModule",
            Abi::BindC => "BindC",
            Abi::Interactive => "Interactive",
            Abi::Intrinsic => "Intrinsic",
        }
    }
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "Public",
            Access::Private => "Private",
        }
    }
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Local => "Local",
            Intent::In => "In",
            Intent::Out => "Out",
            Intent::InOut => "InOut",
            Intent::ReturnVar => "ReturnVar",
            Intent::Unspecified => "Unspecified",
        }
    }
}

impl StorageType {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageType::Default => "Default",
            StorageType::Save => "Save",
            StorageType::Parameter => "Parameter",
            StorageType::Allocatable => "Allocatable",
        }
    }
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Required => "Required",
            Presence::Optional => "Optional",
        }
    }
}

impl Deftype {
    pub fn as_str(self) -> &'static str {
        match self {
            Deftype::Implementation => "Implementation",
            Deftype::Interface => "Interface",
        }
    }
}

impl BoolOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BoolOp::And => "And",
            BoolOp::Or => "Or",
            BoolOp::Xor => "Xor",
            BoolOp::Eqv => "Eqv",
            BoolOp::NEqv => "NEqv",
        }
    }
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "Add",
            BinOp::Sub => "Sub",
            BinOp::Mul => "Mul",
            BinOp::Div => "Div",
            BinOp::Pow => "Pow",
        }
    }
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "Not",
            UnaryOp::USub => "USub",
            UnaryOp::UAdd => "UAdd",
            UnaryOp::Invert => "Invert",
        }
    }
}

impl StrOp {
    pub fn as_str(self) -> &'static str {
        match self {
            StrOp::Concat => "Concat",
            StrOp::Repeat => "Repeat",
        }
    }
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "Eq",
            CmpOp::NotEq => "NotEq",
            CmpOp::Lt => "Lt",
            CmpOp::LtE => "LtE",
            CmpOp::Gt => "Gt",
            CmpOp::GtE => "GtE",
        }
    }
}

impl CastKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CastKind::RealToInteger => "RealToInteger",
            CastKind::IntegerToReal => "IntegerToReal",
            CastKind::RealToReal => "RealToReal",
            CastKind::IntegerToInteger => "IntegerToInteger",
            CastKind::RealToComplex => "RealToComplex",
            CastKind::IntegerToComplex => "IntegerToComplex",
            CastKind::IntegerToLogical => "IntegerToLogical",
            CastKind::LogicalToReal => "LogicalToReal",
            CastKind::ComplexToComplex => "ComplexToComplex",
            CastKind::ComplexToReal => "ComplexToReal",
        }
    }
}

impl Boz {
    pub fn as_str(self) -> &'static str {
        match self {
            Boz::Binary => "Binary",
            Boz::Hex => "Hex",
            Boz::Octal => "Octal",
        }
    }
}

/// One array dimension: a pair of optional bound expressions. Both bounds
/// absent models assumed/deferred shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub start: Option<Expr>,
    pub end: Option<Expr>,
}

/// Character length sentinel: compile-time length is `>= 0`, `-1` is
/// inferred, `-2` is allocatable, `-3` is a runtime expression carried in
/// `len_expr`.
pub const CHARACTER_LEN_INFERRED: i64 = -1;
pub const CHARACTER_LEN_ALLOCATABLE: i64 = -2;
pub const CHARACTER_LEN_RUNTIME: i64 = -3;

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeInteger {
    pub kind: u8,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeReal {
    pub kind: u8,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeComplex {
    pub kind: u8,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeCharacter {
    pub kind: u8,
    pub len: i64,
    pub len_expr: Option<Box<Expr>>,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeLogical {
    pub kind: u8,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeList {
    pub elem: Box<Ttype>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeSet {
    pub elem: Box<Ttype>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeTuple {
    pub elems: Vec<Ttype>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeDict {
    pub key: Box<Ttype>,
    pub value: Box<Ttype>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeDerived {
    pub symbol: SymbolId,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypeClass {
    pub symbol: SymbolId,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtypePointer {
    pub target: Box<Ttype>,
}

/// The type of an expression or variable. `kind` is the byte-width
/// precision selector of the numeric families.
#[derive(Debug, Clone, PartialEq)]
pub enum Ttype {
    Integer(TtypeInteger),
    Real(TtypeReal),
    Complex(TtypeComplex),
    Character(TtypeCharacter),
    Logical(TtypeLogical),
    List(TtypeList),
    Set(TtypeSet),
    Tuple(TtypeTuple),
    Dict(TtypeDict),
    Derived(TtypeDerived),
    Class(TtypeClass),
    Pointer(TtypePointer),
}

impl Ttype {
    pub fn integer(kind: u8) -> Self {
        Ttype::Integer(TtypeInteger {
            kind,
            dims: Vec::new(),
        })
    }

    pub fn real(kind: u8) -> Self {
        Ttype::Real(TtypeReal {
            kind,
            dims: Vec::new(),
        })
    }

    pub fn complex(kind: u8) -> Self {
        Ttype::Complex(TtypeComplex {
            kind,
            dims: Vec::new(),
        })
    }

    pub fn character(kind: u8, len: i64) -> Self {
        Ttype::Character(TtypeCharacter {
            kind,
            len,
            len_expr: None,
            dims: Vec::new(),
        })
    }

    pub fn logical() -> Self {
        Ttype::Logical(TtypeLogical {
            kind: 4,
            dims: Vec::new(),
        })
    }

    pub fn dims(&self) -> &[Dimension] {
        match self {
            Ttype::Integer(t) => &t.dims,
            Ttype::Real(t) => &t.dims,
            Ttype::Complex(t) => &t.dims,
            Ttype::Character(t) => &t.dims,
            Ttype::Logical(t) => &t.dims,
            Ttype::Derived(t) => &t.dims,
            Ttype::Class(t) => &t.dims,
            Ttype::List(_) | Ttype::Set(_) | Ttype::Tuple(_) | Ttype::Dict(_) | Ttype::Pointer(_) => {
                &[]
            }
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Ttype::Logical(_))
    }

    pub fn is_character(&self) -> bool {
        matches!(self, Ttype::Character(_))
    }

    /// Same type family and kind, ignoring dimensions and length. This is
    /// the compatibility the typed constructors enforce between operands
    /// and results; elaboration inserts `Cast` nodes to establish it.
    pub fn same_base(&self, other: &Ttype) -> bool {
        match (self, other) {
            (Ttype::Integer(a), Ttype::Integer(b)) => a.kind == b.kind,
            (Ttype::Real(a), Ttype::Real(b)) => a.kind == b.kind,
            (Ttype::Complex(a), Ttype::Complex(b)) => a.kind == b.kind,
            (Ttype::Character(a), Ttype::Character(b)) => a.kind == b.kind,
            (Ttype::Logical(a), Ttype::Logical(b)) => a.kind == b.kind,
            (Ttype::List(a), Ttype::List(b)) => a.elem.same_base(&b.elem),
            (Ttype::Set(a), Ttype::Set(b)) => a.elem.same_base(&b.elem),
            (Ttype::Tuple(a), Ttype::Tuple(b)) => {
                a.elems.len() == b.elems.len()
                    && a.elems
                        .iter()
                        .zip(&b.elems)
                        .all(|(x, y)| x.same_base(y))
            }
            (Ttype::Dict(a), Ttype::Dict(b)) => {
                a.key.same_base(&b.key) && a.value.same_base(&b.value)
            }
            (Ttype::Derived(a), Ttype::Derived(b)) => a.symbol == b.symbol,
            (Ttype::Class(a), Ttype::Class(b)) => a.symbol == b.symbol,
            (Ttype::Pointer(a), Ttype::Pointer(b)) => a.target.same_base(&b.target),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprBoolOp {
    pub left: Box<Expr>,
    pub op: BoolOp,
    pub right: Box<Expr>,
    pub ttype: Ttype,
    pub value: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprBinOp {
    pub left: Box<Expr>,
    pub op: BinOp,
    pub right: Box<Expr>,
    pub ttype: Ttype,
    pub value: Option<Box<Expr>>,
    pub overloaded: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprUnaryOp {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub ttype: Ttype,
    pub value: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStrOp {
    pub left: Box<Expr>,
    pub op: StrOp,
    pub right: Box<Expr>,
    pub ttype: Ttype,
    pub value: Option<Box<Expr>>,
    pub overloaded: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprCompare {
    pub left: Box<Expr>,
    pub op: CmpOp,
    pub right: Box<Expr>,
    pub ttype: Ttype,
    pub value: Option<Box<Expr>>,
    pub overloaded: Option<Box<Expr>>,
}

/// A call in expression position. `name` is the resolved target after
/// elaboration; `original_name` is the pre-resolution symbol (a
/// `GenericProcedure`, an `ExternalSymbol`, or absent) kept so pretty
/// printing can restore user-visible syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprFunctionCall {
    pub name: SymbolId,
    pub original_name: Option<SymbolId>,
    pub args: Vec<Expr>,
    pub ttype: Ttype,
    pub value: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprVar {
    pub sym: SymbolId,
    pub ttype: Ttype,
}

/// One subscript of an array reference; `left:right:step` section bounds,
/// all optional. A plain element index is carried in `right`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayIndex {
    pub left: Option<Expr>,
    pub right: Option<Expr>,
    pub step: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprArrayRef {
    pub sym: SymbolId,
    pub indices: Vec<ArrayIndex>,
    pub ttype: Ttype,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprDerivedRef {
    pub target: Box<Expr>,
    pub member: SymbolId,
    pub ttype: Ttype,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprCast {
    pub arg: Box<Expr>,
    pub kind: CastKind,
    pub ttype: Ttype,
    pub value: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprConstantInteger {
    pub n: i64,
    pub ttype: Ttype,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprConstantReal {
    pub r: f64,
    pub ttype: Ttype,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprConstantComplex {
    pub re: f64,
    pub im: f64,
    pub ttype: Ttype,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprConstantLogical {
    pub b: bool,
    pub ttype: Ttype,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprConstantString {
    pub s: String,
    pub ttype: Ttype,
}

/// An untyped-radix literal (`b'...'`, `z'...'`, `o'...'`); elaboration
/// rewrites it into a typed constant once the context type is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprBozConstant {
    pub n: u64,
    pub repr: Boz,
    pub ttype: Ttype,
}

/// An expression. Every variant carries its `ttype`; variants reachable by
/// constant folding additionally carry `value`, which must be a `Constant*`
/// node of the same type.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    BoolOp(ExprBoolOp),
    BinOp(ExprBinOp),
    UnaryOp(ExprUnaryOp),
    StrOp(ExprStrOp),
    Compare(ExprCompare),
    FunctionCall(ExprFunctionCall),
    Var(ExprVar),
    ArrayRef(ExprArrayRef),
    DerivedRef(ExprDerivedRef),
    Cast(ExprCast),
    ConstantInteger(ExprConstantInteger),
    ConstantReal(ExprConstantReal),
    ConstantComplex(ExprConstantComplex),
    ConstantLogical(ExprConstantLogical),
    ConstantString(ExprConstantString),
    BozConstant(ExprBozConstant),
}

impl Expr {
    pub fn ttype(&self) -> &Ttype {
        match self {
            Expr::BoolOp(e) => &e.ttype,
            Expr::BinOp(e) => &e.ttype,
            Expr::UnaryOp(e) => &e.ttype,
            Expr::StrOp(e) => &e.ttype,
            Expr::Compare(e) => &e.ttype,
            Expr::FunctionCall(e) => &e.ttype,
            Expr::Var(e) => &e.ttype,
            Expr::ArrayRef(e) => &e.ttype,
            Expr::DerivedRef(e) => &e.ttype,
            Expr::Cast(e) => &e.ttype,
            Expr::ConstantInteger(e) => &e.ttype,
            Expr::ConstantReal(e) => &e.ttype,
            Expr::ConstantComplex(e) => &e.ttype,
            Expr::ConstantLogical(e) => &e.ttype,
            Expr::ConstantString(e) => &e.ttype,
            Expr::BozConstant(e) => &e.ttype,
        }
    }

    /// Is this one of the `Constant*` nodes permitted in a `value` slot?
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Expr::ConstantInteger(_)
                | Expr::ConstantReal(_)
                | Expr::ConstantComplex(_)
                | Expr::ConstantLogical(_)
                | Expr::ConstantString(_)
        )
    }

    /// The folded compile-time value attached to this node, if any.
    pub fn value(&self) -> Option<&Expr> {
        match self {
            Expr::BoolOp(e) => e.value.as_deref(),
            Expr::BinOp(e) => e.value.as_deref(),
            Expr::UnaryOp(e) => e.value.as_deref(),
            Expr::StrOp(e) => e.value.as_deref(),
            Expr::Compare(e) => e.value.as_deref(),
            Expr::FunctionCall(e) => e.value.as_deref(),
            Expr::Cast(e) => e.value.as_deref(),
            _ => None,
        }
    }

    /// This node if it is a constant, else its attached folded value.
    pub fn compile_time_value(&self) -> Option<&Expr> {
        if self.is_constant() {
            Some(self)
        } else {
            self.value()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtAssignment {
    pub target: Expr,
    pub value: Expr,
}

/// A call in statement position; same resolved/original pairing as
/// [`ExprFunctionCall`].
#[derive(Debug, Clone, PartialEq)]
pub struct StmtSubroutineCall {
    pub name: SymbolId,
    pub original_name: Option<SymbolId>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtIf {
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtWhileLoop {
    pub test: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoLoopHead {
    pub var: Option<Expr>,
    pub start: Option<Expr>,
    pub end: Option<Expr>,
    pub increment: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtDoLoop {
    pub head: DoLoopHead,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseStmt {
    pub conditions: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtSelect {
    pub test: Expr,
    pub cases: Vec<CaseStmt>,
    pub default: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtStop {
    pub code: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtErrorStop {
    pub code: Option<Expr>,
}

/// Labelled jump; `id` pairs with a [`StmtGoToTarget`] of the same id,
/// unique within the enclosing procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct StmtGoTo {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtGoToTarget {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtPrint {
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtFileOpen {
    pub unit: Option<Expr>,
    pub file: Option<Expr>,
    pub status: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtFileClose {
    pub unit: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtFileRead {
    pub unit: Option<Expr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtFileWrite {
    pub unit: Option<Expr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtFileInquire {
    pub unit: Option<Expr>,
    pub file: Option<Expr>,
    pub exists: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtFileRewind {
    pub unit: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtFileFlush {
    pub unit: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocArg {
    pub sym: SymbolId,
    pub dims: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtAllocate {
    pub args: Vec<AllocArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtExplicitDeallocate {
    pub syms: Vec<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtImplicitDeallocate {
    pub syms: Vec<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtNullify {
    pub syms: Vec<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StmtAssert {
    pub test: Expr,
    pub msg: Option<Expr>,
}

/// An imperative statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assignment(StmtAssignment),
    SubroutineCall(StmtSubroutineCall),
    If(StmtIf),
    WhileLoop(StmtWhileLoop),
    DoLoop(StmtDoLoop),
    Select(StmtSelect),
    Cycle,
    Exit,
    Return,
    Stop(StmtStop),
    ErrorStop(StmtErrorStop),
    GoTo(StmtGoTo),
    GoToTarget(StmtGoToTarget),
    Print(StmtPrint),
    FileOpen(StmtFileOpen),
    FileClose(StmtFileClose),
    FileRead(StmtFileRead),
    FileWrite(StmtFileWrite),
    FileInquire(StmtFileInquire),
    FileRewind(StmtFileRewind),
    FileFlush(StmtFileFlush),
    Allocate(StmtAllocate),
    ExplicitDeallocate(StmtExplicitDeallocate),
    ImplicitDeallocate(StmtImplicitDeallocate),
    Nullify(StmtNullify),
    Assert(StmtAssert),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolProgram {
    pub name: Name,
    pub symtab: ScopeId,
    pub dependencies: Vec<Name>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolModule {
    pub name: Name,
    pub symtab: ScopeId,
    pub dependencies: Vec<Name>,
    /// Set when the module was grafted from a serialized interface file
    /// rather than elaborated from source in this unit.
    pub loaded_from_mod: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSubroutine {
    pub name: Name,
    pub symtab: ScopeId,
    pub args: Vec<SymbolId>,
    pub body: Vec<Stmt>,
    pub abi: Abi,
    pub access: Access,
    pub deftype: Deftype,
    pub bindc_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFunction {
    pub name: Name,
    pub symtab: ScopeId,
    pub args: Vec<SymbolId>,
    pub body: Vec<Stmt>,
    /// The `Variable` in this function's scope with intent `ReturnVar`;
    /// exactly one exists.
    pub return_var: SymbolId,
    pub abi: Abi,
    pub access: Access,
    pub deftype: Deftype,
    pub bindc_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGenericProcedure {
    pub parent_symtab: ScopeId,
    pub name: Name,
    pub procs: Vec<SymbolId>,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolCustomOperator {
    pub parent_symtab: ScopeId,
    pub name: Name,
    pub procs: Vec<SymbolId>,
    pub access: Access,
}

/// The single permitted handle to a symbol that is not reachable by
/// walking parent scopes from the referring site. `module_name` plus
/// `scope_names` is the declared path; `external` is the resolved target;
/// `original_name` keeps diagnostic provenance and disambiguates
/// `GenericProcedure` members.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolExternalSymbol {
    pub parent_symtab: ScopeId,
    pub name: Name,
    pub external: SymbolId,
    pub module_name: Name,
    pub scope_names: Vec<Name>,
    pub original_name: Name,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDerivedType {
    pub name: Name,
    pub symtab: ScopeId,
    /// Member names in declaration order; the member variables live in
    /// `symtab`.
    pub members: Vec<Name>,
    pub abi: Abi,
    pub access: Access,
    /// Parent type for extension; a `DerivedType`, possibly through an
    /// `ExternalSymbol`.
    pub parent: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolClassType {
    pub name: Name,
    pub symtab: ScopeId,
    pub abi: Abi,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolVariable {
    pub parent_symtab: ScopeId,
    pub name: Name,
    pub intent: Intent,
    pub symbolic_value: Option<Expr>,
    pub storage: StorageType,
    pub ttype: Ttype,
    pub abi: Abi,
    pub access: Access,
    pub presence: Presence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolClassProcedure {
    pub parent_symtab: ScopeId,
    pub name: Name,
    pub proc_name: Name,
    pub proc: SymbolId,
    pub abi: Abi,
}

/// A named entity. Every symbol either owns a local scope (`symtab`) or
/// records the scope it lives in (`parent_symtab`), never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Program(SymbolProgram),
    Module(SymbolModule),
    Subroutine(SymbolSubroutine),
    Function(SymbolFunction),
    GenericProcedure(SymbolGenericProcedure),
    CustomOperator(SymbolCustomOperator),
    ExternalSymbol(SymbolExternalSymbol),
    DerivedType(SymbolDerivedType),
    Variable(SymbolVariable),
    ClassType(SymbolClassType),
    ClassProcedure(SymbolClassProcedure),
}

impl Symbol {
    pub fn name(&self) -> &Name {
        match self {
            Symbol::Program(s) => &s.name,
            Symbol::Module(s) => &s.name,
            Symbol::Subroutine(s) => &s.name,
            Symbol::Function(s) => &s.name,
            Symbol::GenericProcedure(s) => &s.name,
            Symbol::CustomOperator(s) => &s.name,
            Symbol::ExternalSymbol(s) => &s.name,
            Symbol::DerivedType(s) => &s.name,
            Symbol::Variable(s) => &s.name,
            Symbol::ClassType(s) => &s.name,
            Symbol::ClassProcedure(s) => &s.name,
        }
    }

    /// The local scope this symbol owns, if it is scope-owning.
    pub fn symtab(&self) -> Option<ScopeId> {
        match self {
            Symbol::Program(s) => Some(s.symtab),
            Symbol::Module(s) => Some(s.symtab),
            Symbol::Subroutine(s) => Some(s.symtab),
            Symbol::Function(s) => Some(s.symtab),
            Symbol::DerivedType(s) => Some(s.symtab),
            Symbol::ClassType(s) => Some(s.symtab),
            Symbol::GenericProcedure(_)
            | Symbol::CustomOperator(_)
            | Symbol::ExternalSymbol(_)
            | Symbol::Variable(_)
            | Symbol::ClassProcedure(_) => None,
        }
    }

    /// The scope a scope-resident symbol lives in.
    pub fn parent_symtab(&self) -> Option<ScopeId> {
        match self {
            Symbol::GenericProcedure(s) => Some(s.parent_symtab),
            Symbol::CustomOperator(s) => Some(s.parent_symtab),
            Symbol::ExternalSymbol(s) => Some(s.parent_symtab),
            Symbol::Variable(s) => Some(s.parent_symtab),
            Symbol::ClassProcedure(s) => Some(s.parent_symtab),
            Symbol::Program(_)
            | Symbol::Module(_)
            | Symbol::Subroutine(_)
            | Symbol::Function(_)
            | Symbol::DerivedType(_)
            | Symbol::ClassType(_) => None,
        }
    }

    pub(crate) fn set_parent_symtab(&mut self, scope: ScopeId) {
        match self {
            Symbol::GenericProcedure(s) => s.parent_symtab = scope,
            Symbol::CustomOperator(s) => s.parent_symtab = scope,
            Symbol::ExternalSymbol(s) => s.parent_symtab = scope,
            Symbol::Variable(s) => s.parent_symtab = scope,
            Symbol::ClassProcedure(s) => s.parent_symtab = scope,
            _ => {}
        }
    }

    /// Declared visibility; symbols without an access field are public.
    pub fn access(&self) -> Access {
        match self {
            Symbol::Subroutine(s) => s.access,
            Symbol::Function(s) => s.access,
            Symbol::GenericProcedure(s) => s.access,
            Symbol::CustomOperator(s) => s.access,
            Symbol::ExternalSymbol(s) => s.access,
            Symbol::DerivedType(s) => s.access,
            Symbol::Variable(s) => s.access,
            Symbol::ClassType(s) => s.access,
            Symbol::Program(_) | Symbol::Module(_) | Symbol::ClassProcedure(_) => Access::Public,
        }
    }
}

/// A top-level item of a translation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitItem {
    Symbol(SymbolId),
    Stmt(Stmt),
    Expr(Expr),
}

/// One compilation input: a global scope, the arena owning every node
/// reachable from it, and the top-level items in source order.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub arena: Arena,
    pub global_scope: ScopeId,
    pub items: Vec<UnitItem>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let global_scope = arena.alloc_scope(None);
        Self {
            arena,
            global_scope,
            items: Vec::new(),
        }
    }
}

impl Default for TranslationUnit {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(Expr: Send, Sync);
static_assertions::assert_impl_all!(Stmt: Send, Sync);
static_assertions::assert_impl_all!(Symbol: Send, Sync);
static_assertions::assert_impl_all!(TranslationUnit: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_base_ignores_dims() {
        let scalar = Ttype::integer(4);
        let array = Ttype::Integer(TtypeInteger {
            kind: 4,
            dims: vec![Dimension {
                start: None,
                end: None,
            }],
        });

        assert!(scalar.same_base(&array));
        assert!(!scalar.same_base(&Ttype::integer(8)));
        assert!(!scalar.same_base(&Ttype::real(4)));
    }

    #[test]
    fn constant_nodes_are_constants() {
        let c = Expr::ConstantInteger(ExprConstantInteger {
            n: 3,
            ttype: Ttype::integer(4),
        });
        assert!(c.is_constant());
        assert_eq!(c.compile_time_value(), Some(&c));
    }

    #[test]
    fn pointer_same_base_compares_targets() {
        let a = Ttype::Pointer(TtypePointer {
            target: Box::new(Ttype::real(8)),
        });
        let b = Ttype::Pointer(TtypePointer {
            target: Box::new(Ttype::real(8)),
        });
        let c = Ttype::Pointer(TtypePointer {
            target: Box::new(Ttype::real(4)),
        });

        assert!(a.same_base(&b));
        assert!(!a.same_base(&c));
    }
}
