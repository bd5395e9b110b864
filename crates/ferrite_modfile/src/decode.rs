//! The decoder.
//!
//! Reads the stream of `crate::encode` back into an arena. The header's
//! scope and symbol counts let the decoder pre-reserve one arena slot per
//! symbol, so forward references and cycles resolve to stable ids before
//! the referenced symbol's own fields are read. `ExternalSymbol` targets
//! are not in the stream; each one is recorded during the walk and
//! re-resolved from its declared path once the whole unit is in place.
//!
//! Readers refuse any schema version other than the one they implement;
//! there is no partial upgrade. A decode failure aborts the load of that
//! stream; previously loaded units are untouched.

use ferrite_asr::arena::{Arena, ScopeId, SymbolId};
use ferrite_asr::nodes::{
    AllocArg, ArrayIndex, CaseStmt, Dimension, DoLoopHead, Expr, ExprArrayRef, ExprBinOp,
    ExprBoolOp, ExprBozConstant, ExprCast, ExprCompare, ExprConstantComplex, ExprConstantInteger,
    ExprConstantLogical, ExprConstantReal, ExprConstantString, ExprDerivedRef, ExprFunctionCall,
    ExprStrOp, ExprUnaryOp, ExprVar, Stmt, StmtAllocate, StmtAssert, StmtAssignment,
    StmtDoLoop, StmtErrorStop, StmtExplicitDeallocate, StmtFileClose, StmtFileFlush,
    StmtFileInquire, StmtFileOpen, StmtFileRead, StmtFileRewind, StmtFileWrite, StmtGoTo,
    StmtGoToTarget, StmtIf, StmtImplicitDeallocate, StmtNullify, StmtPrint, StmtSelect,
    StmtStop, StmtSubroutineCall, StmtWhileLoop, Symbol, SymbolClassProcedure, SymbolClassType,
    SymbolCustomOperator, SymbolDerivedType, SymbolExternalSymbol, SymbolFunction,
    SymbolGenericProcedure, SymbolModule, SymbolProgram, SymbolSubroutine, SymbolVariable,
    Ttype, TtypeCharacter, TtypeClass, TtypeComplex, TtypeDerived, TtypeDict, TtypeInteger,
    TtypeList, TtypeLogical, TtypePointer, TtypeReal, TtypeSet, TtypeTuple, TranslationUnit,
    UnitItem,
};
use ferrite_asr::Name;

use crate::encode::{ASR_MAGIC, SCHEMA_VERSION};
use crate::marshal::{DecodeError, Read, Result};
use crate::tags;

/// Decodes a stream produced by `crate::encode::encode` into a fresh unit.
/// The left inverse of encoding: the result is structurally equal to the
/// encoded unit and re-encodes to the same bytes.
pub fn decode(bytes: &[u8]) -> Result<TranslationUnit> {
    let mut unit = TranslationUnit::new();
    let mut rdr: &[u8] = bytes;
    let items = decode_stream(&mut unit, &mut rdr)?;
    if rdr.remaining() != 0 {
        return Err(DecodeError::TrailingBytes(rdr.remaining()));
    }
    unit.items = items;
    Ok(unit)
}

/// Decodes a stream into an existing unit, inserting the stream's
/// top-level symbols into the unit's global scope. Used to graft module
/// interfaces; external symbols re-resolve against everything the unit
/// has already loaded. Returns the stream's top-level items.
pub(crate) fn decode_into(unit: &mut TranslationUnit, rdr: &mut &[u8]) -> Result<Vec<UnitItem>> {
    decode_stream(unit, rdr)
}

fn decode_stream(unit: &mut TranslationUnit, rdr: &mut &[u8]) -> Result<Vec<UnitItem>> {
    if rdr.read_slice(4)? != ASR_MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = rdr.read_u16()?;
    if version != SCHEMA_VERSION {
        return Err(DecodeError::SchemaMismatch {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }
    let scope_count = rdr.read_u32()? as usize;
    let symbol_count = rdr.read_u32()? as usize;
    tracing::trace!(symbols = symbol_count, scopes = scope_count, "decoding unit");

    let global_scope = unit.global_scope;
    let mut sym_map = Vec::with_capacity(symbol_count);
    for _ in 0..symbol_count {
        sym_map.push(unit.arena.reserve_symbol());
    }
    let mut decoder = Decoder {
        arena: &mut unit.arena,
        sym_map,
        next_symbol: 0,
        next_scope: 0,
        externals: Vec::new(),
    };

    decoder.scope(rdr, Some(global_scope), None)?;

    let item_count = rdr.read_u32()?;
    let mut items = Vec::with_capacity(item_count as usize);
    for _ in 0..item_count {
        let tag = rdr.read_u8()?;
        items.push(match tag {
            tags::item::SYMBOL => UnitItem::Symbol(decoder.sym_ref(rdr)?),
            tags::item::STMT => UnitItem::Stmt(decoder.stmt(rdr)?),
            tags::item::EXPR => UnitItem::Expr(decoder.expr(rdr)?),
            tag => return Err(DecodeError::BadTag { what: "item", tag }),
        });
    }

    if decoder.next_symbol != symbol_count {
        return Err(DecodeError::Corrupt("declared symbol count does not match"));
    }
    if decoder.next_scope != scope_count {
        return Err(DecodeError::Corrupt("declared scope count does not match"));
    }

    let externals = std::mem::take(&mut decoder.externals);
    drop(decoder);
    for ext in externals {
        let target = unit
            .arena
            .resolve_external(global_scope, ext)
            .map_err(|_| {
                let Symbol::ExternalSymbol(e) = unit.arena.symbol(ext) else {
                    unreachable!("recorded fixup is not an external symbol");
                };
                DecodeError::UnresolvedExternal {
                    module: e.module_name.to_string(),
                    name: e.original_name.to_string(),
                }
            })?;
        let Symbol::ExternalSymbol(e) = unit.arena.symbol_mut(ext) else {
            unreachable!("recorded fixup is not an external symbol");
        };
        e.external = target;
    }

    Ok(items)
}

struct Decoder<'a> {
    arena: &'a mut Arena,
    /// ordinal -> pre-reserved arena id
    sym_map: Vec<SymbolId>,
    next_symbol: usize,
    next_scope: usize,
    /// external symbols whose `external` field awaits path re-resolution
    externals: Vec<SymbolId>,
}

impl Decoder<'_> {
    fn sym_ref<R: Read>(&mut self, rdr: &mut R) -> Result<SymbolId> {
        let ordinal = rdr.read_u32()?;
        self.sym_map
            .get(ordinal as usize)
            .copied()
            .ok_or(DecodeError::BadOrdinal {
                what: "symbol",
                ordinal,
            })
    }

    fn opt_sym_ref<R: Read>(&mut self, rdr: &mut R) -> Result<Option<SymbolId>> {
        match rdr.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.sym_ref(rdr)?)),
            tag => Err(DecodeError::BadTag {
                what: "presence flag",
                tag,
            }),
        }
    }

    fn sym_refs<R: Read>(&mut self, rdr: &mut R) -> Result<Vec<SymbolId>> {
        let len = rdr.read_u32()?;
        (0..len).map(|_| self.sym_ref(rdr)).collect()
    }

    fn name<R: Read>(&mut self, rdr: &mut R) -> Result<Name> {
        Ok(Name::new(rdr.read_string()?.as_str()))
    }

    fn names<R: Read>(&mut self, rdr: &mut R) -> Result<Vec<Name>> {
        let len = rdr.read_u32()?;
        (0..len).map(|_| self.name(rdr)).collect()
    }

    fn opt_str<R: Read>(&mut self, rdr: &mut R) -> Result<Option<String>> {
        match rdr.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(rdr.read_string()?)),
            tag => Err(DecodeError::BadTag {
                what: "presence flag",
                tag,
            }),
        }
    }

    fn scope<R: Read>(
        &mut self,
        rdr: &mut R,
        existing: Option<ScopeId>,
        parent: Option<ScopeId>,
    ) -> Result<ScopeId> {
        let scope = match existing {
            Some(scope) => scope,
            None => self.arena.alloc_scope(parent),
        };
        self.next_scope += 1;
        let count = rdr.read_u32()?;
        for _ in 0..count {
            let sym = self.symbol(rdr, scope)?;
            self.arena
                .insert(scope, sym)
                .map_err(|_| DecodeError::Corrupt("duplicate name in a scope"))?;
        }
        Ok(scope)
    }

    fn symbol<R: Read>(&mut self, rdr: &mut R, scope: ScopeId) -> Result<SymbolId> {
        let ordinal = self.next_symbol;
        self.next_symbol += 1;
        let id = self
            .sym_map
            .get(ordinal)
            .copied()
            .ok_or(DecodeError::Corrupt("more symbols than declared"))?;

        let tag = rdr.read_u8()?;
        let symbol = match tag {
            tags::sym::PROGRAM => {
                let name = self.name(rdr)?;
                let symtab = self.scope(rdr, None, Some(scope))?;
                let dependencies = self.names(rdr)?;
                let body = self.stmts(rdr)?;
                Symbol::Program(SymbolProgram {
                    name,
                    symtab,
                    dependencies,
                    body,
                })
            }
            tags::sym::MODULE => {
                let name = self.name(rdr)?;
                let symtab = self.scope(rdr, None, Some(scope))?;
                let dependencies = self.names(rdr)?;
                let loaded_from_mod = rdr.read_bool()?;
                Symbol::Module(SymbolModule {
                    name,
                    symtab,
                    dependencies,
                    loaded_from_mod,
                })
            }
            tags::sym::SUBROUTINE => {
                let name = self.name(rdr)?;
                let symtab = self.scope(rdr, None, Some(scope))?;
                let args = self.sym_refs(rdr)?;
                let body = self.stmts(rdr)?;
                let abi = tags::abi_from_u8(rdr.read_u8()?)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                let deftype = tags::deftype_from_u8(rdr.read_u8()?)?;
                let bindc_name = self.opt_str(rdr)?;
                Symbol::Subroutine(SymbolSubroutine {
                    name,
                    symtab,
                    args,
                    body,
                    abi,
                    access,
                    deftype,
                    bindc_name,
                })
            }
            tags::sym::FUNCTION => {
                let name = self.name(rdr)?;
                let symtab = self.scope(rdr, None, Some(scope))?;
                let args = self.sym_refs(rdr)?;
                let body = self.stmts(rdr)?;
                let return_var = self.sym_ref(rdr)?;
                let abi = tags::abi_from_u8(rdr.read_u8()?)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                let deftype = tags::deftype_from_u8(rdr.read_u8()?)?;
                let bindc_name = self.opt_str(rdr)?;
                Symbol::Function(SymbolFunction {
                    name,
                    symtab,
                    args,
                    body,
                    return_var,
                    abi,
                    access,
                    deftype,
                    bindc_name,
                })
            }
            tags::sym::GENERIC_PROCEDURE => {
                let name = self.name(rdr)?;
                let procs = self.sym_refs(rdr)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                Symbol::GenericProcedure(SymbolGenericProcedure {
                    parent_symtab: scope,
                    name,
                    procs,
                    access,
                })
            }
            tags::sym::CUSTOM_OPERATOR => {
                let name = self.name(rdr)?;
                let procs = self.sym_refs(rdr)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                Symbol::CustomOperator(SymbolCustomOperator {
                    parent_symtab: scope,
                    name,
                    procs,
                    access,
                })
            }
            tags::sym::EXTERNAL_SYMBOL => {
                let name = self.name(rdr)?;
                let module_name = self.name(rdr)?;
                let scope_names = self.names(rdr)?;
                let original_name = self.name(rdr)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                // `external` re-resolves after the walk; self until then
                self.externals.push(id);
                Symbol::ExternalSymbol(SymbolExternalSymbol {
                    parent_symtab: scope,
                    name,
                    external: id,
                    module_name,
                    scope_names,
                    original_name,
                    access,
                })
            }
            tags::sym::DERIVED_TYPE => {
                let name = self.name(rdr)?;
                let symtab = self.scope(rdr, None, Some(scope))?;
                let members = self.names(rdr)?;
                let abi = tags::abi_from_u8(rdr.read_u8()?)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                let parent = self.opt_sym_ref(rdr)?;
                Symbol::DerivedType(SymbolDerivedType {
                    name,
                    symtab,
                    members,
                    abi,
                    access,
                    parent,
                })
            }
            tags::sym::VARIABLE => {
                let name = self.name(rdr)?;
                let intent = tags::intent_from_u8(rdr.read_u8()?)?;
                let symbolic_value = self.opt_expr(rdr)?;
                let storage = tags::storage_from_u8(rdr.read_u8()?)?;
                let ttype = self.ttype(rdr)?;
                let abi = tags::abi_from_u8(rdr.read_u8()?)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                let presence = tags::presence_from_u8(rdr.read_u8()?)?;
                Symbol::Variable(SymbolVariable {
                    parent_symtab: scope,
                    name,
                    intent,
                    symbolic_value,
                    storage,
                    ttype,
                    abi,
                    access,
                    presence,
                })
            }
            tags::sym::CLASS_TYPE => {
                let name = self.name(rdr)?;
                let symtab = self.scope(rdr, None, Some(scope))?;
                let abi = tags::abi_from_u8(rdr.read_u8()?)?;
                let access = tags::access_from_u8(rdr.read_u8()?)?;
                Symbol::ClassType(SymbolClassType {
                    name,
                    symtab,
                    abi,
                    access,
                })
            }
            tags::sym::CLASS_PROCEDURE => {
                let name = self.name(rdr)?;
                let proc_name = self.name(rdr)?;
                let proc = self.sym_ref(rdr)?;
                let abi = tags::abi_from_u8(rdr.read_u8()?)?;
                Symbol::ClassProcedure(SymbolClassProcedure {
                    parent_symtab: scope,
                    name,
                    proc_name,
                    proc,
                    abi,
                })
            }
            tag => return Err(DecodeError::BadTag { what: "symbol", tag }),
        };
        self.arena.fill_symbol(id, symbol);
        Ok(id)
    }

    fn opt_expr<R: Read>(&mut self, rdr: &mut R) -> Result<Option<Expr>> {
        match rdr.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.expr(rdr)?)),
            tag => Err(DecodeError::BadTag {
                what: "presence flag",
                tag,
            }),
        }
    }

    fn opt_boxed_expr<R: Read>(&mut self, rdr: &mut R) -> Result<Option<Box<Expr>>> {
        Ok(self.opt_expr(rdr)?.map(Box::new))
    }

    fn exprs<R: Read>(&mut self, rdr: &mut R) -> Result<Vec<Expr>> {
        let len = rdr.read_u32()?;
        (0..len).map(|_| self.expr(rdr)).collect()
    }

    fn stmts<R: Read>(&mut self, rdr: &mut R) -> Result<Vec<Stmt>> {
        let len = rdr.read_u32()?;
        (0..len).map(|_| self.stmt(rdr)).collect()
    }

    fn dims<R: Read>(&mut self, rdr: &mut R) -> Result<Vec<Dimension>> {
        let len = rdr.read_u32()?;
        (0..len)
            .map(|_| {
                Ok(Dimension {
                    start: self.opt_expr(rdr)?,
                    end: self.opt_expr(rdr)?,
                })
            })
            .collect()
    }

    fn ttype<R: Read>(&mut self, rdr: &mut R) -> Result<Ttype> {
        let tag = rdr.read_u8()?;
        Ok(match tag {
            tags::ttype::INTEGER => Ttype::Integer(TtypeInteger {
                kind: rdr.read_u8()?,
                dims: self.dims(rdr)?,
            }),
            tags::ttype::REAL => Ttype::Real(TtypeReal {
                kind: rdr.read_u8()?,
                dims: self.dims(rdr)?,
            }),
            tags::ttype::COMPLEX => Ttype::Complex(TtypeComplex {
                kind: rdr.read_u8()?,
                dims: self.dims(rdr)?,
            }),
            tags::ttype::CHARACTER => {
                let kind = rdr.read_u8()?;
                let len = rdr.read_i64()?;
                let len_expr = self.opt_boxed_expr(rdr)?;
                let dims = self.dims(rdr)?;
                Ttype::Character(TtypeCharacter {
                    kind,
                    len,
                    len_expr,
                    dims,
                })
            }
            tags::ttype::LOGICAL => Ttype::Logical(TtypeLogical {
                kind: rdr.read_u8()?,
                dims: self.dims(rdr)?,
            }),
            tags::ttype::LIST => Ttype::List(TtypeList {
                elem: Box::new(self.ttype(rdr)?),
            }),
            tags::ttype::SET => Ttype::Set(TtypeSet {
                elem: Box::new(self.ttype(rdr)?),
            }),
            tags::ttype::TUPLE => {
                let len = rdr.read_u32()?;
                Ttype::Tuple(TtypeTuple {
                    elems: (0..len).map(|_| self.ttype(rdr)).collect::<Result<_>>()?,
                })
            }
            tags::ttype::DICT => Ttype::Dict(TtypeDict {
                key: Box::new(self.ttype(rdr)?),
                value: Box::new(self.ttype(rdr)?),
            }),
            tags::ttype::DERIVED => Ttype::Derived(TtypeDerived {
                symbol: self.sym_ref(rdr)?,
                dims: self.dims(rdr)?,
            }),
            tags::ttype::CLASS => Ttype::Class(TtypeClass {
                symbol: self.sym_ref(rdr)?,
                dims: self.dims(rdr)?,
            }),
            tags::ttype::POINTER => Ttype::Pointer(TtypePointer {
                target: Box::new(self.ttype(rdr)?),
            }),
            tag => return Err(DecodeError::BadTag { what: "ttype", tag }),
        })
    }

    fn array_index<R: Read>(&mut self, rdr: &mut R) -> Result<ArrayIndex> {
        Ok(ArrayIndex {
            left: self.opt_expr(rdr)?,
            right: self.opt_expr(rdr)?,
            step: self.opt_expr(rdr)?,
        })
    }

    fn expr<R: Read>(&mut self, rdr: &mut R) -> Result<Expr> {
        let tag = rdr.read_u8()?;
        Ok(match tag {
            tags::expr::BOOL_OP => {
                let left = Box::new(self.expr(rdr)?);
                let op = tags::boolop_from_u8(rdr.read_u8()?)?;
                let right = Box::new(self.expr(rdr)?);
                let ttype = self.ttype(rdr)?;
                let value = self.opt_boxed_expr(rdr)?;
                Expr::BoolOp(ExprBoolOp {
                    left,
                    op,
                    right,
                    ttype,
                    value,
                })
            }
            tags::expr::BIN_OP => {
                let left = Box::new(self.expr(rdr)?);
                let op = tags::binop_from_u8(rdr.read_u8()?)?;
                let right = Box::new(self.expr(rdr)?);
                let ttype = self.ttype(rdr)?;
                let value = self.opt_boxed_expr(rdr)?;
                let overloaded = self.opt_boxed_expr(rdr)?;
                Expr::BinOp(ExprBinOp {
                    left,
                    op,
                    right,
                    ttype,
                    value,
                    overloaded,
                })
            }
            tags::expr::UNARY_OP => {
                let op = tags::unaryop_from_u8(rdr.read_u8()?)?;
                let operand = Box::new(self.expr(rdr)?);
                let ttype = self.ttype(rdr)?;
                let value = self.opt_boxed_expr(rdr)?;
                Expr::UnaryOp(ExprUnaryOp {
                    op,
                    operand,
                    ttype,
                    value,
                })
            }
            tags::expr::STR_OP => {
                let left = Box::new(self.expr(rdr)?);
                let op = tags::strop_from_u8(rdr.read_u8()?)?;
                let right = Box::new(self.expr(rdr)?);
                let ttype = self.ttype(rdr)?;
                let value = self.opt_boxed_expr(rdr)?;
                let overloaded = self.opt_boxed_expr(rdr)?;
                Expr::StrOp(ExprStrOp {
                    left,
                    op,
                    right,
                    ttype,
                    value,
                    overloaded,
                })
            }
            tags::expr::COMPARE => {
                let left = Box::new(self.expr(rdr)?);
                let op = tags::cmpop_from_u8(rdr.read_u8()?)?;
                let right = Box::new(self.expr(rdr)?);
                let ttype = self.ttype(rdr)?;
                let value = self.opt_boxed_expr(rdr)?;
                let overloaded = self.opt_boxed_expr(rdr)?;
                Expr::Compare(ExprCompare {
                    left,
                    op,
                    right,
                    ttype,
                    value,
                    overloaded,
                })
            }
            tags::expr::FUNCTION_CALL => {
                let name = self.sym_ref(rdr)?;
                let original_name = self.opt_sym_ref(rdr)?;
                let args = self.exprs(rdr)?;
                let ttype = self.ttype(rdr)?;
                let value = self.opt_boxed_expr(rdr)?;
                Expr::FunctionCall(ExprFunctionCall {
                    name,
                    original_name,
                    args,
                    ttype,
                    value,
                })
            }
            tags::expr::VAR => Expr::Var(ExprVar {
                sym: self.sym_ref(rdr)?,
                ttype: self.ttype(rdr)?,
            }),
            tags::expr::ARRAY_REF => {
                let sym = self.sym_ref(rdr)?;
                let len = rdr.read_u32()?;
                let indices = (0..len)
                    .map(|_| self.array_index(rdr))
                    .collect::<Result<_>>()?;
                let ttype = self.ttype(rdr)?;
                Expr::ArrayRef(ExprArrayRef { sym, indices, ttype })
            }
            tags::expr::DERIVED_REF => {
                let target = Box::new(self.expr(rdr)?);
                let member = self.sym_ref(rdr)?;
                let ttype = self.ttype(rdr)?;
                Expr::DerivedRef(ExprDerivedRef {
                    target,
                    member,
                    ttype,
                })
            }
            tags::expr::CAST => {
                let arg = Box::new(self.expr(rdr)?);
                let kind = tags::cast_from_u8(rdr.read_u8()?)?;
                let ttype = self.ttype(rdr)?;
                let value = self.opt_boxed_expr(rdr)?;
                Expr::Cast(ExprCast {
                    arg,
                    kind,
                    ttype,
                    value,
                })
            }
            tags::expr::CONSTANT_INTEGER => Expr::ConstantInteger(ExprConstantInteger {
                n: rdr.read_i64()?,
                ttype: self.ttype(rdr)?,
            }),
            tags::expr::CONSTANT_REAL => Expr::ConstantReal(ExprConstantReal {
                r: rdr.read_f64()?,
                ttype: self.ttype(rdr)?,
            }),
            tags::expr::CONSTANT_COMPLEX => Expr::ConstantComplex(ExprConstantComplex {
                re: rdr.read_f64()?,
                im: rdr.read_f64()?,
                ttype: self.ttype(rdr)?,
            }),
            tags::expr::CONSTANT_LOGICAL => Expr::ConstantLogical(ExprConstantLogical {
                b: rdr.read_bool()?,
                ttype: self.ttype(rdr)?,
            }),
            tags::expr::CONSTANT_STRING => Expr::ConstantString(ExprConstantString {
                s: rdr.read_string()?,
                ttype: self.ttype(rdr)?,
            }),
            tags::expr::BOZ_CONSTANT => Expr::BozConstant(ExprBozConstant {
                n: rdr.read_u64()?,
                repr: tags::boz_from_u8(rdr.read_u8()?)?,
                ttype: self.ttype(rdr)?,
            }),
            tag => return Err(DecodeError::BadTag { what: "expr", tag }),
        })
    }

    fn do_loop_head<R: Read>(&mut self, rdr: &mut R) -> Result<DoLoopHead> {
        Ok(DoLoopHead {
            var: self.opt_expr(rdr)?,
            start: self.opt_expr(rdr)?,
            end: self.opt_expr(rdr)?,
            increment: self.opt_expr(rdr)?,
        })
    }

    fn stmt<R: Read>(&mut self, rdr: &mut R) -> Result<Stmt> {
        let tag = rdr.read_u8()?;
        Ok(match tag {
            tags::stmt::ASSIGNMENT => Stmt::Assignment(StmtAssignment {
                target: self.expr(rdr)?,
                value: self.expr(rdr)?,
            }),
            tags::stmt::SUBROUTINE_CALL => Stmt::SubroutineCall(StmtSubroutineCall {
                name: self.sym_ref(rdr)?,
                original_name: self.opt_sym_ref(rdr)?,
                args: self.exprs(rdr)?,
            }),
            tags::stmt::IF => Stmt::If(StmtIf {
                test: self.expr(rdr)?,
                body: self.stmts(rdr)?,
                orelse: self.stmts(rdr)?,
            }),
            tags::stmt::WHILE_LOOP => Stmt::WhileLoop(StmtWhileLoop {
                test: self.expr(rdr)?,
                body: self.stmts(rdr)?,
            }),
            tags::stmt::DO_LOOP => Stmt::DoLoop(StmtDoLoop {
                head: self.do_loop_head(rdr)?,
                body: self.stmts(rdr)?,
            }),
            tags::stmt::SELECT => {
                let test = self.expr(rdr)?;
                let len = rdr.read_u32()?;
                let cases = (0..len)
                    .map(|_| {
                        Ok(CaseStmt {
                            conditions: self.exprs(rdr)?,
                            body: self.stmts(rdr)?,
                        })
                    })
                    .collect::<Result<_>>()?;
                let default = self.stmts(rdr)?;
                Stmt::Select(StmtSelect {
                    test,
                    cases,
                    default,
                })
            }
            tags::stmt::CYCLE => Stmt::Cycle,
            tags::stmt::EXIT => Stmt::Exit,
            tags::stmt::RETURN => Stmt::Return,
            tags::stmt::STOP => Stmt::Stop(StmtStop {
                code: self.opt_expr(rdr)?,
            }),
            tags::stmt::ERROR_STOP => Stmt::ErrorStop(StmtErrorStop {
                code: self.opt_expr(rdr)?,
            }),
            tags::stmt::GO_TO => Stmt::GoTo(StmtGoTo {
                id: rdr.read_u64()?,
            }),
            tags::stmt::GO_TO_TARGET => Stmt::GoToTarget(StmtGoToTarget {
                id: rdr.read_u64()?,
            }),
            tags::stmt::PRINT => Stmt::Print(StmtPrint {
                values: self.exprs(rdr)?,
            }),
            tags::stmt::FILE_OPEN => Stmt::FileOpen(StmtFileOpen {
                unit: self.opt_expr(rdr)?,
                file: self.opt_expr(rdr)?,
                status: self.opt_expr(rdr)?,
            }),
            tags::stmt::FILE_CLOSE => Stmt::FileClose(StmtFileClose {
                unit: self.opt_expr(rdr)?,
            }),
            tags::stmt::FILE_READ => Stmt::FileRead(StmtFileRead {
                unit: self.opt_expr(rdr)?,
                values: self.exprs(rdr)?,
            }),
            tags::stmt::FILE_WRITE => Stmt::FileWrite(StmtFileWrite {
                unit: self.opt_expr(rdr)?,
                values: self.exprs(rdr)?,
            }),
            tags::stmt::FILE_INQUIRE => Stmt::FileInquire(StmtFileInquire {
                unit: self.opt_expr(rdr)?,
                file: self.opt_expr(rdr)?,
                exists: self.opt_expr(rdr)?,
            }),
            tags::stmt::FILE_REWIND => Stmt::FileRewind(StmtFileRewind {
                unit: self.opt_expr(rdr)?,
            }),
            tags::stmt::FILE_FLUSH => Stmt::FileFlush(StmtFileFlush {
                unit: self.opt_expr(rdr)?,
            }),
            tags::stmt::ALLOCATE => {
                let len = rdr.read_u32()?;
                let args = (0..len)
                    .map(|_| {
                        Ok(AllocArg {
                            sym: self.sym_ref(rdr)?,
                            dims: self.dims(rdr)?,
                        })
                    })
                    .collect::<Result<_>>()?;
                Stmt::Allocate(StmtAllocate { args })
            }
            tags::stmt::EXPLICIT_DEALLOCATE => Stmt::ExplicitDeallocate(StmtExplicitDeallocate {
                syms: self.sym_refs(rdr)?,
            }),
            tags::stmt::IMPLICIT_DEALLOCATE => Stmt::ImplicitDeallocate(StmtImplicitDeallocate {
                syms: self.sym_refs(rdr)?,
            }),
            tags::stmt::NULLIFY => Stmt::Nullify(StmtNullify {
                syms: self.sym_refs(rdr)?,
            }),
            tags::stmt::ASSERT => Stmt::Assert(StmtAssert {
                test: self.expr(rdr)?,
                msg: self.opt_expr(rdr)?,
            }),
            tag => return Err(DecodeError::BadTag { what: "stmt", tag }),
        })
    }
}
