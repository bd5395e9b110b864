//! Wire tags of the encoding.
//!
//! Every enum of the algebra gets a fixed one-byte tag; the tables here
//! are the single place encoder and decoder agree on. The node universe
//! is closed, so a tag value is stable for the lifetime of a schema
//! version and any change here bumps `SCHEMA_VERSION`.

use ferrite_asr::nodes::{
    Abi, Access, BinOp, BoolOp, Boz, CastKind, CmpOp, Deftype, Intent, Presence, StorageType,
    StrOp, UnaryOp,
};

use crate::marshal::{DecodeError, Result};

pub(crate) mod sym {
    pub(crate) const PROGRAM: u8 = 0;
    pub(crate) const MODULE: u8 = 1;
    pub(crate) const SUBROUTINE: u8 = 2;
    pub(crate) const FUNCTION: u8 = 3;
    pub(crate) const GENERIC_PROCEDURE: u8 = 4;
    pub(crate) const CUSTOM_OPERATOR: u8 = 5;
    pub(crate) const EXTERNAL_SYMBOL: u8 = 6;
    pub(crate) const DERIVED_TYPE: u8 = 7;
    pub(crate) const VARIABLE: u8 = 8;
    pub(crate) const CLASS_TYPE: u8 = 9;
    pub(crate) const CLASS_PROCEDURE: u8 = 10;
}

pub(crate) mod expr {
    pub(crate) const BOOL_OP: u8 = 0;
    pub(crate) const BIN_OP: u8 = 1;
    pub(crate) const UNARY_OP: u8 = 2;
    pub(crate) const STR_OP: u8 = 3;
    pub(crate) const COMPARE: u8 = 4;
    pub(crate) const FUNCTION_CALL: u8 = 5;
    pub(crate) const VAR: u8 = 6;
    pub(crate) const ARRAY_REF: u8 = 7;
    pub(crate) const DERIVED_REF: u8 = 8;
    pub(crate) const CAST: u8 = 9;
    pub(crate) const CONSTANT_INTEGER: u8 = 10;
    pub(crate) const CONSTANT_REAL: u8 = 11;
    pub(crate) const CONSTANT_COMPLEX: u8 = 12;
    pub(crate) const CONSTANT_LOGICAL: u8 = 13;
    pub(crate) const CONSTANT_STRING: u8 = 14;
    pub(crate) const BOZ_CONSTANT: u8 = 15;
}

pub(crate) mod stmt {
    pub(crate) const ASSIGNMENT: u8 = 0;
    pub(crate) const SUBROUTINE_CALL: u8 = 1;
    pub(crate) const IF: u8 = 2;
    pub(crate) const WHILE_LOOP: u8 = 3;
    pub(crate) const DO_LOOP: u8 = 4;
    pub(crate) const SELECT: u8 = 5;
    pub(crate) const CYCLE: u8 = 6;
    pub(crate) const EXIT: u8 = 7;
    pub(crate) const RETURN: u8 = 8;
    pub(crate) const STOP: u8 = 9;
    pub(crate) const ERROR_STOP: u8 = 10;
    pub(crate) const GO_TO: u8 = 11;
    pub(crate) const GO_TO_TARGET: u8 = 12;
    pub(crate) const PRINT: u8 = 13;
    pub(crate) const FILE_OPEN: u8 = 14;
    pub(crate) const FILE_CLOSE: u8 = 15;
    pub(crate) const FILE_READ: u8 = 16;
    pub(crate) const FILE_WRITE: u8 = 17;
    pub(crate) const FILE_INQUIRE: u8 = 18;
    pub(crate) const FILE_REWIND: u8 = 19;
    pub(crate) const FILE_FLUSH: u8 = 20;
    pub(crate) const ALLOCATE: u8 = 21;
    pub(crate) const EXPLICIT_DEALLOCATE: u8 = 22;
    pub(crate) const IMPLICIT_DEALLOCATE: u8 = 23;
    pub(crate) const NULLIFY: u8 = 24;
    pub(crate) const ASSERT: u8 = 25;
}

pub(crate) mod ttype {
    pub(crate) const INTEGER: u8 = 0;
    pub(crate) const REAL: u8 = 1;
    pub(crate) const COMPLEX: u8 = 2;
    pub(crate) const CHARACTER: u8 = 3;
    pub(crate) const LOGICAL: u8 = 4;
    pub(crate) const LIST: u8 = 5;
    pub(crate) const SET: u8 = 6;
    pub(crate) const TUPLE: u8 = 7;
    pub(crate) const DICT: u8 = 8;
    pub(crate) const DERIVED: u8 = 9;
    pub(crate) const CLASS: u8 = 10;
    pub(crate) const POINTER: u8 = 11;
}

pub(crate) mod item {
    pub(crate) const SYMBOL: u8 = 0;
    pub(crate) const STMT: u8 = 1;
    pub(crate) const EXPR: u8 = 2;
}

macro_rules! enum_tags {
    ($to:ident, $from:ident, $what:literal, $ty:ty, [$($variant:ident = $tag:literal),+ $(,)?]) => {
        pub(crate) fn $to(value: $ty) -> u8 {
            match value {
                $(<$ty>::$variant => $tag,)+
            }
        }

        pub(crate) fn $from(tag: u8) -> Result<$ty> {
            match tag {
                $($tag => Ok(<$ty>::$variant),)+
                tag => Err(DecodeError::BadTag { what: $what, tag }),
            }
        }
    };
}

enum_tags!(abi_to_u8, abi_from_u8, "abi", Abi, [
    Source = 0,
    LFortranModule = 1,
    GFortranModule = 2,
    BindC = 3,
    Interactive = 4,
    Intrinsic = 5,
]);

enum_tags!(access_to_u8, access_from_u8, "access", Access, [
    Public = 0,
    Private = 1,
]);

enum_tags!(intent_to_u8, intent_from_u8, "intent", Intent, [
    Local = 0,
    In = 1,
    Out = 2,
    InOut = 3,
    ReturnVar = 4,
    Unspecified = 5,
]);

enum_tags!(storage_to_u8, storage_from_u8, "storage_type", StorageType, [
    Default = 0,
    Save = 1,
    Parameter = 2,
    Allocatable = 3,
]);

enum_tags!(presence_to_u8, presence_from_u8, "presence", Presence, [
    Required = 0,
    Optional = 1,
]);

enum_tags!(deftype_to_u8, deftype_from_u8, "deftype", Deftype, [
    Implementation = 0,
    Interface = 1,
]);

enum_tags!(boolop_to_u8, boolop_from_u8, "boolop", BoolOp, [
    And = 0,
    Or = 1,
    Xor = 2,
    Eqv = 3,
    NEqv = 4,
]);

enum_tags!(binop_to_u8, binop_from_u8, "binop", BinOp, [
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Pow = 4,
]);

enum_tags!(unaryop_to_u8, unaryop_from_u8, "unaryop", UnaryOp, [
    Not = 0,
    USub = 1,
    UAdd = 2,
    Invert = 3,
]);

enum_tags!(strop_to_u8, strop_from_u8, "strop", StrOp, [
    Concat = 0,
    Repeat = 1,
]);

enum_tags!(cmpop_to_u8, cmpop_from_u8, "cmpop", CmpOp, [
    Eq = 0,
    NotEq = 1,
    Lt = 2,
    LtE = 3,
    Gt = 4,
    GtE = 5,
]);

enum_tags!(cast_to_u8, cast_from_u8, "cast_kind", CastKind, [
    RealToInteger = 0,
    IntegerToReal = 1,
    RealToReal = 2,
    IntegerToInteger = 3,
    RealToComplex = 4,
    IntegerToComplex = 5,
    IntegerToLogical = 6,
    LogicalToReal = 7,
    ComplexToComplex = 8,
    ComplexToReal = 9,
]);

enum_tags!(boz_to_u8, boz_from_u8, "boz", Boz, [
    Binary = 0,
    Hex = 1,
    Octal = 2,
]);
