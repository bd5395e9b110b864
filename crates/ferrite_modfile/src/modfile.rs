//! The on-disk module interface format.
//!
//! A `.fmod` file is an 8-byte header — 4-byte magic, `u16` format
//! version, `u16` producer id — followed by one encoded unit whose single
//! item is a module in interface form. No trailing data is permitted.

use std::path::Path;

use ferrite_asr::arena::SymbolId;
use ferrite_asr::nodes::{Symbol, TranslationUnit, UnitItem};

use crate::decode::{decode, decode_into};
use crate::encode::encode;
use crate::marshal::{DecodeError, Read, Write};

pub const MODFILE_MAGIC: &[u8; 4] = b"FMOD";
pub const MODFILE_VERSION: u16 = 1;
/// Producer id this toolchain stamps into the header. Readers accept any
/// producer; the id is provenance, not negotiation.
pub const PRODUCER_FERRITE: u16 = 1;
pub const MODFILE_EXTENSION: &str = "fmod";

#[derive(Debug, thiserror::Error)]
pub enum ModfileError {
    #[error("failed to read module file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unit is not a single module in interface form")]
    NotAModule,
}

/// The module symbol of a unit holding exactly one module, which is what a
/// module file is allowed to contain.
fn single_module(unit: &TranslationUnit) -> Option<SymbolId> {
    match unit.items.as_slice() {
        [UnitItem::Symbol(sym)] if matches!(unit.arena.symbol(*sym), Symbol::Module(_)) => {
            Some(*sym)
        }
        _ => None,
    }
}

pub fn to_modfile_bytes(unit: &TranslationUnit) -> Result<Vec<u8>, ModfileError> {
    single_module(unit).ok_or(ModfileError::NotAModule)?;
    let mut buf = Vec::new();
    buf.write_slice(MODFILE_MAGIC);
    buf.write_u16(MODFILE_VERSION);
    buf.write_u16(PRODUCER_FERRITE);
    buf.write_slice(&encode(unit));
    Ok(buf)
}

fn read_header(rdr: &mut &[u8]) -> Result<u16, ModfileError> {
    if rdr.read_slice(4)? != MODFILE_MAGIC {
        return Err(DecodeError::BadMagic.into());
    }
    let version = rdr.read_u16()?;
    if version != MODFILE_VERSION {
        return Err(DecodeError::SchemaMismatch {
            found: version,
            supported: MODFILE_VERSION,
        }
        .into());
    }
    Ok(rdr.read_u16()?)
}

pub fn from_modfile_bytes(bytes: &[u8]) -> Result<TranslationUnit, ModfileError> {
    let mut rdr: &[u8] = bytes;
    let producer = read_header(&mut rdr)?;
    tracing::debug!(producer, "reading module interface");
    let unit = decode(rdr)?;
    single_module(&unit).ok_or(ModfileError::NotAModule)?;
    Ok(unit)
}

/// Grafts the module of a module file into `unit`'s global scope, marking
/// it as loaded from a module file. External symbols in the interface
/// re-resolve against modules already present in the unit, so
/// dependencies must be imported first.
///
/// A failed import aborts the load of this module and leaves other units
/// untouched; the importing unit may hold a partial graft and its
/// compilation is abandoned with the error.
pub fn import_modfile_bytes(
    unit: &mut TranslationUnit,
    bytes: &[u8],
) -> Result<SymbolId, ModfileError> {
    let mut rdr: &[u8] = bytes;
    let producer = read_header(&mut rdr)?;
    tracing::debug!(producer, "importing module interface");
    let items = decode_into(unit, &mut rdr)?;
    if rdr.remaining() != 0 {
        return Err(DecodeError::TrailingBytes(rdr.remaining()).into());
    }
    let [UnitItem::Symbol(module)] = items.as_slice() else {
        return Err(ModfileError::NotAModule);
    };
    let Symbol::Module(m) = unit.arena.symbol_mut(*module) else {
        return Err(ModfileError::NotAModule);
    };
    m.loaded_from_mod = true;
    Ok(*module)
}

pub fn write_modfile(path: &Path, unit: &TranslationUnit) -> Result<(), ModfileError> {
    let bytes = to_modfile_bytes(unit)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "writing module file");
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn read_modfile(path: &Path) -> Result<TranslationUnit, ModfileError> {
    tracing::debug!(path = %path.display(), "reading module file");
    let bytes = std::fs::read(path)?;
    from_modfile_bytes(&bytes)
}
