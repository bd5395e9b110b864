//! Serialized module interfaces for the ferrite compiler.
//!
//! A compact, versioned binary encoding of ASR ([`encode`], [`decode`]),
//! the on-disk `.fmod` module file format around it ([`modfile`]), and the
//! explicit module cache the driver threads through compilation
//! ([`cache`]). Importing a previously compiled module grafts its
//! interface ASR into the importing unit without reparsing its source.
//!
//! The encoding is canonical: for a well-formed unit `U`,
//! `decode(encode(U))` is structurally equal to `U` and re-encodes to the
//! same bytes.

pub mod cache;
pub mod decode;
pub mod encode;
pub mod marshal;
pub mod modfile;
mod tags;

pub use cache::ModuleCache;
pub use decode::decode;
pub use encode::{encode, ASR_MAGIC, SCHEMA_VERSION};
pub use marshal::DecodeError;
pub use modfile::{
    from_modfile_bytes, import_modfile_bytes, read_modfile, to_modfile_bytes, write_modfile,
    ModfileError, MODFILE_EXTENSION, MODFILE_MAGIC, MODFILE_VERSION, PRODUCER_FERRITE,
};
