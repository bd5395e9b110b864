//! The module cache.
//!
//! An explicit collaborator, not a singleton: the driver creates one per
//! search directory and threads it through compilation. A module file is
//! read and deserialized at most once per cache; importing it into a unit
//! grafts the cached interface ASR without reparsing any source. A failed
//! load caches nothing and evicts nothing.

use std::path::PathBuf;

use rustc_hash::FxHashMap;

use ferrite_asr::arena::SymbolId;
use ferrite_asr::nodes::TranslationUnit;
use ferrite_asr::Name;

use crate::modfile::{
    from_modfile_bytes, import_modfile_bytes, to_modfile_bytes, ModfileError, MODFILE_EXTENSION,
};

#[derive(Debug)]
pub struct ModuleCache {
    search_dir: PathBuf,
    loaded: FxHashMap<Name, TranslationUnit>,
}

impl ModuleCache {
    pub fn new(search_dir: impl Into<PathBuf>) -> Self {
        Self {
            search_dir: search_dir.into(),
            loaded: FxHashMap::default(),
        }
    }

    pub fn search_dir(&self) -> &std::path::Path {
        &self.search_dir
    }

    fn unit_for(&mut self, name: &str) -> Result<&TranslationUnit, ModfileError> {
        let key = Name::new(name);
        if !self.loaded.contains_key(&key) {
            let path = self
                .search_dir
                .join(format!("{name}.{MODFILE_EXTENSION}"));
            tracing::debug!(module = name, path = %path.display(), "loading module file");
            let bytes = std::fs::read(&path)?;
            let unit = from_modfile_bytes(&bytes)?;
            self.loaded.insert(key.clone(), unit);
        }
        Ok(&self.loaded[&key])
    }

    /// Returns `name`'s interface unit, deserializing the module file at
    /// most once for the lifetime of the cache.
    pub fn load(&mut self, name: &str) -> Result<TranslationUnit, ModfileError> {
        Ok(self.unit_for(name)?.clone())
    }

    /// Grafts `name`'s interface into `unit`, returning the module symbol.
    /// A module already present in the unit's global scope is returned
    /// as-is; the cache never duplicates a module within one unit. The
    /// graft re-encodes the cached unit, so the file on disk is touched
    /// once however many units import the module.
    pub fn import_into(
        &mut self,
        unit: &mut TranslationUnit,
        name: &str,
    ) -> Result<SymbolId, ModfileError> {
        if let Some(existing) = unit.arena.lookup_local(unit.global_scope, name) {
            return Ok(existing);
        }
        let bytes = to_modfile_bytes(self.unit_for(name)?)?;
        import_modfile_bytes(unit, &bytes)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(&Name::new(name))
    }
}
