//! The record catalog: structure-name hash to definition.
//!
//! Every top-level container header carries the CRC32C hash of the structure
//! name that follows it. Decoding resolves that hash here; an unknown hash is
//! fatal, since nothing downstream of a misidentified structure can be
//! trusted.

use std::hash::BuildHasherDefault;

use hashbrown::HashMap;
use rustc_hash::FxHasher;

use crate::def::StructDef;
use crate::{Error, Result};

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// A static table of registered structure definitions, keyed by name hash.
pub struct Catalog {
    by_hash: FxHashMap<u32, &'static StructDef>,
}

impl Catalog {
    /// Build a catalog from registered definitions.
    pub fn new(defs: &[&'static StructDef]) -> Self {
        let mut by_hash: FxHashMap<u32, &'static StructDef> = FxHashMap::default();
        for &def in defs {
            let previous = by_hash.insert(def.name_hash(), def);
            debug_assert!(
                previous.map_or(true, |p| p.name == def.name),
                "name hash collision between {} and {}",
                previous.map(|p| p.name).unwrap_or("?"),
                def.name,
            );
        }
        Self { by_hash }
    }

    /// Resolve a structure hash, failing fatally when absent.
    pub fn resolve(&self, hash: u32) -> Result<&'static StructDef> {
        self.by_hash
            .get(&hash)
            .copied()
            .ok_or(Error::UnknownStructHash { hash })
    }

    /// Look up a structure hash without failing.
    pub fn get(&self, hash: u32) -> Option<&'static StructDef> {
        self.by_hash.get(&hash).copied()
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Check whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Iterate over registered definitions.
    pub fn iter(&self) -> impl Iterator<Item = &'static StructDef> + '_ {
        self.by_hash.values().copied()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("definitions", &self.by_hash.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::Field;
    use crate::Codec;

    static PROBE_FIELDS: &[Field] = &[Field::plain("value", Codec::UInt32)];
    static PROBE_DEF: StructDef = StructDef::new("Probe", PROBE_FIELDS);

    #[test]
    fn test_resolve_known_hash() {
        let catalog = Catalog::new(&[&PROBE_DEF]);
        let def = catalog.resolve(PROBE_DEF.name_hash()).unwrap();
        assert_eq!(def.name, "Probe");
    }

    #[test]
    fn test_unknown_hash_is_fatal() {
        let catalog = Catalog::new(&[&PROBE_DEF]);
        assert!(matches!(
            catalog.resolve(0xDEAD_BEEF),
            Err(Error::UnknownStructHash { hash: 0xDEAD_BEEF })
        ));
    }
}
