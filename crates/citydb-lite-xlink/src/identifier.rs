// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier Resolver - symbolic identifiers to committed row ids
//!
//! The import layer registers every symbolic identifier it writes. An entry
//! either points at a row directly, aliases another identifier, or names a
//! surface member that is only reachable through `(root_id, gml_id)`.
//! Resolution follows alias chains as an explicit worklist and falls back
//! to a live query against the feature tables.

use citydb_lite_model::{normalize_gml_id, CityDatabase, IdType, ObjectClass, Result, RowId};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Cached resolution of one symbolic identifier
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdCacheEntry {
    /// Resolved row, `None` while only an alias or a member is known
    pub id: Option<RowId>,
    /// Root of the geometry tree the row belongs to
    pub root_id: Option<RowId>,
    pub reverse: bool,
    /// Symbolic identifier this entry aliases
    pub mapping: Option<String>,
    pub object_class: Option<ObjectClass>,
}

impl IdCacheEntry {
    /// Entry for a committed row
    pub fn resolved(id: RowId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    /// Entry for a committed surface row
    pub fn geometry(id: RowId, root_id: RowId, reverse: bool) -> Self {
        Self {
            id: Some(id),
            root_id: Some(root_id),
            reverse,
            ..Default::default()
        }
    }

    /// Surface member whose row id is looked up by `(root_id, gml_id)`
    pub fn member(root_id: RowId, reverse: bool) -> Self {
        Self {
            root_id: Some(root_id),
            reverse,
            ..Default::default()
        }
    }

    /// Alias of another symbolic identifier
    pub fn alias(mapping: impl Into<String>, reverse: bool) -> Self {
        Self {
            mapping: Some(mapping.into()),
            reverse,
            ..Default::default()
        }
    }

    /// Attach the feature class of the row
    pub fn with_class(mut self, class: ObjectClass) -> Self {
        self.object_class = Some(class);
        self
    }
}

/// Resolves symbolic identifiers against the cache and the database
pub struct IdentifierResolver {
    db: Arc<dyn CityDatabase>,
    cache: RwLock<FxHashMap<IdType, FxHashMap<String, IdCacheEntry>>>,
    max_depth: usize,
}

impl IdentifierResolver {
    /// Create a resolver with an empty cache
    pub fn new(db: Arc<dyn CityDatabase>, max_depth: usize) -> Self {
        Self {
            db,
            cache: RwLock::new(FxHashMap::default()),
            max_depth,
        }
    }

    /// Register an identifier
    pub fn put(&self, gml_id: &str, id_type: IdType, entry: IdCacheEntry) {
        self.cache
            .write()
            .entry(id_type)
            .or_default()
            .insert(normalize_gml_id(gml_id).to_string(), entry);
    }

    /// Number of cached identifiers of a type
    pub fn len(&self, id_type: IdType) -> usize {
        self.cache.read().get(&id_type).map(|m| m.len()).unwrap_or(0)
    }

    /// Check if no identifier of a type is cached
    pub fn is_empty(&self, id_type: IdType) -> bool {
        self.len(id_type) == 0
    }

    fn cached(&self, id_type: IdType, gml_id: &str) -> Option<IdCacheEntry> {
        self.cache
            .read()
            .get(&id_type)
            .and_then(|m| m.get(gml_id))
            .cloned()
    }

    /// Resolve a symbolic identifier
    ///
    /// The returned entry carries the `reverse` flag composed over the whole
    /// alias chain. `Ok(None)` means "not yet", never "never"; only a lost
    /// connection is an error. With `force_live_lookup` the feature table is
    /// queried even when the chain ends in a cached id.
    pub fn resolve(
        &self,
        gml_id: &str,
        id_type: IdType,
        force_live_lookup: bool,
    ) -> Result<Option<IdCacheEntry>> {
        let mut current = normalize_gml_id(gml_id).to_string();
        if current.is_empty() {
            return Ok(None);
        }

        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut reverse = false;
        let mut root_id = None;
        let mut last: Option<IdCacheEntry> = None;

        loop {
            if visited.len() > self.max_depth {
                log::warn!(
                    "alias chain of '{}' exceeds {} links, treating as unresolved",
                    gml_id,
                    self.max_depth
                );
                return Ok(None);
            }
            if !visited.insert(current.clone()) {
                log::warn!("cyclic alias chain at '{}' while resolving '{}'", current, gml_id);
                return Ok(None);
            }

            let Some(entry) = self.cached(id_type, &current) else {
                break;
            };

            reverse ^= entry.reverse;
            if entry.root_id.is_some() {
                root_id = entry.root_id;
            }

            if let Some(next) = &entry.mapping {
                current = normalize_gml_id(next).to_string();
                continue;
            }

            if entry.id.is_some() && !force_live_lookup {
                return Ok(Some(IdCacheEntry {
                    root_id,
                    reverse,
                    mapping: None,
                    ..entry
                }));
            }

            last = Some(entry);
            break;
        }

        match self.live_lookup(&current, id_type, root_id)? {
            Some((id, object_class)) => {
                let own_reverse = last.as_ref().map(|e| e.reverse).unwrap_or(false);
                let object_class = object_class.or(last.and_then(|e| e.object_class));
                self.put(
                    &current,
                    id_type,
                    IdCacheEntry {
                        id: Some(id),
                        root_id,
                        reverse: own_reverse,
                        mapping: None,
                        object_class,
                    },
                );
                Ok(Some(IdCacheEntry {
                    id: Some(id),
                    root_id,
                    reverse,
                    mapping: None,
                    object_class,
                }))
            }
            // A forced lookup that finds nothing keeps the cached answer
            None => Ok(last.filter(|e| e.id.is_some()).map(|e| IdCacheEntry {
                root_id,
                reverse,
                mapping: None,
                ..e
            })),
        }
    }

    fn live_lookup(
        &self,
        gml_id: &str,
        id_type: IdType,
        root_id: Option<RowId>,
    ) -> Result<Option<(RowId, Option<ObjectClass>)>> {
        match id_type {
            IdType::SurfaceGeometry => match root_id {
                Some(root) => Ok(self
                    .db
                    .surface_geometry_id(root, gml_id)?
                    .map(|id| (id, None))),
                None => Ok(None),
            },
            IdType::CityObject => Ok(self
                .db
                .cityobject_by_gml_id(gml_id)?
                .map(|(id, class)| (id, Some(class)))),
            IdType::SurfaceData => Ok(self.db.surface_data_by_gml_id(gml_id)?.map(|id| (id, None))),
            IdType::TexImage | IdType::ImplicitGeometry => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use citydb_lite_model::{Polygon, SurfaceGeometryRow};

    fn resolver() -> (Arc<MemoryDatabase>, IdentifierResolver) {
        let db = Arc::new(MemoryDatabase::new());
        let ids = IdentifierResolver::new(db.clone(), 8);
        (db, ids)
    }

    #[test]
    fn test_direct_hit_strips_marker() {
        let (_, ids) = resolver();
        ids.put("wall", IdType::SurfaceGeometry, IdCacheEntry::geometry(RowId(5), RowId(1), true));

        let entry = ids.resolve("#wall", IdType::SurfaceGeometry, false).unwrap().unwrap();
        assert_eq!(entry.id, Some(RowId(5)));
        assert_eq!(entry.root_id, Some(RowId(1)));
        assert!(entry.reverse);
    }

    #[test]
    fn test_alias_chain_composes_reverse() {
        let (_, ids) = resolver();
        ids.put("a", IdType::SurfaceGeometry, IdCacheEntry::alias("b", true));
        ids.put("b", IdType::SurfaceGeometry, IdCacheEntry::alias("#c", true));
        ids.put("c", IdType::SurfaceGeometry, IdCacheEntry::geometry(RowId(9), RowId(2), true));

        let entry = ids.resolve("a", IdType::SurfaceGeometry, false).unwrap().unwrap();
        assert_eq!(entry.id, Some(RowId(9)));
        // true ^ true ^ true
        assert!(entry.reverse);

        let entry = ids.resolve("b", IdType::SurfaceGeometry, false).unwrap().unwrap();
        assert!(!entry.reverse);
    }

    #[test]
    fn test_cyclic_alias_is_unresolved() {
        let (_, ids) = resolver();
        ids.put("a", IdType::CityObject, IdCacheEntry::alias("b", false));
        ids.put("b", IdType::CityObject, IdCacheEntry::alias("a", false));
        assert_eq!(ids.resolve("a", IdType::CityObject, false).unwrap(), None);
    }

    #[test]
    fn test_depth_bound() {
        let (_, ids) = resolver();
        for i in 0..20 {
            ids.put(
                &format!("n{}", i),
                IdType::CityObject,
                IdCacheEntry::alias(format!("n{}", i + 1), false),
            );
        }
        ids.put("n20", IdType::CityObject, IdCacheEntry::resolved(RowId(1)));
        assert_eq!(ids.resolve("n0", IdType::CityObject, false).unwrap(), None);
        assert!(ids.resolve("n15", IdType::CityObject, false).unwrap().is_some());
    }

    #[test]
    fn test_member_uses_live_lookup_and_caches() {
        let (db, ids) = resolver();
        db.insert_surface_geometry(
            SurfaceGeometryRow::leaf(RowId(42), RowId(40), RowId(40), Polygon::default())
                .with_gml_id("poly"),
        );
        ids.put("poly", IdType::SurfaceGeometry, IdCacheEntry::member(RowId(40), true));

        let entry = ids.resolve("poly", IdType::SurfaceGeometry, false).unwrap().unwrap();
        assert_eq!(entry.id, Some(RowId(42)));
        assert!(entry.reverse);

        db.set_connection_lost(true);
        let cached = ids.resolve("poly", IdType::SurfaceGeometry, false).unwrap().unwrap();
        assert_eq!(cached.id, Some(RowId(42)));
        assert!(cached.reverse);
    }

    #[test]
    fn test_miss_queries_city_objects() {
        let (db, ids) = resolver();
        assert_eq!(ids.resolve("bldg", IdType::CityObject, false).unwrap(), None);

        db.insert_cityobject(RowId(7), "bldg", ObjectClass::Building);
        let entry = ids.resolve("bldg", IdType::CityObject, false).unwrap().unwrap();
        assert_eq!(entry.id, Some(RowId(7)));
        assert_eq!(entry.object_class, Some(ObjectClass::Building));
        assert_eq!(ids.len(IdType::CityObject), 1);
    }

    #[test]
    fn test_forced_lookup_prefers_feature_table() {
        let (db, ids) = resolver();
        ids.put("grp", IdType::CityObject, IdCacheEntry::resolved(RowId(3)));
        db.insert_cityobject(RowId(4), "grp", ObjectClass::CityObjectGroup);

        let entry = ids.resolve("grp", IdType::CityObject, true).unwrap().unwrap();
        assert_eq!(entry.id, Some(RowId(4)));
        assert_eq!(entry.object_class, Some(ObjectClass::CityObjectGroup));

        // Nothing in the table: the cached id stands
        ids.put("other", IdType::CityObject, IdCacheEntry::resolved(RowId(8)));
        let entry = ids.resolve("other", IdType::CityObject, true).unwrap().unwrap();
        assert_eq!(entry.id, Some(RowId(8)));
    }

    #[test]
    fn test_lost_connection_propagates() {
        let (db, ids) = resolver();
        db.set_connection_lost(true);
        let err = ids.resolve("x", IdType::CityObject, false).unwrap_err();
        assert!(err.is_fatal());
    }
}
