// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolver Registry - one lazily built resolver per kind

use crate::resolvers::{create_resolver, ResolverContext, XlinkResolver};
use citydb_lite_model::{Result, XlinkKind};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Shared handle to a resolver
///
/// Holding the lock makes the caller the only driver of the resolver.
pub type ResolverHandle = Arc<Mutex<Box<dyn XlinkResolver>>>;

/// Builds and caches resolvers
pub struct ResolverRegistry {
    ctx: Arc<ResolverContext>,
    resolvers: Mutex<FxHashMap<XlinkKind, ResolverHandle>>,
}

impl ResolverRegistry {
    /// Create an empty registry
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        Self {
            ctx,
            resolvers: Mutex::new(FxHashMap::default()),
        }
    }

    /// Resolver for a kind, built on first use
    pub fn get(&self, kind: XlinkKind) -> ResolverHandle {
        let mut resolvers = self.resolvers.lock();
        Arc::clone(resolvers.entry(kind).or_insert_with(|| {
            log::debug!("building {} resolver", kind);
            Arc::new(Mutex::new(create_resolver(kind, Arc::clone(&self.ctx))))
        }))
    }

    /// Kinds whose resolver has been built
    pub fn built(&self) -> Vec<XlinkKind> {
        let mut kinds: Vec<_> = self.resolvers.lock().keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Close every built resolver
    ///
    /// All resolvers are closed even if one fails; the first error is returned.
    pub fn close_all(&self) -> Result<()> {
        let mut first_error = None;
        for handle in self.handles() {
            if let Err(e) = handle.lock().close() {
                log::error!("closing resolver failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn handles(&self) -> Vec<ResolverHandle> {
        let resolvers = self.resolvers.lock();
        let mut kinds: Vec<_> = resolvers.keys().copied().collect();
        kinds.sort();
        kinds.iter().map(|k| Arc::clone(&resolvers[k])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::fixtures::Fixture;
    use crate::resolvers::PassContext;
    use citydb_lite_model::{
        BasicXlink, LedgerSnapshot, LinkTable, ObjectClass, PendingReference, RowId, Table,
    };

    #[test]
    fn test_one_resolver_per_kind() {
        let fx = Fixture::new();
        let registry = ResolverRegistry::new(fx.ctx.clone());
        assert!(registry.built().is_empty());

        let a = registry.get(XlinkKind::Basic);
        let b = registry.get(XlinkKind::Basic);
        assert!(Arc::ptr_eq(&a, &b));

        registry.get(XlinkKind::WorldFile);
        assert_eq!(registry.built(), vec![XlinkKind::Basic, XlinkKind::WorldFile]);
        assert_eq!(a.lock().kind(), XlinkKind::Basic);
    }

    #[test]
    fn test_close_all_flushes() {
        let fx = Fixture::new();
        fx.db.insert_cityobject(RowId(2), "b", ObjectClass::Building);
        let registry = ResolverRegistry::new(fx.ctx.clone());

        let record = PendingReference::Basic(BasicXlink {
            id: RowId(1),
            from_table: Table::CityObject,
            to_table: Table::CityObject,
            attribute: "generalizes_to".into(),
            gml_id: "b".into(),
        });
        let snapshot = LedgerSnapshot::new(XlinkKind::Basic, vec![record.clone()]);
        let pass = PassContext {
            snapshot: &snapshot,
            pass: 1,
        };
        registry
            .get(XlinkKind::Basic)
            .lock()
            .insert(&record, &pass)
            .unwrap();
        assert!(fx.db.links(LinkTable::Generalization).is_empty());

        registry.close_all().unwrap();
        assert_eq!(fx.db.links(LinkTable::Generalization).len(), 1);
    }
}
