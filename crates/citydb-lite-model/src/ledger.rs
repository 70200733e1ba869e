// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference ledger trait and frozen snapshots

use crate::{
    LinearRingEntry, PendingReference, Result, RowId, TextureAssociationTarget, XlinkKind,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Append-only store of pending references, partitioned by kind
///
/// The orchestrator always calls [`mirror`](ReferenceLedger::mirror) before
/// [`truncate`](ReferenceLedger::truncate): records deferred during a pass
/// are appended to the emptied live partition while the pass reads the
/// frozen snapshot.
///
/// # Example
///
/// ```ignore
/// use citydb_lite_model::{ReferenceLedger, XlinkKind};
///
/// fn run_pass(ledger: &dyn ReferenceLedger) -> Result<()> {
///     let snapshot = ledger.mirror(XlinkKind::GroupMembership)?;
///     ledger.truncate(XlinkKind::GroupMembership)?;
///     for record in snapshot.iter() {
///         // resolve or re-append
///     }
///     ledger.drop_snapshot(snapshot)
/// }
/// ```
pub trait ReferenceLedger: Send + Sync {
    /// Append a record to the live partition of its kind
    fn append(&self, reference: PendingReference) -> Result<()>;

    /// Number of records in the live partition
    fn size(&self, kind: XlinkKind) -> Result<usize>;

    /// Freeze the current contents of a partition into an indexed snapshot
    fn mirror(&self, kind: XlinkKind) -> Result<LedgerSnapshot>;

    /// Clear the live partition
    fn truncate(&self, kind: XlinkKind) -> Result<()>;

    /// Release a snapshot
    ///
    /// Backends that materialize mirrors as tables drop them here.
    fn drop_snapshot(&self, snapshot: LedgerSnapshot) -> Result<()> {
        drop(snapshot);
        Ok(())
    }

    /// Record a linear ring for texture coordinate placement
    fn register_linear_ring(&self, entry: LinearRingEntry) -> Result<()>;

    /// Look up a linear ring by its symbolic identifier
    fn linear_ring(&self, gml_id: &str) -> Result<Option<LinearRingEntry>>;

    /// All rings of a polygon, ordered by ring number
    fn rings_of_surface(&self, parent_gml_id: &str) -> Result<Vec<LinearRingEntry>>;

    /// Record a texture association other associations may point at
    fn register_association_target(&self, target: TextureAssociationTarget) -> Result<()>;

    /// Look up a texture association by its symbolic identifier
    fn association_target(&self, gml_id: &str) -> Result<Option<TextureAssociationTarget>>;
}

/// Frozen, indexed, read-only copy of one ledger partition
#[derive(Clone, Debug)]
pub struct LedgerSnapshot {
    kind: XlinkKind,
    records: Arc<[PendingReference]>,
    /// Symbolic id -> record positions
    by_symbolic_id: FxHashMap<String, Vec<usize>>,
    /// Owning row -> record positions
    by_owner: FxHashMap<RowId, Vec<usize>>,
}

impl LedgerSnapshot {
    /// Build a snapshot and its indexes
    pub fn new(kind: XlinkKind, records: Vec<PendingReference>) -> Self {
        let mut by_symbolic_id: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut by_owner: FxHashMap<RowId, Vec<usize>> = FxHashMap::default();

        for (pos, record) in records.iter().enumerate() {
            by_symbolic_id
                .entry(record.symbolic_id().to_string())
                .or_default()
                .push(pos);
            by_owner.entry(record.owner_id()).or_default().push(pos);
        }

        Self {
            kind,
            records: records.into(),
            by_symbolic_id,
            by_owner,
        }
    }

    /// Create an empty snapshot
    pub fn empty(kind: XlinkKind) -> Self {
        Self::new(kind, Vec::new())
    }

    /// Partition this snapshot was taken from
    pub fn kind(&self) -> XlinkKind {
        self.kind
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in append order
    pub fn iter(&self) -> impl Iterator<Item = &PendingReference> {
        self.records.iter()
    }

    /// Records waiting for the given symbolic identifier
    pub fn find_by_symbolic_id(&self, symbolic_id: &str) -> Vec<&PendingReference> {
        self.by_symbolic_id
            .get(symbolic_id)
            .map(|positions| positions.iter().map(|&p| &self.records[p]).collect())
            .unwrap_or_default()
    }

    /// Whether any record writes into the given row
    pub fn has_owner(&self, id: RowId) -> bool {
        self.by_owner.contains_key(&id)
    }

    /// Symbolic identifiers of all records, in append order
    pub fn symbolic_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.symbolic_id().to_string())
            .collect()
    }
}
