// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory reference ledger

use citydb_lite_model::{
    normalize_gml_id, LedgerSnapshot, LinearRingEntry, PendingReference, ReferenceLedger, Result,
    TextureAssociationTarget, XlinkKind,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reference ledger that keeps every partition in memory
///
/// Suitable for imports whose pending references fit in memory and as a
/// test fixture. Mirrors are plain snapshots; outstanding ones are counted
/// so callers can check that every mirror was released.
#[derive(Default)]
pub struct MemoryLedger {
    partitions: RwLock<FxHashMap<XlinkKind, Vec<PendingReference>>>,
    rings: RwLock<FxHashMap<String, LinearRingEntry>>,
    rings_by_surface: RwLock<FxHashMap<String, Vec<LinearRingEntry>>>,
    association_targets: RwLock<FxHashMap<String, TextureAssociationTarget>>,
    outstanding_mirrors: AtomicUsize,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all partitions
    pub fn total_size(&self) -> usize {
        self.partitions.read().values().map(Vec::len).sum()
    }

    /// Number of mirrors taken and not yet dropped
    pub fn outstanding_mirrors(&self) -> usize {
        self.outstanding_mirrors.load(Ordering::SeqCst)
    }
}

impl ReferenceLedger for MemoryLedger {
    fn append(&self, reference: PendingReference) -> Result<()> {
        self.partitions
            .write()
            .entry(reference.kind())
            .or_default()
            .push(reference);
        Ok(())
    }

    fn size(&self, kind: XlinkKind) -> Result<usize> {
        Ok(self.partitions.read().get(&kind).map(Vec::len).unwrap_or(0))
    }

    fn mirror(&self, kind: XlinkKind) -> Result<LedgerSnapshot> {
        let records = self
            .partitions
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        self.outstanding_mirrors.fetch_add(1, Ordering::SeqCst);
        Ok(LedgerSnapshot::new(kind, records))
    }

    fn truncate(&self, kind: XlinkKind) -> Result<()> {
        if let Some(records) = self.partitions.write().get_mut(&kind) {
            records.clear();
        }
        Ok(())
    }

    fn drop_snapshot(&self, snapshot: LedgerSnapshot) -> Result<()> {
        drop(snapshot);
        // Snapshots built outside this ledger were never counted
        let _ = self
            .outstanding_mirrors
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        Ok(())
    }

    fn register_linear_ring(&self, entry: LinearRingEntry) -> Result<()> {
        let entry = LinearRingEntry {
            gml_id: normalize_gml_id(&entry.gml_id).to_string(),
            parent_gml_id: normalize_gml_id(&entry.parent_gml_id).to_string(),
            ring_no: entry.ring_no,
        };

        {
            let mut by_surface = self.rings_by_surface.write();
            let rings = by_surface.entry(entry.parent_gml_id.clone()).or_default();
            rings.retain(|r| r.gml_id != entry.gml_id);
            rings.push(entry.clone());
            rings.sort_by_key(|r| r.ring_no);
        }

        self.rings.write().insert(entry.gml_id.clone(), entry);
        Ok(())
    }

    fn linear_ring(&self, gml_id: &str) -> Result<Option<LinearRingEntry>> {
        Ok(self.rings.read().get(normalize_gml_id(gml_id)).cloned())
    }

    fn rings_of_surface(&self, parent_gml_id: &str) -> Result<Vec<LinearRingEntry>> {
        Ok(self
            .rings_by_surface
            .read()
            .get(normalize_gml_id(parent_gml_id))
            .cloned()
            .unwrap_or_default())
    }

    fn register_association_target(&self, target: TextureAssociationTarget) -> Result<()> {
        self.association_targets
            .write()
            .insert(normalize_gml_id(&target.gml_id).to_string(), target);
        Ok(())
    }

    fn association_target(&self, gml_id: &str) -> Result<Option<TextureAssociationTarget>> {
        Ok(self
            .association_targets
            .read()
            .get(normalize_gml_id(gml_id))
            .cloned())
    }
}
