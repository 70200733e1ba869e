// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution Orchestrator - drives every kind to completion
//!
//! Kinds run in a fixed order. Independent kinds run side by side as lanes
//! on the worker pool and are joined before the kinds that read their
//! committed output:
//!
//! ```text
//! [ basic | group membership | appearance chain | library objects | world files ]
//!   -> deprecated material -> surface geometry -> solid geometry
//! ```
//!
//! Simple kinds take one pass. Group membership and surface geometry repeat
//! passes until nothing is left or a pass makes no progress.

use crate::cancel::CancellationToken;
use crate::config::XlinkConfig;
use crate::identifier::IdentifierResolver;
use crate::pool::{Job, WorkerPool};
use crate::registry::ResolverRegistry;
use crate::report::{KindReport, ResolutionReport};
use crate::resolvers::{PassContext, Resolution, ResolverContext, XlinkResolver};
use citydb_lite_model::{
    CityDatabase, EventSink, LedgerSnapshot, NoopEventSink, PendingReference, ReferenceLedger,
    Result, StreamOpener, XlinkError, XlinkKind,
};
use std::sync::Arc;

/// Kinds of the appearance chain, in dependency order
const APPEARANCE_CHAIN: [XlinkKind; 5] = [
    XlinkKind::TextureCoordList,
    XlinkKind::TextureParam,
    XlinkKind::TextureImage,
    XlinkKind::TextureImageLink,
    XlinkKind::TextureAssociation,
];

/// Kinds that run after the lanes are joined, in order
const DEPENDENT_KINDS: [XlinkKind; 3] = [
    XlinkKind::DeprecatedMaterial,
    XlinkKind::SurfaceGeometry,
    XlinkKind::SolidGeometry,
];

/// Counts of one pass
#[derive(Default)]
struct PassOutcome {
    resolved: usize,
    failed: usize,
    deferred: usize,
    stuck_ids: Vec<String>,
}

/// Resolves all pending references of an import
///
/// # Example
///
/// ```ignore
/// use citydb_lite_xlink::{FileStreamOpener, MemoryLedger, Orchestrator, XlinkConfig};
///
/// let streams = Arc::new(FileStreamOpener::new(dir));
/// let orchestrator = Orchestrator::new(db, ledger, streams, XlinkConfig::default());
/// let report = orchestrator.run()?;
/// for kind in &report.kinds {
///     println!("{}", kind);
/// }
/// ```
pub struct Orchestrator {
    config: XlinkConfig,
    db: Arc<dyn CityDatabase>,
    ledger: Arc<dyn ReferenceLedger>,
    ids: Arc<IdentifierResolver>,
    streams: Arc<dyn StreamOpener>,
    events: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator with its own identifier cache
    pub fn new(
        db: Arc<dyn CityDatabase>,
        ledger: Arc<dyn ReferenceLedger>,
        streams: Arc<dyn StreamOpener>,
        config: XlinkConfig,
    ) -> Self {
        let ids = Arc::new(IdentifierResolver::new(
            Arc::clone(&db),
            config.max_alias_depth,
        ));
        Self {
            config,
            db,
            ledger,
            ids,
            streams,
            events: Arc::new(NoopEventSink),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an identifier cache filled by the import
    pub fn with_identifiers(mut self, ids: Arc<IdentifierResolver>) -> Self {
        self.ids = ids;
        self
    }

    /// Receive progress and pass notifications
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &XlinkConfig {
        &self.config
    }

    pub fn identifiers(&self) -> &Arc<IdentifierResolver> {
        &self.ids
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolve every pending reference
    ///
    /// A fatal error cancels the token, so the rest of the import stops
    /// too, and is returned. Resolvers are closed on every path.
    pub fn run(&self) -> Result<ResolutionReport> {
        let pool = WorkerPool::new(self.config.worker_threads)?;
        let ctx = Arc::new(ResolverContext {
            db: Arc::clone(&self.db),
            ledger: Arc::clone(&self.ledger),
            ids: Arc::clone(&self.ids),
            streams: Arc::clone(&self.streams),
            batch_size: self.config.batch_size(self.db.max_batch_size()),
        });
        let registry = ResolverRegistry::new(ctx);

        let result = self.run_with(&pool, &registry);
        let closed = registry.close_all();

        let result = result.and_then(|report| closed.map(|_| report));
        if let Err(e) = &result {
            self.interrupt(e);
        }
        result
    }

    fn run_with(&self, pool: &WorkerPool, registry: &ResolverRegistry) -> Result<ResolutionReport> {
        let mut report = ResolutionReport::default();
        self.events.on_progress("Resolving references", 0.0);

        let lanes: Vec<Vec<XlinkKind>> = vec![
            vec![XlinkKind::Basic],
            vec![XlinkKind::GroupMembership],
            APPEARANCE_CHAIN.to_vec(),
            vec![XlinkKind::LibraryObject],
            vec![XlinkKind::WorldFile],
        ];
        let jobs: Vec<Job<'_, Result<Vec<KindReport>>>> = lanes
            .into_iter()
            .map(|lane| Box::new(move || self.run_lane(registry, &lane)) as Job<'_, _>)
            .collect();

        let mut first_error: Option<XlinkError> = None;
        for result in pool.run_all(jobs) {
            match result {
                Ok(kinds) => report.kinds.extend(kinds),
                // A fatal error outranks the cancellations it caused
                Err(e) => {
                    let replace = first_error
                        .as_ref()
                        .map_or(true, |prev| e.is_fatal() && !prev.is_fatal());
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        self.events.on_progress("Resolving dependent references", 60.0);

        for (i, kind) in DEPENDENT_KINDS.iter().enumerate() {
            report.kinds.push(self.resolve_kind(registry, *kind)?);
            let percent = 60.0 + 40.0 * (i + 1) as f32 / DEPENDENT_KINDS.len() as f32;
            self.events.on_progress(kind.name(), percent);
        }

        log::info!(
            "reference resolution complete: {} resolved, {} failed, {} abandoned",
            report.resolved(),
            report.failed(),
            report.abandoned()
        );
        self.events.on_progress("Complete", 100.0);
        Ok(report)
    }

    fn run_lane(&self, registry: &ResolverRegistry, lane: &[XlinkKind]) -> Result<Vec<KindReport>> {
        let mut reports = Vec::with_capacity(lane.len());
        for &kind in lane {
            match self.resolve_kind(registry, kind) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    self.interrupt(&e);
                    return Err(e);
                }
            }
        }
        Ok(reports)
    }

    fn interrupt(&self, error: &XlinkError) {
        if error.is_fatal() && !self.cancel.is_cancelled() {
            log::error!("reference resolution interrupted: {}", error);
            self.cancel.cancel();
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(XlinkError::Cancelled);
        }
        Ok(())
    }

    /// Resolve one kind to completion
    fn resolve_kind(&self, registry: &ResolverRegistry, kind: XlinkKind) -> Result<KindReport> {
        self.check_cancelled()?;

        if self.ledger.size(kind)? == 0 {
            return Ok(KindReport::new(kind));
        }

        let handle = registry.get(kind);
        let mut resolver = handle.lock();
        let report = if kind.is_multi_pass() {
            self.resolve_multi_pass(&mut **resolver, kind)?
        } else {
            self.resolve_single_pass(&mut **resolver, kind)?
        };

        self.events.on_resolved(kind, report.resolved);
        if report.total() > 0 {
            log::info!("{}", report);
        }
        Ok(report)
    }

    fn resolve_single_pass(
        &self,
        resolver: &mut dyn XlinkResolver,
        kind: XlinkKind,
    ) -> Result<KindReport> {
        let outcome = self.run_pass(resolver, kind, 1, false)?;

        let mut report = KindReport::new(kind);
        report.passes = 1;
        report.resolved = outcome.resolved;
        report.failed = outcome.failed;
        report.abandoned = outcome.deferred;
        report.stuck_ids = outcome.stuck_ids;

        if report.abandoned > 0 {
            log::warn!(
                "{}: {} reference(s) could not be resolved",
                kind,
                report.abandoned
            );
        }
        self.events.on_pass_complete(kind, 1, report.abandoned);
        Ok(report)
    }

    /// Repeat passes until the partition is empty or stops shrinking
    fn resolve_multi_pass(
        &self,
        resolver: &mut dyn XlinkResolver,
        kind: XlinkKind,
    ) -> Result<KindReport> {
        let mut report = KindReport::new(kind);
        let mut remaining = self.ledger.size(kind)?;

        while remaining > 0 {
            if report.passes >= self.config.max_passes {
                log::error!(
                    "{}: giving up after {} passes with {} reference(s) unresolved",
                    kind,
                    report.passes,
                    remaining
                );
                report.abandoned = remaining;
                self.abandon(kind, &mut report)?;
                break;
            }

            let pass = report.passes + 1;
            let outcome = self.run_pass(resolver, kind, pass, true)?;
            report.passes = pass;
            report.resolved += outcome.resolved;
            report.failed += outcome.failed;

            let unresolved = self.ledger.size(kind)?;
            log::debug!(
                "{} pass {}: {} resolved, {} failed, {} unresolved",
                kind,
                pass,
                outcome.resolved,
                outcome.failed,
                unresolved
            );
            self.events.on_pass_complete(kind, pass, unresolved);

            if unresolved == remaining {
                log::error!(
                    "{}: {} reference(s) are part of a cycle and cannot be resolved",
                    kind,
                    unresolved
                );
                report.cycle = true;
                report.abandoned = unresolved;
                report.stuck_ids = outcome.stuck_ids;
                self.abandon(kind, &mut report)?;
                break;
            }
            remaining = unresolved;
        }

        Ok(report)
    }

    /// Drop what is left in a partition
    fn abandon(&self, kind: XlinkKind, report: &mut KindReport) -> Result<()> {
        if self.config.retain_stuck_ids && report.stuck_ids.is_empty() {
            let snapshot = self.ledger.mirror(kind)?;
            report.stuck_ids = snapshot.symbolic_ids();
            self.ledger.drop_snapshot(snapshot)?;
        }
        self.ledger.truncate(kind)
    }

    /// Mirror, truncate, scan and flush one pass
    ///
    /// With `requeue` set, deferred records are appended to the live
    /// partition for the next pass.
    fn run_pass(
        &self,
        resolver: &mut dyn XlinkResolver,
        kind: XlinkKind,
        pass: usize,
        requeue: bool,
    ) -> Result<PassOutcome> {
        self.check_cancelled()?;

        let snapshot = self.ledger.mirror(kind)?;
        self.ledger.truncate(kind)?;

        let outcome = self.scan(resolver, &snapshot, pass, requeue);
        let dropped = self.ledger.drop_snapshot(snapshot);
        let outcome = outcome?;
        dropped?;
        Ok(outcome)
    }

    fn scan(
        &self,
        resolver: &mut dyn XlinkResolver,
        snapshot: &LedgerSnapshot,
        pass: usize,
        requeue: bool,
    ) -> Result<PassOutcome> {
        let ctx = PassContext { snapshot, pass };
        let mut outcome = PassOutcome::default();
        // Deferred records of a single-pass scan, kept until the scan completes
        let mut held: Vec<&PendingReference> = Vec::new();

        for (position, record) in snapshot.iter().enumerate() {
            let resolution = self
                .check_cancelled()
                .and_then(|_| resolver.insert(record, &ctx));
            let resolution = match resolution {
                Ok(resolution) => resolution,
                Err(e) => {
                    self.restore(held.into_iter().chain(snapshot.iter().skip(position)));
                    return Err(e);
                }
            };

            match resolution {
                Resolution::Resolved => outcome.resolved += 1,
                Resolution::Failed => outcome.failed += 1,
                Resolution::Deferred => {
                    outcome.deferred += 1;
                    if requeue {
                        if let Err(e) = self.ledger.append(record.clone()) {
                            self.restore(snapshot.iter().skip(position + 1));
                            return Err(e);
                        }
                    } else {
                        held.push(record);
                    }
                    if self.config.retain_stuck_ids {
                        outcome.stuck_ids.push(record.symbolic_id().to_string());
                    }
                }
            }
        }

        // Writes of this pass must be visible to the next one
        resolver.flush()?;
        Ok(outcome)
    }

    /// Put records of an interrupted scan back into the live ledger
    fn restore<'a>(&self, records: impl Iterator<Item = &'a PendingReference>) {
        let mut restored = 0;
        for record in records {
            if let Err(e) = self.ledger.append(record.clone()) {
                log::error!(
                    "{}: cannot restore pending reference '{}': {}",
                    record.kind(),
                    record.symbolic_id(),
                    e
                );
                return;
            }
            restored += 1;
        }
        if restored > 0 {
            log::debug!("restored {} pending reference(s) after interruption", restored);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::IdCacheEntry;
    use crate::ledger::MemoryLedger;
    use crate::memory::MemoryDatabase;
    use crate::stream::FileStreamOpener;
    use citydb_lite_model::{
        BasicXlink, FileXlink, GeometryValue, GroupXlink, IdType, LinkTable, ObjectClass, Polygon,
        RowId, SolidGeometryXlink, SurfaceGeometryRow, SurfaceGeometryXlink, Table,
    };
    use parking_lot::Mutex;
    use std::io::{Cursor, Read};

    struct Setup {
        db: Arc<MemoryDatabase>,
        ledger: Arc<MemoryLedger>,
        orchestrator: Orchestrator,
    }

    fn setup(config: XlinkConfig) -> Setup {
        let db = Arc::new(MemoryDatabase::new());
        let ledger = Arc::new(MemoryLedger::new());
        let orchestrator = Orchestrator::new(
            db.clone(),
            ledger.clone(),
            Arc::new(FileStreamOpener::new(".")),
            config,
        );
        Setup {
            db,
            ledger,
            orchestrator,
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        passes: Mutex<Vec<(XlinkKind, usize, usize)>>,
    }

    impl EventSink for RecordingSink {
        fn on_pass_complete(&self, kind: XlinkKind, pass: usize, unresolved: usize) {
            self.passes.lock().push((kind, pass, unresolved));
        }
    }

    impl RecordingSink {
        fn passes_of(&self, kind: XlinkKind) -> Vec<(usize, usize)> {
            self.passes
                .lock()
                .iter()
                .filter(|(k, _, _)| *k == kind)
                .map(|(_, p, u)| (*p, *u))
                .collect()
        }
    }

    fn member(group: i64, gml_id: &str) -> PendingReference {
        PendingReference::GroupMembership(GroupXlink {
            group_id: RowId(group),
            gml_id: gml_id.into(),
            role: None,
            is_parent: false,
        })
    }

    fn surface_xlink(id: i64, root: i64, gml_id: &str) -> PendingReference {
        PendingReference::SurfaceGeometry(SurfaceGeometryXlink {
            id: RowId(id),
            parent_id: Some(RowId(root)),
            root_id: RowId(root),
            reverse: false,
            gml_id: gml_id.into(),
            cityobject_id: None,
        })
    }

    fn placeholder(id: i64, root: i64) -> SurfaceGeometryRow {
        SurfaceGeometryRow {
            is_placeholder: true,
            ..SurfaceGeometryRow::aggregate(RowId(id), Some(RowId(root)), RowId(root))
        }
    }

    fn square() -> Polygon {
        Polygon::new(vec![vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0,
        ]])
    }

    /// Aggregate `root` with one polygon `root + 1`, registered as `gml_id`
    fn insert_surface(db: &MemoryDatabase, ids: &IdentifierResolver, root: i64, gml_id: &str) {
        db.insert_surface_geometry(
            SurfaceGeometryRow::aggregate(RowId(root), None, RowId(root)).with_gml_id(gml_id),
        );
        db.insert_surface_geometry(SurfaceGeometryRow::leaf(
            RowId(root + 1),
            RowId(root),
            RowId(root),
            square(),
        ));
        ids.put(
            gml_id,
            IdType::SurfaceGeometry,
            IdCacheEntry::geometry(RowId(root), RowId(root), false),
        );
    }

    #[test]
    fn test_nested_groups_converge_within_depth_plus_one() {
        let s = setup(XlinkConfig::sequential());
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = s.orchestrator.with_events(sink.clone());

        // g1 > g2 > g3 > building, depth 3
        s.db.insert_cityobject(RowId(1), "g1", ObjectClass::CityObjectGroup);
        s.db.insert_cityobject(RowId(2), "g2", ObjectClass::CityObjectGroup);
        s.db.insert_cityobject(RowId(3), "g3", ObjectClass::CityObjectGroup);
        s.db.insert_cityobject(RowId(4), "b", ObjectClass::Building);
        for record in [member(1, "g2"), member(2, "g3"), member(3, "b")] {
            s.ledger.append(record).unwrap();
        }

        let report = orchestrator.run().unwrap();
        let groups = report.kind(XlinkKind::GroupMembership).unwrap();
        assert_eq!(groups.resolved, 3);
        assert!(!groups.cycle);
        assert!(groups.passes <= 4);
        assert_eq!(
            sink.passes_of(XlinkKind::GroupMembership),
            vec![(1, 2), (2, 1), (3, 0)]
        );
        assert_eq!(s.db.group_members().len(), 3);
        assert!(report.is_complete());
    }

    #[test]
    fn test_group_cycle_is_reported_once() {
        let s = setup(XlinkConfig::default());
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = s.orchestrator.with_events(sink.clone());

        s.db.insert_cityobject(RowId(1), "g1", ObjectClass::CityObjectGroup);
        s.db.insert_cityobject(RowId(2), "g2", ObjectClass::CityObjectGroup);
        s.ledger.append(member(1, "#g2")).unwrap();
        s.ledger.append(member(2, "#g1")).unwrap();

        let report = orchestrator.run().unwrap();
        let groups = report.kind(XlinkKind::GroupMembership).unwrap();
        assert!(groups.cycle);
        assert_eq!(groups.passes, 1);
        assert_eq!(groups.abandoned, 2);
        assert_eq!(groups.stuck_ids, vec!["g2", "g1"]);
        assert_eq!(report.cycles(), vec![XlinkKind::GroupMembership]);
        assert_eq!(sink.passes_of(XlinkKind::GroupMembership), vec![(1, 2)]);
        assert_eq!(s.ledger.size(XlinkKind::GroupMembership).unwrap(), 0);
        assert!(s.db.group_members().is_empty());
    }

    #[test]
    fn test_stuck_ids_can_be_dropped() {
        let s = setup(XlinkConfig::default().with_retain_stuck_ids(false));
        s.db.insert_cityobject(RowId(1), "g1", ObjectClass::CityObjectGroup);
        s.ledger.append(member(1, "g1")).unwrap();
        s.ledger.append(member(1, "missing")).unwrap();

        let report = s.orchestrator.run().unwrap();
        let groups = report.kind(XlinkKind::GroupMembership).unwrap();
        // The self member resolves; the unknown member never does
        assert_eq!(groups.resolved, 1);
        assert!(groups.cycle);
        assert!(groups.stuck_ids.is_empty());
    }

    #[test]
    fn test_surface_target_committed_between_passes() {
        struct CommitSecondSurface {
            db: Arc<MemoryDatabase>,
            ids: Arc<IdentifierResolver>,
        }

        impl EventSink for CommitSecondSurface {
            fn on_pass_complete(&self, kind: XlinkKind, pass: usize, _unresolved: usize) {
                if kind == XlinkKind::SurfaceGeometry && pass == 1 {
                    insert_surface(&self.db, &self.ids, 20, "S2");
                }
            }
        }

        let s = setup(XlinkConfig::default());
        let ids = Arc::clone(s.orchestrator.identifiers());
        let orchestrator = s.orchestrator.with_events(Arc::new(CommitSecondSurface {
            db: s.db.clone(),
            ids: ids.clone(),
        }));

        insert_surface(&s.db, &ids, 10, "S1");
        s.db.insert_surface_geometry(
            SurfaceGeometryRow::aggregate(RowId(100), None, RowId(100)).solid(),
        );
        s.db.insert_surface_geometry(placeholder(101, 100));
        s.db.insert_surface_geometry(placeholder(102, 100));
        s.ledger.append(surface_xlink(101, 100, "#S1")).unwrap();
        s.ledger.append(surface_xlink(102, 100, "#S2")).unwrap();
        s.ledger
            .append(PendingReference::SolidGeometry(SolidGeometryXlink { id: RowId(100) }))
            .unwrap();

        let report = orchestrator.run().unwrap();
        let surfaces = report.kind(XlinkKind::SurfaceGeometry).unwrap();
        assert_eq!(surfaces.passes, 2);
        assert_eq!(surfaces.resolved, 2);
        assert!(!surfaces.cycle);

        let rows = s.db.surface_geometry_hierarchy(RowId(100)).unwrap();
        assert!(rows.iter().all(|row| !row.is_placeholder));
        assert_eq!(rows.iter().filter(|row| row.geometry.is_some()).count(), 2);

        // The solid is rebuilt after both faces were copied
        match s.db.surface_geometry_row(RowId(100)).unwrap().solid_geometry {
            Some(GeometryValue::Solid(solid)) => assert_eq!(solid.ring_count(), 2),
            other => panic!("expected a solid, got {:?}", other),
        }
    }

    #[test]
    fn test_mutual_surface_references_are_a_cycle() {
        let s = setup(XlinkConfig::default());
        let ids = Arc::clone(s.orchestrator.identifiers());

        for (root, child, gml_id) in [(1, 2, "a"), (5, 6, "b")] {
            s.db.insert_surface_geometry(
                SurfaceGeometryRow::aggregate(RowId(root), None, RowId(root)).with_gml_id(gml_id),
            );
            s.db.insert_surface_geometry(placeholder(child, root));
            ids.put(
                gml_id,
                IdType::SurfaceGeometry,
                IdCacheEntry::geometry(RowId(root), RowId(root), false),
            );
        }
        s.ledger.append(surface_xlink(2, 1, "b")).unwrap();
        s.ledger.append(surface_xlink(6, 5, "a")).unwrap();

        let report = s.orchestrator.run().unwrap();
        let surfaces = report.kind(XlinkKind::SurfaceGeometry).unwrap();
        assert!(surfaces.cycle);
        assert_eq!(surfaces.passes, 1);
        assert_eq!(surfaces.abandoned, 2);
        assert_eq!(s.db.writes_executed(), 0);
    }

    #[test]
    fn test_rerun_writes_nothing() {
        let s = setup(XlinkConfig::default());
        s.db.insert_cityobject(RowId(2), "addr", ObjectClass::Address);
        s.ledger
            .append(PendingReference::Basic(BasicXlink {
                id: RowId(1),
                from_table: Table::Building,
                to_table: Table::Address,
                attribute: "address".into(),
                gml_id: "#addr".into(),
            }))
            .unwrap();

        let first = s.orchestrator.run().unwrap();
        assert_eq!(first.resolved(), 1);
        let writes = s.db.writes_executed();

        let second = s.orchestrator.run().unwrap();
        assert_eq!(second.resolved(), 0);
        assert_eq!(s.db.writes_executed(), writes);
        assert_eq!(s.db.links(LinkTable::AddressToBuilding).len(), 1);
        assert_eq!(s.ledger.total_size(), 0);
        assert_eq!(s.ledger.outstanding_mirrors(), 0);
    }

    #[test]
    fn test_unresolved_single_pass_records_are_abandoned() {
        let s = setup(XlinkConfig::default());
        s.ledger
            .append(PendingReference::Basic(BasicXlink {
                id: RowId(1),
                from_table: Table::CityObject,
                to_table: Table::CityObject,
                attribute: "generalizes_to".into(),
                gml_id: "nowhere".into(),
            }))
            .unwrap();

        let report = s.orchestrator.run().unwrap();
        let basic = report.kind(XlinkKind::Basic).unwrap();
        assert_eq!(basic.abandoned, 1);
        assert_eq!(basic.stuck_ids, vec!["nowhere"]);
        assert!(!basic.cycle);
        assert_eq!(s.ledger.size(XlinkKind::Basic).unwrap(), 0);
    }

    #[test]
    fn test_pass_limit_is_a_backstop() {
        let s = setup(XlinkConfig::default().with_max_passes(1));
        s.db.insert_cityobject(RowId(1), "g1", ObjectClass::CityObjectGroup);
        s.db.insert_cityobject(RowId(2), "g2", ObjectClass::CityObjectGroup);
        s.db.insert_cityobject(RowId(3), "b", ObjectClass::Building);
        s.ledger.append(member(1, "g2")).unwrap();
        s.ledger.append(member(2, "b")).unwrap();

        let report = s.orchestrator.run().unwrap();
        let groups = report.kind(XlinkKind::GroupMembership).unwrap();
        assert_eq!(groups.passes, 1);
        assert_eq!(groups.resolved, 1);
        assert_eq!(groups.abandoned, 1);
        assert_eq!(groups.stuck_ids, vec!["g2"]);
        assert!(!groups.cycle);
    }

    #[test]
    fn test_lost_connection_interrupts_the_import() {
        let s = setup(XlinkConfig::default());
        s.ledger.append(member(1, "g2")).unwrap();
        s.db.set_connection_lost(true);

        let err = s.orchestrator.run().unwrap_err();
        assert!(err.is_fatal());
        assert!(s.orchestrator.cancellation_token().is_cancelled());
        assert_eq!(s.ledger.size(XlinkKind::GroupMembership).unwrap(), 1);
    }

    #[test]
    fn test_cancel_during_scan_keeps_unprocessed_records() {
        // Cancels the run while the first file is being read
        struct CancellingOpener {
            token: CancellationToken,
        }

        impl StreamOpener for CancellingOpener {
            fn open(&self, _reference: &str) -> Result<Box<dyn Read + Send>> {
                self.token.cancel();
                Ok(Box::new(Cursor::new(b"mesh".to_vec())))
            }
        }

        let token = CancellationToken::new();
        let db = Arc::new(MemoryDatabase::new());
        let ledger = Arc::new(MemoryLedger::new());
        let opener = Arc::new(CancellingOpener {
            token: token.clone(),
        });
        let orchestrator = Orchestrator::new(
            db.clone(),
            ledger.clone(),
            opener,
            XlinkConfig::sequential(),
        )
        .with_cancellation(token);
        for id in 1..=3 {
            ledger
                .append(PendingReference::LibraryObject(FileXlink {
                    id: RowId(id),
                    file_uri: format!("lib/{}.obj", id),
                }))
                .unwrap();
        }

        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err, XlinkError::Cancelled));
        assert_eq!(db.library_object(RowId(1)), Some(b"mesh".to_vec()));
        assert_eq!(db.library_object(RowId(2)), None);
        assert_eq!(ledger.size(XlinkKind::LibraryObject).unwrap(), 2);
        assert_eq!(ledger.outstanding_mirrors(), 0);

        let pending: Vec<RowId> = ledger
            .mirror(XlinkKind::LibraryObject)
            .unwrap()
            .iter()
            .map(|record| record.owner_id())
            .collect();
        assert_eq!(pending, vec![RowId(2), RowId(3)]);
    }

    #[test]
    fn test_cancel_during_single_pass_keeps_deferred_records() {
        // Defers the first record and cancels while resolving the second
        struct CancelOnSecond {
            token: CancellationToken,
            seen: usize,
        }

        impl XlinkResolver for CancelOnSecond {
            fn kind(&self) -> XlinkKind {
                XlinkKind::Basic
            }

            fn insert(
                &mut self,
                _record: &PendingReference,
                _pass: &PassContext<'_>,
            ) -> Result<Resolution> {
                self.seen += 1;
                match self.seen {
                    1 => Ok(Resolution::Deferred),
                    2 => {
                        self.token.cancel();
                        Ok(Resolution::Resolved)
                    }
                    _ => Ok(Resolution::Resolved),
                }
            }

            fn flush(&mut self) -> Result<()> {
                Ok(())
            }
        }

        let token = CancellationToken::new();
        let s = setup(XlinkConfig::default());
        let orchestrator = s.orchestrator.with_cancellation(token.clone());
        let records: Vec<PendingReference> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, gml_id)| {
                PendingReference::Basic(BasicXlink {
                    id: RowId(i as i64 + 1),
                    from_table: Table::CityObject,
                    to_table: Table::CityObject,
                    attribute: "generalizes_to".into(),
                    gml_id: (*gml_id).into(),
                })
            })
            .collect();
        let snapshot = LedgerSnapshot::new(XlinkKind::Basic, records);
        let mut resolver = CancelOnSecond { token, seen: 0 };

        let err = orchestrator
            .scan(&mut resolver, &snapshot, 1, false)
            .err()
            .unwrap();
        assert!(matches!(err, XlinkError::Cancelled));
        assert_eq!(resolver.seen, 2);

        let mut pending = s.ledger.mirror(XlinkKind::Basic).unwrap().symbolic_ids();
        pending.sort();
        assert_eq!(pending, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_cancelled_run_leaves_ledger_alone() {
        let token = CancellationToken::new();
        let s = setup(XlinkConfig::default());
        let orchestrator = s.orchestrator.with_cancellation(token.clone());
        s.ledger.append(member(1, "g2")).unwrap();

        token.cancel();
        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err, XlinkError::Cancelled));
        assert!(!err.is_fatal());
        assert_eq!(s.ledger.size(XlinkKind::GroupMembership).unwrap(), 1);
        assert_eq!(s.db.writes_executed(), 0);
    }

    #[test]
    fn test_empty_ledger_builds_no_resolvers() {
        let s = setup(XlinkConfig::default());
        let report = s.orchestrator.run().unwrap();
        assert_eq!(report.kinds.len(), XlinkKind::ALL.len());
        assert!(report.kinds.iter().all(|k| k.passes == 0));
        assert_eq!(s.db.batches_executed(), 0);
    }
}
