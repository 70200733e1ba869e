// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-kind resolvers
//!
//! Each resolver turns pending references of one kind into writes. A
//! resolver owns its [`BatchWriter`]; the registry guarantees that only one
//! lane drives a resolver at a time.

mod basic;
mod files;
mod group;
mod material;
mod solid;
mod surface_geometry;
mod texture;

pub use basic::{BasicLink, BasicResolver, ForeignKey};
pub use files::{FileResolver, WorldFileResolver};
pub use group::GroupResolver;
pub use material::DeprecatedMaterialResolver;
pub use solid::SolidGeometryResolver;
pub use surface_geometry::SurfaceGeometryResolver;
pub use texture::{
    TextureAssociationResolver, TextureCoordListResolver, TextureImageLinkResolver,
    TextureParamResolver,
};

use crate::batch::BatchWriter;
use crate::identifier::IdentifierResolver;
use citydb_lite_model::{
    CityDatabase, LedgerSnapshot, PendingReference, ReferenceLedger, Result, StreamOpener,
    XlinkError, XlinkKind,
};
use std::fmt;
use std::sync::Arc;

/// Outcome of one record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Writes were queued; the record is consumed
    Resolved,
    /// The target is not resolvable yet
    Deferred,
    /// The record can never resolve; it was logged and is dropped
    Failed,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Resolved => f.write_str("resolved"),
            Resolution::Deferred => f.write_str("deferred"),
            Resolution::Failed => f.write_str("failed"),
        }
    }
}

/// State of the pass a record is resolved in
pub struct PassContext<'a> {
    /// Frozen mirror the record was read from
    pub snapshot: &'a LedgerSnapshot,
    /// Pass number, starting at 1
    pub pass: usize,
}

/// Collaborators shared by all resolvers of a run
pub struct ResolverContext {
    pub db: Arc<dyn CityDatabase>,
    pub ledger: Arc<dyn ReferenceLedger>,
    pub ids: Arc<IdentifierResolver>,
    pub streams: Arc<dyn StreamOpener>,
    pub batch_size: usize,
}

impl ResolverContext {
    /// Fresh batch writer against the run's database
    pub fn writer(&self) -> BatchWriter {
        BatchWriter::new(Arc::clone(&self.db), self.batch_size)
    }
}

/// Resolver for one kind of pending reference
pub trait XlinkResolver: Send {
    /// Kind this resolver handles
    fn kind(&self) -> XlinkKind;

    /// Resolve one record, queueing its writes
    ///
    /// Only fatal errors are returned as `Err`.
    fn insert(&mut self, record: &PendingReference, pass: &PassContext<'_>) -> Result<Resolution>;

    /// Execute queued writes
    fn flush(&mut self) -> Result<()>;

    /// Flush and release resources
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// Build the resolver for a kind
pub fn create_resolver(kind: XlinkKind, ctx: Arc<ResolverContext>) -> Box<dyn XlinkResolver> {
    match kind {
        XlinkKind::Basic => Box::new(BasicResolver::new(ctx)),
        XlinkKind::GroupMembership => Box::new(GroupResolver::new(ctx)),
        XlinkKind::SurfaceGeometry => Box::new(SurfaceGeometryResolver::new(ctx)),
        XlinkKind::TextureCoordList => Box::new(TextureCoordListResolver::new(ctx)),
        XlinkKind::TextureParam => Box::new(TextureParamResolver::new(ctx)),
        XlinkKind::TextureAssociation => Box::new(TextureAssociationResolver::new(ctx)),
        XlinkKind::TextureImage | XlinkKind::LibraryObject => {
            Box::new(FileResolver::new(kind, ctx))
        }
        XlinkKind::TextureImageLink => Box::new(TextureImageLinkResolver::new(ctx)),
        XlinkKind::DeprecatedMaterial => Box::new(DeprecatedMaterialResolver::new(ctx)),
        XlinkKind::WorldFile => Box::new(WorldFileResolver::new(ctx)),
        XlinkKind::SolidGeometry => Box::new(SolidGeometryResolver::new(ctx)),
    }
}

/// Log a per-record failure
pub(crate) fn failed(
    kind: XlinkKind,
    record: &PendingReference,
    reason: impl fmt::Display,
) -> Resolution {
    log::warn!(
        "{}: dropping reference '{}' of row {}: {}",
        kind,
        record.symbolic_id(),
        record.owner_id(),
        reason
    );
    Resolution::Failed
}

/// Log a record handed to the wrong resolver
pub(crate) fn mismatched(kind: XlinkKind, record: &PendingReference) -> Resolution {
    let error = XlinkError::invalid_record(
        record.kind(),
        record.owner_id(),
        format!("routed to the {} resolver", kind),
    );
    failed(kind, record, error)
}
