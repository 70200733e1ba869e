// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator traits consumed by the resolver engine
//!
//! These traits define the seams to the relational store, to external
//! files and to progress reporting.

use crate::{
    GeometryValue, LinkTable, ObjectClass, Result, RowId, Sequence, SurfaceDataRow,
    SurfaceGeometryRow, Table, TextureParamRow, XlinkKind,
};
use std::io::Read;

/// A single write produced by a resolver
///
/// Writes are collected into batches and executed together by
/// [`CityDatabase::execute_batch`].
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    /// `update <table> set <column> = value where id = id`
    UpdateColumn {
        table: Table,
        column: String,
        id: RowId,
        value: RowId,
    },
    /// Row of a two-column link table
    InsertLink {
        table: LinkTable,
        left: RowId,
        right: RowId,
    },
    /// Row of `group_to_cityobject`
    InsertGroupMember {
        group_id: RowId,
        member_id: RowId,
        role: Option<String>,
    },
    /// Overwrite an existing surface row (placeholder resolution)
    UpdateSurfaceGeometry(SurfaceGeometryRow),
    InsertSurfaceGeometry(SurfaceGeometryRow),
    InsertSurfaceData(SurfaceDataRow),
    InsertTextureParam(TextureParamRow),
    UpdateTexImage {
        id: RowId,
        data: Vec<u8>,
        mime_type: Option<String>,
    },
    UpdateLibraryObject {
        id: RowId,
        data: Vec<u8>,
    },
    UpdateGeoreference {
        id: RowId,
        orientation: String,
        reference_point: [f64; 2],
    },
    UpdateSolidGeometry {
        id: RowId,
        geometry: GeometryValue,
    },
}

/// Database adapter
///
/// Implementations own the SQL dialect and the geometry encoding. Any
/// connection-level failure must be reported as
/// [`XlinkError::Connection`](crate::XlinkError::Connection) so that the
/// import can be interrupted.
pub trait CityDatabase: Send + Sync {
    /// Maximum number of writes per batch
    fn max_batch_size(&self) -> usize;

    /// `select id from surface_geometry where root_id = ? and gml_id = ?`
    fn surface_geometry_id(&self, root_id: RowId, gml_id: &str) -> Result<Option<RowId>>;

    /// `select id, objectclass from cityobject where gml_id = ?`
    fn cityobject_by_gml_id(&self, gml_id: &str) -> Result<Option<(RowId, ObjectClass)>>;

    /// `select id from surface_data where gml_id = ?`
    fn surface_data_by_gml_id(&self, gml_id: &str) -> Result<Option<RowId>>;

    /// Surface rows reachable from `id` through `parent_id`, parents before children
    fn surface_geometry_hierarchy(&self, id: RowId) -> Result<Vec<SurfaceGeometryRow>>;

    /// Single surface data row
    fn surface_data(&self, id: RowId) -> Result<Option<SurfaceDataRow>>;

    /// Texture parameter rows of a surface data row
    fn texture_params(&self, surface_data_id: RowId) -> Result<Vec<TextureParamRow>>;

    /// Allocate a fresh id from a sequence
    fn next_id(&self, sequence: Sequence) -> Result<RowId>;

    /// Execute a batch of writes as one unit
    fn execute_batch(&self, writes: &[Write]) -> Result<()>;
}

/// Opens external files referenced by pending records
pub trait StreamOpener: Send + Sync {
    /// Open a file reference (URL or path relative to the import root)
    ///
    /// Missing and zero-length files are reported as errors.
    fn open(&self, reference: &str) -> Result<Box<dyn Read + Send>>;
}

/// Receiver of progress notifications
///
/// All methods default to no-ops; nothing in the engine depends on what a
/// sink does with the events.
pub trait EventSink: Send + Sync {
    /// Coarse progress over the whole resolution run
    fn on_progress(&self, _phase: &str, _percent: f32) {}

    /// Records of a kind were written
    fn on_resolved(&self, _kind: XlinkKind, _count: usize) {}

    /// A pass of a kind completed and its writes are durable
    fn on_pass_complete(&self, _kind: XlinkKind, _pass: usize, _unresolved: usize) {}
}

/// Event sink that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {}
