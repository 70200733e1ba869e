// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared surface geometry
//!
//! A surface referenced by `xlink:href` is written as a placeholder row
//! during import. Once the referenced subtree is complete it is copied
//! under the placeholder: the root of the subtree overwrites the
//! placeholder and every descendant gets a fresh id in the referencing
//! tree. Ring winding is flipped where the composed orientation is
//! negative.

use super::{failed, mismatched, PassContext, Resolution, ResolverContext, XlinkResolver};
use crate::batch::BatchWriter;
use citydb_lite_geometry::reverse_polygon;
use citydb_lite_model::{
    IdType, PendingReference, Result, RowId, Sequence, SurfaceGeometryRow, SurfaceGeometryXlink,
    Write, XlinkKind,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub struct SurfaceGeometryResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl SurfaceGeometryResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }

    /// Copy of a referenced row placed in the referencing tree
    fn copy_row(
        row: &SurfaceGeometryRow,
        id: RowId,
        parent_id: Option<RowId>,
        xlink: &SurfaceGeometryXlink,
        reverse: bool,
    ) -> citydb_lite_geometry::Result<SurfaceGeometryRow> {
        let geometry = match (&row.geometry, reverse) {
            (Some(polygon), true) => Some(reverse_polygon(polygon)?),
            (geometry, _) => geometry.clone(),
        };

        Ok(SurfaceGeometryRow {
            id,
            gml_id: row.gml_id.clone(),
            parent_id,
            root_id: xlink.root_id,
            is_solid: row.is_solid,
            is_composite: row.is_composite,
            is_triangulated: row.is_triangulated,
            is_xlink: true,
            is_reverse: row.is_reverse ^ reverse,
            is_placeholder: false,
            geometry,
            solid_geometry: None,
            cityobject_id: xlink.cityobject_id,
        })
    }
}

impl XlinkResolver for SurfaceGeometryResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::SurfaceGeometry
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::SurfaceGeometry(xlink) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let Some(entry) = self
            .ctx
            .ids
            .resolve(&xlink.gml_id, IdType::SurfaceGeometry, false)?
        else {
            return Ok(Resolution::Deferred);
        };
        let Some(target) = entry.id else {
            return Ok(Resolution::Deferred);
        };
        if target == xlink.id {
            return Ok(failed(self.kind(), record, "surface references itself"));
        }

        // The referenced subtree must be final before it is copied
        let rows = self.ctx.db.surface_geometry_hierarchy(target)?;
        if rows.is_empty() || rows.iter().any(|row| row.is_placeholder) {
            return Ok(Resolution::Deferred);
        }

        let reverse = xlink.reverse ^ entry.reverse;
        let mut id_map: FxHashMap<RowId, RowId> = FxHashMap::default();
        let mut writes = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            let (id, parent_id) = if i == 0 {
                (xlink.id, xlink.parent_id)
            } else {
                let parent = row
                    .parent_id
                    .and_then(|p| id_map.get(&p).copied())
                    .unwrap_or(xlink.id);
                (self.ctx.db.next_id(Sequence::SurfaceGeometry)?, Some(parent))
            };
            id_map.insert(row.id, id);

            let copy = match Self::copy_row(row, id, parent_id, xlink, reverse) {
                Ok(copy) => copy,
                Err(e) => return Ok(failed(self.kind(), record, e)),
            };
            writes.push(if i == 0 {
                Write::UpdateSurfaceGeometry(copy)
            } else {
                Write::InsertSurfaceGeometry(copy)
            });
        }

        self.writer.extend(writes)?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}
