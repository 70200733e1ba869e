// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Materials of the deprecated appearance encoding
//!
//! The old encoding attaches a material to a geometry by reference instead
//! of listing targets on the material. Every appearance that uses a
//! material gets its own copy of the surface data row.

use super::{mismatched, PassContext, Resolution, ResolverContext, XlinkResolver};
use crate::batch::BatchWriter;
use citydb_lite_model::{
    IdType, LinkTable, PendingReference, Result, RowId, Sequence, SurfaceDataRow,
    TextureParamRow, Write, XlinkKind,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub struct DeprecatedMaterialResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
    /// (appearance, source surface data) -> copy
    copies: FxHashMap<(RowId, RowId), RowId>,
}

impl DeprecatedMaterialResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self {
            ctx,
            writer,
            copies: FxHashMap::default(),
        }
    }

    /// Copy a surface data row and its parameterizations for an appearance
    fn copy_surface_data(
        &mut self,
        appearance_id: RowId,
        source: &SurfaceDataRow,
    ) -> Result<RowId> {
        let id = self.ctx.db.next_id(Sequence::SurfaceData)?;
        let params = self.ctx.db.texture_params(source.id)?;

        let mut writes = Vec::with_capacity(params.len() + 2);
        writes.push(Write::InsertSurfaceData(SurfaceDataRow {
            id,
            gml_id: None,
            ..source.clone()
        }));
        writes.push(Write::InsertLink {
            table: LinkTable::AppearToSurfaceData,
            left: appearance_id,
            right: id,
        });
        writes.extend(params.into_iter().map(|param| {
            Write::InsertTextureParam(TextureParamRow {
                surface_data_id: id,
                ..param
            })
        }));

        self.writer.extend(writes)?;
        self.copies.insert((appearance_id, source.id), id);
        Ok(id)
    }
}

impl XlinkResolver for DeprecatedMaterialResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::DeprecatedMaterial
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::DeprecatedMaterial(material) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let source_id = self
            .ctx
            .ids
            .resolve(&material.gml_id, IdType::SurfaceData, false)?
            .and_then(|entry| entry.id);
        let Some(source_id) = source_id else {
            return Ok(Resolution::Deferred);
        };

        let copy = match self.copies.get(&(material.appearance_id, source_id)) {
            Some(&copy) => copy,
            None => {
                let Some(source) = self.ctx.db.surface_data(source_id)? else {
                    return Ok(Resolution::Deferred);
                };
                self.copy_surface_data(material.appearance_id, &source)?
            }
        };

        self.writer.push(Write::InsertTextureParam(TextureParamRow {
            surface_geometry_id: material.surface_geometry_id,
            surface_data_id: copy,
            is_texture_parametrization: false,
            world_to_texture: None,
            texture_coordinates: None,
        }))?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}
