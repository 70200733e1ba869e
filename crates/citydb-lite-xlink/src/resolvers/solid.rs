// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Derived solid geometry

use super::{mismatched, PassContext, Resolution, ResolverContext, XlinkResolver};
use crate::batch::BatchWriter;
use citydb_lite_geometry::SolidRebuilder;
use citydb_lite_model::{PendingReference, Result, Write, XlinkKind};
use std::sync::Arc;

/// Rebuilds the solid column of solid roots from their surface rows
///
/// Runs after shared surfaces are copied, so every face is in place.
pub struct SolidGeometryResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl SolidGeometryResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }
}

impl XlinkResolver for SolidGeometryResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::SolidGeometry
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::SolidGeometry(solid) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let rows = self.ctx.db.surface_geometry_hierarchy(solid.id)?;
        if rows.is_empty() {
            return Ok(Resolution::Deferred);
        }

        let Some(geometry) = SolidRebuilder::rebuild(solid.id, &rows) else {
            log::debug!("solid {} has no geometry to write", solid.id);
            return Ok(Resolution::Failed);
        };

        self.writer.push(Write::UpdateSolidGeometry {
            id: solid.id,
            geometry,
        })?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{run, Fixture};
    use super::*;
    use citydb_lite_model::{GeometryValue, Polygon, RowId, SolidGeometryXlink, SurfaceGeometryRow};

    fn face(id: i64, parent: i64, root: i64) -> SurfaceGeometryRow {
        SurfaceGeometryRow::leaf(
            RowId(id),
            RowId(parent),
            RowId(root),
            Polygon::new(vec![vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]]),
        )
    }

    fn solid(id: i64) -> PendingReference {
        PendingReference::SolidGeometry(SolidGeometryXlink { id: RowId(id) })
    }

    #[test]
    fn test_rebuilds_solid_and_composite() {
        let fx = Fixture::new();
        // Solid 1 with a shell of four faces
        let root = SurfaceGeometryRow::aggregate(RowId(1), None, RowId(1)).solid();
        fx.db.insert_surface_geometry(root);
        fx.db.insert_surface_geometry(SurfaceGeometryRow::aggregate(
            RowId(2),
            Some(RowId(1)),
            RowId(1),
        ));
        for id in 3..7 {
            fx.db.insert_surface_geometry(face(id, 2, 1));
        }
        // Composite 10 with two solids of one face each
        fx.db.insert_surface_geometry(
            SurfaceGeometryRow::aggregate(RowId(10), None, RowId(10)).solid().composite(),
        );
        for (solid_id, face_id) in [(11, 12), (13, 14)] {
            fx.db.insert_surface_geometry(
                SurfaceGeometryRow::aggregate(RowId(solid_id), Some(RowId(10)), RowId(10)).solid(),
            );
            fx.db.insert_surface_geometry(face(face_id, solid_id, 10));
        }

        let mut resolver = SolidGeometryResolver::new(fx.ctx.clone());
        let result = run(&mut resolver, vec![solid(1), solid(10)]);
        assert_eq!(result, vec![Resolution::Resolved, Resolution::Resolved]);

        match fx.db.surface_geometry_row(RowId(1)).unwrap().solid_geometry {
            Some(GeometryValue::Solid(s)) => assert_eq!(s.ring_count(), 4),
            other => panic!("expected a solid, got {:?}", other),
        }
        assert_eq!(
            fx.db
                .surface_geometry_row(RowId(10))
                .unwrap()
                .solid_geometry
                .map(|g| g.solid_count()),
            Some(2)
        );
    }

    #[test]
    fn test_nothing_to_write() {
        let fx = Fixture::new();
        let root = SurfaceGeometryRow::aggregate(RowId(1), None, RowId(1)).solid();
        fx.db.insert_surface_geometry(root);
        let mut resolver = SolidGeometryResolver::new(fx.ctx.clone());

        let result = run(&mut resolver, vec![solid(1), solid(99)]);
        assert_eq!(result, vec![Resolution::Failed, Resolution::Deferred]);
        assert_eq!(fx.db.writes_executed(), 0);
    }
}
