// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry values and the persisted rows that carry them
//!
//! Coordinates are flat `f64` arrays in the order the database adapter
//! expects them (`x, y, z, x, y, z, ...`). Encoding to a native geometry
//! type is the adapter's business.

use crate::RowId;
use serde::{Deserialize, Serialize};

/// Number of ordinates per vertex of a surface ring
pub const SURFACE_DIMENSION: usize = 3;

/// Number of ordinates per texture coordinate
pub const TEXTURE_DIMENSION: usize = 2;

/// Planar polygon; the first ring is the exterior ring
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Vec<f64>>,
}

impl Polygon {
    /// Create a polygon from its rings
    pub fn new(rings: Vec<Vec<f64>>) -> Self {
        Self { rings }
    }

    /// Check if the polygon has no rings
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Total vertex count over all rings
    pub fn vertex_count(&self) -> usize {
        self.rings.iter().map(|r| r.len() / SURFACE_DIMENSION).sum()
    }
}

/// Solid bounded by the exterior rings of its surfaces
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub exterior: Vec<Vec<f64>>,
}

impl Solid {
    /// Number of exterior rings
    pub fn ring_count(&self) -> usize {
        self.exterior.len()
    }
}

/// Geometry written into a geometry column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GeometryValue {
    Polygon(Polygon),
    Solid(Solid),
    CompositeSolid(Vec<Solid>),
}

impl GeometryValue {
    /// Number of solid members (0 for polygons)
    pub fn solid_count(&self) -> usize {
        match self {
            GeometryValue::Polygon(_) => 0,
            GeometryValue::Solid(_) => 1,
            GeometryValue::CompositeSolid(members) => members.len(),
        }
    }
}

/// Row of the surface geometry table
///
/// A row with geometry is a leaf polygon. A row without geometry is an
/// aggregation node (surface, shell, solid or composite) whose children
/// point at it through `parent_id`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGeometryRow {
    pub id: RowId,
    pub gml_id: Option<String>,
    pub parent_id: Option<RowId>,
    pub root_id: RowId,
    pub is_solid: bool,
    pub is_composite: bool,
    pub is_triangulated: bool,
    /// Row was copied from a referenced surface
    pub is_xlink: bool,
    pub is_reverse: bool,
    /// Row stands in for a surface that is still referenced by a pending record
    pub is_placeholder: bool,
    pub geometry: Option<Polygon>,
    pub solid_geometry: Option<GeometryValue>,
    pub cityobject_id: Option<RowId>,
}

impl SurfaceGeometryRow {
    /// Create a leaf row holding a polygon
    pub fn leaf(id: RowId, parent_id: RowId, root_id: RowId, polygon: Polygon) -> Self {
        Self {
            id,
            parent_id: Some(parent_id),
            root_id,
            geometry: Some(polygon),
            ..Default::default()
        }
    }

    /// Create an aggregation row
    pub fn aggregate(id: RowId, parent_id: Option<RowId>, root_id: RowId) -> Self {
        Self {
            id,
            parent_id,
            root_id,
            ..Default::default()
        }
    }

    /// Mark the row as solid
    pub fn solid(mut self) -> Self {
        self.is_solid = true;
        self
    }

    /// Mark the row as composite
    pub fn composite(mut self) -> Self {
        self.is_composite = true;
        self
    }

    /// Set the symbolic identifier
    pub fn with_gml_id(mut self, gml_id: impl Into<String>) -> Self {
        self.gml_id = Some(gml_id.into());
        self
    }
}

/// Class of a surface data row
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceDataClass {
    #[default]
    X3dMaterial,
    ParameterizedTexture,
    GeoreferencedTexture,
}

/// Row of the surface data table
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDataRow {
    pub id: RowId,
    pub gml_id: Option<String>,
    pub class: SurfaceDataClass,
    pub is_front: bool,
    pub diffuse_color: Option<[f64; 3]>,
    pub transparency: Option<f64>,
    pub tex_image_id: Option<RowId>,
    pub gt_orientation: Option<String>,
    pub gt_reference_point: Option<[f64; 2]>,
}

/// Row of the texture parameter table
///
/// At most one of `texture_coordinates` and `world_to_texture` is set; a
/// row with neither only binds a material to a surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureParamRow {
    pub surface_geometry_id: RowId,
    pub surface_data_id: RowId,
    pub is_texture_parametrization: bool,
    pub world_to_texture: Option<[f64; 12]>,
    pub texture_coordinates: Option<Vec<Vec<f64>>>,
}
