// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pending reference records
//!
//! One record is written by the import layer for every reference whose
//! target could not be resolved when the referencing row was inserted.

use crate::{RowId, Table, XlinkKind};
use serde::{Deserialize, Serialize};

/// Strip the leading reference marker from a symbolic identifier
///
/// `xlink:href` values arrive as `#UUID_...`; the cache and the feature
/// tables store the bare identifier.
pub fn normalize_gml_id(gml_id: &str) -> &str {
    gml_id.trim().trim_start_matches('#')
}

/// Foreign key or link table row waiting for its target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasicXlink {
    /// Row in `from_table` that owns the reference
    pub id: RowId,
    pub from_table: Table,
    pub to_table: Table,
    /// Column name or link table role
    pub attribute: String,
    pub gml_id: String,
}

/// Group member or group parent waiting for its target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupXlink {
    pub group_id: RowId,
    pub gml_id: String,
    pub role: Option<String>,
    /// The referenced object is the parent of the group rather than a member
    pub is_parent: bool,
}

/// Placeholder surface row that shares the geometry of another surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGeometryXlink {
    /// Placeholder row written during import
    pub id: RowId,
    pub parent_id: Option<RowId>,
    pub root_id: RowId,
    /// The reference sits inside an orientable surface with negative orientation
    pub reverse: bool,
    pub gml_id: String,
    pub cityobject_id: Option<RowId>,
}

/// Texture coordinates of one linear ring
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureCoordListXlink {
    /// Surface data row the coordinates belong to
    pub surface_data_id: RowId,
    /// Symbolic identifier of the linear ring
    pub ring_gml_id: String,
    /// Whitespace separated s/t pairs
    pub coordinates: String,
}

/// Texture parameterization of one target surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureParamXlink {
    pub surface_data_id: RowId,
    pub target_uri: String,
    /// Row-major 3x4 world-to-texture matrix of a `TexCoordGen`
    pub world_to_texture: Option<String>,
}

/// Target that reuses the parameterization of another texture association
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureAssociationXlink {
    pub surface_data_id: RowId,
    pub target_uri: String,
    /// Symbolic identifier of the referenced association
    pub gml_id: String,
}

/// External file whose content belongs in a binary column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileXlink {
    pub id: RowId,
    pub file_uri: String,
}

/// Surface data that uses a texture image imported elsewhere
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureImageLinkXlink {
    pub surface_data_id: RowId,
    pub image_uri: String,
}

/// Material declared through the deprecated appearance encoding
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeprecatedMaterialXlink {
    pub appearance_id: RowId,
    /// Symbolic identifier of the source surface data
    pub gml_id: String,
    pub surface_geometry_id: RowId,
}

/// Solid whose geometry column is derived from its surface rows
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolidGeometryXlink {
    pub id: RowId,
}

/// One unresolved link
///
/// Records are immutable once appended: resolvers consume or defer them,
/// never rewrite them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PendingReference {
    Basic(BasicXlink),
    GroupMembership(GroupXlink),
    SurfaceGeometry(SurfaceGeometryXlink),
    TextureCoordList(TextureCoordListXlink),
    TextureParam(TextureParamXlink),
    TextureAssociation(TextureAssociationXlink),
    TextureImage(FileXlink),
    TextureImageLink(TextureImageLinkXlink),
    DeprecatedMaterial(DeprecatedMaterialXlink),
    LibraryObject(FileXlink),
    WorldFile(FileXlink),
    SolidGeometry(SolidGeometryXlink),
}

impl PendingReference {
    /// Ledger partition of this record
    pub fn kind(&self) -> XlinkKind {
        match self {
            PendingReference::Basic(_) => XlinkKind::Basic,
            PendingReference::GroupMembership(_) => XlinkKind::GroupMembership,
            PendingReference::SurfaceGeometry(_) => XlinkKind::SurfaceGeometry,
            PendingReference::TextureCoordList(_) => XlinkKind::TextureCoordList,
            PendingReference::TextureParam(_) => XlinkKind::TextureParam,
            PendingReference::TextureAssociation(_) => XlinkKind::TextureAssociation,
            PendingReference::TextureImage(_) => XlinkKind::TextureImage,
            PendingReference::TextureImageLink(_) => XlinkKind::TextureImageLink,
            PendingReference::DeprecatedMaterial(_) => XlinkKind::DeprecatedMaterial,
            PendingReference::LibraryObject(_) => XlinkKind::LibraryObject,
            PendingReference::WorldFile(_) => XlinkKind::WorldFile,
            PendingReference::SolidGeometry(_) => XlinkKind::SolidGeometry,
        }
    }

    /// Row that receives the write once the reference resolves
    pub fn owner_id(&self) -> RowId {
        match self {
            PendingReference::Basic(r) => r.id,
            PendingReference::GroupMembership(r) => r.group_id,
            PendingReference::SurfaceGeometry(r) => r.id,
            PendingReference::TextureCoordList(r) => r.surface_data_id,
            PendingReference::TextureParam(r) => r.surface_data_id,
            PendingReference::TextureAssociation(r) => r.surface_data_id,
            PendingReference::TextureImage(r) => r.id,
            PendingReference::TextureImageLink(r) => r.surface_data_id,
            PendingReference::DeprecatedMaterial(r) => r.appearance_id,
            PendingReference::LibraryObject(r) => r.id,
            PendingReference::WorldFile(r) => r.id,
            PendingReference::SolidGeometry(r) => r.id,
        }
    }

    /// Symbolic identifier or URI the record waits for
    pub fn symbolic_id(&self) -> &str {
        match self {
            PendingReference::Basic(r) => normalize_gml_id(&r.gml_id),
            PendingReference::GroupMembership(r) => normalize_gml_id(&r.gml_id),
            PendingReference::SurfaceGeometry(r) => normalize_gml_id(&r.gml_id),
            PendingReference::TextureCoordList(r) => normalize_gml_id(&r.ring_gml_id),
            PendingReference::TextureParam(r) => normalize_gml_id(&r.target_uri),
            PendingReference::TextureAssociation(r) => normalize_gml_id(&r.gml_id),
            PendingReference::TextureImage(r) => &r.file_uri,
            PendingReference::TextureImageLink(r) => &r.image_uri,
            PendingReference::DeprecatedMaterial(r) => normalize_gml_id(&r.gml_id),
            PendingReference::LibraryObject(r) => &r.file_uri,
            PendingReference::WorldFile(r) => &r.file_uri,
            PendingReference::SolidGeometry(_) => "",
        }
    }
}

/// Linear ring recorded during import, used to place texture coordinates
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearRingEntry {
    pub gml_id: String,
    /// Symbolic identifier of the polygon that owns the ring
    pub parent_gml_id: String,
    /// 0 for the exterior ring, interior rings follow
    pub ring_no: u32,
}

/// Texture association that other associations may point at
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureAssociationTarget {
    pub surface_data_id: RowId,
    pub gml_id: String,
    pub target_uri: String,
}
