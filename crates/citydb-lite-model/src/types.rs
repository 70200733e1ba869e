// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for deferred reference resolution
//!
//! This module defines the identifiers and enumerations shared by the
//! ledger, the database adapter and the resolvers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe database row identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        RowId(id)
    }
}

impl From<RowId> for i64 {
    fn from(id: RowId) -> Self {
        id.0
    }
}

/// Kind of pending reference
///
/// Every kind has exactly one resolver. The declaration order is the order
/// in which reports list the kinds, not the order of resolution.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum XlinkKind {
    /// Single foreign key column or link table row
    Basic,
    /// City object group member or group parent
    GroupMembership,
    /// Shared surface geometry subtree
    SurfaceGeometry,
    /// Texture coordinates of a linear ring
    TextureCoordList,
    /// Texture parameterization (materials, world-to-texture transforms)
    TextureParam,
    /// Texture association pointing at another parameterization
    TextureAssociation,
    /// Texture image file content
    TextureImage,
    /// Surface data to texture image link
    TextureImageLink,
    /// Material copied from a deprecated appearance encoding
    DeprecatedMaterial,
    /// Library object file content of an implicit geometry
    LibraryObject,
    /// World file of a georeferenced texture
    WorldFile,
    /// Solid rebuilt from its surface rows
    SolidGeometry,
}

impl XlinkKind {
    /// All kinds in declaration order
    pub const ALL: [XlinkKind; 12] = [
        XlinkKind::Basic,
        XlinkKind::GroupMembership,
        XlinkKind::SurfaceGeometry,
        XlinkKind::TextureCoordList,
        XlinkKind::TextureParam,
        XlinkKind::TextureAssociation,
        XlinkKind::TextureImage,
        XlinkKind::TextureImageLink,
        XlinkKind::DeprecatedMaterial,
        XlinkKind::LibraryObject,
        XlinkKind::WorldFile,
        XlinkKind::SolidGeometry,
    ];

    /// Stable name used in logs and ledger partitions
    pub fn name(&self) -> &'static str {
        match self {
            XlinkKind::Basic => "basic",
            XlinkKind::GroupMembership => "group-membership",
            XlinkKind::SurfaceGeometry => "surface-geometry",
            XlinkKind::TextureCoordList => "texture-coordinate-list",
            XlinkKind::TextureParam => "texture-parameterization",
            XlinkKind::TextureAssociation => "texture-association",
            XlinkKind::TextureImage => "texture-image-file",
            XlinkKind::TextureImageLink => "texture-image-link",
            XlinkKind::DeprecatedMaterial => "deprecated-material",
            XlinkKind::LibraryObject => "library-object-file",
            XlinkKind::WorldFile => "world-file",
            XlinkKind::SolidGeometry => "solid-geometry",
        }
    }

    /// Whether resolving this kind can make other records of the same kind resolvable
    pub fn is_multi_pass(&self) -> bool {
        matches!(self, XlinkKind::GroupMembership | XlinkKind::SurfaceGeometry)
    }
}

impl fmt::Display for XlinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relational tables referenced by pending references
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    CityModel,
    CityObject,
    CityObjectGroup,
    Building,
    Bridge,
    Tunnel,
    ThematicSurface,
    Opening,
    Address,
    SurfaceGeometry,
    ImplicitGeometry,
    Appearance,
    SurfaceData,
    TextureParam,
    TexImage,
}

impl Table {
    /// SQL table name
    pub fn name(&self) -> &'static str {
        match self {
            Table::CityModel => "citymodel",
            Table::CityObject => "cityobject",
            Table::CityObjectGroup => "cityobjectgroup",
            Table::Building => "building",
            Table::Bridge => "bridge",
            Table::Tunnel => "tunnel",
            Table::ThematicSurface => "thematic_surface",
            Table::Opening => "opening",
            Table::Address => "address",
            Table::SurfaceGeometry => "surface_geometry",
            Table::ImplicitGeometry => "implicit_geometry",
            Table::Appearance => "appearance",
            Table::SurfaceData => "surface_data",
            Table::TextureParam => "textureparam",
            Table::TexImage => "tex_image",
        }
    }

    /// Identifier cache that holds the rows of this table
    pub fn id_type(&self) -> IdType {
        match self {
            Table::SurfaceGeometry => IdType::SurfaceGeometry,
            Table::SurfaceData => IdType::SurfaceData,
            Table::TexImage => IdType::TexImage,
            Table::ImplicitGeometry => IdType::ImplicitGeometry,
            _ => IdType::CityObject,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Link tables written by basic and group resolvers
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTable {
    CityObjectMember,
    Generalization,
    AddressToBuilding,
    AddressToBridge,
    AppearToSurfaceData,
    GroupToCityObject,
}

impl LinkTable {
    /// SQL table name
    pub fn name(&self) -> &'static str {
        match self {
            LinkTable::CityObjectMember => "cityobject_member",
            LinkTable::Generalization => "generalization",
            LinkTable::AddressToBuilding => "address_to_building",
            LinkTable::AddressToBridge => "address_to_bridge",
            LinkTable::AppearToSurfaceData => "appear_to_surface_data",
            LinkTable::GroupToCityObject => "group_to_cityobject",
        }
    }
}

/// Namespace of symbolic identifiers
///
/// Identifiers are only unique within one namespace, so the identifier
/// cache is partitioned the same way.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum IdType {
    SurfaceGeometry,
    CityObject,
    SurfaceData,
    TexImage,
    ImplicitGeometry,
}

/// Feature class of a city object row
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ObjectClass {
    Building,
    BuildingPart,
    Bridge,
    Tunnel,
    CityObjectGroup,
    GenericCityObject,
    ThematicSurface,
    Opening,
    Address,
    Other,
}

impl ObjectClass {
    /// Whether members of this class can contain other city objects by reference
    pub fn is_group(&self) -> bool {
        matches!(self, ObjectClass::CityObjectGroup)
    }
}

/// Sequences used to allocate fresh row ids
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Sequence {
    SurfaceGeometry,
    SurfaceData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_unique() {
        let mut names: Vec<_> = XlinkKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), XlinkKind::ALL.len());
    }

    #[test]
    fn test_multi_pass_kinds() {
        let multi: Vec<_> = XlinkKind::ALL
            .iter()
            .filter(|k| k.is_multi_pass())
            .collect();
        assert_eq!(
            multi,
            vec![&XlinkKind::GroupMembership, &XlinkKind::SurfaceGeometry]
        );
    }

    #[test]
    fn test_table_id_type() {
        assert_eq!(Table::SurfaceGeometry.id_type(), IdType::SurfaceGeometry);
        assert_eq!(Table::Building.id_type(), IdType::CityObject);
        assert_eq!(Table::SurfaceData.id_type(), IdType::SurfaceData);
    }

    #[test]
    fn test_row_id_display() {
        assert_eq!(RowId(42).to_string(), "42");
        assert_eq!(i64::from(RowId::from(9)), 9);
    }
}
