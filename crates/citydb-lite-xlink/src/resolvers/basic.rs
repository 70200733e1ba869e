// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Foreign keys and link table rows

use super::{failed, mismatched, PassContext, Resolution, ResolverContext, XlinkResolver};
use crate::batch::BatchWriter;
use citydb_lite_model::{LinkTable, PendingReference, Result, Table, Write, XlinkKind};
use std::sync::Arc;

/// Foreign key column filled by a basic reference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForeignKey {
    OpeningAddress,
    BuildingParent,
    BridgeParent,
    TunnelParent,
    Lod1ImplicitRep,
    Lod2ImplicitRep,
    Lod3ImplicitRep,
    Lod4ImplicitRep,
}

impl ForeignKey {
    /// Column name in the owning table
    pub fn column(&self) -> &'static str {
        match self {
            ForeignKey::OpeningAddress => "address_id",
            ForeignKey::BuildingParent => "building_parent_id",
            ForeignKey::BridgeParent => "bridge_parent_id",
            ForeignKey::TunnelParent => "tunnel_parent_id",
            ForeignKey::Lod1ImplicitRep => "lod1_implicit_rep_id",
            ForeignKey::Lod2ImplicitRep => "lod2_implicit_rep_id",
            ForeignKey::Lod3ImplicitRep => "lod3_implicit_rep_id",
            ForeignKey::Lod4ImplicitRep => "lod4_implicit_rep_id",
        }
    }
}

/// Write a resolved basic reference turns into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BasicLink {
    /// Foreign key column of the owning row
    Column(ForeignKey),
    /// Row of a link table, owner on the left
    Link(LinkTable),
}

impl BasicLink {
    /// Classify a `(from_table, to_table, attribute)` triple
    ///
    /// Anything outside the known set yields `None`.
    pub fn classify(from: Table, to: Table, attribute: &str) -> Option<Self> {
        let link = match (from, to, attribute) {
            (Table::CityModel, _, "cityobject_member") => LinkTable::CityObjectMember,
            (Table::CityObject, Table::CityObject, "generalizes_to") => LinkTable::Generalization,
            (Table::Building, Table::Address, "address") => LinkTable::AddressToBuilding,
            (Table::Bridge, Table::Address, "address") => LinkTable::AddressToBridge,
            (Table::Appearance, Table::SurfaceData, "surface_data") => {
                LinkTable::AppearToSurfaceData
            }
            (from, to, column) => {
                return Self::classify_column(from, to, column).map(BasicLink::Column);
            }
        };
        Some(BasicLink::Link(link))
    }

    fn classify_column(from: Table, to: Table, column: &str) -> Option<ForeignKey> {
        let key = match (from, to, column) {
            (Table::Opening, Table::Address, "address_id") => ForeignKey::OpeningAddress,
            (Table::Building, Table::Building, "building_parent_id") => ForeignKey::BuildingParent,
            (Table::Bridge, Table::Bridge, "bridge_parent_id") => ForeignKey::BridgeParent,
            (Table::Tunnel, Table::Tunnel, "tunnel_parent_id") => ForeignKey::TunnelParent,
            (owner, Table::ImplicitGeometry, column) if has_implicit_geometry(owner) => {
                match column {
                    "lod1_implicit_rep_id" => ForeignKey::Lod1ImplicitRep,
                    "lod2_implicit_rep_id" => ForeignKey::Lod2ImplicitRep,
                    "lod3_implicit_rep_id" => ForeignKey::Lod3ImplicitRep,
                    "lod4_implicit_rep_id" => ForeignKey::Lod4ImplicitRep,
                    _ => return None,
                }
            }
            _ => return None,
        };
        Some(key)
    }
}

fn has_implicit_geometry(table: Table) -> bool {
    matches!(
        table,
        Table::CityObject | Table::Building | Table::Bridge | Table::Tunnel | Table::Opening
    )
}

/// Resolver for plain foreign keys and link tables
pub struct BasicResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl BasicResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }
}

impl XlinkResolver for BasicResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::Basic
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::Basic(xlink) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let Some(link) = BasicLink::classify(xlink.from_table, xlink.to_table, &xlink.attribute)
        else {
            return Ok(failed(
                self.kind(),
                record,
                format!(
                    "unsupported reference {}.{} -> {}",
                    xlink.from_table, xlink.attribute, xlink.to_table
                ),
            ));
        };

        // The feature table is authoritative for objects written by other features
        let target = self
            .ctx
            .ids
            .resolve(&xlink.gml_id, xlink.to_table.id_type(), true)?
            .and_then(|entry| entry.id);
        let Some(target) = target else {
            return Ok(Resolution::Deferred);
        };

        let write = match link {
            BasicLink::Column(key) => Write::UpdateColumn {
                table: xlink.from_table,
                column: key.column().to_string(),
                id: xlink.id,
                value: target,
            },
            BasicLink::Link(table) => Write::InsertLink {
                table,
                left: xlink.id,
                right: target,
            },
        };
        self.writer.push(write)?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}
