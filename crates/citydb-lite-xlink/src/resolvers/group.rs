// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Group membership and group parents

use super::{mismatched, PassContext, Resolution, ResolverContext, XlinkResolver};
use crate::batch::BatchWriter;
use citydb_lite_model::{IdType, PendingReference, Result, Table, Write, XlinkKind};
use std::sync::Arc;

/// Resolver for `group_to_cityobject` rows and group parents
///
/// A member that is itself a group is only linked once none of its own
/// member records are left in the current mirror, so nested groups resolve
/// innermost first over several passes.
pub struct GroupResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl GroupResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }
}

impl XlinkResolver for GroupResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::GroupMembership
    }

    fn insert(&mut self, record: &PendingReference, pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::GroupMembership(xlink) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let Some(entry) = self.ctx.ids.resolve(&xlink.gml_id, IdType::CityObject, false)? else {
            return Ok(Resolution::Deferred);
        };
        let Some(member) = entry.id else {
            return Ok(Resolution::Deferred);
        };

        if xlink.is_parent {
            self.writer.push(Write::UpdateColumn {
                table: Table::CityObjectGroup,
                column: "parent_cityobject_id".into(),
                id: xlink.group_id,
                value: member,
            })?;
            return Ok(Resolution::Resolved);
        }

        let is_group = entry.object_class.is_some_and(|c| c.is_group());
        if is_group && member != xlink.group_id && pass.snapshot.has_owner(member) {
            log::trace!(
                "group {} waits for members of nested group {}",
                xlink.group_id,
                member
            );
            return Ok(Resolution::Deferred);
        }

        self.writer.push(Write::InsertGroupMember {
            group_id: xlink.group_id,
            member_id: member,
            role: xlink.role.clone(),
        })?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}
