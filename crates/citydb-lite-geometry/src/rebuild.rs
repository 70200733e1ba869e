// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid reconstruction from persisted surface rows
//!
//! The import writes solids as a hierarchy of surface rows: aggregation
//! rows without geometry and leaf rows holding one polygon each. Once all
//! shared surfaces are resolved, the solid itself is composed bottom-up from
//! its leaves and written into the solid geometry column of the root row.

use citydb_lite_model::{GeometryValue, Polygon, RowId, Solid, SurfaceGeometryRow};
use rustc_hash::{FxHashMap, FxHashSet};

/// Node of the in-memory surface tree
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryNode {
    pub is_solid: bool,
    pub is_composite: bool,
    /// Leaf polygon, `None` for aggregation nodes
    pub geometry: Option<Polygon>,
    pub children: Vec<GeometryNode>,
}

impl GeometryNode {
    /// Build the tree rooted at `root_id` from a flat row set
    ///
    /// Children keep the order of `rows`. Rows that are not reachable from
    /// the root are ignored, and a parent link that loops back is cut.
    pub fn from_rows(root_id: RowId, rows: &[SurfaceGeometryRow]) -> Option<Self> {
        let mut by_id: FxHashMap<RowId, &SurfaceGeometryRow> = FxHashMap::default();
        let mut children: FxHashMap<RowId, Vec<&SurfaceGeometryRow>> = FxHashMap::default();

        for row in rows {
            by_id.insert(row.id, row);
            if let Some(parent) = row.parent_id {
                if row.id != root_id {
                    children.entry(parent).or_default().push(row);
                }
            }
        }

        let root = by_id.get(&root_id)?;
        let mut visited = FxHashSet::default();
        Some(Self::build(root, &children, &mut visited))
    }

    fn build(
        row: &SurfaceGeometryRow,
        children: &FxHashMap<RowId, Vec<&SurfaceGeometryRow>>,
        visited: &mut FxHashSet<RowId>,
    ) -> Self {
        visited.insert(row.id);

        let mut child_nodes = Vec::new();
        for child in children.get(&row.id).into_iter().flatten() {
            if !visited.contains(&child.id) {
                child_nodes.push(Self::build(child, children, visited));
            }
        }

        Self {
            is_solid: row.is_solid,
            is_composite: row.is_composite,
            geometry: row.geometry.clone(),
            children: child_nodes,
        }
    }

    /// Number of leaf polygons below (and including) this node
    pub fn leaf_count(&self) -> usize {
        let own = usize::from(self.geometry.is_some());
        own + self.children.iter().map(|c| c.leaf_count()).sum::<usize>()
    }
}

/// Composes leaf polygons into solids
pub struct SolidRebuilder;

impl SolidRebuilder {
    /// Rebuild the solid geometry of the row `root_id`
    ///
    /// Returns `None` when there is nothing to write: the root is missing,
    /// no leaf polygon exists, or a non-composite root yields other than
    /// exactly one solid.
    pub fn rebuild(root_id: RowId, rows: &[SurfaceGeometryRow]) -> Option<GeometryValue> {
        let root = GeometryNode::from_rows(root_id, rows)?;
        Self::rebuild_tree(&root)
    }

    /// Rebuild from an already constructed tree
    pub fn rebuild_tree(root: &GeometryNode) -> Option<GeometryValue> {
        let mut polygons = Vec::new();
        let mut solids = Vec::new();
        Self::visit(root, &mut polygons, &mut solids);

        if root.is_composite {
            if solids.is_empty() {
                return None;
            }
            return Some(GeometryValue::CompositeSolid(solids));
        }

        match solids.len() {
            0 => None,
            1 => solids.pop().map(GeometryValue::Solid),
            n => {
                log::debug!("Non-composite solid root produced {} solids, skipping", n);
                None
            }
        }
    }

    /// Post-order traversal; every solid node consumes the polygons collected so far
    fn visit(node: &GeometryNode, polygons: &mut Vec<Polygon>, solids: &mut Vec<Solid>) {
        for child in &node.children {
            Self::visit(child, polygons, solids);
        }

        if let Some(polygon) = &node.geometry {
            polygons.push(polygon.clone());
        }

        if node.is_solid && !node.is_composite && !polygons.is_empty() {
            let exterior = polygons.drain(..).flat_map(|p| p.rings).collect();
            solids.push(Solid { exterior });
        }
    }
}
