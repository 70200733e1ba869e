// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory database adapter
//!
//! Holds the tables the resolvers read and write in plain maps. Useful for
//! dry runs and as the reference behaviour for SQL adapters.

use citydb_lite_model::{
    CityDatabase, LinkTable, ObjectClass, Result, RowId, Sequence, SurfaceDataRow,
    SurfaceGeometryRow, Table, TextureParamRow, Write, XlinkError,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

/// First id handed out by the sequences
const SEQUENCE_START: i64 = 1_000_000;

/// Default maximum batch size
const DEFAULT_BATCH_SIZE: usize = 1000;

/// Stored texture image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TexImage {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Row of `group_to_cityobject`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMember {
    pub group_id: RowId,
    pub member_id: RowId,
    pub role: Option<String>,
}

#[derive(Default)]
struct Tables {
    cityobjects: FxHashMap<String, (RowId, ObjectClass)>,
    surface_geometry: BTreeMap<RowId, SurfaceGeometryRow>,
    surface_data: BTreeMap<RowId, SurfaceDataRow>,
    texture_params: Vec<TextureParamRow>,
    tex_images: FxHashMap<RowId, TexImage>,
    library_objects: FxHashMap<RowId, Vec<u8>>,
    links: Vec<(LinkTable, RowId, RowId)>,
    group_members: Vec<GroupMember>,
    columns: FxHashMap<(Table, String, RowId), RowId>,
}

impl Tables {
    fn apply(&mut self, write: &Write) {
        match write {
            Write::UpdateColumn {
                table,
                column,
                id,
                value,
            } => {
                if *table == Table::SurfaceData && column == "tex_image_id" {
                    if let Some(row) = self.surface_data.get_mut(id) {
                        row.tex_image_id = Some(*value);
                    }
                }
                self.columns.insert((*table, column.clone(), *id), *value);
            }
            Write::InsertLink { table, left, right } => {
                self.links.push((*table, *left, *right));
            }
            Write::InsertGroupMember {
                group_id,
                member_id,
                role,
            } => self.group_members.push(GroupMember {
                group_id: *group_id,
                member_id: *member_id,
                role: role.clone(),
            }),
            Write::UpdateSurfaceGeometry(row) | Write::InsertSurfaceGeometry(row) => {
                self.surface_geometry.insert(row.id, row.clone());
            }
            Write::InsertSurfaceData(row) => {
                self.surface_data.insert(row.id, row.clone());
            }
            Write::InsertTextureParam(row) => self.texture_params.push(row.clone()),
            Write::UpdateTexImage {
                id,
                data,
                mime_type,
            } => {
                self.tex_images.insert(
                    *id,
                    TexImage {
                        data: data.clone(),
                        mime_type: mime_type.clone(),
                    },
                );
            }
            Write::UpdateLibraryObject { id, data } => {
                self.library_objects.insert(*id, data.clone());
            }
            Write::UpdateGeoreference {
                id,
                orientation,
                reference_point,
            } => {
                if let Some(row) = self.surface_data.get_mut(id) {
                    row.gt_orientation = Some(orientation.clone());
                    row.gt_reference_point = Some(*reference_point);
                }
            }
            Write::UpdateSolidGeometry { id, geometry } => {
                if let Some(row) = self.surface_geometry.get_mut(id) {
                    row.solid_geometry = Some(geometry.clone());
                }
            }
        }
    }
}

/// Database adapter backed by in-memory tables
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
    sequence: AtomicI64,
    batch_size: usize,
    connection_lost: AtomicBool,
    batches: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE)
    }

    /// Create an empty database with a specific maximum batch size
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            sequence: AtomicI64::new(SEQUENCE_START),
            batch_size: batch_size.max(1),
            connection_lost: AtomicBool::new(false),
            batches: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Simulate the loss of the connection; every call fails while set
    pub fn set_connection_lost(&self, lost: bool) {
        self.connection_lost.store(lost, Ordering::SeqCst);
    }

    fn check_connection(&self) -> Result<()> {
        if self.connection_lost.load(Ordering::SeqCst) {
            return Err(XlinkError::connection("connection reset by peer"));
        }
        Ok(())
    }

    // ========================================================================
    // Seeding (base rows written by the import)
    // ========================================================================

    /// Insert a city object row
    pub fn insert_cityobject(&self, id: RowId, gml_id: &str, class: ObjectClass) {
        self.tables
            .write()
            .cityobjects
            .insert(gml_id.to_string(), (id, class));
    }

    /// Insert a surface geometry row
    pub fn insert_surface_geometry(&self, row: SurfaceGeometryRow) {
        self.tables.write().surface_geometry.insert(row.id, row);
    }

    /// Insert a surface data row
    pub fn insert_surface_data(&self, row: SurfaceDataRow) {
        self.tables.write().surface_data.insert(row.id, row);
    }

    /// Insert a texture parameter row
    pub fn insert_texture_param(&self, row: TextureParamRow) {
        self.tables.write().texture_params.push(row);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Number of executed batches
    pub fn batches_executed(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Number of executed writes
    pub fn writes_executed(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Rows of a link table
    pub fn links(&self, table: LinkTable) -> Vec<(RowId, RowId)> {
        self.tables
            .read()
            .links
            .iter()
            .filter(|(t, _, _)| *t == table)
            .map(|(_, l, r)| (*l, *r))
            .collect()
    }

    /// Rows of `group_to_cityobject`
    pub fn group_members(&self) -> Vec<GroupMember> {
        self.tables.read().group_members.clone()
    }

    /// Value written by a column update
    pub fn column(&self, table: Table, column: &str, id: RowId) -> Option<RowId> {
        self.tables
            .read()
            .columns
            .get(&(table, column.to_string(), id))
            .copied()
    }

    /// Single surface geometry row
    pub fn surface_geometry_row(&self, id: RowId) -> Option<SurfaceGeometryRow> {
        self.tables.read().surface_geometry.get(&id).cloned()
    }

    /// All surface geometry rows ordered by id
    pub fn surface_geometry_rows(&self) -> Vec<SurfaceGeometryRow> {
        self.tables.read().surface_geometry.values().cloned().collect()
    }

    /// All surface data rows ordered by id
    pub fn surface_data_rows(&self) -> Vec<SurfaceDataRow> {
        self.tables.read().surface_data.values().cloned().collect()
    }

    /// All texture parameter rows in insertion order
    pub fn all_texture_params(&self) -> Vec<TextureParamRow> {
        self.tables.read().texture_params.clone()
    }

    /// Stored texture image
    pub fn tex_image(&self, id: RowId) -> Option<TexImage> {
        self.tables.read().tex_images.get(&id).cloned()
    }

    /// Stored library object
    pub fn library_object(&self, id: RowId) -> Option<Vec<u8>> {
        self.tables.read().library_objects.get(&id).cloned()
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl CityDatabase for MemoryDatabase {
    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    fn surface_geometry_id(&self, root_id: RowId, gml_id: &str) -> Result<Option<RowId>> {
        self.check_connection()?;
        Ok(self
            .tables
            .read()
            .surface_geometry
            .values()
            .find(|row| row.root_id == root_id && row.gml_id.as_deref() == Some(gml_id))
            .map(|row| row.id))
    }

    fn cityobject_by_gml_id(&self, gml_id: &str) -> Result<Option<(RowId, ObjectClass)>> {
        self.check_connection()?;
        Ok(self.tables.read().cityobjects.get(gml_id).copied())
    }

    fn surface_data_by_gml_id(&self, gml_id: &str) -> Result<Option<RowId>> {
        self.check_connection()?;
        Ok(self
            .tables
            .read()
            .surface_data
            .values()
            .find(|row| row.gml_id.as_deref() == Some(gml_id))
            .map(|row| row.id))
    }

    fn surface_geometry_hierarchy(&self, id: RowId) -> Result<Vec<SurfaceGeometryRow>> {
        self.check_connection()?;
        let tables = self.tables.read();

        let Some(root) = tables.surface_geometry.get(&id) else {
            return Ok(Vec::new());
        };

        let mut children: FxHashMap<RowId, Vec<&SurfaceGeometryRow>> = FxHashMap::default();
        for row in tables.surface_geometry.values() {
            if let Some(parent) = row.parent_id {
                if row.id != id {
                    children.entry(parent).or_default().push(row);
                }
            }
        }

        // Pre-order walk; the stack holds children in reverse so ids come out ascending
        let mut result = Vec::new();
        let mut seen = rustc_hash::FxHashSet::default();
        let mut stack = vec![root];
        while let Some(row) = stack.pop() {
            if !seen.insert(row.id) {
                continue;
            }
            result.push(row.clone());
            if let Some(kids) = children.get(&row.id) {
                stack.extend(kids.iter().rev());
            }
        }

        Ok(result)
    }

    fn surface_data(&self, id: RowId) -> Result<Option<SurfaceDataRow>> {
        self.check_connection()?;
        Ok(self.tables.read().surface_data.get(&id).cloned())
    }

    fn texture_params(&self, surface_data_id: RowId) -> Result<Vec<TextureParamRow>> {
        self.check_connection()?;
        Ok(self
            .tables
            .read()
            .texture_params
            .iter()
            .filter(|row| row.surface_data_id == surface_data_id)
            .cloned()
            .collect())
    }

    fn next_id(&self, _sequence: Sequence) -> Result<RowId> {
        self.check_connection()?;
        Ok(RowId(self.sequence.fetch_add(1, Ordering::SeqCst)))
    }

    fn execute_batch(&self, writes: &[Write]) -> Result<()> {
        self.check_connection()?;

        let mut tables = self.tables.write();
        for write in writes {
            tables.apply(write);
        }

        self.batches.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(writes.len(), Ordering::SeqCst);
        Ok(())
    }
}
