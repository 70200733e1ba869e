// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityDB-Lite Geometry
//!
//! Geometry helpers for deferred reference resolution. The crate works on
//! the row and value types of `citydb-lite-model` and never talks to the
//! database itself.
//!
//! ## Overview
//!
//! - **Solid reconstruction**: rebuild solids and composite solids from the
//!   persisted surface hierarchy ([`SolidRebuilder`])
//! - **Winding**: reverse rings of reversed surfaces and their texture
//!   coordinates tuple-wise ([`reverse_tuples`], [`reverse_polygon`])
//! - **Texture parsing**: ordinate lists and world-to-texture matrices
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use citydb_lite_geometry::SolidRebuilder;
//!
//! let rows = db.surface_geometry_hierarchy(solid_id)?;
//! if let Some(solid) = SolidRebuilder::rebuild(solid_id, &rows) {
//!     println!("rebuilt {} solid members", solid.solid_count());
//! }
//! ```

pub mod error;
pub mod rebuild;
pub mod texture;
pub mod winding;

pub use error::{Error, Result};
pub use rebuild::{GeometryNode, SolidRebuilder};
pub use texture::{parse_ordinates, parse_texture_coordinates, parse_world_to_texture};
pub use winding::{reverse_polygon, reverse_texture_rings, reverse_tuples};
