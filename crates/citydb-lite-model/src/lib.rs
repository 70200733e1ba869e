// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CityDB-Lite Model - Shared types and collaborator traits for XLink resolution
//!
//! A city-model import streams features into a relational store as they are
//! parsed. References to rows that are not committed yet are recorded as
//! [`PendingReference`]s and satisfied later by the resolver engine in
//! `citydb-lite-xlink`. This crate holds everything both sides agree on.
//!
//! # Architecture
//!
//! The crate is organized around a few collaborator traits:
//!
//! - [`ReferenceLedger`] - Append-only store of pending references, with mirroring
//! - [`CityDatabase`] - Typed reads and batched [`Write`]s against the relational store
//! - [`StreamOpener`] - Access to external files (texture images, library objects)
//! - [`EventSink`] - Progress and pass notifications
//!
//! # Example
//!
//! ```ignore
//! use citydb_lite_model::{PendingReference, SurfaceGeometryXlink, RowId};
//!
//! ledger.append(PendingReference::SurfaceGeometry(SurfaceGeometryXlink {
//!     id: RowId(17),
//!     parent_id: Some(RowId(12)),
//!     root_id: RowId(10),
//!     reverse: false,
//!     gml_id: "#UUID_wall_surface".into(),
//!     cityobject_id: Some(RowId(3)),
//! }))?;
//! ```

pub mod error;
pub mod geometry;
pub mod ledger;
pub mod records;
pub mod traits;
pub mod types;

// Re-export all public types
pub use error::*;
pub use geometry::*;
pub use ledger::*;
pub use records::*;
pub use traits::*;
pub use types::*;
