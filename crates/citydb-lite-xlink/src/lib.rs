// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityDB-Lite XLink
//!
//! Deferred cross-reference resolution for streaming city-model imports.
//!
//! Features are written as soon as they are parsed. A reference to a row
//! that does not exist yet is appended to a [`ReferenceLedger`] instead.
//! Once the import is through, the [`Orchestrator`] resolves the ledger
//! kind by kind, repeating passes for kinds whose references depend on
//! each other and abandoning true cycles with a single error.
//!
//! ## Overview
//!
//! - **Identifier resolution**: symbolic ids to row ids through an alias
//!   cache with live fallback queries ([`IdentifierResolver`])
//! - **Resolvers**: one per kind, each with its own batched writer
//!   ([`ResolverRegistry`])
//! - **Orchestration**: parallel lanes on a worker pool, multi-pass kinds,
//!   cycle detection and cooperative cancellation ([`Orchestrator`])
//! - **Backends**: in-memory ledger and database, local file streams
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use citydb_lite_xlink::{
//!     FileStreamOpener, MemoryDatabase, MemoryLedger, Orchestrator, XlinkConfig,
//! };
//! use std::sync::Arc;
//!
//! let db = Arc::new(MemoryDatabase::new());
//! let ledger = Arc::new(MemoryLedger::new());
//! // ... import features, appending pending references to `ledger` ...
//!
//! let orchestrator = Orchestrator::new(
//!     db,
//!     ledger,
//!     Arc::new(FileStreamOpener::new("import/")),
//!     XlinkConfig::default(),
//! );
//! let report = orchestrator.run()?;
//! println!("{} references resolved", report.resolved());
//! ```

pub mod batch;
pub mod cancel;
pub mod config;
pub mod identifier;
pub mod ledger;
pub mod memory;
pub mod orchestrator;
pub mod pool;
pub mod registry;
pub mod report;
pub mod resolvers;
pub mod stream;
pub mod world_file;

pub use batch::BatchWriter;
pub use cancel::CancellationToken;
pub use config::XlinkConfig;
pub use identifier::{IdCacheEntry, IdentifierResolver};
pub use ledger::MemoryLedger;
pub use memory::MemoryDatabase;
pub use orchestrator::Orchestrator;
pub use pool::WorkerPool;
pub use registry::{ResolverHandle, ResolverRegistry};
pub use report::{KindReport, ResolutionReport};
pub use resolvers::{PassContext, Resolution, ResolverContext, XlinkResolver};
pub use stream::FileStreamOpener;
pub use world_file::Georeference;

// Re-export the shared model
pub use citydb_lite_model::*;
