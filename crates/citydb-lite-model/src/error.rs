// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for XLink resolution

use crate::{RowId, XlinkKind};
use thiserror::Error;

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, XlinkError>;

/// Errors that can occur while resolving pending references
///
/// Only [`XlinkError::Connection`] aborts an import. Everything else is
/// handled per record by the resolvers and never crosses a kind boundary.
#[derive(Error, Debug)]
pub enum XlinkError {
    /// Connection-level failure of the relational store
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Reference ledger storage failure
    #[error("Reference ledger failure: {0}")]
    Ledger(String),

    /// Malformed pending reference payload
    #[error("Invalid {kind} reference for row {id}: {message}")]
    InvalidRecord {
        kind: XlinkKind,
        id: RowId,
        message: String,
    },

    /// World file could not be located or parsed
    #[error("Invalid world file {path}: {message}")]
    WorldFile { path: String, message: String },

    /// External stream could not be opened or was empty
    #[error("Cannot read {0}")]
    Stream(String),

    /// Resolution was interrupted by cancellation
    #[error("Resolution cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl XlinkError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        XlinkError::Connection(msg.into())
    }

    /// Create a ledger error
    pub fn ledger(msg: impl Into<String>) -> Self {
        XlinkError::Ledger(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(kind: XlinkKind, id: RowId, msg: impl Into<String>) -> Self {
        XlinkError::InvalidRecord {
            kind,
            id,
            message: msg.into(),
        }
    }

    /// Create a world file error
    pub fn world_file(path: impl Into<String>, msg: impl Into<String>) -> Self {
        XlinkError::WorldFile {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a stream error
    pub fn stream(reference: impl Into<String>) -> Self {
        XlinkError::Stream(reference.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        XlinkError::Other(msg.into())
    }

    /// Whether this error must abort the whole import
    pub fn is_fatal(&self) -> bool {
        matches!(self, XlinkError::Connection(_) | XlinkError::Ledger(_))
    }
}
