// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for geometry processing

use thiserror::Error;

/// Geometry processing result type
pub type Result<T> = std::result::Result<T, Error>;

/// Geometry processing errors
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// Token is not a number
    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    /// Wrong number of ordinates
    #[error("Expected {expected} ordinates, got {actual}")]
    OrdinateCount { expected: usize, actual: usize },

    /// Ordinate list does not split into whole tuples
    #[error("{len} ordinates do not form tuples of dimension {dimension}")]
    Dimension { len: usize, dimension: usize },
}

impl Error {
    /// Create an invalid number error
    pub fn invalid_number(token: impl Into<String>) -> Self {
        Error::InvalidNumber(token.into())
    }

    /// Create an ordinate count error
    pub fn ordinate_count(expected: usize, actual: usize) -> Self {
        Error::OrdinateCount { expected, actual }
    }

    /// Create a dimension error
    pub fn dimension(len: usize, dimension: usize) -> Self {
        Error::Dimension { len, dimension }
    }
}
