// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of texture coordinate lists and world-to-texture matrices

use crate::{Error, Result};
use citydb_lite_model::TEXTURE_DIMENSION;

/// Number of entries of a row-major 3x4 world-to-texture matrix
const MATRIX_ENTRIES: usize = 12;

/// Parse a whitespace separated list of finite numbers
pub fn parse_ordinates(text: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|token| {
            lexical_core::parse::<f64>(token.as_bytes())
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| Error::invalid_number(token))
        })
        .collect()
}

/// Parse texture coordinates of one ring into s/t pairs
pub fn parse_texture_coordinates(text: &str) -> Result<Vec<f64>> {
    let ordinates = parse_ordinates(text)?;
    if ordinates.is_empty() || ordinates.len() % TEXTURE_DIMENSION != 0 {
        return Err(Error::dimension(ordinates.len(), TEXTURE_DIMENSION));
    }
    Ok(ordinates)
}

/// Parse a row-major 3x4 world-to-texture matrix
pub fn parse_world_to_texture(text: &str) -> Result<[f64; 12]> {
    let ordinates = parse_ordinates(text)?;
    <[f64; MATRIX_ENTRIES]>::try_from(ordinates.as_slice())
        .map_err(|_| Error::ordinate_count(MATRIX_ENTRIES, ordinates.len()))
}
