// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! World files of georeferenced textures
//!
//! A world file holds six lines `A D B E C F`: the pixel size and rotation
//! terms followed by the map coordinates of the upper left pixel.

use citydb_lite_model::{Result, XlinkError};

/// Georeference read from a world file
#[derive(Clone, Debug, PartialEq)]
pub struct Georeference {
    /// `"A B D E"` using the tokens as written in the file
    pub orientation: String,
    /// `(C, F)`
    pub reference_point: [f64; 2],
}

/// Candidate world file names for an image, in lookup order
///
/// `tex.png` yields `tex.pgw` (first and last letter of the extension) and
/// then `tex.pngw`.
pub fn candidates(image_uri: &str) -> Vec<String> {
    let name_start = image_uri.rfind(|c: char| c == '/' || c == '\\').map(|i| i + 1).unwrap_or(0);
    let Some(dot) = image_uri[name_start..].rfind('.').map(|i| name_start + i) else {
        return Vec::new();
    };

    let base = &image_uri[..dot];
    let ext = &image_uri[dot + 1..];
    let (Some(first), Some(last)) = (ext.chars().next(), ext.chars().last()) else {
        return Vec::new();
    };

    let mut result = vec![format!("{}.{}{}w", base, first, last)];
    let appended = format!("{}.{}w", base, ext);
    if !result.contains(&appended) {
        result.push(appended);
    }
    result
}

/// Parse the content of a world file
pub fn parse(path: &str, content: &str) -> Result<Georeference> {
    let tokens: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if tokens.len() != 6 {
        return Err(XlinkError::world_file(
            path,
            format!("expected 6 values, found {}", tokens.len()),
        ));
    }

    let mut values = [0.0f64; 6];
    for (value, token) in values.iter_mut().zip(&tokens) {
        *value = lexical_core::parse::<f64>(token.as_bytes())
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| XlinkError::world_file(path, format!("invalid number {:?}", token)))?;
    }

    // File order is A D B E C F
    Ok(Georeference {
        orientation: format!("{} {} {} {}", tokens[0], tokens[2], tokens[1], tokens[3]),
        reference_point: [values[4], values[5]],
    })
}
