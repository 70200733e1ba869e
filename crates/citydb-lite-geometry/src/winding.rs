// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring winding reversal
//!
//! Reversing operates on whole tuples: a ring `x1 y1 z1 x2 y2 z2` becomes
//! `x2 y2 z2 x1 y1 z1`, never a flipped ordinate array.

use crate::{Error, Result};
use citydb_lite_model::{Polygon, SURFACE_DIMENSION, TEXTURE_DIMENSION};

/// Reverse the order of the tuples of a flat ordinate array
pub fn reverse_tuples(ordinates: &[f64], dimension: usize) -> Result<Vec<f64>> {
    if dimension == 0 || ordinates.len() % dimension != 0 {
        return Err(Error::dimension(ordinates.len(), dimension));
    }

    Ok(ordinates
        .chunks_exact(dimension)
        .rev()
        .flatten()
        .copied()
        .collect())
}

/// Reverse every ring of a polygon
pub fn reverse_polygon(polygon: &Polygon) -> Result<Polygon> {
    let rings = polygon
        .rings
        .iter()
        .map(|ring| reverse_tuples(ring, SURFACE_DIMENSION))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(rings))
}

/// Reverse every ring of s/t texture coordinates
pub fn reverse_texture_rings(rings: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    rings
        .iter()
        .map(|ring| reverse_tuples(ring, TEXTURE_DIMENSION))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_pairs() {
        let ring = [0.0, 0.1, 1.0, 0.2, 1.0, 1.0, 0.0, 0.1];
        let reversed = reverse_tuples(&ring, 2).unwrap();
        assert_eq!(reversed, vec![0.0, 0.1, 1.0, 1.0, 1.0, 0.2, 0.0, 0.1]);
    }

    #[test]
    fn test_reverse_pairs_is_not_bytewise() {
        let ring = [1.0, 2.0, 3.0, 4.0];
        let reversed = reverse_tuples(&ring, 2).unwrap();
        assert_eq!(reversed, vec![3.0, 4.0, 1.0, 2.0]);
        assert_ne!(reversed, vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let ring = [0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0];
        let twice = reverse_tuples(&reverse_tuples(&ring, 3).unwrap(), 3).unwrap();
        assert_eq!(twice, ring.to_vec());
    }

    #[test]
    fn test_partial_tuple_is_rejected() {
        assert_eq!(
            reverse_tuples(&[1.0, 2.0, 3.0], 2),
            Err(Error::dimension(3, 2))
        );
        assert!(reverse_tuples(&[1.0], 0).is_err());
    }

    #[test]
    fn test_reverse_polygon_keeps_ring_order() {
        let polygon = Polygon::new(vec![
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            vec![0.5, 0.5, 0.0, 0.6, 0.5, 0.0],
        ]);
        let reversed = reverse_polygon(&polygon).unwrap();
        assert_eq!(reversed.rings.len(), 2);
        assert_eq!(
            reversed.rings[0],
            vec![1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(reversed.rings[1], vec![0.6, 0.5, 0.0, 0.5, 0.5, 0.0]);
    }
}
