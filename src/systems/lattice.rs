//! Open-boundary square lattice and its bond classes.
//!
//! Sites are numbered `index = ly * x + y`. Bonds are grouped by Euclidean
//! distance: nearest neighbours (1), diagonal next-nearest neighbours (√2)
//! and next-next-nearest neighbours (2, along one axis).

use serde::{Deserialize, Serialize};
use crate::error::{Result, VmcError};

/// An unordered site pair, stored with the lower index first.
pub type Bond = (usize, usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    pub lx: usize,
    pub ly: usize,
    nn: Vec<Bond>,
    nnn: Vec<Bond>,
    nnnn: Vec<Bond>,
}

impl Lattice {
    /// Build the `lx × ly` lattice and enumerate its bonds.
    pub fn new(lx: usize, ly: usize) -> Result<Self> {
        if lx == 0 || ly == 0 {
            return Err(VmcError::InvalidConfiguration(format!(
                "lattice dimensions must be positive, got {}x{}",
                lx, ly
            )));
        }

        let (nn, nnn, nnnn) = build_bonds(lx, ly);
        Ok(Self { lx, ly, nn, nnn, nnnn })
    }

    pub fn num_sites(&self) -> usize {
        self.lx * self.ly
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        self.ly * x + y
    }

    pub fn nearest(&self) -> &[Bond] {
        &self.nn
    }

    pub fn next_nearest(&self) -> &[Bond] {
        &self.nnn
    }

    pub fn next_next_nearest(&self) -> &[Bond] {
        &self.nnnn
    }
}

/// Enumerate (NN, NNN, NNNN) bonds of an open `lx × ly` grid.
///
/// Each site only looks "forward" (+x, or +y within the same column), so
/// every pair shows up exactly once.
pub fn build_bonds(lx: usize, ly: usize) -> (Vec<Bond>, Vec<Bond>, Vec<Bond>) {
    let index = |x: usize, y: usize| ly * x + y;
    let mut nn = Vec::new();
    let mut nnn = Vec::new();
    let mut nnnn = Vec::new();

    for x in 0..lx {
        for y in 0..ly {
            let site = index(x, y);

            if x + 1 < lx {
                nn.push((site, index(x + 1, y)));
            }
            if y + 1 < ly {
                nn.push((site, index(x, y + 1)));
            }

            if x + 1 < lx && y + 1 < ly {
                nnn.push((site, index(x + 1, y + 1)));
            }
            if x + 1 < lx && y >= 1 {
                nnn.push((site, index(x + 1, y - 1)));
            }

            if x + 2 < lx {
                nnnn.push((site, index(x + 2, y)));
            }
            if y + 2 < ly {
                nnnn.push((site, index(x, y + 2)));
            }
        }
    }

    (nn, nnn, nnnn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn squared_distance(lattice: &Lattice, (a, b): Bond) -> usize {
        let (xa, ya) = (a / lattice.ly, a % lattice.ly);
        let (xb, yb) = (b / lattice.ly, b % lattice.ly);
        xa.abs_diff(xb).pow(2) + ya.abs_diff(yb).pow(2)
    }

    #[test]
    fn test_2x2_bond_counts() {
        let lattice = Lattice::new(2, 2).unwrap();
        assert_eq!(lattice.nearest().len(), 4);
        assert_eq!(lattice.next_nearest().len(), 2);
        assert_eq!(lattice.next_next_nearest().len(), 0);
    }

    #[test]
    fn test_4x4_bond_counts() {
        let lattice = Lattice::new(4, 4).unwrap();
        assert_eq!(lattice.num_sites(), 16);
        assert_eq!(lattice.nearest().len(), 24);
        assert_eq!(lattice.next_nearest().len(), 18);
        assert_eq!(lattice.next_next_nearest().len(), 16);
    }

    #[test]
    fn test_bond_distances_and_uniqueness() {
        let lattice = Lattice::new(3, 5).unwrap();
        let classes = [
            (lattice.nearest(), 1),
            (lattice.next_nearest(), 2),
            (lattice.next_next_nearest(), 4),
        ];

        let mut seen = HashSet::new();
        for (bonds, d2) in classes {
            for &(a, b) in bonds {
                assert_ne!(a, b, "self bond at site {}", a);
                assert!(a < lattice.num_sites() && b < lattice.num_sites());
                assert_eq!(squared_distance(&lattice, (a, b)), d2);
                assert!(seen.insert((a.min(b), a.max(b))), "duplicate bond ({}, {})", a, b);
            }
        }
    }

    #[test]
    fn test_open_boundary_chain() {
        // A 1x4 strip is a chain: 3 NN bonds, no diagonals, 2 bonds at distance 2.
        let lattice = Lattice::new(1, 4).unwrap();
        assert_eq!(lattice.nearest(), &[(0, 1), (1, 2), (2, 3)]);
        assert!(lattice.next_nearest().is_empty());
        assert_eq!(lattice.next_next_nearest(), &[(0, 2), (1, 3)]);
    }

    #[test]
    fn test_index_convention() {
        let lattice = Lattice::new(3, 4).unwrap();
        assert_eq!(lattice.index(0, 0), 0);
        assert_eq!(lattice.index(1, 0), 4);
        assert_eq!(lattice.index(2, 3), 11);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(Lattice::new(0, 4), Err(VmcError::InvalidConfiguration(_))));
        assert!(matches!(Lattice::new(4, 0), Err(VmcError::InvalidConfiguration(_))));
    }
}
